use super::state::PeerId;

/// Process-wide source of peer identities.
///
/// Ids start at 1 and only ever grow, so a departed peer's id is never handed to a
/// newcomer. The wire id is one byte, which caps a process at 255 admissions.
#[derive(Debug)]
pub struct IdAllocator {
    next: u16,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Returns the next unused id, or `None` once the id space is exhausted.
    pub fn next_id(&mut self) -> Option<PeerId> {
        let id = u8::try_from(self.next).ok()?;
        self.next += 1;
        Some(PeerId(id))
    }

    pub fn remaining(&self) -> usize {
        usize::from(u8::MAX).saturating_sub(usize::from(self.next) - 1)
    }
}
