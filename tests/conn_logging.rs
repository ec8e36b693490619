mod support;

use std::io;
use std::sync::{Arc, Mutex};

// In-memory log sink; this binary owns the global subscriber.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        let bytes = self.0.lock().expect("log buffer").clone();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("log buffer").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn when_peer_connects_and_leaves_then_logs_carry_its_remote_address() {
    let captured = Captured::default();
    let writer = captured.clone();
    tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .init();

    let addr = support::spawn_server(support::fast_settings()).await;
    let mut client = support::connect(addr).await;
    let (id, _) = support::welcome(&mut client).await;
    client.close(None).await.expect("close");

    support::wait_until("disconnect to be logged", || {
        let captured = captured.clone();
        async move { captured.text().contains("peer disconnected") }
    })
    .await;

    let logs = captured.text();
    for event in ["peer connected", "peer disconnected"] {
        let line = logs
            .lines()
            .find(|line| line.contains(event))
            .unwrap_or_else(|| panic!("no {event} line in:\n{logs}"));
        assert!(line.contains("remote=127.0.0.1:"), "{line}");
        assert!(line.contains(&format!("peer_id={id}")), "{line}");
    }
    assert!(logs.contains("close=\"graceful\"") || logs.contains("close=graceful"), "{logs}");
}
