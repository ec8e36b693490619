use crate::use_cases::SyncSettings;
use std::{env, str::FromStr, time::Duration};

// Runtime/server constants and environment overrides.

pub const DEFAULT_PORT: u16 = 10000;
pub const DEFAULT_TICK_MS: u64 = 30;
pub const DEFAULT_FULL_SYNC_MS: u64 = 2000;
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 64;

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    parse_or(env::var(key).ok(), default)
}

// Missing or unparsable values fall back to the default.
fn parse_or<T: FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

pub fn http_port() -> u16 {
    env_or("SYNC_SERVER_PORT", DEFAULT_PORT)
}

pub fn tick_interval() -> Duration {
    Duration::from_millis(env_or("SYNC_TICK_MS", DEFAULT_TICK_MS).max(1))
}

pub fn full_sync_interval() -> Duration {
    Duration::from_millis(env_or("SYNC_FULL_SYNC_MS", DEFAULT_FULL_SYNC_MS))
}

pub fn outbound_capacity() -> usize {
    env_or("SYNC_OUTBOUND_CAPACITY", DEFAULT_OUTBOUND_CAPACITY).max(1)
}

pub fn sync_settings() -> SyncSettings {
    SyncSettings {
        tick_interval: tick_interval(),
        full_sync_interval: full_sync_interval(),
        outbound_capacity: outbound_capacity(),
    }
}
