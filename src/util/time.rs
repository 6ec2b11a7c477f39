//! Time utilities for the broadcast loop

use std::time::{Duration, Instant};

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Full-state broadcasts per second
pub const BROADCAST_TPS: u32 = 60;
pub const BROADCAST_INTERVAL_MICROS: u64 = 1_000_000 / BROADCAST_TPS as u64;

pub fn broadcast_interval() -> Duration {
    Duration::from_micros(BROADCAST_INTERVAL_MICROS)
}
