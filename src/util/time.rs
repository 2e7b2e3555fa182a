//! Time utilities for the frame loop

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Process start time for uptime tracking
static PROCESS_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize process start time (call once at startup)
pub fn init_process_time() {
    PROCESS_START.get_or_init(Instant::now);
}

/// Get process uptime in seconds
pub fn uptime_secs() -> u64 {
    PROCESS_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Projectile lifetimes are counted in ticks of this fixed rate,
/// independent of the real frame delta.
pub const LEGACY_TICK_RATE: f32 = 60.0;

/// Upper bound on a single frame delta. Longer stalls are clamped.
pub const MAX_FRAME_DELTA: f32 = 0.1;

/// Frame duration for a given rate
pub fn frame_duration(frame_rate: u32) -> Duration {
    Duration::from_micros(1_000_000 / frame_rate.max(1) as u64)
}

/// Monotonic simulation clock advanced by frame deltas.
///
/// Weapon fire-rate and reload checks read this instead of wall time so a
/// session replays identically under test.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    elapsed_ms: f64,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, dt: f32) {
        self.elapsed_ms += dt as f64 * 1000.0;
    }

    pub fn now_ms(&self) -> u64 {
        self.elapsed_ms as u64
    }
}
