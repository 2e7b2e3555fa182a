//! Snapshot throttling and send statistics

use crate::ws::protocol::EntitySnapshot;

use super::entity::Entity;

/// Builds snapshots of the local entity at a throttled cadence
pub struct SnapshotBuilder {
    /// Minimum millis between two snapshots
    interval_ms: u64,
    last_sent_ms: Option<u64>,
    forced: bool,
}

impl SnapshotBuilder {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_sent_ms: None,
            forced: false,
        }
    }

    /// Check if it's time to send a snapshot
    pub fn should_send(&mut self, now_ms: u64) -> bool {
        let due = self.forced
            || self
                .last_sent_ms
                .map_or(true, |last| now_ms.saturating_sub(last) >= self.interval_ms);
        if due {
            self.last_sent_ms = Some(now_ms);
            self.forced = false;
        }
        due
    }

    /// Force snapshot on next check (used for important events)
    pub fn force_next(&mut self) {
        self.forced = true;
    }

    /// Build a snapshot message
    pub fn build(&self, entity: &Entity) -> EntitySnapshot {
        EntitySnapshot {
            position: entity.position,
            yaw: entity.yaw,
            pitch: entity.pitch,
            health: entity.health,
            weapon: entity.weapon,
            crouching: entity.crouching,
            sliding: entity.sliding,
            zooming: entity.zooming,
            score: entity.score,
            kills: entity.kills,
            deaths: entity.deaths,
            team: entity.team,
        }
    }
}

/// Snapshot stats for debugging
#[derive(Debug, Default)]
pub struct SnapshotStats {
    pub total_snapshots: u64,
    pub total_bytes: u64,
    pub avg_bytes_per_snapshot: f32,
}

impl SnapshotStats {
    pub fn record(&mut self, bytes: usize) {
        self.total_snapshots += 1;
        self.total_bytes += bytes as u64;

        // Running average
        let n = self.total_snapshots as f32;
        self.avg_bytes_per_snapshot =
            self.avg_bytes_per_snapshot * ((n - 1.0) / n) + (bytes as f32 / n);
    }
}
