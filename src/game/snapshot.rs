//! Snapshot building and bookkeeping

use uuid::Uuid;

use crate::ws::protocol::{InitPayload, ServerMsg};

use super::WorldStore;

/// Builds world snapshots for network transmission
pub struct SnapshotBuilder {
    /// Broadcast ticks since the arena started
    tick: u64,
    stats: SnapshotStats,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self {
            tick: 0,
            stats: SnapshotStats::default(),
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn stats(&self) -> &SnapshotStats {
        &self.stats
    }

    /// Build the per-tick full-state message
    pub fn build(&mut self, world: &WorldStore) -> ServerMsg {
        self.tick += 1;
        self.stats.record(world.len());
        ServerMsg::StateUpdate(world.snapshot_all())
    }

    /// Build the private greeting for a joining connection
    pub fn build_init(&self, self_id: Uuid, world: &WorldStore) -> ServerMsg {
        ServerMsg::Init(InitPayload {
            self_id,
            players: world.snapshot_all(),
            world: WorldStore::bounds(),
        })
    }
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot stats for debugging
#[derive(Debug, Default)]
pub struct SnapshotStats {
    pub total_snapshots: u64,
    pub avg_players_per_snapshot: f32,
}

impl SnapshotStats {
    pub fn record(&mut self, player_count: usize) {
        self.total_snapshots += 1;

        // Running average
        let n = self.total_snapshots as f32;
        self.avg_players_per_snapshot =
            self.avg_players_per_snapshot * ((n - 1.0) / n) + (player_count as f32 / n);
    }
}
