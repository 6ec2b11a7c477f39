//! Arena state and authoritative event/broadcast loop

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use crate::util::time::{broadcast_interval, BROADCAST_TPS};
use crate::ws::hub::Outbound;
use crate::ws::protocol::{InputCommand, ServerMsg};

use super::snapshot::SnapshotBuilder;
use super::{ArenaEvent, WorldStore};

/// Pending events buffered before senders wait
pub const EVENT_QUEUE_CAPACITY: usize = 1024;

/// The arena task stopped and no longer accepts events
#[derive(Debug, thiserror::Error)]
#[error("arena is no longer running")]
pub struct ArenaClosed;

/// Handle to a running arena
#[derive(Clone)]
pub struct ArenaHandle {
    event_tx: mpsc::Sender<ArenaEvent>,
    player_count: Arc<AtomicUsize>,
}

impl ArenaHandle {
    /// Queue an event for the arena
    pub async fn send(&self, event: ArenaEvent) -> Result<(), ArenaClosed> {
        self.event_tx.send(event).await.map_err(|_| ArenaClosed)
    }

    pub fn player_count(&self) -> usize {
        self.player_count.load(Ordering::Relaxed)
    }
}

/// The authoritative arena. Sole owner of the world store.
pub struct GameArena<O: Outbound> {
    world: WorldStore,
    event_rx: mpsc::Receiver<ArenaEvent>,
    outbound: O,
    snapshot_builder: SnapshotBuilder,
    player_count: Arc<AtomicUsize>,
}

impl<O: Outbound> GameArena<O> {
    /// Create a new arena
    pub fn new(world: WorldStore, outbound: O) -> (Self, ArenaHandle) {
        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let player_count = Arc::new(AtomicUsize::new(0));

        let handle = ArenaHandle {
            event_tx,
            player_count: player_count.clone(),
        };

        let arena = Self {
            world,
            event_rx,
            outbound,
            snapshot_builder: SnapshotBuilder::new(),
            player_count,
        };

        (arena, handle)
    }

    /// Run until every handle is dropped.
    ///
    /// Events and broadcast ticks are handled one at a time, each to
    /// completion, so no snapshot ever sees a half-applied event.
    pub async fn run(mut self) {
        info!(tick_rate = BROADCAST_TPS, "Arena started");

        let mut ticker = interval(broadcast_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                event = self.event_rx.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
                _ = ticker.tick() => self.broadcast_state(),
            }
        }

        info!(
            ticks = self.snapshot_builder.tick(),
            "Arena stopped, all handles dropped"
        );
    }

    pub fn handle_event(&mut self, event: ArenaEvent) {
        match event {
            ArenaEvent::Join { conn_id, name } => self.handle_join(conn_id, name.as_deref()),
            ArenaEvent::Input { conn_id, command } => self.handle_input(conn_id, &command),
            ArenaEvent::Disconnect { conn_id } => self.handle_disconnect(conn_id),
        }
    }

    /// Handle a join. A second join from the same connection respawns it.
    fn handle_join(&mut self, conn_id: Uuid, name: Option<&str>) {
        let rejoin = self.world.get(&conn_id).is_some();
        let player = self.world.create(conn_id, name);
        self.sync_player_count();

        let init = self.snapshot_builder.build_init(conn_id, &self.world);
        self.outbound.send_to(conn_id, &init);

        self.outbound
            .broadcast_except(conn_id, &ServerMsg::PlayerJoined(player.clone()));

        info!(
            conn_id = %conn_id,
            name = %player.name,
            rejoin,
            player_count = self.world.len(),
            "Player joined arena"
        );
    }

    /// Apply one step of input; unknown connections are ignored
    fn handle_input(&mut self, conn_id: Uuid, command: &InputCommand) {
        if !self.world.apply_input(&conn_id, command) {
            debug!(conn_id = %conn_id, "Input for connection without a player, ignored");
        }
    }

    /// Handle a disconnect. Safe without a prior join.
    fn handle_disconnect(&mut self, conn_id: Uuid) {
        let had_player = self.world.remove(&conn_id);
        self.sync_player_count();

        self.outbound.broadcast(&ServerMsg::PlayerLeft(conn_id));

        info!(
            conn_id = %conn_id,
            had_player,
            player_count = self.world.len(),
            "Player left arena"
        );

        if had_player && self.world.is_empty() {
            debug!("Arena is empty");
        }
    }

    /// Send the whole world to every connection
    pub fn broadcast_state(&mut self) {
        let update = self.snapshot_builder.build(&self.world);
        self.outbound.broadcast(&update);

        // Every ten seconds
        if self.snapshot_builder.tick() % (BROADCAST_TPS as u64 * 10) == 0 {
            let stats = self.snapshot_builder.stats();
            debug!(
                tick = self.snapshot_builder.tick(),
                snapshots = stats.total_snapshots,
                avg_players = stats.avg_players_per_snapshot,
                "Snapshot stats"
            );
        }
    }

    #[cfg(test)]
    pub fn world(&self) -> &WorldStore {
        &self.world
    }

    fn sync_player_count(&self) {
        self.player_count.store(self.world.len(), Ordering::Relaxed);
    }
}
