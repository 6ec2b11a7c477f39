//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::{ArenaHandle, GameArena, WorldStore};
use crate::ws::hub::ClientHub;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub hub: Arc<ClientHub>,
    pub arena: ArenaHandle,
}

impl AppState {
    /// Build the state and the arena that must be spawned to serve it
    pub fn new(config: Config) -> (Self, GameArena<Arc<ClientHub>>) {
        let config = Arc::new(config);

        // Initialize connection hub
        let hub = Arc::new(ClientHub::new());

        // Initialize the arena; it owns the world for the life of the process
        let world = match config.world_seed {
            Some(seed) => WorldStore::with_seed(seed),
            None => WorldStore::new(),
        };
        let (arena, handle) = GameArena::new(world, hub.clone());

        let state = Self {
            config,
            hub,
            arena: handle,
        };

        (state, arena)
    }
}
