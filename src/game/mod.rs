//! Game simulation modules

pub mod arena;
pub mod physics;
pub mod snapshot;
pub mod world;

pub use arena::{ArenaHandle, GameArena};
pub use world::{Player, WorldStore};

use crate::ws::protocol::InputCommand;
use uuid::Uuid;

/// Connection event delivered to the arena task
#[derive(Debug, Clone)]
pub enum ArenaEvent {
    /// Connection asked to enter the arena
    Join { conn_id: Uuid, name: Option<String> },

    /// One step of control input
    Input { conn_id: Uuid, command: InputCommand },

    /// Socket closed
    Disconnect { conn_id: Uuid },
}
