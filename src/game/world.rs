//! Authoritative world store: one player per joined connection

use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use uuid::Uuid;

use crate::ws::protocol::{InputCommand, PlayerMap, WorldBounds};

use super::physics::{Kinematics, PhysicsSystem, WORLD_HEIGHT, WORLD_WIDTH};

/// Longest display name kept, in characters
pub const MAX_NAME_CHARS: usize = 12;
/// Name used when a client joins without one
pub const DEFAULT_NAME: &str = "Racer";
/// Side of the square spawn area centered in the world
pub const SPAWN_AREA: f64 = 500.0;

/// Player state (authoritative)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Player {
    pub id: Uuid,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub angle: f64,
    pub speed: f64,
    #[serde(rename = "drift")]
    pub drifting: bool,
    /// CSS color, fixed at creation
    pub color: String,
}

impl Player {
    pub fn kinematics(&self) -> Kinematics {
        Kinematics {
            x: self.x,
            y: self.y,
            angle: self.angle,
            speed: self.speed,
            drifting: self.drifting,
        }
    }

    pub fn set_kinematics(&mut self, k: Kinematics) {
        self.x = k.x;
        self.y = k.y;
        self.angle = k.angle;
        self.speed = k.speed;
        self.drifting = k.drifting;
    }
}

/// Owns every live player. Mutated only by its arena.
pub struct WorldStore {
    players: HashMap<Uuid, Player>,
    rng: ChaCha8Rng,
}

impl WorldStore {
    pub fn new() -> Self {
        Self::with_rng(ChaCha8Rng::from_entropy())
    }

    /// Deterministic spawns and colors, for tests and replays
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(rng: ChaCha8Rng) -> Self {
        Self {
            players: HashMap::new(),
            rng,
        }
    }

    pub fn bounds() -> WorldBounds {
        WorldBounds {
            w: WORLD_WIDTH,
            h: WORLD_HEIGHT,
        }
    }

    /// Create (or replace) the player owned by `id`
    pub fn create(&mut self, id: Uuid, name: Option<&str>) -> Player {
        let spawn_min_x = (WORLD_WIDTH - SPAWN_AREA) / 2.0;
        let spawn_min_y = (WORLD_HEIGHT - SPAWN_AREA) / 2.0;
        let hue: f64 = self.rng.gen_range(0.0..360.0);

        let player = Player {
            id,
            name: display_name(name),
            x: spawn_min_x + self.rng.gen_range(0.0..SPAWN_AREA),
            y: spawn_min_y + self.rng.gen_range(0.0..SPAWN_AREA),
            angle: 0.0,
            speed: 0.0,
            drifting: false,
            color: format!("hsl({}, 70%, 50%)", hue),
        };

        self.players.insert(id, player.clone());
        player
    }

    /// Remove a player. Returns false when there was none.
    pub fn remove(&mut self, id: &Uuid) -> bool {
        self.players.remove(id).is_some()
    }

    /// Run one physics step for `id`. Returns false when `id` has no player.
    pub fn apply_input(&mut self, id: &Uuid, command: &InputCommand) -> bool {
        match self.players.get_mut(id) {
            Some(player) => {
                let next = PhysicsSystem::step(player.kinematics(), command);
                player.set_kinematics(next);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<&Player> {
        self.players.get(id)
    }

    /// Point-in-time copy of every player
    pub fn snapshot_all(&self) -> PlayerMap {
        self.players.clone()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

impl Default for WorldStore {
    fn default() -> Self {
        Self::new()
    }
}

/// First twelve characters of the requested name, or the default
fn display_name(requested: Option<&str>) -> String {
    let name: String = requested
        .unwrap_or_default()
        .chars()
        .take(MAX_NAME_CHARS)
        .collect();
    if name.is_empty() {
        DEFAULT_NAME.to_string()
    } else {
        name
    }
}
