//! WebSocket protocol message definitions
//! These are the wire types for client-server communication.
//!
//! Every frame is a JSON text message of the form `{"type": ..., "data": ...}`.

use std::collections::HashMap;

use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::game::Player;

/// Full world keyed by connection id, as sent to clients
pub type PlayerMap = HashMap<Uuid, Player>;

/// Messages sent from client to server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ClientMsg {
    /// Enter the arena with a display name
    Join(#[serde(deserialize_with = "lenient_name")] Option<String>),

    /// Control state for one physics step
    Input(#[serde(deserialize_with = "lenient_input")] InputCommand),
}

/// Control flags sent by a client. Absent fields are `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InputCommand {
    /// Accelerate forward
    #[serde(deserialize_with = "truthy")]
    pub up: bool,
    /// Brake / reverse
    #[serde(deserialize_with = "truthy")]
    pub down: bool,
    /// Steer left
    #[serde(deserialize_with = "truthy")]
    pub left: bool,
    /// Steer right
    #[serde(deserialize_with = "truthy")]
    pub right: bool,
    /// Low-friction drift mode
    #[serde(deserialize_with = "truthy")]
    pub drift: bool,
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ServerMsg {
    /// Private greeting for a newly joined connection
    Init(InitPayload),

    /// Another player entered the arena
    PlayerJoined(Player),

    /// A connection left; carries its id only
    PlayerLeft(Uuid),

    /// Full world state, sent every broadcast tick
    StateUpdate(PlayerMap),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitPayload {
    pub self_id: Uuid,
    pub players: PlayerMap,
    pub world: WorldBounds,
}

/// Arena dimensions
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WorldBounds {
    pub w: f64,
    pub h: f64,
}

/// Coerce any JSON value to a bool the way a browser client would expect.
fn truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => false,
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    })
}

/// Null, missing or non-object input data is an all-false command.
fn lenient_input<'de, D>(deserializer: D) -> Result<InputCommand, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        value @ Value::Object(_) => InputCommand::deserialize(value).map_err(de::Error::custom),
        _ => Ok(InputCommand::default()),
    }
}

/// Non-string names are treated as missing.
fn lenient_name<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}
