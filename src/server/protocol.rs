//! Wire format: one JSON document per line.

use crate::game::{GameSnapshot, Intent};
use crate::server::hub::ClientId;
use crate::server::TurnResponse;
use crate::{WarrensError, WarrensResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Both ends must agree on this or the connection is closed.
pub const PROTOCOL_VERSION: u32 = 1;

/// Client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Echoed back in the matching reply
    pub id: u64,
    pub body: RequestBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RequestBody {
    Play(Intent),
    Snapshot,
    Say(String),
    Bye,
}

/// Server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        client_id: ClientId,
        protocol_version: u32,
        snapshot: GameSnapshot,
    },
    Reply {
        id: u64,
        response: TurnResponse,
    },
    Event {
        text: String,
    },
}

/// Serializes a message as a single newline terminated line.
pub fn encode_line<T: Serialize>(message: &T) -> WarrensResult<String> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    Ok(line)
}

pub fn decode_line<T: DeserializeOwned>(line: &str) -> WarrensResult<T> {
    serde_json::from_str(line.trim_end())
        .map_err(|e| WarrensError::Protocol(format!("Malformed message: {}", e)))
}
