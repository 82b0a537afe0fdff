//! # Server Module
//!
//! One request/response contract for driving a [`Game`](crate::Game),
//! whether the game runs in this process ([`LocalServer`]) or behind a TCP
//! socket ([`RemoteServer`]).
//!
//! ## Layout
//!
//! - [`hub`]: the shared game behind a single lock plus the per-client
//!   outbound queues
//! - [`session`]: server side of one TCP connection
//! - [`local`]: in-process client with its own worker task; can also accept
//!   TCP clients
//! - [`remote`]: TCP client stub
//! - [`protocol`]: line-delimited JSON messages exchanged over sockets
//!
//! A turn is resolved while holding the game lock and nothing ever awaits
//! while holding it, so every client observes the same single ordering of
//! turns.

pub mod hub;
pub mod local;
pub mod protocol;
pub mod remote;
pub mod session;

pub use hub::{ClientId, GameHub};
pub use local::LocalServer;
pub use protocol::{Request, RequestBody, ServerMessage, PROTOCOL_VERSION};
pub use remote::RemoteServer;
pub use session::{ClientSession, SessionState};

use crate::game::{GameSnapshot, Intent};
use crate::WarrensResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Answer to one submitted intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnResponse {
    /// False when the game refused the intent; no turn passed then
    pub accepted: bool,
    #[serde(default)]
    pub reason: Option<String>,
    pub snapshot: GameSnapshot,
}

impl TurnResponse {
    pub fn accepted(snapshot: GameSnapshot) -> Self {
        Self {
            accepted: true,
            reason: None,
            snapshot,
        }
    }

    pub fn rejected(reason: impl Into<String>, snapshot: GameSnapshot) -> Self {
        Self {
            accepted: false,
            reason: Some(reason.into()),
            snapshot,
        }
    }
}

/// Client side view of a game server.
#[async_trait]
pub trait Server: Send {
    /// Attaches to the game and returns its current state.
    async fn connect(&mut self) -> WarrensResult<GameSnapshot>;

    /// Submits one intent and waits for the resolved turn.
    async fn process(&mut self, intent: Intent) -> WarrensResult<TurnResponse>;

    /// Current state without playing a turn.
    async fn snapshot(&mut self) -> WarrensResult<GameSnapshot>;

    /// Posts a message every connected client will receive.
    async fn put_game_message(&mut self, text: &str) -> WarrensResult<()>;

    /// Next pushed message, waiting at most `wait`.
    async fn receive(&mut self, wait: Duration) -> Option<String>;

    /// Detaches from the game. Calling it again does nothing.
    async fn stop(&mut self) -> WarrensResult<()>;
}
