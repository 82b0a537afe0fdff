//! # Turn Context
//!
//! Per-game scratch state handed to every rule function during a turn: the
//! random source, the bounded message log and the queue of events waiting to
//! be delivered to clients.

use crate::game::{ActorId, GameOutcome, LevelId, Position};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Something that happened during a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    Message {
        text: String,
    },
    ActorMoved {
        actor: ActorId,
        from: Position,
        to: Position,
    },
    ActorDamaged {
        actor: ActorId,
        damage: i32,
        source: Option<ActorId>,
    },
    ActorHealed {
        actor: ActorId,
        amount: i32,
    },
    ActorDied {
        actor: ActorId,
        killer: Option<ActorId>,
    },
    ItemPickedUp {
        actor: ActorId,
        item: ActorId,
    },
    LevelChanged {
        from: LevelId,
        to: LevelId,
    },
    LevelUp {
        actor: ActorId,
        level: u32,
    },
    GameFinished {
        outcome: GameOutcome,
    },
}

/// The last few human readable messages, oldest dropped first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageLog {
    capacity: usize,
    messages: VecDeque<String>,
}

impl MessageLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            messages: VecDeque::new(),
        }
    }

    pub fn push(&mut self, text: impl Into<String>) {
        if self.messages.len() == self.capacity {
            self.messages.pop_front();
        }
        self.messages.push_back(text.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.messages.iter()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.messages.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

fn detached_rng() -> StdRng {
    StdRng::seed_from_u64(0)
}

/// Explicit replacement for process-wide message and event queues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnContext {
    pub messages: MessageLog,
    pending: VecDeque<GameEvent>,
    pending_capacity: usize,
    /// Everything emitted since [`TurnContext::begin_turn`]
    #[serde(skip)]
    current_turn: Vec<GameEvent>,
    #[serde(skip, default = "detached_rng")]
    rng: StdRng,
}

impl TurnContext {
    pub fn new(message_capacity: usize, event_capacity: usize, seed: u64) -> Self {
        Self {
            messages: MessageLog::new(message_capacity),
            pending: VecDeque::new(),
            pending_capacity: event_capacity.max(1),
            current_turn: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Replaces the random source, used after loading a game.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Logs a message and queues it for clients.
    pub fn message(&mut self, text: impl Into<String>) {
        let text = text.into();
        log::debug!("{}", text);
        self.messages.push(text.clone());
        self.emit(GameEvent::Message { text });
    }

    pub fn emit(&mut self, event: GameEvent) {
        if self.pending.len() == self.pending_capacity {
            self.pending.pop_front();
        }
        self.pending.push_back(event.clone());
        self.current_turn.push(event);
    }

    pub fn begin_turn(&mut self) {
        self.current_turn.clear();
    }

    /// Events emitted since the turn began.
    pub fn take_turn_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.current_turn)
    }

    /// Hands over every queued event, oldest first.
    pub fn drain_pending(&mut self) -> Vec<GameEvent> {
        self.pending.drain(..).collect()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Drops all messages and events and reseeds. Mostly for tests.
    pub fn reset(&mut self, seed: u64) {
        self.messages.clear();
        self.pending.clear();
        self.current_turn.clear();
        self.reseed(seed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_log_drops_oldest() {
        let mut log = MessageLog::new(3);
        for i in 0..5 {
            log.push(format!("m{}", i));
        }
        assert_eq!(log.to_vec(), vec!["m2", "m3", "m4"]);
    }

    #[test]
    fn test_pending_events_are_bounded() {
        let mut ctx = TurnContext::new(5, 2, 1);
        ctx.message("a");
        ctx.message("b");
        ctx.message("c");
        let pending = ctx.drain_pending();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0], GameEvent::Message { text: "b".to_string() });
        assert_eq!(ctx.pending_len(), 0);
    }

    #[test]
    fn test_turn_events_cover_only_current_turn() {
        let mut ctx = TurnContext::new(5, 20, 1);
        ctx.message("old");
        ctx.begin_turn();
        ctx.message("new");
        let events = ctx.take_turn_events();
        assert_eq!(events, vec![GameEvent::Message { text: "new".to_string() }]);
        assert!(ctx.take_turn_events().is_empty());
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut ctx = TurnContext::new(5, 20, 1);
        ctx.message("hello");
        ctx.reset(2);
        assert!(ctx.messages.is_empty());
        assert_eq!(ctx.pending_len(), 0);
    }
}
