//! # Game Hub
//!
//! The one shared game every client talks to. A single lock covers the game
//! and the client registry together, so the events a turn queues are drained
//! into every outbound queue before the next turn can start.

use crate::game::{Game, GameEvent, GameSnapshot, Intent};
use crate::server::TurnResponse;
use crate::{WarrensError, WarrensResult};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

pub type ClientId = u64;

struct HubState {
    game: Game,
    clients: BTreeMap<ClientId, mpsc::UnboundedSender<String>>,
    next_client: ClientId,
}

impl HubState {
    /// Pushes `text` to every client, forgetting those that went away.
    fn broadcast(&mut self, text: &str) {
        self.clients.retain(|id, queue| {
            let alive = queue.send(text.to_string()).is_ok();
            if !alive {
                log::debug!("Client {} queue closed, dropping it", id);
            }
            alive
        });
    }

    /// Empties the game's pending event queue, sending every message on.
    fn flush_events(&mut self) {
        for event in self.game.drain_events() {
            if let GameEvent::Message { text } = event {
                self.broadcast(&text);
            }
        }
    }
}

pub struct GameHub {
    state: Mutex<HubState>,
}

impl GameHub {
    pub fn new(game: Game) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(HubState {
                game,
                clients: BTreeMap::new(),
                next_client: 1,
            }),
        })
    }

    fn lock(&self) -> WarrensResult<MutexGuard<'_, HubState>> {
        self.state
            .lock()
            .map_err(|_| WarrensError::InvalidState("Game lock poisoned".to_string()))
    }

    /// Adds a client and hands back its outbound queue plus the state it
    /// starts from.
    pub fn register(&self) -> WarrensResult<(ClientId, mpsc::UnboundedReceiver<String>, GameSnapshot)> {
        let mut state = self.lock()?;
        let id = state.next_client;
        state.next_client += 1;
        let (tx, rx) = mpsc::unbounded_channel();
        state.clients.insert(id, tx);
        log::info!("Client {} connected ({} total)", id, state.clients.len());
        Ok((id, rx, state.game.snapshot()))
    }

    /// Safe to call more than once.
    pub fn unregister(&self, client: ClientId) {
        if let Ok(mut state) = self.lock() {
            if state.clients.remove(&client).is_some() {
                log::info!("Client {} disconnected ({} left)", client, state.clients.len());
            }
        }
    }

    pub fn client_count(&self) -> usize {
        self.lock().map_or(0, |state| state.clients.len())
    }

    /// Resolves one turn for `client`. Refused intents come back as a
    /// rejected response, never as an error.
    ///
    /// Messages queued before the turn (setup, earlier chat) go out first.
    pub fn play(&self, client: ClientId, intent: Intent) -> WarrensResult<TurnResponse> {
        let mut state = self.lock()?;
        state.flush_events();
        let response = match state.game.try_to_play_turn(intent) {
            Ok(outcome) => {
                log::debug!("Client {} played turn {}", client, outcome.turn);
                TurnResponse::accepted(state.game.snapshot())
            }
            Err(e) => {
                log::debug!("Client {} intent rejected: {}", client, e);
                TurnResponse::rejected(e.to_string(), state.game.snapshot())
            }
        };
        state.flush_events();
        Ok(response)
    }

    /// Posts a message into the game log and to every client.
    pub fn say(&self, client: ClientId, text: &str) -> WarrensResult<()> {
        let mut state = self.lock()?;
        log::debug!("Client {} says {:?}", client, text);
        state.game.put_message(text);
        state.flush_events();
        Ok(())
    }

    pub fn snapshot(&self) -> WarrensResult<GameSnapshot> {
        Ok(self.lock()?.game.snapshot())
    }

    /// Runs `f` against the game under the lock.
    pub fn with_game<T>(&self, f: impl FnOnce(&mut Game) -> T) -> WarrensResult<T> {
        let mut state = self.lock()?;
        Ok(f(&mut state.game))
    }
}
