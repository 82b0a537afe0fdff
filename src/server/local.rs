//! # Local Server
//!
//! Runs the game in this process. Each connected handle gets its own worker
//! task fed through a channel, the same shape a socket client has on the
//! server side, so callers cannot tell the two apart.

use crate::config::{EngineConfig, ServerConfig};
use crate::game::{Game, GameSnapshot, Intent};
use crate::server::hub::{ClientId, GameHub};
use crate::server::session::ClientSession;
use crate::server::{Server, TurnResponse};
use crate::{WarrensError, WarrensResult};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;

enum Job {
    Play(Intent, oneshot::Sender<WarrensResult<TurnResponse>>),
    Snapshot(oneshot::Sender<WarrensResult<GameSnapshot>>),
    Say(String, oneshot::Sender<WarrensResult<()>>),
}

struct Worker {
    jobs: mpsc::UnboundedSender<Job>,
    handle: JoinHandle<()>,
}

pub struct LocalServer {
    hub: Arc<GameHub>,
    config: ServerConfig,
    worker: Option<Worker>,
    events: Option<mpsc::UnboundedReceiver<String>>,
    client: Option<ClientId>,
    shutdown: watch::Sender<bool>,
    listeners: Vec<JoinHandle<()>>,
}

impl LocalServer {
    pub fn new(game: Game) -> Self {
        let config = game.config.server.clone();
        Self::with_hub(GameHub::new(game), config)
    }

    /// Builds a fresh game from `config` and serves it.
    pub fn start(config: &EngineConfig) -> WarrensResult<Self> {
        let mut game = Game::new(config.clone())?;
        game.setup_new_game()?;
        Ok(Self::new(game))
    }

    fn with_hub(hub: Arc<GameHub>, config: ServerConfig) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            hub,
            config,
            worker: None,
            events: None,
            client: None,
            shutdown,
            listeners: Vec::new(),
        }
    }

    /// Another in-process client of the same game.
    pub fn join(&self) -> LocalServer {
        Self::with_hub(self.hub.clone(), self.config.clone())
    }

    pub fn hub(&self) -> Arc<GameHub> {
        self.hub.clone()
    }

    pub fn client_id(&self) -> Option<ClientId> {
        self.client
    }

    pub fn is_connected(&self) -> bool {
        self.worker.is_some()
    }

    /// Accepts TCP clients on `addr` until [`Server::stop`]. Returns the
    /// bound address, which matters when `addr` asks for port 0.
    pub async fn listen(&mut self, addr: &str) -> WarrensResult<SocketAddr> {
        let listener = TcpListener::bind(addr).await?;
        let local = listener.local_addr()?;
        log::info!("Listening on {}", local);

        let hub = self.hub.clone();
        let mut shutdown = self.shutdown.subscribe();
        let sessions_shutdown = self.shutdown.subscribe();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    accepted = listener.accept() => match accepted {
                        Ok((stream, peer)) => {
                            log::debug!("Accepted connection from {}", peer);
                            let session = ClientSession::new(hub.clone(), sessions_shutdown.clone());
                            tokio::spawn(async move {
                                // failures are logged by the session itself
                                let _ = session.run(stream).await;
                            });
                        }
                        Err(e) => log::warn!("Accept failed: {}", e),
                    },
                    _ = shutdown.changed() => break,
                }
            }
            log::info!("Listener on {} stopped", local);
        });
        self.listeners.push(handle);
        Ok(local)
    }

    fn submit(&self, job: Job) -> WarrensResult<()> {
        let worker = self
            .worker
            .as_ref()
            .ok_or_else(|| WarrensError::Disconnected("Not connected".to_string()))?;
        worker
            .jobs
            .send(job)
            .map_err(|_| WarrensError::Disconnected("Worker stopped".to_string()))
    }
}

async fn await_reply<T>(limit: Duration, reply: oneshot::Receiver<WarrensResult<T>>) -> WarrensResult<T> {
    match timeout(limit, reply).await {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => Err(WarrensError::Disconnected("Worker dropped the request".to_string())),
        Err(_) => Err(WarrensError::Timeout("No answer from the game".to_string())),
    }
}

async fn run_worker(
    hub: Arc<GameHub>,
    client: ClientId,
    mut jobs: mpsc::UnboundedReceiver<Job>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            job = jobs.recv() => match job {
                Some(Job::Play(intent, reply)) => {
                    let _ = reply.send(hub.play(client, intent));
                }
                Some(Job::Snapshot(reply)) => {
                    let _ = reply.send(hub.snapshot());
                }
                Some(Job::Say(text, reply)) => {
                    let _ = reply.send(hub.say(client, &text));
                }
                None => break,
            },
            _ = shutdown.changed() => break,
        }
    }
    hub.unregister(client);
    log::debug!("Worker for client {} finished", client);
}

#[async_trait]
impl Server for LocalServer {
    async fn connect(&mut self) -> WarrensResult<GameSnapshot> {
        if self.worker.is_some() {
            return self.snapshot().await;
        }
        let (client, events, snapshot) = self.hub.register()?;
        let (jobs, queue) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_worker(self.hub.clone(), client, queue, self.shutdown.subscribe()));
        self.worker = Some(Worker { jobs, handle });
        self.events = Some(events);
        self.client = Some(client);
        Ok(snapshot)
    }

    async fn process(&mut self, intent: Intent) -> WarrensResult<TurnResponse> {
        let (tx, rx) = oneshot::channel();
        self.submit(Job::Play(intent, tx))?;
        await_reply(self.config.response_timeout(), rx).await
    }

    async fn snapshot(&mut self) -> WarrensResult<GameSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.submit(Job::Snapshot(tx))?;
        await_reply(self.config.response_timeout(), rx).await
    }

    async fn put_game_message(&mut self, text: &str) -> WarrensResult<()> {
        let (tx, rx) = oneshot::channel();
        self.submit(Job::Say(text.to_string(), tx))?;
        await_reply(self.config.response_timeout(), rx).await
    }

    async fn receive(&mut self, wait: Duration) -> Option<String> {
        let events = self.events.as_mut()?;
        if wait.is_zero() {
            return events.try_recv().ok();
        }
        timeout(wait, events.recv()).await.ok().flatten()
    }

    async fn stop(&mut self) -> WarrensResult<()> {
        self.shutdown.send_replace(true);
        let limit = self.config.response_timeout();
        if let Some(worker) = self.worker.take() {
            drop(worker.jobs);
            if timeout(limit, worker.handle).await.is_err() {
                log::warn!("Worker did not stop within {:?}", limit);
            }
        }
        for listener in self.listeners.drain(..) {
            if timeout(limit, listener).await.is_err() {
                log::warn!("Listener did not stop within {:?}", limit);
            }
        }
        self.events = None;
        self.client = None;
        Ok(())
    }
}

impl Drop for LocalServer {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
    }
}
