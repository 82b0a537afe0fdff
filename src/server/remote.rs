//! # Remote Server
//!
//! Client stub for a game hosted elsewhere. Requests go out as JSON lines;
//! a reader task routes each reply to whoever is waiting for its id and
//! queues pushed events for [`Server::receive`].

use crate::config::ServerConfig;
use crate::game::{GameSnapshot, Intent};
use crate::server::hub::ClientId;
use crate::server::protocol::{decode_line, encode_line, Request, RequestBody, ServerMessage, PROTOCOL_VERSION};
use crate::server::{Server, TurnResponse};
use crate::{WarrensError, WarrensResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<TurnResponse>>>>;

pub struct RemoteServer {
    addr: String,
    config: ServerConfig,
    writer: Option<OwnedWriteHalf>,
    reader: Option<JoinHandle<()>>,
    pending: Pending,
    events: Option<mpsc::UnboundedReceiver<String>>,
    next_id: u64,
    client: Option<ClientId>,
}

impl RemoteServer {
    pub fn new(addr: impl Into<String>, config: ServerConfig) -> Self {
        Self {
            addr: addr.into(),
            config,
            writer: None,
            reader: None,
            pending: Arc::new(Mutex::new(HashMap::new())),
            events: None,
            next_id: 1,
            client: None,
        }
    }

    /// Id the host gave this client.
    pub fn client_id(&self) -> Option<ClientId> {
        self.client
    }

    pub fn is_connected(&self) -> bool {
        self.writer.is_some()
    }

    async fn request(&mut self, body: RequestBody) -> WarrensResult<TurnResponse> {
        let id = self.next_id;
        self.next_id += 1;
        let line = encode_line(&Request { id, body })?;

        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| WarrensError::Disconnected("Not connected".to_string()))?;
        let (tx, rx) = oneshot::channel();
        lock(&self.pending)?.insert(id, tx);
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            lock(&self.pending)?.remove(&id);
            return Err(WarrensError::Disconnected(e.to_string()));
        }

        match timeout(self.config.response_timeout(), rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(WarrensError::Disconnected(format!("Connection to {} closed", self.addr))),
            Err(_) => {
                lock(&self.pending)?.remove(&id);
                Err(WarrensError::Timeout(format!("No reply to request {} from {}", id, self.addr)))
            }
        }
    }
}

fn lock(pending: &Pending) -> WarrensResult<std::sync::MutexGuard<'_, HashMap<u64, oneshot::Sender<TurnResponse>>>> {
    pending
        .lock()
        .map_err(|_| WarrensError::InvalidState("Pending request table poisoned".to_string()))
}

async fn read_replies(mut lines: Lines<BufReader<OwnedReadHalf>>, pending: Pending, events: mpsc::UnboundedSender<String>) {
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                log::warn!("Connection lost: {}", e);
                break;
            }
        };
        match decode_line::<ServerMessage>(&line) {
            Ok(ServerMessage::Reply { id, response }) => {
                let waiting = lock(&pending).ok().and_then(|mut p| p.remove(&id));
                match waiting {
                    Some(tx) => {
                        let _ = tx.send(response);
                    }
                    None => log::debug!("Reply {} arrived after its request gave up", id),
                }
            }
            Ok(ServerMessage::Event { text }) => {
                if events.send(text).is_err() {
                    break;
                }
            }
            Ok(ServerMessage::Welcome { .. }) => log::warn!("Unexpected second welcome"),
            Err(e) => {
                log::warn!("{}", e);
                break;
            }
        }
    }
    // waiting requests see their sender dropped
    if let Ok(mut p) = lock(&pending) {
        p.clear();
    }
}

#[async_trait]
impl Server for RemoteServer {
    async fn connect(&mut self) -> WarrensResult<GameSnapshot> {
        if self.is_connected() {
            return self.snapshot().await;
        }
        let stream = timeout(self.config.connect_timeout(), TcpStream::connect(&self.addr))
            .await
            .map_err(|_| WarrensError::Timeout(format!("Connecting to {}", self.addr)))?
            .map_err(|e| WarrensError::Disconnected(format!("{}: {}", self.addr, e)))?;
        let (reader, writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();

        let first = timeout(self.config.response_timeout(), lines.next_line())
            .await
            .map_err(|_| WarrensError::Timeout(format!("No welcome from {}", self.addr)))??
            .ok_or_else(|| WarrensError::Disconnected(format!("{} closed the connection", self.addr)))?;
        let (client_id, snapshot) = match decode_line::<ServerMessage>(&first)? {
            ServerMessage::Welcome {
                client_id,
                protocol_version,
                snapshot,
            } => {
                if protocol_version != PROTOCOL_VERSION {
                    return Err(WarrensError::Protocol(format!(
                        "Host speaks protocol {}, we speak {}",
                        protocol_version, PROTOCOL_VERSION
                    )));
                }
                (client_id, snapshot)
            }
            other => {
                return Err(WarrensError::Protocol(format!("Expected a welcome, got {:?}", other)));
            }
        };

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        self.reader = Some(tokio::spawn(read_replies(lines, self.pending.clone(), events_tx)));
        self.writer = Some(writer);
        self.events = Some(events_rx);
        self.client = Some(client_id);
        log::info!("Connected to {} as client {}", self.addr, client_id);
        Ok(snapshot)
    }

    async fn process(&mut self, intent: Intent) -> WarrensResult<TurnResponse> {
        self.request(RequestBody::Play(intent)).await
    }

    async fn snapshot(&mut self) -> WarrensResult<GameSnapshot> {
        Ok(self.request(RequestBody::Snapshot).await?.snapshot)
    }

    async fn put_game_message(&mut self, text: &str) -> WarrensResult<()> {
        self.request(RequestBody::Say(text.to_string())).await.map(|_| ())
    }

    async fn receive(&mut self, wait: Duration) -> Option<String> {
        let events = self.events.as_mut()?;
        if wait.is_zero() {
            return events.try_recv().ok();
        }
        timeout(wait, events.recv()).await.ok().flatten()
    }

    async fn stop(&mut self) -> WarrensResult<()> {
        if let Some(mut writer) = self.writer.take() {
            if let Ok(line) = encode_line(&Request { id: 0, body: RequestBody::Bye }) {
                let _ = writer.write_all(line.as_bytes()).await;
            }
            let _ = writer.shutdown().await;
        }
        if let Some(reader) = self.reader.take() {
            reader.abort();
            let _ = reader.await;
        }
        self.events = None;
        self.client = None;
        log::info!("Disconnected from {}", self.addr);
        Ok(())
    }
}

impl Drop for RemoteServer {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}
