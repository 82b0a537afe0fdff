//! # Client Session
//!
//! Server side of one TCP connection. The session reads requests line by
//! line, forwards them to the [`GameHub`] and interleaves replies with the
//! messages pushed to its outbound queue. A broken socket ends this session
//! only; the game and the other clients carry on.

use crate::server::hub::{ClientId, GameHub};
use crate::server::protocol::{decode_line, encode_line, Request, RequestBody, ServerMessage, PROTOCOL_VERSION};
use crate::server::TurnResponse;
use crate::WarrensResult;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Accepted, not yet welcomed
    Listening,
    Connected,
    Closing,
}

pub struct ClientSession {
    hub: Arc<GameHub>,
    client: Option<ClientId>,
    state: SessionState,
    shutdown: watch::Receiver<bool>,
}

impl ClientSession {
    pub fn new(hub: Arc<GameHub>, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            hub,
            client: None,
            state: SessionState::Listening,
            shutdown,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn client_id(&self) -> Option<ClientId> {
        self.client
    }

    /// Serves `stream` until the peer leaves, the socket fails or the server
    /// shuts down.
    pub async fn run(mut self, stream: TcpStream) -> WarrensResult<()> {
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown peer".to_string());
        let (reader, mut writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();

        let (client, mut outbound, snapshot) = self.hub.register()?;
        self.client = Some(client);
        send(
            &mut writer,
            &ServerMessage::Welcome {
                client_id: client,
                protocol_version: PROTOCOL_VERSION,
                snapshot,
            },
        )
        .await?;
        self.state = SessionState::Connected;
        log::info!("Session {} connected from {}", client, peer);

        let mut shutdown = self.shutdown.clone();
        let result = loop {
            if *shutdown.borrow() {
                break Ok(());
            }
            tokio::select! {
                line = lines.next_line() => {
                    let line = match line {
                        Ok(Some(line)) => line,
                        Ok(None) => break Ok(()),
                        Err(e) => break Err(e.into()),
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    match self.handle_line(&line, &mut writer).await {
                        Ok(true) => {}
                        Ok(false) => break Ok(()),
                        Err(e) => break Err(e),
                    }
                }
                message = outbound.recv() => {
                    match message {
                        Some(text) => {
                            if let Err(e) = send(&mut writer, &ServerMessage::Event { text }).await {
                                break Err(e);
                            }
                        }
                        None => break Ok(()),
                    }
                }
                _ = shutdown.changed() => break Ok(()),
            }
        };

        if let Err(e) = &result {
            log::warn!("Session {} from {} dropped: {}", client, peer, e);
        }
        self.close();
        let _ = writer.shutdown().await;
        result
    }

    /// Returns false when the peer said goodbye.
    async fn handle_line<W>(&mut self, line: &str, writer: &mut W) -> WarrensResult<bool>
    where
        W: AsyncWrite + Unpin,
    {
        let client = self.client.unwrap_or_default();
        let request: Request = decode_line(line)?;
        let response = match request.body {
            RequestBody::Play(intent) => self.hub.play(client, intent)?,
            RequestBody::Snapshot => TurnResponse::accepted(self.hub.snapshot()?),
            RequestBody::Say(text) => {
                self.hub.say(client, &text)?;
                TurnResponse::accepted(self.hub.snapshot()?)
            }
            RequestBody::Bye => return Ok(false),
        };
        send(writer, &ServerMessage::Reply { id: request.id, response }).await?;
        Ok(true)
    }

    /// Leaves the hub. Calling it again does nothing.
    pub fn close(&mut self) {
        self.state = SessionState::Closing;
        if let Some(client) = self.client.take() {
            self.hub.unregister(client);
            log::info!("Session {} closed", client);
        }
    }
}

async fn send<W, T>(writer: &mut W, message: &T) -> WarrensResult<()>
where
    W: AsyncWrite + Unpin,
    T: serde::Serialize,
{
    let line = encode_line(message)?;
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
