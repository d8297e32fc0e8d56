// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! TCP front end: framing, command dispatch and connection handlers
//!
//! Every protocol message is one line: payload bytes terminated by `\n`. The
//! first line of a connection selects the flow (`pwreg` or `auth`); the
//! handler then drives the matching engine, keeping the in-flight session on
//! its own stack. Each read carries a deadline; a connection that stalls is
//! dropped, and the session's secrets are wiped with it.

use crate::channel::SecureChannel;
use crate::errors::ProtocolError;
use crate::keypair::KeyPair;
use crate::messages::{self, AuthMsg1, AuthMsg3, PwRegMsg1, PwRegMsg3};
use crate::opaque::{ServerLogin, ServerRegistration};
use crate::store::UserStore;
use rand::rngs::OsRng;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

/// The flow requested by a connection's first line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Password registration
    PwReg,
    /// Authentication
    Auth,
}

impl Command {
    fn parse(line: &[u8]) -> Result<Self, ProtocolError> {
        match line {
            b"pwreg" => Ok(Command::PwReg),
            b"auth" => Ok(Command::Auth),
            _ => Err(ProtocolError::UnknownCommand),
        }
    }
}

/// Tunables for the TCP front end
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Deadline applied to each inbound read
    pub read_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(30),
        }
    }
}

/// A protocol server instance: long-term keypair, user store and config
///
/// The keypair is generated once at startup and read-only thereafter. The
/// store is shared by all connection handlers; tests inject their own.
pub struct Server {
    keypair: KeyPair,
    store: UserStore,
    config: ServerConfig,
}

impl Server {
    /// Assembles a server from its long-lived parts
    pub fn new(keypair: KeyPair, store: UserStore, config: ServerConfig) -> Self {
        Self {
            keypair,
            store,
            config,
        }
    }

    /// The user store backing this instance
    pub fn store(&self) -> &UserStore {
        &self.store
    }

    /// Accepts connections forever, one handler task per connection
    ///
    /// Handshakes on distinct connections proceed independently; an accept
    /// error is logged and the loop continues, matching the reference
    /// behavior.
    pub async fn run(self: Arc<Self>, listener: TcpListener) {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    let server = Arc::clone(&self);
                    tokio::spawn(async move {
                        server.handle_connection(stream, peer).await;
                    });
                }
                Err(error) => {
                    warn!(%error, "accept failed");
                }
            }
        }
    }

    /// Drives one connection to completion
    pub async fn handle_connection(&self, stream: TcpStream, peer: SocketAddr) {
        debug!(%peer, "got connection");
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        if let Err(error) = self.drive(&mut reader, &mut write_half).await {
            warn!(%peer, %error, "connection failed");
            // Best effort: the peer may already be gone.
            let _ = write_frame(&mut write_half, error.wire_message().as_bytes()).await;
        }
    }

    async fn drive<R, W>(&self, reader: &mut BufReader<R>, writer: &mut W) -> Result<(), ProtocolError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let command = Command::parse(&self.read_frame(reader).await?)?;
        match command {
            Command::PwReg => self.handle_pwreg(reader, writer).await,
            Command::Auth => self.handle_auth(reader, writer).await,
        }
    }

    async fn handle_pwreg<R, W>(
        &self,
        reader: &mut BufReader<R>,
        writer: &mut W,
    ) -> Result<(), ProtocolError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let msg1: PwRegMsg1 = messages::decode(&self.read_frame(reader).await?)?;

        let start = ServerRegistration::start(&mut OsRng, self.keypair.public(), &msg1)?;
        write_frame(writer, &messages::encode(&start.message)?).await?;

        let msg3: PwRegMsg3 = messages::decode(&self.read_frame(reader).await?)?;
        let user = start.state.finish(&msg3)?;

        let username = user.username().to_string();
        self.store.insert(user)?;
        write_frame(writer, b"ok").await?;
        info!(%username, "added user");
        Ok(())
    }

    async fn handle_auth<R, W>(
        &self,
        reader: &mut BufReader<R>,
        writer: &mut W,
    ) -> Result<(), ProtocolError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let msg1: AuthMsg1 = messages::decode(&self.read_frame(reader).await?)?;
        let user = self
            .store
            .lookup(&msg1.username)
            .ok_or(ProtocolError::UnknownUser)?;

        let start = ServerLogin::start(&mut OsRng, &self.keypair, &user, &msg1)?;
        write_frame(writer, &messages::encode(&start.message)?).await?;

        let msg3: AuthMsg3 = messages::decode(&self.read_frame(reader).await?)?;
        let finish = start.state.finish(&msg3)?;
        write_frame(writer, b"ok").await?;
        info!(username = %msg1.username, "authenticated user");

        // Post-handshake channel: one sealed greeting out, one sealed reply in.
        let channel = SecureChannel::new(&finish.session_key)?;
        let greeting = channel.seal_encoded(&mut OsRng, b"Hi client!")?;
        write_frame(writer, greeting.as_bytes()).await?;

        let reply_frame = self.read_frame(reader).await?;
        let reply_line = std::str::from_utf8(&reply_frame).map_err(|_| ProtocolError::BadFrame)?;
        let reply = channel.open_encoded(reply_line)?;
        debug!(len = reply.len(), "received sealed reply");
        Ok(())
    }

    async fn read_frame<R>(&self, reader: &mut BufReader<R>) -> Result<Vec<u8>, ProtocolError>
    where
        R: AsyncRead + Unpin,
    {
        let mut line = Vec::new();
        let read = tokio::time::timeout(
            self.config.read_timeout,
            reader.read_until(b'\n', &mut line),
        )
        .await
        .map_err(|_| ProtocolError::Timeout)?
        .map_err(|_| ProtocolError::BadFrame)?;

        // A well-formed frame ends in the terminator; EOF mid-line does not.
        if read == 0 || line.pop() != Some(b'\n') {
            return Err(ProtocolError::BadFrame);
        }
        Ok(line)
    }
}

async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    writer
        .write_all(payload)
        .await
        .map_err(|_| ProtocolError::BadFrame)?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|_| ProtocolError::BadFrame)?;
    writer.flush().await.map_err(|_| ProtocolError::BadFrame)
}
