use std::time::Duration;

use serde_json::Value;
use shoal_core::{ClientMsg, Credentials, Endpoint, ServerMsg, WireRequest, MSG_AUTHENTICATED};
use tokio::{
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpStream,
    },
    time::timeout,
};

use crate::{
    codec::{decode, encode},
    framing::{write_frame, FrameReader},
    WireError,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Stateful TCP connection to one server endpoint. Exchanges are
/// strictly request/reply: one outbound frame, one inbound frame.
pub struct Connection {
    /// Client identity sent in every envelope.
    name: String,
    /// Per-exchange timeout.
    timeout: Duration,
    /// Session token issued by the handshake; empty until then.
    session: String,
    /// Whether the handshake has been accepted.
    authenticated: bool,
    link: Option<Link>,
}

struct Link {
    writer: OwnedWriteHalf,
    reader: FrameReader<OwnedReadHalf>,
}

impl Connection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timeout: DEFAULT_TIMEOUT,
            session: String::new(),
            authenticated: false,
            link: None,
        }
    }

    /// Overrides the default exchange timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Session token issued by the server; empty before the handshake.
    pub fn session(&self) -> &str {
        &self.session
    }

    /// Opens the TCP stream. Any previous link is dropped first.
    pub async fn connect(&mut self, endpoint: &Endpoint) -> Result<(), WireError> {
        self.close();
        let stream = TcpStream::connect((endpoint.host.as_str(), endpoint.port)).await?;
        let (read_half, write_half) = stream.into_split();
        self.link = Some(Link {
            writer: write_half,
            reader: FrameReader::new(read_half),
        });
        tracing::debug!(endpoint = %endpoint, name = %self.name, "connected to server");
        Ok(())
    }

    /// Solicits the server's auth banner (handshake step one).
    pub async fn request_auth(&mut self) -> Result<ServerMsg, WireError> {
        let msg = ClientMsg::auth_request(self.name.clone());
        self.exchange(&msg).await
    }

    /// Submits credentials (handshake step two). On success the issued
    /// session token is retained for subsequent batches.
    pub async fn handshake(&mut self, credentials: Credentials) -> Result<ServerMsg, WireError> {
        let msg = ClientMsg::handshake(self.name.clone(), credentials);
        let reply = self.exchange(&msg).await?;

        if let Some(err) = &reply.error {
            return Err(WireError::HandshakeRejected(err.clone()));
        }
        if reply.data != Value::String(MSG_AUTHENTICATED.to_string()) {
            return Err(WireError::UnexpectedHandshake(reply.data.to_string()));
        }

        self.session = reply.session.clone();
        self.authenticated = true;
        tracing::debug!(name = %self.name, "handshake accepted");
        Ok(reply)
    }

    /// Sends one batch of function calls and waits for the single
    /// positionally-correlated reply envelope.
    pub async fn send_batch(&mut self, requests: Vec<WireRequest>) -> Result<ServerMsg, WireError> {
        let msg = ClientMsg::batch(self.session.clone(), self.name.clone(), requests);
        self.exchange(&msg).await
    }

    /// Drops the link and forgets the session token.
    pub fn close(&mut self) {
        if self.link.take().is_some() {
            tracing::debug!(name = %self.name, "connection closed");
        }
        self.session.clear();
        self.authenticated = false;
    }

    async fn exchange(&mut self, msg: &ClientMsg) -> Result<ServerMsg, WireError> {
        let link = self.link.as_mut().ok_or(WireError::NotConnected)?;
        let payload = encode(msg)?;

        let result = timeout(self.timeout, async {
            write_frame(&mut link.writer, &payload).await?;
            let frame = link.reader.read_frame().await?;
            decode::<ServerMsg>(&frame)
        })
        .await
        .map_err(|_| WireError::Timeout)
        .and_then(|inner| inner);

        // A failed or timed-out exchange leaves the stream desynced.
        if matches!(
            result,
            Err(WireError::Io(_) | WireError::Disconnected | WireError::Timeout)
        ) {
            self.close();
        }

        result
    }
}
