use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicU8, Ordering},
    time::Duration,
};

use serde_json::Value;
use shoal_core::{
    CommandId, CommandProgress, CommandState, CountedItems, Credentials, Endpoint, FunctionReply,
    ItemId, QueueState, ServerMsg, SortIndex, WireRequest,
};
use shoal_wire::Connection;

use crate::{
    batch::GroupCall,
    cache::{ResponseCache, DEFAULT_CACHE_CAPACITY},
    error::SessionError,
    ops::{
        GetCommandProgress, GetCommandState, GetCommandValue, GetItem, GetItems, GetPages,
        GetProfile, GetQueueItems, GetQueueState, GetRelatedItems, GetSortIndexes, LibraryView,
        Operation, StartCommand, StopCommand,
    },
};

/// Session construction parameters.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Client identity reported to the server.
    pub name: String,
    /// Initial server endpoint.
    pub endpoint: Endpoint,
    /// Per-exchange transport timeout.
    pub timeout: Duration,
    /// Response cache bound.
    pub cache_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: "shoal-client".to_string(),
            endpoint: Endpoint::default(),
            timeout: Duration::from_secs(10),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// Connection lifecycle. The session is the only writer; everyone else
/// observes snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
    Authenticated = 3,
}

/// Side-effect-free login/connection snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub logged_in: bool,
    pub connected: bool,
}

/// Single authority over the connection lifecycle and the typed
/// operation catalog. One instance per process; share it with `Arc`.
///
/// The inner mutex also serializes outbound batches: at most one wire
/// exchange is in flight at any time.
pub struct Session {
    cache: ResponseCache,
    state: AtomicU8,
    inner: tokio::sync::Mutex<SessionInner>,
}

struct SessionInner {
    endpoint: Endpoint,
    connection: Connection,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let connection = Connection::new(config.name.clone()).with_timeout(config.timeout);
        Self {
            cache: ResponseCache::new(config.cache_capacity),
            state: AtomicU8::new(ConnectionState::Disconnected as u8),
            inner: tokio::sync::Mutex::new(SessionInner {
                endpoint: config.endpoint,
                connection,
            }),
        }
    }

    /// Current connection lifecycle state.
    pub fn state(&self) -> ConnectionState {
        match self.state.load(Ordering::Acquire) {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            3 => ConnectionState::Authenticated,
            _ => ConnectionState::Disconnected,
        }
    }

    /// Login/connection snapshot. Read-only, no side effects.
    pub fn status(&self) -> Status {
        let state = self.state();
        Status {
            logged_in: state == ConnectionState::Authenticated,
            connected: matches!(
                state,
                ConnectionState::Connected | ConnectionState::Authenticated
            ),
        }
    }

    /// The response cache, for explicit invalidation by callers.
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Currently configured endpoint.
    pub async fn endpoint(&self) -> Endpoint {
        self.inner.lock().await.endpoint.clone()
    }

    /// Opens a new grouping scope bound to this session.
    pub fn group(&self) -> GroupCall<'_> {
        GroupCall::new(self)
    }

    /// Connects (if needed) and performs the two-step handshake:
    /// solicit the auth banner, then submit credentials.
    ///
    /// A differing endpoint while connected closes the old connection
    /// first. The new endpoint is retained even when the subsequent
    /// connect fails, so a retry reuses it.
    pub async fn login(
        &self,
        credentials: Credentials,
        endpoint: Option<Endpoint>,
    ) -> Result<ServerMsg, SessionError> {
        let mut inner = self.inner.lock().await;

        if let Some(new_endpoint) = endpoint {
            if inner.connection.is_connected() && new_endpoint != inner.endpoint {
                tracing::info!(
                    old = %inner.endpoint,
                    new = %new_endpoint,
                    "endpoint changed while connected, closing old connection"
                );
                inner.connection.close();
                self.store_state(ConnectionState::Disconnected);
            }
            inner.endpoint = new_endpoint;
        }

        if !inner.connection.is_connected() {
            self.store_state(ConnectionState::Connecting);
            let endpoint = inner.endpoint.clone();
            if let Err(err) = inner.connection.connect(&endpoint).await {
                self.store_state(ConnectionState::Disconnected);
                return Err(err.into());
            }
            self.store_state(ConnectionState::Connected);
        }

        if let Err(err) = inner.connection.request_auth().await {
            self.sync_state(&inner.connection);
            return Err(err.into());
        }

        let reply = match inner.connection.handshake(credentials).await {
            Ok(reply) => reply,
            Err(err) => {
                self.sync_state(&inner.connection);
                return Err(err.into());
            }
        };

        self.store_state(ConnectionState::Authenticated);
        Ok(reply)
    }

    /// Tears the session down: closes the connection and empties the
    /// cache. A later `login` starts fresh against the same endpoint.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        inner.connection.close();
        self.cache.invalidate_all();
        self.store_state(ConnectionState::Disconnected);
    }

    /// Sends one wire batch and validates the reply envelope. Fails
    /// fast when unauthenticated; an envelope-level error rejects the
    /// entire batch.
    pub(crate) async fn send_batch(
        &self,
        requests: Vec<WireRequest>,
    ) -> Result<Vec<FunctionReply>, SessionError> {
        if self.state() != ConnectionState::Authenticated {
            return Err(SessionError::NotAuthenticated);
        }

        let sent = requests.len();
        let mut inner = self.inner.lock().await;
        let reply = match inner.connection.send_batch(requests).await {
            Ok(reply) => reply,
            Err(err) => {
                self.sync_state(&inner.connection);
                return Err(err.into());
            }
        };
        drop(inner);

        if let Some(error) = reply.error.clone() {
            let raw = serde_json::to_value(&reply).unwrap_or(Value::Null);
            return Err(SessionError::remote(error, raw));
        }

        let replies = reply.function_replies().map_err(|err| SessionError::Decode {
            op: "batch reply",
            reason: err.to_string(),
        })?;
        if replies.len() != sent {
            return Err(SessionError::BatchMismatch {
                sent,
                got: replies.len(),
            });
        }
        Ok(replies)
    }

    /// Uniform call protocol: one request, one reply, typed decode.
    /// Cacheable operations are served from the response cache when
    /// possible and populate it after a successful reply.
    pub async fn perform<O: Operation>(&self, op: &O) -> Result<O::Output, SessionError> {
        let request = op.request();
        tracing::debug!(
            op = O::NAME,
            args = %serde_json::Value::Object(request.args.clone()),
            "calling server function"
        );

        let cache_key = O::CACHEABLE.then(|| request.fingerprint());
        if let Some(key) = &cache_key {
            if let Some(hit) = self.cache.get(key) {
                tracing::debug!(op = O::NAME, "response cache hit");
                return O::decode(hit);
            }
        }

        let mut replies = self.send_batch(vec![request]).await?;
        tracing::debug!(op = O::NAME, "received reply");
        let reply = replies.pop().ok_or(SessionError::BatchMismatch { sent: 1, got: 0 })?;

        let data = match reply.error.clone() {
            Some(error) => {
                let raw = serde_json::to_value(&reply).unwrap_or(Value::Null);
                return Err(SessionError::remote(error, raw));
            }
            None => reply.data,
        };

        if let Some(key) = cache_key {
            self.cache.insert(key, data.clone());
        }
        O::decode(data)
    }

    fn store_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Re-derives the lifecycle state after a failed exchange; the
    /// connection drops its link on fatal transport errors.
    fn sync_state(&self, connection: &Connection) {
        let state = if !connection.is_connected() {
            ConnectionState::Disconnected
        } else if connection.is_authenticated() {
            ConnectionState::Authenticated
        } else {
            ConnectionState::Connected
        };
        self.store_state(state);
    }

    // Typed operation catalog.

    pub async fn item(&self, args: GetItem) -> Result<Value, SessionError> {
        self.perform(&args).await
    }

    pub async fn items(&self, args: GetItems) -> Result<CountedItems, SessionError> {
        self.perform(&args).await
    }

    pub async fn related_items(
        &self,
        args: GetRelatedItems,
    ) -> Result<CountedItems, SessionError> {
        self.perform(&args).await
    }

    pub async fn pages(&self, args: GetPages) -> Result<CountedItems, SessionError> {
        self.perform(&args).await
    }

    pub async fn profile(
        &self,
        args: GetProfile,
    ) -> Result<BTreeMap<ItemId, Value>, SessionError> {
        self.perform(&args).await
    }

    pub async fn library(&self, args: LibraryView) -> Result<CountedItems, SessionError> {
        self.perform(&args).await
    }

    pub async fn sort_indexes(&self, args: GetSortIndexes) -> Result<Vec<SortIndex>, SessionError> {
        self.perform(&args).await
    }

    pub async fn start_command(
        &self,
        args: StartCommand,
    ) -> Result<BTreeMap<CommandId, CommandState>, SessionError> {
        self.perform(&args).await
    }

    pub async fn stop_command(
        &self,
        args: StopCommand,
    ) -> Result<BTreeMap<CommandId, CommandState>, SessionError> {
        self.perform(&args).await
    }

    pub async fn command_state(
        &self,
        args: GetCommandState,
    ) -> Result<BTreeMap<CommandId, CommandState>, SessionError> {
        self.perform(&args).await
    }

    pub async fn command_value(
        &self,
        args: GetCommandValue,
    ) -> Result<BTreeMap<CommandId, Value>, SessionError> {
        self.perform(&args).await
    }

    pub async fn command_progress(
        &self,
        args: GetCommandProgress,
    ) -> Result<BTreeMap<CommandId, CommandProgress>, SessionError> {
        self.perform(&args).await
    }

    pub async fn queue_state(&self, args: GetQueueState) -> Result<QueueState, SessionError> {
        self.perform(&args).await
    }

    pub async fn queue_items(&self, args: GetQueueItems) -> Result<CountedItems, SessionError> {
        self.perform(&args).await
    }
}
