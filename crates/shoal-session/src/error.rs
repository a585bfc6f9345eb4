use std::sync::Arc;

use serde_json::Value;
use shoal_core::RemoteError;
use shoal_wire::WireError;
use thiserror::Error;

/// Failures surfaced by session operations. `Clone` so that one
/// transport failure can reject every handle registered in a group
/// scope with the same error.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// Transport-level failure. Never retried by the session; retry
    /// policy belongs to the caller.
    #[error("transport failure: {0}")]
    Transport(Arc<WireError>),
    /// The server answered this call with an error payload. `raw`
    /// carries the originating reply for diagnostics.
    #[error("server error {code}: {message}")]
    Remote {
        /// Numeric remote error code.
        code: i64,
        /// Remote error message.
        message: String,
        /// Full raw reply the error arrived in.
        raw: Arc<Value>,
    },
    /// Operation requires an authenticated session.
    #[error("session is not authenticated")]
    NotAuthenticated,
    /// Registration attempted on a scope that was already flushed.
    #[error("group scope already flushed")]
    ScopeFlushed,
    /// Awaited a handle whose scope was dropped before being flushed.
    #[error("group scope dropped before flush")]
    ScopeDropped,
    /// Reply payload did not match the operation's expected shape.
    #[error("unexpected payload for {op}: {reason}")]
    Decode {
        /// Operation name.
        op: &'static str,
        /// Decoder failure description.
        reason: String,
    },
    /// Batch reply element count did not match the request count.
    #[error("batch reply length mismatch: sent {sent}, got {got}")]
    BatchMismatch {
        /// Number of requests sent.
        sent: usize,
        /// Number of reply elements received.
        got: usize,
    },
}

impl From<WireError> for SessionError {
    fn from(err: WireError) -> Self {
        SessionError::Transport(Arc::new(err))
    }
}

impl SessionError {
    pub(crate) fn remote(error: RemoteError, raw: Value) -> Self {
        SessionError::Remote {
            code: error.code,
            message: error.msg,
            raw: Arc::new(raw),
        }
    }

    /// Remote error code, when this is a remote failure.
    pub fn remote_code(&self) -> Option<i64> {
        match self {
            SessionError::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }
}
