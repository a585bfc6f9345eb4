use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Server banner sent after a connection is accepted.
pub const MSG_AUTH_REQUIRED: &str = "Authentication Required";
/// Server acknowledgment of a successful handshake.
pub const MSG_AUTHENTICATED: &str = "Authenticated";

/// Remote server address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// Server hostname or address.
    pub host: String,
    /// Server TCP port.
    pub port: u16,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 7007,
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Handshake credentials. Both fields absent means a guest handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Account name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Account password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: Some(user.into()),
            password: Some(password.into()),
        }
    }

    /// Guest credentials: no user, no password.
    pub fn guest() -> Self {
        Self::default()
    }
}

/// Error payload carried by a server envelope or a function reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("server error {code}: {msg}")]
pub struct RemoteError {
    /// Numeric remote error code.
    pub code: i64,
    /// Human-readable remote error message.
    pub msg: String,
}

/// One logical function call. Serializes flat: the function name and
/// its named arguments share a single JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireRequest {
    /// Remote function name.
    pub fname: String,
    /// Named function arguments.
    #[serde(flatten)]
    pub args: Map<String, Value>,
}

impl WireRequest {
    pub fn new(fname: impl Into<String>, args: Map<String, Value>) -> Self {
        Self {
            fname: fname.into(),
            args,
        }
    }

    /// Stable cache key for this call. `serde_json` maps keep keys
    /// sorted, so identical argument sets always print identically.
    pub fn fingerprint(&self) -> String {
        format!("{}:{}", self.fname, Value::Object(self.args.clone()))
    }
}

/// Body of an outbound client envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClientPayload {
    /// An ordered batch of function calls.
    Batch(Vec<WireRequest>),
    /// Handshake credentials.
    Handshake(Credentials),
    /// No payload (auth request).
    None,
}

/// Outbound message envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientMsg {
    /// Session token issued at handshake; empty before authentication.
    #[serde(default)]
    pub session: String,
    /// Client identity, used by the server for diagnostics.
    pub name: String,
    /// Message body.
    pub data: ClientPayload,
}

impl ClientMsg {
    /// A batch of function calls under an authenticated session.
    pub fn batch(session: impl Into<String>, name: impl Into<String>, requests: Vec<WireRequest>) -> Self {
        Self {
            session: session.into(),
            name: name.into(),
            data: ClientPayload::Batch(requests),
        }
    }

    /// The empty-bodied message that solicits the auth banner.
    pub fn auth_request(name: impl Into<String>) -> Self {
        Self {
            session: String::new(),
            name: name.into(),
            data: ClientPayload::None,
        }
    }

    /// The credential-carrying handshake message.
    pub fn handshake(name: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            session: String::new(),
            name: name.into(),
            data: ClientPayload::Handshake(credentials),
        }
    }
}

/// Reply to one function call within a batch reply, position-correlated
/// with the request batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionReply {
    /// Echoed function name.
    #[serde(default)]
    pub fname: String,
    /// Function result payload.
    #[serde(default)]
    pub data: Value,
    /// Per-function error; siblings may still have succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RemoteError>,
}

/// Inbound message envelope. `error` here rejects the entire batch;
/// per-function errors live inside the `data` elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerMsg {
    /// Session token; set by the handshake acknowledgment.
    #[serde(default)]
    pub session: String,
    /// Server identity.
    #[serde(default)]
    pub name: String,
    /// Envelope payload.
    #[serde(default)]
    pub data: Value,
    /// Envelope-level error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RemoteError>,
}

impl ServerMsg {
    /// Interprets the payload as a batch reply.
    pub fn function_replies(&self) -> Result<Vec<FunctionReply>, serde_json::Error> {
        serde_json::from_value(self.data.clone())
    }
}
