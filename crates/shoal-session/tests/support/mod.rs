//! In-process fake server shared by the session integration tests.

use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use shoal_core::{
    ClientMsg, ClientPayload, Credentials, Endpoint, FunctionReply, ServerMsg, WireRequest,
    MSG_AUTHENTICATED, MSG_AUTH_REQUIRED,
};
use shoal_session::{Session, SessionConfig};
use shoal_wire::{
    codec::{decode, encode},
    framing::{write_frame, FrameReader},
};
use tokio::net::{TcpListener, TcpStream};

/// Decides the reply to one received batch. `None` closes the
/// connection without replying, simulating a dropped transport.
pub type ReplyFn = Arc<dyn Fn(&[WireRequest]) -> Option<Vec<FunctionReply>> + Send + Sync>;

pub struct FakeServer {
    pub endpoint: Endpoint,
    batches: Arc<Mutex<Vec<Vec<WireRequest>>>>,
}

impl FakeServer {
    /// Binds a listener on a free local port and serves connections
    /// with the given batch handler.
    pub async fn spawn<F>(reply: F) -> Self
    where
        F: Fn(&[WireRequest]) -> Option<Vec<FunctionReply>> + Send + Sync + 'static,
    {
        Self::spawn_delayed(reply, std::time::Duration::ZERO).await
    }

    /// Like `spawn`, but waits `delay` before answering each batch,
    /// simulating a slow server.
    #[allow(dead_code)]
    pub async fn spawn_delayed<F>(reply: F, delay: std::time::Duration) -> Self
    where
        F: Fn(&[WireRequest]) -> Option<Vec<FunctionReply>> + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind should succeed");
        let addr = listener.local_addr().expect("local addr");
        let batches: Arc<Mutex<Vec<Vec<WireRequest>>>> = Arc::new(Mutex::new(Vec::new()));
        let reply: ReplyFn = Arc::new(reply);

        let accept_batches = Arc::clone(&batches);
        tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(accepted) => accepted,
                    Err(_) => return,
                };
                tokio::spawn(serve_connection(
                    stream,
                    Arc::clone(&accept_batches),
                    Arc::clone(&reply),
                    delay,
                ));
            }
        });

        Self {
            endpoint: Endpoint {
                host: addr.ip().to_string(),
                port: addr.port(),
            },
            batches,
        }
    }

    /// Number of wire batches received so far.
    pub fn batch_count(&self) -> usize {
        self.batches.lock().expect("lock").len()
    }

    /// Every received batch, in arrival order.
    #[allow(dead_code)]
    pub fn batches(&self) -> Vec<Vec<WireRequest>> {
        self.batches.lock().expect("lock").clone()
    }
}

async fn serve_connection(
    stream: TcpStream,
    batches: Arc<Mutex<Vec<Vec<WireRequest>>>>,
    reply: ReplyFn,
    delay: std::time::Duration,
) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = FrameReader::new(read_half);

    loop {
        let frame = match reader.read_frame().await {
            Ok(frame) => frame,
            Err(_) => return,
        };
        let msg: ClientMsg = match decode(&frame) {
            Ok(msg) => msg,
            Err(_) => return,
        };

        let envelope = match msg.data {
            ClientPayload::None => ServerMsg {
                session: String::new(),
                name: "server".to_string(),
                data: json!(MSG_AUTH_REQUIRED),
                error: None,
            },
            ClientPayload::Handshake(_) => ServerMsg {
                session: "tok".to_string(),
                name: "server".to_string(),
                data: json!(MSG_AUTHENTICATED),
                error: None,
            },
            ClientPayload::Batch(requests) => {
                batches.lock().expect("lock").push(requests.clone());
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                match reply(&requests) {
                    Some(replies) => ServerMsg {
                        session: msg.session,
                        name: "server".to_string(),
                        data: serde_json::to_value(replies).expect("serialize replies"),
                        error: None,
                    },
                    None => return,
                }
            }
        };

        let payload = match encode(&envelope) {
            Ok(payload) => payload,
            Err(_) => return,
        };
        if write_frame(&mut write_half, &payload).await.is_err() {
            return;
        }
    }
}

/// Per-call echo: `{"echo": <args>}` under the request's name.
pub fn echo_reply(requests: &[WireRequest]) -> Option<Vec<FunctionReply>> {
    Some(
        requests
            .iter()
            .map(|request| FunctionReply {
                fname: request.fname.clone(),
                data: json!({"echo": Value::Object(request.args.clone())}),
                error: None,
            })
            .collect(),
    )
}

/// Builds a session against the fake server and logs in as guest.
pub async fn authenticated_session(server: &FakeServer) -> Arc<Session> {
    let session = Arc::new(Session::new(SessionConfig {
        endpoint: server.endpoint.clone(),
        ..SessionConfig::default()
    }));
    session
        .login(Credentials::guest(), None)
        .await
        .expect("login should succeed");
    session
}
