use std::sync::{Mutex, MutexGuard};

use serde_json::Value;
use shoal_core::WireRequest;
use tokio::sync::oneshot;

use crate::{error::SessionError, ops::Operation, session::Session};

type CallResult = Result<Value, SessionError>;

/// Aggregates independently-initiated calls into a single wire batch.
///
/// Call-sites that share a scope share one round-trip: registration
/// never touches the wire, and `flush` sends exactly one batch whose
/// reply is fanned out to every registered handle by position. Scopes
/// are single-use; after a flush the scope is spent.
pub struct GroupCall<'a> {
    session: &'a Session,
    inner: Mutex<ScopeInner>,
}

#[derive(Default)]
struct ScopeInner {
    requests: Vec<WireRequest>,
    slots: Vec<Slot>,
    flushed: bool,
}

struct Slot {
    tx: oneshot::Sender<CallResult>,
    /// Cache key to populate on success, for cacheable operations.
    cache_key: Option<String>,
}

/// Pending result of one registered call. Resolves only once the
/// owning scope is flushed. If the scope is dropped without a flush,
/// awaiting the handle yields `ScopeDropped` instead of hanging.
#[derive(Debug)]
pub struct CallHandle<T> {
    rx: oneshot::Receiver<CallResult>,
    decode: fn(Value) -> Result<T, SessionError>,
}

impl<T> CallHandle<T> {
    /// Waits for the scope flush and decodes this call's slice of the
    /// batch reply.
    pub async fn resolve(self) -> Result<T, SessionError> {
        match self.rx.await {
            Ok(result) => result.and_then(self.decode),
            Err(_) => Err(SessionError::ScopeDropped),
        }
    }
}

impl<'a> GroupCall<'a> {
    pub(crate) fn new(session: &'a Session) -> Self {
        Self {
            session,
            inner: Mutex::new(ScopeInner::default()),
        }
    }

    /// Number of calls waiting for the flush.
    pub fn len(&self) -> usize {
        self.lock().requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().requests.is_empty()
    }

    /// Registers one call against this scope. Safe to call from many
    /// call-sites before the flush. A cache hit for a cacheable
    /// operation resolves the handle immediately and registers
    /// nothing.
    pub fn enqueue<O: Operation>(&self, op: &O) -> Result<CallHandle<O::Output>, SessionError> {
        let request = op.request();
        let (tx, rx) = oneshot::channel();
        let handle = CallHandle {
            rx,
            decode: O::decode,
        };

        let cache_key = O::CACHEABLE.then(|| request.fingerprint());
        if let Some(key) = &cache_key {
            if let Some(hit) = self.session.cache().get(key) {
                tracing::debug!(op = O::NAME, "response cache hit, bypassing batch");
                let _ = tx.send(Ok(hit));
                return Ok(handle);
            }
        }

        let mut inner = self.lock();
        if inner.flushed {
            return Err(SessionError::ScopeFlushed);
        }
        tracing::debug!(
            op = O::NAME,
            args = %serde_json::Value::Object(request.args.clone()),
            position = inner.requests.len(),
            "registered call in group scope"
        );
        inner.requests.push(request);
        inner.slots.push(Slot { tx, cache_key });
        Ok(handle)
    }

    /// Sends the accumulated batch and resolves every handle from the
    /// one reply. An empty scope and a second flush are both no-ops.
    /// When the send fails, every outstanding handle is rejected with
    /// that same error.
    pub async fn flush(&self) -> Result<(), SessionError> {
        let (requests, slots) = {
            let mut inner = self.lock();
            if inner.flushed {
                return Ok(());
            }
            inner.flushed = true;
            (
                std::mem::take(&mut inner.requests),
                std::mem::take(&mut inner.slots),
            )
        };

        if requests.is_empty() {
            return Ok(());
        }

        tracing::debug!(calls = requests.len(), "flushing group scope");
        let replies = match self.session.send_batch(requests).await {
            Ok(replies) => replies,
            Err(err) => {
                for slot in slots {
                    let _ = slot.tx.send(Err(err.clone()));
                }
                return Err(err);
            }
        };

        // send_batch guarantees the counts line up.
        for (slot, reply) in slots.into_iter().zip(replies) {
            let result = match reply.error.clone() {
                Some(error) => {
                    let raw = serde_json::to_value(&reply).unwrap_or(Value::Null);
                    Err(SessionError::remote(error, raw))
                }
                None => {
                    if let Some(key) = slot.cache_key {
                        self.session.cache().insert(key, reply.data.clone());
                    }
                    Ok(reply.data)
                }
            };
            let _ = slot.tx.send(result);
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, ScopeInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
