//! Request/response correlation
//!
//! Maps outstanding request ids to pending completion slots. Each slot
//! resolves exactly once, by a matching response from the far end, by
//! local cancellation, or by `fail_all` when the session shuts down.

use crate::error::{Result, SessionError};
use crate::protocol::JsonRpcError;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// The outcome a pending call resolves with
#[derive(Debug)]
pub enum CallOutcome {
    /// Remote-supplied success value
    Success(Value),
    /// Remote-supplied structured error
    Failure(JsonRpcError),
    /// The session closed before a response arrived
    Closed,
}

struct PendingEntry {
    method: String,
    tx: oneshot::Sender<CallOutcome>,
}

/// Per-session map from outstanding request id to completion slot
#[derive(Default)]
pub struct CorrelationTable {
    pending: Mutex<HashMap<u64, PendingEntry>>,
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an outstanding request and return its completion handle.
    ///
    /// `DuplicateId` means the id generator is broken; callers treat it as
    /// fatal for the session.
    pub fn register(self: &Arc<Self>, id: u64, method: &str) -> Result<PendingCall> {
        let (tx, rx) = oneshot::channel();
        let mut pending = self.pending.lock().unwrap();
        if pending.contains_key(&id) {
            return Err(SessionError::DuplicateId(id));
        }
        pending.insert(
            id,
            PendingEntry {
                method: method.to_string(),
                tx,
            },
        );
        Ok(PendingCall {
            id,
            method: method.to_string(),
            rx,
            table: Arc::clone(self),
        })
    }

    /// Resolve an outstanding call.
    ///
    /// Returns false when `id` is not outstanding (an unsolicited
    /// response: the far end may be buggy, or slow after a local cancel).
    /// A resolution whose caller has already gone away is a logged
    /// warning, never a panic.
    pub fn resolve(&self, id: u64, outcome: CallOutcome) -> bool {
        let entry = self.pending.lock().unwrap().remove(&id);
        match entry {
            Some(entry) => {
                if entry.tx.send(outcome).is_err() {
                    tracing::warn!(
                        "Response for '{}' (id={}) arrived after caller went away",
                        entry.method,
                        id
                    );
                }
                true
            }
            None => false,
        }
    }

    /// Resolve every still-pending call with `Closed` so no caller blocks
    /// forever. Invoked on transport closure and session termination.
    pub fn fail_all(&self) {
        let drained: Vec<(u64, PendingEntry)> =
            self.pending.lock().unwrap().drain().collect();
        if !drained.is_empty() {
            tracing::debug!("Failing {} pending call(s): session closed", drained.len());
        }
        for (_, entry) in drained {
            let _ = entry.tx.send(CallOutcome::Closed);
        }
    }

    /// Number of outstanding calls
    pub fn len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove(&self, id: u64) -> bool {
        self.pending.lock().unwrap().remove(&id).is_some()
    }
}

/// Completion handle for one outstanding request
///
/// Returned synchronously by `Session::send` and resolved exactly once by
/// the dispatcher. Timeouts are caller policy: wrap `wait()` in
/// `tokio::time::timeout` as needed.
pub struct PendingCall {
    id: u64,
    method: String,
    rx: oneshot::Receiver<CallOutcome>,
    table: Arc<CorrelationTable>,
}

impl std::fmt::Debug for PendingCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingCall")
            .field("id", &self.id)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

impl PendingCall {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Wait for resolution.
    ///
    /// The three outcomes stay distinguishable: the remote success value,
    /// a remote structured error (`SessionError::Rpc`), or local closure
    /// (`SessionError::SessionClosed`).
    pub async fn wait(self) -> Result<Value> {
        match self.rx.await {
            Ok(CallOutcome::Success(value)) => Ok(value),
            Ok(CallOutcome::Failure(error)) => Err(SessionError::Rpc {
                code: error.code,
                message: error.message,
                data: error.data,
            }),
            Ok(CallOutcome::Closed) | Err(_) => Err(SessionError::SessionClosed),
        }
    }

    /// Cancel locally. The request is not retracted from the far end; a
    /// late response for this id is then surfaced as an unsolicited
    /// response, not an error.
    pub fn cancel(self) {
        if self.table.remove(self.id) {
            tracing::debug!("Cancelled pending call '{}' (id={})", self.method, self.id);
        }
    }
}
