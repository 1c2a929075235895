//! Inbound message dispatch
//!
//! The single reader loop per session. Drains the transport's frame
//! sequence, classifies each decoded message, and routes it: responses to
//! the correlation table, tool-call requests to the registry (with the
//! result written back on the serialized write path), notifications to
//! session observers. This task is the only writer of inbound state.

use crate::correlation::{CallOutcome, CorrelationTable};
use crate::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, Message};
use crate::session::SessionState;
use crate::tools::{InvokeError, ToolRegistry};
use crate::transport::Transport;
use bytes::Bytes;
use serde_json::Value;
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Event delivered to session observers
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Fire-and-forget notification from the agent runtime
    Notification {
        method: String,
        params: Option<Value>,
    },
    /// A response arrived for an id that was not outstanding (far end
    /// buggy, or slow after a local cancel). Informational, never fatal.
    UnsolicitedResponse { id: u64 },
    /// The session reached its terminal state
    Closed,
}

pub(crate) type ObserverSet = Mutex<Vec<mpsc::Sender<SessionEvent>>>;

/// Drain the frame sequence until the transport closes, then fail all
/// pending calls and mark the session closed.
pub(crate) async fn run(
    mut frames: mpsc::Receiver<Bytes>,
    table: Arc<CorrelationTable>,
    registry: Arc<ToolRegistry>,
    transport: Arc<dyn Transport>,
    observers: Arc<ObserverSet>,
    state: Arc<RwLock<SessionState>>,
) {
    while let Some(frame) = frames.recv().await {
        let message = match Message::decode(&frame) {
            Ok(message) => message,
            Err(e) => {
                // One bad frame does not take the session down
                tracing::warn!("Skipping malformed frame: {}", e);
                continue;
            }
        };

        match message {
            Message::Response(response) => {
                let id = response.id;
                let outcome = match response.error {
                    Some(error) => CallOutcome::Failure(error),
                    None => CallOutcome::Success(response.result.unwrap_or(Value::Null)),
                };
                if !table.resolve(id, outcome) {
                    tracing::warn!("Unsolicited response for id={}", id);
                    emit(&observers, SessionEvent::UnsolicitedResponse { id });
                }
            }
            Message::Request(request) => {
                handle_request(request, &registry, &transport).await;
            }
            Message::Notification(notification) => {
                emit(
                    &observers,
                    SessionEvent::Notification {
                        method: notification.method,
                        params: notification.params,
                    },
                );
            }
        }
    }

    tracing::debug!("Frame sequence ended, closing session");
    table.fail_all();
    *state.write().unwrap() = SessionState::Closed;
    emit(&observers, SessionEvent::Closed);
}

/// Invoke the named tool and reply on the same id. The far end is blocked
/// awaiting a response, so every request gets one — an unknown method
/// gets a MethodNotFound error rather than silence.
async fn handle_request(
    request: JsonRpcRequest,
    registry: &ToolRegistry,
    transport: &Arc<dyn Transport>,
) {
    let id = request.id;
    let response = match registry.invoke(&request.method, request.params).await {
        Ok(result) => JsonRpcResponse::success(id, result),
        Err(InvokeError::UnknownTool(method)) => {
            tracing::warn!("Inbound request for unknown method: {}", method);
            JsonRpcResponse::failure(id, JsonRpcError::method_not_found(&method))
        }
        Err(e) => JsonRpcResponse::failure(id, e.to_json_rpc()),
    };

    match Message::Response(response).encode() {
        Ok(bytes) => {
            if let Err(e) = transport.send(&bytes).await {
                tracing::warn!("Failed to send tool response for id={}: {}", id, e);
            }
        }
        Err(e) => tracing::error!("Failed to encode tool response for id={}: {}", id, e),
    }
}

/// Deliver an event to every observer. A closed observer is pruned; a
/// slow one drops this event. Either way dispatch continues.
fn emit(observers: &ObserverSet, event: SessionEvent) {
    let mut observers = observers.lock().unwrap();
    observers.retain(|tx| match tx.try_send(event.clone()) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            tracing::warn!("Observer channel full, dropping event");
            true
        }
        Err(TrySendError::Closed(_)) => false,
    });
}
