//! Session state machine
//!
//! A session binds one correlation table, one tool registry, and one
//! transport channel together, and walks `Created → Active → Closing →
//! Closed`. Creation performs the initiating handshake with the agent
//! runtime; resumption replays an existing session id so the far end can
//! restore prior context. Once `Active`, callers issue requests with
//! [`Session::send`] and receive a [`PendingCall`] that the dispatcher
//! resolves when the matching response arrives.

use crate::config::SessionConfig;
use crate::correlation::{CorrelationTable, PendingCall};
use crate::dispatch::{self, ObserverSet, SessionEvent};
use crate::error::{Result, SessionError};
use crate::protocol::{JsonRpcNotification, JsonRpcRequest, Message, PROTOCOL_VERSION};
use crate::tools::ToolRegistry;
use crate::transport::Transport;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Handshake methods understood by the agent runtime
const METHOD_SESSION_NEW: &str = "session/new";
const METHOD_SESSION_RESUME: &str = "session/resume";

const OBSERVER_CAPACITY: usize = 100;

/// Session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport open, handshake not yet confirmed
    Created,
    /// Handshake confirmed; requests may be sent
    Active,
    /// Close requested, draining pending calls
    Closing,
    /// Terminal; all pending calls failed, no further operations
    Closed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Created => "Created",
            SessionState::Active => "Active",
            SessionState::Closing => "Closing",
            SessionState::Closed => "Closed",
        }
    }
}

/// One logical, resumable conversation with an agent runtime
pub struct Session {
    /// Opaque token issued by the far end during the handshake
    session_id: RwLock<Option<String>>,
    state: Arc<RwLock<SessionState>>,
    table: Arc<CorrelationTable>,
    registry: Arc<ToolRegistry>,
    transport: Arc<dyn Transport>,
    next_id: AtomicU64,
    observers: Arc<ObserverSet>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.session_id)
            .field("state", &self.state)
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a fresh session over a connected transport.
    ///
    /// Registers the config's tools, spawns the dispatcher, and performs
    /// the `session/new` handshake. On handshake failure the session
    /// never reaches `Active`: the transport is closed and the error is
    /// returned without retrying.
    pub async fn create(
        config: SessionConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Arc<Self>> {
        Self::start(config, transport, None).await
    }

    /// Resume an existing session by the id the far end issued earlier.
    ///
    /// Same transition as `create`, but the far end supplies prior
    /// context instead of initializing fresh.
    pub async fn resume(
        session_id: &str,
        config: SessionConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Arc<Self>> {
        Self::start(config, transport, Some(session_id.to_string())).await
    }

    async fn start(
        config: SessionConfig,
        transport: Arc<dyn Transport>,
        resume_id: Option<String>,
    ) -> Result<Arc<Self>> {
        let registry = Arc::new(ToolRegistry::new());
        for tool in config.tools {
            registry.register(tool)?;
        }

        let frames = transport.frames().ok_or_else(|| {
            SessionError::Transport("transport frame receiver already taken".to_string())
        })?;

        let session = Arc::new(Self {
            session_id: RwLock::new(None),
            state: Arc::new(RwLock::new(SessionState::Created)),
            table: Arc::new(CorrelationTable::new()),
            registry,
            transport,
            next_id: AtomicU64::new(1),
            observers: Arc::new(Mutex::new(Vec::new())),
        });

        tokio::spawn(dispatch::run(
            frames,
            session.table.clone(),
            session.registry.clone(),
            session.transport.clone(),
            session.observers.clone(),
            session.state.clone(),
        ));

        let method = if resume_id.is_some() {
            METHOD_SESSION_RESUME
        } else {
            METHOD_SESSION_NEW
        };
        let mut params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "clientInfo": {
                "name": config.client_name,
                "version": config.client_version,
            },
            "provider": config.provider,
            "tools": session.registry.definitions(),
        });
        if let Some(id) = &resume_id {
            params["sessionId"] = json!(id);
        }

        let call = session.issue(method, Some(params)).await?;
        let outcome = tokio::time::timeout(config.handshake_timeout, call.wait()).await;
        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => return session.abort_handshake(e.to_string()).await,
            Err(_) => return session.abort_handshake("timed out".to_string()).await,
        };

        let session_id = match result.get("sessionId").and_then(Value::as_str) {
            Some(id) => id.to_string(),
            None => {
                return session
                    .abort_handshake("response missing sessionId".to_string())
                    .await
            }
        };
        *session.session_id.write().unwrap() = Some(session_id.clone());
        *session.state.write().unwrap() = SessionState::Active;

        tracing::info!(
            "Session {} {} ({} tool(s))",
            session_id,
            if resume_id.is_some() { "resumed" } else { "created" },
            session.registry.len()
        );
        Ok(session)
    }

    async fn abort_handshake(&self, reason: String) -> Result<Arc<Self>> {
        let _ = self.transport.close().await;
        self.table.fail_all();
        *self.state.write().unwrap() = SessionState::Closed;
        Err(SessionError::Handshake(reason))
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        *self.state.read().unwrap()
    }

    /// The id issued by the far end, once the handshake has completed
    pub fn session_id(&self) -> Option<String> {
        self.session_id.read().unwrap().clone()
    }

    /// The session's tool registry
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn ensure_active(&self) -> Result<()> {
        let state = self.state();
        if state != SessionState::Active {
            return Err(SessionError::InvalidState {
                expected: "Active",
                actual: state.as_str(),
            });
        }
        Ok(())
    }

    // Register, encode, and write one request. Used by the handshake
    // (state Created) and by send() (state Active).
    async fn issue(&self, method: &str, params: Option<Value>) -> Result<PendingCall> {
        let id = self.next_id();
        let call = self.table.register(id, method)?;
        let bytes = Message::Request(JsonRpcRequest::new(id, method, params)).encode()?;
        if let Err(e) = self.transport.send(&bytes).await {
            call.cancel();
            return Err(e);
        }
        Ok(call)
    }

    /// Send a request to the agent runtime.
    ///
    /// Valid only while `Active`. Returns immediately with a handle that
    /// completes when the dispatcher observes the matching response.
    pub async fn send(&self, method: &str, params: Option<Value>) -> Result<PendingCall> {
        self.ensure_active()?;
        self.issue(method, params).await
    }

    /// Send a fire-and-forget notification (no response expected)
    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        self.ensure_active()?;
        let bytes = Message::Notification(JsonRpcNotification::new(method, params)).encode()?;
        self.transport.send(&bytes).await
    }

    /// Register an observer for notifications and session events
    pub fn subscribe(&self) -> mpsc::Receiver<SessionEvent> {
        let (tx, rx) = mpsc::channel(OBSERVER_CAPACITY);
        self.observers.lock().unwrap().push(tx);
        rx
    }

    /// Observer registration as a `Stream`
    pub fn events(&self) -> ReceiverStream<SessionEvent> {
        ReceiverStream::new(self.subscribe())
    }

    /// Close the session. Idempotent.
    ///
    /// Transitions to `Closing`, closes the transport, fails every
    /// pending call with `SessionClosed`, and lands in `Closed`.
    pub async fn close(&self) -> Result<()> {
        {
            let mut state = self.state.write().unwrap();
            if matches!(*state, SessionState::Closing | SessionState::Closed) {
                return Ok(());
            }
            *state = SessionState::Closing;
        }

        let _ = self.transport.close().await;
        self.table.fail_all();
        *self.state.write().unwrap() = SessionState::Closed;

        tracing::info!(
            "Session {} closed",
            self.session_id().unwrap_or_else(|| "<handshake>".to_string())
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProviderConfig, ProviderKind, ProviderOverrides};
    use crate::transport::PipeTransport;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    fn test_config() -> SessionConfig {
        let provider =
            ProviderConfig::resolve(ProviderKind::Anthropic, &ProviderOverrides::default(), None);
        SessionConfig::new(provider).with_handshake_timeout(Duration::from_secs(2))
    }

    /// Far-end half: answer the first request with a session id
    async fn accept_handshake(far: tokio::io::DuplexStream) -> tokio::io::DuplexStream {
        let (read_half, mut write_half) = tokio::io::split(far);
        let mut reader = BufReader::new(read_half);
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        let request: Value = serde_json::from_str(&line).unwrap();
        let reply = json!({
            "jsonrpc": "2.0",
            "id": request["id"],
            "result": {"sessionId": "sess-test-1"},
        });
        write_half
            .write_all(format!("{}\n", reply).as_bytes())
            .await
            .unwrap();
        reader.into_inner().unsplit(write_half)
    }

    #[tokio::test]
    async fn test_create_reaches_active() {
        let (local, far) = tokio::io::duplex(4096);
        let far_task = tokio::spawn(accept_handshake(far));
        let (read_half, write_half) = tokio::io::split(local);
        let transport = Arc::new(PipeTransport::new(write_half, read_half));

        let session = Session::create(test_config(), transport).await.unwrap();
        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(session.session_id().as_deref(), Some("sess-test-1"));
        let _far = far_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_handshake_timeout_never_reaches_active() {
        let (local, _far) = tokio::io::duplex(4096);
        let (read_half, write_half) = tokio::io::split(local);
        let transport = Arc::new(PipeTransport::new(write_half, read_half));

        let config = test_config().with_handshake_timeout(Duration::from_millis(50));
        let err = Session::create(config, transport).await.unwrap_err();
        assert!(matches!(err, SessionError::Handshake(_)));
    }

    #[tokio::test]
    async fn test_handshake_missing_session_id_fails() {
        let (local, far) = tokio::io::duplex(4096);
        tokio::spawn(async move {
            let (read_half, mut write_half) = tokio::io::split(far);
            let mut reader = BufReader::new(read_half);
            let mut line = String::new();
            reader.read_line(&mut line).await.unwrap();
            let request: Value = serde_json::from_str(&line).unwrap();
            let reply = json!({"jsonrpc": "2.0", "id": request["id"], "result": {}});
            write_half
                .write_all(format!("{}\n", reply).as_bytes())
                .await
                .unwrap();
        });
        let (read_half, write_half) = tokio::io::split(local);
        let transport = Arc::new(PipeTransport::new(write_half, read_half));

        let err = Session::create(test_config(), transport).await.unwrap_err();
        match err {
            SessionError::Handshake(reason) => assert!(reason.contains("sessionId")),
            other => panic!("expected handshake error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_requires_active() {
        let (local, far) = tokio::io::duplex(4096);
        let far_task = tokio::spawn(accept_handshake(far));
        let (read_half, write_half) = tokio::io::split(local);
        let transport = Arc::new(PipeTransport::new(write_half, read_half));

        let session = Session::create(test_config(), transport).await.unwrap();
        let _far = far_task.await.unwrap();

        session.close().await.unwrap();
        let err = session.send("ping", None).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidState {
                expected: "Active",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_close_idempotent_and_fails_pending() {
        let (local, far) = tokio::io::duplex(4096);
        let far_task = tokio::spawn(accept_handshake(far));
        let (read_half, write_half) = tokio::io::split(local);
        let transport = Arc::new(PipeTransport::new(write_half, read_half));

        let session = Session::create(test_config(), transport).await.unwrap();
        let _far = far_task.await.unwrap();

        let a = session.send("task/one", None).await.unwrap();
        let b = session.send("task/two", None).await.unwrap();

        session.close().await.unwrap();
        session.close().await.unwrap();
        assert_eq!(session.state(), SessionState::Closed);

        for call in [a, b] {
            assert!(matches!(
                call.wait().await.unwrap_err(),
                SessionError::SessionClosed
            ));
        }
    }

    #[tokio::test]
    async fn test_ids_unique_and_monotonic() {
        let (local, far) = tokio::io::duplex(4096);
        let far_task = tokio::spawn(accept_handshake(far));
        let (read_half, write_half) = tokio::io::split(local);
        let transport = Arc::new(PipeTransport::new(write_half, read_half));

        let session = Session::create(test_config(), transport).await.unwrap();
        let _far = far_task.await.unwrap();

        let mut seen = std::collections::HashSet::new();
        for _ in 0..10 {
            let call = session.send("ping", None).await.unwrap();
            assert!(seen.insert(call.id()), "id reused: {}", call.id());
            call.cancel();
        }
    }

    #[tokio::test]
    async fn test_duplicate_tool_names_abort_creation() {
        use crate::tools::ToolDescriptor;
        let (local, _far) = tokio::io::duplex(4096);
        let (read_half, write_half) = tokio::io::split(local);
        let transport = Arc::new(PipeTransport::new(write_half, read_half));

        let mk = || {
            ToolDescriptor::from_fn("dup", "d", vec![], |_| async { Ok(json!(null)) })
        };
        let config = test_config().with_tool(mk()).with_tool(mk());
        let err = Session::create(config, transport).await.unwrap_err();
        assert!(matches!(err, SessionError::DuplicateToolName(n) if n == "dup"));
    }

    #[test]
    fn test_state_as_str() {
        assert_eq!(SessionState::Created.as_str(), "Created");
        assert_eq!(SessionState::Closed.as_str(), "Closed");
    }
}
