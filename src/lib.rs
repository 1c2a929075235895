//! # agent-session
//!
//! Bidirectional JSON-RPC session engine for driving an out-of-process
//! agent runtime over stdio pipes or TCP.
//!
//! ## Overview
//!
//! `agent-session` manages the full lifecycle of a conversation with an
//! agent runtime: it opens a framed transport, performs the session
//! handshake, multiplexes any number of in-flight requests over one
//! channel, correlates asynchronous responses back to their callers, and
//! dispatches the runtime's tool-call requests to locally registered,
//! schema-validated handlers.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use agent_session::{
//!     ProviderConfig, ProviderKind, ProviderOverrides, Session, SessionConfig,
//!     TcpTransport, ToolDescriptor, ToolParam,
//! };
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> agent_session::Result<()> {
//! let add = ToolDescriptor::from_fn(
//!     "add",
//!     "Add two numbers",
//!     vec![ToolParam::number("a"), ToolParam::number("b")],
//!     |args| async move {
//!         let a = args["a"].as_f64().unwrap_or(0.0);
//!         let b = args["b"].as_f64().unwrap_or(0.0);
//!         Ok(json!(a + b))
//!     },
//! );
//!
//! let provider = ProviderConfig::resolve(
//!     ProviderKind::Anthropic,
//!     &ProviderOverrides::default(),
//!     None,
//! );
//! let transport = Arc::new(TcpTransport::connect("127.0.0.1:9100").await?);
//! let session = Session::create(SessionConfig::new(provider).with_tool(add), transport).await?;
//!
//! let answer = session.send("prompt/send", Some(json!({"text": "hello"}))).await?;
//! println!("{}", answer.wait().await?);
//! session.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **Transport** trait — framed byte channel; [`PipeTransport`] and
//!   [`TcpTransport`] ship in-crate
//! - **CorrelationTable** — maps in-flight request ids to waiting callers
//! - **ToolRegistry** — registered tools with derived JSON Schemas and
//!   argument validation before every invocation
//! - **Session** — state machine (`Created → Active → Closing → Closed`)
//!   tying transport, correlation, and dispatch together
//! - **SessionEvent** — notifications and lifecycle events for observers

pub mod config;
pub mod correlation;
pub mod dispatch;
pub mod error;
pub mod protocol;
pub mod session;
pub mod tools;
pub mod transport;

// Re-export core types
pub use config::{
    EnvValues, ProviderConfig, ProviderKind, ProviderOverrides, SecretString, SessionConfig,
};
pub use correlation::{CallOutcome, CorrelationTable, PendingCall};
pub use dispatch::SessionEvent;
pub use error::{Result, SessionError};
pub use protocol::{
    JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, Message, PROTOCOL_VERSION,
};
pub use session::{Session, SessionState};
pub use tools::{
    InvokeError, ParamType, ToolDefinition, ToolDescriptor, ToolHandler, ToolParam, ToolRegistry,
};
pub use transport::{PipeTransport, TcpTransport, Transport};
