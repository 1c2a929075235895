//! Session configuration
//!
//! Immutable snapshot consumed by session creation: provider/model
//! selection, the tool set, and handshake policy. Provider fields follow
//! per-field precedence: explicit value > environment-derived value
//! (only when the caller supplies an environment snapshot) > built-in
//! default. The engine itself never reads environment state — callers
//! capture an [`EnvValues`] snapshot once and pass it in.

use crate::tools::ToolDescriptor;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default model per provider
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

const DEFAULT_HANDSHAKE_TIMEOUT_SECS: u64 = 30;

/// A string that never appears in logs or debug output
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Access the secret value (use sparingly — only for the wire)
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl std::fmt::Display for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Serialize for SecretString {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self(String::deserialize(deserializer)?))
    }
}

/// Model provider selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderKind {
    Anthropic,
    OpenAi,
    /// A provider the engine has no built-in defaults for
    Custom(String),
}

impl ProviderKind {
    pub fn as_str(&self) -> &str {
        match self {
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Custom(name) => name,
        }
    }

    fn default_base_url(&self) -> Option<&'static str> {
        match self {
            ProviderKind::Anthropic => Some(DEFAULT_ANTHROPIC_BASE_URL),
            ProviderKind::OpenAi => Some(DEFAULT_OPENAI_BASE_URL),
            ProviderKind::Custom(_) => None,
        }
    }

    fn default_model(&self) -> Option<&'static str> {
        match self {
            ProviderKind::Anthropic => Some(DEFAULT_ANTHROPIC_MODEL),
            ProviderKind::OpenAi => Some(DEFAULT_OPENAI_MODEL),
            ProviderKind::Custom(_) => None,
        }
    }
}

impl Serialize for ProviderKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProviderKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(match s.as_str() {
            "anthropic" => ProviderKind::Anthropic,
            "openai" => ProviderKind::OpenAi,
            _ => ProviderKind::Custom(s),
        })
    }
}

/// Caller-supplied explicit provider fields (BYOK)
#[derive(Debug, Clone, Default)]
pub struct ProviderOverrides {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

/// Environment snapshot captured by the caller.
///
/// Read the process environment once outside the engine and hand the
/// values over; passing `None` to [`ProviderConfig::resolve`] disables
/// environment-derived values entirely.
#[derive(Debug, Clone, Default)]
pub struct EnvValues {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

/// Fully-resolved provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub provider: ProviderKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<SecretString>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ProviderConfig {
    /// Resolve each field independently: explicit > env (when a snapshot
    /// is supplied) > provider default. Partial explicit configuration
    /// still consults env and defaults for the remaining fields.
    pub fn resolve(
        kind: ProviderKind,
        overrides: &ProviderOverrides,
        env: Option<&EnvValues>,
    ) -> Self {
        let api_key = overrides
            .api_key
            .clone()
            .or_else(|| env.and_then(|e| e.api_key.clone()))
            .map(SecretString::from);
        let base_url = overrides
            .base_url
            .clone()
            .or_else(|| env.and_then(|e| e.base_url.clone()))
            .or_else(|| kind.default_base_url().map(str::to_string));
        let model = overrides
            .model
            .clone()
            .or_else(|| env.and_then(|e| e.model.clone()))
            .or_else(|| kind.default_model().map(str::to_string));

        Self {
            provider: kind,
            api_key,
            base_url,
            model,
        }
    }
}

/// Immutable snapshot used to create or resume one session
///
/// Built once with `new()` plus `with_*` methods; a new configuration
/// produces a new session.
#[derive(Debug)]
pub struct SessionConfig {
    pub provider: ProviderConfig,
    pub tools: Vec<ToolDescriptor>,
    pub handshake_timeout: Duration,
    pub client_name: String,
    pub client_version: String,
}

impl SessionConfig {
    pub fn new(provider: ProviderConfig) -> Self {
        Self {
            provider,
            tools: Vec::new(),
            handshake_timeout: Duration::from_secs(DEFAULT_HANDSHAKE_TIMEOUT_SECS),
            client_name: env!("CARGO_PKG_NAME").to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Add one tool to the session's tool set (names must be unique;
    /// duplicates are rejected at session creation)
    pub fn with_tool(mut self, tool: ToolDescriptor) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn with_tools(mut self, tools: impl IntoIterator<Item = ToolDescriptor>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn with_client_info(mut self, name: &str, version: &str) -> Self {
        self.client_name = name.to_string();
        self.client_version = version.to_string();
        self
    }
}
