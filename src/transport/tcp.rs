//! TCP transport
//!
//! Transport over a TCP socket to an agent runtime listening on a port.
//! Satisfies the same contract as the pipe variant; the session engine
//! does not care which is in use.

use super::{ChannelCore, Transport};
use crate::error::{Result, SessionError};
use async_trait::async_trait;
use bytes::Bytes;
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::mpsc;

/// Transport over a TCP socket
pub struct TcpTransport {
    core: ChannelCore,
}

impl TcpTransport {
    /// Build a transport over an already-connected socket
    pub fn from_stream(stream: TcpStream) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self {
            core: ChannelCore::start(write_half, read_half),
        }
    }

    /// Connect to an agent runtime and build a transport over the socket
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| SessionError::Transport(format!("TCP connect failed: {}", e)))?;
        Ok(Self::from_stream(stream))
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send(&self, frame: &[u8]) -> Result<()> {
        self.core.send(frame).await
    }

    fn frames(&self) -> Option<mpsc::Receiver<Bytes>> {
        self.core.frames()
    }

    async fn close(&self) -> Result<()> {
        self.core.close();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.core.is_connected()
    }
}
