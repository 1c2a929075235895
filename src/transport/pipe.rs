//! Pipe transport
//!
//! Transport over an already-connected read/write pair, typically the
//! stdin/stdout pipes of an agent runtime process the caller has spawned.
//! Process bootstrapping is the caller's concern; this layer only carries
//! and frames bytes.

use super::{ChannelCore, Transport};
use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;

/// Transport over a pipe-like byte stream pair
pub struct PipeTransport {
    core: ChannelCore,
}

impl PipeTransport {
    /// Build a transport over a connected writer/reader pair.
    ///
    /// For a spawned runtime process, `writer` is the child's stdin and
    /// `reader` its stdout.
    pub fn new<W, R>(writer: W, reader: R) -> Self
    where
        W: AsyncWrite + Unpin + Send + 'static,
        R: AsyncRead + Unpin + Send + 'static,
    {
        Self {
            core: ChannelCore::start(writer, reader),
        }
    }
}

#[async_trait]
impl Transport for PipeTransport {
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
