//! Transport channel abstraction
//!
//! An ordered, reliable, bidirectional byte stream carrying one JSON-RPC
//! message per frame. Frames are newline-delimited JSON: the writer task
//! appends `\n` to each outbound body, the reader task yields one frame
//! per received line. Both concrete variants (pipe and TCP socket) share
//! the same contract and the core is agnostic to which is in use.
//!
//! Writes are serialized through a single writer task: callers hand frames
//! off over an mpsc channel, so at most one write is in flight at a time
//! and framing is never interleaved.

use crate::error::{Result, SessionError};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub mod pipe;
pub mod tcp;

pub use pipe::PipeTransport;
pub use tcp::TcpTransport;

const CHANNEL_CAPACITY: usize = 100;

/// Bidirectional framed byte channel
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one frame body. Fails with `ChannelClosed` after closure.
    async fn send(&self, frame: &[u8]) -> Result<()>;

    /// Take the inbound frame sequence.
    ///
    /// One `Bytes` item per received message boundary, in delivery order.
    /// The receiver can be taken exactly once; later calls return `None`.
    fn frames(&self) -> Option<mpsc::Receiver<Bytes>>;

    /// Close the channel. Idempotent.
    async fn close(&self) -> Result<()>;

    /// Whether the channel is still open for sending
    fn is_connected(&self) -> bool;
}

/// Shared writer/reader task plumbing behind both transport variants
pub(crate) struct ChannelCore {
    /// Hand-off to the single writer task; taken on close
    write_tx: Mutex<Option<mpsc::Sender<Bytes>>>,
    /// Inbound frames; taken once by the dispatcher
    frames_rx: Mutex<Option<mpsc::Receiver<Bytes>>>,
    reader_task: Mutex<Option<JoinHandle<()>>>,
    connected: Arc<AtomicBool>,
}

impl ChannelCore {
    /// Spawn the writer and reader tasks over a connected stream pair
    pub(crate) fn start<W, R>(writer: W, reader: R) -> Self
    where
        W: AsyncWrite + Unpin + Send + 'static,
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (write_tx, mut write_rx) = mpsc::channel::<Bytes>(CHANNEL_CAPACITY);
        let (frames_tx, frames_rx) = mpsc::channel::<Bytes>(CHANNEL_CAPACITY);
        let connected = Arc::new(AtomicBool::new(true));

        // Writer task: the only writer of the outbound stream
        let connected_w = connected.clone();
        let mut writer = writer;
        tokio::spawn(async move {
            while let Some(frame) = write_rx.recv().await {
                if let Err(e) = writer.write_all(&frame).await {
                    tracing::error!("Failed to write frame: {}", e);
                    break;
                }
                if let Err(e) = writer.write_all(b"\n").await {
                    tracing::error!("Failed to write frame delimiter: {}", e);
                    break;
                }
                if let Err(e) = writer.flush().await {
                    tracing::error!("Failed to flush transport: {}", e);
                    break;
                }
            }
            connected_w.store(false, Ordering::SeqCst);
        });

        // Reader task: one frame per line
        let connected_r = connected.clone();
        let reader_task = tokio::spawn(async move {
            let mut reader = BufReader::new(reader);
            let mut line = String::new();

            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        tracing::debug!("Transport stream closed by far end");
                        break;
                    }
                    Ok(_) => {
                        let trimmed = line.trim();
                        if trimmed.is_empty() {
                            continue;
                        }
                        if frames_tx
                            .send(Bytes::copy_from_slice(trimmed.as_bytes()))
                            .await
                            .is_err()
                        {
                            tracing::debug!("Frame receiver dropped, stopping reader");
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!("Failed to read from transport: {}", e);
                        break;
                    }
                }
            }
            connected_r.store(false, Ordering::SeqCst);
        });

        Self {
            write_tx: Mutex::new(Some(write_tx)),
            frames_rx: Mutex::new(Some(frames_rx)),
            reader_task: Mutex::new(Some(reader_task)),
            connected,
        }
    }

    pub(crate) async fn send(&self, frame: &[u8]) -> Result<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(SessionError::ChannelClosed);
        }
        let tx = self
            .write_tx
            .lock()
            .unwrap()
            .clone()
            .ok_or(SessionError::ChannelClosed)?;
        tx.send(Bytes::copy_from_slice(frame))
            .await
            .map_err(|_| SessionError::ChannelClosed)
    }

    pub(crate) fn frames(&self) -> Option<mpsc::Receiver<Bytes>> {
        self.frames_rx.lock().unwrap().take()
    }

    pub(crate) fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
        // Dropping the sender stops the writer task and closes the write half
        self.write_tx.lock().unwrap().take();
        if let Some(task) = self.reader_task.lock().unwrap().take() {
            task.abort();
        }
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
