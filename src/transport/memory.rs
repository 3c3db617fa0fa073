//! In-process connections for tests.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{Connection, FrameReader, FrameWriter, TransportError};

enum Inbound {
    Frame(String),
    Fail(String),
}

struct MemoryReader {
    rx: mpsc::UnboundedReceiver<Inbound>,
}

struct MemoryWriter {
    tx: Option<mpsc::UnboundedSender<String>>,
}

/// Far end of an in-memory connection.
pub struct Peer {
    to_gateway: Option<mpsc::UnboundedSender<Inbound>>,
    from_gateway: mpsc::UnboundedReceiver<String>,
}

/// Creates a connection and the peer that drives it.
pub fn pair() -> (Connection, Peer) {
    let (in_tx, in_rx) = mpsc::unbounded_channel();
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let conn = Connection::new(MemoryReader { rx: in_rx }, MemoryWriter { tx: Some(out_tx) });
    let peer = Peer {
        to_gateway: Some(in_tx),
        from_gateway: out_rx,
    };
    (conn, peer)
}

impl Peer {
    pub fn send(&self, frame: &str) {
        if let Some(tx) = &self.to_gateway {
            let _ = tx.send(Inbound::Frame(frame.to_string()));
        }
    }

    /// Makes the gateway's next read fail with a transport error.
    pub fn fail(&self, reason: &str) {
        if let Some(tx) = &self.to_gateway {
            let _ = tx.send(Inbound::Fail(reason.to_string()));
        }
    }

    /// Ends the stream cleanly.
    pub fn hang_up(&mut self) {
        self.to_gateway = None;
    }

    /// Next frame written by the gateway, or `None` after a second of silence
    /// or once the gateway closed its side.
    pub async fn recv(&mut self) -> Option<String> {
        tokio::time::timeout(Duration::from_secs(1), self.from_gateway.recv())
            .await
            .ok()
            .flatten()
    }

    /// True when no frame arrives within a short grace period.
    pub async fn is_quiet(&mut self) -> bool {
        !matches!(
            tokio::time::timeout(Duration::from_millis(100), self.from_gateway.recv()).await,
            Ok(Some(_))
        )
    }
}

#[async_trait]
impl FrameReader for MemoryReader {
    async fn read_frame(&mut self) -> Result<Option<String>, TransportError> {
        match self.rx.recv().await {
            Some(Inbound::Frame(frame)) => Ok(Some(frame)),
            Some(Inbound::Fail(reason)) => Err(TransportError::Protocol(reason)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl FrameWriter for MemoryWriter {
    async fn write_frame(&mut self, frame: &str) -> Result<(), TransportError> {
        let tx = self.tx.as_ref().ok_or(TransportError::Closed)?;
        tx.send(frame.to_string()).map_err(|_| TransportError::Closed)
    }

    async fn close(&mut self) {
        self.tx = None;
    }
}
