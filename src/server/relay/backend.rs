//! The link between a committed match and the authoritative game backend.

use std::net::SocketAddr;

use async_trait::async_trait;
use log::{debug, info};
use tokio::sync::Mutex;

use crate::transport::{Connection, FrameWriter, TransportError, line};

/// Opens one backend connection per committed match.
#[async_trait]
pub trait BackendConnector: Send + Sync {
    async fn connect(&self) -> Result<Connection, TransportError>;
}

/// Game backend reached over newline-delimited TCP.
#[derive(Debug, Clone)]
pub struct TcpBackend {
    addr: SocketAddr,
    frame_limit: usize,
}

impl TcpBackend {
    pub fn new(addr: SocketAddr, frame_limit: usize) -> Self {
        Self { addr, frame_limit }
    }
}

#[async_trait]
impl BackendConnector for TcpBackend {
    async fn connect(&self) -> Result<Connection, TransportError> {
        let conn = line::connect(self.addr, self.frame_limit).await?;
        info!("[Relay] Connected to game backend at {}", self.addr);
        Ok(conn)
    }
}

/// Sending half of a backend connection, shared by every slot of the match.
///
/// Each session forwards from its own inbound pump, so writes are serialized here
/// and a frame is always written whole.
pub struct BackendLink {
    writer: Mutex<Box<dyn FrameWriter>>,
}

impl BackendLink {
    pub fn new(writer: Box<dyn FrameWriter>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub async fn write(&self, frame: &str) -> Result<(), TransportError> {
        self.writer.lock().await.write_frame(frame).await
    }

    pub async fn close(&self) {
        self.writer.lock().await.close().await;
        debug!("[Relay] Backend writer closed");
    }
}
