//! Message-oriented connections.
//!
//! The rest of the gateway only sees a [`Connection`]: a reader that yields whole frames
//! and a writer that sends them. Each half is owned by exactly one pump, so neither needs
//! interior locking.
//!
//! - [`line`]: newline-delimited frames over TCP (game backend, socket clients)
//! - [`websocket`]: text frames over an actix WebSocket

use async_trait::async_trait;
use thiserror::Error;

pub mod line;
pub mod websocket;

#[cfg(test)]
pub mod memory;

/// Errors raised by a connection half.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The other side is gone.
    #[error("connection closed")]
    Closed,
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// The peer violated the framing protocol.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Receiving half of a connection.
#[async_trait]
pub trait FrameReader: Send {
    /// Reads one frame.
    ///
    /// `Ok(None)` is a clean end of stream; `Err` is any other failure.
    async fn read_frame(&mut self) -> Result<Option<String>, TransportError>;
}

/// Sending half of a connection.
#[async_trait]
pub trait FrameWriter: Send {
    async fn write_frame(&mut self, frame: &str) -> Result<(), TransportError>;

    /// Closes the connection. Errors are not interesting at this point.
    async fn close(&mut self);
}

/// An opaque bidirectional message connection.
pub struct Connection {
    pub reader: Box<dyn FrameReader>,
    pub writer: Box<dyn FrameWriter>,
}

impl Connection {
    pub fn new(reader: impl FrameReader + 'static, writer: impl FrameWriter + 'static) -> Self {
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
        }
    }

    pub fn into_split(self) -> (Box<dyn FrameReader>, Box<dyn FrameWriter>) {
        (self.reader, self.writer)
    }
}
