//! Newline-delimited text frames over TCP.

use std::net::SocketAddr;

use async_trait::async_trait;
use log::{debug, error, info};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};

use super::{Connection, FrameReader, FrameWriter, TransportError};

pub struct LineReader {
    reader: BufReader<OwnedReadHalf>,
    /// Longest accepted frame, newline excluded.
    limit: usize,
    buf: Vec<u8>,
}

pub struct LineWriter {
    half: OwnedWriteHalf,
}

/// Wraps a connected TCP stream. Frames longer than `frame_limit` bytes fail the reader.
pub fn line_connection(stream: TcpStream, frame_limit: usize) -> Connection {
    let (read_half, write_half) = stream.into_split();
    Connection::new(
        LineReader {
            reader: BufReader::new(read_half),
            limit: frame_limit,
            buf: Vec::new(),
        },
        LineWriter { half: write_half },
    )
}

/// Opens a line connection to `addr`.
pub async fn connect(addr: SocketAddr, frame_limit: usize) -> Result<Connection, TransportError> {
    let stream = TcpStream::connect(addr).await?;
    stream.set_nodelay(true)?;
    Ok(line_connection(stream, frame_limit))
}

#[async_trait]
impl FrameReader for LineReader {
    async fn read_frame(&mut self) -> Result<Option<String>, TransportError> {
        self.buf.clear();
        // One byte past the limit leaves room for the newline.
        let cap = self.limit as u64 + 1;
        let n = (&mut self.reader)
            .take(cap)
            .read_until(b'\n', &mut self.buf)
            .await?;
        if n == 0 {
            return Ok(None);
        }
        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        } else if self.buf.len() > self.limit {
            return Err(TransportError::Protocol(format!(
                "frame exceeds {} bytes",
                self.limit
            )));
        }
        // Without a newline and under the limit, the peer closed mid-line: the tail is a frame.
        String::from_utf8(std::mem::take(&mut self.buf))
            .map(Some)
            .map_err(|_| TransportError::Protocol("frame is not valid UTF-8".to_string()))
    }
}

#[async_trait]
impl FrameWriter for LineWriter {
    async fn write_frame(&mut self, frame: &str) -> Result<(), TransportError> {
        if frame.contains('\n') {
            return Err(TransportError::Protocol(
                "frame contains a newline".to_string(),
            ));
        }
        let mut bytes = Vec::with_capacity(frame.len() + 1);
        bytes.extend_from_slice(frame.as_bytes());
        bytes.push(b'\n');
        self.half.write_all(&bytes).await?;
        Ok(())
    }

    async fn close(&mut self) {
        if let Err(e) = self.half.shutdown().await {
            debug!("[Transport] Shutdown of line connection failed: {e}");
        }
    }
}

/// Accepts socket clients forever, handing each connection to `accept`.
pub async fn listen<F>(addr: SocketAddr, frame_limit: usize, accept: F) -> std::io::Result<()>
where
    F: Fn(Connection, String) + Send + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    info!("[Transport] Socket clients listening on {addr}");
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                debug!("[Transport] Socket client connected from {peer}");
                if let Err(e) = stream.set_nodelay(true) {
                    debug!("[Transport] Could not disable Nagle for {peer}: {e}");
                }
                accept(line_connection(stream, frame_limit), peer.to_string());
            }
            Err(e) => error!("[Transport] Could not accept socket client: {e}"),
        }
    }
}
