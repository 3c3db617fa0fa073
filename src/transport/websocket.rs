//! WebSocket clients.
//!
//! actix drives a WebSocket as an actor, while sessions want a plain reader and writer.
//! [`WsBridge`] sits in between: received text frames are pushed into a channel that the
//! session's inbound pump reads, and outgoing frames are delivered to the actor's mailbox.
use actix::prelude::*;
use actix_web::{HttpRequest, HttpResponse, web};
use actix_web_actors::ws;
use async_trait::async_trait;
use log::{debug, warn};
use tokio::sync::mpsc;

use super::{Connection, FrameReader, FrameWriter, TransportError};

enum Inbound {
    Frame(String),
    Failed(String),
}

/// Actor owning one WebSocket.
///
/// Dropping the actor drops the inbound sender, which the reader reports as a clean
/// end of stream.
pub struct WsBridge {
    inbound: mpsc::UnboundedSender<Inbound>,
}

#[derive(Message)]
#[rtype(result = "()")]
struct OutboundText(String);

#[derive(Message)]
#[rtype(result = "()")]
struct CloseSocket;

impl Actor for WsBridge {
    type Context = ws::WebsocketContext<Self>;
}

impl WsBridge {
    fn forward(&self, frame: String, ctx: &mut ws::WebsocketContext<Self>) {
        if self.inbound.send(Inbound::Frame(frame)).is_err() {
            // Nobody reads this socket anymore.
            ctx.stop();
        }
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsBridge {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => self.forward(text.to_string(), ctx),
            Ok(ws::Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                Ok(text) => self.forward(text, ctx),
                Err(_) => warn!("[Transport] Dropping non UTF-8 binary frame"),
            },
            Ok(ws::Message::Ping(payload)) => ctx.pong(&payload),
            Ok(ws::Message::Close(reason)) => {
                debug!("[Transport] WebSocket closed by client: {reason:?}");
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Pong(_)) | Ok(ws::Message::Nop) => {}
            Ok(ws::Message::Continuation(_)) => {
                warn!("[Transport] Fragmented WebSocket frames are not supported");
            }
            Err(e) => {
                let _ = self.inbound.send(Inbound::Failed(e.to_string()));
                ctx.stop();
            }
        }
    }
}

impl Handler<OutboundText> for WsBridge {
    type Result = ();

    fn handle(&mut self, msg: OutboundText, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl Handler<CloseSocket> for WsBridge {
    type Result = ();

    fn handle(&mut self, _msg: CloseSocket, ctx: &mut Self::Context) {
        ctx.close(Some(ws::CloseCode::Normal.into()));
        ctx.stop();
    }
}

pub struct WsReader {
    rx: mpsc::UnboundedReceiver<Inbound>,
}

pub struct WsWriter {
    addr: Addr<WsBridge>,
}

#[async_trait]
impl FrameReader for WsReader {
    async fn read_frame(&mut self) -> Result<Option<String>, TransportError> {
        match self.rx.recv().await {
            Some(Inbound::Frame(frame)) => Ok(Some(frame)),
            Some(Inbound::Failed(reason)) => Err(TransportError::Protocol(reason)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl FrameWriter for WsWriter {
    async fn write_frame(&mut self, frame: &str) -> Result<(), TransportError> {
        if !self.addr.connected() {
            return Err(TransportError::Closed);
        }
        self.addr.do_send(OutboundText(frame.to_string()));
        Ok(())
    }

    async fn close(&mut self) {
        if self.addr.connected() {
            self.addr.do_send(CloseSocket);
        }
    }
}

/// Completes the WebSocket handshake and returns the connection behind it.
///
/// Frames larger than `frame_limit` bytes fail the socket.
pub fn start(
    req: &HttpRequest,
    stream: web::Payload,
    frame_limit: usize,
) -> Result<(Connection, HttpResponse), actix_web::Error> {
    let (tx, rx) = mpsc::unbounded_channel();
    let (addr, response) = ws::WsResponseBuilder::new(WsBridge { inbound: tx }, req, stream)
        .frame_size(frame_limit)
        .start_with_addr()?;
    Ok((Connection::new(WsReader { rx }, WsWriter { addr }), response))
}
