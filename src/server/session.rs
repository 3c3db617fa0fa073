//! Server-side state of one connected client.
//!
//! Each session runs two tasks:
//! - the inbound pump reads frames and hands them to the session's current
//!   [`FrameHandler`] strictly in order;
//! - the outbound pump drains the session's queue into the connection.
//!
//! The current handler starts as the matchmaking hub and is swapped for the match
//! multiplexer when the match commits. The swap is posted into a one-slot handoff and
//! applied by the inbound pump itself, between two reads, so the handler is never
//! replaced while a frame is being dispatched.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use log::{debug, error, info, warn};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::matchmaking::HANDOFF_CAPACITY;
use crate::protocol::messages::DisconnectNotice;
use crate::protocol::{BROADCAST_ID, commands, encode_command};
use crate::transport::{Connection, FrameReader, FrameWriter};

/// Anything that can take a client frame: the hub before commit, the multiplexer after.
#[async_trait]
pub trait FrameHandler: Send + Sync {
    async fn handle_frame(&self, frame: &str, session: &Arc<Session>);
}

/// User identity resolved by the token exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: i64,
    pub token: String,
}

enum Outbound {
    Frame(String),
    Close,
}

pub struct Session {
    id: Uuid,
    peer: String,
    identity: RwLock<Option<Identity>>,
    outbound: mpsc::UnboundedSender<Outbound>,
    handoff: mpsc::Sender<Arc<dyn FrameHandler>>,
    open: AtomicBool,
}

impl Session {
    /// Wraps `conn` and starts both pumps, with `handler` receiving the first frames.
    pub fn spawn(conn: Connection, peer: impl Into<String>, handler: Arc<dyn FrameHandler>) -> Arc<Self> {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (handoff, handoff_rx) = mpsc::channel(HANDOFF_CAPACITY);
        let session = Arc::new(Self {
            id: Uuid::new_v4(),
            peer: peer.into(),
            identity: RwLock::new(None),
            outbound,
            handoff,
            open: AtomicBool::new(true),
        });
        info!("[Session] {} opened for {}", session.id, session.peer);

        let (reader, writer) = conn.into_split();
        tokio::spawn(inbound_pump(Arc::clone(&session), reader, handoff_rx, handler));
        tokio::spawn(outbound_pump(session.id, writer, outbound_rx));
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn identity(&self) -> Option<Identity> {
        self.identity.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Resolved user id, or the broadcast identity while unresolved.
    pub fn identity_id(&self) -> i64 {
        self.identity
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map_or(BROADCAST_ID, |identity| identity.id)
    }

    pub fn set_identity(&self, identity: Identity) {
        *self.identity.write().unwrap_or_else(|e| e.into_inner()) = Some(identity);
    }

    /// Queues a frame for the client. Frames to a closed session are dropped.
    pub fn send(&self, frame: impl Into<String>) {
        if self.outbound.send(Outbound::Frame(frame.into())).is_err() {
            debug!("[Session] {} outbound queue closed; frame dropped", self.id);
        }
    }

    /// Posts the handler that takes over from the next frame on.
    pub fn retarget(&self, handler: Arc<dyn FrameHandler>) {
        if let Err(e) = self.handoff.try_send(handler) {
            warn!("[Session] {} handler handoff refused: {e}", self.id);
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Marks the session closed and has the outbound pump close the connection once
    /// everything queued so far is written.
    pub fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            let _ = self.outbound.send(Outbound::Close);
            info!("[Session] {} closed", self.id);
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("identity", &self.identity_id())
            .field("open", &self.is_open())
            .finish()
    }
}

/// Frame a session dispatches to itself when its client goes away.
pub fn disconnect_frame(id: i64) -> String {
    encode_command(commands::DISCONNECT_NOTIFY, &DisconnectNotice { id })
}

async fn inbound_pump(
    session: Arc<Session>,
    mut reader: Box<dyn FrameReader>,
    mut handoff: mpsc::Receiver<Arc<dyn FrameHandler>>,
    mut handler: Arc<dyn FrameHandler>,
) {
    loop {
        match reader.read_frame().await {
            Ok(Some(frame)) => {
                if let Ok(next) = handoff.try_recv() {
                    debug!("[Session] {} switched handler", session.id);
                    handler = next;
                }
                debug!("[Session] {} received {frame}", session.id);
                handler.handle_frame(&frame, &session).await;
            }
            Ok(None) => {
                info!("[Session] {} disconnected", session.id);
                let notice = disconnect_frame(session.identity_id());
                handler.handle_frame(&notice, &session).await;
                break;
            }
            Err(e) => {
                // No disconnect notice: a forming match keeps this slot.
                error!("[Session] {} read failed: {e}", session.id);
                break;
            }
        }
    }
    session.close();
}

async fn outbound_pump(
    id: Uuid,
    mut writer: Box<dyn FrameWriter>,
    mut queue: mpsc::UnboundedReceiver<Outbound>,
) {
    while let Some(item) = queue.recv().await {
        match item {
            Outbound::Frame(frame) => {
                if let Err(e) = writer.write_frame(&frame).await {
                    error!("[Session] {id} write failed: {e}");
                    return;
                }
            }
            Outbound::Close => break,
        }
    }
    writer.close().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::memory;
    use std::sync::Mutex;

    /// Records what it sees, tagged with its own name.
    struct Recorder {
        name: &'static str,
        seen: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl FrameHandler for Recorder {
        async fn handle_frame(&self, frame: &str, _session: &Arc<Session>) {
            self.seen.lock().unwrap().push(format!("{}<{}", self.name, frame));
        }
    }

    fn recorder(name: &'static str, seen: &Arc<Mutex<Vec<String>>>) -> Arc<dyn FrameHandler> {
        Arc::new(Recorder {
            name,
            seen: Arc::clone(seen),
        })
    }

    async fn settle() {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }

    #[actix::test]
    async fn frames_reach_handler_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (conn, peer) = memory::pair();
        let _session = Session::spawn(conn, "test", recorder("hub", &seen));

        for frame in ["a:1", "b:2", "c:3"] {
            peer.send(frame);
        }
        settle().await;

        assert_eq!(*seen.lock().unwrap(), vec!["hub<a:1", "hub<b:2", "hub<c:3"]);
    }

    #[actix::test]
    async fn retarget_applies_from_next_frame() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (conn, peer) = memory::pair();
        let session = Session::spawn(conn, "test", recorder("hub", &seen));

        peer.send("a:1");
        settle().await;
        session.retarget(recorder("mux", &seen));
        peer.send("b:2");
        settle().await;

        assert_eq!(*seen.lock().unwrap(), vec!["hub<a:1", "mux<b:2"]);
    }

    #[actix::test]
    async fn clean_end_dispatches_disconnect_notice() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (conn, mut peer) = memory::pair();
        let session = Session::spawn(conn, "test", recorder("hub", &seen));
        session.set_identity(Identity {
            id: 7,
            token: "t".into(),
        });

        peer.hang_up();
        settle().await;

        assert_eq!(*seen.lock().unwrap(), vec!["hub<killClient:{\"id\":7}"]);
        assert!(!session.is_open());
    }

    #[actix::test]
    async fn read_failure_stops_without_notice() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (conn, peer) = memory::pair();
        let session = Session::spawn(conn, "test", recorder("hub", &seen));

        peer.fail("reset by peer");
        settle().await;

        assert!(seen.lock().unwrap().is_empty());
        assert!(!session.is_open());
    }

    #[actix::test]
    async fn queued_frames_are_written_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (conn, mut peer) = memory::pair();
        let session = Session::spawn(conn, "test", recorder("hub", &seen));

        session.send("one:");
        session.send("two:");
        assert_eq!(peer.recv().await.as_deref(), Some("one:"));
        assert_eq!(peer.recv().await.as_deref(), Some("two:"));
    }

    #[actix::test]
    async fn unresolved_identity_reports_broadcast_id() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (conn, _peer) = memory::pair();
        let session = Session::spawn(conn, "test", recorder("hub", &seen));
        assert_eq!(session.identity_id(), BROADCAST_ID);
        assert!(session.identity().is_none());
    }
}
