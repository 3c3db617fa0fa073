//! Per-match relay between the players' sessions and one backend connection.
//!
//! Frames from a slot are tagged with the sender's identity before they reach the
//! backend (`command:id:payload`). Frames from the backend are either broadcast as they
//! are or, when they carry a target identity, delivered stripped to that slot while
//! every other slot gets the resync sentinel.

use std::collections::HashMap;
use std::sync::Arc;

use actix::Recipient;
use async_trait::async_trait;
use log::{debug, error, info, warn};
use uuid::Uuid;

use super::BackendLink;
use crate::protocol::messages::{ChatPacket, InitialRoster, Response};
use crate::protocol::{
    commands, decode_payload, encode_command, inject_identity, route_backend_frame, split_command,
};
use crate::server::matchmaking::messages::MatchClosed;
use crate::server::session::{FrameHandler, Session};
use crate::transport::{Connection, FrameReader};

/// Commands answered inside the gateway instead of being forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LocalCommand {
    Chat,
}

pub struct Multiplexer {
    match_id: Uuid,
    /// Frozen at commit; same order as the roster.
    slots: Vec<Arc<Session>>,
    backend: BackendLink,
    local: HashMap<&'static str, LocalCommand>,
}

impl Multiplexer {
    fn new(match_id: Uuid, slots: Vec<Arc<Session>>, backend: BackendLink) -> Self {
        Self {
            match_id,
            slots,
            backend,
            local: HashMap::from([(commands::CHAT, LocalCommand::Chat)]),
        }
    }

    /// Takes over a freshly committed match.
    ///
    /// Every slot is retargeted to the multiplexer, the backend pump is started and the
    /// roster is written to the backend. When the backend pump ends, `on_close` is told.
    pub async fn start(
        match_id: Uuid,
        slots: Vec<Arc<Session>>,
        conn: Connection,
        roster_debug: u8,
        on_close: Option<Recipient<MatchClosed>>,
    ) -> Arc<Self> {
        let (reader, writer) = conn.into_split();
        let multiplexer = Arc::new(Self::new(match_id, slots, BackendLink::new(writer)));

        for slot in &multiplexer.slots {
            slot.retarget(Arc::clone(&multiplexer) as Arc<dyn FrameHandler>);
        }
        tokio::spawn(backend_pump(Arc::clone(&multiplexer), reader, on_close));
        multiplexer.send_initial_roster(roster_debug).await;
        multiplexer
    }

    /// Identities of the slots, in slot order.
    pub fn roster(&self) -> Vec<i64> {
        self.slots.iter().map(|s| s.identity_id()).collect()
    }

    async fn send_initial_roster(&self, debug: u8) {
        let roster = InitialRoster {
            uids: self.roster(),
            debug,
        };
        let frame = encode_command(commands::ROSTER, &roster);
        match self.backend.write(&frame).await {
            Ok(()) => info!("[Relay] Match {} roster sent: {:?}", self.match_id, roster.uids),
            Err(e) => error!("[Relay] Match {} could not send its roster: {e}", self.match_id),
        }
    }

    pub fn broadcast(&self, frame: &str) {
        for slot in &self.slots {
            slot.send(frame);
        }
    }

    /// Delivers one backend frame to the slots.
    pub fn deliver(&self, frame: &str) {
        let routed = route_backend_frame(frame);
        for slot in &self.slots {
            slot.send(routed.frame_for(slot.identity_id()));
        }
    }

    fn chat(&self, payload: &str, session: &Session) {
        let packet: ChatPacket = match decode_payload(commands::CHAT, payload) {
            Ok(packet) => packet,
            Err(e) => {
                warn!("[Relay] Chat from session {} dropped: {e}", session.id());
                return;
            }
        };
        self.broadcast(&encode_command(commands::CHAT, &Response::ok(packet)));
    }

    async fn forward(&self, command: &str, payload: &str, session: &Session) {
        let frame = inject_identity(command, session.identity_id(), payload);
        if let Err(e) = self.backend.write(&frame).await {
            error!(
                "[Relay] Match {} could not forward `{command}` from session {}: {e}",
                self.match_id,
                session.id()
            );
        }
    }
}

#[async_trait]
impl FrameHandler for Multiplexer {
    async fn handle_frame(&self, frame: &str, session: &Arc<Session>) {
        let (command, payload) = match split_command(frame) {
            Ok(parts) => parts,
            Err(e) => {
                warn!("[Relay] Dropping frame from session {}: {e}", session.id());
                return;
            }
        };
        match self.local.get(command) {
            Some(LocalCommand::Chat) => self.chat(payload, session),
            None => self.forward(command, payload, session).await,
        }
    }
}

async fn backend_pump(
    multiplexer: Arc<Multiplexer>,
    mut reader: Box<dyn FrameReader>,
    on_close: Option<Recipient<MatchClosed>>,
) {
    let match_id = multiplexer.match_id;
    loop {
        match reader.read_frame().await {
            Ok(Some(frame)) => {
                debug!("[Relay] Match {match_id} backend sent {frame}");
                multiplexer.deliver(&frame);
            }
            Ok(None) => {
                info!("[Relay] Match {match_id} backend closed the connection");
                break;
            }
            Err(e) => {
                error!("[Relay] Match {match_id} backend read failed: {e}");
                break;
            }
        }
    }
    multiplexer.backend.close().await;
    if let Some(recipient) = on_close {
        recipient.do_send(MatchClosed { match_id });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::RESYNC_SENTINEL;
    use crate::server::session::Identity;
    use crate::transport::memory;

    struct Ignore;

    #[async_trait]
    impl FrameHandler for Ignore {
        async fn handle_frame(&self, _frame: &str, _session: &Arc<Session>) {}
    }

    struct Table {
        multiplexer: Arc<Multiplexer>,
        players: Vec<memory::Peer>,
        backend: memory::Peer,
    }

    /// A committed match whose slots carry the given identities.
    async fn table(ids: &[i64]) -> Table {
        let mut slots = Vec::new();
        let mut players = Vec::new();
        for &id in ids {
            let (conn, peer) = memory::pair();
            let session = Session::spawn(conn, format!("player-{id}"), Arc::new(Ignore));
            session.set_identity(Identity {
                id,
                token: format!("token-{id}"),
            });
            slots.push(session);
            players.push(peer);
        }
        let (conn, backend) = memory::pair();
        let multiplexer = Multiplexer::start(Uuid::new_v4(), slots, conn, 0, None).await;
        Table {
            multiplexer,
            players,
            backend,
        }
    }

    #[actix::test]
    async fn roster_is_sent_once_in_slot_order() {
        let mut t = table(&[9, 7, 12]).await;
        assert_eq!(
            t.backend.recv().await.as_deref(),
            Some("new:{\"uids\":[9,7,12],\"debug\":0}")
        );
        assert!(t.backend.is_quiet().await);
        assert_eq!(t.multiplexer.roster(), vec![9, 7, 12]);
    }

    #[actix::test]
    async fn player_frames_are_tagged_with_identity() {
        let mut t = table(&[7, 9]).await;
        t.backend.recv().await;

        t.players[1].send("move:{\"x\":1}");
        assert_eq!(t.backend.recv().await.as_deref(), Some("move:9:{\"x\":1}"));
    }

    #[actix::test]
    async fn targeted_backend_frame_resyncs_other_slots() {
        let mut t = table(&[7, 9]).await;
        t.backend.recv().await;

        t.backend.send("cmd:7:hello");
        assert_eq!(t.players[0].recv().await.as_deref(), Some("cmd:hello"));
        assert_eq!(t.players[1].recv().await.as_deref(), Some(RESYNC_SENTINEL));
    }

    #[actix::test]
    async fn untagged_backend_frame_is_broadcast_as_is() {
        let mut t = table(&[7, 9]).await;
        t.backend.recv().await;

        t.backend.send("cmd:hello");
        for player in &mut t.players {
            assert_eq!(player.recv().await.as_deref(), Some("cmd:hello"));
        }
    }

    #[actix::test]
    async fn chat_is_broadcast_and_never_forwarded() {
        let mut t = table(&[7, 9]).await;
        t.backend.recv().await;

        t.players[0].send("chat:{\"message\":\"gg\"}");
        let expected = "chat:{\"status\":0,\"payload\":{\"message\":\"gg\"}}";
        for player in &mut t.players {
            assert_eq!(player.recv().await.as_deref(), Some(expected));
        }
        assert!(t.backend.is_quiet().await);
    }

    #[actix::test]
    async fn malformed_chat_is_dropped() {
        let mut t = table(&[7, 9]).await;
        t.backend.recv().await;

        t.players[0].send("chat:not json");
        assert!(t.players[0].is_quiet().await);
        assert!(t.players[1].is_quiet().await);
        assert!(t.backend.is_quiet().await);
    }

    #[actix::test]
    async fn disconnect_after_commit_reaches_backend_tagged() {
        let mut t = table(&[7, 9]).await;
        t.backend.recv().await;

        // The handoff is applied on the next frame read, so send one first.
        t.players[0].send("ping:{}");
        assert_eq!(t.backend.recv().await.as_deref(), Some("ping:7:{}"));
        t.players[0].hang_up();
        assert_eq!(
            t.backend.recv().await.as_deref(),
            Some("killClient:7:{\"id\":7}")
        );
    }
}
