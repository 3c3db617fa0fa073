//! The hub as seen by sessions: accepts connections and dispatches lobby commands.
//!
//! Token exchange is answered right here, on the session's own task. Anything that
//! changes the forming-match registry is turned into a message for the [`Hub`] actor.

use std::collections::HashMap;
use std::sync::Arc;

use actix::Addr;
use async_trait::async_trait;
use log::{info, warn};

use super::messages::{LeaveMatch, RequestMatch};
use super::server::Hub;
use crate::auth::CredentialStore;
use crate::config::matchmaking::{MAX_MATCH_SIZE, MIN_MATCH_SIZE};
use crate::protocol::messages::{DisconnectNotice, IdentifyRequest, MatchRequest, Response};
use crate::protocol::{UNRECOGNIZED_REPLY, commands, decode_payload, encode_command, split_command};
use crate::server::session::{FrameHandler, Identity, Session};
use crate::transport::Connection;

/// Lobby command families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HubCommand {
    Identify,
    RequestMatch,
    DisconnectNotify,
}

pub struct HubHandler {
    hub: Addr<Hub>,
    credentials: Arc<dyn CredentialStore>,
    commands: HashMap<&'static str, HubCommand>,
}

impl HubHandler {
    pub fn new(hub: Addr<Hub>, credentials: Arc<dyn CredentialStore>) -> Arc<Self> {
        let commands = HashMap::from([
            (commands::IDENTIFY, HubCommand::Identify),
            (commands::REQUEST_MATCH, HubCommand::RequestMatch),
            (commands::DISCONNECT_NOTIFY, HubCommand::DisconnectNotify),
        ]);
        Arc::new(Self {
            hub,
            credentials,
            commands,
        })
    }

    /// Turns a new connection into a session whose frames come to this handler.
    pub fn accept(self: &Arc<Self>, conn: Connection, peer: impl Into<String>) -> Arc<Session> {
        Session::spawn(conn, peer, Arc::clone(self) as Arc<dyn FrameHandler>)
    }

    fn identify(&self, payload: &str, session: &Arc<Session>) {
        let request: IdentifyRequest = match decode_payload(commands::IDENTIFY, payload) {
            Ok(request) => request,
            Err(e) => {
                warn!("[Hub] {e}");
                return;
            }
        };
        let status = match self.credentials.consume(&request.token) {
            Ok(user_id) => {
                session.set_identity(Identity {
                    id: user_id,
                    token: request.token,
                });
                info!("[Hub] Session {} identified as user {user_id}", session.id());
                0
            }
            Err(e) => {
                warn!("[Hub] Token lookup failed for session {}: {e}", session.id());
                -1
            }
        };
        session.send(encode_command(commands::IDENTIFY, &Response::status(status)));
    }

    fn request_match(&self, payload: &str, session: &Arc<Session>) {
        let request: MatchRequest = match decode_payload(commands::REQUEST_MATCH, payload) {
            Ok(request) => request,
            Err(e) => {
                warn!("[Hub] {e}");
                return;
            }
        };
        if !(MIN_MATCH_SIZE..=MAX_MATCH_SIZE).contains(&request.num_players) {
            warn!(
                "[Hub] Session {} asked for a match of {} players; allowed {MIN_MATCH_SIZE}..={MAX_MATCH_SIZE}",
                session.id(),
                request.num_players
            );
            return;
        }
        info!(
            "[Hub] Session {} requests a {} player match",
            session.id(),
            request.num_players
        );
        self.hub.do_send(RequestMatch {
            num_players: request.num_players,
            session: Arc::clone(session),
        });
    }

    fn disconnect_notify(&self, payload: &str, session: &Arc<Session>) {
        match decode_payload::<DisconnectNotice>(commands::DISCONNECT_NOTIFY, payload) {
            Ok(notice) => info!(
                "[Hub] Client disconnected (session {}, user {}). Cleaning up...",
                session.id(),
                notice.id
            ),
            Err(e) => {
                warn!("[Hub] {e}");
                return;
            }
        }
        self.hub.do_send(LeaveMatch {
            session: Arc::clone(session),
        });
    }
}

#[async_trait]
impl FrameHandler for HubHandler {
    async fn handle_frame(&self, frame: &str, session: &Arc<Session>) {
        let (command, payload) = match split_command(frame) {
            Ok(parts) => parts,
            Err(e) => {
                warn!("[Hub] Dropping frame from session {}: {e}", session.id());
                return;
            }
        };
        match self.commands.get(command) {
            Some(HubCommand::Identify) => self.identify(payload, session),
            Some(HubCommand::RequestMatch) => self.request_match(payload, session),
            Some(HubCommand::DisconnectNotify) => self.disconnect_notify(payload, session),
            None => {
                warn!("[Hub] Unrecognized command: {command}");
                session.send(UNRECOGNIZED_REPLY);
            }
        }
    }
}
