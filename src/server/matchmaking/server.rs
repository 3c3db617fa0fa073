/// Matchmaking hub actor.
///
/// The hub is the single worker that owns the forming-match registry: every change to it
/// (seating a player, freeing a slot on disconnect, commit) arrives as a message in the
/// hub's mailbox and is applied in order. Sessions never touch the registry themselves.
///
/// At most one match of each size is forming at any time. When it fills, the hub opens
/// a backend link, builds the match multiplexer over the frozen slots and moves on to
/// the next request.

use actix::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use log::{debug, error, info, warn};
use uuid::Uuid;

use super::matches::{CommittedMatch, FormingMatch};
use super::messages::{
    CommittedStats, FormingStats, GetStats, HubStats, LeaveMatch, MatchClosed, RequestMatch,
    StopHub,
};
use crate::server::relay::{BackendConnector, Multiplexer};
use crate::transport::TransportError;

/// Main matchmaking actor.
pub struct Hub {
    /// Forming matches, keyed by requested size.
    forming: HashMap<usize, FormingMatch>,
    /// Matches handed over to a multiplexer.
    committed: Vec<CommittedMatch>,
    /// Sessions holding a slot, forming or committed. A session is seated at most once.
    seated: HashSet<Uuid>,
    /// Opens backend links at commit time.
    backend: Arc<dyn BackendConnector>,
    /// `debug` flag of the commit-time roster.
    roster_debug: u8,
}

impl Hub {
    /// Create a new hub that reaches the game backend through `backend`.
    pub fn new(backend: Arc<dyn BackendConnector>, roster_debug: u8) -> Self {
        Self {
            forming: HashMap::new(),
            committed: Vec::new(),
            seated: HashSet::new(),
            backend,
            roster_debug,
        }
    }

    /// Build the current matchmaking snapshot.
    fn stats(&self) -> HubStats {
        let mut forming: Vec<FormingStats> = self
            .forming
            .values()
            .map(|m| FormingStats {
                size: m.size,
                filled: m.filled(),
            })
            .collect();
        forming.sort_by_key(|m| m.size);
        let committed = self
            .committed
            .iter()
            .map(|m| CommittedStats {
                id: m.id,
                size: m.size,
                roster: m.multiplexer.roster(),
            })
            .collect();
        HubStats { forming, committed }
    }

    /// Freeze a full match and hand its players over to a multiplexer.
    ///
    /// The backend connect is awaited with `ctx.wait`, so no other request is processed
    /// until the commit is done. If the backend cannot be reached the commit is
    /// abandoned and the players keep talking to the hub.
    fn commit(&mut self, forming: FormingMatch, ctx: &mut Context<Self>) {
        let FormingMatch { id, size, slots } = forming;
        let players: Vec<Uuid> = slots.iter().map(|s| s.id()).collect();
        let connector = Arc::clone(&self.backend);
        let on_close = ctx.address().recipient::<MatchClosed>();
        let roster_debug = self.roster_debug;
        info!("[Hub] Match {id} ({size} players) is full, connecting to the game backend");

        let setup = async move {
            let conn = connector.connect().await?;
            let multiplexer =
                Multiplexer::start(id, slots.into_vec(), conn, roster_debug, Some(on_close)).await;
            Ok::<_, TransportError>(multiplexer)
        };

        ctx.wait(setup.into_actor(self).map(move |result, hub, _ctx| match result {
            Ok(multiplexer) => {
                hub.committed.push(CommittedMatch {
                    id,
                    size,
                    players,
                    multiplexer,
                });
                info!("[Hub] Committed match {id}, proxying its messages");
            }
            Err(e) => {
                error!("[Hub] Could not reach the game backend for match {id}: {e}. Its players are left without a route");
                // Never retargeted: they are back in the lobby.
                for player in &players {
                    hub.seated.remove(player);
                }
            }
        }));
    }
}

impl Actor for Hub {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        info!("[Hub] Matchmaking worker started");
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        info!(
            "[Hub] Matchmaking worker stopped ({} forming, {} committed)",
            self.forming.len(),
            self.committed.len()
        );
    }
}

impl Handler<RequestMatch> for Hub {
    type Result = ();

    /// Seats the session in the forming match of the requested size, creating it if needed.
    fn handle(&mut self, msg: RequestMatch, ctx: &mut Self::Context) -> Self::Result {
        let RequestMatch { num_players: size, session } = msg;

        // A session holds at most one slot, until its match is gone.
        if !self.seated.insert(session.id()) {
            warn!("[Hub] Session {} is already seated in a match; request ignored", session.id());
            return;
        }

        let forming = self.forming.entry(size).or_insert_with(|| {
            info!("[Hub] No forming match of size {size}, creating one");
            FormingMatch::new(size)
        });
        forming.slots.push(session);
        let (filled, full) = (forming.filled(), forming.is_full());
        debug!("[Hub] Slotted player into match of size {size} ({filled}/{size})");

        if full {
            if let Some(forming) = self.forming.remove(&size) {
                self.commit(forming, ctx);
            }
        }
    }
}

impl Handler<LeaveMatch> for Hub {
    type Result = ();

    /// Frees the session's slot in its forming match; committed matches are frozen.
    fn handle(&mut self, msg: LeaveMatch, _ctx: &mut Self::Context) -> Self::Result {
        let session_id = msg.session.id();
        self.seated.remove(&session_id);
        let Some((&size, forming)) = self
            .forming
            .iter_mut()
            .find(|(_, m)| m.slots.contains(session_id))
        else {
            debug!("[Hub] Session {session_id} left but holds no forming slot");
            return;
        };

        if let Some(index) = forming.slots.position_of(session_id) {
            forming.slots.remove(index);
        }
        info!(
            "[Hub] Session {session_id} left the match of size {size} ({}/{size})",
            forming.filled()
        );

        if forming.slots.is_empty() {
            self.forming.remove(&size);
            info!("[Hub] Match of size {size} is empty, dropping it");
        }
    }
}

impl Handler<MatchClosed> for Hub {
    type Result = ();

    fn handle(&mut self, msg: MatchClosed, _ctx: &mut Self::Context) -> Self::Result {
        let seated = &mut self.seated;
        self.committed.retain(|m| {
            if m.id != msg.match_id {
                return true;
            }
            for player in &m.players {
                seated.remove(player);
            }
            false
        });
        info!("[Hub] Match {} lost its backend link", msg.match_id);
    }
}

impl Handler<GetStats> for Hub {
    type Result = MessageResult<GetStats>;

    fn handle(&mut self, _msg: GetStats, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.stats())
    }
}

impl Handler<StopHub> for Hub {
    type Result = ();

    fn handle(&mut self, _msg: StopHub, ctx: &mut Self::Context) -> Self::Result {
        ctx.stop();
    }
}
