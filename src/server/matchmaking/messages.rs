/// Messages accepted by the matchmaking hub, and the status snapshot it answers with.
///
/// Sessions and multiplexers never touch the hub's registry; they post one of these.
use std::sync::Arc;

use actix::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::server::session::Session;

/// Message: seat a session in a forming match of `num_players`.
#[derive(Message)]
#[rtype(result = "()")]
pub struct RequestMatch {
    pub num_players: usize,
    pub session: Arc<Session>,
}

/// Message: a session went away; free its slot if its match is still forming.
#[derive(Message)]
#[rtype(result = "()")]
pub struct LeaveMatch {
    pub session: Arc<Session>,
}

/// Message: the backend link of a committed match is gone.
#[derive(Message)]
#[rtype(result = "()")]
pub struct MatchClosed {
    pub match_id: Uuid,
}

/// Message: snapshot of the hub for the status endpoint.
#[derive(Message)]
#[rtype(result = "HubStats")]
pub struct GetStats;

/// Message: stop the matchmaking worker.
#[derive(Message)]
#[rtype(result = "()")]
pub struct StopHub;

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct FormingStats {
    pub size: usize,
    pub filled: usize,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct CommittedStats {
    pub id: Uuid,
    pub size: usize,
    /// User ids in slot order.
    pub roster: Vec<i64>,
}

#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct HubStats {
    /// Forming matches, by ascending size.
    pub forming: Vec<FormingStats>,
    /// Matches whose backend link is still up.
    pub committed: Vec<CommittedStats>,
}
