//! JSON payloads carried after the command segment.

use serde::{Deserialize, Serialize};

/// `clientInfo` request: the credential token to exchange.
#[derive(Deserialize, Debug, Clone)]
pub struct IdentifyRequest {
    #[serde(alias = "Token")]
    pub token: String,
}

/// `newGame` request.
#[derive(Deserialize, Debug, Clone, Copy)]
pub struct MatchRequest {
    #[serde(rename = "numPlayers", alias = "NumPlayers")]
    pub num_players: usize,
}

/// `killClient` notice, synthesized by a session on clean end of stream.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisconnectNotice {
    pub id: i64,
}

/// `chat` payload, both directions.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatPacket {
    pub message: String,
}

/// Status-tagged reply sent to clients.
#[derive(Serialize, Debug, Clone)]
pub struct Response<T> {
    pub status: i32,
    pub payload: Option<T>,
}

impl<T> Response<T> {
    pub fn ok(payload: T) -> Self {
        Self { status: 0, payload: Some(payload) }
    }
}

impl Response<()> {
    pub fn status(status: i32) -> Self {
        Self { status, payload: None }
    }
}

/// Roster sent to the backend when a match commits, in slot order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct InitialRoster {
    pub uids: Vec<i64>,
    pub debug: u8,
}
