//! Text wire protocol shared by clients, the gateway and the game backend.
//!
//! Frames are `command` or `command:payload`. Frames forwarded to the backend carry the
//! sender's identity as a second segment (`command:id:payload`), and the backend may
//! address a single player the same way.

pub mod frame;
pub mod messages;

pub use frame::{
    FrameError, Routed, decode_payload, encode_command, inject_identity, route_backend_frame,
    split_command,
};

/// Segment delimiter.
pub const DELIMITER: char = ':';

/// Identity that addresses every slot of a match.
pub const BROADCAST_ID: i64 = 0;

/// Reply sent to a client whose command has no registered handler.
pub const UNRECOGNIZED_REPLY: &str = "unrecognized:";

/// Sent to every slot that is not the target of a private backend frame.
/// Clients re-poll their state when they see it.
pub const RESYNC_SENTINEL: &str = "review:now";

/// Client command names.
pub mod commands {
    /// Token exchange.
    pub const IDENTIFY: &str = "clientInfo";
    /// Join (or create) a forming match of the given size.
    pub const REQUEST_MATCH: &str = "newGame";
    /// Synthesized by a session when its client goes away.
    pub const DISCONNECT_NOTIFY: &str = "killClient";
    /// Chat between players of one match; never reaches the backend.
    pub const CHAT: &str = "chat";
    /// Roster sent to the backend once, when a match commits.
    pub const ROSTER: &str = "new";
}
