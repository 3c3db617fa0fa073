/// Matchmaking configuration constants.
/// 
/// This module defines the bounds the matchmaking worker enforces on match requests.

/// Smallest match a client may ask for.
pub const MIN_MATCH_SIZE: usize = 1;

/// Largest match a client may ask for.
pub const MAX_MATCH_SIZE: usize = 16;

/// Pending handler handoffs a session can hold. A session is retargeted at most once.
pub const HANDOFF_CAPACITY: usize = 1;
