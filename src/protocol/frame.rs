//! Frame splitting and identity tagging.

use log::warn;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use super::{BROADCAST_ID, DELIMITER};

/// Errors raised while taking a client frame apart.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The frame has no `:` delimiter.
    #[error("malformed frame: {0}")]
    Malformed(String),
    /// The payload does not have the shape the command expects.
    #[error("cannot decode `{command}` payload: {source}")]
    Decode {
        command: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Splits `command:payload` at the first delimiter.
pub fn split_command(frame: &str) -> Result<(&str, &str), FrameError> {
    frame
        .split_once(DELIMITER)
        .ok_or_else(|| FrameError::Malformed(frame.to_string()))
}

/// Decodes the JSON payload of `command`.
pub fn decode_payload<T: DeserializeOwned>(command: &str, payload: &str) -> Result<T, FrameError> {
    serde_json::from_str(payload).map_err(|source| FrameError::Decode {
        command: command.to_string(),
        source,
    })
}

/// Builds `command:<json>`.
///
/// Serialization of the payload types in this crate cannot fail; should it ever do, the
/// error is logged and the bare command is returned.
pub fn encode_command<T: Serialize>(command: &str, payload: &T) -> String {
    match serde_json::to_string(payload) {
        Ok(body) => format!("{command}{DELIMITER}{body}"),
        Err(e) => {
            warn!("[Protocol] Failed to encode `{command}` payload: {e}");
            format!("{command}{DELIMITER}")
        }
    }
}

/// Inserts the sender's identity: `command:payload` becomes `command:id:payload`.
pub fn inject_identity(command: &str, id: i64, payload: &str) -> String {
    format!("{command}{DELIMITER}{id}{DELIMITER}{payload}")
}

/// Where a frame from the backend has to go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed<'a> {
    /// Deliver the frame untouched to every slot.
    Broadcast(&'a str),
    /// Deliver `frame` (identity stripped) to the slot whose identity is `target`.
    /// A target of [`BROADCAST_ID`] means every slot.
    Targeted { target: i64, frame: String },
}

/// Classifies a backend frame.
///
/// A frame is targeted when it has three segments and the second one parses as an
/// integer. A payload that starts with digits followed by `:` looks exactly like an
/// identity segment; the first integer segment always wins.
pub fn route_backend_frame(frame: &str) -> Routed<'_> {
    let mut parts = frame.splitn(3, DELIMITER);
    let (Some(command), Some(second), Some(rest)) = (parts.next(), parts.next(), parts.next())
    else {
        return Routed::Broadcast(frame);
    };
    match second.parse::<i64>() {
        Ok(target) => Routed::Targeted {
            target,
            frame: format!("{command}{DELIMITER}{rest}"),
        },
        Err(_) => Routed::Broadcast(frame),
    }
}

impl Routed<'_> {
    /// Frame a slot with the given identity receives.
    pub fn frame_for(&self, slot_id: i64) -> &str {
        match self {
            Routed::Broadcast(frame) => *frame,
            Routed::Targeted { target, frame } if *target == BROADCAST_ID || *target == slot_id => {
                frame.as_str()
            }
            Routed::Targeted { .. } => super::RESYNC_SENTINEL,
        }
    }
}
