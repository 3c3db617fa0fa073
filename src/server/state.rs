// src/server/state.rs

//! Application state for the gateway's HTTP side.
//!
//! Holds the hub's address and its dispatch face, shared by the HTTP handlers and the
//! socket listener.

use std::sync::Arc;

use actix::Addr;
use crate::server::matchmaking::{Hub, HubHandler};

/// Shared application state, injected into HTTP/WebSocket handlers.
pub struct AppState {
    /// Address of the matchmaking hub actor.
    pub hub: Addr<Hub>,
    /// Entry point for new client connections.
    pub handler: Arc<HubHandler>,
    /// Largest WebSocket frame accepted, in bytes.
    pub frame_limit: usize,
}

impl AppState {
    pub fn new(hub: Addr<Hub>, handler: Arc<HubHandler>, frame_limit: usize) -> Self {
        AppState {
            hub,
            handler,
            frame_limit,
        }
    }
}
