// src/server/mod.rs

//! Server layer root module.
//!
//! This module organizes the gateway's server components, including:
//! - Client sessions and their frame pumps
//! - Matchmaking (hub actor, lobby command dispatch)
//! - Relay of committed matches to the game backend
//! - HTTP state, routing and endpoints

pub mod state;
pub mod router;
pub mod endpoints;
pub mod session;
pub mod matchmaking;
pub mod relay;
pub mod ws_error;
