//! HTTP and WebSocket routing configuration.
//!
//! `/ws` upgrades a client to a gateway session, `/status` reports the hub's matches.

use actix_web::web;
use crate::server::endpoints::{status, ws_connect};

/// Configure the application's HTTP/WebSocket routes.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/ws").route(web::get().to(ws_connect)))
        .service(web::resource("/status").route(web::get().to(status)));
}
