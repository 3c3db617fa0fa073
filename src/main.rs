//! Main entry point for the match gateway.
//!
//! Reads the configuration, starts the matchmaking hub and launches the HTTP server
//! (WebSocket clients, status endpoint) and, when configured, the raw socket listener.

use std::io;
use std::sync::Arc;

use actix::Actor;
use actix_web::{App, HttpServer, web};
use log::{error, info, warn};

use auth::TokenStore;
use config::{ConfigError, GatewayConfig};
use server::matchmaking::messages::StopHub;
use server::matchmaking::{Hub, HubHandler};
use server::relay::TcpBackend;
use transport::{Connection, line};

mod auth;
mod config;
mod protocol;
mod server;
mod transport;

fn load_tokens(config: &GatewayConfig) -> Result<TokenStore, ConfigError> {
    match &config.credentials_path {
        Some(path) => TokenStore::load(path).map_err(|source| ConfigError::Credentials {
            path: path.clone(),
            source,
        }),
        None => {
            warn!("[Gateway] No credentials file configured; every token exchange will fail");
            Ok(TokenStore::default())
        }
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Initialize logger from environment variable (default to info level).
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = GatewayConfig::from_env().map_err(io::Error::other)?;
    let tokens = load_tokens(&config).map_err(io::Error::other)?;
    info!("[Gateway] Game backend at {}", config.backend_addr);

    // The hub owns matchmaking; every client connection is handed to its dispatch face.
    let hub = Hub::new(
        Arc::new(TcpBackend::new(config.backend_addr, config.frame_limit)),
        config.roster_debug,
    )
    .start();
    let handler = HubHandler::new(hub.clone(), Arc::new(tokens));

    if let Some(addr) = config.socket_addr {
        let handler = Arc::clone(&handler);
        let frame_limit = config.frame_limit;
        tokio::spawn(async move {
            let accept = move |conn: Connection, peer: String| {
                handler.accept(conn, peer);
            };
            if let Err(e) = line::listen(addr, frame_limit, accept).await {
                error!("[Gateway] Socket listener on {addr} failed: {e}");
            }
        });
    }

    // Shared application state for HTTP/WebSocket handlers.
    let state = web::Data::new(server::state::AppState::new(
        hub.clone(),
        handler,
        config.frame_limit,
    ));

    info!("[Gateway] Listening on {}", config.http_addr);
    let result = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(crate::server::router::config)
    })
    .bind(config.http_addr)?
    .run()
    .await;

    hub.do_send(StopHub);
    result
}
