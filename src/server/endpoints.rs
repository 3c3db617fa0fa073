//! HTTP endpoints: the WebSocket upgrade into a gateway session and the hub status.

use actix_web::http::{StatusCode, header};
use actix_web::{Error, HttpRequest, HttpResponse, error, web};
use log::{info, warn};

use crate::server::matchmaking::messages::GetStats;
use crate::server::state::AppState;
use crate::server::ws_error::http_error_response;
use crate::transport::websocket;

/// True when a browser `Origin` names the host the request was sent to.
///
/// Clients that send no `Origin` at all (game clients, tools) are let through.
pub fn origin_allowed(origin: Option<&str>, host: Option<&str>) -> bool {
    let Some(origin) = origin else {
        return true;
    };
    let Some(host) = host else {
        return false;
    };
    let authority = origin.split_once("://").map_or(origin, |(_, rest)| rest);
    let authority = authority.split('/').next().unwrap_or(authority);
    authority.eq_ignore_ascii_case(host)
}

/// WebSocket endpoint for game clients.
///
/// The upgraded connection becomes a session that talks to the hub first.
pub async fn ws_connect(
    req: HttpRequest,
    stream: web::Payload,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok());
    let host = req.connection_info().host().to_string();
    if !origin_allowed(origin, Some(&host)) {
        warn!("[Gateway] Refused WebSocket from origin {origin:?} (host {host})");
        return Ok(http_error_response(
            "ORIGIN_MISMATCH",
            "Origin not allowed",
            origin,
            StatusCode::FORBIDDEN,
        ));
    }

    let peer = req
        .peer_addr()
        .map_or_else(|| "unknown".to_string(), |addr| addr.to_string());
    let (conn, response) = websocket::start(&req, stream, data.frame_limit)?;
    info!("[Gateway] WebSocket client connected from {peer}");
    data.handler.accept(conn, peer);
    Ok(response)
}

/// Forming and committed matches, as JSON.
pub async fn status(data: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let stats = data
        .hub
        .send(GetStats)
        .await
        .map_err(error::ErrorInternalServerError)?;
    Ok(HttpResponse::Ok().json(stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_origin_is_allowed() {
        assert!(origin_allowed(None, Some("play.example:8080")));
        assert!(origin_allowed(None, None));
    }

    #[test]
    fn origin_must_match_host() {
        assert!(origin_allowed(
            Some("https://play.example:8080"),
            Some("play.example:8080")
        ));
        assert!(origin_allowed(Some("http://Play.Example"), Some("play.example")));
        assert!(!origin_allowed(
            Some("https://evil.example"),
            Some("play.example")
        ));
        assert!(!origin_allowed(
            Some("https://play.example:9090"),
            Some("play.example:8080")
        ));
    }

    #[test]
    fn origin_without_host_is_refused() {
        assert!(!origin_allowed(Some("https://play.example"), None));
    }
}
