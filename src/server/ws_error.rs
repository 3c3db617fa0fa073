/// Centralized helper for HTTP error responses.
///
/// Every refusal the gateway answers over HTTP carries the same JSON shape, with a code
/// and a context.
use actix_web::{HttpResponse, http::StatusCode};
use serde::Serialize;

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    code: &'a str,
    message: &'a str,
    context: &'a str,
}

/// Returns an HTTP error response with a JSON body.
///
/// # Arguments
/// - `code`: Unique error code.
/// - `message`: Human-readable error message.
/// - `context`: Optional context string.
/// - `status`: HTTP status code.
pub fn http_error_response(
    code: &str,
    message: &str,
    context: Option<&str>,
    status: StatusCode,
) -> HttpResponse {
    HttpResponse::build(status).json(ErrorBody {
        error: ErrorDetail {
            code,
            message,
            context: context.unwrap_or(""),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix::test]
    async fn error_body_has_code_message_and_context() {
        let response = http_error_response(
            "ORIGIN_MISMATCH",
            "Origin not allowed",
            Some("evil.example"),
            StatusCode::FORBIDDEN,
        );
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "error": {
                    "code": "ORIGIN_MISMATCH",
                    "message": "Origin not allowed",
                    "context": "evil.example"
                }
            })
        );
    }
}
