/// Centralized helpers for WebSocket and HTTP error responses.
///
/// Use these helpers to ensure all error messages are consistent, explicit,
/// and include a code and context.
use actix_web::{HttpResponse, http::StatusCode};

/// Formats a WebSocket error message as a JSON string.
///
/// # Arguments
/// - `code`: Unique error code (e.g. "INVALID_SESSION_ID").
/// - `message`: Human-readable error message.
/// - `context`: Optional context (e.g. player_id, session_id).
pub fn ws_error_message(code: &str, message: &str, context: Option<&str>) -> String {
    let context_str = context.unwrap_or("");
    format!(
        r#"{{"op":"error","data":{{"code":"{}","message":"{}","context":"{}"}}}}"#,
        code, message, context_str
    )
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
    let context_str = context.unwrap_or("");
    let body = format!(
        r#"{{"error":{{"code":"{}","message":"{}","context":"{}"}}}}"#,
        code, message, context_str
    );
    HttpResponse::build(status)
        .content_type("application/json")
        .body(body)
}
