//! Error mapping for the classification service
//!
//! Converts non-success HTTP responses from an OpenAI-compatible endpoint
//! into the normalized `ServiceError` taxonomy.

use reqwest::StatusCode;
use serde_json::Value;

use super::{ErrorContext, ServiceError};
use crate::util::sanitize_for_logging;

/// Map an OpenAI-style error body to a ServiceError
pub fn map_openai_error(
    status: StatusCode,
    json: &Value,
    context: &mut ErrorContext,
) -> ServiceError {
    context.service = "openai".to_string();

    let message = match json.get("error") {
        Some(error) => {
            if let Some(error_type) = error.get("type").and_then(|t| t.as_str()) {
                context.add("error_type", error_type);
            }
            if let Some(code) = error.get("code").and_then(|c| c.as_str()) {
                context.error_code = Some(code.to_string());
            }
            error
                .get("message")
                .and_then(|m| m.as_str())
                .or_else(|| error.as_str())
                .unwrap_or("Unknown OpenAI error")
        }
        None => json
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error"),
    };

    by_status(status, sanitize_for_logging(message))
}

/// Map any HTTP error response to a ServiceError
///
/// JSON bodies go through `map_openai_error`; anything else is reported
/// with the status line and a bounded, redacted excerpt of the body.
pub fn map_http_error(status: StatusCode, body: &str, context: &mut ErrorContext) -> ServiceError {
    context.status_code = Some(status.as_u16());

    if let Ok(json) = serde_json::from_str::<Value>(body) {
        return map_openai_error(status, &json, context);
    }

    let body = sanitize_for_logging(body.trim());
    let message = if body.is_empty() {
        status.to_string()
    } else if body.chars().count() > 100 {
        let excerpt: String = body.chars().take(100).collect();
        format!("{}: {}...", status, excerpt)
    } else {
        format!("{}: {}", status, body)
    };

    by_status(status, message)
}

fn by_status(status: StatusCode, message: String) -> ServiceError {
    match status {
        StatusCode::UNAUTHORIZED => ServiceError::authentication(message),
        StatusCode::FORBIDDEN => ServiceError::authorization(message),
        StatusCode::TOO_MANY_REQUESTS => ServiceError::rate_limit(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ServiceError::timeout(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            ServiceError::validation(message)
        }
        _ => ServiceError::service(message),
    }
}

/// Classify an HTTP status by category, recorded in the error context
pub fn classify_http_error(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 | 422 => "validation",
        401 => "authentication",
        403 => "authorization",
        404 => "not_found",
        408 | 504 => "timeout",
        429 => "rate_limit",
        500..=599 => "server",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_openai_error_body() {
        let mut context = ErrorContext::new();
        let body = json!({"error": {"message": "Rate limit reached", "type": "requests", "code": "rate_limit_exceeded"}});
        let err = map_openai_error(StatusCode::TOO_MANY_REQUESTS, &body, &mut context);

        assert!(matches!(err, ServiceError::RateLimit(_)));
        assert_eq!(context.service, "openai");
        assert_eq!(context.error_code.as_deref(), Some("rate_limit_exceeded"));
    }

    #[test]
    fn test_plain_text_body() {
        let mut context = ErrorContext::new();
        let err = map_http_error(StatusCode::BAD_GATEWAY, "upstream down", &mut context);
        assert!(matches!(err, ServiceError::Service(ref m) if m.contains("upstream down")));
        assert_eq!(context.status_code, Some(502));
    }

    #[test]
    fn test_status_categories() {
        assert_eq!(classify_http_error(StatusCode::UNAUTHORIZED), "authentication");
        assert_eq!(classify_http_error(StatusCode::SERVICE_UNAVAILABLE), "server");
        assert_eq!(classify_http_error(StatusCode::IM_A_TEAPOT), "unknown");
    }
}
