//! Tests for error handling
//!
//! These tests verify error construction, context layering and the
//! conversions between the service and classification layers.

#[cfg(test)]
mod tests {
    use crate::error::{ClassifyError, ErrorContext, ServiceError};

    #[test]
    fn test_error_display() {
        assert_eq!(
            ServiceError::rate_limit("slow down").to_string(),
            "Rate limit exceeded: slow down"
        );
        assert_eq!(
            ClassifyError::malformed("missing key").to_string(),
            "Malformed response: missing key"
        );

        let wrapped: ClassifyError = ServiceError::timeout("60s").into();
        assert_eq!(wrapped.to_string(), "Timeout error: 60s");
        assert_eq!(wrapped.kind(), "service_error");
        assert!(!wrapped.is_malformed());
    }

    #[test]
    fn test_context_layers() {
        let err = ServiceError::service("boom")
            .with_context(
                ErrorContext::for_service("openai")
                    .status_code(503)
                    .error_code("overloaded")
                    .endpoint("chat/completions")
                    .with("category", "server"),
            )
            .with_context(ErrorContext::for_service("retry").with("case", "42"));

        assert_eq!(err.to_string(), "Service error: boom");
        assert_eq!(err.status_code(), Some(503));
        assert_eq!(err.error_code(), Some("overloaded"));
        assert_eq!(err.category(), Some("server"));
        assert!(matches!(err.root(), ServiceError::Service(_)));
        assert_eq!(ServiceError::service("bare").category(), None);
    }

    #[test]
    fn test_transient_classification() {
        assert!(ServiceError::network("reset").is_transient());
        assert!(ServiceError::timeout("t").is_transient());
        assert!(ServiceError::rate_limit("r").is_transient());
        assert!(!ServiceError::authentication("bad key").is_transient());
        assert!(ServiceError::service("x")
            .with_context(ErrorContext::new())
            .is_transient());

        assert!(ClassifyError::malformed("not json").is_transient());
        assert!(!ClassifyError::from(ServiceError::authorization("denied")).is_transient());
    }

    #[test]
    fn test_context_builder() {
        let mut context = ErrorContext::for_service("openai").request_id("req-1");
        context.add("attempt", 2);
        let context = context.with("case", "A-1");

        assert_eq!(context.service, "openai");
        assert_eq!(context.request_id.as_deref(), Some("req-1"));
        assert_eq!(context.data.get("attempt").map(String::as_str), Some("2"));
        assert_eq!(context.data.get("case").map(String::as_str), Some("A-1"));
        assert!(context.timestamp.is_some());
    }
}
