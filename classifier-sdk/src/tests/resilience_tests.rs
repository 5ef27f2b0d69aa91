//! Tests for the retry combinator and the retry controller
//!
//! Uses deterministic fake clients with a zero backoff base so no test
//! actually sleeps.

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    use async_trait::async_trait;

    use crate::core::{ClassificationClient, MockClassificationClient};
    use crate::error::{ClassifyError, ServiceError};
    use crate::model::ClassificationRecord;
    use crate::resilience::{classify_with_retry, RetryConfig, RetryExecutor, RetryResult};
    use crate::taxonomy::{Category, ERROR_MARKER};

    fn good_record() -> ClassificationRecord {
        ClassificationRecord::from_model_reply(
            r#"{"tipo_experiencia": "Promotor", "categoria": "ATENCION_CLIENTE",
                "causa_principal": "Atencion_rapida_efectiva", "detalle_analisis": "NPS 10",
                "emocion_detectada": "alegria", "es_recuperable": "Sí",
                "recomendacion": "Reconocer al ejecutivo"}"#,
        )
        .unwrap()
    }

    /// Replays a fixed script of results and counts calls
    struct ScriptedClient {
        script: Mutex<VecDeque<Result<ClassificationRecord, ClassifyError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedClient {
        fn new(script: Vec<Result<ClassificationRecord, ClassifyError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ClassificationClient for ScriptedClient {
        async fn classify(&self, _prompt: &str) -> Result<ClassificationRecord, ClassifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ServiceError::service("script exhausted").into()))
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }

    fn no_wait(max_attempts: u32) -> RetryConfig {
        RetryConfig::new(max_attempts, Duration::ZERO)
    }

    #[tokio::test]
    async fn test_always_failing_client_yields_sentinel_after_budget() {
        let mut client = MockClassificationClient::new();
        client
            .expect_classify()
            .times(4)
            .returning(|_| Err(ServiceError::network("connection reset").into()));

        let outcome = classify_with_retry(&client, "prompt", &no_wait(4), "A-1").await;

        assert!(outcome.is_sentinel());
        assert_eq!(outcome.attempts(), 4);
        let record = outcome.record();
        assert_eq!(record.category_label(), ERROR_MARKER);
        assert_eq!(record.root_cause(), "Network error: connection reset");
        assert!(record.recommendation.is_empty());
    }

    #[tokio::test]
    async fn test_success_on_third_attempt_stops_calling() {
        let client = ScriptedClient::new(vec![
            Err(ServiceError::rate_limit("429").into()),
            Err(ClassifyError::malformed("not json")),
            Ok(good_record()),
            Ok(good_record()),
        ]);

        let outcome = classify_with_retry(&client, "prompt", &no_wait(4), "A-2").await;

        assert!(!outcome.is_sentinel());
        assert_eq!(outcome.attempts(), 3);
        assert_eq!(client.calls(), 3);
        assert_eq!(outcome.record().category(), Some(Category::AtencionCliente));
    }

    #[tokio::test]
    async fn test_malformed_responses_are_retried_like_service_errors() {
        let client = ScriptedClient::new(vec![
            Err(ClassifyError::malformed("missing key categoria")),
            Err(ClassifyError::malformed("unknown categoria 'FOO'")),
        ]);

        let outcome = classify_with_retry(&client, "prompt", &no_wait(2), "A-3").await;

        assert_eq!(client.calls(), 2);
        assert_eq!(
            outcome.into_record().root_cause(),
            "Malformed response: unknown categoria 'FOO'"
        );
    }

    #[tokio::test]
    async fn test_single_attempt_budget() {
        let client = ScriptedClient::new(vec![Err(ServiceError::authentication("bad key").into())]);

        let outcome = classify_with_retry(&client, "prompt", &no_wait(1), "A-4").await;

        assert!(outcome.is_sentinel());
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn test_backoff_is_linear() {
        let executor = RetryExecutor::new(RetryConfig::new(3, Duration::from_millis(20)));
        let start = Instant::now();

        let result: RetryResult<(), String> = executor
            .execute("linear", |attempt| async move { Err(format!("fail {}", attempt)) })
            .await;

        // 20ms after attempt 1, 40ms after attempt 2, none after the last
        assert!(start.elapsed() >= Duration::from_millis(60));
        match result {
            RetryResult::Exhausted { error, attempts } => {
                assert_eq!(attempts, 3);
                assert_eq!(error, "fail 3");
            }
            RetryResult::Success { .. } => panic!("expected exhaustion"),
        }
    }

    #[tokio::test]
    async fn test_executor_passes_attempt_numbers() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let executor = RetryExecutor::new(no_wait(5));

        let seen_in_op = Arc::clone(&seen);
        let result = executor
            .execute("numbers", move |attempt| {
                let seen = Arc::clone(&seen_in_op);
                async move {
                    seen.lock().unwrap().push(attempt);
                    if attempt < 2 {
                        Err("not yet")
                    } else {
                        Ok(attempt * 10)
                    }
                }
            })
            .await;

        assert_eq!(result.into_result(), Ok(20));
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }
}
