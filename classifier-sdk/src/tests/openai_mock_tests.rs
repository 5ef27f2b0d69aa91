//! Mock tests for the OpenAI classification client
//!
//! These tests use WireMock to simulate the chat completions endpoint and
//! verify the request shape and the mapping of replies onto records and
//! error kinds.

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::config::ClassifierConfig;
    use crate::core::ClassificationClient;
    use crate::error::{ClassifyError, ServiceError};
    use crate::prompt::SYSTEM_INSTRUCTION;
    use crate::resilience::{classify_with_retry, RetryConfig};
    use crate::services::openai::{OpenAIClassifier, UsageTotals};
    use crate::taxonomy::{Category, Recoverable};

    const API_KEY: &str = "mock_api_key_for_testing";

    fn create_test_client(mock_server: &MockServer) -> OpenAIClassifier {
        OpenAIClassifier::new(ClassifierConfig {
            api_key: API_KEY.to_string(),
            base_url: mock_server.uri(),
            model: "gpt-4o-mini".to_string(),
            timeout_seconds: 5,
            ..ClassifierConfig::default()
        })
        .expect("Failed to build classifier")
    }

    fn completion(content: &str) -> serde_json::Value {
        json!({
            "id": "chatcmpl-mock123",
            "object": "chat.completion",
            "created": 1677858242,
            "model": "gpt-4o-mini",
            "usage": {"prompt_tokens": 900, "completion_tokens": 80, "total_tokens": 980},
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }]
        })
    }

    fn valid_content() -> String {
        json!({
            "tipo_experiencia": "Detractor",
            "categoria": "CALIDAD_SOLUCION",
            "causa_principal": "Problema_no_resuelto",
            "detalle_analisis": "NPS 2, no resuelto tras 4 interacciones",
            "emocion_detectada": "frustracion",
            "es_recuperable": "Sí",
            "recomendacion": "Contactar hoy y cerrar el caso"
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_classify_sends_structured_request() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", format!("Bearer {}", API_KEY).as_str()))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "temperature": 0.0,
                "response_format": {"type": "json_object"},
                "messages": [
                    {"role": "system", "content": SYSTEM_INSTRUCTION},
                    {"role": "user", "content": "PROMPT"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(&valid_content())))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let record = client.classify("PROMPT").await.unwrap();

        assert_eq!(record.category(), Some(Category::CalidadSolucion));
        assert_eq!(record.root_cause(), "Problema_no_resuelto");
        assert_eq!(record.recoverable, Some(Recoverable::Yes));
        assert_eq!(client.model(), "gpt-4o-mini");
        assert_eq!(
            client.usage_totals(),
            UsageTotals {
                requests: 1,
                prompt_tokens: 900,
                completion_tokens: 80
            }
        );
    }

    #[tokio::test]
    async fn test_non_json_content_is_malformed() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(completion("Lo siento, no puedo ayudar")),
            )
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let err = client.classify("PROMPT").await.unwrap_err();
        assert!(err.is_malformed());
    }

    #[tokio::test]
    async fn test_missing_keys_and_empty_choices_are_malformed() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion(r#"{"categoria": "OTRO", "causa_principal": "Otro"}"#)),
            )
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        assert!(client.classify("PROMPT").await.unwrap_err().is_malformed());
        assert!(client.classify("PROMPT").await.unwrap_err().is_malformed());
    }

    #[tokio::test]
    async fn test_unreadable_body_is_malformed() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        assert!(client.classify("PROMPT").await.unwrap_err().is_malformed());
    }

    #[tokio::test]
    async fn test_http_errors_map_to_service_errors() {
        let cases = [
            (401, "authentication", "authentication"),
            (403, "authorization", "authorization"),
            (429, "rate_limit", "rate_limit"),
            (500, "service", "server"),
        ];

        for (status, expected, category) in cases {
            let mock_server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/chat/completions"))
                .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                    "error": {"message": format!("status {}", status), "type": "test", "code": "c"}
                })))
                .mount(&mock_server)
                .await;

            let client = create_test_client(&mock_server);
            let err = client.classify("PROMPT").await.unwrap_err();

            let service_err = match err {
                ClassifyError::Service(e) => e,
                other => panic!("expected service error, got {:?}", other),
            };
            assert_eq!(service_err.status_code(), Some(status));
            assert_eq!(service_err.category(), Some(category));
            let kind = match service_err.root() {
                ServiceError::Authentication(_) => "authentication",
                ServiceError::Authorization(_) => "authorization",
                ServiceError::RateLimit(_) => "rate_limit",
                ServiceError::Service(_) => "service",
                other => panic!("unexpected mapping {:?}", other),
            };
            assert_eq!(kind, expected);
        }
    }

    #[tokio::test]
    async fn test_error_message_redacts_keys() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"message": "Incorrect API key provided: sk-abcdefghijklmnop", "type": "invalid_request_error"}
            })))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let message = client.classify("PROMPT").await.unwrap_err().to_string();
        assert!(message.starts_with("Authentication error"));
        assert!(!message.contains("abcdefghijklmnop"));
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_outage() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .up_to_n_times(2)
            .expect(2)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(&valid_content())))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let outcome = classify_with_retry(
            &client,
            "PROMPT",
            &RetryConfig::new(4, std::time::Duration::ZERO),
            "W-1",
        )
        .await;

        assert!(!outcome.is_sentinel());
        assert_eq!(outcome.attempts(), 3);
        assert_eq!(client.usage_totals().requests, 3);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        let client = OpenAIClassifier::new(ClassifierConfig {
            api_key: API_KEY.to_string(),
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_seconds: 2,
            ..ClassifierConfig::default()
        })
        .unwrap();

        match client.classify("PROMPT").await.unwrap_err() {
            ClassifyError::Service(e) => assert!(e.is_transient()),
            other => panic!("expected service error, got {:?}", other),
        }
    }

    #[test]
    fn test_new_rejects_missing_key() {
        assert!(OpenAIClassifier::new(ClassifierConfig::default()).is_err());
    }
}
