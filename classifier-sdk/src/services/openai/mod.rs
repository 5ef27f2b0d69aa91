//! OpenAI-compatible classification client
//!
//! One `classify` call is one POST to `{base_url}/chat/completions` with a
//! fixed system instruction, zero temperature and a JSON-object response
//! format. The reply content is parsed into a `ClassificationRecord`.

mod models;
pub use models::*;

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{header, Client};

use crate::config::ClassifierConfig;
use crate::core::ClassificationClient;
use crate::error::{ClassifyError, ErrorContext, Result, ServiceError};
use crate::model::ClassificationRecord;
use crate::prompt::SYSTEM_INSTRUCTION;
use crate::services::common::{build_http_client, parse_error_response, UserAgent};
use crate::util::{generate_request_id, measure_time_async, sanitize_for_logging, truncate_string};

const ENDPOINT: &str = "chat/completions";

/// Running totals reported by the service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageTotals {
    pub requests: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// Classification client for OpenAI-compatible chat completion APIs
pub struct OpenAIClassifier {
    http_client: Client,
    config: ClassifierConfig,
    requests: AtomicU64,
    prompt_tokens: AtomicU64,
    completion_tokens: AtomicU64,
}

impl OpenAIClassifier {
    /// Create a client from validated configuration
    pub fn new(config: ClassifierConfig) -> Result<Self> {
        config.validate()?;

        let http_client = build_http_client(
            Some(UserAgent {
                extra: Some("OpenAI-Classifier".to_string()),
                ..UserAgent::default()
            }),
            Some(config.timeout()),
        )?;

        Ok(Self {
            http_client,
            config,
            requests: AtomicU64::new(0),
            prompt_tokens: AtomicU64::new(0),
            completion_tokens: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Request body for one prompt
    pub fn build_request(&self, prompt: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage::system(SYSTEM_INSTRUCTION), ChatMessage::user(prompt)],
            temperature: 0.0,
            response_format: Some(ResponseFormat::json_object()),
        }
    }

    /// Usage accumulated over the lifetime of this client
    pub fn usage_totals(&self) -> UsageTotals {
        UsageTotals {
            requests: self.requests.load(Ordering::Relaxed),
            prompt_tokens: self.prompt_tokens.load(Ordering::Relaxed),
            completion_tokens: self.completion_tokens.load(Ordering::Relaxed),
        }
    }

    /// Send one chat completion request
    ///
    /// Transport failures and non-success statuses are `Service` errors; a
    /// success status with an unreadable body is a malformed response.
    async fn chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> std::result::Result<ChatCompletionResponse, ClassifyError> {
        let url = format!("{}/{}", self.config.base_url, ENDPOINT);
        let request_id = generate_request_id();
        debug!("Sending request {} to {}: POST {}", request_id, self.config.model, url);

        self.requests.fetch_add(1, Ordering::Relaxed);

        let (sent, elapsed) = measure_time_async(|| {
            self.http_client
                .post(&url)
                .header(header::AUTHORIZATION, format!("Bearer {}", self.config.api_key))
                .header("X-Request-Id", &request_id)
                .json(request)
                .send()
        })
        .await;

        let response = sent.map_err(|e| {
            ServiceError::from(e).with_context(
                ErrorContext::for_service("openai")
                    .endpoint(ENDPOINT)
                    .request_id(&request_id),
            )
        })?;

        let status = response.status();
        debug!("Request {} answered {} in {:?}", request_id, status, elapsed);

        if !status.is_success() {
            let error = parse_error_response("openai", ENDPOINT, &request_id, response).await;
            warn!(
                "OpenAI request {} failed ({}): {}",
                request_id,
                error.category().unwrap_or("unknown"),
                error
            );
            return Err(error.into());
        }

        let body = response.text().await?;
        let parsed: ChatCompletionResponse = serde_json::from_str(&body).map_err(|e| {
            ClassifyError::malformed(format!(
                "unreadable completion body ({}): {}",
                e,
                truncate_string(&sanitize_for_logging(&body), 200)
            ))
        })?;

        if let Some(usage) = &parsed.usage {
            self.prompt_tokens
                .fetch_add(usage.prompt_tokens as u64, Ordering::Relaxed);
            self.completion_tokens
                .fetch_add(usage.completion_tokens as u64, Ordering::Relaxed);
            debug!(
                "Request {} used {} prompt + {} completion tokens",
                request_id, usage.prompt_tokens, usage.completion_tokens
            );
        }

        Ok(parsed)
    }
}

#[async_trait]
impl ClassificationClient for OpenAIClassifier {
    async fn classify(&self, prompt: &str) -> std::result::Result<ClassificationRecord, ClassifyError> {
        let request = self.build_request(prompt);
        let response = self.chat_completion(&request).await?;

        let content = response
            .first_content()
            .ok_or_else(|| ClassifyError::malformed("completion has no message content"))?;

        ClassificationRecord::from_model_reply(content)
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}
