use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::types::{Message, OracleIntent, OracleReply, OracleRequest, PipeRequest, PipeResponse};
use super::{Oracle, SynthesisRequest};
use crate::config::{OracleConfig, RequestConfig};
use crate::error::{AppError, AppResult, OracleApiResult, OracleError};
use crate::prompts::{
    MOCKUP_PROMPT, NEXT_QUESTION_PROMPT, REQUIREMENTS_PROMPT, SUGGEST_ANSWER_PROMPT,
};

/// HTTP client for the question-generation oracle
#[derive(Clone)]
pub struct OracleClient {
    client: Client,
    base_url: String,
    api_key: String,
    pipe_name: String,
    request_config: RequestConfig,
}

impl OracleClient {
    /// Create a new oracle client
    pub fn new(config: &OracleConfig, request_config: RequestConfig) -> OracleApiResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(OracleError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            pipe_name: config.pipe_name.clone(),
            request_config,
        })
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Call the oracle pipe with retries
    async fn call_pipe(&self, request: PipeRequest) -> OracleApiResult<PipeResponse> {
        let url = format!("{}/v1/pipes/run", self.base_url);
        let pipe_name = request.name.clone();

        let mut last_error = None;
        let mut retries = 0;

        while retries <= self.request_config.max_retries {
            if retries > 0 {
                let delay = Duration::from_millis(
                    self.request_config.retry_delay_ms * (2_u64.pow(retries - 1)),
                );
                warn!(
                    pipe = %pipe_name,
                    retry = retries,
                    delay_ms = delay.as_millis(),
                    "Retrying oracle request"
                );
                tokio::time::sleep(delay).await;
            }

            let start = Instant::now();

            match self.execute_request(&url, &request).await {
                Ok(response) => {
                    let latency = start.elapsed();
                    info!(
                        pipe = %pipe_name,
                        latency_ms = latency.as_millis(),
                        "Oracle pipe call succeeded"
                    );
                    return Ok(response);
                }
                Err(e) => {
                    let latency = start.elapsed();
                    error!(
                        pipe = %pipe_name,
                        error = %e,
                        latency_ms = latency.as_millis(),
                        retry = retries,
                        "Oracle pipe call failed"
                    );
                    last_error = Some(e);
                    retries += 1;
                }
            }
        }

        Err(OracleError::Unavailable {
            message: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown error".to_string()),
            retries,
        })
    }

    /// Execute a single request (internal)
    async fn execute_request(
        &self,
        url: &str,
        request: &PipeRequest,
    ) -> OracleApiResult<PipeResponse> {
        debug!(
            pipe = %request.name,
            messages = request.messages.len(),
            "Calling oracle pipe"
        );

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OracleError::Timeout {
                        timeout_ms: self.request_config.timeout_ms,
                    }
                } else {
                    OracleError::Http(e)
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(OracleError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        let pipe_response: PipeResponse =
            response
                .json()
                .await
                .map_err(|e| OracleError::InvalidResponse {
                    message: format!("Failed to parse response: {}", e),
                })?;

        Ok(pipe_response)
    }

    fn question_messages(&self, request: &OracleRequest) -> Vec<Message> {
        let system = match request.mode {
            OracleIntent::NextQuestion => NEXT_QUESTION_PROMPT,
            OracleIntent::SuggestAnswer => SUGGEST_ANSWER_PROMPT,
        };
        let context = serde_json::to_string_pretty(request)
            .unwrap_or_else(|_| "{}".to_string());
        vec![Message::system(system), Message::user(context)]
    }

    async fn synthesize(&self, system: &str, request: &SynthesisRequest) -> AppResult<String> {
        let context = serde_json::to_string_pretty(request).map_err(|e| AppError::Internal {
            message: format!("Failed to serialize synthesis request: {}", e),
        })?;
        let pipe = PipeRequest::new(
            &self.pipe_name,
            vec![Message::system(system), Message::user(context)],
        );

        let response = self.call_pipe(pipe).await?;
        let document = response.completion.trim().to_string();
        if document.is_empty() {
            return Err(OracleError::InvalidResponse {
                message: "Empty synthesis completion".to_string(),
            }
            .into());
        }
        Ok(document)
    }
}

#[async_trait]
impl Oracle for OracleClient {
    async fn request_next(&self, request: OracleRequest) -> OracleReply {
        let messages = self.question_messages(&request);
        let pipe = PipeRequest::new(&self.pipe_name, messages);

        let response = match self.call_pipe(pipe).await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Oracle transport failure, synthesizing fallback reply");
                return OracleReply::fallback(e.to_string());
            }
        };

        match OracleReply::from_completion(&response.completion) {
            Ok(reply) => reply,
            Err(reason) => {
                warn!(
                    reason = %reason,
                    completion_preview = %response.completion.chars().take(200).collect::<String>(),
                    "Malformed oracle completion, synthesizing fallback reply"
                );
                OracleReply::fallback(reason)
            }
        }
    }

    async fn compile_requirements(&self, request: SynthesisRequest) -> AppResult<String> {
        self.synthesize(REQUIREMENTS_PROMPT, &request).await
    }

    async fn generate_mockup(&self, request: SynthesisRequest) -> AppResult<String> {
        self.synthesize(MOCKUP_PROMPT, &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let config = OracleConfig {
            api_key: "test_key".to_string(),
            base_url: "https://api.langbase.com".to_string(),
            pipe_name: "design-interview-v1".to_string(),
        };

        let request_config = RequestConfig::default();

        let client = OracleClient::new(&config, request_config);
        assert!(client.is_ok());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = OracleConfig {
            api_key: "test_key".to_string(),
            base_url: "https://api.langbase.com/".to_string(),
            pipe_name: "design-interview-v1".to_string(),
        };

        let client = OracleClient::new(&config, RequestConfig::default()).unwrap();
        assert_eq!(client.base_url(), "https://api.langbase.com");
    }
}
