// ABOUTME: CompletionClient trait abstraction for the chat provider
// Ships an OpenAI-compatible HTTP implementation built on reqwest

use crate::chat::transcript::Message;
use crate::utils::cost_calculator::TokenUsage;
use crate::utils::error::{ChatError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE: &str = "https://api.openai.com";

/// Body of one chat completion call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
}

/// Reply text plus the token counts the provider billed for it
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub content: String,
    pub usage: TokenUsage,
}

/// Trait for the external text-completion provider
///
/// One call per turn: no retries, no streaming. Any failure comes back as
/// an error for the caller to surface.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, api_key: &str, request: &CompletionRequest) -> Result<Completion>;
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct OpenAiClient {
    http: reqwest::Client,
    api_base: String,
}

impl OpenAiClient {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.api_base.trim_end_matches('/'))
    }
}

impl Default for OpenAiClient {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE)
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, api_key: &str, request: &CompletionRequest) -> Result<Completion> {
        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            max_tokens = request.max_tokens,
            "Sending chat completion request"
        );

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| {
                    if body.trim().is_empty() {
                        status.to_string()
                    } else {
                        body
                    }
                });
            return Err(ChatError::Provider {
                status: Some(status.as_u16()),
                message,
            });
        }

        let parsed: ChatCompletionResponse = response.json().await?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ChatError::provider("response contained no choices"))?;

        let usage = match parsed.usage {
            Some(u) => TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            },
            None => {
                tracing::warn!(model = %request.model, "Response had no usage block, counting zero tokens");
                TokenUsage::default()
            }
        };

        Ok(Completion {
            content: choice.message.content.unwrap_or_default(),
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "gpt-4o".to_string(),
            messages: vec![
                Message::assistant("How can I help you?"),
                Message::user("2+2?"),
            ],
            max_tokens: 1000,
        }
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = OpenAiClient::new("http://localhost:8080/");
        assert_eq!(client.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[tokio::test]
    async fn test_complete_parses_reply_and_usage() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::Json(json!({
                "model": "gpt-4o",
                "messages": [
                    {"role": "assistant", "content": "How can I help you?"},
                    {"role": "user", "content": "2+2?"}
                ],
                "max_tokens": 1000
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "id": "chatcmpl-1",
                    "choices": [{"index": 0, "message": {"role": "assistant", "content": "4"}}],
                    "usage": {"prompt_tokens": 10, "completion_tokens": 1, "total_tokens": 11}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = OpenAiClient::new(server.url());
        let completion = client.complete("sk-test", &request()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(completion.content, "4");
        assert_eq!(
            completion.usage,
            TokenUsage {
                input_tokens: 10,
                output_tokens: 1
            }
        );
    }

    #[tokio::test]
    async fn test_complete_surfaces_provider_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(401)
            .with_body(r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#)
            .create_async()
            .await;

        let client = OpenAiClient::new(server.url());
        let err = client.complete("sk-bad", &request()).await.unwrap_err();

        match err {
            ChatError::Provider { status, message } => {
                assert_eq!(status, Some(401));
                assert_eq!(message, "Incorrect API key provided");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_complete_without_choices_is_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let client = OpenAiClient::new(server.url());
        let err = client.complete("sk-test", &request()).await.unwrap_err();
        assert!(matches!(err, ChatError::Provider { status: None, .. }));
    }

    #[tokio::test]
    async fn test_complete_missing_usage_counts_zero() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#)
            .create_async()
            .await;

        let client = OpenAiClient::new(server.url());
        let completion = client.complete("sk-test", &request()).await.unwrap();
        assert_eq!(completion.content, "");
        assert_eq!(completion.usage, TokenUsage::default());
    }
}
