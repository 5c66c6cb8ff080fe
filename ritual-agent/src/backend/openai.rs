//! OpenAI-compatible content generator.
//!
//! Works with any OpenAI-compatible chat completions API including:
//! - vLLM
//! - Ollama
//! - OpenAI API
//! - LocalAI

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};

use super::traits::*;

/// OpenAI-compatible backend.
pub struct OpenAiBackend {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    capabilities: ModelCapabilities,
}

impl OpenAiBackend {
    /// Create a new OpenAI-compatible backend.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            capabilities: ModelCapabilities {
                context_window: 128_000,
                max_output_tokens: 4096,
                supports_json_mode: true,
            },
        }
    }

    /// Create a backend pointing to Ollama.
    pub fn ollama(model: &str) -> Self {
        Self::new("http://localhost:11434/v1", model, None)
    }

    /// Create a backend for OpenAI API.
    pub fn openai(model: &str, api_key: impl Into<String>) -> Self {
        Self::new("https://api.openai.com/v1", model, Some(api_key.into()))
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn auth_header(&self) -> Option<String> {
        self.api_key.as_ref().map(|k| format!("Bearer {}", k))
    }
}

/// OpenAI chat completion request body.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormatRequest>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormatRequest {
    #[serde(rename = "type")]
    format_type: &'static str,
}

/// OpenAI chat completion response.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<UsageResponse>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MessageResponse,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageResponse {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[async_trait]
impl ContentGenerator for OpenAiBackend {
    fn id(&self) -> &str {
        &self.model
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/models", self.base_url);
        let mut request = self.client.get(&url);

        if let Some(auth) = self.auth_header() {
            request = request.header(header::AUTHORIZATION, auth);
        }

        request
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, GeneratorError> {
        let mut messages = Vec::with_capacity(2);
        if !request.system_instructions.is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: request.system_instructions.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: request.user_payload.clone(),
        });

        let response_format = match request.response_format {
            ResponseFormat::Json if self.capabilities.supports_json_mode => Some(ResponseFormatRequest {
                format_type: "json_object",
            }),
            _ => None,
        };

        let chat_request = ChatRequest {
            model: self.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            response_format,
            stream: false,
        };

        let mut http_request = self.client.post(self.chat_completions_url());

        if let Some(auth) = self.auth_header() {
            http_request = http_request.header(header::AUTHORIZATION, auth);
        }

        let response = http_request
            .json(&chat_request)
            .send()
            .await
            .map_err(|e| GeneratorError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();

            if status.as_u16() == 429 {
                let retry_after_ms = response
                    .headers()
                    .get(header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(|secs| secs * 1000);
                return Err(GeneratorError::RateLimited { retry_after_ms });
            }
            if status.is_server_error() {
                return Err(GeneratorError::Unavailable(format!("HTTP {}", status)));
            }

            let body = response.text().await.unwrap_or_default();
            return Err(GeneratorError::RequestFailed(format!("HTTP {}: {}", status, body)));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| GeneratorError::ParseError(e.to_string()))?;

        let choice = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GeneratorError::ParseError("No choices in response".to_string()))?;

        let finish_reason = match choice.finish_reason.as_deref() {
            Some("length") => FinishReason::Length,
            Some("content_filter") => FinishReason::ContentFilter,
            _ => FinishReason::Stop,
        };

        if finish_reason == FinishReason::ContentFilter {
            return Err(GeneratorError::ContentFiltered {
                reason: "backend content filter".to_string(),
            });
        }

        let usage = chat_response
            .usage
            .map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(GenerationResponse {
            content: choice.message.content.unwrap_or_default(),
            finish_reason,
            usage,
        })
    }

    fn capabilities(&self) -> &ModelCapabilities {
        &self.capabilities
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header as header_eq, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_ollama_creation() {
        let backend = OpenAiBackend::ollama("llama3.2");
        assert_eq!(backend.id(), "llama3.2");
        assert!(backend.capabilities().supports_json_mode);
    }

    #[tokio::test]
    async fn test_generate_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header_eq("authorization", "Bearer secret"))
            .and(body_partial_json(serde_json::json!({
                "model": "test-model",
                "response_format": {"type": "json_object"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "{\"ok\":true}"}, "finish_reason": "stop"}],
                "usage": {"prompt_tokens": 12, "completion_tokens": 3}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new(
            format!("{}/v1/", server.uri()),
            "test-model",
            Some("secret".to_string()),
        );
        let response = backend
            .generate(GenerationRequest::new("system", "payload").with_json_output())
            .await
            .unwrap();

        assert_eq!(response.content, "{\"ok\":true}");
        assert_eq!(response.usage.total(), 15);
        assert_eq!(response.finish_reason, FinishReason::Stop);
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "2"))
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new(server.uri(), "m", None);
        let result = backend.generate(GenerationRequest::new("", "hi")).await;

        assert!(matches!(
            result,
            Err(GeneratorError::RateLimited { retry_after_ms: Some(2000) })
        ));
    }

    #[tokio::test]
    async fn test_empty_choices_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new(server.uri(), "m", None);
        let result = backend.generate(GenerationRequest::new("", "hi")).await;
        assert!(matches!(result, Err(GeneratorError::ParseError(_))));
    }

    #[tokio::test]
    async fn test_availability_check() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
            .mount(&server)
            .await;

        assert!(OpenAiBackend::new(server.uri(), "m", None).is_available().await);
    }
}
