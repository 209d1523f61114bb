//! LLM (`OpenAI`-compatible) API client module
//!
//! Encapsulates the chat-completions call that turns a group snapshot into
//! minutes. Works against any endpoint speaking the `OpenAI` chat-completions
//! protocol (`OpenAI`, Gemini's compatibility layer, local gateways).

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use once_cell::sync::Lazy;
use openai_api_rs::v1::chat_completion::{
    ChatCompletionMessage, Content, ContentType, ImageUrl, ImageUrlType, MessageRole,
};
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, info, warn};
use url::Url;

use super::{SummaryRequest, Summarizer};
use crate::core::config::LlmConfig;
use crate::core::models::{self, MediaKind};
use crate::errors::ScribeError;
use crate::prompt::build_user_prompt;
use crate::utils::mime::{canonicalize_mime, detect_mime, is_supported_image_mime};

const MAX_CONTEXT_TOKENS: usize = 128_000;
const MAX_OUTPUT_TOKENS: usize = 4_096;
const TOKEN_BUFFER: usize = 250;
/// Flat per-image estimate; providers bill images by tile, not by bytes.
const IMAGE_TOKEN_ESTIMATE: usize = 1_000;
const INLINE_IMAGE_MAX_BYTES: usize = 20 * 1024 * 1024;
const MAX_ATTEMPTS: usize = 3;

static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(300))
        .build()
        .unwrap_or_else(|_| Client::new())
});

/// Rough token estimation - assume ~4 characters per token for English-like text.
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4 + 1
}

/// LLM API client for generating summaries
pub struct LlmClient {
    api_key: String,
    endpoint: Url,
    model_name: String,
    system_prompt: String,
}

impl LlmClient {
    /// # Errors
    ///
    /// Returns an error if the configured base URL is not a valid URL.
    pub fn new(config: &LlmConfig, system_prompt: String) -> Result<Self, ScribeError> {
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let endpoint = Url::parse(&base)
            .and_then(|u| u.join("chat/completions"))
            .map_err(|e| ScribeError::ConfigError(format!("LLM_BASE_URL: {e}")))?;

        info!(model = %config.model, endpoint = %endpoint, "LLM client created");

        Ok(Self {
            api_key: config.api_key.clone(),
            endpoint,
            model_name: config.model.clone(),
            system_prompt,
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// System prompt followed by one multi-part user message: the lead-in,
    /// then the conversation in order. Adjacent text parts are joined.
    #[must_use]
    pub fn build_prompt(&self, request: &SummaryRequest) -> Vec<ChatCompletionMessage> {
        let mut parts: Vec<ImageUrl> = vec![text_part(build_user_prompt(
            &request.group_key,
            &request.time_range,
            request.message_count,
        ))];

        for content in &request.contents {
            let part = content_part(content);
            if let (Some(next), Some(last)) = (part.text.as_deref(), parts.last_mut())
                && matches!(last.r#type, ContentType::text)
            {
                let merged = last.text.get_or_insert_with(String::new);
                merged.push('\n');
                merged.push_str(next);
                continue;
            }
            parts.push(part);
        }

        vec![
            ChatCompletionMessage {
                role: MessageRole::system,
                content: Content::Text(self.system_prompt.clone()),
                name: None,
                tool_calls: None,
                tool_call_id: None,
            },
            ChatCompletionMessage {
                role: MessageRole::user,
                content: Content::ImageUrl(parts),
                name: None,
                tool_calls: None,
                tool_call_id: None,
            },
        ]
    }

    /// # Errors
    ///
    /// Returns an error if the prompt cannot fit the context window even
    /// without images, if the HTTP request fails after retries, or if the
    /// response has no message content.
    pub async fn generate_summary(
        &self,
        prompt: Vec<ChatCompletionMessage>,
    ) -> Result<String, ScribeError> {
        #[cfg(feature = "debug-logs")]
        info!("Using LLM prompt:\n{:?}", prompt);

        #[cfg(not(feature = "debug-logs"))]
        info!(
            "Generating summary with {} messages in prompt",
            prompt.len()
        );

        let mut prompt = prompt;
        let mut max_output_tokens = output_budget(&prompt);
        if max_output_tokens < 500 && prompt_has_images(&prompt) {
            info!("Prompt too large with images, falling back to text-only prompt");
            prompt = strip_images_from_prompt(&prompt);
            max_output_tokens = output_budget(&prompt);
        }
        if max_output_tokens < 500 {
            return Err(ScribeError::LlmError(
                "conversation is too long to fit the model context".to_string(),
            ));
        }

        match self.send(&prompt, max_output_tokens).await {
            Err(ScribeError::ApiStatus { status, body })
                if status == 400 && looks_like_invalid_image(&body) && prompt_has_images(&prompt) =>
            {
                info!("Falling back to text-only prompt after image error");
                let text_only = strip_images_from_prompt(&prompt);
                let max_output_tokens = output_budget(&text_only);
                self.send(&text_only, max_output_tokens).await
            }
            other => other,
        }
    }

    async fn send(
        &self,
        prompt: &[ChatCompletionMessage],
        max_output_tokens: usize,
    ) -> Result<String, ScribeError> {
        let body = build_chat_request_body(&self.model_name, prompt, max_output_tokens);
        let strategy = ExponentialBackoff::from_millis(250)
            .map(jitter)
            .take(MAX_ATTEMPTS - 1);

        RetryIf::start(
            strategy,
            || self.post_once(&body),
            |e: &ScribeError| {
                let retry = e.is_transient();
                if retry {
                    warn!("Transient LLM error, retrying: {}", e);
                }
                retry
            },
        )
        .await
    }

    async fn post_once(&self, body: &Value) -> Result<String, ScribeError> {
        debug!(endpoint = %self.endpoint, model = %self.model_name, "Sending request to LLM");

        let response = HTTP_CLIENT
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| ScribeError::HttpError(format!("LLM API request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|e| {
                format!("Failed to read error response body (status {status}): {e}")
            });
            return Err(ScribeError::ApiStatus {
                status: status.as_u16(),
                body,
            });
        }

        let response_json: Value = response
            .json()
            .await
            .map_err(|e| ScribeError::LlmError(format!("Failed to parse LLM response: {e}")))?;

        let text = extract_message_text(&response_json)
            .ok_or_else(|| ScribeError::LlmError("No content in LLM response".to_string()))?;
        info!("LLM response received ({} chars)", text.chars().count());
        Ok(text)
    }
}

#[async_trait]
impl Summarizer for LlmClient {
    async fn summarize(&self, request: SummaryRequest) -> Result<String, ScribeError> {
        let prompt = self.build_prompt(&request);
        self.generate_summary(prompt).await
    }
}

fn text_part(text: String) -> ImageUrl {
    ImageUrl {
        r#type: ContentType::text,
        text: Some(text),
        image_url: None,
    }
}

/// Images the model accepts go inline as data URIs; every other media kind is
/// replaced by its text description.
fn content_part(content: &models::Content) -> ImageUrl {
    match content.as_media() {
        None => text_part(content.description()),
        Some((MediaKind::Image, media))
            if !media.data.is_empty()
                && media.data.len() <= INLINE_IMAGE_MAX_BYTES
                && is_supported_image_mime(&effective_mime(media)) =>
        {
            let mime = canonicalize_mime(&effective_mime(media));
            let encoded = general_purpose::STANDARD.encode(&media.data);
            debug!("Added image part ({} bytes, {})", media.data.len(), mime);
            ImageUrl {
                r#type: ContentType::image_url,
                text: None,
                image_url: Some(ImageUrlType {
                    url: format!("data:{mime};base64,{encoded}"),
                }),
            }
        }
        Some((kind, _)) => {
            debug!("{:?} not supported by chat completions, using placeholder", kind);
            text_part(content.description())
        }
    }
}

/// Adapters may leave the MIME type blank; sniff it from the bytes then.
fn effective_mime(media: &models::Media) -> String {
    if media.mime_type.trim().is_empty() {
        detect_mime(&media.data, MediaKind::Image).to_string()
    } else {
        media.mime_type.clone()
    }
}

fn prompt_has_images(prompt: &[ChatCompletionMessage]) -> bool {
    prompt.iter().any(|m| match &m.content {
        Content::ImageUrl(parts) => parts.iter().any(|p| p.image_url.is_some()),
        Content::Text(_) => false,
    })
}

/// Replaces every image part with an `[image]` placeholder.
#[must_use]
fn strip_images_from_prompt(prompt: &[ChatCompletionMessage]) -> Vec<ChatCompletionMessage> {
    prompt
        .iter()
        .map(|m| ChatCompletionMessage {
            role: m.role.clone(),
            content: match &m.content {
                Content::ImageUrl(parts) => Content::ImageUrl(
                    parts
                        .iter()
                        .map(|p| match &p.image_url {
                            Some(_) => text_part("[image]".to_string()),
                            None => text_part(p.text.clone().unwrap_or_default()),
                        })
                        .collect(),
                ),
                Content::Text(t) => Content::Text(t.clone()),
            },
            name: m.name.clone(),
            tool_calls: m.tool_calls.clone(),
            tool_call_id: m.tool_call_id.clone(),
        })
        .collect()
}

fn estimate_prompt_tokens(prompt: &[ChatCompletionMessage]) -> usize {
    prompt
        .iter()
        .map(|m| match &m.content {
            Content::Text(t) => estimate_tokens(t),
            Content::ImageUrl(parts) => parts
                .iter()
                .map(|p| match (&p.text, &p.image_url) {
                    (_, Some(_)) => IMAGE_TOKEN_ESTIMATE,
                    (Some(t), None) => estimate_tokens(t),
                    (None, None) => 0,
                })
                .sum(),
        })
        .sum()
}

fn output_budget(prompt: &[ChatCompletionMessage]) -> usize {
    let estimated_input_tokens = estimate_prompt_tokens(prompt);
    info!("Estimated input tokens: {}", estimated_input_tokens);

    // Use saturating math to avoid underflow when input exceeds context
    MAX_CONTEXT_TOKENS
        .saturating_sub(estimated_input_tokens)
        .saturating_sub(TOKEN_BUFFER)
        .min(MAX_OUTPUT_TOKENS)
}

fn looks_like_invalid_image(error_body: &str) -> bool {
    let lowered = error_body.to_ascii_lowercase();
    lowered.contains("image")
        && (lowered.contains("invalid") || lowered.contains("not represent a valid"))
}

/// Serializes the prompt into a chat-completions request body. Plain text
/// stays a string; multi-part content becomes typed `text`/`image_url` parts.
pub(crate) fn build_chat_request_body(
    model: &str,
    prompt: &[ChatCompletionMessage],
    max_output_tokens: usize,
) -> Value {
    let messages: Vec<Value> = prompt
        .iter()
        .map(|m| {
            let role_str = match m.role {
                MessageRole::system => "system",
                MessageRole::assistant => "assistant",
                MessageRole::user | MessageRole::function | MessageRole::tool => "user",
            };

            let content = match &m.content {
                Content::Text(t) => json!(t),
                Content::ImageUrl(parts) => Value::Array(
                    parts
                        .iter()
                        .filter_map(|p| match (&p.image_url, &p.text) {
                            (Some(iu), _) => Some(json!({
                                "type": "image_url",
                                "image_url": { "url": iu.url }
                            })),
                            (None, Some(t)) => Some(json!({
                                "type": "text",
                                "text": t
                            })),
                            (None, None) => None,
                        })
                        .collect(),
                ),
            };

            json!({
                "role": role_str,
                "content": content
            })
        })
        .collect();

    json!({
        "model": model,
        "messages": messages,
        "max_tokens": max_output_tokens
    })
}

fn extract_message_text(response_json: &Value) -> Option<String> {
    let content = response_json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))?;

    // Some gateways return content as an array of typed parts.
    match content {
        Value::String(s) => Some(s.clone()),
        Value::Array(parts) => {
            let collected: Vec<&str> = parts
                .iter()
                .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                .collect();
            if collected.is_empty() {
                None
            } else {
                Some(collected.join("\n"))
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::Media;

    fn client() -> LlmClient {
        let config = LlmConfig {
            api_key: "test_key".to_string(),
            base_url: "https://llm.example.com/v1".to_string(),
            model: "test-model".to_string(),
            system_prompt_file: "unused.txt".to_string(),
        };
        LlmClient::new(&config, "policy".to_string()).unwrap()
    }

    fn png_bytes() -> Vec<u8> {
        let mut data = vec![0x89, 0x50, 0x4E, 0x47];
        data.resize(32, 0);
        data
    }

    #[test]
    fn endpoint_joins_chat_completions() {
        assert_eq!(
            client().endpoint().as_str(),
            "https://llm.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn build_prompt_merges_adjacent_text_and_inlines_images() {
        let request = SummaryRequest {
            group_key: "Team".to_string(),
            time_range: "09:00 - 09:05".to_string(),
            message_count: 3,
            contents: vec![
                models::Content::text("[09:00] Alice: hi"),
                models::Content::text("[09:01] Bob:"),
                models::Content::Image(Media::new(MediaKind::Image, png_bytes(), "", None)),
                models::Content::text("[09:05] Carol: done"),
            ],
        };

        let prompt = client().build_prompt(&request);
        assert_eq!(prompt.len(), 2);
        assert!(matches!(prompt[0].role, MessageRole::system));

        let Content::ImageUrl(parts) = &prompt[1].content else {
            panic!("user message should be multi-part");
        };
        assert_eq!(parts.len(), 3);

        let lead = parts[0].text.as_deref().unwrap();
        assert!(lead.starts_with("Group: Team"));
        assert!(lead.ends_with("[09:00] Alice: hi\n[09:01] Bob:"));

        let url = &parts[1].image_url.as_ref().unwrap().url;
        assert!(url.starts_with("data:image/png;base64,"));
        assert_eq!(parts[2].text.as_deref(), Some("[09:05] Carol: done"));
    }

    #[test]
    fn unsupported_media_becomes_placeholder() {
        let request = SummaryRequest {
            group_key: "Team".to_string(),
            time_range: "N/A".to_string(),
            message_count: 1,
            contents: vec![models::Content::Audio(Media::new(
                MediaKind::Audio,
                vec![1, 2, 3],
                "audio/amr",
                None,
            ))],
        };

        let prompt = client().build_prompt(&request);
        let Content::ImageUrl(parts) = &prompt[1].content else {
            panic!("user message should be multi-part");
        };
        assert_eq!(parts.len(), 1);
        assert!(parts[0].text.as_deref().unwrap().ends_with("[voice]"));
    }

    #[test]
    fn request_body_uses_typed_parts() {
        let request = SummaryRequest {
            group_key: "Team".to_string(),
            time_range: "N/A".to_string(),
            message_count: 1,
            contents: vec![models::Content::Image(Media::new(
                MediaKind::Image,
                png_bytes(),
                "image/png",
                None,
            ))],
        };
        let prompt = client().build_prompt(&request);
        let body = build_chat_request_body("test-model", &prompt, 1000);

        assert_eq!(body["model"], "test-model");
        assert_eq!(body["max_tokens"], 1000);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "policy");

        let parts = body["messages"][1]["content"].as_array().unwrap();
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["type"], "image_url");
    }

    #[test]
    fn strip_images_keeps_text() {
        let request = SummaryRequest {
            group_key: "Team".to_string(),
            time_range: "N/A".to_string(),
            message_count: 1,
            contents: vec![models::Content::Image(Media::new(
                MediaKind::Image,
                png_bytes(),
                "image/png",
                None,
            ))],
        };
        let prompt = client().build_prompt(&request);
        assert!(prompt_has_images(&prompt));

        let stripped = strip_images_from_prompt(&prompt);
        assert!(!prompt_has_images(&stripped));
        let Content::ImageUrl(parts) = &stripped[1].content else {
            panic!("user message should stay multi-part");
        };
        assert_eq!(parts[1].text.as_deref(), Some("[image]"));
    }

    #[test]
    fn extracts_string_and_part_content() {
        let plain = json!({"choices": [{"message": {"content": "minutes"}}]});
        assert_eq!(extract_message_text(&plain).as_deref(), Some("minutes"));

        let parts = json!({"choices": [{"message": {"content": [{"type": "text", "text": "a"}, {"type": "text", "text": "b"}]}}]});
        assert_eq!(extract_message_text(&parts).as_deref(), Some("a\nb"));

        let empty = json!({"choices": []});
        assert_eq!(extract_message_text(&empty), None);
    }

    #[tokio::test]
    async fn oversized_prompt_fails_without_network_call() {
        let request = SummaryRequest {
            group_key: "Team".to_string(),
            time_range: "N/A".to_string(),
            message_count: 1,
            contents: vec![models::Content::text("a".repeat(1_600_000))],
        };
        let client = client();
        let prompt = client.build_prompt(&request);

        let err = client.generate_summary(prompt).await.unwrap_err();
        assert!(matches!(err, ScribeError::LlmError(_)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_retries_then_reports_http_error() {
        let config = LlmConfig {
            api_key: "test_key".to_string(),
            base_url: "http://127.0.0.1:1/v1".to_string(),
            model: "test-model".to_string(),
            system_prompt_file: "unused.txt".to_string(),
        };
        let client = LlmClient::new(&config, "policy".to_string()).unwrap();
        let prompt = vec![ChatCompletionMessage {
            role: MessageRole::user,
            content: Content::Text("hi".to_string()),
            name: None,
            tool_calls: None,
            tool_call_id: None,
        }];

        let err = client.send(&prompt, 1_000).await.unwrap_err();
        assert!(matches!(err, ScribeError::HttpError(_)));
        assert!(err.is_transient());
    }
}
