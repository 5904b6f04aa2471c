use futures::StreamExt;
use log::{debug, info};
use reqwest::{Client as HttpClient, header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION}};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use async_trait::async_trait;

use super::{BoxError, ChatClient, CompletionStream};
use crate::llm::LlmConfig;
use crate::models::chat::ChatMessage;

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

pub struct OpenAIChatClient {
    http: HttpClient,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct OpenAIChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Deserialize)]
struct OpenAIStreamResponse {
    choices: Vec<OpenAIStreamChoice>,
}

#[derive(Deserialize)]
struct OpenAIStreamChoice {
    delta: OpenAIDelta,
    #[serde(rename = "finish_reason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIDelta {
    content: Option<String>,
}

/// Parses one SSE line from the completions stream. Returns the text delta,
/// if the event carried one, and whether the stream is finished. Blank
/// lines, `[DONE]`, metadata-only events and unparseable payloads all come
/// back as `(None, false)` and are skipped by the reader.
fn parse_stream_line(line: &str) -> (Option<String>, bool) {
    if line.is_empty() || line == "data: [DONE]" {
        return (None, false);
    }

    let Some(data) = line.strip_prefix("data: ") else {
        return (None, false);
    };

    match serde_json::from_str::<OpenAIStreamResponse>(data) {
        Ok(stream_resp) => {
            let mut content = None;
            let mut finished = false;
            for choice in stream_resp.choices {
                if let Some(text) = choice.delta.content {
                    if !text.is_empty() {
                        content = Some(text);
                    }
                }
                if choice.finish_reason.as_deref() == Some("stop") {
                    finished = true;
                }
            }
            (content, finished)
        }
        Err(e) => {
            info!("JSON parse error: {} for data: {}", e, data);
            (None, false)
        }
    }
}

impl OpenAIChatClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
    ) -> Result<Self, BoxError> {
        let chat_model = model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_url = base_url.unwrap_or_else(|| DEFAULT_CHAT_URL.to_string());
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| format!("Invalid API key format: {}", e))?
        );

        let http = HttpClient::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| Box::new(e) as BoxError)?;

        Ok(Self {
            http,
            model: chat_model,
            base_url: api_url,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, BoxError> {
        let api_key = config.api_key
            .clone()
            .ok_or_else(|| "OpenAI API key is required".to_string())?;

        Self::new(
            api_key,
            config.completion_model.clone(),
            config.base_url.clone(),
        )
    }
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
    async fn stream_chat(&self, messages: Vec<ChatMessage>) -> Result<CompletionStream, BoxError> {
        let url = self.base_url.trim_end_matches('/').to_string();

        let req = OpenAIChatRequest {
            model: self.model.clone(),
            messages,
            stream: true,
        };

        let (tx, rx) = mpsc::channel(32);
        let client = self.http.clone();

        tokio::spawn(async move {
            let resp = match client.post(&url).json(&req).send().await {
                Ok(r) => r,
                Err(e) => {
                    let _ = tx.send(Err(Box::new(e) as _)).await;
                    return;
                }
            };

            if let Err(e) = resp.error_for_status_ref() {
                let _ = tx.send(Err(Box::new(e) as _)).await;
                return;
            }

            let mut stream = resp.bytes_stream();
            // SSE events can split across transport chunks; buffer until a
            // full line is available.
            let mut buf: Vec<u8> = Vec::new();

            while let Some(chunk_result) = stream.next().await {
                match chunk_result {
                    Ok(chunk) => {
                        buf.extend_from_slice(&chunk);

                        while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                            let raw: Vec<u8> = buf.drain(..=pos).collect();
                            let line = String::from_utf8_lossy(&raw);
                            let line = line.trim_end_matches(['\r', '\n']);
                            debug!("OpenAI stream line: {}", line);

                            let (content, finished) = parse_stream_line(line);
                            if let Some(content) = content {
                                if tx.send(Ok(content)).await.is_err() {
                                    return;
                                }
                            }
                            if finished {
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(Box::new(e) as _)).await;
                        return;
                    }
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_content_delta() {
        let line = r#"data: {"choices":[{"index":0,"delta":{"content":"Hello"},"finish_reason":null}]}"#;
        assert_eq!(parse_stream_line(line), (Some("Hello".to_string()), false));
    }

    #[test]
    fn skips_role_only_delta() {
        let line = r#"data: {"choices":[{"index":0,"delta":{"role":"assistant"},"finish_reason":null}]}"#;
        assert_eq!(parse_stream_line(line), (None, false));
    }

    #[test]
    fn skips_blank_and_done_lines() {
        assert_eq!(parse_stream_line(""), (None, false));
        assert_eq!(parse_stream_line("data: [DONE]"), (None, false));
    }

    #[test]
    fn stop_reason_ends_stream() {
        let line = r#"data: {"choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#;
        assert_eq!(parse_stream_line(line), (None, true));
    }

    #[test]
    fn final_delta_with_stop_keeps_content() {
        let line = r#"data: {"choices":[{"index":0,"delta":{"content":"bye"},"finish_reason":"stop"}]}"#;
        assert_eq!(parse_stream_line(line), (Some("bye".to_string()), true));
    }

    #[test]
    fn unparseable_payload_is_skipped() {
        assert_eq!(parse_stream_line("data: {not json"), (None, false));
        assert_eq!(parse_stream_line(": keep-alive comment"), (None, false));
    }

    #[test]
    fn missing_api_key_is_rejected() {
        let config = LlmConfig::default();
        assert!(OpenAIChatClient::from_config(&config).is_err());
    }

    #[test]
    fn model_defaults_when_unset() {
        let client = OpenAIChatClient::new("sk-test".to_string(), None, None).unwrap();
        assert_eq!(client.get_model(), DEFAULT_MODEL);
    }
}
