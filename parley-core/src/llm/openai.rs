//! OpenAI Chat Completions compatible source
//!
//! Talks to `{endpoint}/chat/completions`. Streaming responses are read as
//! server-sent events; each `data:` line carries one JSON chunk whose
//! `choices[0].delta.content` is the next fragment.

use std::io::{BufRead, BufReader, Lines};
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::config::LlmConfig;
use crate::error::{Error, Result};
use crate::llm::{ChunkStream, CompletionSource};
use crate::types::ChatMessage;

/// OpenAI-compatible completion source.
pub struct OpenAiSource {
    http_client: Client,
    base_url: String,
    model: String,
}

impl OpenAiSource {
    /// Create a source from configuration.
    ///
    /// Fails if no API key is configured.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                Error::Config(
                    "no API key configured; set OPENAI_API_KEY or llm.api_key".to_string(),
                )
            })?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| Error::Config(format!("invalid api_key: {}", e)))?,
        );

        // Only connecting is bounded; a long generation must not be cut off.
        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(None::<Duration>)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn request_body(&self, messages: &[ChatMessage], temperature: f32, stream: bool) -> Value {
        json!({
            "model": self.model,
            "messages": messages,
            "temperature": temperature,
            "stream": stream,
        })
    }

    fn send(&self, body: &Value) -> Result<Response> {
        let response = self.http_client.post(self.url()).json(body).send()?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().unwrap_or_default();
        Err(status_error(status, &text))
    }
}

impl CompletionSource for OpenAiSource {
    fn name(&self) -> &str {
        "openai"
    }

    fn complete(&self, messages: &[ChatMessage], temperature: f32) -> Result<String> {
        tracing::debug!(model = %self.model, messages = messages.len(), "Requesting completion");
        let response = self.send(&self.request_body(messages, temperature, false))?;
        let text = response.text()?;
        parse_completion(&text)
    }

    fn stream_complete<'a>(
        &'a self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<ChunkStream<'a>> {
        tracing::debug!(model = %self.model, messages = messages.len(), "Requesting streaming completion");
        let response = self.send(&self.request_body(messages, temperature, true))?;
        Ok(Box::new(SseStream {
            lines: BufReader::new(response).lines(),
            done: false,
        }))
    }
}

/// Iterator over the text fragments of a streaming response.
struct SseStream {
    lines: Lines<BufReader<Response>>,
    done: bool,
}

impl Iterator for SseStream {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(Error::completion(
                        "APIConnectionError",
                        format!("connection lost while reading stream: {}", e),
                    )));
                }
                None => {
                    self.done = true;
                    break;
                }
            };

            match parse_sse_line(&line) {
                SseLine::Done => self.done = true,
                SseLine::Text(text) => return Some(Ok(text)),
                SseLine::Error(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
                SseLine::Skip => {}
            }
        }
        None
    }
}

/// Interpretation of one line of an SSE body.
#[derive(Debug)]
enum SseLine {
    Text(String),
    Done,
    Error(Error),
    Skip,
}

fn parse_sse_line(line: &str) -> SseLine {
    let Some(data) = line.strip_prefix("data:") else {
        return SseLine::Skip;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return SseLine::Done;
    }

    // Malformed events are skipped rather than failing the stream.
    let Ok(v) = serde_json::from_str::<Value>(data) else {
        return SseLine::Skip;
    };
    if let Some(err) = v.get("error") {
        let kind = err["type"].as_str().unwrap_or("APIError");
        let message = err["message"].as_str().unwrap_or("unknown error");
        return SseLine::Error(Error::completion(kind, message));
    }
    match v["choices"][0]["delta"]["content"].as_str() {
        Some(text) if !text.is_empty() => SseLine::Text(text.to_string()),
        _ => SseLine::Skip,
    }
}

fn parse_completion(body: &str) -> Result<String> {
    let v: Value = serde_json::from_str(body)?;
    if let Some(err) = v.get("error") {
        let kind = err["type"].as_str().unwrap_or("APIError");
        let message = err["message"].as_str().unwrap_or("unknown error");
        return Err(Error::completion(kind, message));
    }
    v["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::completion("APIError", "response contained no message content"))
}

/// Map a non-success HTTP status to a typed completion error.
fn status_error(status: StatusCode, body: &str) -> Error {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());

    let kind = match status {
        StatusCode::UNAUTHORIZED => "AuthenticationError",
        StatusCode::FORBIDDEN => "PermissionDeniedError",
        StatusCode::TOO_MANY_REQUESTS => "RateLimitError",
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => "TimeoutError",
        _ => "APIError",
    };
    Error::completion(kind, format!("HTTP {}: {}", status.as_u16(), detail))
}
