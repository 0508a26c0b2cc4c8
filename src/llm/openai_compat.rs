use super::{FragmentStream, StructuredLlmClient, StructuredRequest};
use crate::{
    config::OpenAiCompatConfig,
    error::{DeckError, Result, UpstreamError},
};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde_json::{json, Value};
use tokio_stream::wrappers::ReceiverStream;

/// Client for any endpoint speaking the OpenAI `/chat/completions` protocol.
#[derive(Clone)]
pub struct OpenAiCompatClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    web_grounding: bool,
}

impl OpenAiCompatClient {
    pub fn new(config: OpenAiCompatConfig, web_grounding: bool) -> Self {
        Self {
            http: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            web_grounding,
        }
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_payload(&self, request: &StructuredRequest, stream: bool) -> Value {
        let system = if request.strict {
            request.system_text()
        } else {
            request.system_text_with_schema()
        };

        let mut messages = Vec::new();
        if !system.is_empty() {
            messages.push(json!({ "role": "system", "content": system }));
        }
        for message in request.conversation() {
            messages.push(json!({ "role": message.role.as_str(), "content": message.content }));
        }

        let mut payload = json!({
            "model": request.model,
            "messages": messages,
            "max_tokens": request.max_tokens,
            "stream": stream,
        });

        if request.strict {
            payload["response_format"] = json!({
                "type": "json_schema",
                "json_schema": {
                    "name": "response",
                    "strict": true,
                    "schema": request.response_schema.as_value(),
                }
            });
        }

        if request.wants_web_search() && self.web_grounding {
            payload["web_search_options"] = json!({});
        }

        payload
    }

    async fn send(&self, payload: &Value) -> Result<reqwest::Response> {
        let mut builder = self.http.post(self.url()).json(payload);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(UpstreamError::from)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(String::from))
            .unwrap_or_else(|| format!("HTTP {}", status));
        log::error!("❌ Chat completions error {}: {}", status, message);
        log::debug!("Error body: {}", body);
        Err(UpstreamError::from_http_status(status.as_u16(), message).into())
    }
}

/// Pulls complete `data:` payloads out of `buffer`, leaving any trailing
/// partial line in place for the next network chunk.
fn drain_data_lines(buffer: &mut Vec<u8>) -> Vec<String> {
    let mut payloads = Vec::new();
    // 0x0A never occurs inside a multi-byte UTF-8 sequence, so complete
    // lines always decode whole characters.
    while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
        let line: Vec<u8> = buffer.drain(..=pos).collect();
        let line = String::from_utf8_lossy(&line);
        let line = line.trim_end_matches(['\r', '\n']);
        if let Some(data) = line.strip_prefix("data:") {
            payloads.push(data.trim().to_string());
        }
    }
    payloads
}

/// Text carried by one streamed chat-completions payload.
fn delta_text(data: &str) -> Result<Option<String>> {
    let value: Value = serde_json::from_str(data)?;
    if let Some(message) = value["error"]["message"].as_str() {
        return Err(UpstreamError::from_http_status(500, message).into());
    }
    Ok(value["choices"][0]["delta"]["content"]
        .as_str()
        .filter(|text| !text.is_empty())
        .map(String::from))
}

#[async_trait]
impl StructuredLlmClient for OpenAiCompatClient {
    fn provider_name(&self) -> &str {
        "openai_compat"
    }

    fn supports_web_search(&self) -> bool {
        self.web_grounding
    }

    async fn stream_structured(&self, request: StructuredRequest) -> Result<FragmentStream> {
        let payload = self.build_payload(&request, true);
        log::info!("Invoking streaming model: {}", request.model);

        let response = self.send(&payload).await?;
        let mut bytes = Box::pin(response.bytes_stream());
        let (tx, rx) = tokio::sync::mpsc::channel(100);

        tokio::spawn(async move {
            let mut buffer: Vec<u8> = Vec::new();
            'outer: while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        let _ = tx.send(Err(DeckError::Upstream(e.into()))).await;
                        break;
                    }
                };
                buffer.extend_from_slice(&chunk);

                for data in drain_data_lines(&mut buffer) {
                    if data == "[DONE]" {
                        break 'outer;
                    }
                    let item = match delta_text(&data) {
                        Ok(Some(text)) => Ok(text),
                        Ok(None) => continue,
                        Err(e) => Err(e),
                    };
                    let failed = item.is_err();
                    if tx.send(item).await.is_err() || failed {
                        break 'outer;
                    }
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    async fn generate_structured(&self, request: StructuredRequest) -> Result<String> {
        let payload = self.build_payload(&request, false);
        log::info!("Invoking model: {}", request.model);

        let response = self.send(&payload).await?;
        let value: Value = response.json().await.map_err(UpstreamError::from)?;
        Ok(value["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Message, Tool};
    use crate::schema::JsonSchema;

    fn client(web_grounding: bool) -> OpenAiCompatClient {
        OpenAiCompatClient::new(
            OpenAiCompatConfig::default().with_base_url("http://localhost:9/v1/"),
            web_grounding,
        )
    }

    fn request() -> StructuredRequest {
        StructuredRequest::new(
            "gpt-4o-mini",
            vec![Message::system("sys"), Message::user("topic")],
            JsonSchema::new(json!({"type": "object"})),
        )
    }

    #[test]
    fn test_strict_payload_uses_response_format() {
        let payload = client(false).build_payload(&request(), true);
        assert_eq!(payload["response_format"]["type"], "json_schema");
        assert_eq!(payload["messages"][0]["content"], "sys");
        assert_eq!(payload["messages"][1]["role"], "user");
        assert_eq!(payload["stream"], true);
        assert_eq!(client(false).url(), "http://localhost:9/v1/chat/completions");
    }

    #[test]
    fn test_non_strict_payload_embeds_schema() {
        let payload = client(false).build_payload(&request().with_strict(false), false);
        assert!(payload.get("response_format").is_none());
        assert!(payload["messages"][0]["content"]
            .as_str()
            .unwrap()
            .contains("JSON schema"));
    }

    #[test]
    fn test_web_search_needs_grounding() {
        let req = request().with_tools(vec![Tool::WebSearch]);
        assert!(client(false).build_payload(&req, true).get("web_search_options").is_none());
        assert!(client(true).build_payload(&req, true).get("web_search_options").is_some());
    }

    #[test]
    fn test_drain_keeps_partial_line() {
        let mut buffer = b"data: {\"a\":1}\n\ndata: [DO".to_vec();
        assert_eq!(drain_data_lines(&mut buffer), vec!["{\"a\":1}".to_string()]);
        assert_eq!(buffer, b"data: [DO");
        buffer.extend_from_slice(b"NE]\r\n");
        assert_eq!(drain_data_lines(&mut buffer), vec!["[DONE]".to_string()]);
    }

    #[test]
    fn test_drain_joins_characters_split_across_reads() {
        let frame = "data: {\"choices\":[{\"delta\":{\"content\":\"Привет\"}}]}\n\n".as_bytes();
        let split = frame.iter().position(|b| *b >= 0x80).unwrap() + 1;

        let mut buffer = frame[..split].to_vec();
        assert!(drain_data_lines(&mut buffer).is_empty());
        buffer.extend_from_slice(&frame[split..]);

        let payloads = drain_data_lines(&mut buffer);
        assert_eq!(payloads.len(), 1);
        assert_eq!(delta_text(&payloads[0]).unwrap(), Some("Привет".to_string()));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_delta_text() {
        let data = r#"{"choices":[{"delta":{"content":"{\"sl"}}]}"#;
        assert_eq!(delta_text(data).unwrap(), Some("{\"sl".to_string()));
        assert_eq!(delta_text(r#"{"choices":[{"delta":{}}]}"#).unwrap(), None);
        assert!(delta_text(r#"{"error":{"message":"overloaded"}}"#).is_err());
    }
}
