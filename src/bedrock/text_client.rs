use crate::{
    error::{DeckError, Result, UpstreamCategory, UpstreamError},
    llm::{FragmentStream, StructuredLlmClient, StructuredRequest},
};
use async_trait::async_trait;
use aws_sdk_bedrockruntime::{
    error::{ProvideErrorMetadata, SdkError},
    primitives::Blob,
    types::ResponseStream,
    Client,
};
use serde_json::{json, Value};
use std::fmt::Debug;
use tokio_stream::wrappers::ReceiverStream;

/// Name of the forced tool whose input carries the structured response.
const RESPONSE_TOOL: &str = "response";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModelFamily {
    Anthropic,
    Titan,
    Llama,
    Mistral,
    Cohere,
    Ai21,
}

impl ModelFamily {
    fn of(model_id: &str) -> Result<Self> {
        let family = match model_id {
            id if id.starts_with("anthropic.claude") || id.contains(".anthropic.claude") => {
                ModelFamily::Anthropic
            }
            id if id.starts_with("arn:aws:bedrock") => ModelFamily::Anthropic,
            id if id.starts_with("amazon.titan") => ModelFamily::Titan,
            id if id.starts_with("meta.llama") || id.contains(".meta.llama") => ModelFamily::Llama,
            id if id.starts_with("mistral.") => ModelFamily::Mistral,
            id if id.starts_with("cohere.command") => ModelFamily::Cohere,
            id if id.starts_with("ai21.") => ModelFamily::Ai21,
            _ => {
                return Err(UpstreamError::new(
                    UpstreamCategory::BadRequest,
                    format!("Unsupported model ID: {}", model_id),
                )
                .into())
            }
        };
        Ok(family)
    }
}

/// Maps an AWS SDK failure onto the shared upstream categories.
pub(crate) fn map_sdk_error<E, R>(e: SdkError<E, R>) -> UpstreamError
where
    E: ProvideErrorMetadata + Debug,
    R: Debug,
{
    if let Some(service_error) = e.as_service_error() {
        log::error!("Service error code: {:?}", service_error.code());
        log::error!("Service error message: {:?}", service_error.message());
        return UpstreamError::from_service_code(
            service_error.code().unwrap_or("unknown"),
            service_error.message().unwrap_or("no message"),
        );
    }

    log::error!("AWS SDK error details: {:?}", e);
    match e {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => {
            UpstreamError::new(UpstreamCategory::Network, "could not reach Bedrock")
        }
        _ => UpstreamError::new(UpstreamCategory::Unknown, "Bedrock request failed"),
    }
}

/// Structured generation over Bedrock `InvokeModel`.
#[derive(Clone)]
pub struct TextClient {
    client: Client,
}

impl TextClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn build_request_payload(request: &StructuredRequest, family: ModelFamily) -> Value {
        if family == ModelFamily::Anthropic {
            return Self::anthropic_payload(request);
        }

        let mut prompt = request.system_text_with_schema();
        for message in request.conversation() {
            prompt.push_str("\n\n");
            prompt.push_str(&message.content);
        }

        match family {
            ModelFamily::Titan => json!({
                "inputText": prompt,
                "textGenerationConfig": {
                    "maxTokenCount": request.max_tokens,
                    "temperature": 0.2,
                    "topP": 0.9
                }
            }),
            ModelFamily::Llama => json!({
                "prompt": prompt,
                "max_gen_len": request.max_tokens,
                "temperature": 0.2,
                "top_p": 0.9
            }),
            ModelFamily::Mistral => json!({
                "prompt": prompt,
                "max_tokens": request.max_tokens,
                "temperature": 0.2,
                "top_p": 0.9
            }),
            ModelFamily::Cohere => json!({
                "prompt": prompt,
                "max_tokens": request.max_tokens,
                "temperature": 0.2,
                "p": 0.9
            }),
            ModelFamily::Ai21 | ModelFamily::Anthropic => json!({
                "prompt": prompt,
                "maxTokens": request.max_tokens,
                "temperature": 0.2,
                "topP": 0.9
            }),
        }
    }

    fn anthropic_payload(request: &StructuredRequest) -> Value {
        let messages: Vec<Value> = request
            .conversation()
            .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
            .collect();

        let mut payload = json!({
            "messages": messages,
            "max_tokens": request.max_tokens,
            "anthropic_version": "bedrock-2023-05-31"
        });

        if request.strict {
            let system = request.system_text();
            if !system.is_empty() {
                payload["system"] = json!(system);
            }
            payload["tools"] = json!([{
                "name": RESPONSE_TOOL,
                "description": "Return the structured response.",
                "input_schema": request.response_schema.as_value(),
            }]);
            payload["tool_choice"] = json!({ "type": "tool", "name": RESPONSE_TOOL });
        } else {
            payload["system"] = json!(request.system_text_with_schema());
        }
        payload
    }

    /// Text delta carried by one streamed chunk, if any.
    fn parse_stream_chunk(chunk_str: &str, family: ModelFamily) -> Result<Option<String>> {
        let json: Value = serde_json::from_str(chunk_str)?;

        let text = match family {
            ModelFamily::Anthropic => {
                if json["type"].as_str() != Some("content_block_delta") {
                    return Ok(None);
                }
                let delta = &json["delta"];
                match delta["type"].as_str() {
                    Some("text_delta") => delta["text"].as_str(),
                    Some("input_json_delta") => delta["partial_json"].as_str(),
                    _ => None,
                }
            }
            ModelFamily::Titan => json["outputText"].as_str(),
            ModelFamily::Llama => json["generation"].as_str(),
            ModelFamily::Mistral => json["outputs"][0]["text"].as_str(),
            ModelFamily::Cohere => json["text"]
                .as_str()
                .or_else(|| json["generations"][0]["text"].as_str()),
            ModelFamily::Ai21 => json["completions"][0]["data"]["text"].as_str(),
        };

        Ok(text.filter(|t| !t.is_empty()).map(String::from))
    }

    /// Full response text out of a non-streaming body.
    fn parse_response_body(body: &str, family: ModelFamily) -> Result<String> {
        let json: Value = serde_json::from_str(body)?;

        let text = match family {
            ModelFamily::Anthropic => {
                let blocks = json["content"].as_array().cloned().unwrap_or_default();
                if let Some(tool_use) = blocks
                    .iter()
                    .find(|b| b["type"] == "tool_use" && b["name"] == RESPONSE_TOOL)
                {
                    serde_json::to_string(&tool_use["input"])?
                } else {
                    blocks
                        .iter()
                        .filter_map(|b| b["text"].as_str())
                        .collect::<String>()
                }
            }
            ModelFamily::Titan => json["results"][0]["outputText"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
            ModelFamily::Llama => json["generation"].as_str().unwrap_or_default().to_string(),
            ModelFamily::Mistral => json["outputs"][0]["text"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
            ModelFamily::Cohere => json["generations"][0]["text"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
            ModelFamily::Ai21 => json["completions"][0]["data"]["text"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
        };
        Ok(text)
    }
}

#[async_trait]
impl StructuredLlmClient for TextClient {
    fn provider_name(&self) -> &str {
        "bedrock"
    }

    async fn stream_structured(&self, request: StructuredRequest) -> Result<FragmentStream> {
        let family = ModelFamily::of(&request.model)?;
        let request_json = serde_json::to_string(&Self::build_request_payload(&request, family))?;
        log::info!("Invoking streaming model: {}", request.model);
        log::debug!("Streaming request payload: {}", request_json);

        let response = self
            .client
            .invoke_model_with_response_stream()
            .model_id(&request.model)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(request_json.into_bytes()))
            .send()
            .await
            .map_err(map_sdk_error)?;

        // The SDK event receiver is bridged into a channel; the producer
        // stops as soon as the consumer goes away.
        let (tx, rx) = tokio::sync::mpsc::channel(100);
        let mut event_receiver = response.body;

        tokio::spawn(async move {
            loop {
                match event_receiver.recv().await {
                    Ok(Some(ResponseStream::Chunk(chunk))) => {
                        let Some(bytes) = chunk.bytes else { continue };
                        let chunk_str = String::from_utf8_lossy(bytes.as_ref()).to_string();
                        let item = match Self::parse_stream_chunk(&chunk_str, family) {
                            Ok(Some(text)) => Ok(text),
                            Ok(None) => continue,
                            Err(e) => Err(e),
                        };
                        let failed = item.is_err();
                        if tx.send(item).await.is_err() || failed {
                            break;
                        }
                    }
                    Ok(Some(_)) => continue,
                    Ok(None) => break,
                    Err(e) => {
                        let _ = tx.send(Err(DeckError::Upstream(map_sdk_error(e)))).await;
                        break;
                    }
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    async fn generate_structured(&self, request: StructuredRequest) -> Result<String> {
        let family = ModelFamily::of(&request.model)?;
        let request_json = serde_json::to_string(&Self::build_request_payload(&request, family))?;

        log::info!("Invoking model: {}", request.model);
        log::debug!("Structured request payload: {}", request_json);

        let response = self
            .client
            .invoke_model()
            .model_id(&request.model)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(request_json.into_bytes()))
            .send()
            .await
            .map_err(map_sdk_error)?;

        let body = String::from_utf8(response.body.into_inner())
            .map_err(|e| DeckError::Internal(format!("non UTF-8 model response: {}", e)))?;
        log::debug!("Raw model response: {}", body);
        Self::parse_response_body(&body, family)
    }
}
