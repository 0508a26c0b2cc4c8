pub mod openai_compat;
pub mod scripted;

use crate::{
    bedrock::BedrockClient,
    config::{LlmConfig, LlmProviderKind},
    error::Result,
    models::{Message, Role, Tool},
    schema::JsonSchema,
};
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::pin::Pin;
use std::sync::Arc;

pub use openai_compat::OpenAiCompatClient;
pub use scripted::ScriptedClient;

/// Ordered text deltas from one model call. An `Err` item ends the stream.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

#[derive(Debug, Clone)]
pub struct StructuredRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub response_schema: JsonSchema,
    /// Ask the backend to enforce the schema. Off for providers that
    /// cannot honor it.
    pub strict: bool,
    pub tools: Vec<Tool>,
    pub max_tokens: u32,
}

impl StructuredRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>, schema: JsonSchema) -> Self {
        Self {
            model: model.into(),
            messages,
            response_schema: schema,
            strict: true,
            tools: Vec::new(),
            max_tokens: 8192,
        }
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn wants_web_search(&self) -> bool {
        self.tools.contains(&Tool::WebSearch)
    }

    /// All system messages joined, in order.
    pub fn system_text(&self) -> String {
        self.messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// System text with the response schema spelled out, for backends
    /// where the schema is not enforced natively.
    pub fn system_text_with_schema(&self) -> String {
        let schema = serde_json::to_string_pretty(self.response_schema.as_value())
            .unwrap_or_else(|_| self.response_schema.as_value().to_string());
        let instruction = format!(
            "Respond with a single JSON object, and nothing else, that conforms to this JSON schema:\n{}",
            schema
        );
        let system = self.system_text();
        if system.is_empty() {
            instruction
        } else {
            format!("{}\n\n{}", system, instruction)
        }
    }

    pub fn conversation(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.role != Role::System)
    }
}

#[async_trait]
pub trait StructuredLlmClient: Send + Sync {
    fn provider_name(&self) -> &str;

    fn supports_web_search(&self) -> bool {
        false
    }

    async fn stream_structured(&self, request: StructuredRequest) -> Result<FragmentStream>;

    /// Whole response in one piece. Backends with a cheaper non-streaming
    /// call override this.
    async fn generate_structured(&self, request: StructuredRequest) -> Result<String> {
        let stream = self.stream_structured(request).await?;
        stream.try_collect::<String>().await
    }
}

pub async fn client_from_config(config: &LlmConfig) -> Result<Arc<dyn StructuredLlmClient>> {
    match config.provider {
        LlmProviderKind::Bedrock => {
            let bedrock = BedrockClient::new(config.bedrock.clone()).await?;
            log::info!("✅ Using Bedrock for structured generation");
            Ok(Arc::new(bedrock.text().clone()))
        }
        LlmProviderKind::OpenAiCompat => {
            log::info!(
                "✅ Using OpenAI-compatible endpoint {} for structured generation",
                config.openai.base_url
            );
            Ok(Arc::new(OpenAiCompatClient::new(
                config.openai.clone(),
                config.web_grounding,
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> StructuredRequest {
        StructuredRequest::new(
            "model",
            vec![
                Message::system("Be brief."),
                Message::user("Outline wind power."),
            ],
            JsonSchema::new(json!({"type": "object"})),
        )
    }

    #[test]
    fn test_system_text_with_schema() {
        let text = request().system_text_with_schema();
        assert!(text.starts_with("Be brief."));
        assert!(text.contains("\"type\": \"object\""));
    }

    #[test]
    fn test_web_search_flag() {
        assert!(!request().wants_web_search());
        assert!(request()
            .with_tools(vec![Tool::WebSearch])
            .wants_web_search());
        assert_eq!(request().conversation().count(), 1);
    }

    #[tokio::test]
    async fn test_default_generate_collects_stream() {
        let client = ScriptedClient::new().with_fragments(["{\"a\":", "1}"]);
        let text = StructuredLlmClient::stream_structured(&client, request())
            .await
            .unwrap()
            .try_collect::<String>()
            .await
            .unwrap();
        assert_eq!(text, "{\"a\":1}");
    }
}
