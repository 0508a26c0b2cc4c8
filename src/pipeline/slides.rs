use crate::{
    config::LlmConfig,
    error::{DeckError, Result},
    llm::{StructuredLlmClient, StructuredRequest},
    logger,
    models::{SlideGenerationResult, SlideLayout, SlideOutline},
    parser::ResponseParser,
    prompts::{PromptOptions, SlidePrompt},
    retrieval::{gather_context, Retriever},
    schema::JsonSchema,
};
use futures::StreamExt;
use serde_json::{json, Value};
use std::sync::Arc;

const SPEAKER_NOTE_FIELD: &str = "__speaker_note__";
/// Filled in after generation, never asked of the model.
const RESOLVED_ASSET_FIELDS: [&str; 2] = ["__image_url__", "__icon_url__"];

/// One slide to generate: the layout to fill and what the slide is about.
#[derive(Debug, Clone, Copy)]
pub struct SlideJob<'a> {
    pub layout: &'a SlideLayout,
    pub outline: &'a SlideOutline,
}

/// Non-streaming structured generation of individual slides.
#[derive(Clone)]
pub struct SlideContentGenerator {
    client: Arc<dyn StructuredLlmClient>,
    model: String,
    max_tokens: u32,
}

impl SlideContentGenerator {
    pub fn new(client: Arc<dyn StructuredLlmClient>, config: &LlmConfig) -> Self {
        Self {
            client,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        }
    }

    /// Layout schema as sent to the model: asset URLs removed, a bounded
    /// speaker note required.
    pub fn request_schema(layout_schema: &JsonSchema) -> JsonSchema {
        layout_schema
            .without_fields(&RESOLVED_ASSET_FIELDS)
            .with_field(
                SPEAKER_NOTE_FIELD,
                json!({
                    "type": "string",
                    "minLength": 100,
                    "maxLength": 250,
                    "description": "Speaker note for the slide"
                }),
                true,
            )
    }

    /// Errors propagate; retrying or skipping a slide is up to the caller.
    /// Retrieval is best effort and only ever costs context.
    pub async fn generate_slide(
        &self,
        layout: &SlideLayout,
        outline: &SlideOutline,
        language: &str,
        retriever: Option<&dyn Retriever>,
        options: &PromptOptions,
    ) -> Result<SlideGenerationResult> {
        let _timer = logger::timer(format!("slide {}", layout.id));

        let context = gather_context(retriever, &outline.content).await;
        let schema = Self::request_schema(&layout.json_schema);
        let prompt = SlidePrompt {
            outline: &outline.content,
            language,
            slide_context: &context,
            options,
        };

        let request = StructuredRequest::new(self.model.as_str(), prompt.messages(), schema.clone())
            .with_strict(false)
            .with_max_tokens(self.max_tokens);

        let raw = self.client.generate_structured(request).await?;
        let content = Value::Object(ResponseParser::standard().parse(&raw)?);
        schema.validate(&content)?;

        let Value::Object(mut content) = content else {
            return Err(DeckError::UnexpectedShape("non-object slide".to_string()));
        };
        let speaker_note = match content.remove(SPEAKER_NOTE_FIELD) {
            Some(Value::String(note)) => note,
            _ => return Err(DeckError::schema(SPEAKER_NOTE_FIELD, "missing speaker note")),
        };

        log::debug!("Generated slide for layout '{}'", layout.id);
        Ok(SlideGenerationResult {
            content,
            speaker_note,
        })
    }

    /// Up to `concurrency` slides in flight; results come back in job order.
    pub async fn generate_slides(
        &self,
        jobs: &[SlideJob<'_>],
        language: &str,
        retriever: Option<&dyn Retriever>,
        options: &PromptOptions,
        concurrency: usize,
    ) -> Vec<Result<SlideGenerationResult>> {
        futures::stream::iter(jobs.iter().map(|job| {
            self.generate_slide(job.layout, job.outline, language, retriever, options)
        }))
        .buffered(concurrency.max(1))
        .collect()
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{UpstreamCategory, UpstreamError};
    use crate::llm::ScriptedClient;

    fn layout() -> SlideLayout {
        SlideLayout {
            id: "title-with-image".to_string(),
            name: None,
            json_schema: JsonSchema::new(json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string", "maxLength": 60},
                    "image": {
                        "type": "object",
                        "properties": {
                            "__image_url__": {"type": "string"},
                            "__image_prompt__": {"type": "string"}
                        },
                        "required": ["__image_url__", "__image_prompt__"]
                    }
                },
                "required": ["title", "image"]
            })),
        }
    }

    fn note() -> String {
        "Walk the audience through why offshore wind capacity factors beat onshore sites, and pause for questions on grid integration costs.".to_string()
    }

    #[test]
    fn test_request_schema_transform() {
        let schema = SlideContentGenerator::request_schema(&layout().json_schema);
        let value = schema.as_value();
        assert!(value["properties"]["image"]["properties"]
            .get("__image_url__")
            .is_none());
        assert_eq!(value["properties"]["image"]["required"], json!(["__image_prompt__"]));
        assert_eq!(value["properties"][SPEAKER_NOTE_FIELD]["minLength"], 100);
        assert!(value["required"]
            .as_array()
            .unwrap()
            .contains(&json!(SPEAKER_NOTE_FIELD)));
    }

    #[tokio::test]
    async fn test_generate_slide_splits_speaker_note() {
        let response = json!({
            "title": "Offshore wind",
            "image": {"__image_prompt__": "turbines at sea"},
            SPEAKER_NOTE_FIELD: note()
        });
        let client = Arc::new(ScriptedClient::new().with_response(response.to_string()));
        let generator = SlideContentGenerator::new(client.clone(), &LlmConfig::default());

        let result = generator
            .generate_slide(
                &layout(),
                &SlideOutline {
                    content: "# Offshore wind".to_string(),
                },
                "English",
                None,
                &PromptOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(result.speaker_note, note());
        assert!(result.content.get(SPEAKER_NOTE_FIELD).is_none());
        assert_eq!(result.content["image"]["__image_prompt__"], "turbines at sea");
        assert!(!client.requests()[0].strict);
    }

    #[tokio::test]
    async fn test_short_speaker_note_is_rejected() {
        let response = json!({
            "title": "Offshore wind",
            "image": {"__image_prompt__": "turbines"},
            SPEAKER_NOTE_FIELD: "too short"
        });
        let client = Arc::new(ScriptedClient::new().with_response(response.to_string()));
        let generator = SlideContentGenerator::new(client, &LlmConfig::default());
        let err = generator
            .generate_slide(
                &layout(),
                &SlideOutline {
                    content: "x".to_string(),
                },
                "English",
                None,
                &PromptOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DeckError::SchemaViolation { .. }));
    }

    #[tokio::test]
    async fn test_upstream_failure_propagates() {
        let client = Arc::new(
            ScriptedClient::new()
                .with_response_error(UpstreamError::new(UpstreamCategory::Authentication, "bad key")),
        );
        let generator = SlideContentGenerator::new(client, &LlmConfig::default());
        let err = generator
            .generate_slide(
                &layout(),
                &SlideOutline {
                    content: "x".to_string(),
                },
                "English",
                None,
                &PromptOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DeckError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_generate_slides_keeps_order() {
        let responses: Vec<String> = ["one", "two", "three"]
            .iter()
            .map(|title| {
                json!({
                    "title": title,
                    "image": {"__image_prompt__": "p"},
                    SPEAKER_NOTE_FIELD: note()
                })
                .to_string()
            })
            .collect();
        let mut client = ScriptedClient::new();
        for response in responses {
            client = client.with_response(response);
        }
        let generator = SlideContentGenerator::new(Arc::new(client), &LlmConfig::default());

        let layout = layout();
        let outlines: Vec<SlideOutline> = (0..3)
            .map(|i| SlideOutline {
                content: format!("slide {}", i),
            })
            .collect();
        let jobs: Vec<SlideJob> = outlines
            .iter()
            .map(|outline| SlideJob {
                layout: &layout,
                outline,
            })
            .collect();

        let results = generator
            .generate_slides(&jobs, "English", None, &PromptOptions::default(), 1)
            .await;
        let titles: Vec<String> = results
            .into_iter()
            .map(|r| r.unwrap().content["title"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(titles, vec!["one", "two", "three"]);
    }
}
