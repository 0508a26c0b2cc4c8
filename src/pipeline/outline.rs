use super::{derive_title, relay_fragments, EventSink};
use crate::{
    config::LlmConfig,
    error::{DeckError, Result},
    llm::{StructuredLlmClient, StructuredRequest},
    logger,
    models::{
        GenerationRequest, OutlineResult, PresentationOutline, ProviderClass, SseEvent, Tool,
    },
    parser::ResponseParser,
    planner::compute_slide_target,
    prompts::{OutlinePrompt, PromptOptions},
    retrieval::{gather_context, DocumentIndex, CONTEXT_SEPARATOR},
    schema::{outline_response_schema, outline_validation_schema},
};
use serde_json::Value;
use std::sync::Arc;

/// Drives one outline generation from request to a single terminal event.
#[derive(Clone)]
pub struct OutlineSession {
    client: Arc<dyn StructuredLlmClient>,
    model: String,
    class: ProviderClass,
    max_tokens: u32,
    documents: Option<DocumentIndex>,
}

impl OutlineSession {
    pub fn new(client: Arc<dyn StructuredLlmClient>, config: &LlmConfig) -> Self {
        Self {
            client,
            model: config.model.clone(),
            class: ProviderClass::from_model(&config.model, &config.schema_weak_markers),
            max_tokens: config.max_tokens,
            documents: None,
        }
    }

    /// Index uploaded documents per presentation and retrieve from them.
    /// The collection outlives the session so slide generation can query it;
    /// drop it with [`DocumentIndex::cleanup`] once the deck is done.
    pub fn with_documents(mut self, index: DocumentIndex) -> Self {
        self.documents = Some(index);
        self
    }

    pub fn provider_class(&self) -> ProviderClass {
        self.class
    }

    /// Emits `status`/`response` events, then exactly one `complete` or
    /// `error`. Nothing is emitted after the client disconnects.
    pub async fn run(&self, request: &GenerationRequest, sink: &EventSink) -> Result<OutlineResult> {
        let _timer = logger::timer(format!("outline {}", request.presentation_id));

        let outcome = self.generate(request, sink).await.and_then(|result| {
            let value = serde_json::to_value(&result)?;
            Ok((result, value))
        });

        match outcome {
            Ok((result, value)) => {
                sink.send(SseEvent::complete("outline", value)).await?;
                log::info!(
                    "✅ Outline ready: '{}' with {} slides",
                    result.title,
                    result.outlines.slides.len()
                );
                Ok(result)
            }
            Err(DeckError::Cancelled) => {
                log::info!("🔌 Client disconnected, outline generation stopped");
                Err(DeckError::Cancelled)
            }
            Err(e) => {
                log::error!("❌ Outline generation failed: {}", e);
                let _ = sink.send(SseEvent::error(e.user_message())).await;
                Err(e)
            }
        }
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        sink: &EventSink,
    ) -> Result<OutlineResult> {
        request.validate()?;
        sink.send(SseEvent::status("Generating presentation outlines..."))
            .await?;

        let context = self.document_context(request, sink).await?;
        let n_slides = compute_slide_target(request.n_slides, request.include_table_of_contents);
        log::debug!(
            "Requested {} slides, asking the model for {}",
            request.n_slides,
            n_slides
        );

        let options = PromptOptions::new(
            request.tone.clone(),
            request.verbosity.clone(),
            request.instructions.clone(),
        );
        let prompt = OutlinePrompt {
            content: &request.content,
            n_slides,
            language: &request.language,
            additional_context: Some(context.as_str()).filter(|c| !c.is_empty()),
            options: &options,
            include_title_slide: request.include_title_slide,
        };

        let tools = if request.web_search && self.client.supports_web_search() {
            vec![Tool::WebSearch]
        } else {
            Vec::new()
        };

        let structured = StructuredRequest::new(
            self.model.as_str(),
            prompt.messages(),
            outline_response_schema(n_slides),
        )
        .with_strict(self.class.strict())
        .with_tools(tools)
        .with_max_tokens(self.max_tokens);

        let fragments = self.client.stream_structured(structured).await?;
        let raw = relay_fragments(fragments, self.class, sink).await?;

        let parsed = ResponseParser::for_provider(self.class)
            .parse(&raw)
            .map_err(|e| {
                log::debug!("Unparseable outline response ({} chars): {}", raw.len(), raw);
                e
            })?;
        let parsed = Value::Object(parsed);

        if self.class == ProviderClass::SchemaWeak {
            sink.send(SseEvent::chunk(serde_json::to_string(&parsed)?))
                .await?;
        }

        outline_validation_schema().validate(&parsed)?;
        let mut outline: PresentationOutline = serde_json::from_value(parsed)?;
        outline.truncate(n_slides as usize);

        Ok(OutlineResult {
            title: derive_title(&outline),
            outlines: outline,
            n_slides_target: n_slides,
        })
    }

    /// Context from uploaded documents. Retrieval problems only cost context.
    async fn document_context(&self, request: &GenerationRequest, sink: &EventSink) -> Result<String> {
        if request.documents.is_empty() {
            return Ok(String::new());
        }

        let Some(index) = &self.documents else {
            return Ok(request.documents.join(CONTEXT_SEPARATOR));
        };

        sink.send(SseEvent::status("Reading uploaded documents..."))
            .await?;
        if let Err(e) = index
            .index(&request.presentation_id, &request.documents)
            .await
        {
            log::warn!("⚠️  Could not index documents, continuing without them: {}", e);
            return Ok(String::new());
        }

        let retriever = index.retriever(&request.presentation_id);
        Ok(gather_context(Some(&retriever), &request.content).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedClient;

    fn config(model: &str) -> LlmConfig {
        LlmConfig::default().with_model(model)
    }

    async fn run(
        client: ScriptedClient,
        model: &str,
        request: GenerationRequest,
    ) -> (Result<OutlineResult>, Vec<SseEvent>, Arc<ScriptedClient>) {
        let client = Arc::new(client);
        let session = OutlineSession::new(client.clone(), &config(model));
        let (sink, mut rx) = EventSink::channel(64);
        let result = session.run(&request, &sink).await;
        drop(sink);
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        (result, events, client)
    }

    #[tokio::test]
    async fn test_truncates_to_target() {
        let slides: Vec<String> = (1..=12)
            .map(|i| format!("{{\"content\":\"# Slide {}\"}}", i))
            .collect();
        let body = format!("{{\"slides\":[{}]}}", slides.join(","));
        let client = ScriptedClient::new().with_fragments([body]);

        let (result, events, _) = run(client, "claude", GenerationRequest::new("topic", 8)).await;
        let result = result.unwrap();
        assert_eq!(result.outlines.slides.len(), 8);
        assert_eq!(result.outlines.slides[7].content, "# Slide 8");
        assert_eq!(result.title, "Slide 1");
        assert!(matches!(events.last(), Some(SseEvent::Complete { .. })));
    }

    #[tokio::test]
    async fn test_schema_weak_request_is_not_strict() {
        let client = ScriptedClient::new().with_fragments(["{\"slides\":[{\"content\":\"\"\"A\nB\"\"\"}]}"]);
        let (result, events, client) =
            run(client, "GigaChat-Max", GenerationRequest::new("topic", 3)).await;

        assert_eq!(result.unwrap().outlines.slides[0].content, "A\nB");
        assert!(!client.requests()[0].strict);

        let chunks: Vec<&SseEvent> = events
            .iter()
            .filter(|e| matches!(e, SseEvent::Response { .. }))
            .collect();
        assert_eq!(chunks.len(), 1);
    }

    #[tokio::test]
    async fn test_web_search_only_when_supported() {
        let request = GenerationRequest::new("topic", 2).with_web_search(true);
        let body = "{\"slides\":[{\"content\":\"x\"}]}";

        let (_, _, plain) = run(ScriptedClient::new().with_fragments([body]), "m", request.clone()).await;
        assert!(plain.requests()[0].tools.is_empty());

        let (_, _, grounded) = run(
            ScriptedClient::new().with_fragments([body]).with_web_search(true),
            "m",
            request,
        )
        .await;
        assert_eq!(grounded.requests()[0].tools, vec![Tool::WebSearch]);
    }

    #[tokio::test]
    async fn test_invalid_request_is_single_error() {
        let (result, events, _) =
            run(ScriptedClient::new(), "m", GenerationRequest::new("topic", 0)).await;
        assert!(matches!(result, Err(DeckError::InvalidRequest(_))));
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], SseEvent::Error { .. }));
    }

    #[tokio::test]
    async fn test_documents_without_index_become_context() {
        let request = GenerationRequest::new("topic", 1)
            .with_documents(vec!["Quarterly revenue rose 12%.".to_string()]);
        let client = ScriptedClient::new().with_fragments(["{\"slides\":[{\"content\":\"x\"}]}"]);
        let (_, _, client) = run(client, "m", request).await;

        let sent = &client.requests()[0];
        assert!(sent
            .messages
            .iter()
            .any(|m| m.content.contains("Quarterly revenue rose 12%.")));
    }
}
