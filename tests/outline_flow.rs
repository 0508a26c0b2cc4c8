use async_trait::async_trait;
use deckgen::{
    prompts::PromptOptions, DeckError, DocumentIndex, Embedder, EventSink, GenerationRequest,
    InMemoryVectorStore, JsonSchema, LlmConfig, OutlineResult, ProviderClass, ResponseParser,
    Retriever, ScriptedClient, SlideContentGenerator, SlideLayout, SlideOutline, SseEvent,
    UpstreamCategory, UpstreamError, VectorStore,
};
use serde_json::json;
use std::sync::Arc;

async fn run_session(
    session: deckgen::OutlineSession,
    request: GenerationRequest,
) -> (deckgen::Result<OutlineResult>, Vec<SseEvent>) {
    let (sink, mut rx) = EventSink::channel(128);
    let result = session.run(&request, &sink).await;
    drop(sink);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    (result, events)
}

fn session(client: ScriptedClient, model: &str) -> deckgen::OutlineSession {
    deckgen::OutlineSession::new(Arc::new(client), &LlmConfig::default().with_model(model))
}

#[tokio::test]
async fn fragments_are_relayed_then_completed() {
    let fragments = ["{\"slides\":[", "{\"content\":\"A\"},", "{\"content\":\"B\"}]}"];
    let client = ScriptedClient::new().with_fragments(fragments);

    let (result, events) = run_session(session(client, "claude-3"), GenerationRequest::new("letters", 5)).await;
    let result = result.unwrap();

    assert_eq!(result.outlines.slides.len(), 2);
    assert_eq!(result.title, "A");
    assert_eq!(result.n_slides_target, 5);

    let relayed: String = events
        .iter()
        .filter_map(|e| match e {
            SseEvent::Response { chunk } => Some(chunk.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(relayed, fragments.concat());

    assert!(matches!(events.first(), Some(SseEvent::Status { .. })));
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    assert!(matches!(events.last(), Some(SseEvent::Complete { key, .. }) if key == "outline"));
}

#[tokio::test]
async fn upstream_failure_ends_with_one_error() {
    let client = ScriptedClient::new()
        .with_fragments(["{\"slides\":["])
        .with_stream_error(UpstreamError::new(UpstreamCategory::RateLimited, "429 from provider"));

    let (result, events) = run_session(session(client, "claude-3"), GenerationRequest::new("x", 3)).await;

    assert!(matches!(result, Err(DeckError::Upstream(_))));
    let terminal: Vec<&SseEvent> = events.iter().filter(|e| e.is_terminal()).collect();
    assert_eq!(terminal.len(), 1);
    match terminal[0] {
        SseEvent::Error { detail } => assert!(detail.contains("rate limiting")),
        other => panic!("expected an error event, got {:?}", other),
    }
    assert!(!events.iter().any(|e| matches!(e, SseEvent::Complete { .. })));
}

#[tokio::test]
async fn extra_slides_are_dropped() {
    let slides: Vec<String> = (1..=12)
        .map(|i| json!({ "content": format!("## Point {}", i) }).to_string())
        .collect();
    let body = format!("{{\"slides\":[{}]}}", slides.join(","));
    let client = ScriptedClient::new().with_fragments([body]);

    let (result, _) = run_session(session(client, "claude-3"), GenerationRequest::new("x", 8)).await;
    let slides = result.unwrap().outlines.slides;
    assert_eq!(slides.len(), 8);
    assert_eq!(slides[0].content, "## Point 1");
    assert_eq!(slides[7].content, "## Point 8");
}

#[tokio::test]
async fn schema_weak_provider_gets_salvaged() {
    let raw = "{\"slides\":[{\"content\":\"\"\"# Intro\nWelcome\"\"\"},{\"content\":\"\"\"# Next\nMore\"\"\"}]}";
    let client = ScriptedClient::new().with_fragments(raw.chars().map(String::from));
    let session = session(client, "GigaChat-2-Max");
    assert_eq!(session.provider_class(), ProviderClass::SchemaWeak);

    let (result, events) = run_session(session, GenerationRequest::new("x", 4)).await;
    let result = result.unwrap();
    assert_eq!(result.outlines.slides[0].content, "# Intro\nWelcome");
    assert_eq!(result.outlines.slides[1].content, "# Next\nMore");

    let chunks: Vec<&SseEvent> = events
        .iter()
        .filter(|e| matches!(e, SseEvent::Response { .. }))
        .collect();
    assert_eq!(chunks.len(), 1);
}

#[test]
fn salvage_parser_handles_multiple_blocks() {
    let raw = "{\"slides\": [{\"content\": \"\"\"first \"quoted\" line\"\"\"}, {\"content\": \"\"\"second\"\"\"}]}";
    let parsed = ResponseParser::salvage().parse(raw).unwrap();
    assert_eq!(parsed["slides"][0]["content"], "first \"quoted\" line");
    assert_eq!(parsed["slides"][1]["content"], "second");
}

/// Counts letters; enough for similarity ranking in tests.
struct LetterEmbedder;

#[async_trait]
impl Embedder for LetterEmbedder {
    async fn embed(&self, text: &str) -> deckgen::Result<Vec<f32>> {
        let mut vector = vec![0.0; 26];
        for c in text.to_lowercase().chars().filter(|c| c.is_ascii_lowercase()) {
            vector[(c as u8 - b'a') as usize] += 1.0;
        }
        Ok(vector)
    }
}

#[tokio::test]
async fn documents_outlive_the_outline_until_cleanup() {
    let store = Arc::new(InMemoryVectorStore::new());
    let index = DocumentIndex::new(Arc::new(LetterEmbedder), store.clone());
    let client = Arc::new(ScriptedClient::new().with_fragments(["{\"slides\":[{\"content\":\"# Revenue\"}]}"]));

    let session = deckgen::OutlineSession::new(client.clone(), &LlmConfig::default())
        .with_documents(index.clone());
    let request = GenerationRequest::new("quarterly revenue", 1)
        .with_documents(vec!["Quarterly revenue grew twelve percent year over year.".to_string()]);
    let id = request.presentation_id;

    let (result, _) = run_session(session, request).await;
    assert!(result.is_ok());

    let sent = &client.requests()[0];
    assert!(sent
        .messages
        .iter()
        .any(|m| m.content.contains("twelve percent")));

    // still there for the slide phase
    let retriever = index.retriever(&id);
    let snippets = retriever.retrieve("revenue").await.unwrap();
    assert_eq!(snippets, vec!["Quarterly revenue grew twelve percent year over year.".to_string()]);

    let note = "Open with the headline growth figure, then walk through which regions drove it and what the team expects for next quarter.";
    let slide_client = Arc::new(
        ScriptedClient::new().with_response(json!({ "heading": "Revenue", "__speaker_note__": note }).to_string()),
    );
    let generator = SlideContentGenerator::new(slide_client.clone(), &LlmConfig::default());
    generator
        .generate_slide(
            &heading_layout(),
            &SlideOutline {
                content: "# Revenue".to_string(),
            },
            "English",
            Some(&retriever as &dyn Retriever),
            &PromptOptions::default(),
        )
        .await
        .unwrap();
    assert!(slide_client.requests()[0]
        .messages
        .iter()
        .any(|m| m.content.contains("twelve percent")));

    index.cleanup(&id).await.unwrap();
    assert!(!store.has_namespace(&index.collection_name(&id)).await.unwrap());
}

fn heading_layout() -> SlideLayout {
    SlideLayout {
        id: "heading-only".to_string(),
        name: None,
        json_schema: JsonSchema::new(json!({
            "type": "object",
            "properties": { "heading": { "type": "string" } },
            "required": ["heading"]
        })),
    }
}

struct BrokenRetriever;

#[async_trait]
impl Retriever for BrokenRetriever {
    async fn retrieve(&self, _query: &str) -> deckgen::Result<Vec<String>> {
        Err(UpstreamError::new(UpstreamCategory::Network, "vector store unreachable").into())
    }
}

#[tokio::test]
async fn slide_generation_survives_retrieval_failure() {
    let note = "Explain how the three pillars connect, then invite the audience to share which one their own team struggles with most today.";
    let response = json!({ "heading": "Three pillars", "__speaker_note__": note });
    let client = Arc::new(ScriptedClient::new().with_response(response.to_string()));
    let generator = SlideContentGenerator::new(client, &LlmConfig::default());

    let layout = heading_layout();
    let outline = SlideOutline {
        content: "# Three pillars".to_string(),
    };

    let result = generator
        .generate_slide(
            &layout,
            &outline,
            "English",
            Some(&BrokenRetriever as &dyn Retriever),
            &PromptOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(result.content["heading"], "Three pillars");
    assert_eq!(result.speaker_note, note);
}
