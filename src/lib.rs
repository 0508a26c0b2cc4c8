pub mod bedrock;
pub mod config;
pub mod error;
pub mod images;
pub mod llm;
pub mod logger;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod planner;
pub mod prompts;
pub mod retrieval;
pub mod schema;
#[cfg(feature = "server")]
pub mod server;
pub mod storage;

pub use bedrock::{BedrockClient, ImageClient, TextClient, VectorClient};
pub use config::{
    BedrockConfig, Config, ImageConfig, LlmConfig, LlmProviderKind, OpenAiCompatConfig,
    RetrievalConfig, UpstashConfig,
};
pub use error::{DeckError, Result, RetrievalError, UpstreamCategory, UpstreamError};
pub use images::{ImageGenerationService, ImageProvider};
pub use llm::{
    client_from_config, OpenAiCompatClient, ScriptedClient, StructuredLlmClient,
    StructuredRequest,
};
pub use models::{
    GenerationRequest, OutlineResult, PresentationOutline, ProviderClass, SlideGenerationResult,
    SlideLayout, SlideOutline, SseEvent,
};
pub use parser::ResponseParser;
pub use pipeline::{EventSink, OutlineSession, SlideContentGenerator, SlideJob};
pub use retrieval::{DocumentIndex, Embedder, Retriever};
pub use schema::JsonSchema;
pub use storage::{InMemoryVectorStore, VectorStore};
