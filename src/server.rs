use crate::{
    config::Config,
    error::{DeckError, Result, UpstreamCategory},
    images::{fill_image_urls, provider_from_config, ImageGenerationService},
    llm::{client_from_config, StructuredLlmClient},
    models::{GenerationRequest, SlideGenerationRequest},
    pipeline::{EventSink, OutlineSession, SlideContentGenerator},
    prompts::PromptOptions,
    retrieval::{DocumentIndex, Retriever},
    storage::store_from_config,
    bedrock::BedrockClient,
};
use actix_web::{http::StatusCode, web, App, HttpResponse, HttpServer, ResponseError};
use futures::StreamExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

impl ResponseError for DeckError {
    fn status_code(&self) -> StatusCode {
        match self {
            DeckError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            DeckError::Upstream(e) => match e.category {
                UpstreamCategory::RateLimited => StatusCode::TOO_MANY_REQUESTS,
                UpstreamCategory::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
                UpstreamCategory::Network => StatusCode::GATEWAY_TIMEOUT,
                UpstreamCategory::Authentication
                | UpstreamCategory::BadRequest
                | UpstreamCategory::Unknown => StatusCode::BAD_GATEWAY,
            },
            DeckError::EmptyResponse
            | DeckError::MalformedResponse { .. }
            | DeckError::UnexpectedShape(_)
            | DeckError::SchemaViolation { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "detail": self.user_message() }))
    }
}

/// Everything the handlers share, built once at startup.
pub struct AppState {
    config: Config,
    client: Arc<dyn StructuredLlmClient>,
    documents: Option<DocumentIndex>,
    images: ImageGenerationService,
}

impl AppState {
    pub fn new(
        config: Config,
        client: Arc<dyn StructuredLlmClient>,
        documents: Option<DocumentIndex>,
        images: ImageGenerationService,
    ) -> Self {
        Self {
            config,
            client,
            documents,
            images,
        }
    }

    pub async fn from_config(config: Config) -> Result<Self> {
        let client = client_from_config(&config.llm).await?;

        let documents = match BedrockClient::new(config.llm.bedrock.clone()).await {
            Ok(bedrock) => {
                let store = store_from_config(&config.retrieval).await?;
                let embedder = bedrock
                    .vector()
                    .clone()
                    .with_model(config.retrieval.embedding_model.as_str());
                Some(DocumentIndex::from_config(
                    Arc::new(embedder),
                    store,
                    &config.retrieval,
                ))
            }
            Err(e) => {
                log::warn!("⚠️  Document retrieval disabled: {}", e);
                None
            }
        };

        let provider = provider_from_config(&config.image, &config.llm.bedrock).await?;

        Ok(Self::new(
            config,
            client,
            documents,
            ImageGenerationService::new(provider),
        ))
    }

    fn outline_session(&self) -> OutlineSession {
        let session = OutlineSession::new(self.client.clone(), &self.config.llm);
        match &self.documents {
            Some(index) => session.with_documents(index.clone()),
            None => session,
        }
    }
}

async fn stream_outlines(
    state: web::Data<AppState>,
    body: web::Json<GenerationRequest>,
) -> HttpResponse {
    let request = body.into_inner();
    let session = state.outline_session();
    let (sink, rx) = EventSink::channel(64);

    log::info!("📝 Outline requested for presentation {}", request.presentation_id);
    actix_web::rt::spawn(async move {
        let _ = session.run(&request, &sink).await;
    });

    let events = ReceiverStream::new(rx)
        .map(|event| Ok::<_, actix_web::Error>(web::Bytes::from(event.to_sse_string())));

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(events)
}

async fn generate_slide(
    state: web::Data<AppState>,
    body: web::Json<SlideGenerationRequest>,
) -> std::result::Result<HttpResponse, DeckError> {
    let request = body.into_inner();
    let generator = SlideContentGenerator::new(state.client.clone(), &state.config.llm);
    let retriever = match (&state.documents, request.presentation_id) {
        (Some(index), Some(id)) => Some(index.retriever(&id)),
        _ => None,
    };
    let options = PromptOptions::new(request.tone, request.verbosity, request.instructions);

    let mut result = generator
        .generate_slide(
            &request.layout,
            &request.outline,
            &request.language,
            retriever.as_ref().map(|r| r as &dyn Retriever),
            &options,
        )
        .await?;

    if request.fill_images {
        let mut content = Value::Object(std::mem::take(&mut result.content));
        fill_image_urls(&mut content, &state.images).await;
        if let Value::Object(map) = content {
            result.content = map;
        }
    }

    Ok(HttpResponse::Ok().json(result))
}

/// Drops a presentation's document collection once its slides are done.
async fn delete_documents(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> std::result::Result<HttpResponse, DeckError> {
    let presentation_id = path.into_inner();
    if let Some(index) = &state.documents {
        index.cleanup(&presentation_id).await?;
        log::info!("🧹 Documents released for presentation {}", presentation_id);
    }
    Ok(HttpResponse::NoContent().finish())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/ppt")
            .route("/outlines/stream", web::post().to(stream_outlines))
            .route("/slides/generate", web::post().to(generate_slide))
            .route("/documents/{presentation_id}", web::delete().to(delete_documents)),
    );
}

pub async fn run(config: Config) -> std::io::Result<()> {
    let port = config.port.unwrap_or(8000);
    let state = AppState::from_config(config)
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    let state = web::Data::new(state);

    log::info!("🚀 Listening on 0.0.0.0:{}", port);
    HttpServer::new(move || App::new().app_data(state.clone()).configure(configure))
        .bind(("0.0.0.0", port))?
        .run()
        .await
}
