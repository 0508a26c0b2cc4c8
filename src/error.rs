use thiserror::Error;

/// Coarse category an upstream model failure is mapped into before it
/// reaches a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamCategory {
    RateLimited,
    Authentication,
    BadRequest,
    Unavailable,
    Network,
    Unknown,
}

impl UpstreamCategory {
    pub fn user_message(&self) -> &'static str {
        match self {
            UpstreamCategory::RateLimited => {
                "The model provider is rate limiting requests. Please try again shortly."
            }
            UpstreamCategory::Authentication => {
                "The model provider rejected the configured credentials."
            }
            UpstreamCategory::BadRequest => "The model provider rejected the request.",
            UpstreamCategory::Unavailable => {
                "The model provider is currently unavailable. Please try again later."
            }
            UpstreamCategory::Network => "Could not reach the model provider.",
            UpstreamCategory::Unknown => "The model provider returned an unexpected error.",
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("{category:?}: {message}")]
pub struct UpstreamError {
    pub category: UpstreamCategory,
    pub message: String,
}

impl UpstreamError {
    pub fn new(category: UpstreamCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }

    /// Shared mapping for HTTP-speaking backends.
    pub fn from_http_status(status: u16, message: impl Into<String>) -> Self {
        let category = match status {
            429 => UpstreamCategory::RateLimited,
            401 | 403 => UpstreamCategory::Authentication,
            400 | 404 | 413 | 422 => UpstreamCategory::BadRequest,
            500..=599 => UpstreamCategory::Unavailable,
            _ => UpstreamCategory::Unknown,
        };
        Self::new(category, message)
    }

    /// Shared mapping for AWS-style service error codes.
    pub fn from_service_code(code: &str, message: impl Into<String>) -> Self {
        let category = match code {
            "ThrottlingException" | "TooManyRequestsException" | "ServiceQuotaExceededException" => {
                UpstreamCategory::RateLimited
            }
            "AccessDeniedException"
            | "UnrecognizedClientException"
            | "ExpiredTokenException"
            | "InvalidSignatureException" => UpstreamCategory::Authentication,
            "ValidationException" | "ResourceNotFoundException" => UpstreamCategory::BadRequest,
            "ServiceUnavailableException"
            | "ModelNotReadyException"
            | "ModelTimeoutException"
            | "InternalServerException" => UpstreamCategory::Unavailable,
            _ => UpstreamCategory::Unknown,
        };
        Self::new(category, message)
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            UpstreamError::from_http_status(status.as_u16(), e.to_string())
        } else if e.is_timeout() || e.is_connect() || e.is_request() {
            UpstreamError::new(UpstreamCategory::Network, e.to_string())
        } else {
            UpstreamError::new(UpstreamCategory::Unknown, e.to_string())
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    #[error("collection {0} has not been indexed")]
    NotIndexed(String),
    #[error("retrieval query failed: {0}")]
    QueryFailed(String),
}

#[derive(Debug, Error)]
pub enum DeckError {
    #[error("Empty response received from the model")]
    EmptyResponse,

    #[error("Malformed model response ({raw_len} chars): {detail}")]
    MalformedResponse {
        raw_len: usize,
        excerpt: String,
        /// Decoder output; may quote the payload.
        detail: String,
        location: Option<(usize, usize)>,
    },

    #[error("Expected a JSON object in the response, got {0}")]
    UnexpectedShape(String),

    #[error("Schema violation at {path}: {reason}")]
    SchemaViolation { path: String, reason: String },

    #[error("Upstream model error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Client disconnected")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DeckError {
    pub fn malformed(
        raw: &str,
        detail: impl Into<String>,
        location: Option<(usize, usize)>,
    ) -> Self {
        DeckError::MalformedResponse {
            raw_len: raw.len(),
            excerpt: raw.chars().take(500).collect(),
            detail: detail.into(),
            location,
        }
    }

    pub fn schema(path: impl Into<String>, reason: impl Into<String>) -> Self {
        DeckError::SchemaViolation {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Short text that is safe to hand to a client. Never includes raw payloads.
    pub fn user_message(&self) -> String {
        match self {
            DeckError::EmptyResponse => {
                "The AI returned an empty response. Please try again.".to_string()
            }
            DeckError::MalformedResponse { location, .. } => match location {
                Some((line, column)) => format!(
                    "Failed to parse presentation outlines. The AI returned malformed data (invalid JSON at line {}, column {}). Please try again.",
                    line, column
                ),
                None => "Failed to parse presentation outlines. The AI returned malformed data. Please try again."
                    .to_string(),
            },
            DeckError::UnexpectedShape(found) => format!(
                "Failed to parse presentation outlines. Expected a JSON object but got {}.",
                found
            ),
            DeckError::SchemaViolation { path, .. } => format!(
                "Failed to validate presentation outlines: unexpected value at {}",
                path
            ),
            DeckError::Upstream(e) => e.category.user_message().to_string(),
            DeckError::InvalidRequest(msg) => msg.clone(),
            DeckError::Cancelled => "Generation cancelled".to_string(),
            DeckError::Retrieval(_)
            | DeckError::Config(_)
            | DeckError::Serialization(_)
            | DeckError::Internal(_) => {
                "Something went wrong while generating the presentation.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, DeckError>;
