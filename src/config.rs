use std::env;
use std::path::PathBuf;

fn env_flag(name: &str) -> bool {
    env::var(name).ok().map_or(false, |val| val == "true" || val == "1")
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.parse().ok())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProviderKind {
    Bedrock,
    OpenAiCompat,
}

impl LlmProviderKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "bedrock" | "aws" => Some(LlmProviderKind::Bedrock),
            "openai" | "openai_compat" | "openai-compatible" | "custom" => {
                Some(LlmProviderKind::OpenAiCompat)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BedrockConfig {
    pub region: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

impl BedrockConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        BedrockConfig {
            region: env::var("AWS_REGION")
                .or_else(|_| env::var("AWS_DEFAULT_REGION"))
                .ok(),
            access_key: env::var("AWS_ACCESS_KEY_ID").ok(),
            secret_key: env::var("AWS_SECRET_ACCESS_KEY").ok(),
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_credentials(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.access_key = Some(access_key.into());
        self.secret_key = Some(secret_key.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiCompatConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl Default for OpenAiCompatConfig {
    fn default() -> Self {
        OpenAiCompatConfig {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
        }
    }
}

impl OpenAiCompatConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        OpenAiCompatConfig {
            base_url: env::var("OPENAI_COMPAT_BASE_URL").unwrap_or(defaults.base_url),
            api_key: env::var("OPENAI_COMPAT_API_KEY")
                .or_else(|_| env::var("OPENAI_API_KEY"))
                .ok(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: LlmProviderKind,
    pub model: String,
    pub bedrock: BedrockConfig,
    pub openai: OpenAiCompatConfig,
    /// Lower-cased substrings marking models that cannot stream schema-conformant JSON.
    pub schema_weak_markers: Vec<String>,
    pub web_grounding: bool,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        LlmConfig {
            provider: LlmProviderKind::Bedrock,
            model: "anthropic.claude-3-haiku-20240307-v1:0".to_string(),
            bedrock: BedrockConfig::default(),
            openai: OpenAiCompatConfig::default(),
            schema_weak_markers: vec!["gigachat".to_string()],
            web_grounding: false,
            max_tokens: 8192,
        }
    }
}

impl LlmConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        let schema_weak_markers = env::var("LLM_SCHEMA_WEAK_MARKERS")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .map(|m| m.trim().to_lowercase())
                    .filter(|m| !m.is_empty())
                    .collect()
            })
            .unwrap_or(defaults.schema_weak_markers);

        LlmConfig {
            provider: env::var("LLM_PROVIDER")
                .ok()
                .and_then(|p| LlmProviderKind::parse(&p))
                .unwrap_or(defaults.provider),
            model: env::var("LLM_MODEL").unwrap_or(defaults.model),
            bedrock: BedrockConfig::from_env(),
            openai: OpenAiCompatConfig::from_env(),
            schema_weak_markers,
            web_grounding: env_flag("LLM_WEB_GROUNDING"),
            max_tokens: env_parse("LLM_MAX_TOKENS").unwrap_or(defaults.max_tokens),
        }
    }

    pub fn with_provider(mut self, provider: LlmProviderKind) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_bedrock(mut self, config: BedrockConfig) -> Self {
        self.bedrock = config;
        self.provider = LlmProviderKind::Bedrock;
        self
    }

    pub fn with_openai(mut self, config: OpenAiCompatConfig) -> Self {
        self.openai = config;
        self.provider = LlmProviderKind::OpenAiCompat;
        self
    }

    pub fn with_web_grounding(mut self, enabled: bool) -> Self {
        self.web_grounding = enabled;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpstashConfig {
    pub url: Option<String>,
    pub token: Option<String>,
}

impl UpstashConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(mut self, url: impl Into<String>, token: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self.token = Some(token.into());
        self
    }

    /// `None` when neither variable is set.
    pub fn from_env() -> Option<Self> {
        let url = env::var("UPSTASH_URL").ok();
        let token = env::var("UPSTASH_TOKEN").ok();
        if url.is_none() && token.is_none() {
            return None;
        }
        Some(UpstashConfig { url, token })
    }
}

#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub upstash: Option<UpstashConfig>,
    pub embedding_model: String,
    pub top_k: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub collection_prefix: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        RetrievalConfig {
            upstash: None,
            embedding_model: "amazon.titan-embed-text-v2:0".to_string(),
            top_k: 5,
            chunk_size: 1000,
            chunk_overlap: 200,
            collection_prefix: "docs".to_string(),
        }
    }
}

impl RetrievalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        RetrievalConfig {
            upstash: UpstashConfig::from_env(),
            embedding_model: env::var("EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            top_k: env_parse("RETRIEVAL_TOP_K").unwrap_or(defaults.top_k),
            ..defaults
        }
    }

    pub fn with_upstash(mut self, config: UpstashConfig) -> Self {
        self.upstash = Some(config);
        self
    }

    pub fn with_chunking(mut self, chunk_size: usize, chunk_overlap: usize) -> Self {
        self.chunk_size = chunk_size;
        self.chunk_overlap = chunk_overlap;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageProviderKind {
    Pexels,
    Pixabay,
    DallE3,
    Titan,
}

impl ImageProviderKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "pexels" => Some(ImageProviderKind::Pexels),
            "pixabay" => Some(ImageProviderKind::Pixabay),
            "dall-e-3" | "dalle3" | "dall-e" => Some(ImageProviderKind::DallE3),
            "titan" | "bedrock" => Some(ImageProviderKind::Titan),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageConfig {
    pub provider: Option<ImageProviderKind>,
    pub pexels_api_key: Option<String>,
    pub pixabay_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub output_dir: PathBuf,
}

impl Default for ImageConfig {
    fn default() -> Self {
        ImageConfig {
            provider: None,
            pexels_api_key: None,
            pixabay_api_key: None,
            openai_api_key: None,
            output_dir: PathBuf::from("images"),
        }
    }
}

impl ImageConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        ImageConfig {
            provider: env::var("IMAGE_PROVIDER")
                .ok()
                .and_then(|p| ImageProviderKind::parse(&p)),
            pexels_api_key: env::var("PEXELS_API_KEY").ok(),
            pixabay_api_key: env::var("PIXABAY_API_KEY").ok(),
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            output_dir: env::var("IMAGE_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
        }
    }

    pub fn with_provider(mut self, provider: ImageProviderKind) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: Option<u16>,
    pub llm: LlmConfig,
    pub retrieval: RetrievalConfig,
    pub image: ImageConfig,
    pub slide_concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: None,
            llm: LlmConfig::default(),
            retrieval: RetrievalConfig::default(),
            image: ImageConfig::default(),
            slide_concurrency: 4,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        Config {
            port: env_parse("PORT"),
            llm: LlmConfig::from_env(),
            retrieval: RetrievalConfig::from_env(),
            image: ImageConfig::from_env(),
            slide_concurrency: env_parse("SLIDE_CONCURRENCY")
                .filter(|n: &usize| *n > 0)
                .unwrap_or(4),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_llm(mut self, config: LlmConfig) -> Self {
        self.llm = config;
        self
    }

    pub fn with_retrieval(mut self, config: RetrievalConfig) -> Self {
        self.retrieval = config;
        self
    }

    pub fn with_image(mut self, config: ImageConfig) -> Self {
        self.image = config;
        self
    }

    pub fn with_slide_concurrency(mut self, concurrency: usize) -> Self {
        self.slide_concurrency = concurrency.max(1);
        self
    }
}
