use crate::error::{DeckError, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn default_true() -> bool {
    true
}

fn default_language() -> String {
    "English".to_string()
}

/// One client request for a deck outline. Read-only once accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    #[serde(default = "Uuid::new_v4")]
    pub presentation_id: Uuid,
    #[serde(default)]
    pub content: String,
    pub n_slides: u32,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub verbosity: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default = "default_true")]
    pub include_title_slide: bool,
    #[serde(default)]
    pub include_table_of_contents: bool,
    #[serde(default)]
    pub web_search: bool,
    /// Text already extracted from uploaded files.
    #[serde(default)]
    pub documents: Vec<String>,
}

impl GenerationRequest {
    pub fn new(content: impl Into<String>, n_slides: u32) -> Self {
        Self {
            presentation_id: Uuid::new_v4(),
            content: content.into(),
            n_slides,
            language: default_language(),
            tone: None,
            verbosity: None,
            instructions: None,
            include_title_slide: true,
            include_table_of_contents: false,
            web_search: false,
            documents: Vec::new(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        self.tone = Some(tone.into());
        self
    }

    pub fn with_verbosity(mut self, verbosity: impl Into<String>) -> Self {
        self.verbosity = Some(verbosity.into());
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn with_table_of_contents(mut self, enabled: bool) -> Self {
        self.include_table_of_contents = enabled;
        self
    }

    pub fn with_title_slide(mut self, enabled: bool) -> Self {
        self.include_title_slide = enabled;
        self
    }

    pub fn with_web_search(mut self, enabled: bool) -> Self {
        self.web_search = enabled;
        self
    }

    pub fn with_documents(mut self, documents: Vec<String>) -> Self {
        self.documents = documents;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_slides < 1 {
            return Err(DeckError::InvalidRequest(
                "Number of slides must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
