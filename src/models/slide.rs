use crate::schema::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One layout variant as described by the layout subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlideLayout {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub json_schema: JsonSchema,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlideGenerationResult {
    /// Structured body. Image and icon fields hold `__image_prompt__` /
    /// `__icon_query__` objects, not resolved URLs.
    pub content: Map<String, Value>,
    pub speaker_note: String,
}

fn default_language() -> String {
    "English".to_string()
}

/// One slide's worth of work as submitted over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlideGenerationRequest {
    /// Retrieval collection to draw context from, if documents were indexed.
    #[serde(default)]
    pub presentation_id: Option<uuid::Uuid>,
    pub layout: SlideLayout,
    pub outline: super::SlideOutline,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub verbosity: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    /// Resolve `__image_prompt__` fields to URLs before responding.
    #[serde(default)]
    pub fill_images: bool,
}
