//! Recovery for models that emit multi-line slide bodies as Python-style
//! triple-quoted literals (`"content": """..."""`) instead of JSON strings.

use super::{LenientJson, ParseFailure, ParseStrategy};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{json, Value};

static TRIPLE_QUOTED_CONTENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r##"(?s)"content":\s*"""(?P<content>.*?)""""##)
        .expect("triple-quote pattern is a valid regex")
});

#[derive(Default)]
pub struct TripleQuoteSalvage {
    lenient: LenientJson,
}

impl TripleQuoteSalvage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrites every triple-quoted `content` value into an escaped JSON string.
    pub fn rewrite(raw: &str) -> String {
        TRIPLE_QUOTED_CONTENT
            .replace_all(raw, |caps: &Captures| {
                let encoded = serde_json::to_string(&caps["content"]).unwrap_or_default();
                format!("\"content\": {}", encoded)
            })
            .into_owned()
    }

    /// Each triple-quoted block becomes a bare `{ "content": ... }` slide.
    pub fn extract_slides(raw: &str) -> Vec<Value> {
        TRIPLE_QUOTED_CONTENT
            .captures_iter(raw)
            .map(|caps| caps["content"].trim().to_string())
            .filter(|content| !content.is_empty())
            .map(|content| json!({ "content": content }))
            .collect()
    }
}

fn has_slides(value: &Value) -> bool {
    value
        .get("slides")
        .and_then(Value::as_array)
        .map_or(false, |slides| !slides.is_empty())
}

impl ParseStrategy for TripleQuoteSalvage {
    fn name(&self) -> &'static str {
        "triple-quote salvage"
    }

    fn attempt(&self, raw: &str) -> std::result::Result<Value, ParseFailure> {
        let sanitized = Self::rewrite(raw);
        match self.lenient.attempt(&sanitized) {
            Ok(value) if has_slides(&value) => return Ok(value),
            Ok(_) => log::debug!("Salvaged document has no slides, extracting blocks"),
            Err(e) => log::debug!("Salvaged document still unparseable: {}", e),
        }

        let slides = Self::extract_slides(raw);
        if slides.is_empty() {
            return Err(ParseFailure::new("response does not contain slides"));
        }
        log::warn!(
            "⚠️  Recovered {} slides from triple-quoted blocks",
            slides.len()
        );
        Ok(json!({ "slides": slides }))
    }
}
