//! Turns the accumulated model text into a JSON object.
//!
//! Strategies run in order and the first one that decodes wins. The
//! resulting value must be an object.

pub mod salvage;

use crate::error::{DeckError, Result};
use crate::models::ProviderClass;
use crate::schema::kind_of;
use serde_json::{Map, Value};
use std::fmt;

pub use salvage::TripleQuoteSalvage;

/// Why a strategy gave up. `detail` may quote the input and is only logged.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseFailure {
    pub detail: String,
    /// 1-based line and column of the offending input, when the decoder knows.
    pub location: Option<(usize, usize)>,
}

impl ParseFailure {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            location: None,
        }
    }
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.detail)
    }
}

impl From<serde_json::Error> for ParseFailure {
    fn from(e: serde_json::Error) -> Self {
        let location = (e.line() > 0).then(|| (e.line(), e.column()));
        Self {
            detail: e.to_string(),
            location,
        }
    }
}

impl From<json5::Error> for ParseFailure {
    fn from(e: json5::Error) -> Self {
        let detail = e.to_string();
        match e {
            json5::Error::Message { location, .. } => Self {
                detail,
                location: location.map(|l| (l.line, l.column)),
            },
        }
    }
}

pub trait ParseStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn attempt(&self, raw: &str) -> std::result::Result<Value, ParseFailure>;
}

/// Standard JSON, whole input, nothing trailing.
#[derive(Default)]
pub struct StrictJson;

impl ParseStrategy for StrictJson {
    fn name(&self) -> &'static str {
        "strict"
    }

    fn attempt(&self, raw: &str) -> std::result::Result<Value, ParseFailure> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Fault-tolerant decode: markdown fences, trailing commas, unquoted or
/// single-quoted keys, raw newlines inside strings, prose around the object.
#[derive(Default)]
pub struct LenientJson;

impl ParseStrategy for LenientJson {
    fn name(&self) -> &'static str {
        "lenient"
    }

    fn attempt(&self, raw: &str) -> std::result::Result<Value, ParseFailure> {
        let normalized = escape_raw_control_chars(strip_code_fence(raw));
        match json5::from_str::<Value>(&normalized) {
            Ok(value) => Ok(value),
            Err(first) => {
                let start = normalized.find('{');
                let end = normalized.rfind('}');
                match (start, end) {
                    (Some(start), Some(end)) if start < end => {
                        Ok(json5::from_str::<Value>(&normalized[start..=end])?)
                    }
                    _ => Err(first.into()),
                }
            }
        }
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the info string (```json)
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Escapes newlines, carriage returns and tabs that appear unescaped inside
/// string literals. Everything outside strings is left alone. A quote only
/// opens a string where a JSON value or key may start, so apostrophes in
/// surrounding prose are ignored.
fn escape_raw_control_chars(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut last_significant: Option<char> = None;

    for c in text.chars() {
        match quote {
            None => {
                let opens_value =
                    matches!(last_significant, None | Some('{' | '[' | ',' | ':'));
                if (c == '"' || c == '\'') && opens_value {
                    quote = Some(c);
                }
                if !c.is_whitespace() {
                    last_significant = Some(c);
                }
                out.push(c);
            }
            Some(q) => {
                if escaped {
                    escaped = false;
                    out.push(c);
                    continue;
                }
                match c {
                    '\\' => {
                        escaped = true;
                        out.push(c);
                    }
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    '\t' => out.push_str("\\t"),
                    _ => {
                        if c == q {
                            quote = None;
                        }
                        out.push(c);
                    }
                }
            }
        }
    }
    out
}

pub struct ResponseParser {
    strategies: Vec<Box<dyn ParseStrategy>>,
}

impl ResponseParser {
    pub fn new(strategies: Vec<Box<dyn ParseStrategy>>) -> Self {
        Self { strategies }
    }

    /// strict, then lenient.
    pub fn standard() -> Self {
        Self::new(vec![Box::new(StrictJson), Box::new(LenientJson)])
    }

    /// Triple-quote salvage in place of the standard cascade.
    pub fn salvage() -> Self {
        Self::new(vec![Box::new(TripleQuoteSalvage::new())])
    }

    pub fn for_provider(class: ProviderClass) -> Self {
        match class {
            ProviderClass::Standard => Self::standard(),
            ProviderClass::SchemaWeak => Self::salvage(),
        }
    }

    pub fn parse(&self, raw: &str) -> Result<Map<String, Value>> {
        if raw.trim().is_empty() {
            return Err(DeckError::EmptyResponse);
        }

        let mut last_failure = ParseFailure::new("no parse strategy configured");
        for strategy in &self.strategies {
            match strategy.attempt(raw) {
                Ok(value) => {
                    log::debug!("Parsed model response with {} strategy", strategy.name());
                    return into_mapping(value);
                }
                Err(e) => {
                    log::debug!("{} parse failed: {}", strategy.name(), e);
                    last_failure = e;
                }
            }
        }

        let excerpt: String = raw.chars().take(500).collect();
        log::error!(
            "❌ Failed to parse model response ({} chars) at {:?}",
            raw.len(),
            last_failure.location
        );
        log::debug!("Last parse failure: {}", last_failure);
        log::debug!("First 500 chars of unparseable response: {}", excerpt);
        Err(DeckError::malformed(raw, last_failure.detail, last_failure.location))
    }
}

fn into_mapping(value: Value) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => {
            log::error!("Response is not an object: {}", kind_of(&other));
            Err(DeckError::UnexpectedShape(kind_of(&other).to_string()))
        }
    }
}
