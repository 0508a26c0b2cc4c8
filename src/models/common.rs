use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// How far a model can be trusted to stream JSON that honors a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderClass {
    Standard,
    /// Accumulate-then-salvage: fragments are not relayed and the output
    /// goes through the triple-quote salvage parser.
    SchemaWeak,
}

impl ProviderClass {
    pub fn from_model(model: &str, schema_weak_markers: &[String]) -> Self {
        let model = model.to_lowercase();
        if schema_weak_markers
            .iter()
            .any(|marker| !marker.is_empty() && model.contains(marker.as_str()))
        {
            ProviderClass::SchemaWeak
        } else {
            ProviderClass::Standard
        }
    }

    /// Schema enforcement is only requested from providers that honor it.
    pub fn strict(&self) -> bool {
        matches!(self, ProviderClass::Standard)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    WebSearch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_class_from_model() {
        let markers = vec!["gigachat".to_string()];
        assert_eq!(
            ProviderClass::from_model("GigaChat-Pro", &markers),
            ProviderClass::SchemaWeak
        );
        assert_eq!(
            ProviderClass::from_model("anthropic.claude-3-haiku", &markers),
            ProviderClass::Standard
        );
        assert!(!ProviderClass::SchemaWeak.strict());
        assert_eq!(ProviderClass::from_model("gigachat", &[]), ProviderClass::Standard);
    }
}
