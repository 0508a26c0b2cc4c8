use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagePrompt {
    pub prompt: String,
    #[serde(default)]
    pub theme_prompt: Option<String>,
}

impl ImagePrompt {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            theme_prompt: None,
        }
    }

    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.theme_prompt = Some(theme.into());
        self
    }

    /// Stock search engines get the bare prompt; generators get the theme too.
    pub fn get_image_prompt(&self, with_theme: bool) -> String {
        match (&self.theme_prompt, with_theme) {
            (Some(theme), true) if !theme.is_empty() => format!("{}, {}", self.prompt, theme),
            _ => self.prompt.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "location", rename_all = "lowercase")]
pub enum ImageLocation {
    Url(String),
    File(String),
}

impl ImageLocation {
    pub fn as_str(&self) -> &str {
        match self {
            ImageLocation::Url(url) => url,
            ImageLocation::File(path) => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_prompt_theme() {
        let prompt = ImagePrompt::new("wind turbines at dusk").with_theme("flat vector art");
        assert_eq!(prompt.get_image_prompt(false), "wind turbines at dusk");
        assert_eq!(
            prompt.get_image_prompt(true),
            "wind turbines at dusk, flat vector art"
        );
    }
}
