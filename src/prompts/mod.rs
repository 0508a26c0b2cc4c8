pub mod outline;
pub mod slide;

use chrono::{DateTime, Local};

pub use outline::OutlinePrompt;
pub use slide::SlidePrompt;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Style knobs shared by the outline and slide prompts.
#[derive(Debug, Clone, Default)]
pub struct PromptOptions {
    pub tone: Option<String>,
    pub verbosity: Option<String>,
    pub instructions: Option<String>,
}

impl PromptOptions {
    pub fn new(
        tone: Option<String>,
        verbosity: Option<String>,
        instructions: Option<String>,
    ) -> Self {
        Self {
            tone,
            verbosity,
            instructions,
        }
    }

    /// `# Heading` plus body for every non-empty option, in the order
    /// instructions, tone, verbosity.
    pub(crate) fn render_sections(&self, instructions_heading: &str) -> String {
        let mut sections = String::new();
        let entries = [
            (instructions_heading, &self.instructions),
            ("Tone", &self.tone),
            ("Verbosity", &self.verbosity),
        ];
        for (heading, value) in entries {
            if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                sections.push_str(&format!("# {}:\n{}\n\n", heading, value));
            }
        }
        sections
    }
}

pub(crate) fn format_timestamp(now: &DateTime<Local>) -> String {
    now.format(TIMESTAMP_FORMAT).to_string()
}
