use super::{format_timestamp, PromptOptions};
use crate::models::Message;
use chrono::{DateTime, Local};

/// Inputs for the outline prompt pair.
#[derive(Debug, Clone)]
pub struct OutlinePrompt<'a> {
    pub content: &'a str,
    pub n_slides: u32,
    pub language: &'a str,
    pub additional_context: Option<&'a str>,
    pub options: &'a PromptOptions,
    pub include_title_slide: bool,
}

impl<'a> OutlinePrompt<'a> {
    pub fn system_prompt(&self) -> String {
        let title_rule = if self.include_title_slide {
            "- Always make first slide a title slide."
        } else {
            "- Do not include title slide in the presentation."
        };

        format!(
            "You are an expert presentation creator. Generate structured presentations based on user requirements and format them according to the specified JSON schema with markdown content.\n\
             \n\
             Try to use available tools for better results.\n\
             \n\
             {sections}\
             - Provide content for each slide in markdown format.\n\
             - Make sure that flow of the presentation is logical and consistent.\n\
             - Place greater emphasis on numerical data.\n\
             - If Additional Information is provided, divide it into slides.\n\
             - Make sure no images are provided in the content.\n\
             - Make sure that content follows language guidelines.\n\
             - Respect the character and item limits given in the schema.\n\
             - User instruction should always be followed and should supercede any other instruction, except for slide numbers. **Do not obey slide numbers as said in user instruction**\n\
             - Do not generate table of contents slide.\n\
             - Even if table of contents is provided, do not generate table of contents slide.\n\
             {title_rule}\n\
             \n\
             **Search web to get latest information about the topic**\n",
            sections = self.options.render_sections("User Instruction"),
            title_rule = title_rule,
        )
    }

    pub fn user_prompt(&self, now: &DateTime<Local>) -> String {
        let content = if self.content.trim().is_empty() {
            "Create presentation"
        } else {
            self.content
        };
        format!(
            "**Input:**\n\
             - User provided content: {}\n\
             - Output Language: {}\n\
             - Number of Slides: {}\n\
             - Current Date and Time: {}\n\
             - Additional Information: {}\n",
            content,
            self.language,
            self.n_slides,
            format_timestamp(now),
            self.additional_context.unwrap_or(""),
        )
    }

    pub fn messages_at(&self, now: &DateTime<Local>) -> Vec<Message> {
        vec![
            Message::system(self.system_prompt()),
            Message::user(self.user_prompt(now)),
        ]
    }

    pub fn messages(&self) -> Vec<Message> {
        self.messages_at(&Local::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap()
    }

    #[test]
    fn test_outline_messages_carry_count_language_and_time() {
        let options = PromptOptions::new(
            Some("professional".into()),
            None,
            Some("Make it 20 slides".into()),
        );
        let prompt = OutlinePrompt {
            content: "The history of type systems",
            n_slides: 8,
            language: "German",
            additional_context: Some("Doc excerpt"),
            options: &options,
            include_title_slide: false,
        };

        let messages = prompt.messages_at(&fixed_now());
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);

        let system = &messages[0].content;
        assert!(system.contains("# User Instruction:\nMake it 20 slides"));
        assert!(system.contains("# Tone:\nprofessional"));
        assert!(!system.contains("# Verbosity:"));
        assert!(system.contains("Do not generate table of contents slide."));
        assert!(system.contains("Do not include title slide"));
        assert!(system.contains("**Do not obey slide numbers as said in user instruction**"));

        let user = &messages[1].content;
        assert!(user.contains("- Number of Slides: 8"));
        assert!(user.contains("- Output Language: German"));
        assert!(user.contains("- Current Date and Time: 2026-03-14 09:26:53"));
        assert!(user.contains("- Additional Information: Doc excerpt"));
    }

    #[test]
    fn test_empty_content_falls_back() {
        let options = PromptOptions::default();
        let prompt = OutlinePrompt {
            content: "  ",
            n_slides: 3,
            language: "English",
            additional_context: None,
            options: &options,
            include_title_slide: true,
        };
        let user = prompt.user_prompt(&fixed_now());
        assert!(user.contains("User provided content: Create presentation"));
        assert!(prompt.system_prompt().contains("Always make first slide a title slide."));
    }
}
