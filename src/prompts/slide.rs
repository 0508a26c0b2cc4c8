use super::{format_timestamp, PromptOptions};
use crate::models::Message;
use chrono::{DateTime, Local};

const SLIDE_RULES: &str = "# Steps
1. Analyze the outline.
2. Generate structured slide content based on BOTH the outline and the context. Use facts and figures from the context.
3. Generate speaker note that is simple, clear, concise and to the point.

# Notes
- Slide body should not use words like \"This slide\", \"This presentation\".
- Rephrase the slide body to make it flow naturally.
- Only use markdown to highlight important points.
- Make sure to follow language guidelines.
- Speaker note should be normal text, not markdown.
- Strictly follow the max and min character limit for every property in the slide.
- Never ever go over the max character limit. Limit your narration to make sure you never go over the max character limit.
- Number of items should not be more than max number of items specified in slide schema. If you have to put multiple points then merge them to obey max number of items.
- Generate content as per the given tone.
- Be very careful with number of words to generate for given field. As generating more than max characters will overflow in the design. So, analyze early and never generate more characters than allowed.
- Do not add emoji in the content.
- Metrics should be in abbreviated form with least possible characters. Do not add long sequence of words for metrics.
- For verbosity:
    - If verbosity is 'concise', then generate description as 1/3 or lower of the max character limit. Don't worry if you miss content or context.
    - If verbosity is 'standard', then generate description as 2/3 of the max character limit.
    - If verbosity is 'text-heavy', then generate description as 3/4 or higher of the max character limit. Make sure it does not exceed the max character limit.

User instructions, tone and verbosity should always be followed and should supercede any other instruction, except for max and min character limit, slide schema and number of items.

- Provide output in json format and **don't include <parameters> tags**.

# Image and Icon Output Format
image: {
    __image_prompt__: string,
}
icon: {
    __icon_query__: string,
}
";

/// Inputs for the per-slide prompt pair.
#[derive(Debug, Clone)]
pub struct SlidePrompt<'a> {
    pub outline: &'a str,
    pub language: &'a str,
    pub slide_context: &'a str,
    pub options: &'a PromptOptions,
}

impl<'a> SlidePrompt<'a> {
    pub fn system_prompt(&self) -> String {
        format!(
            "Generate structured slide based on provided outline, follow mentioned steps and notes and provide structured output.\n\n{}{}",
            self.options.render_sections("User Instructions"),
            SLIDE_RULES
        )
    }

    pub fn user_prompt(&self, now: &DateTime<Local>) -> String {
        let context = if self.slide_context.trim().is_empty() {
            "No additional context provided."
        } else {
            self.slide_context
        };
        format!(
            "## Current Date and Time\n{}\n\n\
             ## Icon Query And Image Prompt Language\nEnglish\n\n\
             ## Slide Content Language\n{}\n\n\
             ## Additional Context for this slide\n{}\n\n\
             ## Slide Outline\n{}\n",
            format_timestamp(now),
            self.language,
            context,
            self.outline
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
