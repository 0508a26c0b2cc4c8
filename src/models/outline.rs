use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlideOutline {
    /// Markdown body for the slide.
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresentationOutline {
    pub slides: Vec<SlideOutline>,
}

impl PresentationOutline {
    /// Drops excess slides; never pads.
    pub fn truncate(&mut self, n_slides: usize) {
        self.slides.truncate(n_slides);
    }
}

/// What an outline session hands back for persistence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutlineResult {
    pub title: String,
    pub outlines: PresentationOutline,
    pub n_slides_target: u32,
}
