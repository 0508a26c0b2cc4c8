pub mod outline;
pub mod relay;
pub mod slides;

use crate::{
    error::{DeckError, Result},
    models::{PresentationOutline, SseEvent},
};
use tokio::sync::mpsc;

pub use outline::OutlineSession;
pub use relay::relay_fragments;
pub use slides::{SlideContentGenerator, SlideJob};

const MAX_TITLE_CHARS: usize = 100;
const DEFAULT_TITLE: &str = "Presentation";

/// Push side of a client's event stream.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<SseEvent>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<SseEvent>) -> Self {
        Self { tx }
    }

    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<SseEvent>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self::new(tx), rx)
    }

    /// Fails with `Cancelled` once the receiving side is gone.
    pub async fn send(&self, event: SseEvent) -> Result<()> {
        self.tx.send(event).await.map_err(|_| DeckError::Cancelled)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

fn strip_markdown(line: &str) -> String {
    let line = line.trim().trim_start_matches(['#', '>']).trim_start();
    let line = ["- ", "* ", "+ "]
        .iter()
        .find_map(|marker| line.strip_prefix(marker))
        .unwrap_or(line);
    line.replace("**", "")
        .replace("__", "")
        .replace(['`', '*'], "")
        .trim()
        .to_string()
}

/// Title from the first non-empty line of the first slide.
pub fn derive_title(outline: &PresentationOutline) -> String {
    outline
        .slides
        .first()
        .and_then(|slide| {
            slide
                .content
                .lines()
                .map(strip_markdown)
                .find(|line| !line.is_empty())
        })
        .map(|line| {
            line.chars()
                .take(MAX_TITLE_CHARS)
                .collect::<String>()
                .trim_end()
                .to_string()
        })
        .unwrap_or_else(|| DEFAULT_TITLE.to_string())
}
