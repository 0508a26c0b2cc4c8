use super::EventSink;
use crate::{
    error::Result,
    llm::FragmentStream,
    models::{ProviderClass, SseEvent},
};
use futures::StreamExt;

/// Drains `fragments` into one buffer. Standard providers also relay each
/// fragment as its own `response` event, in arrival order; schema-weak
/// providers are only buffered.
///
/// An error fragment ends the relay with that error. A closed sink ends it
/// with `Cancelled` and drops the stream, which stops the producer.
pub async fn relay_fragments(
    mut fragments: FragmentStream,
    class: ProviderClass,
    sink: &EventSink,
) -> Result<String> {
    let mut buffer = String::new();
    let mut count = 0usize;

    while let Some(fragment) = fragments.next().await {
        let text = fragment?;
        if class == ProviderClass::Standard {
            sink.send(SseEvent::chunk(text.as_str())).await?;
        }
        buffer.push_str(&text);
        count += 1;
    }

    log::debug!(
        "Stream finished after {} fragments ({} chars)",
        count,
        buffer.len()
    );
    Ok(buffer)
}
