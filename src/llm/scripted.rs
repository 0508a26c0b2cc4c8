use super::{FragmentStream, StructuredLlmClient, StructuredRequest};
use crate::error::{DeckError, Result, UpstreamError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone)]
enum Step {
    Text(String),
    Fail(UpstreamError),
}

/// Replays canned output instead of calling a model. Used for offline runs
/// and tests.
///
/// Streaming calls replay the configured fragments. Non-streaming calls pop
/// queued responses; the last one repeats once the queue is down to it.
pub struct ScriptedClient {
    name: String,
    fragments: Vec<Step>,
    responses: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<StructuredRequest>>,
    web_search: bool,
}

impl Default for ScriptedClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self {
            name: "scripted".to_string(),
            fragments: Vec::new(),
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            web_search: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_fragments<I, S>(mut self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fragments
            .extend(fragments.into_iter().map(|f| Step::Text(f.into())));
        self
    }

    /// Ends the fragment stream with an error after whatever came before.
    pub fn with_stream_error(mut self, error: UpstreamError) -> Self {
        self.fragments.push(Step::Fail(error));
        self
    }

    pub fn with_response(self, response: impl Into<String>) -> Self {
        self.push_response(Step::Text(response.into()));
        self
    }

    pub fn with_response_error(self, error: UpstreamError) -> Self {
        self.push_response(Step::Fail(error));
        self
    }

    pub fn with_web_search(mut self, enabled: bool) -> Self {
        self.web_search = enabled;
        self
    }

    /// Every request received so far, in call order.
    pub fn requests(&self) -> Vec<StructuredRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn push_response(&self, step: Step) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push_back(step);
        }
    }

    fn record(&self, request: StructuredRequest) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
    }

    fn next_response(&self) -> Option<Step> {
        let mut responses = self.responses.lock().ok()?;
        if responses.len() > 1 {
            responses.pop_front()
        } else {
            responses.front().cloned()
        }
    }
}

fn into_result(step: Step) -> Result<String> {
    match step {
        Step::Text(text) => Ok(text),
        Step::Fail(error) => Err(DeckError::Upstream(error)),
    }
}

#[async_trait]
impl StructuredLlmClient for ScriptedClient {
    fn provider_name(&self) -> &str {
        &self.name
    }

    fn supports_web_search(&self) -> bool {
        self.web_search
    }

    async fn stream_structured(&self, request: StructuredRequest) -> Result<FragmentStream> {
        self.record(request);
        let steps = self.fragments.clone();
        Ok(Box::pin(futures::stream::iter(
            steps.into_iter().map(into_result),
        )))
    }

    async fn generate_structured(&self, request: StructuredRequest) -> Result<String> {
        self.record(request);
        match self.next_response() {
            Some(step) => into_result(step),
            None => Ok(String::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UpstreamCategory;
    use crate::models::Message;
    use crate::schema::JsonSchema;
    use futures::StreamExt;
    use serde_json::json;

    fn request() -> StructuredRequest {
        StructuredRequest::new(
            "m",
            vec![Message::user("hi")],
            JsonSchema::new(json!({})),
        )
    }

    #[tokio::test]
    async fn test_stream_ends_with_error() {
        let client = ScriptedClient::new()
            .with_fragments(["a"])
            .with_stream_error(UpstreamError::new(UpstreamCategory::Network, "reset"));
        let items: Vec<_> = client
            .stream_structured(request())
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(items.len(), 2);
        assert!(items[1].is_err());
    }

    #[tokio::test]
    async fn test_last_response_repeats() {
        let client = ScriptedClient::new()
            .with_response("first")
            .with_response("second");
        assert_eq!(client.generate_structured(request()).await.unwrap(), "first");
        assert_eq!(client.generate_structured(request()).await.unwrap(), "second");
        assert_eq!(client.generate_structured(request()).await.unwrap(), "second");
        assert_eq!(client.requests().len(), 3);
    }
}
