use serde::Serialize;
use serde_json::{json, Value};

/// Events pushed to a client during one outline session, in causal order:
/// `Status*`, `Response*`, then exactly one of `Complete` or `Error`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SseEvent {
    Status { status: String },
    #[serde(rename = "chunk")]
    Response { chunk: String },
    Complete { key: String, value: Value },
    Error { detail: String },
}

impl SseEvent {
    pub fn status(message: impl Into<String>) -> Self {
        SseEvent::Status {
            status: message.into(),
        }
    }

    pub fn chunk(text: impl Into<String>) -> Self {
        SseEvent::Response { chunk: text.into() }
    }

    pub fn complete(key: impl Into<String>, value: Value) -> Self {
        SseEvent::Complete {
            key: key.into(),
            value,
        }
    }

    pub fn error(detail: impl Into<String>) -> Self {
        SseEvent::Error {
            detail: detail.into(),
        }
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            SseEvent::Status { .. } => "status",
            SseEvent::Response { .. } => "response",
            SseEvent::Complete { .. } => "complete",
            SseEvent::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SseEvent::Complete { .. } | SseEvent::Error { .. })
    }

    /// Server-sent-events wire frame.
    pub fn to_sse_string(&self) -> String {
        let data = serde_json::to_string(self)
            .unwrap_or_else(|_| json!({"type": "error", "detail": "unserializable event"}).to_string());
        format!("event: {}\ndata: {}\n\n", self.event_name(), data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_frame() {
        let frame = SseEvent::chunk("{\"slides\":[").to_sse_string();
        assert!(frame.starts_with("event: response\ndata: "));
        assert!(frame.ends_with("\n\n"));

        let data = frame
            .lines()
            .find_map(|l| l.strip_prefix("data: "))
            .unwrap();
        let value: Value = serde_json::from_str(data).unwrap();
        assert_eq!(value["type"], "chunk");
        assert_eq!(value["chunk"], "{\"slides\":[");
    }

    #[test]
    fn test_complete_and_error_frames() {
        let complete = SseEvent::complete("outline", json!({"title": "T"}));
        assert!(complete.is_terminal());
        assert!(complete
            .to_sse_string()
            .contains(r#""type":"complete","key":"outline","value":{"title":"T"}"#));

        let error = SseEvent::error("boom");
        assert_eq!(error.event_name(), "error");
        assert!(error.to_sse_string().contains(r#""detail":"boom""#));
        assert!(!SseEvent::status("working").is_terminal());
    }
}
