//! Unified error type for every adapter and the turn orchestrator.
//!
//! Each adapter maps its transport failures, non-2xx responses and
//! in-band vendor errors into [`LlmError`], so callers match on a single
//! type regardless of which vendor produced the stream. Errors travel to
//! the caller inside [`Event::Error`](crate::Event::Error); they are
//! `Clone` so the orchestrator can feed the same event to its builder and
//! to the caller.
//!
//! # Terminal categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Transport | [`Http`](LlmError::Http), [`Auth`](LlmError::Auth), [`Timeout`](LlmError::Timeout) |
//! | Vendor in-band | [`Stream`](LlmError::Stream) |
//! | Orchestration | [`Protocol`](LlmError::Protocol), [`ToolNotFound`](LlmError::ToolNotFound), [`UnsupportedToolCallType`](LlmError::UnsupportedToolCallType), [`ToolDispatch`](LlmError::ToolDispatch) |
//! | Cancellation | [`Cancelled`](LlmError::Cancelled) |
//!
//! Malformed SSE payloads never become errors; adapters skip them.
//!
//! ```rust
//! use ikm_llm::LlmError;
//!
//! fn label(err: &LlmError) -> &'static str {
//!     if err.is_cancelled() { "cancelled" } else { "failed" }
//! }
//! assert_eq!(label(&LlmError::Cancelled), "cancelled");
//! ```

use std::fmt;

use serde_json::Value;

/// The unified error type surfaced by adapters and the orchestrator.
///
/// Variants are `#[non_exhaustive]`; always include a wildcard arm.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum LlmError {
    /// An HTTP-level failure (transport error, unexpected status code).
    ///
    /// `status` is `None` when the request never received a response
    /// (e.g. DNS failure, connection reset). For non-2xx responses
    /// `message` holds the response body verbatim.
    #[error("HTTP error (status={status:?}): {message}")]
    Http {
        /// The HTTP status code, if one was received.
        status: Option<http::StatusCode>,
        /// A human-readable description or the raw response body.
        message: String,
        /// Whether the caller should retry this request.
        retryable: bool,
    },

    /// The API key could not be attached to the request.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// The request could not be built (bad arguments JSON, invalid header).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A content part the target vendor cannot carry in this position.
    #[error("Unsupported content: {0}")]
    UnsupportedContent(String),

    /// An error reported by the vendor inside a 200 response body.
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// The response body could not be parsed.
    #[error("Response format error: {message}")]
    ResponseFormat {
        /// What went wrong during parsing.
        message: String,
        /// The raw payload, for diagnostics.
        raw: String,
    },

    /// The event sequence violated an invariant.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The model called a tool that is not registered.
    #[error("tool {0} not found")]
    ToolNotFound(String),

    /// The vendor announced a tool call whose `type` is not `function`.
    #[error("unsupported tool call type: {0}")]
    UnsupportedToolCallType(String),

    /// The concurrent tool-call group failed (a task panicked or was aborted).
    #[error("error executing tool calls: {0}")]
    ToolDispatch(String),

    /// The request exceeded the client-level timeout.
    #[error("Operation timed out after {elapsed_ms}ms")]
    Timeout {
        /// Milliseconds elapsed before the timeout fired.
        elapsed_ms: u64,
    },

    /// The caller's cancellation token fired.
    #[error("operation cancelled")]
    Cancelled,
}

impl LlmError {
    /// Returns `true` for cancellation, which callers render differently
    /// from failures.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns `true` if the error is transient and the request may succeed on retry.
    ///
    /// ```rust
    /// use ikm_llm::LlmError;
    ///
    /// let err = LlmError::Timeout { elapsed_ms: 5000 };
    /// assert!(err.is_retryable());
    /// assert!(!LlmError::Cancelled.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { retryable, .. } => *retryable,
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Maps a non-2xx response into an [`LlmError::Http`] carrying the
    /// status and the raw body.
    pub fn from_status(status: http::StatusCode, body: &str) -> Self {
        Self::Http {
            status: Some(status),
            message: body.to_owned(),
            retryable: matches!(status.as_u16(), 408 | 429 | 500 | 502 | 503 | 504 | 529),
        }
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        Self::ResponseFormat {
            message: err.to_string(),
            raw: String::new(),
        }
    }
}

/// A vendor-reported error delivered inside a successful streaming response.
///
/// Renders as `"<message> (<code>): <metadata>"` where the metadata is its
/// JSON encoding, or `null` when absent.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamError {
    /// Vendor error code (numeric codes are kept in their decimal form).
    pub code: String,
    /// Human-readable error description.
    pub message: String,
    /// Extra vendor detail, if any.
    pub metadata: Option<Value>,
}

impl StreamError {
    /// Creates a stream error without metadata.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            metadata: None,
        }
    }

    /// Attaches vendor metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): ", self.message, self.code)?;
        match &self.metadata {
            Some(meta) => write!(f, "{meta}"),
            None => f.write_str("null"),
        }
    }
}

impl std::error::Error for StreamError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_http() {
        let err = LlmError::Http {
            status: Some(http::StatusCode::TOO_MANY_REQUESTS),
            message: "rate limited".into(),
            retryable: true,
        };
        let display = format!("{err}");
        assert!(display.contains("429"));
        assert!(display.contains("rate limited"));
    }

    #[test]
    fn test_from_status_keeps_body() {
        let err = LlmError::from_status(http::StatusCode::BAD_REQUEST, r#"{"error":"bad"}"#);
        assert!(matches!(
            &err,
            LlmError::Http { status: Some(s), message, retryable: false }
                if *s == http::StatusCode::BAD_REQUEST && message == r#"{"error":"bad"}"#
        ));
    }

    #[test]
    fn test_from_status_retryable() {
        assert!(LlmError::from_status(http::StatusCode::SERVICE_UNAVAILABLE, "").is_retryable());
        assert!(LlmError::from_status(http::StatusCode::TOO_MANY_REQUESTS, "").is_retryable());
        assert!(!LlmError::from_status(http::StatusCode::UNAUTHORIZED, "").is_retryable());
    }

    #[test]
    fn test_cancelled_is_distinguished() {
        assert!(LlmError::Cancelled.is_cancelled());
        assert!(!LlmError::Protocol("x".into()).is_cancelled());
        assert!(!LlmError::Timeout { elapsed_ms: 1 }.is_cancelled());
    }

    #[test]
    fn test_stream_error_display_with_metadata() {
        let err = StreamError::new("502", "upstream failed")
            .with_metadata(serde_json::json!({"provider_name": "Anthropic"}));
        assert_eq!(
            err.to_string(),
            r#"upstream failed (502): {"provider_name":"Anthropic"}"#
        );
    }

    #[test]
    fn test_stream_error_display_without_metadata() {
        let err = StreamError::new("overloaded_error", "Overloaded");
        assert_eq!(err.to_string(), "Overloaded (overloaded_error): null");
    }

    #[test]
    fn test_stream_error_is_transparent() {
        let err: LlmError = StreamError::new("429", "slow down").into();
        assert_eq!(err.to_string(), "slow down (429): null");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not valid json").unwrap_err();
        let llm_err: LlmError = json_err.into();
        assert!(matches!(llm_err, LlmError::ResponseFormat { .. }));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LlmError>();
    }
}
