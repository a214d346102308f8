//! The `Tool` capability and its concurrent dispatch.
//!
//! ```text
//!   Tool           : name, description, JSON schema, async call
//!     │
//!   ToolRegistry   : ordered by registration, resolved by name
//!     │
//!   dispatch_all   : one task per call, joined as a group
//! ```
//!
//! A tool receives its arguments as the raw JSON string the model
//! produced and returns opaque text. A returned [`ToolError`] is not
//! fatal: the orchestrator records it as `"Error: <message>"` and the
//! conversation continues.
//!
//! # Example
//!
//! ```rust
//! use ikm_llm::tool::{tool_fn, Tool, ToolSpec};
//! use serde_json::json;
//!
//! let echo = tool_fn(
//!     ToolSpec::new("echo", "Echo the arguments back", json!({"type": "object"})),
//!     |arguments, _cancel| async move { Ok(arguments) },
//! );
//! assert_eq!(echo.spec().name, "echo");
//! ```

mod execution;
mod registry;

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

pub(crate) use execution::dispatch_all;
pub use registry::ToolRegistry;

/// Boxed future returned by [`Tool::call`].
pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send + 'a>>;

/// What a tool advertises to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Unique tool name.
    pub name: String,
    /// What the tool does, for the model.
    pub description: String,
    /// JSON Schema of the arguments object.
    pub parameters: Value,
}

impl ToolSpec {
    /// Creates a tool spec.
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// Error returned by a tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ToolError {
    /// Human-readable error description.
    pub message: String,
}

impl ToolError {
    /// Creates a new tool error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// An external capability the model can invoke by name.
///
/// The trait is object-safe (boxed futures) so tools are stored as
/// `Arc<dyn Tool>`. `cancel` fires when the caller cancels the stream
/// or a sibling call in the same turn fails.
pub trait Tool: Send + Sync {
    /// The tool's name, description and argument schema.
    fn spec(&self) -> ToolSpec;

    /// Runs the tool with the model's raw JSON arguments.
    fn call<'a>(&'a self, arguments: &'a str, cancel: CancellationToken) -> ToolFuture<'a>;
}

/// A tool backed by an async closure, created by [`tool_fn`].
pub struct FnTool<F> {
    spec: ToolSpec,
    handler: F,
}

impl<F> fmt::Debug for FnTool<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTool")
            .field("name", &self.spec.name)
            .finish_non_exhaustive()
    }
}

impl<F, Fut> Tool for FnTool<F>
where
    F: Fn(String, CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, ToolError>> + Send + 'static,
{
    fn spec(&self) -> ToolSpec {
        self.spec.clone()
    }

    fn call<'a>(&'a self, arguments: &'a str, cancel: CancellationToken) -> ToolFuture<'a> {
        Box::pin((self.handler)(arguments.to_owned(), cancel))
    }
}

/// Wraps an async closure as a [`Tool`].
///
/// The closure receives an owned copy of the arguments and the call's
/// cancellation token.
pub fn tool_fn<F, Fut>(spec: ToolSpec, handler: F) -> FnTool<F>
where
    F: Fn(String, CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, ToolError>> + Send + 'static,
{
    FnTool { spec, handler }
}
