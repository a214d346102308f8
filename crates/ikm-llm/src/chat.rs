//! Vendor-neutral conversation types.
//!
//! A conversation is a sequence of [`Message`]s. Each carries a [`Role`],
//! an ordered [`ContentParts`] list and, for assistant turns, the
//! [`ToolCall`]s the model requested. Tool-role messages answer exactly
//! one call through `tool_call_id`.
//!
//! `ContentParts` keeps one invariant: two [`ContentPart::Text`] parts are
//! never adjacent. [`append_text`](ContentParts::append_text) and
//! [`push`](ContentParts::push) merge into the trailing text part.

use std::ops::Deref;

use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions for the model. Only ever the first message.
    System,
    /// The human side of the conversation.
    #[default]
    User,
    /// The model.
    Assistant,
    /// The result of one tool call.
    Tool,
}

impl Role {
    /// The lowercase wire name shared by every vendor.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

/// One piece of message content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },
    /// An image, either a URL or a `data:` URL with base64 data.
    Image {
        /// URL or base64 data URL.
        url: String,
    },
    /// An attached file.
    File {
        /// File name shown to the model.
        name: String,
        /// Base64 data URL of the file contents.
        data: String,
    },
    /// Model reasoning, with the vendor's opaque signature.
    Thinking {
        /// Human-readable reasoning text (may be empty).
        text: String,
        /// Opaque signature or encrypted blob (may be empty).
        signature: String,
    },
}

impl ContentPart {
    /// Shorthand for a [`ContentPart::Text`].
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Shorthand for a [`ContentPart::Image`].
    pub fn image(url: impl Into<String>) -> Self {
        Self::Image { url: url.into() }
    }

    /// Shorthand for a [`ContentPart::File`].
    pub fn file(name: impl Into<String>, data: impl Into<String>) -> Self {
        Self::File {
            name: name.into(),
            data: data.into(),
        }
    }

    /// A short kind label used in capability errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Image { .. } => "image",
            Self::File { .. } => "file",
            Self::Thinking { .. } => "thinking",
        }
    }
}

/// An ordered list of content parts with no two adjacent text parts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<ContentPart>")]
pub struct ContentParts(Vec<ContentPart>);

impl ContentParts {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a list holding a single text part.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self(vec![ContentPart::text(text)])
    }

    /// Appends `text`, merging into the trailing text part if there is one.
    pub fn append_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(ContentPart::Text { text: last }) = self.0.last_mut() {
            last.push_str(text);
        } else {
            self.0.push(ContentPart::text(text));
        }
    }

    /// Appends reasoning text to the open thinking part.
    ///
    /// A thinking part is open until it receives a signature; after that
    /// (or after any other part) a new one is started.
    pub fn append_thinking(&mut self, text: &str) {
        match self.0.last_mut() {
            Some(ContentPart::Thinking {
                text: last,
                signature,
            }) if signature.is_empty() => last.push_str(text),
            _ => self.0.push(ContentPart::Thinking {
                text: text.to_owned(),
                signature: String::new(),
            }),
        }
    }

    /// Appends a signature fragment to the trailing thinking part, starting
    /// one if the list does not end with thinking.
    pub fn append_signature(&mut self, fragment: &str) {
        if let Some(ContentPart::Thinking { signature, .. }) = self.0.last_mut() {
            signature.push_str(fragment);
        } else {
            self.0.push(ContentPart::Thinking {
                text: String::new(),
                signature: fragment.to_owned(),
            });
        }
    }

    /// Pushes a part, merging text into a trailing text part.
    pub fn push(&mut self, part: ContentPart) {
        match part {
            ContentPart::Text { text } => self.append_text(&text),
            other => self.0.push(other),
        }
    }

    /// Concatenates all text, rendering images and files as placeholders.
    ///
    /// ```rust
    /// use ikm_llm::{ContentPart, ContentParts};
    ///
    /// let mut parts = ContentParts::from_text("see");
    /// parts.push(ContentPart::image("https://x/cat.png"));
    /// assert_eq!(parts.text(), "see\n\n[image: https://x/cat.png]\n\n");
    /// ```
    pub fn text(&self) -> String {
        let mut out = String::new();
        for part in &self.0 {
            match part {
                ContentPart::Text { text } => out.push_str(text),
                ContentPart::Image { url } => {
                    out.push_str("\n\n[image: ");
                    out.push_str(url);
                    out.push_str("]\n\n");
                }
                ContentPart::File { name, .. } => {
                    out.push_str("\n\n[file: ");
                    out.push_str(name);
                    out.push_str("]\n\n");
                }
                ContentPart::Thinking { .. } => {}
            }
        }
        out
    }

    /// Consumes the list, returning the parts.
    pub fn into_vec(self) -> Vec<ContentPart> {
        self.0
    }
}

impl Deref for ContentParts {
    type Target = [ContentPart];

    fn deref(&self) -> &[ContentPart] {
        &self.0
    }
}

impl From<Vec<ContentPart>> for ContentParts {
    fn from(parts: Vec<ContentPart>) -> Self {
        let mut out = Self::new();
        for part in parts {
            out.push(part);
        }
        out
    }
}

impl<'a> IntoIterator for &'a ContentParts {
    type Item = &'a ContentPart;
    type IntoIter = std::slice::Iter<'a, ContentPart>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// The function half of a tool call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ToolCallFunction {
    /// Registered tool name.
    pub name: String,
    /// Raw JSON arguments, exactly as the model produced them.
    pub arguments: String,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ToolCall {
    /// Vendor-issued identifier, echoed back by the matching tool result.
    pub id: String,
    /// Position in the vendor's parallel tool-call stream.
    pub index: u32,
    /// What to call and with which arguments.
    pub function: ToolCallFunction,
}

impl ToolCall {
    /// Creates a tool call.
    pub fn new(
        id: impl Into<String>,
        index: u32,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            index,
            function: ToolCallFunction {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// One conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Message {
    /// Author of the message.
    pub role: Role,
    /// Ordered content.
    #[serde(default)]
    pub content: ContentParts,
    /// Tool calls requested by an assistant message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Tool name, on tool-role messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// The answered call, on tool-role messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Marks a prompt-cache boundary for vendors that take explicit markers.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cache_breakpoint: bool,
}

impl Message {
    fn with_text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: ContentParts::from_text(text),
            ..Self::default()
        }
    }

    /// A system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::with_text(Role::System, text)
    }

    /// A user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::with_text(Role::User, text)
    }

    /// An assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::with_text(Role::Assistant, text)
    }

    /// A user message with arbitrary parts.
    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self {
            role: Role::User,
            content: parts.into(),
            ..Self::default()
        }
    }

    /// The answer to tool call `tool_call_id`.
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            role: Role::Tool,
            content: ContentParts::from_text(content),
            name: Some(name.into()),
            tool_call_id: Some(tool_call_id.into()),
            ..Self::default()
        }
    }

    /// Adds a tool call (builder style).
    #[must_use]
    pub fn with_tool_call(mut self, call: ToolCall) -> Self {
        self.tool_calls.push(call);
        self
    }

    /// Shorthand for `self.content.text()`.
    pub fn text(&self) -> String {
        self.content.text()
    }
}
