//! Per-call stream configuration.
//!
//! A [`StreamConfig`] is fixed for the whole of one `stream` call. Start
//! from [`Default`] and apply `with_*` options:
//!
//! ```rust
//! use ikm_llm::{ReasoningEffort, StreamConfig};
//!
//! let config = StreamConfig::default()
//!     .with_max_turns(10)
//!     .with_reasoning_effort(ReasoningEffort::Medium)
//!     .with_stop_condition(|turn, _history| turn >= 4);
//! assert_eq!(config.max_tokens, 8192);
//! ```

use std::fmt;
use std::sync::Arc;

use crate::chat::Message;

/// Decides, after a turn's tool results are appended, whether to stop.
///
/// Receives the zero-based turn number and the working history.
pub type StopCondition = Arc<dyn Fn(usize, &[Message]) -> bool + Send + Sync>;

/// How much reasoning to request from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ReasoningEffort {
    /// No reasoning requested.
    #[default]
    Off,
    /// Level 1.
    Low,
    /// Level 2.
    Medium,
    /// Level 3.
    High,
}

impl ReasoningEffort {
    /// Maps a numeric level; anything at or above 3 is [`High`](Self::High).
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => Self::Off,
            1 => Self::Low,
            2 => Self::Medium,
            _ => Self::High,
        }
    }

    /// The numeric level (0 to 3).
    pub fn level(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }

    /// Whether any reasoning is requested.
    pub fn is_enabled(self) -> bool {
        self != Self::Off
    }

    /// The coarse `low`/`medium`/`high` label, `None` when off.
    pub fn as_effort_str(self) -> Option<&'static str> {
        match self {
            Self::Off => None,
            Self::Low => Some("low"),
            Self::Medium => Some("medium"),
            Self::High => Some("high"),
        }
    }
}

/// Configuration for one orchestration run.
#[derive(Clone)]
pub struct StreamConfig {
    /// Completion token limit per turn.
    pub max_tokens: u32,
    /// Maximum number of turns (wire calls).
    pub max_turns: usize,
    /// Requested reasoning effort.
    pub reasoning_effort: ReasoningEffort,
    /// Sampling temperature.
    pub temperature: f32,
    /// Optional early stop, checked after each turn that ran tools.
    pub stop_condition: Option<StopCondition>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_tokens: 8192,
            max_turns: 1,
            reasoning_effort: ReasoningEffort::Off,
            temperature: 1.0,
            stop_condition: None,
        }
    }
}

impl fmt::Debug for StreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamConfig")
            .field("max_tokens", &self.max_tokens)
            .field("max_turns", &self.max_turns)
            .field("reasoning_effort", &self.reasoning_effort)
            .field("temperature", &self.temperature)
            .field("stop_condition", &self.stop_condition.as_ref().map(|_| "..."))
            .finish()
    }
}

impl StreamConfig {
    /// Sets the completion token limit.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the maximum number of turns.
    #[must_use]
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Sets the reasoning effort.
    #[must_use]
    pub fn with_reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
        self.reasoning_effort = effort;
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the stop condition.
    #[must_use]
    pub fn with_stop_condition<F>(mut self, condition: F) -> Self
    where
        F: Fn(usize, &[Message]) -> bool + Send + Sync + 'static,
    {
        self.stop_condition = Some(Arc::new(condition));
        self
    }

    /// Evaluates the stop condition, `false` when none is set.
    pub fn should_stop(&self, turn: usize, history: &[Message]) -> bool {
        self.stop_condition
            .as_ref()
            .is_some_and(|condition| condition(turn, history))
    }
}
