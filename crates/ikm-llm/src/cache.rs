//! Token-boundary cache checkpoints for conversation history.
//!
//! Vendors that accept `cache_control` markers on individual messages bill
//! a cache write every time a marker moves. [`CacheCheckpoints`] only moves
//! the marker when the cumulative token count of a run crosses a multiple
//! of the interval, so consecutive turns inside one bucket keep hitting
//! the same cached prefix.

use crate::chat::{Message, Role};
use crate::usage::Usage;

/// Default token interval between cache checkpoints.
pub const DEFAULT_CHECKPOINT_TOKENS: u64 = 7_500;

/// Tracks token counts between two wire calls and places one cache
/// breakpoint on the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheCheckpoints {
    interval: u64,
    last_tokens: u64,
    current_tokens: u64,
}

impl Default for CacheCheckpoints {
    fn default() -> Self {
        Self::new(DEFAULT_CHECKPOINT_TOKENS)
    }
}

impl CacheCheckpoints {
    /// Creates a tracker; an interval of zero is treated as one.
    pub fn new(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
            last_tokens: 0,
            current_tokens: 0,
        }
    }

    /// The token interval.
    pub fn interval(&self) -> u64 {
        self.interval
    }

    /// Records the usage of the latest wire call.
    pub fn record(&mut self, usage: &Usage) {
        self.last_tokens = self.current_tokens;
        self.current_tokens = usage.prompt_tokens.saturating_add(usage.completion_tokens);
    }

    /// Whether the last two recorded calls fall in different buckets.
    pub fn crossed_boundary(&self) -> bool {
        self.last_tokens / self.interval != self.current_tokens / self.interval
    }

    /// Moves the breakpoint to the newest assistant message if a boundary
    /// was crossed. Returns whether the history changed.
    pub fn apply(&self, history: &mut [Message]) -> bool {
        if !self.crossed_boundary() {
            return false;
        }
        for message in history.iter_mut() {
            message.cache_breakpoint = false;
        }
        if let Some(newest) = history.iter_mut().rev().find(|m| m.role == Role::Assistant) {
            newest.cache_breakpoint = true;
        }
        true
    }
}
