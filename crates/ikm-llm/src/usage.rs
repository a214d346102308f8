//! Token and cost accounting.
//!
//! Every adapter reports a [`Usage`] record per turn. Records are summed
//! with saturating integer arithmetic, so an orchestration run's total
//! only ever grows.

use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

/// Token counts and estimated cost for one or more turns.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Usage {
    /// Prompt tokens, including cached and cache-written tokens.
    pub prompt_tokens: u64,
    /// Tokens generated by the model.
    pub completion_tokens: u64,
    /// Estimated or vendor-reported cost in US dollars.
    pub total_cost: f64,
}

impl Usage {
    /// Creates a usage record.
    pub fn new(prompt_tokens: u64, completion_tokens: u64, total_cost: f64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_cost,
        }
    }

    /// Prompt plus completion tokens.
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

impl Add for Usage {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl AddAssign for Usage {
    fn add_assign(&mut self, rhs: Self) {
        self.prompt_tokens = self.prompt_tokens.saturating_add(rhs.prompt_tokens);
        self.completion_tokens = self.completion_tokens.saturating_add(rhs.completion_tokens);
        self.total_cost += rhs.total_cost;
    }
}

impl AddAssign<&Usage> for Usage {
    fn add_assign(&mut self, rhs: &Self) {
        *self += *rhs;
    }
}
