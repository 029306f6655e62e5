//! Trailing-window loop detection.
//!
//! A chain is considered looping when one tool name appears more than
//! `threshold` times among the last `window` invocations.

use crate::chain::outcome::ToolOutcome;
use std::collections::HashMap;

/// Default number of trailing invocations inspected.
pub const DEFAULT_LOOP_WINDOW: usize = 5;

/// Default number of repeats tolerated inside the window.
pub const DEFAULT_LOOP_THRESHOLD: usize = 2;

/// Detects repeating tools in a chain's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopDetector {
    window: usize,
    threshold: usize,
}

impl Default for LoopDetector {
    fn default() -> Self {
        Self::new(DEFAULT_LOOP_WINDOW, DEFAULT_LOOP_THRESHOLD)
    }
}

impl LoopDetector {
    /// Creates a detector. A zero window disables detection.
    #[must_use]
    pub fn new(window: usize, threshold: usize) -> Self {
        Self { window, threshold }
    }

    /// Returns the window size.
    #[must_use]
    pub fn window(&self) -> usize {
        self.window
    }

    /// Returns the tolerated repeat count.
    #[must_use]
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Returns the first tool in the trailing window that repeats more
    /// than the threshold allows.
    #[must_use]
    pub fn repeating_tool<'a>(&self, history: &'a [ToolOutcome]) -> Option<&'a str> {
        if self.window == 0 || history.len() <= self.threshold {
            return None;
        }

        let start = history.len().saturating_sub(self.window);
        let recent = &history[start..];

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for outcome in recent {
            *counts.entry(outcome.tool_name.as_str()).or_default() += 1;
        }

        recent
            .iter()
            .map(|outcome| outcome.tool_name.as_str())
            .find(|name| counts.get(name).is_some_and(|count| *count > self.threshold))
    }

    /// Returns true if the history shows a loop.
    #[must_use]
    pub fn is_looping(&self, history: &[ToolOutcome]) -> bool {
        self.repeating_tool(history).is_some()
    }
}
