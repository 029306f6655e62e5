//! Per-chain execution context.

use crate::chain::approval::ApprovalHandler;
use crate::chain::outcome::ToolOutcome;
use crate::types::InvocationId;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default cap on invocations per chain.
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Default cap on trigger nesting.
pub const DEFAULT_MAX_DEPTH: usize = 5;

/// State for exactly one `execute_chain` call.
///
/// The caller builds it, the executor fills in progress (current
/// iteration and depth, executed invocations, outcomes), and the caller can
/// inspect it afterwards. Contexts are not shared between chains.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Conversation the chain belongs to
    pub conversation_id: String,
    /// Message that requested the initial tool
    pub message_id: String,
    /// Maximum invocations, initial one included
    pub max_iterations: usize,
    /// Maximum trigger nesting below the initial invocation
    pub max_depth: usize,
    /// Iteration number of the most recent invocation (starts at 1)
    pub current_iteration: usize,
    /// Depth of the invocation being expanded; unwinds as triggers finish
    /// and is 0 once the chain returns
    pub current_depth: usize,
    executed: Vec<InvocationId>,
    outcomes: HashMap<InvocationId, ToolOutcome>,
    approval_handler: Option<Arc<dyn ApprovalHandler>>,
    cancellation: Option<CancellationToken>,
    chain_budget: Option<Duration>,
}

impl ExecutionContext {
    /// Creates a context with default limits and no approval handler.
    #[must_use]
    pub fn new(conversation_id: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            message_id: message_id.into(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_depth: DEFAULT_MAX_DEPTH,
            current_iteration: 1,
            current_depth: 0,
            executed: Vec::new(),
            outcomes: HashMap::new(),
            approval_handler: None,
            cancellation: None,
            chain_budget: None,
        }
    }

    /// Sets the iteration cap.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the depth cap.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Sets the handler consulted for sensitive tools.
    #[must_use]
    pub fn with_approval_handler(mut self, handler: Arc<dyn ApprovalHandler>) -> Self {
        self.approval_handler = Some(handler);
        self
    }

    /// Sets a token that stops the chain when cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Sets a wall-clock budget for the whole chain.
    #[must_use]
    pub fn with_chain_budget(mut self, budget: Duration) -> Self {
        self.chain_budget = Some(budget);
        self
    }

    /// Returns the approval handler, if any.
    #[must_use]
    pub fn approval_handler(&self) -> Option<&Arc<dyn ApprovalHandler>> {
        self.approval_handler.as_ref()
    }

    /// Returns the cancellation token, if any.
    #[must_use]
    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }

    /// Returns the chain budget, if any.
    #[must_use]
    pub fn chain_budget(&self) -> Option<Duration> {
        self.chain_budget
    }

    /// Returns true if the cancellation token has fired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Returns the ids of executed invocations, in order.
    #[must_use]
    pub fn executed(&self) -> &[InvocationId] {
        &self.executed
    }

    /// Returns the outcome recorded for an invocation.
    #[must_use]
    pub fn outcome(&self, invocation_id: &InvocationId) -> Option<&ToolOutcome> {
        self.outcomes.get(invocation_id)
    }

    /// Returns the number of recorded outcomes.
    #[must_use]
    pub fn outcome_count(&self) -> usize {
        self.outcomes.len()
    }

    /// Records an outcome.
    pub(crate) fn record(&mut self, outcome: &ToolOutcome) {
        self.executed.push(outcome.invocation_id.clone());
        self.outcomes
            .insert(outcome.invocation_id.clone(), outcome.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::approval::AutoApprove;
    use crate::chain::outcome::ToolInvocation;
    use crate::tools::ToolOutput;
    use serde_json::json;

    #[test]
    fn defaults() {
        let context = ExecutionContext::new("conv", "msg");
        assert_eq!(context.max_iterations, 10);
        assert_eq!(context.max_depth, 5);
        assert_eq!(context.current_iteration, 1);
        assert_eq!(context.current_depth, 0);
        assert!(context.executed().is_empty());
        assert!(context.approval_handler().is_none());
        assert!(!context.is_cancelled());
    }

    #[test]
    fn builder_sets_limits_and_collaborators() {
        let token = CancellationToken::new();
        let context = ExecutionContext::new("conv", "msg")
            .with_max_iterations(3)
            .with_max_depth(1)
            .with_approval_handler(Arc::new(AutoApprove))
            .with_cancellation(token.clone())
            .with_chain_budget(Duration::from_secs(2));

        assert_eq!((context.max_iterations, context.max_depth), (3, 1));
        assert!(context.approval_handler().is_some());
        assert_eq!(context.chain_budget(), Some(Duration::from_secs(2)));

        token.cancel();
        assert!(context.is_cancelled());
    }

    #[test]
    fn record_tracks_order_and_lookup() {
        let mut context = ExecutionContext::new("conv", "msg");
        let outcome = ToolOutcome::succeeded(
            ToolInvocation::new("t", json!({}), 1, None),
            0,
            ToolOutput::new(json!(1)),
            Duration::ZERO,
        );

        context.record(&outcome);

        assert_eq!(context.executed(), &[outcome.invocation_id.clone()]);
        assert_eq!(context.outcome(&outcome.invocation_id), Some(&outcome));
        assert_eq!(context.outcome_count(), 1);
    }
}
