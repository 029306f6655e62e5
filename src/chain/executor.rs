//! Chain executor.
//!
//! Runs an initial tool and then, depth first, every tool its results
//! trigger, until the triggers are exhausted or a limit stops expansion.
//!
//! ## Stop conditions
//!
//! Checked in this order before every invocation after the first:
//!
//! 1. the context's cancellation token fired (`cancelled`)
//! 2. the chain budget is spent (`timed_out`)
//! 3. the iteration cap is reached (`max_iterations_reached`)
//! 4. the trailing window shows a repeating tool (`loop_detected`)
//!
//! Triggers of an outcome already at the depth cap are not expanded
//! (`max_depth_reached`); their siblings and ancestors' remaining triggers
//! still run.

use crate::chain::approval::ApprovalPolicy;
use crate::chain::context::{ExecutionContext, DEFAULT_MAX_DEPTH, DEFAULT_MAX_ITERATIONS};
use crate::chain::extraction::ParameterExtractor;
use crate::chain::loop_detect::{LoopDetector, DEFAULT_LOOP_THRESHOLD, DEFAULT_LOOP_WINDOW};
use crate::chain::outcome::{ChainResult, ToolInvocation, ToolOutcome};
use crate::tools::{ToolError, ToolRegistry, TriggeredTool, DEFAULT_TOOL_TIMEOUT};
use crate::types::{ChainId, InvocationId};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Limits applied to every chain an executor runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainLimits {
    /// Default iteration cap for new contexts
    pub max_iterations: usize,
    /// Default depth cap for new contexts
    pub max_depth: usize,
    /// Time allowance for tools that did not register their own
    pub invocation_timeout: Duration,
    /// Wall-clock budget for a whole chain, unless the context sets one
    pub chain_timeout: Option<Duration>,
    /// Trailing invocations inspected by loop detection
    pub loop_window: usize,
    /// Repeats tolerated inside the loop window
    pub loop_threshold: usize,
}

impl Default for ChainLimits {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_depth: DEFAULT_MAX_DEPTH,
            invocation_timeout: DEFAULT_TOOL_TIMEOUT,
            chain_timeout: None,
            loop_window: DEFAULT_LOOP_WINDOW,
            loop_threshold: DEFAULT_LOOP_THRESHOLD,
        }
    }
}

impl ChainLimits {
    /// Sets the iteration and depth caps.
    #[must_use]
    pub fn with_caps(mut self, max_iterations: usize, max_depth: usize) -> Self {
        self.max_iterations = max_iterations;
        self.max_depth = max_depth;
        self
    }

    /// Sets the default invocation timeout.
    #[must_use]
    pub fn with_invocation_timeout(mut self, timeout: Duration) -> Self {
        self.invocation_timeout = timeout;
        self
    }

    /// Sets the chain budget.
    #[must_use]
    pub fn with_chain_timeout(mut self, timeout: Duration) -> Self {
        self.chain_timeout = Some(timeout);
        self
    }

    /// Sets the loop detection window and threshold.
    #[must_use]
    pub fn with_loop_detection(mut self, window: usize, threshold: usize) -> Self {
        self.loop_window = window;
        self.loop_threshold = threshold;
        self
    }

    /// Returns the configured loop detector.
    #[must_use]
    pub fn loop_detector(&self) -> LoopDetector {
        LoopDetector::new(self.loop_window, self.loop_threshold)
    }
}

/// Why a chain stopped before its triggers were exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    Cancelled,
    BudgetExhausted,
}

/// Triggers of one successful outcome still waiting to run.
struct Frame {
    parent_id: InvocationId,
    parent_result: Value,
    pending: VecDeque<TriggeredTool>,
    depth: usize,
}

impl Frame {
    fn from_outcome(outcome: &ToolOutcome) -> Self {
        Self {
            parent_id: outcome.invocation_id.clone(),
            parent_result: outcome.result.clone(),
            pending: outcome.triggered.iter().cloned().collect(),
            depth: outcome.depth,
        }
    }
}

/// Progress of one chain, turned into a `ChainResult` at the end.
struct ChainRun {
    chain_id: ChainId,
    started: Instant,
    outcomes: Vec<ToolOutcome>,
    error: Option<String>,
    loop_detected: bool,
    max_iterations_reached: bool,
    max_depth_reached: bool,
    cancelled: bool,
    timed_out: bool,
}

impl ChainRun {
    fn new() -> Self {
        Self {
            chain_id: ChainId::new(),
            started: Instant::now(),
            outcomes: Vec::new(),
            error: None,
            loop_detected: false,
            max_iterations_reached: false,
            max_depth_reached: false,
            cancelled: false,
            timed_out: false,
        }
    }

    fn interrupt(&mut self, interrupt: Interrupt) {
        match interrupt {
            Interrupt::Cancelled => {
                self.cancelled = true;
                self.error = Some("chain cancelled".to_string());
            }
            Interrupt::BudgetExhausted => {
                self.timed_out = true;
                self.error = Some("chain time budget exhausted".to_string());
            }
        }
    }

    fn finish(self) -> ChainResult {
        let last = self.outcomes.last();
        let stopped_early = self.loop_detected || self.cancelled || self.timed_out;

        let success = !stopped_early && last.is_some_and(|outcome| outcome.success);
        let error = if stopped_early {
            self.error
        } else {
            last.and_then(|outcome| outcome.error.clone()).or(self.error)
        };
        let final_result = last.map(|outcome| outcome.result.clone()).unwrap_or(Value::Null);

        ChainResult {
            chain_id: self.chain_id,
            final_result,
            total_iterations: self.outcomes.len(),
            execution_chain: self.outcomes,
            total_execution_time: self.started.elapsed().as_secs_f64(),
            success,
            error,
            loop_detected: self.loop_detected,
            max_iterations_reached: self.max_iterations_reached,
            max_depth_reached: self.max_depth_reached,
            cancelled: self.cancelled,
            timed_out: self.timed_out,
        }
    }
}

/// Runs tool chains against a shared registry.
///
/// # Example
///
/// ```rust,ignore
/// use acton_chain::prelude::*;
///
/// let registry = Arc::new(ToolRegistry::new());
/// BuiltinTools::all().register_into(&registry)?;
///
/// let executor = ChainExecutor::new(Arc::clone(&registry));
/// let mut context = executor.context("conversation-1", "message-1");
/// let result = executor
///     .execute_chain("smart_calculator", json!({"expression": "6 * 7"}), &mut context)
///     .await;
/// assert!(result.success);
/// ```
#[derive(Debug, Clone)]
pub struct ChainExecutor {
    registry: Arc<ToolRegistry>,
    limits: ChainLimits,
    policy: ApprovalPolicy,
    extractor: ParameterExtractor,
}

impl ChainExecutor {
    /// Creates an executor with default limits, policy and extractor.
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            limits: ChainLimits::default(),
            policy: ApprovalPolicy::default(),
            extractor: ParameterExtractor::default(),
        }
    }

    /// Sets the limits.
    #[must_use]
    pub fn with_limits(mut self, limits: ChainLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Sets the approval policy.
    #[must_use]
    pub fn with_policy(mut self, policy: ApprovalPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the parameter extractor.
    #[must_use]
    pub fn with_extractor(mut self, extractor: ParameterExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Returns the limits.
    #[must_use]
    pub fn limits(&self) -> &ChainLimits {
        &self.limits
    }

    /// Updates the default iteration and depth caps.
    pub fn set_caps(&mut self, max_iterations: usize, max_depth: usize) {
        self.limits.max_iterations = max_iterations;
        self.limits.max_depth = max_depth;
    }

    /// Returns the registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Returns the approval policy.
    #[must_use]
    pub fn policy(&self) -> &ApprovalPolicy {
        &self.policy
    }

    /// Creates a context carrying this executor's default caps.
    #[must_use]
    pub fn context(
        &self,
        conversation_id: impl Into<String>,
        message_id: impl Into<String>,
    ) -> ExecutionContext {
        ExecutionContext::new(conversation_id, message_id)
            .with_max_iterations(self.limits.max_iterations)
            .with_max_depth(self.limits.max_depth)
    }

    /// Runs `initial_tool` and everything it triggers.
    ///
    /// Never fails: every failure mode is reported in the returned
    /// `ChainResult` and its outcomes.
    pub async fn execute_chain(
        &self,
        initial_tool: &str,
        initial_args: Value,
        context: &mut ExecutionContext,
    ) -> ChainResult {
        let mut run = ChainRun::new();
        let deadline = context
            .chain_budget()
            .or(self.limits.chain_timeout)
            .map(|budget| run.started + budget);
        let detector = self.limits.loop_detector();

        tracing::info!(
            chain_id = %run.chain_id,
            conversation_id = %context.conversation_id,
            tool_name = %initial_tool,
            max_iterations = context.max_iterations,
            max_depth = context.max_depth,
            "Starting tool chain"
        );

        if !self.registry.contains(initial_tool) {
            tracing::warn!(
                chain_id = %run.chain_id,
                tool_name = %initial_tool,
                "Initial tool not registered; chain aborted"
            );
            run.error = Some(ToolError::not_found(initial_tool).to_string());
            return self.finish(run);
        }

        if context.is_cancelled() {
            run.interrupt(Interrupt::Cancelled);
            return self.finish(run);
        }

        context.current_iteration = 1;
        context.current_depth = 0;

        let initial = ToolInvocation::new(initial_tool, initial_args, 1, None);
        let (outcome, interrupt) = self.invoke(initial, 0, context, deadline).await;
        let mut stack = Vec::new();
        self.accept(outcome, context, &mut run, &mut stack);
        if let Some(interrupt) = interrupt {
            run.interrupt(interrupt);
            return self.finish(run);
        }

        loop {
            let Some(frame) = stack.last_mut() else {
                break;
            };
            let Some(trigger) = frame.pending.pop_front() else {
                stack.pop();
                context.current_depth = stack.last().map_or(0, |frame| frame.depth);
                continue;
            };

            if context.is_cancelled() {
                run.interrupt(Interrupt::Cancelled);
                break;
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                run.interrupt(Interrupt::BudgetExhausted);
                break;
            }
            if context.current_iteration >= context.max_iterations {
                tracing::debug!(
                    chain_id = %run.chain_id,
                    max_iterations = context.max_iterations,
                    "Iteration cap reached"
                );
                run.max_iterations_reached = true;
                break;
            }
            if let Some(tool) = detector.repeating_tool(&run.outcomes) {
                tracing::warn!(
                    chain_id = %run.chain_id,
                    tool_name = %tool,
                    window = detector.window(),
                    threshold = detector.threshold(),
                    "Loop detected"
                );
                run.error = Some(format!(
                    "loop detected: tool '{}' ran more than {} times in the last {} invocations",
                    tool,
                    detector.threshold(),
                    detector.window()
                ));
                run.loop_detected = true;
                break;
            }

            let depth = frame.depth + 1;
            let arguments = self.extractor.extract(&trigger, &frame.parent_result);
            let parent_id = frame.parent_id.clone();

            context.current_iteration += 1;
            context.current_depth = depth;

            let invocation = ToolInvocation::new(
                trigger.tool,
                arguments,
                context.current_iteration,
                Some(parent_id),
            );
            let (outcome, interrupt) = self.invoke(invocation, depth, context, deadline).await;
            self.accept(outcome, context, &mut run, &mut stack);
            if let Some(interrupt) = interrupt {
                run.interrupt(interrupt);
                break;
            }
        }

        context.current_depth = 0;
        self.finish(run)
    }

    /// Records an outcome and queues its triggers, respecting the depth cap.
    fn accept(
        &self,
        outcome: ToolOutcome,
        context: &mut ExecutionContext,
        run: &mut ChainRun,
        stack: &mut Vec<Frame>,
    ) {
        context.record(&outcome);

        if outcome.success && !outcome.triggered.is_empty() {
            if outcome.depth >= context.max_depth {
                tracing::debug!(
                    chain_id = %run.chain_id,
                    tool_name = %outcome.tool_name,
                    depth = outcome.depth,
                    skipped = outcome.triggered.len(),
                    "Depth cap reached; triggers not expanded"
                );
                run.max_depth_reached = true;
            } else {
                stack.push(Frame::from_outcome(&outcome));
            }
        }

        run.outcomes.push(outcome);
    }

    fn finish(&self, run: ChainRun) -> ChainResult {
        let result = run.finish();
        tracing::info!(
            chain_id = %result.chain_id,
            success = result.success,
            total_iterations = result.total_iterations,
            loop_detected = result.loop_detected,
            max_iterations_reached = result.max_iterations_reached,
            max_depth_reached = result.max_depth_reached,
            cancelled = result.cancelled,
            timed_out = result.timed_out,
            elapsed_secs = result.total_execution_time,
            "Tool chain finished"
        );
        result
    }

    /// Runs one invocation through the approval gate and the registry.
    async fn invoke(
        &self,
        mut invocation: ToolInvocation,
        depth: usize,
        context: &ExecutionContext,
        deadline: Option<Instant>,
    ) -> (ToolOutcome, Option<Interrupt>) {
        let started = Instant::now();
        let tool_name = invocation.tool_name.clone();

        invocation.requires_approval = self.registry.contains(&tool_name)
            && (self.policy.requires_approval(&tool_name, &invocation.arguments)
                || self.registry.is_sensitive(&tool_name));

        if invocation.requires_approval {
            let (approved, interrupt, reason) = self.request_approval(&invocation, context).await;
            if !approved {
                tracing::warn!(
                    tool_name = %tool_name,
                    iteration = invocation.iteration,
                    reason,
                    "Tool invocation denied"
                );
                let error = ToolError::approval_denied(&tool_name, reason);
                return (
                    ToolOutcome::failed(invocation, depth, &error, started.elapsed()),
                    interrupt,
                );
            }
        }

        let mut timeout = self
            .registry
            .timeout_for(&tool_name)
            .unwrap_or(self.limits.invocation_timeout);
        let mut bounded_by_budget = false;
        if let Some(deadline) = deadline {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining < timeout {
                timeout = remaining;
                bounded_by_budget = true;
            }
        }

        tracing::debug!(
            tool_name = %tool_name,
            iteration = invocation.iteration,
            depth,
            timeout_secs = timeout.as_secs_f64(),
            "Invoking tool"
        );

        let executed = tokio::time::timeout(
            timeout,
            self.registry
                .execute(&tool_name, invocation.arguments.clone()),
        )
        .await;

        match executed {
            Ok(Ok(output)) => (
                ToolOutcome::succeeded(invocation, depth, output, started.elapsed()),
                None,
            ),
            Ok(Err(error)) => {
                tracing::warn!(
                    tool_name = %tool_name,
                    iteration = invocation.iteration,
                    error = %error,
                    "Tool invocation failed"
                );
                (
                    ToolOutcome::failed(invocation, depth, &error, started.elapsed()),
                    None,
                )
            }
            Err(_) => {
                tracing::warn!(
                    tool_name = %tool_name,
                    iteration = invocation.iteration,
                    timeout_secs = timeout.as_secs_f64(),
                    "Tool invocation timed out"
                );
                let error = ToolError::timeout(&tool_name, timeout);
                let interrupt = bounded_by_budget.then_some(Interrupt::BudgetExhausted);
                (
                    ToolOutcome::failed(invocation, depth, &error, started.elapsed()),
                    interrupt,
                )
            }
        }
    }

    /// Asks the context's handler, racing the cancellation token.
    async fn request_approval(
        &self,
        invocation: &ToolInvocation,
        context: &ExecutionContext,
    ) -> (bool, Option<Interrupt>, &'static str) {
        let Some(handler) = context.approval_handler() else {
            return (false, None, "no approval handler configured");
        };

        let approved = match context.cancellation() {
            Some(token) => {
                tokio::select! {
                    biased;
                    () = token.cancelled() => {
                        return (false, Some(Interrupt::Cancelled), "chain cancelled while awaiting approval");
                    }
                    approved = handler.approve(invocation) => approved,
                }
            }
            None => handler.approve(invocation).await,
        };

        if approved {
            (true, None, "approved")
        } else {
            (false, None, "rejected by approval handler")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::approval::{AutoApprove, AutoDeny, ChannelApproval};
    use crate::tools::{
        InputSchema, ToolDescriptor, ToolFuture, ToolHandler, ToolMetadata, ToolOutput,
    };
    use schemars::JsonSchema;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_util::sync::CancellationToken;

    #[derive(Deserialize, JsonSchema)]
    struct ExpressionArgs {
        expression: String,
    }

    #[derive(Debug)]
    struct Counting {
        calls: Arc<AtomicUsize>,
        output: Value,
    }

    impl ToolHandler for Counting {
        fn call(&self, _args: Value) -> ToolFuture {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let output = self.output.clone();
            Box::pin(async move { Ok(ToolOutput::from(output)) })
        }
    }

    #[derive(Debug)]
    struct Sleepy(Duration);

    impl ToolHandler for Sleepy {
        fn call(&self, _args: Value) -> ToolFuture {
            let delay = self.0;
            Box::pin(async move {
                tokio::time::sleep(delay).await;
                Ok(ToolOutput::new(json!("late")))
            })
        }
    }

    fn plain(name: &str) -> ToolDescriptor {
        ToolDescriptor::new(name, format!("{name} test tool"), InputSchema::new())
    }

    fn emitter(registry: &ToolRegistry, name: &str, output: Value) -> Arc<AtomicUsize> {
        let calls = Arc::new(AtomicUsize::new(0));
        registry
            .register(
                plain(name),
                Counting {
                    calls: Arc::clone(&calls),
                    output,
                },
            )
            .unwrap();
        calls
    }

    fn calculator(registry: &ToolRegistry) {
        registry
            .register_fn("calculate", "Adds", |args: ExpressionArgs| {
                let sum: i64 = args
                    .expression
                    .split('+')
                    .map(|part| part.trim().parse::<i64>().unwrap_or(0))
                    .sum();
                Ok::<_, ToolError>(json!({"result": sum, "expression": args.expression}))
            })
            .unwrap();
    }

    fn executor(registry: ToolRegistry) -> ChainExecutor {
        ChainExecutor::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn single_tool_without_triggers() {
        let registry = ToolRegistry::new();
        emitter(&registry, "solo", json!({"result": "done"}));
        let executor = executor(registry);
        let mut context = executor.context("c", "m");

        let result = executor.execute_chain("solo", json!({}), &mut context).await;

        assert!(result.success);
        assert_eq!(result.total_iterations, 1);
        assert_eq!(result.final_result, json!({"result": "done"}));
        assert_eq!(context.executed().len(), 1);
    }

    #[tokio::test]
    async fn starter_triggers_calculate() {
        let registry = ToolRegistry::new();
        emitter(
            &registry,
            "chain_starter",
            json!({"processed_data": "5 + 3", "next_tools": ["calculate"]}),
        );
        calculator(&registry);
        let executor = executor(registry);
        let mut context = executor.context("c", "m");

        let result = executor
            .execute_chain("chain_starter", json!({"input_text": "5 + 3"}), &mut context)
            .await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.tool_names(), vec!["chain_starter", "calculate"]);
        let second = &result.execution_chain[1];
        assert_eq!(second.result["result"], 8);
        assert_eq!(second.arguments, json!({"expression": "5 + 3"}));
        assert_eq!(second.parent_id.as_ref(), Some(&result.execution_chain[0].invocation_id));
        assert_eq!((second.iteration, second.depth), (2, 1));
    }

    #[tokio::test]
    async fn unknown_initial_tool_aborts() {
        let executor = executor(ToolRegistry::new());
        let mut context = executor.context("c", "m");

        let result = executor.execute_chain("missing", json!({}), &mut context).await;

        assert!(!result.success);
        assert_eq!(result.total_iterations, 0);
        assert!(result.execution_chain.is_empty());
        assert!(result.error.unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn iteration_cap_stops_self_trigger() {
        let registry = ToolRegistry::new();
        emitter(&registry, "again", json!({"next_tools": ["again"]}));
        let executor = executor(registry);
        let mut context = executor.context("c", "m").with_max_iterations(2);

        let result = executor.execute_chain("again", json!({}), &mut context).await;

        assert_eq!(result.total_iterations, 2);
        assert!(result.max_iterations_reached);
        assert!(!result.loop_detected);
        assert!(result.success);
    }

    #[tokio::test]
    async fn loop_detection_stops_self_trigger() {
        let registry = ToolRegistry::new();
        let calls = emitter(&registry, "again", json!({"next_tools": ["again"]}));
        let executor = executor(registry);
        let mut context = executor.context("c", "m");

        let result = executor.execute_chain("again", json!({}), &mut context).await;

        assert!(result.loop_detected);
        assert!(!result.success);
        assert_eq!(result.total_iterations, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(result.error.unwrap().contains("loop detected"));
    }

    #[tokio::test]
    async fn depth_cap_skips_deeper_triggers() {
        let registry = ToolRegistry::new();
        emitter(&registry, "a", json!({"next_tools": ["b"]}));
        emitter(&registry, "b", json!({"next_tools": ["c"]}));
        let c_calls = emitter(&registry, "c", json!("leaf"));
        let executor = executor(registry);
        let mut context = executor.context("c", "m").with_max_depth(1);

        let result = executor.execute_chain("a", json!({}), &mut context).await;

        assert_eq!(result.tool_names(), vec!["a", "b"]);
        assert!(result.max_depth_reached);
        assert!(result.success);
        assert_eq!(c_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn triggers_expand_depth_first_in_declared_order() {
        let registry = ToolRegistry::new();
        emitter(&registry, "root", json!({"next_tools": ["left", "right"]}));
        emitter(&registry, "left", json!({"next_tools": ["leaf"]}));
        emitter(&registry, "right", json!("r"));
        emitter(&registry, "leaf", json!("l"));
        let executor = executor(registry);
        let mut context = executor.context("c", "m");

        let result = executor.execute_chain("root", json!({}), &mut context).await;

        assert_eq!(result.tool_names(), vec!["root", "left", "leaf", "right"]);
        let depths: Vec<usize> = result.execution_chain.iter().map(|o| o.depth).collect();
        assert_eq!(depths, vec![0, 1, 2, 1]);
        let iterations: Vec<usize> =
            result.execution_chain.iter().map(|o| o.iteration).collect();
        assert_eq!(iterations, vec![1, 2, 3, 4]);
        assert_eq!(result.final_result, json!("r"));
    }

    #[tokio::test]
    async fn mid_chain_failure_lets_siblings_continue() {
        let registry = ToolRegistry::new();
        emitter(&registry, "root", json!({"next_tools": ["ghost", "after"]}));
        emitter(&registry, "after", json!("fine"));
        let executor = executor(registry);
        let mut context = executor.context("c", "m");

        let result = executor.execute_chain("root", json!({}), &mut context).await;

        assert_eq!(result.tool_names(), vec!["root", "ghost", "after"]);
        assert!(!result.execution_chain[1].success);
        assert!(result.execution_chain[1]
            .error
            .as_deref()
            .is_some_and(|e| e.contains("not found")));
        assert!(result.success);
    }

    #[tokio::test]
    async fn final_failure_fails_chain() {
        let registry = ToolRegistry::new();
        emitter(&registry, "root", json!({"next_tools": ["calculate"]}));
        calculator(&registry);
        let executor = executor(registry);
        let mut context = executor.context("c", "m");

        // `root` output has no arithmetic, so calculate receives {"input": ...}
        // and fails validation.
        let result = executor.execute_chain("root", json!({}), &mut context).await;

        assert_eq!(result.total_iterations, 2);
        assert!(!result.success);
        assert!(result.error.unwrap().contains("expression"));
    }

    #[tokio::test]
    async fn initial_validation_failure_stops_chain() {
        let registry = ToolRegistry::new();
        calculator(&registry);
        let executor = executor(registry);
        let mut context = executor.context("c", "m");

        let result = executor.execute_chain("calculate", json!({}), &mut context).await;

        assert_eq!(result.total_iterations, 1);
        assert!(!result.success);
    }

    #[tokio::test]
    async fn sensitive_tool_without_handler_is_denied() {
        let registry = ToolRegistry::new();
        let calls = emitter(&registry, "file_delete", json!("deleted"));
        let executor = executor(registry);
        let mut context = executor.context("c", "m");

        let result = executor
            .execute_chain("file_delete", json!({"path": "/tmp/x"}), &mut context)
            .await;

        assert_eq!(result.total_iterations, 1);
        assert!(!result.success);
        let outcome = &result.execution_chain[0];
        assert!(outcome.error.as_deref().is_some_and(|e| e.contains("denied")));
        assert!(outcome.triggered.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn sensitive_tool_with_denying_handler() {
        let registry = ToolRegistry::new();
        let calls = emitter(&registry, "file_delete", json!("deleted"));
        let executor = executor(registry);
        let mut context = executor
            .context("c", "m")
            .with_approval_handler(Arc::new(AutoDeny));

        let result = executor
            .execute_chain("file_delete", json!({"path": "/tmp/x"}), &mut context)
            .await;

        assert!(!result.success);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn approved_sensitive_tool_runs() {
        let registry = ToolRegistry::new();
        let calls = emitter(&registry, "file_write", json!("written"));
        let executor = executor(registry);
        let mut context = executor
            .context("c", "m")
            .with_approval_handler(Arc::new(AutoApprove));

        let result = executor
            .execute_chain("file_write", json!({}), &mut context)
            .await;

        assert!(result.success);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn metadata_sensitivity_requires_approval() {
        let registry = ToolRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        registry
            .register(
                plain("deploy").with_metadata(ToolMetadata::new().sensitive()),
                Counting {
                    calls: Arc::clone(&calls),
                    output: json!("shipped"),
                },
            )
            .unwrap();
        let executor = executor(registry);
        let mut context = executor.context("c", "m");

        let result = executor.execute_chain("deploy", json!({}), &mut context).await;

        assert!(!result.success);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_triggered_tool_skips_approval() {
        let registry = ToolRegistry::new();
        emitter(&registry, "root", json!({"next_tools": ["file_delete"]}));
        let executor = executor(registry);
        let (handler, mut requests) = ChannelApproval::channel(1);
        let mut context = executor
            .context("c", "m")
            .with_approval_handler(Arc::new(handler));

        let result = executor.execute_chain("root", json!({}), &mut context).await;

        assert!(requests.try_recv().is_err());
        let outcome = &result.execution_chain[1];
        assert!(outcome.error.as_deref().is_some_and(|e| e.contains("not found")));
    }

    #[tokio::test]
    async fn invocation_timeout_fails_outcome() {
        let registry = ToolRegistry::new();
        registry
            .register_with_timeout(
                plain("slow"),
                Sleepy(Duration::from_secs(5)),
                Duration::from_millis(50),
            )
            .unwrap();
        let executor = executor(registry);
        let mut context = executor.context("c", "m");

        let result = executor.execute_chain("slow", json!({}), &mut context).await;

        assert!(!result.success);
        assert!(!result.timed_out);
        assert!(result.execution_chain[0]
            .error
            .as_deref()
            .is_some_and(|e| e.contains("timed out")));
    }

    #[tokio::test]
    async fn chain_budget_marks_timed_out() {
        let registry = ToolRegistry::new();
        registry
            .register(plain("slow"), Sleepy(Duration::from_secs(5)))
            .unwrap();
        let executor = executor(registry);
        let mut context = executor
            .context("c", "m")
            .with_chain_budget(Duration::from_millis(100));

        let result = executor.execute_chain("slow", json!({}), &mut context).await;

        assert!(result.timed_out);
        assert!(!result.success);
        assert_eq!(result.total_iterations, 1);
    }

    #[tokio::test]
    async fn cancelled_before_start_runs_nothing() {
        let registry = ToolRegistry::new();
        let calls = emitter(&registry, "solo", json!("x"));
        let executor = executor(registry);
        let token = CancellationToken::new();
        token.cancel();
        let mut context = executor.context("c", "m").with_cancellation(token);

        let result = executor.execute_chain("solo", json!({}), &mut context).await;

        assert!(result.cancelled);
        assert!(!result.success);
        assert_eq!(result.total_iterations, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancellation_while_awaiting_approval() {
        let registry = ToolRegistry::new();
        let calls = emitter(&registry, "file_write", json!("x"));
        let executor = executor(registry);
        let (handler, mut requests) = ChannelApproval::channel(1);
        let token = CancellationToken::new();
        let mut context = executor
            .context("c", "m")
            .with_approval_handler(Arc::new(handler))
            .with_cancellation(token.clone());

        let canceller = tokio::spawn(async move {
            // Hold the request without answering, then cancel.
            let request = requests.recv().await;
            token.cancel();
            request
        });

        let result = executor
            .execute_chain("file_write", json!({}), &mut context)
            .await;
        drop(canceller.await.unwrap());

        assert!(result.cancelled);
        assert!(!result.success);
        assert_eq!(result.total_iterations, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(result.execution_chain[0]
            .error
            .as_deref()
            .is_some_and(|e| e.contains("denied")));
    }

    #[tokio::test]
    async fn context_tracks_outcomes() {
        let registry = ToolRegistry::new();
        emitter(&registry, "root", json!({"next_tools": ["leaf"]}));
        emitter(&registry, "leaf", json!("l"));
        let executor = executor(registry);
        let mut context = executor.context("c", "m");

        let result = executor.execute_chain("root", json!({}), &mut context).await;

        assert_eq!(context.executed(), result.tools_used().as_slice());
        assert_eq!(context.current_iteration, 2);
        assert_eq!(context.current_depth, 0);
        for id in context.executed() {
            assert!(context.outcome(id).is_some());
        }
    }

    #[tokio::test]
    async fn depth_unwinds_when_chain_stops_early() {
        let registry = ToolRegistry::new();
        emitter(&registry, "a", json!({"next_tools": ["b"]}));
        emitter(&registry, "b", json!({"next_tools": ["c"]}));
        emitter(&registry, "c", json!("done"));
        let executor = executor(registry);
        let mut context = executor.context("c", "m").with_max_iterations(2);

        let result = executor.execute_chain("a", json!({}), &mut context).await;

        assert!(result.max_iterations_reached);
        assert_eq!(result.execution_chain.last().map(|o| o.depth), Some(1));
        assert_eq!(context.current_depth, 0);
    }

    #[test]
    fn limits_defaults() {
        let limits = ChainLimits::default();
        assert_eq!(limits.max_iterations, 10);
        assert_eq!(limits.max_depth, 5);
        assert_eq!(limits.invocation_timeout, Duration::from_secs(30));
        assert_eq!(limits.chain_timeout, None);
        assert_eq!(limits.loop_detector(), LoopDetector::new(5, 2));
    }
}
