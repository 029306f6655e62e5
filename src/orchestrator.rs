//! High-level facade for running and recording tool chains.
//!
//! `ChainOrchestrator` ties a shared `ToolRegistry`, a `ChainExecutor` and
//! an `ExecutionRecorder` together. Callers describe a chain with a
//! `ChainRequest` and get the `ChainResult` back; the summary is recorded on
//! the side.
//!
//! ## Example
//!
//! ```rust,ignore
//! use acton_chain::prelude::*;
//!
//! let orchestrator = ChainOrchestrator::with_builtins()?;
//!
//! let result = orchestrator
//!     .execute_tool_chain(
//!         ChainRequest::new("smart_calculator", json!({"expression": "2 * 21"}))
//!             .in_conversation("conv-1", "msg-1")
//!             .with_max_iterations(4),
//!     )
//!     .await;
//!
//! println!("{}", result.final_result);
//! ```

use crate::chain::{
    ApprovalHandler, ApprovalPolicy, ChainExecutor, ChainLimits, ChainResult, ExecutionContext,
    ParameterExtractor,
};
use crate::recorder::{ExecutionRecorder, ExecutionSummary, NullRecorder};
use crate::tools::builtins::BuiltinTools;
use crate::tools::{ToolDescriptor, ToolError, ToolRegistry};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Everything needed to start one chain.
#[derive(Debug, Clone)]
pub struct ChainRequest {
    /// Tool to invoke first
    pub tool_name: String,
    /// Arguments for the first tool
    pub arguments: Value,
    /// Conversation the chain belongs to
    pub conversation_id: String,
    /// Message that requested the chain
    pub message_id: String,
    /// Overrides the orchestrator's iteration cap
    pub max_iterations: Option<usize>,
    /// Overrides the orchestrator's depth cap
    pub max_depth: Option<usize>,
    /// Overrides the orchestrator's chain budget
    pub chain_budget: Option<Duration>,
    /// Decides sensitive invocations
    pub approval_handler: Option<Arc<dyn ApprovalHandler>>,
    /// Stops the chain when cancelled
    pub cancellation: Option<CancellationToken>,
}

impl ChainRequest {
    /// Creates a request outside of any conversation.
    #[must_use]
    pub fn new(tool_name: impl Into<String>, arguments: Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
            conversation_id: String::new(),
            message_id: String::new(),
            max_iterations: None,
            max_depth: None,
            chain_budget: None,
            approval_handler: None,
            cancellation: None,
        }
    }

    /// Attaches the request to a conversation message.
    #[must_use]
    pub fn in_conversation(
        mut self,
        conversation_id: impl Into<String>,
        message_id: impl Into<String>,
    ) -> Self {
        self.conversation_id = conversation_id.into();
        self.message_id = message_id.into();
        self
    }

    /// Sets the iteration cap for this chain.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    /// Sets the depth cap for this chain.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Sets the wall-clock budget for this chain.
    #[must_use]
    pub fn with_chain_budget(mut self, budget: Duration) -> Self {
        self.chain_budget = Some(budget);
        self
    }

    /// Sets the approval handler.
    #[must_use]
    pub fn with_approval_handler(mut self, handler: Arc<dyn ApprovalHandler>) -> Self {
        self.approval_handler = Some(handler);
        self
    }

    /// Sets the cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

/// Runs chains and records their summaries.
#[derive(Debug, Clone)]
pub struct ChainOrchestrator {
    registry: Arc<ToolRegistry>,
    executor: ChainExecutor,
    recorder: Arc<dyn ExecutionRecorder>,
}

impl ChainOrchestrator {
    /// Creates an orchestrator over a registry.
    ///
    /// Summaries are discarded until a recorder is set with
    /// [`with_recorder`](Self::with_recorder).
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            executor: ChainExecutor::new(Arc::clone(&registry)),
            registry,
            recorder: Arc::new(NullRecorder),
        }
    }

    /// Creates an orchestrator with every built-in tool registered.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyRegistered` only if the built-in set names a tool twice.
    pub fn with_builtins() -> Result<Self, ToolError> {
        let registry = Arc::new(ToolRegistry::new());
        BuiltinTools::all().register_into(&registry)?;
        Ok(Self::new(registry))
    }

    /// Sets the recorder.
    #[must_use]
    pub fn with_recorder(mut self, recorder: Arc<dyn ExecutionRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    /// Replaces the executor's limits.
    #[must_use]
    pub fn with_limits(mut self, limits: ChainLimits) -> Self {
        self.executor = self.executor.with_limits(limits);
        self
    }

    /// Replaces the approval policy.
    #[must_use]
    pub fn with_policy(mut self, policy: ApprovalPolicy) -> Self {
        self.executor = self.executor.with_policy(policy);
        self
    }

    /// Replaces the parameter extractor.
    #[must_use]
    pub fn with_extractor(mut self, extractor: ParameterExtractor) -> Self {
        self.executor = self.executor.with_extractor(extractor);
        self
    }

    /// Updates the default iteration and depth caps.
    pub fn set_limits(&mut self, max_iterations: usize, max_depth: usize) {
        tracing::info!(max_iterations, max_depth, "Updated chain limits");
        self.executor.set_caps(max_iterations, max_depth);
    }

    /// Returns the current limits.
    #[must_use]
    pub fn limits(&self) -> &ChainLimits {
        self.executor.limits()
    }

    /// Returns the shared registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Returns the recorder summaries are handed to.
    #[must_use]
    pub fn recorder(&self) -> &Arc<dyn ExecutionRecorder> {
        &self.recorder
    }

    /// Returns the executor.
    #[must_use]
    pub fn executor(&self) -> &ChainExecutor {
        &self.executor
    }

    /// Returns the descriptors of every registered tool.
    #[must_use]
    pub fn available_tools(&self) -> Vec<ToolDescriptor> {
        self.registry.list_descriptors()
    }

    /// Builds the execution context for a request.
    fn context_for(&self, request: &ChainRequest) -> ExecutionContext {
        let mut context = self
            .executor
            .context(request.conversation_id.clone(), request.message_id.clone());

        if let Some(max_iterations) = request.max_iterations {
            context = context.with_max_iterations(max_iterations);
        }
        if let Some(max_depth) = request.max_depth {
            context = context.with_max_depth(max_depth);
        }
        if let Some(budget) = request.chain_budget {
            context = context.with_chain_budget(budget);
        }
        if let Some(ref handler) = request.approval_handler {
            context = context.with_approval_handler(Arc::clone(handler));
        }
        if let Some(ref token) = request.cancellation {
            context = context.with_cancellation(token.clone());
        }

        context
    }

    /// Runs a chain and records its summary.
    ///
    /// Recorder failures are logged and do not affect the returned result.
    pub async fn execute_tool_chain(&self, request: ChainRequest) -> ChainResult {
        let mut context = self.context_for(&request);
        let result = self
            .executor
            .execute_chain(&request.tool_name, request.arguments, &mut context)
            .await;

        let summary =
            ExecutionSummary::from_result(&result, &request.conversation_id, &request.message_id);
        if let Err(e) = self.recorder.record(summary).await {
            tracing::error!(
                chain_id = %result.chain_id,
                conversation_id = %request.conversation_id,
                error = %e,
                "Failed to record chain execution"
            );
        }

        result
    }
}
