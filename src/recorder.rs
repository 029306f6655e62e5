//! Execution recording.
//!
//! After every chain the orchestrator condenses the `ChainResult` into an
//! `ExecutionSummary` and hands it to an `ExecutionRecorder`. The summary is
//! the persistence contract: storage backends only ever see this shape.
//!
//! `InMemoryRecorder` keeps summaries per conversation and message, exposes
//! them as message metadata (`{"iterative_executions": [...]}`) and derives
//! per-conversation statistics.

use crate::chain::ChainResult;
use crate::error::ChainError;
use crate::types::{ChainId, InvocationId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Metadata key summaries are listed under.
pub const METADATA_KEY: &str = "iterative_executions";

/// Condensed record of one chain run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    /// Chain run this summary describes
    pub chain_id: ChainId,
    /// Conversation the chain belongs to
    pub conversation_id: String,
    /// Message that requested the chain
    pub message_id: String,
    /// When the summary was created
    pub recorded_at: DateTime<Utc>,
    /// Number of outcomes in the chain
    pub total_tools_executed: usize,
    /// Number of invocations attempted
    pub total_iterations: usize,
    /// Wall-clock time, rounded to milliseconds
    pub execution_time_seconds: f64,
    /// The chain succeeded
    pub success: bool,
    /// Expansion stopped on a repeating tool
    pub loop_detected: bool,
    /// Expansion stopped at the iteration cap
    pub max_iterations_reached: bool,
    /// The caller cancelled the chain
    #[serde(default)]
    pub cancelled: bool,
    /// Result payload of the last outcome
    pub final_result: Value,
    /// Invocation ids in execution order
    pub tools_used: Vec<InvocationId>,
}

impl ExecutionSummary {
    /// Summarises a chain result, stamping it with the current time.
    #[must_use]
    pub fn from_result(
        result: &ChainResult,
        conversation_id: impl Into<String>,
        message_id: impl Into<String>,
    ) -> Self {
        Self {
            chain_id: result.chain_id.clone(),
            conversation_id: conversation_id.into(),
            message_id: message_id.into(),
            recorded_at: Utc::now(),
            total_tools_executed: result.execution_chain.len(),
            total_iterations: result.total_iterations,
            execution_time_seconds: (result.total_execution_time * 1000.0).round() / 1000.0,
            success: result.success,
            loop_detected: result.loop_detected,
            max_iterations_reached: result.max_iterations_reached,
            cancelled: result.cancelled,
            final_result: result.final_result.clone(),
            tools_used: result.tools_used(),
        }
    }
}

/// Aggregate figures for one conversation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ExecutionStats {
    /// Chains recorded
    pub total_iterative_executions: usize,
    /// Outcomes across all recorded chains
    pub total_tools_in_chains: usize,
    /// `total_tools_in_chains / total_iterative_executions`, or 0
    pub average_tools_per_chain: f64,
}

/// Persists execution summaries.
#[async_trait]
pub trait ExecutionRecorder: Send + Sync + std::fmt::Debug {
    /// Stores one summary.
    ///
    /// # Errors
    ///
    /// Returns `ChainErrorKind::Recorder` if the summary cannot be stored.
    async fn record(&self, summary: ExecutionSummary) -> Result<(), ChainError>;
}

/// Discards every summary.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRecorder;

#[async_trait]
impl ExecutionRecorder for NullRecorder {
    async fn record(&self, _summary: ExecutionSummary) -> Result<(), ChainError> {
        Ok(())
    }
}

/// Keeps summaries in memory, in recording order.
#[derive(Debug, Default)]
pub struct InMemoryRecorder {
    summaries: RwLock<Vec<ExecutionSummary>>,
}

impl InMemoryRecorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<ExecutionSummary>> {
        self.summaries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<ExecutionSummary>> {
        self.summaries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the number of recorded summaries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Returns the summaries recorded for one message.
    #[must_use]
    pub fn summaries(&self, conversation_id: &str, message_id: &str) -> Vec<ExecutionSummary> {
        self.read()
            .iter()
            .filter(|s| s.conversation_id == conversation_id && s.message_id == message_id)
            .cloned()
            .collect()
    }

    /// Returns the metadata document for one message.
    #[must_use]
    pub fn message_metadata(&self, conversation_id: &str, message_id: &str) -> Value {
        json!({ METADATA_KEY: self.summaries(conversation_id, message_id) })
    }

    /// Computes statistics over every chain recorded for a conversation.
    #[must_use]
    pub fn stats(&self, conversation_id: &str) -> ExecutionStats {
        let summaries = self.read();
        let (executions, tools) = summaries
            .iter()
            .filter(|s| s.conversation_id == conversation_id)
            .fold((0usize, 0usize), |(executions, tools), s| {
                (executions + 1, tools + s.total_tools_executed)
            });

        let average_tools_per_chain = if executions == 0 {
            0.0
        } else {
            tools as f64 / executions as f64
        };

        ExecutionStats {
            total_iterative_executions: executions,
            total_tools_in_chains: tools,
            average_tools_per_chain,
        }
    }
}

#[async_trait]
impl ExecutionRecorder for InMemoryRecorder {
    async fn record(&self, summary: ExecutionSummary) -> Result<(), ChainError> {
        tracing::debug!(
            chain_id = %summary.chain_id,
            conversation_id = %summary.conversation_id,
            message_id = %summary.message_id,
            "Recording chain execution"
        );
        self.write().push(summary);
        Ok(())
    }
}
