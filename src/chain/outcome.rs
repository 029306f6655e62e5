//! Records produced while a chain runs.
//!
//! `ToolInvocation` is created for every attempt (denied ones included),
//! `ToolOutcome` once per attempt, and `ChainResult` once per chain.

use crate::tools::{ToolError, ToolOutput, TriggeredTool};
use crate::types::{ChainId, InvocationId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// One attempt to run a tool inside a chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Unique id of this attempt
    pub invocation_id: InvocationId,
    /// Tool being invoked
    pub tool_name: String,
    /// Arguments passed to the tool
    pub arguments: Value,
    /// 1-based position within the chain
    pub iteration: usize,
    /// Invocation whose result triggered this one
    pub parent_id: Option<InvocationId>,
    /// The approval gate applies to this invocation
    pub requires_approval: bool,
}

impl ToolInvocation {
    /// Creates an invocation with a fresh id.
    #[must_use]
    pub fn new(
        tool_name: impl Into<String>,
        arguments: Value,
        iteration: usize,
        parent_id: Option<InvocationId>,
    ) -> Self {
        Self {
            invocation_id: InvocationId::new(),
            tool_name: tool_name.into(),
            arguments,
            iteration,
            parent_id,
            requires_approval: false,
        }
    }
}

/// The immutable record of one invocation attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    /// Id of the invocation this outcome belongs to
    pub invocation_id: InvocationId,
    /// Tool that was invoked
    pub tool_name: String,
    /// Arguments the tool was invoked with
    pub arguments: Value,
    /// Result payload, `null` on failure
    pub result: Value,
    /// The tool ran and returned a value
    pub success: bool,
    /// Failure description
    pub error: Option<String>,
    /// Wall-clock seconds spent on the attempt
    pub execution_time: f64,
    /// 1-based position within the chain
    pub iteration: usize,
    /// Distance from the initial invocation
    pub depth: usize,
    /// Invocation whose result triggered this one
    pub parent_id: Option<InvocationId>,
    /// Follow-up tools declared by the result, in order
    #[serde(default)]
    pub triggered: Vec<TriggeredTool>,
}

impl ToolOutcome {
    /// Records a successful attempt.
    #[must_use]
    pub fn succeeded(
        invocation: ToolInvocation,
        depth: usize,
        output: ToolOutput,
        elapsed: Duration,
    ) -> Self {
        Self {
            invocation_id: invocation.invocation_id,
            tool_name: invocation.tool_name,
            arguments: invocation.arguments,
            result: output.value,
            success: true,
            error: None,
            execution_time: elapsed.as_secs_f64(),
            iteration: invocation.iteration,
            depth,
            parent_id: invocation.parent_id,
            triggered: output.triggered,
        }
    }

    /// Records a failed attempt. Failed outcomes never trigger anything.
    #[must_use]
    pub fn failed(
        invocation: ToolInvocation,
        depth: usize,
        error: &ToolError,
        elapsed: Duration,
    ) -> Self {
        Self {
            invocation_id: invocation.invocation_id,
            tool_name: invocation.tool_name,
            arguments: invocation.arguments,
            result: Value::Null,
            success: false,
            error: Some(error.to_string()),
            execution_time: elapsed.as_secs_f64(),
            iteration: invocation.iteration,
            depth,
            parent_id: invocation.parent_id,
            triggered: Vec::new(),
        }
    }
}

/// Everything one `execute_chain` call produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainResult {
    /// Id of this chain run
    pub chain_id: ChainId,
    /// Result payload of the last outcome
    pub final_result: Value,
    /// Every outcome, in execution order
    pub execution_chain: Vec<ToolOutcome>,
    /// Number of invocations attempted
    pub total_iterations: usize,
    /// Wall-clock seconds for the whole call
    pub total_execution_time: f64,
    /// See the executor's success policy
    pub success: bool,
    /// Why the chain stopped or failed
    pub error: Option<String>,
    /// Expansion stopped because of a repeating tool
    pub loop_detected: bool,
    /// Expansion stopped at the iteration cap
    pub max_iterations_reached: bool,
    /// Some triggers were not expanded because of the depth cap
    pub max_depth_reached: bool,
    /// The caller cancelled the chain
    pub cancelled: bool,
    /// The chain budget ran out
    pub timed_out: bool,
}

impl ChainResult {
    /// Returns the last outcome, if any tool ran.
    #[must_use]
    pub fn final_outcome(&self) -> Option<&ToolOutcome> {
        self.execution_chain.last()
    }

    /// Returns the invocation ids in execution order.
    #[must_use]
    pub fn tools_used(&self) -> Vec<InvocationId> {
        self.execution_chain
            .iter()
            .map(|outcome| outcome.invocation_id.clone())
            .collect()
    }

    /// Returns the tool names in execution order.
    #[must_use]
    pub fn tool_names(&self) -> Vec<&str> {
        self.execution_chain
            .iter()
            .map(|outcome| outcome.tool_name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn succeeded_carries_output_and_triggers() {
        let invocation = ToolInvocation::new("starter", json!({"x": 1}), 1, None);
        let id = invocation.invocation_id.clone();
        let output = ToolOutput::new(json!({"ok": true})).trigger(TriggeredTool::new("next"));

        let outcome = ToolOutcome::succeeded(invocation, 0, output, Duration::from_millis(5));

        assert_eq!(outcome.invocation_id, id);
        assert_eq!(outcome.tool_name, "starter");
        assert!(outcome.success);
        assert_eq!(outcome.triggered.len(), 1);
        assert!((outcome.execution_time - 0.005).abs() < 1e-9);
    }

    #[test]
    fn failed_has_error_and_no_triggers() {
        let parent = InvocationId::new();
        let invocation = ToolInvocation::new("echo", json!({}), 3, Some(parent.clone()));
        let error = ToolError::missing_parameter("echo", "text");

        let outcome = ToolOutcome::failed(invocation, 2, &error, Duration::ZERO);

        assert!(!outcome.success);
        assert_eq!(outcome.result, Value::Null);
        assert!(outcome.error.as_deref().is_some_and(|e| e.contains("'text'")));
        assert!(outcome.triggered.is_empty());
        assert_eq!(outcome.parent_id, Some(parent));
        assert_eq!((outcome.iteration, outcome.depth), (3, 2));
    }

    #[test]
    fn outcome_serializes_ids_as_strings() {
        let invocation = ToolInvocation::new("t", json!({}), 1, None);
        let outcome = ToolOutcome::succeeded(
            invocation,
            0,
            ToolOutput::new(json!(1)),
            Duration::ZERO,
        );
        let value = serde_json::to_value(&outcome).unwrap();
        assert!(value["invocation_id"].as_str().unwrap().starts_with("call_"));
        assert_eq!(value["tool_name"], "t");
    }

    #[test]
    fn new_invocations_do_not_require_approval() {
        let invocation = ToolInvocation::new("t", json!({}), 1, None);
        assert!(!invocation.requires_approval);
    }
}
