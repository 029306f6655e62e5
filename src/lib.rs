//! # acton-chain: bounded tool-chain orchestration
//!
//! A single tool invocation can trigger further tools, whose arguments are
//! extracted from the previous result. acton-chain runs such chains with
//! hard limits on iterations, nesting depth, repetition and time, gates
//! sensitive tools behind a human decision, and records a provenance summary
//! of every run.
//!
//! ## Architecture
//!
//! - **Tool Registry**: name-keyed tools with typed input schemas
//! - **Chain Executor**: depth-first expansion of triggered tools with loop
//!   detection and iteration/depth caps
//! - **Parameter Extraction**: per-tool strategies deriving arguments from a
//!   parent result
//! - **Approval Gate**: pluggable `ApprovalHandler` for sensitive tools
//! - **Execution Recorder**: `ExecutionSummary` persistence contract
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use acton_chain::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orchestrator = ChainOrchestrator::with_builtins()?;
//!
//!     let result = orchestrator
//!         .execute_tool_chain(ChainRequest::new(
//!             "smart_calculator",
//!             serde_json::json!({"expression": "6 * 7"}),
//!         ))
//!         .await;
//!
//!     for outcome in &result.execution_chain {
//!         println!("{} -> {}", outcome.tool_name, outcome.result);
//!     }
//!     Ok(())
//! }
//! ```

pub mod chain;
pub mod config;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod recorder;
pub mod tools;
pub mod types;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::chain::{
        ApprovalHandler, ApprovalPolicy, AutoApprove, AutoDeny, ChainExecutor, ChainLimits,
        ChainResult, ChannelApproval, ExecutionContext, ParameterExtractor, ToolInvocation,
        ToolOutcome,
    };
    pub use crate::error::{ChainError, ChainErrorKind};
    pub use crate::orchestrator::{ChainOrchestrator, ChainRequest};
    pub use crate::recorder::{ExecutionRecorder, ExecutionSummary, InMemoryRecorder, NullRecorder};
    pub use crate::tools::builtins::BuiltinTools;
    pub use crate::tools::{
        FunctionTool, InputSchema, ParamSchema, ToolDescriptor, ToolError, ToolHandler,
        ToolMetadata, ToolOutput, ToolRegistry, TriggeredTool,
    };
    pub use crate::types::{ChainId, InvocationId};

    pub use serde_json::json;
    pub use std::sync::Arc;
}
