//! Tool-chain execution.
//!
//! A chain starts with one tool invocation. Every successful result may
//! trigger further tools, whose arguments are extracted from that result
//! unless the trigger supplies them. The executor walks triggers depth
//! first and stops on its iteration, depth, loop, budget or cancellation
//! limits.
//!
//! ```text
//!  execute_chain(tool, args, ctx)
//!        |
//!        v
//!  +-----------+   sensitive?   +-----------------+
//!  | invocation| -------------> | ApprovalHandler |
//!  +-----------+                +-----------------+
//!        |  approved / not sensitive
//!        v
//!  ToolRegistry::execute  --(timeout)-->  ToolOutcome
//!        |
//!        | triggered tools
//!        v
//!  ParameterExtractor  -->  next invocation (depth + 1)
//! ```

pub mod approval;
pub mod context;
pub mod executor;
pub mod extraction;
pub mod loop_detect;
pub mod outcome;

pub use approval::{
    ApprovalHandler, ApprovalPolicy, ApprovalRequest, AutoApprove, AutoDeny, ChannelApproval,
    FnApproval, DEFAULT_SENSITIVE_TOOLS,
};
pub use context::{ExecutionContext, DEFAULT_MAX_DEPTH, DEFAULT_MAX_ITERATIONS};
pub use executor::{ChainExecutor, ChainLimits};
pub use extraction::{
    text_view, ArithmeticExpression, ExtractionStrategy, ForwardKey, LocationPhrase,
    ParameterExtractor,
};
pub use loop_detect::{LoopDetector, DEFAULT_LOOP_THRESHOLD, DEFAULT_LOOP_WINDOW};
pub use outcome::{ChainResult, ToolInvocation, ToolOutcome};
