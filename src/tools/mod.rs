//! Tool system for acton-chain.
//!
//! This module provides the infrastructure for tool registration and execution:
//!
//! - **Schema**: typed input schemas with validation
//! - **Definition**: descriptors, metadata and the `ToolHandler` trait
//! - **Function tools**: plain sync/async closures as tools
//! - **Tool Registry**: name-keyed registration, validation and dispatch
//! - **Built-ins**: ready-made tools, including chain-aware ones
//!
//! ## Architecture
//!
//! ```text
//! +-------------------------------------------------------------+
//! |                       ToolRegistry                           |
//! |                                                              |
//! |  register / register_fn --> tools: HashMap<String, Entry>   |
//! |  execute(name, args) --> validate --> handler.call(args)    |
//! |  list_descriptors --> Vec<ToolDescriptor> (export form)     |
//! |                                                              |
//! +-------------------------------------------------------------+
//!                            |
//!                            | ToolOutput { value, triggered }
//!                            v
//!                      chain executor
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use acton_chain::prelude::*;
//!
//! let registry = ToolRegistry::new();
//! BuiltinTools::all().register_into(&registry)?;
//!
//! let output = registry
//!     .execute("calculate", serde_json::json!({"expression": "5 + 3"}))
//!     .await?;
//! ```

pub mod builtins;
pub mod definition;
pub mod error;
pub mod function;
pub mod registry;
pub mod schema;

// Re-exports
pub use definition::{
    Latency, ToolDescriptor, ToolFuture, ToolHandler, ToolMetadata, ToolOutput, TriggeredTool,
    DEFAULT_TOOL_TIMEOUT, NEXT_TOOLS_KEY,
};
pub use error::{ToolError, ToolErrorKind};
pub use function::FunctionTool;
pub use registry::ToolRegistry;
pub use schema::{json_type_name, InputSchema, ParamSchema, SchemaType};
