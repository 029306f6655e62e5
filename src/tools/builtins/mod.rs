//! Built-in tools for acton-chain.
//!
//! This module provides pre-built tools that can be registered with a
//! `ToolRegistry`.
//!
//! ## Available Tools
//!
//! ### Computation
//! - **calculate**: Evaluate mathematical expressions
//! - **get_current_time**: Current date and time
//!
//! ### Text
//! - **text_length**: Count characters and words
//! - **encode_base64** / **decode_base64**: Base64 conversion
//!
//! ### Chain-aware
//! - **analyze_and_search**: Triggers `calculate` when a text contains arithmetic
//! - **smart_calculator**: Triggers `calculate` and optionally `text_length`
//!
//! ### Filesystem (sensitive, approval required)
//! - **file_write**: Write content to a file
//! - **file_delete**: Delete a file
//!
//! ## Usage
//!
//! ```rust
//! use acton_chain::tools::builtins::BuiltinTools;
//! use acton_chain::tools::ToolRegistry;
//!
//! let registry = ToolRegistry::new();
//! BuiltinTools::select(&["calculate", "text_length"])
//!     .unwrap()
//!     .register_into(&registry)
//!     .unwrap();
//! assert_eq!(registry.len(), 2);
//! ```

mod calculate;
mod chaining;
mod files;
mod text;
mod time;

pub use calculate::CalculateTool;
pub use chaining::{AnalyzeAndSearchTool, SmartCalculatorTool};
pub use files::{FileDeleteTool, FileWriteTool};
pub use text::{DecodeBase64Tool, EncodeBase64Tool, TextLengthTool};
pub use time::GetCurrentTimeTool;

use crate::tools::{ToolDescriptor, ToolError, ToolErrorKind, ToolHandler, ToolRegistry};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Encodes a float as a JSON integer when it has no fractional part.
pub(crate) fn number_value(value: f64) -> Value {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        Value::from(value as i64)
    } else {
        Value::from(value)
    }
}

/// Collection of built-in tools.
///
/// Holds descriptors and handlers by name, ready to be registered with a
/// `ToolRegistry`.
#[derive(Debug, Default)]
pub struct BuiltinTools {
    /// Tool descriptors by name
    descriptors: HashMap<String, ToolDescriptor>,
    /// Tool handlers by name
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
}

impl BuiltinTools {
    /// Creates a collection with every built-in tool.
    #[must_use]
    pub fn all() -> Self {
        let mut tools = Self::default();

        tools.add(CalculateTool::descriptor(), Arc::new(CalculateTool::new()));
        tools.add(GetCurrentTimeTool::descriptor(), Arc::new(GetCurrentTimeTool::new()));
        tools.add(TextLengthTool::descriptor(), Arc::new(TextLengthTool::new()));
        tools.add(EncodeBase64Tool::descriptor(), Arc::new(EncodeBase64Tool::new()));
        tools.add(DecodeBase64Tool::descriptor(), Arc::new(DecodeBase64Tool::new()));
        tools.add(AnalyzeAndSearchTool::descriptor(), Arc::new(AnalyzeAndSearchTool::new()));
        tools.add(SmartCalculatorTool::descriptor(), Arc::new(SmartCalculatorTool::new()));
        tools.add(FileWriteTool::descriptor(), Arc::new(FileWriteTool::new()));
        tools.add(FileDeleteTool::descriptor(), Arc::new(FileDeleteTool::new()));

        tools
    }

    /// Creates a collection with only the named tools.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a name that is not a built-in tool.
    pub fn select(names: &[&str]) -> Result<Self, ToolError> {
        let all = Self::all();
        let mut tools = Self::default();

        for name in names {
            let descriptor = all
                .descriptors
                .get(*name)
                .ok_or_else(|| ToolError::not_found(*name))?;

            let handler = all.handlers.get(*name).ok_or_else(|| {
                ToolError::new(ToolErrorKind::Internal {
                    message: format!("handler not found for tool: {name}"),
                })
            })?;

            tools.add(descriptor.clone(), Arc::clone(handler));
        }

        Ok(tools)
    }

    /// Lists all built-in tool names.
    #[must_use]
    pub fn available() -> Vec<&'static str> {
        vec![
            "calculate",
            "get_current_time",
            "text_length",
            "encode_base64",
            "decode_base64",
            "analyze_and_search",
            "smart_calculator",
            "file_write",
            "file_delete",
        ]
    }

    /// Returns the descriptor for a tool.
    #[must_use]
    pub fn get_descriptor(&self, name: &str) -> Option<&ToolDescriptor> {
        self.descriptors.get(name)
    }

    /// Returns the handler for a tool.
    #[must_use]
    pub fn get_handler(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.handlers.get(name).cloned()
    }

    /// Returns an iterator over all descriptors.
    pub fn descriptors(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.descriptors.values()
    }

    /// Returns the number of tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns true if the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Registers every tool in the collection, in name order.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyRegistered` if the registry already holds one of
    /// these names. Tools registered before the conflict stay registered.
    pub fn register_into(&self, registry: &ToolRegistry) -> Result<(), ToolError> {
        let mut names: Vec<&String> = self.descriptors.keys().collect();
        names.sort();

        for name in names {
            let (Some(descriptor), Some(handler)) =
                (self.descriptors.get(name), self.handlers.get(name))
            else {
                continue;
            };
            registry.register_shared(descriptor.clone(), Arc::clone(handler), None)?;
        }
        Ok(())
    }

    fn add(&mut self, descriptor: ToolDescriptor, handler: Arc<dyn ToolHandler>) {
        self.handlers.insert(descriptor.name.clone(), handler);
        self.descriptors.insert(descriptor.name.clone(), descriptor);
    }
}
