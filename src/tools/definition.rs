//! Tool descriptors and the handler trait.
//!
//! A registered tool is a `ToolDescriptor` (what the tool is, exported to
//! model-facing listings) paired with a `ToolHandler` (what it does).

use crate::tools::error::ToolError;
use crate::tools::schema::InputSchema;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Debug;
use std::time::Duration;

/// Default time allowance for a single tool invocation.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Description of a registered tool.
///
/// Serialises to the export form
/// `{name, description, inputSchema, outputSchema?, metadata?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    /// Unique tool name
    pub name: String,
    /// What the tool does
    pub description: String,
    /// Schema of the argument object
    pub input_schema: InputSchema,
    /// Schema of the result payload, if declared
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
    /// Hints for routing and gating
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ToolMetadata>,
}

impl ToolDescriptor {
    /// Creates a descriptor with no output schema and no metadata.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: InputSchema,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            output_schema: None,
            metadata: None,
        }
    }

    /// Declares the result payload schema.
    #[must_use]
    pub fn with_output_schema(mut self, schema: Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    /// Attaches metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: ToolMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Returns true if the metadata marks this tool as sensitive.
    #[must_use]
    pub fn is_sensitive(&self) -> bool {
        self.metadata.as_ref().is_some_and(|m| m.sensitive)
    }
}

/// Expected latency of a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Latency {
    /// Local computation
    Low,
    /// Local I/O or a fast remote call
    Medium,
    /// Slow remote call
    High,
}

/// Optional routing and gating hints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolMetadata {
    /// Free-form grouping, e.g. `math`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Cost per call in arbitrary units
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    /// Latency hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<Latency>,
    /// Invocations require human approval
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub sensitive: bool,
    /// Additional keys
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ToolMetadata {
    /// Creates empty metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Sets the cost hint.
    #[must_use]
    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = Some(cost);
        self
    }

    /// Sets the latency hint.
    #[must_use]
    pub fn with_latency(mut self, latency: Latency) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Marks the tool as sensitive.
    #[must_use]
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }
}

/// A further tool invocation requested by a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggeredTool {
    /// Name of the tool to run next
    pub tool: String,
    /// Explicit arguments; when absent they are extracted from the result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

impl TriggeredTool {
    /// A trigger whose arguments are extracted from the parent result.
    #[must_use]
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            arguments: None,
        }
    }

    /// A trigger with explicit arguments.
    #[must_use]
    pub fn with_arguments(tool: impl Into<String>, arguments: Value) -> Self {
        Self {
            tool: tool.into(),
            arguments: Some(arguments),
        }
    }
}

/// What a tool handler returns: a payload and the tools it wants run next.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ToolOutput {
    /// The result payload
    pub value: Value,
    /// Tools to run after this one, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triggered: Vec<TriggeredTool>,
}

impl ToolOutput {
    /// A payload that triggers nothing.
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self {
            value,
            triggered: Vec::new(),
        }
    }

    /// Appends a trigger.
    #[must_use]
    pub fn trigger(mut self, tool: TriggeredTool) -> Self {
        self.triggered.push(tool);
        self
    }
}

/// Key a plain result object may use to name follow-up tools.
pub const NEXT_TOOLS_KEY: &str = "next_tools";

impl From<Value> for ToolOutput {
    /// Lifts a top-level `next_tools` array out of an object payload.
    ///
    /// Entries may be tool names or `{tool, arguments?}` objects; anything
    /// else is ignored.
    fn from(mut value: Value) -> Self {
        let triggered = match value
            .as_object_mut()
            .and_then(|object| object.remove(NEXT_TOOLS_KEY))
        {
            Some(Value::Array(entries)) => entries
                .into_iter()
                .filter_map(|entry| match entry {
                    Value::String(tool) => Some(TriggeredTool::new(tool)),
                    other => serde_json::from_value(other).ok(),
                })
                .collect(),
            _ => Vec::new(),
        };

        Self { value, triggered }
    }
}

/// The future returned by a tool handler.
pub type ToolFuture = BoxFuture<'static, Result<ToolOutput, ToolError>>;

/// Executable side of a tool.
///
/// Implement this trait for tools with state or custom behaviour; plain
/// closures are wrapped by `ToolRegistry::register_fn`.
///
/// # Example
///
/// ```rust
/// use acton_chain::tools::{ToolFuture, ToolHandler, ToolOutput};
/// use serde_json::Value;
///
/// #[derive(Debug)]
/// struct EchoTool;
///
/// impl ToolHandler for EchoTool {
///     fn call(&self, args: Value) -> ToolFuture {
///         Box::pin(async move { Ok(ToolOutput::new(args)) })
///     }
/// }
/// ```
pub trait ToolHandler: Send + Sync + Debug {
    /// Runs the tool with already-validated arguments.
    fn call(&self, args: Value) -> ToolFuture;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::schema::ParamSchema;
    use serde_json::json;

    fn sample_descriptor() -> ToolDescriptor {
        ToolDescriptor::new(
            "echo",
            "Echo text back",
            InputSchema::new().required_param("text", ParamSchema::string("Text")),
        )
    }

    #[test]
    fn export_form_uses_camel_case_and_skips_absent_fields() {
        let value = serde_json::to_value(sample_descriptor()).unwrap();
        assert!(value.get("inputSchema").is_some());
        assert!(value.get("outputSchema").is_none());
        assert!(value.get("metadata").is_none());
        assert_eq!(value["name"], "echo");
    }

    #[test]
    fn export_form_round_trips() {
        let descriptor = sample_descriptor()
            .with_output_schema(json!({"type": "object"}))
            .with_metadata(
                ToolMetadata::new()
                    .with_category("text")
                    .with_cost(0.0)
                    .with_latency(Latency::Low)
                    .sensitive(),
            );
        let value = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(value["metadata"]["latency"], "low");
        assert_eq!(value["metadata"]["sensitive"], true);

        let back: ToolDescriptor = serde_json::from_value(value).unwrap();
        assert_eq!(back, descriptor);
    }

    #[test]
    fn sensitivity_comes_from_metadata() {
        assert!(!sample_descriptor().is_sensitive());
        let flagged = sample_descriptor().with_metadata(ToolMetadata::new().sensitive());
        assert!(flagged.is_sensitive());
    }

    #[test]
    fn next_tools_is_lifted_out_of_payload() {
        let output = ToolOutput::from(json!({
            "processed_data": "5 + 3",
            "next_tools": ["calculate", {"tool": "text_length", "arguments": {"text": "x"}}]
        }));

        assert_eq!(output.value, json!({"processed_data": "5 + 3"}));
        assert_eq!(
            output.triggered,
            vec![
                TriggeredTool::new("calculate"),
                TriggeredTool::with_arguments("text_length", json!({"text": "x"})),
            ]
        );
    }

    #[test]
    fn plain_values_trigger_nothing() {
        let output = ToolOutput::from(json!("hello"));
        assert_eq!(output.value, json!("hello"));
        assert!(output.triggered.is_empty());

        let output = ToolOutput::from(json!({"result": 1}));
        assert!(output.triggered.is_empty());
    }

    #[test]
    fn non_array_next_tools_is_dropped() {
        let output = ToolOutput::from(json!({"next_tools": "calculate", "a": 1}));
        assert_eq!(output.value, json!({"a": 1}));
        assert!(output.triggered.is_empty());
    }
}
