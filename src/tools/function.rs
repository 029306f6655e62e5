//! Plain functions as tools.
//!
//! `FunctionTool` wraps a sync or async closure taking a typed argument
//! struct. The argument struct provides both deserialisation and, through
//! `schemars`, the tool's input schema.

use crate::tools::definition::{ToolDescriptor, ToolFuture, ToolHandler, ToolMetadata, ToolOutput};
use crate::tools::error::ToolError;
use crate::tools::schema::InputSchema;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

type BoxedFn = Arc<dyn Fn(Value) -> ToolFuture + Send + Sync>;

/// A tool backed by a closure.
///
/// # Example
///
/// ```rust
/// use acton_chain::tools::{FunctionTool, ToolError};
/// use schemars::JsonSchema;
/// use serde::Deserialize;
/// use serde_json::json;
///
/// #[derive(Deserialize, JsonSchema)]
/// struct EchoArgs {
///     /// Text to echo back
///     text: String,
/// }
///
/// let tool = FunctionTool::from_fn("echo", "Echo text back", |args: EchoArgs| {
///     Ok::<_, ToolError>(json!({"result": args.text}))
/// });
/// assert!(tool.descriptor().input_schema.is_required("text"));
/// ```
pub struct FunctionTool {
    descriptor: ToolDescriptor,
    func: BoxedFn,
}

impl FunctionTool {
    /// Wraps a synchronous closure.
    ///
    /// The closure runs when the returned future is first polled.
    pub fn from_fn<A, R, F>(name: impl Into<String>, description: impl Into<String>, f: F) -> Self
    where
        A: DeserializeOwned + JsonSchema + Send + 'static,
        R: Into<ToolOutput>,
        F: Fn(A) -> Result<R, ToolError> + Send + Sync + 'static,
    {
        let name = name.into();
        let descriptor = ToolDescriptor::new(&name, description, InputSchema::for_type::<A>());
        let f = Arc::new(f);

        let func: BoxedFn = Arc::new(move |args: Value| -> ToolFuture {
            let f = Arc::clone(&f);
            let name = name.clone();
            Box::pin(async move {
                let args: A = decode_args(&name, args)?;
                f(args).map(Into::into)
            })
        });

        Self { descriptor, func }
    }

    /// Wraps an asynchronous closure.
    pub fn from_async_fn<A, R, F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        f: F,
    ) -> Self
    where
        A: DeserializeOwned + JsonSchema + Send + 'static,
        R: Into<ToolOutput>,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ToolError>> + Send + 'static,
    {
        let name = name.into();
        let descriptor = ToolDescriptor::new(&name, description, InputSchema::for_type::<A>());
        let f = Arc::new(f);

        let func: BoxedFn = Arc::new(move |args: Value| -> ToolFuture {
            let f = Arc::clone(&f);
            let name = name.clone();
            Box::pin(async move {
                let args: A = decode_args(&name, args)?;
                f(args).await.map(Into::into)
            })
        });

        Self { descriptor, func }
    }

    /// Replaces the derived input schema.
    #[must_use]
    pub fn with_schema(mut self, schema: InputSchema) -> Self {
        self.descriptor.input_schema = schema;
        self
    }

    /// Declares the result payload schema.
    #[must_use]
    pub fn with_output_schema(mut self, schema: Value) -> Self {
        self.descriptor.output_schema = Some(schema);
        self
    }

    /// Attaches metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: ToolMetadata) -> Self {
        self.descriptor.metadata = Some(metadata);
        self
    }

    /// Returns the descriptor this tool will register under.
    #[must_use]
    pub fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    /// Splits into descriptor and handler for registration.
    #[must_use]
    pub fn into_parts(self) -> (ToolDescriptor, Arc<dyn ToolHandler>) {
        let descriptor = self.descriptor.clone();
        (descriptor, Arc::new(self))
    }
}

impl fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionTool")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

impl ToolHandler for FunctionTool {
    fn call(&self, args: Value) -> ToolFuture {
        (self.func)(args)
    }
}

/// Deserialises tool arguments, reading `null` as an empty object.
pub(crate) fn decode_args<A: DeserializeOwned>(tool_name: &str, args: Value) -> Result<A, ToolError> {
    let args = match args {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    serde_json::from_value(args)
        .map_err(|e| ToolError::validation_failed(tool_name, format!("invalid arguments: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::schema::SchemaType;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize, JsonSchema)]
    struct AddArgs {
        a: i64,
        b: i64,
    }

    #[derive(Deserialize, JsonSchema)]
    struct GreetArgs {
        name: String,
        #[serde(default)]
        excited: bool,
    }

    #[tokio::test]
    async fn sync_function_runs() {
        let tool = FunctionTool::from_fn("add", "Add two numbers", |args: AddArgs| {
            Ok::<_, ToolError>(json!({"sum": args.a + args.b}))
        });

        let output = tool.call(json!({"a": 2, "b": 3})).await.unwrap();
        assert_eq!(output.value, json!({"sum": 5}));
    }

    #[tokio::test]
    async fn async_function_runs() {
        let tool = FunctionTool::from_async_fn("greet", "Greet someone", |args: GreetArgs| async move {
            tokio::task::yield_now().await;
            let suffix = if args.excited { "!" } else { "." };
            Ok::<_, ToolError>(json!(format!("Hello, {}{}", args.name, suffix)))
        });

        let output = tool
            .call(json!({"name": "Ada", "excited": true}))
            .await
            .unwrap();
        assert_eq!(output.value, json!("Hello, Ada!"));
    }

    #[test]
    fn schema_is_derived_from_arguments() {
        let tool = FunctionTool::from_fn("greet", "Greet someone", |_: GreetArgs| {
            Ok::<_, ToolError>(Value::Null)
        });
        let schema = &tool.descriptor().input_schema;

        assert_eq!(schema.properties["name"].kind, SchemaType::String);
        assert_eq!(schema.properties["excited"].kind, SchemaType::Boolean);
        assert!(schema.is_required("name"));
        assert!(!schema.is_required("excited"));
    }

    #[test]
    fn explicit_schema_overrides_derived() {
        let tool = FunctionTool::from_fn("raw", "Raw arguments", |_: Value| {
            Ok::<_, ToolError>(Value::Null)
        })
        .with_schema(InputSchema::new().required_param(
            "query",
            crate::tools::ParamSchema::string("Search query"),
        ));

        assert!(tool.descriptor().input_schema.is_required("query"));
    }

    #[tokio::test]
    async fn next_tools_in_result_become_triggers() {
        let tool = FunctionTool::from_fn("starter", "Start a chain", |_: Value| {
            Ok::<_, ToolError>(json!({"processed_data": "5 + 3", "next_tools": ["calculate"]}))
        });

        let output = tool.call(json!({})).await.unwrap();
        assert_eq!(output.triggered.len(), 1);
        assert_eq!(output.triggered[0].tool, "calculate");
        assert!(output.value.get("next_tools").is_none());
    }

    #[tokio::test]
    async fn undecodable_arguments_fail_validation() {
        let tool = FunctionTool::from_fn("add", "Add", |args: AddArgs| {
            Ok::<_, ToolError>(json!(args.a + args.b))
        });

        let err = tool.call(json!({"a": "two", "b": 3})).await.unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("invalid arguments"));
    }

    #[tokio::test]
    async fn handler_errors_propagate_unchanged() {
        let tool = FunctionTool::from_fn("fail", "Always fails", |_: Value| {
            Err::<Value, _>(ToolError::execution_failed("fail", "boom"))
        });

        let err = tool.call(Value::Null).await.unwrap_err();
        assert_eq!(err, ToolError::execution_failed("fail", "boom"));
    }

    #[tokio::test]
    async fn into_parts_keeps_behaviour() {
        let tool = FunctionTool::from_fn("add", "Add", |args: AddArgs| {
            Ok::<_, ToolError>(json!(args.a + args.b))
        });
        let (descriptor, handler) = tool.into_parts();

        assert_eq!(descriptor.name, "add");
        let output = handler.call(json!({"a": 1, "b": 1})).await.unwrap();
        assert_eq!(output.value, json!(2));
    }
}
