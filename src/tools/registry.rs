//! Tool Registry.
//!
//! The registry is the single source of truth for which tools exist. It
//! handles registration, schema validation and execution dispatch, and is
//! shared between concurrently running chains behind an `Arc`.

use crate::tools::definition::{ToolDescriptor, ToolHandler, ToolOutput};
use crate::tools::error::ToolError;
use crate::tools::function::FunctionTool;
use crate::tools::schema::InputSchema;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

/// A registered tool entry.
#[derive(Debug, Clone)]
struct RegisteredTool {
    descriptor: ToolDescriptor,
    handler: Arc<dyn ToolHandler>,
    timeout: Option<Duration>,
}

/// Registry of named tools.
///
/// Registration and lookup are synchronised with an interior `RwLock`;
/// handlers are cloned out of the lock before they are awaited, so a
/// long-running tool never blocks registration.
///
/// # Example
///
/// ```rust
/// use acton_chain::tools::{ToolError, ToolRegistry};
/// use schemars::JsonSchema;
/// use serde::Deserialize;
/// use serde_json::json;
///
/// #[derive(Deserialize, JsonSchema)]
/// struct EchoArgs {
///     text: String,
/// }
///
/// # tokio_test_block(async {
/// let registry = ToolRegistry::new();
/// registry
///     .register_fn("echo", "Echo text back", |args: EchoArgs| {
///         Ok::<_, ToolError>(json!({"result": args.text}))
///     })
///     .unwrap();
///
/// let output = registry.execute("echo", json!({"text": "hi"})).await.unwrap();
/// assert_eq!(output.value, json!({"result": "hi"}));
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, RegisteredTool>>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, RegisteredTool>> {
        self.tools.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, RegisteredTool>> {
        self.tools.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(
        &self,
        descriptor: ToolDescriptor,
        handler: Arc<dyn ToolHandler>,
        timeout: Option<Duration>,
    ) -> Result<(), ToolError> {
        let tool_name = descriptor.name.clone();
        let mut tools = self.write();

        if tools.contains_key(&tool_name) {
            tracing::error!(tool_name = %tool_name, "Tool registration failed: duplicate name");
            return Err(ToolError::already_registered(&tool_name));
        }

        let sensitive = descriptor.is_sensitive();
        tools.insert(
            tool_name.clone(),
            RegisteredTool {
                descriptor,
                handler,
                timeout,
            },
        );

        tracing::info!(
            tool_name = %tool_name,
            sensitive,
            timeout_secs = timeout.map(|t| t.as_secs_f64()),
            "Tool registered"
        );

        Ok(())
    }

    /// Registers a tool.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyRegistered` if a tool with the same name exists.
    pub fn register<H>(&self, descriptor: ToolDescriptor, handler: H) -> Result<(), ToolError>
    where
        H: ToolHandler + 'static,
    {
        self.insert(descriptor, Arc::new(handler), None)
    }

    /// Registers a tool with its own invocation timeout.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyRegistered` if a tool with the same name exists.
    pub fn register_with_timeout<H>(
        &self,
        descriptor: ToolDescriptor,
        handler: H,
        timeout: Duration,
    ) -> Result<(), ToolError>
    where
        H: ToolHandler + 'static,
    {
        self.insert(descriptor, Arc::new(handler), Some(timeout))
    }

    /// Registers an already shared handler.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyRegistered` if a tool with the same name exists.
    pub fn register_shared(
        &self,
        descriptor: ToolDescriptor,
        handler: Arc<dyn ToolHandler>,
        timeout: Option<Duration>,
    ) -> Result<(), ToolError> {
        self.insert(descriptor, handler, timeout)
    }

    /// Registers a `FunctionTool`.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyRegistered` if a tool with the same name exists.
    pub fn register_tool(&self, tool: FunctionTool) -> Result<(), ToolError> {
        let (descriptor, handler) = tool.into_parts();
        self.insert(descriptor, handler, None)
    }

    /// Registers a synchronous closure, deriving its schema from `A`.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyRegistered` if a tool with the same name exists.
    pub fn register_fn<A, R, F>(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        f: F,
    ) -> Result<(), ToolError>
    where
        A: DeserializeOwned + JsonSchema + Send + 'static,
        R: Into<ToolOutput>,
        F: Fn(A) -> Result<R, ToolError> + Send + Sync + 'static,
    {
        self.register_tool(FunctionTool::from_fn(name, description, f))
    }

    /// Registers an asynchronous closure, deriving its schema from `A`.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyRegistered` if a tool with the same name exists.
    pub fn register_async_fn<A, R, F, Fut>(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        f: F,
    ) -> Result<(), ToolError>
    where
        A: DeserializeOwned + JsonSchema + Send + 'static,
        R: Into<ToolOutput>,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ToolError>> + Send + 'static,
    {
        self.register_tool(FunctionTool::from_async_fn(name, description, f))
    }

    /// Removes a tool, returning its descriptor.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no tool has that name.
    pub fn unregister(&self, name: &str) -> Result<ToolDescriptor, ToolError> {
        let removed = self.write().remove(name);
        match removed {
            Some(entry) => {
                tracing::info!(tool_name = %name, "Tool unregistered");
                Ok(entry.descriptor)
            }
            None => Err(ToolError::not_found(name)),
        }
    }

    /// Returns true if a tool with this name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// Returns a copy of a tool's descriptor.
    #[must_use]
    pub fn descriptor(&self, name: &str) -> Option<ToolDescriptor> {
        self.read().get(name).map(|entry| entry.descriptor.clone())
    }

    /// Returns true if the tool's metadata marks it sensitive.
    #[must_use]
    pub fn is_sensitive(&self, name: &str) -> bool {
        self.read()
            .get(name)
            .is_some_and(|entry| entry.descriptor.is_sensitive())
    }

    /// Returns the tool's own invocation timeout, if it registered one.
    #[must_use]
    pub fn timeout_for(&self, name: &str) -> Option<Duration> {
        self.read().get(name).and_then(|entry| entry.timeout)
    }

    /// Returns the number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns true if no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Returns all tool names, sorted.
    #[must_use]
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns all descriptors sorted by name, in export form order.
    #[must_use]
    pub fn list_descriptors(&self) -> Vec<ToolDescriptor> {
        let mut descriptors: Vec<ToolDescriptor> = self
            .read()
            .values()
            .map(|entry| entry.descriptor.clone())
            .collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    /// Validates arguments against a tool's input schema.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown tools, otherwise the first schema
    /// violation (see [`InputSchema::validate`]).
    pub fn validate(&self, name: &str, args: &Value) -> Result<(), ToolError> {
        let tools = self.read();
        let entry = tools.get(name).ok_or_else(|| ToolError::not_found(name))?;
        entry.descriptor.input_schema.validate(name, args)
    }

    /// Looks up, validates and runs a tool.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, a validation error, or whatever the handler
    /// returned, unchanged.
    pub async fn execute(&self, name: &str, args: Value) -> Result<ToolOutput, ToolError> {
        let handler = {
            let tools = self.read();
            let entry = tools.get(name).ok_or_else(|| ToolError::not_found(name))?;
            schema_check(&entry.descriptor.input_schema, name, &args)?;
            Arc::clone(&entry.handler)
        };

        tracing::debug!(tool_name = %name, "Executing tool");

        let result = handler.call(args).await;
        if let Err(ref error) = result {
            tracing::warn!(tool_name = %name, error = %error, "Tool execution failed");
        }
        result
    }
}

fn schema_check(schema: &InputSchema, name: &str, args: &Value) -> Result<(), ToolError> {
    schema.validate(name, args).inspect_err(|error| {
        tracing::debug!(tool_name = %name, error = %error, "Tool arguments rejected");
    })
}
