//! File built-in tools.
//!
//! Both tools modify the filesystem, so their metadata marks them sensitive
//! and every invocation passes through the approval gate.

use crate::tools::function::decode_args;
use crate::tools::{
    InputSchema, Latency, ParamSchema, ToolDescriptor, ToolError, ToolFuture, ToolHandler,
    ToolMetadata, ToolOutput,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;

fn file_metadata() -> ToolMetadata {
    ToolMetadata::new()
        .with_category("filesystem")
        .with_cost(0.0)
        .with_latency(Latency::Medium)
        .sensitive()
}

fn require_absolute(tool_name: &str, path: &str) -> Result<(), ToolError> {
    if path.is_empty() {
        return Err(ToolError::validation_failed(tool_name, "path cannot be empty"));
    }
    if !Path::new(path).is_absolute() {
        return Err(ToolError::validation_failed(tool_name, "path must be absolute"));
    }
    Ok(())
}

/// Writes content to a file, creating parent directories as needed.
#[derive(Debug, Default, Clone)]
pub struct FileWriteTool;

#[derive(Debug, Deserialize)]
struct FileWriteArgs {
    path: String,
    content: String,
}

impl FileWriteTool {
    /// Creates a new file write tool.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns the descriptor for registration.
    #[must_use]
    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(
            "file_write",
            "Write content to a file, creating parent directories if needed. Overwrites existing files.",
            InputSchema::new()
                .required_param("path", ParamSchema::string("Absolute path to the file to write"))
                .required_param("content", ParamSchema::string("Content to write to the file")),
        )
        .with_metadata(file_metadata())
    }
}

impl ToolHandler for FileWriteTool {
    fn call(&self, args: Value) -> ToolFuture {
        Box::pin(async move {
            let args: FileWriteArgs = decode_args("file_write", args)?;
            require_absolute("file_write", &args.path)?;

            let path = Path::new(&args.path);
            if let Some(parent) = path.parent() {
                if !parent.exists() {
                    tokio::fs::create_dir_all(parent).await.map_err(|e| {
                        ToolError::execution_failed(
                            "file_write",
                            format!("failed to create parent directories: {e}"),
                        )
                    })?;
                }
            }

            let bytes_written = args.content.len();
            tokio::fs::write(path, &args.content).await.map_err(|e| {
                ToolError::execution_failed("file_write", format!("failed to write file: {e}"))
            })?;

            Ok(ToolOutput::new(json!({
                "success": true,
                "path": args.path,
                "bytes_written": bytes_written
            })))
        })
    }
}

/// Deletes a single file.
#[derive(Debug, Default, Clone)]
pub struct FileDeleteTool;

#[derive(Debug, Deserialize)]
struct FileDeleteArgs {
    path: String,
}

impl FileDeleteTool {
    /// Creates a new file delete tool.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns the descriptor for registration.
    #[must_use]
    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(
            "file_delete",
            "Delete a file. Directories are not removed.",
            InputSchema::new()
                .required_param("path", ParamSchema::string("Absolute path to the file to delete")),
        )
        .with_metadata(file_metadata())
    }
}

impl ToolHandler for FileDeleteTool {
    fn call(&self, args: Value) -> ToolFuture {
        Box::pin(async move {
            let args: FileDeleteArgs = decode_args("file_delete", args)?;
            require_absolute("file_delete", &args.path)?;

            let metadata = tokio::fs::metadata(&args.path).await.map_err(|e| {
                ToolError::execution_failed("file_delete", format!("cannot access file: {e}"))
            })?;
            if !metadata.is_file() {
                return Err(ToolError::execution_failed(
                    "file_delete",
                    "path is not a regular file",
                ));
            }

            tokio::fs::remove_file(&args.path).await.map_err(|e| {
                ToolError::execution_failed("file_delete", format!("failed to delete file: {e}"))
            })?;

            Ok(ToolOutput::new(json!({
                "success": true,
                "path": args.path,
                "bytes_freed": metadata.len()
            })))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn file_write_basic() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.txt");

        let output = FileWriteTool::new()
            .call(json!({"path": path.to_str().unwrap(), "content": "hello world"}))
            .await
            .unwrap();

        assert_eq!(output.value["success"], true);
        assert_eq!(output.value["bytes_written"], 11);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello world");
    }

    #[tokio::test]
    async fn file_write_creates_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deep").join("test.txt");

        FileWriteTool::new()
            .call(json!({"path": path.to_str().unwrap(), "content": "x"}))
            .await
            .unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn file_write_rejects_relative_path() {
        let err = FileWriteTool::new()
            .call(json!({"path": "relative.txt", "content": "x"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("absolute"));
    }

    #[tokio::test]
    async fn file_delete_removes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone.txt");
        std::fs::write(&path, "bye").unwrap();

        let output = FileDeleteTool::new()
            .call(json!({"path": path.to_str().unwrap()}))
            .await
            .unwrap();

        assert_eq!(output.value["bytes_freed"], 3);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn file_delete_refuses_directories() {
        let dir = TempDir::new().unwrap();
        let err = FileDeleteTool::new()
            .call(json!({"path": dir.path().to_str().unwrap()}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not a regular file"));
        assert!(dir.path().exists());
    }

    #[tokio::test]
    async fn file_delete_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.txt");
        let err = FileDeleteTool::new()
            .call(json!({"path": path.to_str().unwrap()}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("cannot access"));
    }

    #[test]
    fn file_tools_are_sensitive() {
        assert!(FileWriteTool::descriptor().is_sensitive());
        assert!(FileDeleteTool::descriptor().is_sensitive());
    }
}
