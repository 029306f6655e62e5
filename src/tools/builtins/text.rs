//! Text built-in tools: length counting and base64 conversion.

use crate::tools::function::decode_args;
use crate::tools::{
    InputSchema, Latency, ParamSchema, ToolDescriptor, ToolError, ToolFuture, ToolHandler,
    ToolMetadata, ToolOutput,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::{json, Value};

fn text_metadata() -> ToolMetadata {
    ToolMetadata::new()
        .with_category("text")
        .with_cost(0.0)
        .with_latency(Latency::Low)
}

/// Counts characters and words in a text.
#[derive(Debug, Default, Clone)]
pub struct TextLengthTool;

#[derive(Debug, Deserialize)]
struct TextLengthArgs {
    text: String,
    #[serde(default = "default_true")]
    include_spaces: bool,
}

fn default_true() -> bool {
    true
}

impl TextLengthTool {
    /// Creates a new text length tool.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns the descriptor for registration.
    #[must_use]
    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(
            "text_length",
            "Count the number of characters and words in a text string",
            InputSchema::new()
                .required_param("text", ParamSchema::string("The text to count characters for"))
                .optional_param(
                    "include_spaces",
                    ParamSchema::boolean("Whether to include spaces in the count")
                        .with_default(true),
                ),
        )
        .with_metadata(text_metadata())
    }
}

impl ToolHandler for TextLengthTool {
    fn call(&self, args: Value) -> ToolFuture {
        Box::pin(async move {
            let args: TextLengthArgs = decode_args("text_length", args)?;

            let character_count = if args.include_spaces {
                args.text.chars().count()
            } else {
                args.text.chars().filter(|c| *c != ' ').count()
            };
            let word_count = args.text.split_whitespace().count();

            Ok(ToolOutput::new(json!({
                "text": args.text,
                "character_count": character_count,
                "include_spaces": args.include_spaces,
                "word_count": word_count
            })))
        })
    }
}

/// Encodes text as standard base64.
#[derive(Debug, Default, Clone)]
pub struct EncodeBase64Tool;

#[derive(Debug, Deserialize)]
struct EncodeArgs {
    text: String,
}

impl EncodeBase64Tool {
    /// Creates a new encode tool.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns the descriptor for registration.
    #[must_use]
    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(
            "encode_base64",
            "Encode text to base64 format",
            InputSchema::new().required_param("text", ParamSchema::string("Text to encode")),
        )
        .with_metadata(text_metadata())
    }
}

impl ToolHandler for EncodeBase64Tool {
    fn call(&self, args: Value) -> ToolFuture {
        Box::pin(async move {
            let args: EncodeArgs = decode_args("encode_base64", args)?;
            Ok(ToolOutput::new(Value::String(STANDARD.encode(args.text))))
        })
    }
}

/// Decodes standard base64 into UTF-8 text.
#[derive(Debug, Default, Clone)]
pub struct DecodeBase64Tool;

#[derive(Debug, Deserialize)]
struct DecodeArgs {
    encoded_text: String,
}

impl DecodeBase64Tool {
    /// Creates a new decode tool.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns the descriptor for registration.
    #[must_use]
    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(
            "decode_base64",
            "Decode base64 text to plain text",
            InputSchema::new()
                .required_param("encoded_text", ParamSchema::string("Base64 text to decode")),
        )
        .with_metadata(text_metadata())
    }
}

impl ToolHandler for DecodeBase64Tool {
    fn call(&self, args: Value) -> ToolFuture {
        Box::pin(async move {
            let args: DecodeArgs = decode_args("decode_base64", args)?;

            let bytes = STANDARD.decode(args.encoded_text.trim()).map_err(|e| {
                ToolError::execution_failed("decode_base64", format!("invalid base64 encoding: {e}"))
            })?;
            let text = String::from_utf8(bytes).map_err(|e| {
                ToolError::execution_failed("decode_base64", format!("decoded bytes are not UTF-8: {e}"))
            })?;

            Ok(ToolOutput::new(Value::String(text)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn text_length_counts_characters_and_words() {
        let output = TextLengthTool::new()
            .call(json!({"text": "hello big world"}))
            .await
            .unwrap();
        assert_eq!(output.value["character_count"], 15);
        assert_eq!(output.value["word_count"], 3);
        assert_eq!(output.value["include_spaces"], true);
    }

    #[tokio::test]
    async fn text_length_can_skip_spaces() {
        let output = TextLengthTool::new()
            .call(json!({"text": "a b c", "include_spaces": false}))
            .await
            .unwrap();
        assert_eq!(output.value["character_count"], 3);
    }

    #[tokio::test]
    async fn text_length_counts_unicode_scalars() {
        let output = TextLengthTool::new()
            .call(json!({"text": "héllo"}))
            .await
            .unwrap();
        assert_eq!(output.value["character_count"], 5);
    }

    #[tokio::test]
    async fn base64_encode_then_decode() {
        let encoded = EncodeBase64Tool::new()
            .call(json!({"text": "Hello, World!"}))
            .await
            .unwrap();
        assert_eq!(encoded.value, json!("SGVsbG8sIFdvcmxkIQ=="));

        let decoded = DecodeBase64Tool::new()
            .call(json!({"encoded_text": "SGVsbG8sIFdvcmxkIQ=="}))
            .await
            .unwrap();
        assert_eq!(decoded.value, json!("Hello, World!"));
    }

    #[tokio::test]
    async fn decode_rejects_invalid_input() {
        let err = DecodeBase64Tool::new()
            .call(json!({"encoded_text": "%%% not base64"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid base64"));
    }
}
