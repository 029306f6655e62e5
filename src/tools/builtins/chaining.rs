//! Chain-aware built-in tools.
//!
//! These tools do little work themselves; their results name follow-up
//! tools (`calculate`, `text_length`) for the chain executor to run, with
//! arguments extracted from the result.

use crate::tools::function::decode_args;
use crate::tools::{
    InputSchema, Latency, ParamSchema, ToolDescriptor, ToolFuture, ToolHandler, ToolMetadata,
    ToolOutput, TriggeredTool,
};
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::LazyLock;

fn chain_metadata() -> ToolMetadata {
    ToolMetadata::new()
        .with_category("analysis")
        .with_cost(0.0)
        .with_latency(Latency::Low)
}

/// Runs of digits, operators, parentheses and whitespace.
static EXPRESSION_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\d+\-*/()\s.]+").expect("Invalid expression run regex"));

/// Analyses a text and asks for a calculation when it contains arithmetic.
#[derive(Debug, Default, Clone)]
pub struct AnalyzeAndSearchTool;

#[derive(Debug, Deserialize)]
struct AnalyzeArgs {
    text: String,
    #[serde(default)]
    search_terms: Option<String>,
}

impl AnalyzeAndSearchTool {
    /// Creates a new analysis tool.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns the descriptor for registration.
    #[must_use]
    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(
            "analyze_and_search",
            "Analyze text and search for additional information if needed; triggers calculate when the text contains arithmetic",
            InputSchema::new()
                .required_param("text", ParamSchema::string("Text to analyze"))
                .optional_param(
                    "search_terms",
                    ParamSchema::string("Optional terms to look up"),
                ),
        )
        .with_metadata(chain_metadata())
    }
}

/// Returns the first run that looks like an expression, if the text
/// contains any arithmetic operator at all.
fn suggested_calculation(text: &str) -> Option<String> {
    if !text.chars().any(|c| matches!(c, '+' | '-' | '*' | '/' | '=')) {
        return None;
    }
    EXPRESSION_RUN
        .find_iter(text)
        .map(|m| m.as_str().trim())
        .find(|run| run.len() > 1 && run.chars().any(|c| c.is_ascii_digit()))
        .map(str::to_string)
}

impl ToolHandler for AnalyzeAndSearchTool {
    fn call(&self, args: Value) -> ToolFuture {
        Box::pin(async move {
            let args: AnalyzeArgs = decode_args("analyze_and_search", args)?;
            let text = args.text;

            let suggestion = suggested_calculation(&text);
            let mut result = json!({
                "analysis": {
                    "character_count": text.chars().count(),
                    "word_count": text.split_whitespace().count(),
                    "contains_numbers": text.chars().any(|c| c.is_ascii_digit()),
                    "contains_calculations": suggestion.is_some()
                },
                "original_text": text
            });
            if let Some(terms) = args.search_terms {
                result["search_terms"] = Value::String(terms);
            }

            let output = match suggestion {
                Some(expression) => {
                    result["suggested_calculation"] = Value::String(expression);
                    ToolOutput::new(result).trigger(TriggeredTool::new("calculate"))
                }
                None => ToolOutput::new(result),
            };
            Ok(output)
        })
    }
}

/// Hands an expression to `calculate` and optionally measures it with
/// `text_length`.
#[derive(Debug, Default, Clone)]
pub struct SmartCalculatorTool;

#[derive(Debug, Deserialize)]
struct SmartCalculatorArgs {
    expression: String,
    #[serde(default = "default_format")]
    format_result: bool,
}

fn default_format() -> bool {
    true
}

impl SmartCalculatorTool {
    /// Creates a new smart calculator tool.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns the descriptor for registration.
    #[must_use]
    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(
            "smart_calculator",
            "Perform a calculation through the calculate tool and optionally measure the expression with text_length",
            InputSchema::new()
                .required_param("expression", ParamSchema::string("Expression to calculate"))
                .optional_param(
                    "format_result",
                    ParamSchema::boolean("Also run text_length on the expression")
                        .with_default(true),
                ),
        )
        .with_metadata(chain_metadata().with_category("math"))
    }
}

impl ToolHandler for SmartCalculatorTool {
    fn call(&self, args: Value) -> ToolFuture {
        Box::pin(async move {
            let args: SmartCalculatorArgs = decode_args("smart_calculator", args)?;

            let mut output = ToolOutput::new(json!({"expression": args.expression}))
                .trigger(TriggeredTool::new("calculate"));
            if args.format_result {
                output = output.trigger(TriggeredTool::new("text_length"));
            }
            Ok(output)
        })
    }
}
