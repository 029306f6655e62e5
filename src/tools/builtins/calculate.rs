//! Calculate built-in tool.
//!
//! Evaluates mathematical expressions with fasteval, which parses arithmetic
//! and a fixed set of math functions only. Nothing is executed as code.

use crate::tools::builtins::number_value;
use crate::tools::function::decode_args;
use crate::tools::{
    InputSchema, Latency, ParamSchema, SchemaType, ToolDescriptor, ToolError, ToolFuture,
    ToolHandler, ToolMetadata, ToolOutput,
};
use fasteval::ez_eval;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

const TOOL_NAME: &str = "calculate";
const MAX_EXPRESSION_LEN: usize = 1000;
const MAX_PRECISION: u32 = 10;

/// Calculate tool.
///
/// Evaluates an expression with optional variable bindings and an optional
/// number of decimal places for the formatted result.
#[derive(Debug, Default, Clone)]
pub struct CalculateTool;

#[derive(Debug, Deserialize)]
struct CalculateArgs {
    expression: String,
    #[serde(default)]
    precision: Option<u32>,
    #[serde(default)]
    variables: Option<BTreeMap<String, f64>>,
}

impl CalculateTool {
    /// Creates a new calculate tool.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns the descriptor for registration.
    #[must_use]
    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(
            TOOL_NAME,
            "Evaluate mathematical expressions. Supports arithmetic (+, -, *, /, ^, %), comparison, and built-in functions (sin, cos, tan, log, abs, min, max, floor, ceil, round, etc.).",
            InputSchema::new()
                .required_param(
                    "expression",
                    ParamSchema::string(
                        "Mathematical expression to evaluate (e.g., '2 + 3 * 4', 'abs(-5)')",
                    ),
                )
                .optional_param(
                    "precision",
                    ParamSchema::integer("Number of decimal places for the formatted result")
                        .with_keyword("minimum", json!(0))
                        .with_keyword("maximum", json!(MAX_PRECISION)),
                )
                .optional_param(
                    "variables",
                    ParamSchema::new(SchemaType::Object)
                        .with_description("Optional variable bindings (e.g., {\"x\": 5, \"y\": 10})")
                        .with_keyword("additionalProperties", json!({"type": "number"})),
                ),
        )
        .with_output_schema(json!({
            "type": "object",
            "properties": {
                "result": {"type": "number"},
                "formatted": {"type": "string"},
                "expression": {"type": "string"},
                "is_special": {"type": "boolean"}
            }
        }))
        .with_metadata(
            ToolMetadata::new()
                .with_category("math")
                .with_cost(0.0)
                .with_latency(Latency::Low),
        )
    }
}

/// Renders a result for display, spelling out non-finite values.
fn format_result(result: f64, precision: Option<u32>) -> (String, bool) {
    if result.is_nan() {
        return ("NaN".to_string(), true);
    }
    if result.is_infinite() {
        let text = if result.is_sign_positive() {
            "Infinity"
        } else {
            "-Infinity"
        };
        return (text.to_string(), true);
    }

    let formatted = match precision {
        Some(places) => format!("{:.*}", places as usize, result),
        None if result.fract() == 0.0 && result.abs() < 1e15 => format!("{}", result as i64),
        None => format!("{result}"),
    };
    (formatted, false)
}

impl ToolHandler for CalculateTool {
    fn call(&self, args: Value) -> ToolFuture {
        Box::pin(async move {
            let args: CalculateArgs = decode_args(TOOL_NAME, args)?;

            if args.expression.trim().is_empty() {
                return Err(ToolError::validation_failed(
                    TOOL_NAME,
                    "expression cannot be empty",
                ));
            }
            if args.expression.len() > MAX_EXPRESSION_LEN {
                return Err(ToolError::validation_failed(
                    TOOL_NAME,
                    format!("expression is too long (max {MAX_EXPRESSION_LEN} characters)"),
                ));
            }
            if args.precision.is_some_and(|p| p > MAX_PRECISION) {
                return Err(ToolError::validation_failed(
                    TOOL_NAME,
                    format!("precision must be between 0 and {MAX_PRECISION}"),
                ));
            }

            let user_vars = args.variables.unwrap_or_default();
            let mut namespace =
                |name: &str, _args: Vec<f64>| -> Option<f64> { user_vars.get(name).copied() };

            let result = ez_eval(&args.expression, &mut namespace).map_err(|e| {
                ToolError::execution_failed(TOOL_NAME, format!("failed to evaluate expression: {e}"))
            })?;

            let (formatted, is_special) = format_result(result, args.precision);

            Ok(ToolOutput::new(json!({
                "result": number_value(result),
                "formatted": formatted,
                "expression": args.expression,
                "is_special": is_special
            })))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn eval(args: Value) -> Result<Value, ToolError> {
        CalculateTool::new().call(args).await.map(|output| output.value)
    }

    #[tokio::test]
    async fn calculate_basic_arithmetic() {
        assert_eq!(eval(json!({"expression": "5 + 3"})).await.unwrap()["result"], 8);
        assert_eq!(eval(json!({"expression": "10 - 3"})).await.unwrap()["result"], 7);
        assert_eq!(eval(json!({"expression": "6 * 7"})).await.unwrap()["result"], 42);
        assert_eq!(eval(json!({"expression": "20 / 4"})).await.unwrap()["result"], 5);
    }

    #[tokio::test]
    async fn calculate_operator_precedence() {
        assert_eq!(eval(json!({"expression": "2 + 3 * 4"})).await.unwrap()["result"], 14);
        assert_eq!(eval(json!({"expression": "(2 + 3) * 4"})).await.unwrap()["result"], 20);
    }

    #[tokio::test]
    async fn calculate_power_and_functions() {
        assert_eq!(eval(json!({"expression": "2 ^ 10"})).await.unwrap()["result"], 1024);
        assert_eq!(eval(json!({"expression": "abs(-5)"})).await.unwrap()["result"], 5);
        assert_eq!(eval(json!({"expression": "floor(3.7)"})).await.unwrap()["result"], 3);
    }

    #[tokio::test]
    async fn calculate_fractional_result() {
        let value = eval(json!({"expression": "7 / 2"})).await.unwrap();
        assert_eq!(value["result"], 3.5);
        assert_eq!(value["formatted"], "3.5");
    }

    #[tokio::test]
    async fn calculate_constants() {
        let value = eval(json!({"expression": "pi()"})).await.unwrap();
        assert!((value["result"].as_f64().unwrap() - std::f64::consts::PI).abs() < 1e-10);
    }

    #[tokio::test]
    async fn calculate_with_variables() {
        let value = eval(json!({
            "expression": "x + y * 2",
            "variables": {"x": 5.0, "y": 10.0}
        }))
        .await
        .unwrap();
        assert_eq!(value["result"], 25);
    }

    #[tokio::test]
    async fn calculate_precision_formats_result() {
        let value = eval(json!({"expression": "10 / 3", "precision": 2}))
            .await
            .unwrap();
        assert_eq!(value["formatted"], "3.33");

        let value = eval(json!({"expression": "4 + 4", "precision": 0}))
            .await
            .unwrap();
        assert_eq!(value["formatted"], "8");
    }

    #[tokio::test]
    async fn calculate_rejects_excess_precision() {
        let err = eval(json!({"expression": "1 + 1", "precision": 11}))
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn calculate_division_by_zero() {
        let value = eval(json!({"expression": "1 / 0"})).await.unwrap();
        assert_eq!(value["is_special"], true);
        assert_eq!(value["formatted"], "Infinity");
    }

    #[tokio::test]
    async fn calculate_invalid_expression() {
        let err = eval(json!({"expression": "("})).await.unwrap_err();
        assert!(err.to_string().contains("failed to evaluate"));
    }

    #[tokio::test]
    async fn calculate_empty_expression() {
        let err = eval(json!({"expression": "  "})).await.unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn descriptor_has_schema_and_metadata() {
        let descriptor = CalculateTool::descriptor();
        assert_eq!(descriptor.name, "calculate");
        assert!(descriptor.input_schema.is_required("expression"));
        assert!(!descriptor.input_schema.is_required("precision"));
        assert_eq!(
            descriptor.metadata.and_then(|m| m.category).as_deref(),
            Some("math")
        );
        assert!(descriptor.output_schema.is_some());
    }
}
