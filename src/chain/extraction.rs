//! Parameter extraction for triggered tools.
//!
//! When a result triggers a tool without explicit arguments, the arguments
//! are derived from the parent's result. Each tool name can have its own
//! `ExtractionStrategy`; anything a strategy cannot handle falls back to the
//! generic rule, which forwards the most relevant part of the result under
//! `input`. Extraction never fails.

use crate::tools::TriggeredTool;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, LazyLock};

/// Derives arguments for one tool from a previous result.
pub trait ExtractionStrategy: Send + Sync + Debug {
    /// Returns the arguments, or `None` to use the generic fallback.
    fn extract(&self, previous: &Value) -> Option<Value>;
}

/// Numbers joined by arithmetic operators, e.g. `5 + 3` or `2.5*4 - 1`.
static ARITHMETIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+(?:\.\d+)?(?:\s*[-+*/^%]\s*\d+(?:\.\d+)?)+")
        .expect("Invalid arithmetic regex")
});

/// Runs of digits, operators and parentheses.
static OPERATOR_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\d+\-*/()\s.=]+").expect("Invalid operator run regex"));

/// A capitalised phrase following the word "in".
static LOCATION_AFTER_IN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bin\s+([A-Z][a-zA-Z]+(?:\s+[A-Z][a-zA-Z]+)*)").expect("Invalid location regex")
});

const LOCATION_STOP_WORDS: &[&str] = &[
    "The", "Check", "Get", "Find", "Show", "Today", "Tomorrow", "Weather",
];

/// Returns the text a strategy searches: the string itself, the string
/// leaves of an object or array joined by newlines, or the JSON text of
/// any other scalar.
#[must_use]
pub fn text_view(value: &Value) -> String {
    fn collect<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
        match value {
            Value::String(s) => out.push(s),
            Value::Array(items) => items.iter().for_each(|item| collect(item, out)),
            Value::Object(map) => map.values().for_each(|item| collect(item, out)),
            _ => {}
        }
    }

    match value {
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => {
            let mut leaves = Vec::new();
            collect(value, &mut leaves);
            leaves.join("\n")
        }
        other => other.to_string(),
    }
}

/// Finds an arithmetic expression for `calculate`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArithmeticExpression;

impl ArithmeticExpression {
    fn find(text: &str) -> Option<String> {
        if let Some(found) = ARITHMETIC.find(text) {
            return Some(found.as_str().trim().to_string());
        }

        let mentions_calculation = text.to_lowercase().contains("calculate")
            || text.chars().any(|c| matches!(c, '+' | '-' | '*' | '/' | '='));
        if !mentions_calculation {
            return None;
        }

        OPERATOR_RUN
            .find_iter(text)
            .map(|m| m.as_str().trim())
            .find(|run| run.len() > 1 && run.chars().any(|c| matches!(c, '+' | '-' | '*' | '/')))
            .map(str::to_string)
    }
}

impl ExtractionStrategy for ArithmeticExpression {
    fn extract(&self, previous: &Value) -> Option<Value> {
        Self::find(&text_view(previous)).map(|expression| json!({"expression": expression}))
    }
}

/// Finds a place name for `get_weather`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocationPhrase;

impl LocationPhrase {
    fn find(text: &str) -> Option<String> {
        if let Some(captures) = LOCATION_AFTER_IN.captures(text) {
            return captures.get(1).map(|m| m.as_str().to_string());
        }

        text.split_whitespace()
            .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()))
            .find(|word| {
                word.chars().next().is_some_and(char::is_uppercase)
                    && word.chars().count() > 2
                    && !LOCATION_STOP_WORDS.contains(word)
            })
            .map(str::to_string)
    }
}

impl ExtractionStrategy for LocationPhrase {
    fn extract(&self, previous: &Value) -> Option<Value> {
        Self::find(&text_view(previous)).map(|location| json!({"location": location}))
    }
}

/// Forwards the first present key of an object result under `param`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardKey {
    /// Parameter name on the triggered tool
    pub param: String,
    /// Keys looked up in the previous result, in priority order
    pub keys: Vec<String>,
}

impl ForwardKey {
    /// Creates a forwarding rule.
    #[must_use]
    pub fn new<I, S>(param: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            param: param.into(),
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }
}

impl ExtractionStrategy for ForwardKey {
    fn extract(&self, previous: &Value) -> Option<Value> {
        let object = previous.as_object()?;
        let value = self
            .keys
            .iter()
            .find_map(|key| object.get(key).filter(|v| !v.is_null()))?;

        let mut arguments = Map::new();
        arguments.insert(self.param.clone(), value.clone());
        Some(Value::Object(arguments))
    }
}

/// Per-tool table of extraction strategies.
#[derive(Debug, Clone)]
pub struct ParameterExtractor {
    strategies: HashMap<String, Arc<dyn ExtractionStrategy>>,
}

impl Default for ParameterExtractor {
    /// `calculate`, `get_weather`, `chain_starter` and `text_length` have
    /// strategies; every other tool uses the generic fallback.
    fn default() -> Self {
        Self::empty()
            .with_strategy("calculate", ArithmeticExpression)
            .with_strategy("get_weather", LocationPhrase)
            .with_strategy("chain_starter", ForwardKey::new("input_text", ["processed_data"]))
            .with_strategy(
                "text_length",
                ForwardKey::new(
                    "text",
                    ["text", "expression", "original_text", "processed_data"],
                ),
            )
    }
}

impl ParameterExtractor {
    /// A table with no strategies; everything uses the generic fallback.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// Sets the strategy for a tool, replacing any previous one.
    #[must_use]
    pub fn with_strategy<S>(mut self, tool_name: impl Into<String>, strategy: S) -> Self
    where
        S: ExtractionStrategy + 'static,
    {
        self.strategies.insert(tool_name.into(), Arc::new(strategy));
        self
    }

    /// Returns true if a tool has its own strategy.
    #[must_use]
    pub fn has_strategy(&self, tool_name: &str) -> bool {
        self.strategies.contains_key(tool_name)
    }

    /// Derives arguments for a triggered tool.
    ///
    /// Explicit trigger arguments win; then the tool's strategy; then the
    /// generic fallback.
    #[must_use]
    pub fn extract(&self, trigger: &TriggeredTool, previous: &Value) -> Value {
        if let Some(ref arguments) = trigger.arguments {
            return arguments.clone();
        }

        self.strategies
            .get(&trigger.tool)
            .and_then(|strategy| strategy.extract(previous))
            .unwrap_or_else(|| Self::generic(previous))
    }

    /// Forwards `processed_data`, then `result`, of an object result, or
    /// the whole result as text, under `input`.
    #[must_use]
    pub fn generic(previous: &Value) -> Value {
        let input = match previous {
            Value::Object(object) => object
                .get("processed_data")
                .or_else(|| object.get("result"))
                .cloned()
                .unwrap_or_else(|| Value::String(previous.to_string())),
            Value::String(s) => Value::String(s.clone()),
            other => Value::String(other.to_string()),
        };
        json!({"input": input})
    }
}
