//! Tool input schemas.
//!
//! A tool's input is always a JSON object. `InputSchema` describes its
//! properties as a flat map of `ParamSchema` entries plus the list of
//! required names, serialising to the usual JSON Schema shape:
//!
//! ```json
//! {"type": "object", "properties": {"text": {"type": "string"}}, "required": ["text"]}
//! ```
//!
//! Keywords this module does not interpret are kept in `extra` so a schema
//! survives a serialise/deserialise cycle unchanged.

use crate::tools::error::ToolError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// JSON Schema primitive type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    /// JSON string
    String,
    /// Whole number (`i64` or `u64` representable)
    Integer,
    /// Any JSON number
    Number,
    /// `true` / `false`
    Boolean,
    /// JSON array
    Array,
    /// JSON object
    Object,
}

impl SchemaType {
    /// Returns the JSON Schema keyword for this type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    /// Parses a JSON Schema type keyword. Returns `None` for `null` and
    /// anything unrecognised.
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "string" => Some(Self::String),
            "integer" => Some(Self::Integer),
            "number" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            "array" => Some(Self::Array),
            "object" => Some(Self::Object),
            _ => None,
        }
    }

    /// Returns true if `value` is an instance of this type.
    #[must_use]
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns the JSON type name of a value, distinguishing integers from
/// other numbers.
#[must_use]
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Schema of a single named parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSchema {
    /// Declared type
    #[serde(rename = "type")]
    pub kind: SchemaType,
    /// Human description shown to models
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Allowed values, if constrained
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<Value>>,
    /// Value assumed when the parameter is omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Uninterpreted keywords (`format`, `items`, `minimum`, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ParamSchema {
    /// Creates a parameter schema of the given type.
    #[must_use]
    pub fn new(kind: SchemaType) -> Self {
        Self {
            kind,
            description: None,
            allowed: None,
            default: None,
            extra: Map::new(),
        }
    }

    /// A string parameter with a description.
    #[must_use]
    pub fn string(description: impl Into<String>) -> Self {
        Self::new(SchemaType::String).with_description(description)
    }

    /// An integer parameter with a description.
    #[must_use]
    pub fn integer(description: impl Into<String>) -> Self {
        Self::new(SchemaType::Integer).with_description(description)
    }

    /// A number parameter with a description.
    #[must_use]
    pub fn number(description: impl Into<String>) -> Self {
        Self::new(SchemaType::Number).with_description(description)
    }

    /// A boolean parameter with a description.
    #[must_use]
    pub fn boolean(description: impl Into<String>) -> Self {
        Self::new(SchemaType::Boolean).with_description(description)
    }

    /// An object parameter with a description.
    #[must_use]
    pub fn object(description: impl Into<String>) -> Self {
        Self::new(SchemaType::Object).with_description(description)
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Restricts the parameter to a fixed set of values.
    #[must_use]
    pub fn with_enum<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.allowed = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Adds an uninterpreted keyword.
    #[must_use]
    pub fn with_keyword(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Schema of a tool's argument object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSchema {
    /// Always `object`
    #[serde(rename = "type", default = "object_type")]
    pub kind: SchemaType,
    /// Parameters by name
    #[serde(default)]
    pub properties: BTreeMap<String, ParamSchema>,
    /// Names of parameters that must be present
    #[serde(default)]
    pub required: Vec<String>,
    /// Uninterpreted top-level keywords
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn object_type() -> SchemaType {
    SchemaType::Object
}

impl Default for InputSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSchema {
    /// Creates an empty object schema that accepts any arguments.
    #[must_use]
    pub fn new() -> Self {
        Self {
            kind: SchemaType::Object,
            properties: BTreeMap::new(),
            required: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Adds a required parameter.
    #[must_use]
    pub fn required_param(mut self, name: impl Into<String>, schema: ParamSchema) -> Self {
        let name = name.into();
        if !self.required.contains(&name) {
            self.required.push(name.clone());
        }
        self.properties.insert(name, schema);
        self
    }

    /// Adds an optional parameter.
    #[must_use]
    pub fn optional_param(mut self, name: impl Into<String>, schema: ParamSchema) -> Self {
        self.properties.insert(name.into(), schema);
        self
    }

    /// Returns true if `name` is listed as required.
    #[must_use]
    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    /// Derives a schema from a `JsonSchema` argument type.
    ///
    /// Each field's type is mapped to the nearest `SchemaType`: referenced
    /// structs become `object`, nullable unions use their non-null member,
    /// and anything unrecognised falls back to `string`. A field is
    /// required when schemars lists it as required, i.e. it is neither an
    /// `Option` nor `#[serde(default)]`.
    #[must_use]
    pub fn for_type<T: JsonSchema>() -> Self {
        let root = schemars::schema_for!(T);
        match serde_json::to_value(&root) {
            Ok(value) => Self::from_json_schema(&value),
            Err(_) => Self::new(),
        }
    }

    /// Converts a generated JSON Schema document into an `InputSchema`.
    fn from_json_schema(root: &Value) -> Self {
        let definitions = root.get("definitions").and_then(Value::as_object);
        let mut schema = Self::new();

        if let Some(properties) = root.get("properties").and_then(Value::as_object) {
            for (name, property) in properties {
                schema
                    .properties
                    .insert(name.clone(), param_from_json(property, definitions));
            }
        }

        if let Some(required) = root.get("required").and_then(Value::as_array) {
            schema.required = required
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect();
        }

        schema
    }

    /// Validates an argument value against this schema.
    ///
    /// `null` is treated as an empty object. Required fields are checked in
    /// declaration order, then each provided field in name order.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if the arguments are not an object, or an
    ///   enum-constrained value is not allowed
    /// - `MissingParameter` if a required field is absent or null
    /// - `TypeMismatch` if a provided value has the wrong type
    pub fn validate(&self, tool_name: &str, args: &Value) -> Result<(), ToolError> {
        let empty = Map::new();
        let object = match args {
            Value::Null => &empty,
            Value::Object(map) => map,
            other => {
                return Err(ToolError::validation_failed(
                    tool_name,
                    format!(
                        "arguments must be a JSON object, got {}",
                        json_type_name(other)
                    ),
                ))
            }
        };

        for field in &self.required {
            match object.get(field) {
                None | Some(Value::Null) => {
                    return Err(ToolError::missing_parameter(tool_name, field));
                }
                Some(_) => {}
            }
        }

        for (field, param) in &self.properties {
            let value = match object.get(field) {
                None | Some(Value::Null) => continue,
                Some(value) => value,
            };

            if !param.kind.matches(value) {
                return Err(ToolError::type_mismatch(
                    tool_name,
                    field,
                    param.kind.as_str(),
                    json_type_name(value),
                ));
            }

            if let Some(ref allowed) = param.allowed {
                if !allowed.contains(value) {
                    return Err(ToolError::validation_failed(
                        tool_name,
                        format!(
                            "parameter '{}' must be one of {}",
                            field,
                            Value::Array(allowed.clone())
                        ),
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Builds a `ParamSchema` from one generated property schema.
fn param_from_json(property: &Value, definitions: Option<&Map<String, Value>>) -> ParamSchema {
    let resolved = resolve(property, definitions);

    let kind = schema_type_of(resolved, property);
    let mut param = ParamSchema::new(kind);

    param.description = property
        .get("description")
        .or_else(|| resolved.get("description"))
        .and_then(Value::as_str)
        .map(str::to_string);
    param.allowed = resolved.get("enum").and_then(Value::as_array).map(|values| {
        values
            .iter()
            .filter(|value| !value.is_null())
            .cloned()
            .collect()
    });
    param.default = property.get("default").cloned();
    if let Some(format) = resolved.get("format") {
        param.extra.insert("format".to_string(), format.clone());
    }

    param
}

/// Follows a `$ref` (directly or through a single-member `allOf`) into the
/// definitions table.
fn resolve<'a>(property: &'a Value, definitions: Option<&'a Map<String, Value>>) -> &'a Value {
    let target = property
        .get("allOf")
        .and_then(Value::as_array)
        .filter(|members| members.len() == 1)
        .and_then(|members| members.first())
        .unwrap_or(property);

    target
        .get("$ref")
        .and_then(Value::as_str)
        .and_then(|reference| reference.rsplit('/').next())
        .and_then(|name| definitions.and_then(|defs| defs.get(name)))
        .unwrap_or(target)
}

fn schema_type_of(resolved: &Value, original: &Value) -> SchemaType {
    match resolved.get("type") {
        Some(Value::String(keyword)) => {
            SchemaType::from_keyword(keyword).unwrap_or(SchemaType::String)
        }
        Some(Value::Array(keywords)) => keywords
            .iter()
            .filter_map(Value::as_str)
            .find_map(SchemaType::from_keyword)
            .unwrap_or(SchemaType::String),
        _ if original.get("$ref").is_some() || resolved.get("properties").is_some() => {
            SchemaType::Object
        }
        _ => SchemaType::String,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn echo_schema() -> InputSchema {
        InputSchema::new().required_param("text", ParamSchema::string("Text to echo"))
    }

    #[test]
    fn serializes_to_json_schema_shape() {
        let value = serde_json::to_value(echo_schema()).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "object",
                "properties": {"text": {"type": "string", "description": "Text to echo"}},
                "required": ["text"]
            })
        );
    }

    #[test]
    fn unknown_keywords_survive_deserialization() {
        let raw = json!({
            "type": "object",
            "properties": {
                "tags": {"type": "array", "items": {"type": "string"}, "minItems": 1}
            },
            "required": [],
            "additionalProperties": false
        });
        let schema: InputSchema = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(schema.properties["tags"].extra["minItems"], json!(1));
        assert_eq!(serde_json::to_value(&schema).unwrap(), raw);
    }

    #[test]
    fn validate_accepts_matching_args() {
        assert!(echo_schema().validate("echo", &json!({"text": "hi"})).is_ok());
    }

    #[test]
    fn validate_reports_missing_required() {
        let err = echo_schema().validate("echo", &json!({})).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("'text'"));
    }

    #[test]
    fn validate_treats_null_args_as_empty_object() {
        assert!(InputSchema::new().validate("noop", &Value::Null).is_ok());
        let err = echo_schema().validate("echo", &Value::Null).unwrap_err();
        assert!(matches!(
            err.kind(),
            crate::tools::ToolErrorKind::MissingParameter { .. }
        ));
    }

    #[test]
    fn validate_rejects_non_object() {
        let err = echo_schema().validate("echo", &json!("hi")).unwrap_err();
        assert!(err.to_string().contains("must be a JSON object"));
    }

    #[test]
    fn validate_reports_type_mismatch() {
        let err = echo_schema()
            .validate("echo", &json!({"text": 42}))
            .unwrap_err();
        assert!(matches!(
            err.kind(),
            crate::tools::ToolErrorKind::TypeMismatch { field, expected, actual, .. }
                if field == "text" && expected == "string" && actual == "integer"
        ));
    }

    #[test]
    fn integer_rejects_fractional_numbers() {
        let schema = InputSchema::new().required_param("n", ParamSchema::integer("count"));
        assert!(schema.validate("t", &json!({"n": 3})).is_ok());
        assert!(schema.validate("t", &json!({"n": 3.5})).is_err());
    }

    #[test]
    fn number_accepts_integers() {
        let schema = InputSchema::new().required_param("x", ParamSchema::number("value"));
        assert!(schema.validate("t", &json!({"x": 3})).is_ok());
        assert!(schema.validate("t", &json!({"x": 3.5})).is_ok());
    }

    #[test]
    fn optional_null_is_absent() {
        let schema = echo_schema().optional_param("count", ParamSchema::integer("times"));
        assert!(schema
            .validate("echo", &json!({"text": "a", "count": null}))
            .is_ok());
    }

    #[test]
    fn enum_constraint_enforced() {
        let schema = InputSchema::new().required_param(
            "format",
            ParamSchema::string("output format").with_enum(["iso", "readable"]),
        );
        assert!(schema.validate("t", &json!({"format": "iso"})).is_ok());
        let err = schema
            .validate("t", &json!({"format": "unix"}))
            .unwrap_err();
        assert!(err.to_string().contains("must be one of"));
    }

    #[test]
    fn unknown_fields_accepted() {
        assert!(echo_schema()
            .validate("echo", &json!({"text": "a", "extra": true}))
            .is_ok());
    }

    #[derive(JsonSchema)]
    #[allow(dead_code)]
    struct Inner {
        value: i32,
    }

    #[derive(JsonSchema)]
    #[allow(dead_code)]
    enum Mode {
        Fast,
        Slow,
    }

    #[derive(JsonSchema)]
    #[allow(dead_code)]
    struct Args {
        /// The name
        name: String,
        count: u32,
        ratio: f64,
        flag: bool,
        items: Vec<String>,
        nested: Inner,
        mode: Mode,
        maybe: Option<i64>,
    }

    #[test]
    fn derives_types_from_struct() {
        let schema = InputSchema::for_type::<Args>();
        let kind = |name: &str| schema.properties[name].kind;

        assert_eq!(kind("name"), SchemaType::String);
        assert_eq!(kind("count"), SchemaType::Integer);
        assert_eq!(kind("ratio"), SchemaType::Number);
        assert_eq!(kind("flag"), SchemaType::Boolean);
        assert_eq!(kind("items"), SchemaType::Array);
        assert_eq!(kind("nested"), SchemaType::Object);
        assert_eq!(kind("mode"), SchemaType::String);
        assert_eq!(kind("maybe"), SchemaType::Integer);
    }

    #[test]
    fn derives_required_and_descriptions() {
        let schema = InputSchema::for_type::<Args>();

        assert!(schema.is_required("name"));
        assert!(schema.is_required("nested"));
        assert!(!schema.is_required("maybe"));
        assert_eq!(
            schema.properties["name"].description.as_deref(),
            Some("The name")
        );
        assert_eq!(
            schema.properties["mode"].allowed,
            Some(vec![json!("Fast"), json!("Slow")])
        );
    }

    #[test]
    fn value_argument_type_has_no_properties() {
        let schema = InputSchema::for_type::<Value>();
        assert!(schema.properties.is_empty());
        assert!(schema.required.is_empty());
    }
}
