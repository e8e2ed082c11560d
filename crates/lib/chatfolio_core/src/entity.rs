//! Entity flattening — turns Dialogflow parameter values into flat strings.
//!
//! Dialogflow reports extracted parameters as a `google.protobuf.Struct`,
//! which the REST API encodes as plain JSON. [`ParameterValue`] models the
//! value union explicitly and [`flatten`] reduces any value to the single
//! string that the gateway hands back to callers.

use std::collections::BTreeMap;

use serde_json::Value;

/// Struct sub-fields that contribute to a flattened composite entity, in
/// output order.
const AMOUNT_FIELD: &str = "amount";
const UNIT_FIELD: &str = "unit";
const DATE_TIME_FIELD: &str = "date_time";

/// A single parameter value as reported by the NLU provider.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Struct(BTreeMap<String, ParameterValue>),
    List(Vec<ParameterValue>),
}

impl ParameterValue {
    /// Numeric content, or `0.0` when the value is not a number.
    fn number_or_default(&self) -> f64 {
        match self {
            ParameterValue::Number(n) => *n,
            _ => 0.0,
        }
    }

    /// String content, or `""` when the value is not a string.
    fn str_or_default(&self) -> &str {
        match self {
            ParameterValue::String(s) => s,
            _ => "",
        }
    }
}

impl From<Value> for ParameterValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ParameterValue::Null,
            Value::Bool(b) => ParameterValue::Bool(b),
            // Every JSON number fits an f64 (protobuf `number_value` is a double).
            Value::Number(n) => ParameterValue::Number(n.as_f64().unwrap_or_default()),
            Value::String(s) => ParameterValue::String(s),
            Value::Array(items) => {
                ParameterValue::List(items.into_iter().map(ParameterValue::from).collect())
            }
            Value::Object(fields) => ParameterValue::Struct(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, ParameterValue::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Format a number the way the gateway always has: fixed, six decimals.
fn format_number(n: f64) -> String {
    format!("{n:.6}")
}

/// Flatten a parameter value into a single string.
///
/// - string → itself
/// - number → fixed six-decimal form (`3` → `"3.000000"`)
/// - bool → `"true"` / `"false"`
/// - struct → `amount`, `unit`, `date_time` concatenated in that order, each
///   only when present; any other field is dropped
/// - list → the flattened first element; later elements are ignored
/// - null, empty list → `""`
pub fn flatten(value: &ParameterValue) -> String {
    match value {
        ParameterValue::String(s) => s.clone(),
        ParameterValue::Number(n) => format_number(*n),
        ParameterValue::Bool(b) => b.to_string(),
        ParameterValue::Struct(fields) => {
            let mut out = String::new();
            if let Some(amount) = fields.get(AMOUNT_FIELD) {
                out.push_str(&format_number(amount.number_or_default()));
            }
            if let Some(unit) = fields.get(UNIT_FIELD) {
                out.push_str(unit.str_or_default());
            }
            if let Some(date_time) = fields.get(DATE_TIME_FIELD) {
                out.push_str(date_time.str_or_default());
            }
            out
        }
        // TODO: surface the remaining list elements once callers accept multi-valued entities.
        ParameterValue::List(items) => items.first().map(flatten).unwrap_or_default(),
        ParameterValue::Null => String::new(),
    }
}

/// Flatten every parameter of a provider `parameters` object.
///
/// A missing or non-object `parameters` value yields an empty map.
pub fn flatten_parameters(parameters: Option<Value>) -> BTreeMap<String, String> {
    let Some(Value::Object(fields)) = parameters else {
        return BTreeMap::new();
    };
    fields
        .into_iter()
        .map(|(name, raw)| {
            let value = ParameterValue::from(raw);
            let flat = flatten(&value);
            tracing::debug!(param = %name, value = %flat, raw = ?value, "extracted parameter");
            (name, flat)
        })
        .collect()
}
