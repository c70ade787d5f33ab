//! Value conversion used when a property declares a target type.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Declared type of a param or action param.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typedata: Option<String>,
}

impl TypeSpec {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            subtype: None,
            typedata: None,
        }
    }

    pub fn with_subtype(mut self, subtype: &str) -> Self {
        self.subtype = Some(subtype.to_string());
        self
    }

    pub fn with_typedata(mut self, typedata: &str) -> Self {
        self.typedata = Some(typedata.to_string());
        self
    }
}

pub trait Converter {
    fn to(&self, value: &Value, kind: &str, subtype: Option<&str>, typedata: Option<&str>) -> Value;

    fn to_string(&self, value: &Value) -> String;
}

/// Conversion rules for the built-in param types: `string`, `number`,
/// `bool`, `object`, `array` and `choice`. Unknown types pass through.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConverter;

impl Converter for DefaultConverter {
    fn to(&self, value: &Value, kind: &str, subtype: Option<&str>, typedata: Option<&str>) -> Value {
        match kind {
            "string" => Value::String(self.to_string(value)),
            "number" => to_number(value, subtype == Some("integer")),
            "bool" => Value::Bool(to_bool(value)),
            "object" => to_object(value),
            "array" => to_array(value),
            "choice" => to_choice(self.to_string(value), typedata),
            _ => value.clone(),
        }
    }

    fn to_string(&self, value: &Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

fn to_number(value: &Value, integer: bool) -> Value {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        _ => None,
    };
    match parsed {
        Some(number) if integer => Value::Number(Number::from(number.trunc() as i64)),
        Some(number) => Number::from_f64(number).map_or(Value::Null, Value::Number),
        None => Value::Null,
    }
}

fn to_bool(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => matches!(text.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        Value::Null => false,
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn to_object(value: &Value) -> Value {
    match value {
        Value::String(text) => serde_json::from_str::<Value>(text)
            .ok()
            .filter(Value::is_object)
            .unwrap_or(Value::Null),
        Value::Object(_) => value.clone(),
        _ => Value::Null,
    }
}

fn to_array(value: &Value) -> Value {
    match value {
        Value::Array(_) => value.clone(),
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(parsed @ Value::Array(_)) => parsed,
            _ if text.trim().is_empty() => Value::Array(Vec::new()),
            _ => Value::Array(
                text.split(',')
                    .map(|item| Value::String(item.trim().to_string()))
                    .collect(),
            ),
        },
        Value::Null => Value::Array(Vec::new()),
        other => Value::Array(vec![other.clone()]),
    }
}

/// Choices are listed in `typedata` separated by `|`. A value outside the
/// list falls back to the first choice.
fn to_choice(text: String, typedata: Option<&str>) -> Value {
    let Some(choices) = typedata.filter(|data| !data.is_empty()) else {
        return Value::String(text);
    };
    let mut options = choices.split('|').map(str::trim);
    if options.clone().any(|option| option == text) {
        return Value::String(text);
    }
    options
        .next()
        .map_or(Value::String(text.clone()), |first| Value::String(first.to_string()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn convert(value: Value, kind: &str, subtype: Option<&str>, typedata: Option<&str>) -> Value {
        DefaultConverter.to(&value, kind, subtype, typedata)
    }

    #[test]
    fn converts_numbers() {
        assert_eq!(convert(json!("2.5"), "number", None, None), json!(2.5));
        assert_eq!(convert(json!("7.9"), "number", Some("integer"), None), json!(7));
        assert_eq!(convert(json!("abc"), "number", None, None), Value::Null);
    }

    #[test]
    fn converts_bools_and_strings() {
        assert_eq!(convert(json!("true"), "bool", None, None), json!(true));
        assert_eq!(convert(json!(0), "bool", None, None), json!(false));
        assert_eq!(convert(json!(12), "string", None, None), json!("12"));
        assert_eq!(DefaultConverter.to_string(&Value::Null), "");
    }

    #[test]
    fn converts_collections() {
        assert_eq!(convert(json!("a, b"), "array", None, None), json!(["a", "b"]));
        assert_eq!(convert(json!("[1,2]"), "array", None, None), json!([1, 2]));
        assert_eq!(convert(json!("{\"x\":1}"), "object", None, None), json!({"x": 1}));
    }

    #[test]
    fn choice_falls_back_to_first_option() {
        assert_eq!(convert(json!("green"), "choice", None, Some("red|green")), json!("green"));
        assert_eq!(convert(json!("blue"), "choice", None, Some("red|green")), json!("red"));
    }
}
