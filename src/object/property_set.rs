use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::convert::{Converter, TypeSpec};

/// Result of pushing a value through the property gate.
#[derive(Debug, Clone, PartialEq)]
pub enum SetOutcome {
    /// The committed value, after coercion.
    Changed(Value),
    Unchanged,
    Rejected,
}

impl SetOutcome {
    pub fn is_changed(&self) -> bool {
        matches!(self, SetOutcome::Changed(_))
    }

    pub fn changed_value(self) -> Option<Value> {
        match self {
            SetOutcome::Changed(value) => Some(value),
            _ => None,
        }
    }
}

/// Optional coercion applied before the equality check.
pub struct Coercion<'a> {
    pub converter: &'a dyn Converter,
    pub spec: &'a TypeSpec,
}

/// Property values for one artifact or proxy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertySet {
    values: BTreeMap<String, Value>,
}

impl PropertySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy the named entries out of a JSON object snapshot.
    pub fn from_snapshot<'a>(snapshot: &Value, names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut values = BTreeMap::new();
        if let Some(object) = snapshot.as_object() {
            for name in names {
                if let Some(value) = object.get(name) {
                    values.insert(name.to_string(), value.clone());
                }
            }
        }
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// The single mutation gate: coerce, compare, commit.
    pub fn set(&mut self, name: &str, value: Value, coercion: Option<Coercion<'_>>) -> SetOutcome {
        let value = match coercion {
            Some(Coercion { converter, spec }) => converter.to(
                &value,
                &spec.kind,
                spec.subtype.as_deref(),
                spec.typedata.as_deref(),
            ),
            None => value,
        };
        if self.values.get(name) == Some(&value) {
            return SetOutcome::Unchanged;
        }
        self.values.insert(name.to_string(), value.clone());
        SetOutcome::Changed(value)
    }

    /// Overwrite without comparing. Used for remote-confirmed state.
    pub fn replace(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn to_value(&self) -> Value {
        let map: Map<String, Value> = self
            .values
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::convert::DefaultConverter;

    #[test]
    fn unchanged_value_short_circuits() {
        let mut props = PropertySet::new();
        assert_eq!(
            props.set("value", json!(1), None),
            SetOutcome::Changed(json!(1))
        );
        assert_eq!(props.set("value", json!(1), None), SetOutcome::Unchanged);
    }

    #[test]
    fn coercion_runs_before_comparison() {
        let mut props = PropertySet::new();
        let spec = TypeSpec::new("number");
        let converter = DefaultConverter;
        props.set("value", json!(5.0), None);
        let outcome = props.set(
            "value",
            json!("5"),
            Some(Coercion {
                converter: &converter,
                spec: &spec,
            }),
        );
        assert_eq!(outcome, SetOutcome::Unchanged);
    }

    #[test]
    fn snapshot_only_takes_named_entries() {
        let props = PropertySet::from_snapshot(&json!({"a": 1, "b": 2}), ["a"]);
        assert_eq!(props.get("a"), Some(&json!(1)));
        assert!(!props.contains("b"));
        assert_eq!(props.to_value(), json!({"a": 1}));
    }
}
