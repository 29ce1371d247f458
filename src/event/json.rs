use super::{Datum, FieldValue};
use serde_json::Value;
use std::any::Any;
use std::borrow::Cow;

/// Datum backed by a JSON object.
///
/// Field lookup checks for a flat key first, so `"user.name"` stored as a
/// single key wins over `{"user": {"name": ...}}`. Otherwise the name is
/// split on dots and walked; arrays along the path are searched element by
/// element and the first hit is returned. A JSON `null` reads as absent.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonDatum {
    value: Value,
    time_field: Option<String>,
}

impl JsonDatum {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            time_field: None,
        }
    }

    pub fn with_time_field(mut self, field: impl Into<String>) -> Self {
        self.time_field = Some(field.into());
        self
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json).map(Self::new)
    }

    pub fn as_value(&self) -> &Value {
        &self.value
    }

    fn lookup(&self, path: &str) -> Option<&Value> {
        if let Some(v) = self.value.as_object().and_then(|obj| obj.get(path)) {
            return Some(v);
        }

        if path.contains('.') {
            let parts: Vec<&str> = path.split('.').collect();
            return traverse(&self.value, &parts);
        }

        None
    }
}

impl From<Value> for JsonDatum {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

fn traverse<'a>(current: &'a Value, parts: &[&str]) -> Option<&'a Value> {
    let Some((head, rest)) = parts.split_first() else {
        return Some(current);
    };

    match current {
        Value::Object(map) => traverse(map.get(*head)?, rest),
        Value::Array(items) => items.iter().find_map(|item| traverse(item, parts)),
        _ => None,
    }
}

fn to_field_value(value: &Value) -> Option<FieldValue<'_>> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(FieldValue::Boolean(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(FieldValue::Integer(i)),
            None => n.as_f64().map(FieldValue::Float),
        },
        Value::String(s) => Some(FieldValue::String(Cow::Borrowed(s))),
        Value::Array(_) | Value::Object(_) => Some(FieldValue::Structured(value)),
    }
}

impl Datum for JsonDatum {
    fn get_value(&self, field_name: &str) -> Option<FieldValue<'_>> {
        self.lookup(field_name).and_then(to_field_value)
    }

    fn time_field_name(&self) -> Option<&str> {
        self.time_field.as_deref()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
