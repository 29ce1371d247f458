use super::{Datum, FieldValue};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::borrow::Cow;

/// AWS CloudTrail audit record.
///
/// Only the fields rules currently reference are modelled; everything else in
/// the source document is dropped on deserialisation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudTrailEvent {
    #[serde(default)]
    pub event_name: Option<String>,
    #[serde(default)]
    pub time: i64,
}

impl CloudTrailEvent {
    pub const TIME_FIELD: &'static str = "time";

    pub fn new(event_name: impl Into<String>, time: i64) -> Self {
        Self {
            event_name: Some(event_name.into()),
            time,
        }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

impl Datum for CloudTrailEvent {
    fn get_value(&self, field_name: &str) -> Option<FieldValue<'_>> {
        match field_name {
            "eventName" => self
                .event_name
                .as_deref()
                .map(|name| FieldValue::String(Cow::Borrowed(name))),
            "time" => Some(FieldValue::Integer(self.time)),
            _ => None,
        }
    }

    fn time_field_name(&self) -> Option<&str> {
        Some(Self::TIME_FIELD)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
