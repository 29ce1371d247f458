//! Typed, translation-aware field access.

use crate::error::FieldCastError;
use crate::event::{Datum, FieldValue};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

/// Reads typed field values from a [`Datum`].
///
/// Holds an immutable mapping from the field names rules use to the names
/// datums store. Names without an entry pass through unchanged. The mapping
/// is applied before every lookup, and the accessor is cheap to clone so it
/// can be captured by every predicate compiled for one rule set.
///
/// Absent fields read as `Ok(None)` for every target type. A present value of
/// the wrong type is a [`FieldCastError`].
///
/// # Examples
///
/// ```rust
/// use sigma_rule_engine::matcher::FieldAccessor;
/// use sigma_rule_engine::event::JsonDatum;
/// use std::collections::HashMap;
///
/// let mut translations = HashMap::new();
/// translations.insert("EventName".to_string(), "eventName".to_string());
/// let accessor = FieldAccessor::new(translations);
///
/// let datum = JsonDatum::new(serde_json::json!({"eventName": "CreateFunction"}));
/// assert_eq!(accessor.get_string(&datum, "EventName")?.as_deref(), Some("CreateFunction"));
/// assert_eq!(accessor.get_integer(&datum, "missing")?, None);
/// assert!(accessor.get_integer(&datum, "EventName").is_err());
/// # Ok::<(), sigma_rule_engine::FieldCastError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct FieldAccessor {
    translations: Arc<HashMap<String, String>>,
}

impl FieldAccessor {
    pub fn new(translations: HashMap<String, String>) -> Self {
        Self {
            translations: Arc::new(translations),
        }
    }

    /// Physical field name for a logical one.
    pub fn translate<'a>(&'a self, field_name: &'a str) -> &'a str {
        self.translations
            .get(field_name)
            .map(String::as_str)
            .unwrap_or(field_name)
    }

    pub fn translations(&self) -> &HashMap<String, String> {
        &self.translations
    }

    pub fn get_string<'d>(
        &self,
        datum: &'d dyn Datum,
        field_name: &str,
    ) -> Result<Option<Cow<'d, str>>, FieldCastError> {
        let field = self.translate(field_name);
        match datum.get_value(field) {
            None => Ok(None),
            Some(FieldValue::String(s)) => Ok(Some(s)),
            Some(_) => Err(FieldCastError::new(field, "string")),
        }
    }

    pub fn get_boolean(
        &self,
        datum: &dyn Datum,
        field_name: &str,
    ) -> Result<Option<bool>, FieldCastError> {
        let field = self.translate(field_name);
        match datum.get_value(field) {
            None => Ok(None),
            Some(FieldValue::Boolean(b)) => Ok(Some(b)),
            Some(_) => Err(FieldCastError::new(field, "boolean")),
        }
    }

    /// Integer read. Stored floats are not narrowed.
    pub fn get_integer(
        &self,
        datum: &dyn Datum,
        field_name: &str,
    ) -> Result<Option<i64>, FieldCastError> {
        let field = self.translate(field_name);
        match datum.get_value(field) {
            None => Ok(None),
            Some(FieldValue::Integer(i)) => Ok(Some(i)),
            Some(_) => Err(FieldCastError::new(field, "integer")),
        }
    }

    /// Single-precision read. Stored integers are not widened.
    pub fn get_float(
        &self,
        datum: &dyn Datum,
        field_name: &str,
    ) -> Result<Option<f32>, FieldCastError> {
        let field = self.translate(field_name);
        match datum.get_value(field) {
            None => Ok(None),
            Some(FieldValue::Float(f)) => Ok(Some(f as f32)),
            Some(_) => Err(FieldCastError::new(field, "float")),
        }
    }

    pub fn get_double(
        &self,
        datum: &dyn Datum,
        field_name: &str,
    ) -> Result<Option<f64>, FieldCastError> {
        let field = self.translate(field_name);
        match datum.get_value(field) {
            None => Ok(None),
            Some(FieldValue::Float(f)) => Ok(Some(f)),
            Some(_) => Err(FieldCastError::new(field, "double")),
        }
    }

    /// Untyped read; never fails.
    pub fn get_object<'d>(
        &self,
        datum: &'d dyn Datum,
        field_name: &str,
    ) -> Result<Option<FieldValue<'d>>, FieldCastError> {
        Ok(datum.get_value(self.translate(field_name)))
    }
}
