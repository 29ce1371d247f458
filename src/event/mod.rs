//! Event model consumed by compiled rules.
//!
//! A [`Datum`] is one structured event handed to the engine. The engine only
//! ever asks a datum for raw field values by their physical name; typing and
//! field-name translation happen in [`crate::matcher::FieldAccessor`].
//!
//! Two record shapes ship with the crate:
//! - [`JsonDatum`] wraps an arbitrary JSON object
//! - [`CloudTrailEvent`] is a concrete cloud-audit-log record

mod cloudtrail;
mod json;

pub use cloudtrail::CloudTrailEvent;
pub use json::JsonDatum;

use std::any::Any;
use std::borrow::Cow;

/// Raw, untyped field value as stored by a datum.
///
/// Absence (including an explicit JSON `null`) is expressed by the datum
/// returning `None`, so there is no null variant here.
#[derive(Debug, Clone)]
pub enum FieldValue<'a> {
    String(Cow<'a, str>),
    Boolean(bool),
    Integer(i64),
    Float(f64),
    /// Nested value in the datum's own representation, e.g. a
    /// `serde_json::Value` for [`JsonDatum`]. Only reachable through object
    /// lookups; callers downcast it.
    Structured(&'a dyn Any),
}

impl PartialEq for FieldValue<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldValue::String(a), FieldValue::String(b)) => a == b,
            (FieldValue::Boolean(a), FieldValue::Boolean(b)) => a == b,
            (FieldValue::Integer(a), FieldValue::Integer(b)) => a == b,
            (FieldValue::Float(a), FieldValue::Float(b)) => a == b,
            // Opaque payloads compare by identity
            (FieldValue::Structured(a), FieldValue::Structured(b)) => {
                std::ptr::eq(*a as *const dyn Any as *const (), *b as *const dyn Any as *const ())
            }
            _ => false,
        }
    }
}

impl FieldValue<'_> {
    /// Name of the stored type, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::String(_) => "string",
            FieldValue::Boolean(_) => "boolean",
            FieldValue::Integer(_) => "integer",
            FieldValue::Float(_) => "float",
            FieldValue::Structured(_) => "structured",
        }
    }
}

impl<'a> From<&'a str> for FieldValue<'a> {
    fn from(value: &'a str) -> Self {
        FieldValue::String(Cow::Borrowed(value))
    }
}

impl From<bool> for FieldValue<'_> {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<i64> for FieldValue<'_> {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue<'_> {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

/// One structured input event.
///
/// Implementations must return `None` for fields they do not carry and must
/// never panic on unknown names. Datums are shared across evaluation threads,
/// hence the `Send + Sync` bound.
pub trait Datum: Send + Sync {
    /// Raw stored value of a physical field, or `None` when absent.
    fn get_value(&self, field_name: &str) -> Option<FieldValue<'_>>;

    /// Name of the canonical timestamp field, if the record family has one.
    fn time_field_name(&self) -> Option<&str>;

    /// Access to the concrete record type, for caller-supplied prefilters.
    fn as_any(&self) -> &dyn Any;
}
