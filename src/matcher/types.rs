//! Predicate type and the combinators used to compose compiled conditions.

use crate::error::FieldCastError;
use crate::event::Datum;
use std::sync::Arc;

/// Compiled boolean test over one datum.
///
/// Predicates are built once per rule and shared by every evaluation, so they
/// hold only immutable state. The only failure is a field whose stored type
/// does not match what the predicate reads.
///
/// # Example
/// ```rust
/// use sigma_rule_engine::matcher::DatumPredicate;
/// use sigma_rule_engine::event::{Datum, JsonDatum};
/// use std::sync::Arc;
///
/// let has_user: DatumPredicate = Arc::new(|datum: &dyn Datum| Ok(datum.get_value("user").is_some()));
/// let datum = JsonDatum::new(serde_json::json!({"user": "root"}));
/// assert!(has_user(&datum).unwrap());
/// ```
pub type DatumPredicate = Arc<dyn Fn(&dyn Datum) -> Result<bool, FieldCastError> + Send + Sync>;

/// Wrap an infallible closure, typically a caller-supplied prefilter.
pub fn predicate<F>(f: F) -> DatumPredicate
where
    F: Fn(&dyn Datum) -> bool + Send + Sync + 'static,
{
    Arc::new(move |datum: &dyn Datum| Ok(f(datum)))
}

/// Predicate that never matches, whatever it is given.
pub fn always_false() -> DatumPredicate {
    Arc::new(|_: &dyn Datum| Ok(false))
}

/// Predicate that always matches.
pub fn always_true() -> DatumPredicate {
    Arc::new(|_: &dyn Datum| Ok(true))
}

/// Conjunction evaluated left to right, stopping at the first `false`.
pub fn all_of(predicates: Vec<DatumPredicate>) -> DatumPredicate {
    Arc::new(move |datum: &dyn Datum| {
        for predicate in &predicates {
            if !predicate(datum)? {
                return Ok(false);
            }
        }
        Ok(true)
    })
}

/// Disjunction evaluated left to right, stopping at the first `true`.
pub fn any_of(predicates: Vec<DatumPredicate>) -> DatumPredicate {
    Arc::new(move |datum: &dyn Datum| {
        for predicate in &predicates {
            if predicate(datum)? {
                return Ok(true);
            }
        }
        Ok(false)
    })
}

pub fn negate(predicate: DatumPredicate) -> DatumPredicate {
    Arc::new(move |datum: &dyn Datum| predicate(datum).map(|matched| !matched))
}
