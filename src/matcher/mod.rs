//! Predicate building blocks for compiled rules.
//!
//! Compiled conditions are trees of [`DatumPredicate`] closures. This module
//! provides the pieces they are assembled from:
//!
//! - [`FieldAccessor`] - typed, translation-aware field reads
//! - [`Cidr`] - network blocks for address containment leaves
//! - combinators ([`all_of`], [`any_of`], [`negate`]) and constants
//!
//! ## Example Usage
//!
//! ```rust
//! use sigma_rule_engine::matcher::{all_of, negate, predicate, FieldAccessor};
//! use sigma_rule_engine::event::JsonDatum;
//!
//! let accessor = FieldAccessor::default();
//! let is_root = {
//!     let accessor = accessor.clone();
//!     predicate(move |d| matches!(accessor.get_string(d, "user"), Ok(Some(u)) if u == "root"))
//! };
//! let has_tty = predicate(|d| d.get_value("tty").is_some());
//! let root_without_tty = all_of(vec![is_root, negate(has_tty)]);
//!
//! let datum = JsonDatum::new(serde_json::json!({"user": "root"}));
//! assert!(root_without_tty(&datum)?);
//! # Ok::<(), sigma_rule_engine::FieldCastError>(())
//! ```

pub mod cidr;
pub mod fields;
pub mod types;

pub use cidr::Cidr;
pub use fields::FieldAccessor;
pub use types::{
    all_of, always_false, always_true, any_of, negate, predicate, DatumPredicate,
};
