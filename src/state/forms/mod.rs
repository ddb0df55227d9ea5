//! Form domain layer
//!
//! Field values, the per-step field schema and the rules that gate each step.

mod field;
mod rules;
mod schema;
mod validation;

pub use field::{FieldKind, FieldValue};
pub use rules::{Length, Pattern, Rule};
pub use schema::*;
pub use validation::{validate_all, validate_step, ValidationResult};
