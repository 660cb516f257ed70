//! Schema capability: payload validation against a subset of model fields.

mod validation;
pub(crate) use validation::{check_type, invalid_type_message};
pub use validation::{SchemaValidator, ValidationMode};
