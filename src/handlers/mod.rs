// handlers/mod.rs - HTTP handlers
//
// Access gates are attached as route layers in `routes.rs`; handlers assume
// the caller has already been authorised.

pub mod companies;
pub mod extract;
pub mod health;
pub mod jobs;
pub mod users;

use crate::database::models::Validate;
use crate::error::ApiError;

pub use extract::{JsonBody, QueryParams};

/// Runs payload validation, reporting every failing field at once.
pub(crate) fn validated<T: Validate>(payload: T) -> Result<T, ApiError> {
    payload
        .validate()
        .map_err(|errors| ApiError::validation_error("Invalid request body", Some(errors)))?;
    Ok(payload)
}
