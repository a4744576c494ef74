pub mod company;
pub mod job;
pub mod user;

use std::collections::HashMap;

use serde::{Deserialize, Deserializer};

pub use company::{Company, CompanyDetail, CompanySearch, CompanyUpdate, NewCompany};
pub use job::{Job, JobSearch, JobUpdate, NewJob};
pub use user::{User, UserUpdate};

/// Field name -> problem, reported back as `field_errors`.
pub type FieldErrors = HashMap<String, String>;

/// Checks request payloads before they reach the database.
pub trait Validate {
    fn validate(&self) -> Result<(), FieldErrors>;
}

pub(crate) fn into_result(errors: FieldErrors) -> Result<(), FieldErrors> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

pub(crate) fn is_valid_url(raw: &str) -> bool {
    matches!(url::Url::parse(raw), Ok(u) if u.scheme() == "http" || u.scheme() == "https")
}

/// Treats blank search terms as absent.
pub(crate) fn search_term(term: &Option<String>) -> Option<&str> {
    term.as_deref().map(str::trim).filter(|t| !t.is_empty())
}

/// Distinguishes an explicit `null` (`Some(None)`) from a missing field (`None`,
/// via `#[serde(default)]`) in PATCH bodies.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Optional PATCH field whose column is NOT NULL: absent is `None`, an explicit
/// `null` is a deserialization error.
pub(crate) fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}
