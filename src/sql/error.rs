use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SqlError {
    #[error("No data")]
    NoData,

    #[error("Unknown filter: {0}")]
    UnknownFilter(String),

    #[error("Invalid value for filter: {0}")]
    InvalidValue(String),
}
