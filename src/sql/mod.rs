pub mod error;
pub mod types;
pub mod partial_update;
pub mod query_filter;

pub use error::SqlError;
pub use types::*;
pub use partial_update::build_set_fragment;
pub use query_filter::{
    build_where_fragment, build_where_prefix, contains_pattern, FilterKey, FilterRequest,
};
