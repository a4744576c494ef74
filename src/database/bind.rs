use serde_json::Value;
use sqlx::{postgres::PgArguments, FromRow, Postgres};

use crate::sql::SqlFragment;

type PgQueryAs<'q, O> = sqlx::query::QueryAs<'q, Postgres, O, PgArguments>;

/// Binds fragment values in placeholder order.
pub fn bind_fragment_as<'q, O>(
    mut q: PgQueryAs<'q, O>,
    fragment: &'q SqlFragment,
) -> PgQueryAs<'q, O>
where
    O: for<'r> FromRow<'r, sqlx::postgres::PgRow>,
{
    for v in fragment.values.iter() {
        q = bind_value_as(q, v);
    }
    q
}

pub fn bind_value_as<'q, O>(q: PgQueryAs<'q, O>, v: &'q Value) -> PgQueryAs<'q, O>
where
    O: for<'r> FromRow<'r, sqlx::postgres::PgRow>,
{
    match v {
        Value::Null => {
            // An INT8 null assigns cleanly to text, integer and numeric columns.
            let none: Option<i64> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s.as_str()),
        // Request types never produce arrays or objects; bind them as JSONB.
        Value::Array(_) | Value::Object(_) => q.bind(v.clone()),
    }
}
