use super::error::SqlError;
use super::types::{BoundClause, ClauseTemplate, ColumnMap, SqlFragment, UpdateRequest};

/// Builds the body of a `SET` clause for a partial update.
///
/// Every field becomes `"column"=$n`, where `n` is the field's 1-based position in
/// `update` and `values[n - 1]` is its new value.
///
/// ```text
/// {firstName: "Aliya", age: 32} => "first_name"=$1, "age"=$2 / ["Aliya", 32]
/// ```
pub fn build_set_fragment(
    update: &UpdateRequest,
    columns: &ColumnMap,
) -> Result<SqlFragment, SqlError> {
    if update.is_empty() {
        return Err(SqlError::NoData);
    }

    let clauses = update
        .iter()
        .map(|(field, value)| {
            BoundClause::new(columns.resolve(field), ClauseTemplate::Assign, value.clone())
        })
        .collect();

    Ok(SqlFragment::from_clauses(clauses, ", "))
}
