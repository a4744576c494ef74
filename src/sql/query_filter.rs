use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use super::error::SqlError;
use super::types::{BoundClause, ClauseTemplate, ColumnMap, Comparison, SqlFragment};

/// Recognised search filters. Each key has exactly one comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKey {
    NameLike,
    MinEmployees,
    MaxEmployees,
    TitleLike,
    MinSalary,
}

impl FilterKey {
    pub const ALL: [FilterKey; 5] = [
        FilterKey::NameLike,
        FilterKey::MinEmployees,
        FilterKey::MaxEmployees,
        FilterKey::TitleLike,
        FilterKey::MinSalary,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FilterKey::NameLike => "nameLike",
            FilterKey::MinEmployees => "minEmployees",
            FilterKey::MaxEmployees => "maxEmployees",
            FilterKey::TitleLike => "titleLike",
            FilterKey::MinSalary => "minSalary",
        }
    }

    pub fn comparison(self) -> Comparison {
        match self {
            FilterKey::NameLike | FilterKey::TitleLike => Comparison::Contains,
            FilterKey::MinEmployees | FilterKey::MinSalary => Comparison::AtLeast,
            FilterKey::MaxEmployees => Comparison::AtMost,
        }
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterKey {
    type Err = SqlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| SqlError::UnknownFilter(s.to_string()))
    }
}

/// Ordered filter key -> value pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterRequest {
    entries: Vec<(FilterKey, Value)>,
}

impl FilterRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: FilterKey, value: impl Into<Value>) -> Self {
        self.push(key, value);
        self
    }

    /// Appends a filter, or replaces the value in place if the key is already present.
    pub fn push(&mut self, key: FilterKey, value: impl Into<Value>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Parses string keys, rejecting anything outside [`FilterKey`].
    pub fn from_map(map: &Map<String, Value>) -> Result<Self, SqlError> {
        let mut request = Self::new();
        for (key, value) in map {
            request.push(key.parse()?, value.clone());
        }
        Ok(request)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, key: FilterKey) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// Fails with `UnknownFilter` on the first key outside `allowed`.
    pub fn restrict(&self, allowed: &[FilterKey]) -> Result<(), SqlError> {
        match self.entries.iter().find(|(k, _)| !allowed.contains(k)) {
            Some((key, _)) => Err(SqlError::UnknownFilter(key.to_string())),
            None => Ok(()),
        }
    }

    /// String value of `key`. Query strings carry every value as text.
    pub fn text(&self, key: FilterKey) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Integer value of `key`, accepting JSON numbers and numeric strings.
    pub fn integer(&self, key: FilterKey) -> Result<Option<i64>, SqlError> {
        let invalid = || SqlError::InvalidValue(key.to_string());
        match self.get(key) {
            None => Ok(None),
            Some(Value::Number(n)) => n.as_i64().map(Some).ok_or_else(invalid),
            Some(Value::String(s)) => s.trim().parse().map(Some).map_err(|_| invalid()),
            Some(_) => Err(invalid()),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (FilterKey, &Value)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }
}

/// Builds `col OP $n` comparisons joined by `AND`, one per filter, in request order.
///
/// Values are bound verbatim: a `*Like` value must already be a full pattern
/// (see [`contains_pattern`]). Range consistency between min and max filters is
/// the caller's responsibility.
pub fn build_where_fragment(
    filter: &FilterRequest,
    columns: &ColumnMap,
) -> Result<SqlFragment, SqlError> {
    if filter.is_empty() {
        return Err(SqlError::NoData);
    }

    let clauses = filter
        .iter()
        .map(|(key, value)| {
            BoundClause::new(
                columns.resolve(key.as_str()),
                ClauseTemplate::Compare(key.comparison()),
                value.clone(),
            )
        })
        .collect();

    Ok(SqlFragment::from_clauses(clauses, " AND "))
}

/// Like [`build_where_fragment`] but includes the `WHERE` keyword, and yields an
/// empty fragment for an empty filter so it can be spliced unconditionally.
pub fn build_where_prefix(filter: &FilterRequest, columns: &ColumnMap) -> SqlFragment {
    match build_where_fragment(filter, columns) {
        Ok(frag) => SqlFragment {
            sql: format!("WHERE {}", frag.sql),
            values: frag.values,
        },
        Err(_) => SqlFragment::default(),
    }
}

/// Wraps a search term for a `Contains` filter, escaping LIKE metacharacters.
pub fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn company_columns() -> ColumnMap {
        ColumnMap::from_pairs([
            ("nameLike", "name"),
            ("minEmployees", "num_employees"),
            ("maxEmployees", "num_employees"),
        ])
    }

    #[test]
    fn rejects_empty_filter() {
        assert_eq!(
            build_where_fragment(&FilterRequest::new(), &company_columns()),
            Err(SqlError::NoData)
        );
    }

    #[test]
    fn name_like_binds_pattern_verbatim() {
        let columns = ColumnMap::from_pairs([("nameLike", "name")]);
        let filter = FilterRequest::new().with(FilterKey::NameLike, "%c%");
        let frag = build_where_fragment(&filter, &columns).unwrap();
        assert_eq!(frag.sql, "name ILIKE $1");
        assert_eq!(frag.values, vec![json!("%c%")]);
    }

    #[test]
    fn thresholds_join_with_and_in_request_order() {
        let filter = FilterRequest::new()
            .with(FilterKey::MinEmployees, 0)
            .with(FilterKey::MaxEmployees, 3);
        let frag = build_where_fragment(&filter, &company_columns()).unwrap();
        assert_eq!(frag.sql, "num_employees >= $1 AND num_employees <= $2");
        assert_eq!(frag.values, vec![json!(0), json!(3)]);

        let reversed = FilterRequest::new()
            .with(FilterKey::MaxEmployees, 3)
            .with(FilterKey::MinEmployees, 0);
        let frag = build_where_fragment(&reversed, &company_columns()).unwrap();
        assert_eq!(frag.sql, "num_employees <= $1 AND num_employees >= $2");
        assert_eq!(frag.values, vec![json!(3), json!(0)]);
    }

    #[test]
    fn all_three_company_filters() {
        let filter = FilterRequest::new()
            .with(FilterKey::NameLike, "%net%")
            .with(FilterKey::MinEmployees, 10)
            .with(FilterKey::MaxEmployees, 500);
        let frag = build_where_fragment(&filter, &company_columns()).unwrap();
        assert_eq!(frag.sql, "name ILIKE $1 AND num_employees >= $2 AND num_employees <= $3");
        assert_eq!(frag.values, vec![json!("%net%"), json!(10), json!(500)]);
    }

    #[test]
    fn min_above_max_is_not_checked_here() {
        let filter = FilterRequest::new()
            .with(FilterKey::MinEmployees, 9)
            .with(FilterKey::MaxEmployees, 1);
        assert!(build_where_fragment(&filter, &company_columns()).is_ok());
    }

    #[test]
    fn unmapped_key_uses_key_name_as_column() {
        let filter = FilterRequest::new().with(FilterKey::MinSalary, 1000);
        let frag = build_where_fragment(&filter, &ColumnMap::new()).unwrap();
        assert_eq!(frag.sql, "minSalary >= $1");
    }

    #[test]
    fn prefix_variant() {
        let filter = FilterRequest::new().with(FilterKey::TitleLike, "%eng%");
        let columns = ColumnMap::from_pairs([("titleLike", "title")]);
        let frag = build_where_prefix(&filter, &columns);
        assert_eq!(frag.sql, "WHERE title ILIKE $1");
        assert_eq!(frag.values, vec![json!("%eng%")]);

        let empty = build_where_prefix(&FilterRequest::new(), &columns);
        assert!(empty.is_empty());
        assert!(empty.values.is_empty());
    }

    #[test]
    fn from_map_rejects_unknown_keys() {
        let map = json!({ "nameLike": "%a%", "minEmployees": 2 });
        let filter = FilterRequest::from_map(map.as_object().unwrap()).unwrap();
        assert_eq!(filter.len(), 2);
        assert_eq!(filter.get(FilterKey::MinEmployees), Some(&json!(2)));

        let bad = json!({ "nameLike": "%a%", "color": "red" });
        assert_eq!(
            FilterRequest::from_map(bad.as_object().unwrap()),
            Err(SqlError::UnknownFilter("color".to_string()))
        );
    }

    #[test]
    fn restrict_rejects_keys_of_other_entities() {
        let filter = FilterRequest::new()
            .with(FilterKey::NameLike, "a")
            .with(FilterKey::MinSalary, 5);
        assert_eq!(
            filter.restrict(&[FilterKey::NameLike, FilterKey::MinEmployees]),
            Err(SqlError::UnknownFilter("minSalary".to_string()))
        );
        assert!(filter.restrict(&[FilterKey::NameLike, FilterKey::MinSalary]).is_ok());
    }

    #[test]
    fn integer_accepts_numbers_and_numeric_strings() {
        let filter = FilterRequest::new()
            .with(FilterKey::MinEmployees, "12")
            .with(FilterKey::MaxEmployees, 40)
            .with(FilterKey::MinSalary, "lots");
        assert_eq!(filter.integer(FilterKey::MinEmployees), Ok(Some(12)));
        assert_eq!(filter.integer(FilterKey::MaxEmployees), Ok(Some(40)));
        assert_eq!(filter.integer(FilterKey::TitleLike), Ok(None));
        assert_eq!(
            filter.integer(FilterKey::MinSalary),
            Err(SqlError::InvalidValue("minSalary".to_string()))
        );
    }

    #[test]
    fn every_key_round_trips_through_its_name() {
        for key in FilterKey::ALL {
            assert_eq!(key.as_str().parse::<FilterKey>(), Ok(key));
        }
    }

    #[test]
    fn contains_pattern_wraps_and_escapes() {
        assert_eq!(contains_pattern("net"), "%net%");
        assert_eq!(contains_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
        assert_eq!(contains_pattern(""), "%%");
    }

    #[test]
    fn repeated_calls_are_identical() {
        let filter = FilterRequest::new()
            .with(FilterKey::NameLike, "%a%")
            .with(FilterKey::MaxEmployees, 4);
        assert_eq!(
            build_where_fragment(&filter, &company_columns()),
            build_where_fragment(&filter, &company_columns())
        );
    }
}
