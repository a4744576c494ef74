use std::collections::HashMap;

use serde_json::{Map, Value};

/// Logical field name -> storage column name. Unmapped fields are used as-is.
#[derive(Debug, Clone, Default)]
pub struct ColumnMap(HashMap<String, String>);

impl ColumnMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub fn resolve<'a>(&'a self, field: &'a str) -> &'a str {
        self.0.get(field).map(String::as_str).unwrap_or(field)
    }
}

/// Ordered field -> new value pairs for a partial update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateRequest {
    entries: Vec<(String, Value)>,
}

impl UpdateRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`UpdateRequest::push`].
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(field, value);
        self
    }

    /// Appends a field, or replaces the value in place if the field is already present.
    pub fn push(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == field) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((field, value)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl From<Map<String, Value>> for UpdateRequest {
    fn from(map: Map<String, Value>) -> Self {
        map.into_iter().collect()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for UpdateRequest {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut request = Self::new();
        for (field, value) in iter {
            request.push(field, value);
        }
        request
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// Case-insensitive pattern match. The bound value is the full pattern.
    Contains,
    AtLeast,
    AtMost,
}

impl Comparison {
    pub fn operator(self) -> &'static str {
        match self {
            Comparison::Contains => "ILIKE",
            Comparison::AtLeast => ">=",
            Comparison::AtMost => "<=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClauseTemplate {
    /// `"column"=$n`
    Assign,
    /// `column OP $n`
    Compare(Comparison),
}

impl ClauseTemplate {
    fn render(self, column: &str, position: usize) -> String {
        match self {
            ClauseTemplate::Assign => format!("\"{}\"=${}", column, position),
            ClauseTemplate::Compare(cmp) => format!("{} {} ${}", column, cmp.operator(), position),
        }
    }
}

/// A single clause carried together with the value it binds.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundClause {
    pub column: String,
    pub template: ClauseTemplate,
    pub value: Value,
}

impl BoundClause {
    pub fn new(column: impl Into<String>, template: ClauseTemplate, value: Value) -> Self {
        Self {
            column: column.into(),
            template,
            value,
        }
    }
}

/// Clause text plus the positional values its placeholders refer to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlFragment {
    pub sql: String,
    pub values: Vec<Value>,
}

impl SqlFragment {
    /// Numbers placeholders by position and splits the clauses into text and values.
    /// This is the only place placeholder indices are assigned.
    pub fn from_clauses(clauses: Vec<BoundClause>, separator: &str) -> Self {
        let mut parts = Vec::with_capacity(clauses.len());
        let mut values = Vec::with_capacity(clauses.len());
        for (idx, clause) in clauses.into_iter().enumerate() {
            parts.push(clause.template.render(&clause.column, idx + 1));
            values.push(clause.value);
        }
        Self {
            sql: parts.join(separator),
            values,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// Placeholder for a parameter appended after this fragment's values.
    pub fn next_placeholder(&self) -> String {
        format!("${}", self.values.len() + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn column_map_falls_back_to_field_name() {
        let map = ColumnMap::from_pairs([("logoUrl", "logo_url")]);
        assert_eq!(map.resolve("logoUrl"), "logo_url");
        assert_eq!(map.resolve("name"), "name");
    }

    #[test]
    fn update_request_keeps_insertion_order_and_replaces_duplicates() {
        let mut req = UpdateRequest::new().set("b", 1).set("a", 2);
        req.push("b", 3);
        let entries: Vec<_> = req.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        assert_eq!(entries, vec![("b".to_string(), json!(3)), ("a".to_string(), json!(2))]);
    }

    #[test]
    fn update_request_from_json_object_keeps_body_order() {
        let body = json!({ "firstName": "Alice", "age": 32, "email": "a@b.co" });
        let req = UpdateRequest::from(body.as_object().cloned().unwrap());
        let fields: Vec<&str> = req.iter().map(|(k, _)| k).collect();
        assert_eq!(fields, vec!["firstName", "age", "email"]);
    }

    #[test]
    fn next_placeholder_follows_values() {
        let frag = SqlFragment::from_clauses(
            vec![
                BoundClause::new("name", ClauseTemplate::Assign, json!("x")),
                BoundClause::new("age", ClauseTemplate::Assign, json!(3)),
            ],
            ", ",
        );
        assert_eq!(frag.next_placeholder(), "$3");
        assert!(SqlFragment::default().is_empty());
    }
}
