//! Query description for the document store
//!
//! Mirrors what the hosted document database accepts: equality filters on
//! body fields, an id IN-filter of at most [`MAX_IN_FILTER`] ids, and
//! ordering on one or more fields.

use rusqlite::types::Value as SqlValue;
use serde_json::Value;

use crate::error::{StoreError, StoreResult};
use crate::types::Collection;

/// Largest id list a single IN-filter may carry
pub const MAX_IN_FILTER: usize = 10;

/// Sort direction for an ordered field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn as_sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// A single filter clause
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Body field equals a scalar value
    Eq(String, Value),
    /// Document id is one of the listed ids
    IdIn(Vec<String>),
}

/// Filters and ordering for a collection read
#[derive(Debug, Clone, Default)]
pub struct Query {
    filters: Vec<Filter>,
    order: Vec<(String, Direction)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep documents whose `field` equals `value`
    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(field.to_string(), value.into()));
        self
    }

    /// Keep documents whose id is in `ids`
    pub fn id_in<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters
            .push(Filter::IdIn(ids.into_iter().map(Into::into).collect()));
        self
    }

    /// Order by `field`; later calls break ties of earlier ones
    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order.push((field.to_string(), direction));
        self
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Render the query as SQL plus its positional parameters
    pub(crate) fn to_sql(&self, collection: Collection) -> StoreResult<(String, Vec<SqlValue>)> {
        let mut sql = String::from("SELECT id, data FROM documents WHERE collection = ?");
        let mut params = vec![SqlValue::Text(collection.as_str().to_string())];

        for filter in &self.filters {
            match filter {
                Filter::Eq(field, value) => {
                    let path = field_path(field)?;
                    match value {
                        Value::Null => {
                            sql.push_str(&format!(" AND json_extract(data, '{}') IS NULL", path));
                        }
                        other => {
                            sql.push_str(&format!(" AND json_extract(data, '{}') = ?", path));
                            params.push(to_sql_value(field, other)?);
                        }
                    }
                }
                Filter::IdIn(ids) => {
                    if ids.is_empty() {
                        return Err(StoreError::InvalidQuery(
                            "IN filter requires at least one id".to_string(),
                        ));
                    }
                    if ids.len() > MAX_IN_FILTER {
                        return Err(StoreError::InvalidQuery(format!(
                            "IN filter accepts at most {} ids, got {}",
                            MAX_IN_FILTER,
                            ids.len()
                        )));
                    }
                    let placeholders = vec!["?"; ids.len()].join(", ");
                    sql.push_str(&format!(" AND id IN ({})", placeholders));
                    params.extend(ids.iter().map(|id| SqlValue::Text(id.clone())));
                }
            }
        }

        sql.push_str(" ORDER BY ");
        for (field, direction) in &self.order {
            let path = field_path(field)?;
            sql.push_str(&format!(
                "json_extract(data, '{}') {}, ",
                path,
                direction.as_sql()
            ));
        }
        // Insertion order breaks any remaining ties
        sql.push_str("rowid ASC");

        Ok((sql, params))
    }
}

/// Build a JSON path for a body field, rejecting anything but `[A-Za-z0-9_]`
pub(crate) fn field_path(field: &str) -> StoreResult<String> {
    let valid = !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(StoreError::InvalidQuery(format!(
            "invalid field name '{}'",
            field
        )));
    }
    Ok(format!("$.{}", field))
}

fn to_sql_value(field: &str, value: &Value) -> StoreResult<SqlValue> {
    match value {
        Value::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(SqlValue::Integer(i))
            } else if let Some(f) = n.as_f64() {
                Ok(SqlValue::Real(f))
            } else {
                Err(StoreError::InvalidQuery(format!(
                    "number out of range for '{}'",
                    field
                )))
            }
        }
        Value::String(s) => Ok(SqlValue::Text(s.clone())),
        Value::Null | Value::Array(_) | Value::Object(_) => Err(StoreError::InvalidQuery(
            format!("'{}' can only be compared against a scalar", field),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_query_orders_by_insertion() {
        let (sql, params) = Query::new().to_sql(Collection::Notes).unwrap();
        assert!(sql.ends_with("ORDER BY rowid ASC"));
        assert_eq!(params, vec![SqlValue::Text("notes".to_string())]);
    }

    #[test]
    fn test_eq_filters_bind_scalars() {
        let (sql, params) = Query::new()
            .eq("isPublished", true)
            .eq("year", 2)
            .eq("branch", "cse")
            .to_sql(Collection::Subjects)
            .unwrap();
        assert!(sql.contains("json_extract(data, '$.isPublished') = ?"));
        assert_eq!(params[1], SqlValue::Integer(1));
        assert_eq!(params[2], SqlValue::Integer(2));
        assert_eq!(params[3], SqlValue::Text("cse".to_string()));
    }

    #[test]
    fn test_multi_field_order() {
        let (sql, _) = Query::new()
            .order_by("downloads", Direction::Desc)
            .order_by("views", Direction::Desc)
            .to_sql(Collection::Notes)
            .unwrap();
        assert!(sql.contains(
            "ORDER BY json_extract(data, '$.downloads') DESC, json_extract(data, '$.views') DESC, rowid ASC"
        ));
    }

    #[test]
    fn test_empty_in_filter_is_rejected() {
        let err = Query::new()
            .id_in(Vec::<String>::new())
            .to_sql(Collection::Branches)
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidQuery(_)));
    }

    #[test]
    fn test_oversized_in_filter_is_rejected() {
        let ids: Vec<String> = (0..=MAX_IN_FILTER).map(|i| format!("id{}", i)).collect();
        let err = Query::new()
            .id_in(ids)
            .to_sql(Collection::Subjects)
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidQuery(_)));
    }

    #[test]
    fn test_in_filter_at_limit_is_accepted() {
        let ids: Vec<String> = (0..MAX_IN_FILTER).map(|i| format!("id{}", i)).collect();
        let (sql, params) = Query::new().id_in(ids).to_sql(Collection::Subjects).unwrap();
        assert!(sql.contains("id IN (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"));
        assert_eq!(params.len(), MAX_IN_FILTER + 1);
    }

    #[test]
    fn test_field_names_are_restricted() {
        assert!(field_path("subjectId").is_ok());
        assert!(field_path("").is_err());
        assert!(field_path("x') OR 1=1 --").is_err());
        assert!(field_path("a.b").is_err());
    }

    #[test]
    fn test_null_eq_uses_is_null() {
        let (sql, params) = Query::new()
            .eq("code", Value::Null)
            .to_sql(Collection::Subjects)
            .unwrap();
        assert!(sql.contains("json_extract(data, '$.code') IS NULL"));
        assert_eq!(params.len(), 1);
    }
}
