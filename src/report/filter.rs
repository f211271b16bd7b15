use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

use super::error::ReportError;
use super::types::{DataSource, Row};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    Eq,
    Ne,
    Contains,
    StartsWith,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    IsEmpty,
    IsNotEmpty,
}

/// A single row predicate; a list of them is combined with AND
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportFilter {
    pub field: String,
    pub operator: FilterOperator,
    #[serde(default)]
    pub value: Value,
}

impl ReportFilter {
    pub fn validate(&self, source: DataSource) -> Result<(), ReportError> {
        source.ensure_field(&self.field)?;
        match self.operator {
            FilterOperator::In if !self.value.is_array() => Err(ReportError::InvalidFilter(format!(
                "'in' on '{}' needs an array value",
                self.field
            ))),
            FilterOperator::IsEmpty | FilterOperator::IsNotEmpty => Ok(()),
            _ if self.value.is_null() => Err(ReportError::InvalidFilter(format!(
                "operator on '{}' needs a value",
                self.field
            ))),
            _ => Ok(()),
        }
    }

    pub fn matches(&self, row: &Row) -> bool {
        let cell = row.get(&self.field).unwrap_or(&Value::Null);
        match self.operator {
            FilterOperator::Eq => loosely_equal(cell, &self.value),
            FilterOperator::Ne => !loosely_equal(cell, &self.value),
            FilterOperator::Contains => text(cell)
                .to_lowercase()
                .contains(&text(&self.value).to_lowercase()),
            FilterOperator::StartsWith => text(cell)
                .to_lowercase()
                .starts_with(&text(&self.value).to_lowercase()),
            FilterOperator::Gt => compare(cell, &self.value) == Some(Ordering::Greater),
            FilterOperator::Gte => matches!(compare(cell, &self.value), Some(Ordering::Greater | Ordering::Equal)),
            FilterOperator::Lt => compare(cell, &self.value) == Some(Ordering::Less),
            FilterOperator::Lte => matches!(compare(cell, &self.value), Some(Ordering::Less | Ordering::Equal)),
            FilterOperator::In => self
                .value
                .as_array()
                .map(|options| options.iter().any(|o| loosely_equal(cell, o)))
                .unwrap_or(false),
            FilterOperator::IsEmpty => is_empty(cell),
            FilterOperator::IsNotEmpty => !is_empty(cell),
        }
    }
}

/// Rows satisfying every filter
pub fn apply(rows: Vec<Row>, filters: &[ReportFilter]) -> Vec<Row> {
    if filters.is_empty() {
        return rows;
    }
    rows.into_iter()
        .filter(|row| filters.iter().all(|f| f.matches(row)))
        .collect()
}

fn text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_empty(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}

fn loosely_equal(cell: &Value, expected: &Value) -> bool {
    match (cell, expected) {
        (Value::String(a), Value::String(b)) => a.eq_ignore_ascii_case(b),
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::Number(a), Value::String(b)) | (Value::String(b), Value::Number(a)) => {
            b.trim().parse::<f64>().ok() == a.as_f64()
        }
        _ => cell == expected,
    }
}

/// Numeric when both sides are numbers, otherwise lexical (which orders
/// RFC 3339 timestamps chronologically)
fn compare(cell: &Value, bound: &Value) -> Option<Ordering> {
    if cell.is_null() {
        return None;
    }
    match (number(cell), number(bound)) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => Some(text(cell).cmp(&text(bound))),
    }
}

fn number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(v: Value) -> Row {
        v.as_object().cloned().unwrap()
    }

    fn filter(field: &str, operator: FilterOperator, value: Value) -> ReportFilter {
        ReportFilter { field: field.into(), operator, value }
    }

    #[test]
    fn filters_combine_with_and() {
        let rows = vec![
            row(json!({"role": "ADMIN", "status": "active"})),
            row(json!({"role": "ADMIN", "status": "inactive"})),
            row(json!({"role": "USER", "status": "active"})),
        ];
        let out = apply(
            rows,
            &[
                filter("role", FilterOperator::Eq, json!("admin")),
                filter("status", FilterOperator::Eq, json!("active")),
            ],
        );
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn contains_is_case_insensitive() {
        let r = row(json!({"email": "Alice@Example.com"}));
        assert!(filter("email", FilterOperator::Contains, json!("example")).matches(&r));
        assert!(filter("email", FilterOperator::StartsWith, json!("alice")).matches(&r));
    }

    #[test]
    fn comparisons_handle_numbers_and_timestamps() {
        let r = row(json!({"score": 10, "createdAt": "2026-02-01T00:00:00Z"}));
        assert!(filter("score", FilterOperator::Gt, json!(9.5)).matches(&r));
        assert!(!filter("score", FilterOperator::Lt, json!(10)).matches(&r));
        assert!(filter("score", FilterOperator::Lte, json!(10)).matches(&r));
        assert!(filter("createdAt", FilterOperator::Gte, json!("2026-01-15T00:00:00Z")).matches(&r));
    }

    #[test]
    fn missing_field_never_compares() {
        let r = row(json!({}));
        assert!(!filter("score", FilterOperator::Gt, json!(0)).matches(&r));
        assert!(filter("phone", FilterOperator::IsEmpty, Value::Null).matches(&r));
    }

    #[test]
    fn in_requires_array() {
        let bad = filter("role", FilterOperator::In, json!("ADMIN"));
        assert!(bad.validate(DataSource::Users).is_err());
        let good = filter("role", FilterOperator::In, json!(["ADMIN", "MANAGER"]));
        assert!(good.validate(DataSource::Users).is_ok());
        assert!(good.matches(&row(json!({"role": "MANAGER"}))));
    }
}
