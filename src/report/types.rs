use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::ReportError;

/// Output encodings supported by report generation and scheduled exports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Html,
    Tsv,
    Csv,
    Json,
}

impl ReportFormat {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" => Some(Self::Html),
            "tsv" => Some(Self::Tsv),
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    pub fn parse(s: &str) -> Result<Self, ReportError> {
        Self::from_str(s).ok_or_else(|| ReportError::UnsupportedFormat(s.to_string()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Tsv => "tsv",
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Html => "text/html; charset=utf-8",
            Self::Tsv => "text/tab-separated-values; charset=utf-8",
            Self::Csv => "text/csv; charset=utf-8",
            Self::Json => "application/json",
        }
    }

    pub fn extension(&self) -> &'static str {
        self.as_str()
    }
}

/// Which table a report reads its rows from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Users,
    Clients,
}

impl DataSource {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "users" => Some(Self::Users),
            "clients" => Some(Self::Clients),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Clients => "clients",
        }
    }

    /// Row keys produced for this source (camelCase, as serialized)
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            Self::Users => &[
                "id", "email", "name", "role", "status", "department", "phone",
                "lastLoginAt", "createdAt", "updatedAt",
            ],
            Self::Clients => &[
                "id", "name", "contactName", "contactEmail", "phone", "status", "notes",
                "createdBy", "createdAt", "updatedAt",
            ],
        }
    }

    pub fn ensure_field(&self, field: &str) -> Result<(), ReportError> {
        if self.fields().contains(&field) {
            Ok(())
        } else {
            Err(ReportError::UnknownField {
                field: field.to_string(),
                source_name: self.as_str().to_string(),
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CalculationKind {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    CountDistinct,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationDescriptor {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: CalculationKind,
    /// Omitted for a plain row count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// One computed summary line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryValue {
    pub name: String,
    pub label: String,
    pub value: Value,
}

pub type Row = Map<String, Value>;

/// Serialize records into report rows keyed by their camelCase field names
pub fn rows_from<T: Serialize>(records: &[T]) -> Result<Vec<Row>, ReportError> {
    records
        .iter()
        .map(|record| -> Result<Row, ReportError> {
            match serde_json::to_value(record)? {
                Value::Object(map) => Ok(map),
                other => Ok(Map::from_iter([("value".to_string(), other)])),
            }
        })
        .collect()
}

/// Everything a formatter needs
#[derive(Debug, Clone)]
pub struct ReportDocument {
    pub title: String,
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<Row>,
    pub summary: Vec<SummaryValue>,
}

impl ReportDocument {
    /// Build from loosely-typed JSON. Anything malformed becomes an empty
    /// section instead of an error.
    pub fn from_values(
        title: impl Into<String>,
        rows: &Value,
        columns: &Value,
        calculations: &Value,
    ) -> Self {
        let columns: Vec<ColumnDescriptor> = serde_json::from_value(columns.clone()).unwrap_or_default();
        let calculations: Vec<CalculationDescriptor> =
            serde_json::from_value(calculations.clone()).unwrap_or_default();
        let rows: Vec<Row> = rows
            .as_array()
            .map(|items| items.iter().filter_map(|v| v.as_object().cloned()).collect())
            .unwrap_or_default();
        let summary = super::summary::compute(&rows, &calculations);

        Self {
            title: title.into(),
            generated_at: chrono::Utc::now(),
            columns,
            rows,
            summary,
        }
    }
}

/// Rendered body plus the content type to serve it with
#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub body: String,
    pub content_type: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn calculation_uses_type_key() {
        let calc: CalculationDescriptor =
            serde_json::from_value(json!({"name": "n", "label": "Users", "type": "countDistinct", "field": "role"}))
                .unwrap();
        assert_eq!(calc.kind, CalculationKind::CountDistinct);
        assert_eq!(calc.field.as_deref(), Some("role"));
    }

    #[test]
    fn malformed_document_input_yields_empty_sections() {
        let doc = ReportDocument::from_values("t", &json!("nope"), &json!({"bad": true}), &json!(42));
        assert!(doc.rows.is_empty());
        assert!(doc.columns.is_empty());
        assert!(doc.summary.is_empty());
    }

    #[test]
    fn unknown_field_is_rejected() {
        assert!(DataSource::Users.ensure_field("email").is_ok());
        assert!(matches!(
            DataSource::Clients.ensure_field("role"),
            Err(ReportError::UnknownField { .. })
        ));
    }
}
