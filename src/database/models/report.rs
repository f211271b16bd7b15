use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

use crate::report::{CalculationDescriptor, ColumnDescriptor, DataSource, ReportFilter};

/// Saved report definition
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub created_by: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[sqlx(rename = "data_source")]
    #[serde(rename = "dataSource")]
    pub data_source_str: String,
    pub columns: Json<Vec<ColumnDescriptor>>,
    pub calculations: Json<Vec<CalculationDescriptor>>,
    pub filters: Json<Vec<ReportFilter>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Report {
    pub fn data_source(&self) -> Option<DataSource> {
        DataSource::from_str(&self.data_source_str)
    }
}

#[derive(Debug, Clone)]
pub struct CreateReport {
    pub name: String,
    pub description: Option<String>,
    pub data_source: DataSource,
    pub columns: Vec<ColumnDescriptor>,
    pub calculations: Vec<CalculationDescriptor>,
    pub filters: Vec<ReportFilter>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateReport {
    pub name: Option<String>,
    pub description: Option<String>,
    pub columns: Option<Vec<ColumnDescriptor>>,
    pub calculations: Option<Vec<CalculationDescriptor>>,
    pub filters: Option<Vec<ReportFilter>>,
}

impl UpdateReport {
    pub fn has_changes(&self) -> bool {
        self.name.is_some()
            || self.description.is_some()
            || self.columns.is_some()
            || self.calculations.is_some()
            || self.filters.is_some()
    }
}

/// Outcome of one generation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Audit record of a report generation
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReportExecution {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub report_id: Uuid,
    pub executed_by: Uuid,
    pub format: String,
    pub status: String,
    pub row_count: Option<i64>,
    pub content_sha256: Option<String>,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}
