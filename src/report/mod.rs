// Report generation: row filtering, summary calculations and rendering.
//
// Everything here is pure and works on rows already loaded from the store;
// handlers/protected/reports drives it and records executions.

pub mod definition;
pub mod error;
pub mod filter;
pub mod format;
pub mod summary;
pub mod types;

pub use definition::validate_definition;
pub use error::ReportError;
pub use filter::{FilterOperator, ReportFilter};
pub use format::render;
pub use types::{
    CalculationDescriptor, CalculationKind, ColumnDescriptor, DataSource, RenderedReport, ReportDocument,
    ReportFormat, Row, SummaryValue, rows_from,
};
