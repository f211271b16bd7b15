use super::error::ReportError;
use super::filter::ReportFilter;
use super::types::{CalculationDescriptor, ColumnDescriptor, DataSource};

/// Check a saved report definition against its data source: at least one
/// column, and every referenced field must exist on the source.
pub fn validate_definition(
    source: DataSource,
    columns: &[ColumnDescriptor],
    calculations: &[CalculationDescriptor],
    filters: &[ReportFilter],
) -> Result<(), ReportError> {
    if columns.is_empty() {
        return Err(ReportError::EmptyColumns);
    }
    for column in columns {
        source.ensure_field(&column.name)?;
    }
    for calculation in calculations {
        if let Some(field) = &calculation.field {
            source.ensure_field(field)?;
        }
    }
    for filter in filters {
        filter.validate(source)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{CalculationKind, FilterOperator};
    use serde_json::json;

    fn column(name: &str) -> ColumnDescriptor {
        ColumnDescriptor {
            name: name.into(),
            label: name.to_uppercase(),
        }
    }

    #[test]
    fn requires_columns() {
        assert!(matches!(
            validate_definition(DataSource::Users, &[], &[], &[]),
            Err(ReportError::EmptyColumns)
        ));
    }

    #[test]
    fn rejects_unknown_column_for_source() {
        let err = validate_definition(DataSource::Clients, &[column("email")], &[], &[]).unwrap_err();
        assert!(matches!(err, ReportError::UnknownField { .. }));
        assert!(validate_definition(DataSource::Users, &[column("email")], &[], &[]).is_ok());
    }

    #[test]
    fn checks_calculation_and_filter_fields() {
        let calc = CalculationDescriptor {
            name: "distinct".into(),
            label: "Departments".into(),
            kind: CalculationKind::CountDistinct,
            field: Some("department".into()),
        };
        let bad_filter = ReportFilter {
            field: "salary".into(),
            operator: FilterOperator::Gt,
            value: json!(10),
        };
        assert!(validate_definition(DataSource::Users, &[column("name")], &[calc.clone()], &[]).is_ok());
        assert!(validate_definition(DataSource::Users, &[column("name")], &[calc], &[bad_filter]).is_err());
    }
}
