use serde_json::{json, Number, Value};
use std::collections::HashSet;

use super::types::{CalculationDescriptor, CalculationKind, Row, SummaryValue};

/// Evaluate every calculation over the given rows
pub fn compute(rows: &[Row], calculations: &[CalculationDescriptor]) -> Vec<SummaryValue> {
    calculations
        .iter()
        .map(|calc| SummaryValue {
            name: calc.name.clone(),
            label: calc.label.clone(),
            value: evaluate(rows, calc),
        })
        .collect()
}

fn evaluate(rows: &[Row], calc: &CalculationDescriptor) -> Value {
    let field = calc.field.as_deref();

    match calc.kind {
        CalculationKind::Count => match field {
            None => json!(rows.len()),
            Some(f) => json!(cells(rows, f).filter(|v| !v.is_null()).count()),
        },
        CalculationKind::CountDistinct => {
            let Some(f) = field else { return json!(rows.len()) };
            let distinct: HashSet<String> = cells(rows, f)
                .filter(|v| !v.is_null())
                .map(|v| v.to_string())
                .collect();
            json!(distinct.len())
        }
        CalculationKind::Sum | CalculationKind::Avg | CalculationKind::Min | CalculationKind::Max => {
            let Some(f) = field else { return Value::Null };
            let values: Vec<f64> = cells(rows, f).filter_map(numeric).collect();
            if values.is_empty() {
                return Value::Null;
            }
            let result = match calc.kind {
                CalculationKind::Sum => values.iter().sum::<f64>(),
                CalculationKind::Avg => values.iter().sum::<f64>() / values.len() as f64,
                CalculationKind::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
                _ => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            };
            Number::from_f64(result).map(Value::Number).unwrap_or(Value::Null)
        }
    }
}

fn cells<'a>(rows: &'a [Row], field: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
    rows.iter().map(move |r| r.get(field).unwrap_or(&Value::Null))
}

/// Numbers, and strings that parse as numbers
fn numeric(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
