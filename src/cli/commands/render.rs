use anyhow::Context;
use clap::Args;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::cli::{utils::output_success, OutputFormat};
use crate::report::{
    filter, render, summary, CalculationDescriptor, RenderedReport, ReportDocument, ReportFilter, ReportFormat,
};

#[derive(Debug, Args)]
pub struct RenderArgs {
    #[arg(long, help = "Output format: html, tsv, csv or json")]
    pub format: String,

    #[arg(long, help = "JSON array of row objects")]
    pub rows: PathBuf,

    #[arg(long, help = "JSON array of {name, label} column descriptors")]
    pub columns: PathBuf,

    #[arg(long, help = "JSON array of calculation descriptors")]
    pub calculations: Option<PathBuf>,

    #[arg(long, help = "JSON array of row filters")]
    pub filters: Option<PathBuf>,

    #[arg(long, default_value = "Report", help = "Report title")]
    pub title: String,
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not valid JSON", path.display()))
}

pub fn handle(args: RenderArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let format = ReportFormat::parse(&args.format)?;
    let rows = read_json(&args.rows)?;
    let columns = read_json(&args.columns)?;
    let calculations = match &args.calculations {
        Some(path) => read_json(path)?,
        None => Value::Array(vec![]),
    };

    // Malformed descriptors degrade to empty sections
    let mut doc = ReportDocument::from_values(args.title, &rows, &columns, &Value::Array(vec![]));

    if let Some(path) = &args.filters {
        let filters: Vec<ReportFilter> =
            serde_json::from_value(read_json(path)?).context("filters must be an array of {field, operator, value}")?;
        doc.rows = filter::apply(doc.rows, &filters);
    }

    let calculations: Vec<CalculationDescriptor> = serde_json::from_value(calculations).unwrap_or_default();
    doc.summary = summary::compute(&doc.rows, &calculations);

    let rendered = render(format, &doc)?;
    match output_format {
        OutputFormat::Text => {
            print!("{}", rendered.body);
            Ok(())
        }
        OutputFormat::Json => output_success(
            output_format,
            "Report rendered",
            Some(json_fields(format, doc.rows.len(), &rendered)),
        ),
    }
}

/// Fields merged into the `--json` envelope
fn json_fields(format: ReportFormat, row_count: usize, rendered: &RenderedReport) -> Map<String, Value> {
    let mut data = Map::new();
    data.insert("format".to_string(), Value::from(format.as_str()));
    data.insert("contentType".to_string(), Value::from(rendered.content_type));
    data.insert("rowCount".to_string(), Value::from(row_count));
    data.insert("body".to_string(), Value::from(rendered.body.clone()));
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_output_carries_body_and_metadata() {
        let rendered = RenderedReport {
            body: "\"Email\"\n\"a@example.com\"\n".to_string(),
            content_type: ReportFormat::Csv.content_type(),
        };
        let data = json_fields(ReportFormat::Csv, 1, &rendered);
        assert_eq!(data["format"], "csv");
        assert_eq!(data["contentType"], "text/csv; charset=utf-8");
        assert_eq!(data["rowCount"], 1);
        assert_eq!(data["body"], rendered.body.as_str());
    }
}
