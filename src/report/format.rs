use serde_json::{json, Map, Value};

use super::error::ReportError;
use super::types::{ReportDocument, ReportFormat, RenderedReport, Row};

/// Render a report document in the requested format
pub fn render(format: ReportFormat, doc: &ReportDocument) -> Result<RenderedReport, ReportError> {
    let body = match format {
        ReportFormat::Html => render_html(doc),
        ReportFormat::Tsv => render_tsv(doc),
        ReportFormat::Csv => render_csv(doc),
        ReportFormat::Json => render_json(doc)?,
    };

    Ok(RenderedReport {
        body,
        content_type: format.content_type(),
    })
}

/// Plain-text form of a cell; missing and null cells are empty
pub fn cell_text(row: &Row, field: &str) -> String {
    value_text(row.get(field).unwrap_or(&Value::Null))
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Every field is quoted; embedded quotes are doubled
pub fn quote_csv(raw: &str) -> String {
    format!("\"{}\"", raw.replace('"', "\"\""))
}

fn clean_tsv(raw: &str) -> String {
    raw.replace(['\t', '\r', '\n'], " ")
}

fn render_html(doc: &ReportDocument) -> String {
    let title = escape_html(&doc.title);
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{}</title>\n", title));
    html.push_str("<style>table{border-collapse:collapse}th,td{border:1px solid #ccc;padding:4px 8px;text-align:left}</style>\n");
    html.push_str("</head>\n<body>\n");
    html.push_str(&format!("<h1>{}</h1>\n", title));
    html.push_str(&format!(
        "<p>Generated {}</p>\n",
        escape_html(&doc.generated_at.to_rfc3339())
    ));

    html.push_str("<table class=\"report\">\n<thead><tr>");
    for column in &doc.columns {
        html.push_str(&format!("<th>{}</th>", escape_html(&column.label)));
    }
    html.push_str("</tr></thead>\n<tbody>\n");
    for row in &doc.rows {
        html.push_str("<tr>");
        for column in &doc.columns {
            html.push_str(&format!("<td>{}</td>", escape_html(&cell_text(row, &column.name))));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table>\n");

    if !doc.summary.is_empty() {
        html.push_str("<h2>Summary</h2>\n<table class=\"summary\">\n<tbody>\n");
        for item in &doc.summary {
            html.push_str(&format!(
                "<tr><th>{}</th><td>{}</td></tr>\n",
                escape_html(&item.label),
                escape_html(&value_text(&item.value))
            ));
        }
        html.push_str("</tbody>\n</table>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn render_tsv(doc: &ReportDocument) -> String {
    let mut lines = Vec::with_capacity(doc.rows.len() + doc.summary.len() + 2);

    lines.push(
        doc.columns
            .iter()
            .map(|c| clean_tsv(&c.label))
            .collect::<Vec<_>>()
            .join("\t"),
    );
    for row in &doc.rows {
        lines.push(
            doc.columns
                .iter()
                .map(|c| clean_tsv(&cell_text(row, &c.name)))
                .collect::<Vec<_>>()
                .join("\t"),
        );
    }

    if !doc.summary.is_empty() {
        lines.push(String::new());
        for item in &doc.summary {
            lines.push(format!("{}\t{}", clean_tsv(&item.label), clean_tsv(&value_text(&item.value))));
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn render_csv(doc: &ReportDocument) -> String {
    let mut lines = Vec::with_capacity(doc.rows.len() + doc.summary.len() + 2);

    lines.push(
        doc.columns
            .iter()
            .map(|c| quote_csv(&c.label))
            .collect::<Vec<_>>()
            .join(","),
    );
    for row in &doc.rows {
        lines.push(
            doc.columns
                .iter()
                .map(|c| quote_csv(&cell_text(row, &c.name)))
                .collect::<Vec<_>>()
                .join(","),
        );
    }

    if !doc.summary.is_empty() {
        lines.push(String::new());
        for item in &doc.summary {
            lines.push(format!("{},{}", quote_csv(&item.label), quote_csv(&value_text(&item.value))));
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn render_json(doc: &ReportDocument) -> Result<String, ReportError> {
    let rows: Vec<Value> = doc
        .rows
        .iter()
        .map(|row| {
            let projected: Map<String, Value> = doc
                .columns
                .iter()
                .map(|c| (c.name.clone(), row.get(&c.name).cloned().unwrap_or(Value::Null)))
                .collect();
            Value::Object(projected)
        })
        .collect();

    let summary: Map<String, Value> = doc
        .summary
        .iter()
        .map(|s| (s.name.clone(), s.value.clone()))
        .collect();

    let body = json!({
        "report": doc.title,
        "generatedAt": doc.generated_at.to_rfc3339(),
        "columns": doc.columns,
        "summary": summary,
        "rows": rows,
    });

    Ok(serde_json::to_string_pretty(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> ReportDocument {
        let rows = json!([
            {"name": "Ada \"The Countess\" Lovelace", "email": "ada@example.com", "role": "ADMIN"},
            {"name": "Bob\tTab", "email": "bob@example.com"},
        ]);
        let columns = json!([
            {"name": "name", "label": "Name"},
            {"name": "email", "label": "Email"},
            {"name": "role", "label": "Role"},
        ]);
        let calculations = json!([{"name": "total", "label": "Total users", "type": "count"}]);
        ReportDocument::from_values("Users <all>", &rows, &columns, &calculations)
    }

    #[test]
    fn csv_quotes_every_field_and_doubles_quotes() {
        let out = render(ReportFormat::Csv, &doc()).unwrap();
        let lines: Vec<&str> = out.body.lines().collect();
        assert_eq!(lines[0], "\"Name\",\"Email\",\"Role\"");
        assert_eq!(
            lines[1],
            "\"Ada \"\"The Countess\"\" Lovelace\",\"ada@example.com\",\"ADMIN\""
        );
        // Missing cells are empty but still quoted
        assert_eq!(lines[2], "\"Bob\tTab\",\"bob@example.com\",\"\"");
        assert_eq!(lines[4], "\"Total users\",\"2\"");
        assert_eq!(out.content_type, "text/csv; charset=utf-8");
    }

    #[test]
    fn tsv_flattens_tabs() {
        let out = render(ReportFormat::Tsv, &doc()).unwrap();
        let lines: Vec<&str> = out.body.lines().collect();
        assert_eq!(lines[0], "Name\tEmail\tRole");
        assert_eq!(lines[2], "Bob Tab\tbob@example.com\t");
    }

    #[test]
    fn html_escapes_content() {
        let out = render(ReportFormat::Html, &doc()).unwrap();
        assert!(out.body.contains("<title>Users &lt;all&gt;</title>"));
        assert!(out.body.contains("<td>Ada &quot;The Countess&quot; Lovelace</td>"));
        assert!(out.body.contains("<th>Total users</th><td>2</td>"));
    }

    #[test]
    fn json_projects_columns_and_summary() {
        let out = render(ReportFormat::Json, &doc()).unwrap();
        let parsed: Value = serde_json::from_str(&out.body).unwrap();
        assert_eq!(parsed["report"], "Users <all>");
        assert_eq!(parsed["summary"]["total"], 2);
        assert_eq!(parsed["rows"][1]["role"], Value::Null);
        assert!(out.body.contains("\n  "), "expected pretty-printed output");
    }

    #[test]
    fn empty_columns_render_empty_sections() {
        let doc = ReportDocument {
            title: "Empty".into(),
            generated_at: chrono::Utc::now(),
            columns: vec![],
            rows: vec![],
            summary: vec![],
        };
        assert_eq!(render(ReportFormat::Csv, &doc).unwrap().body, "\n");
    }
}
