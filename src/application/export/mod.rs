//! Flatten a result set into a tabular byte stream or a standalone HTML page.
//!
//! Both paths are pure: the same rows and options always give the same output.

mod columns;
mod markup;

pub use columns::{Column, ReportVariant, columns_for};

use crate::domain::{ComparisonRow, ExportError, RowType};
use serde_json::{Value, json};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub variant: ReportVariant,
    /// Placed between chunk subtexts in flat text cells.
    pub chunk_separator: String,
    pub title: String,
    /// Shown in the HTML header when set.
    pub generated_at: Option<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            variant: ReportVariant::Inferred,
            chunk_separator: String::new(),
            title: "Comparison report".to_string(),
            generated_at: None,
        }
    }
}

/// Header plus one record per row, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabularReport {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TabularReport {
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>, ExportError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.headers)?;
        for record in &self.rows {
            writer.write_record(record)?;
        }
        writer
            .into_inner()
            .map_err(|e| ExportError::Encoding(e.to_string()))
    }
}

pub struct ReportExporter;

impl ReportExporter {
    pub fn tabular(rows: &[ComparisonRow], options: &ExportOptions) -> TabularReport {
        let columns = columns_for(rows, options.variant);
        TabularReport {
            headers: columns.iter().map(|c| c.label().to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| {
                    columns
                        .iter()
                        .map(|c| c.value(row, &options.chunk_separator))
                        .collect()
                })
                .collect(),
        }
    }

    pub fn to_csv(rows: &[ComparisonRow], options: &ExportOptions) -> Result<Vec<u8>, ExportError> {
        Self::tabular(rows, options).to_csv_bytes()
    }

    /// Same columns as [`ReportExporter::tabular`]; text cells keep one
    /// `chunk-{tag}` span per chunk.
    pub fn to_html(rows: &[ComparisonRow], options: &ExportOptions) -> Result<String, ExportError> {
        let columns = columns_for(rows, options.variant);
        let rendered_rows: Vec<Value> = rows
            .iter()
            .map(|row| {
                let cells: Vec<Value> = columns
                    .iter()
                    .map(|column| match column.text(row) {
                        Some(text) => json!({ "chunks": text.runs(), "value": "" }),
                        None => json!({ "chunks": [], "value": column.value(row, "") }),
                    })
                    .collect();
                json!({ "row_type": row.row_type.to_string(), "cells": cells })
            })
            .collect();

        let ctx = json!({
            "title": options.title,
            "generated_at": options.generated_at,
            "summary": Self::summary_line(rows),
            "columns": columns.iter().map(|c| c.label()).collect::<Vec<_>>(),
            "rows": rendered_rows,
        });
        let html = markup::render("report", &ctx)?;
        log::debug!("Rendered HTML report with {} rows", rows.len());
        Ok(html)
    }

    fn summary_line(rows: &[ComparisonRow]) -> String {
        let parts: Vec<String> = RowType::ALL
            .iter()
            .filter_map(|t| {
                let n = rows.iter().filter(|r| r.row_type == *t).count();
                (n > 0).then(|| format!("{n} {t}"))
            })
            .collect();
        if parts.is_empty() {
            "No rows".to_string()
        } else {
            format!("{} rows: {}", rows.len(), parts.join(", "))
        }
    }
}
