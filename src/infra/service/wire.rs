//! Wire shapes of the comparison service and their conversion into domain types.
//!
//! The loosely typed row payload is resolved here, once; nothing downstream
//! inspects the raw shape again.

use crate::domain::{
    CompareParams, ComparisonRow, DocumentSide, Heading, RowType, SegmentText, TaskPhase,
    TaskSnapshot, TextChunk,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskIdResponse {
    pub task_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressResponse {
    pub progress: i64,
    pub status: String,
}

impl ProgressResponse {
    pub fn into_snapshot(self) -> Result<TaskSnapshot, String> {
        let phase = TaskPhase::from_str(&self.status)?;
        Ok(TaskSnapshot::new(phase, self.progress, self.status))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareResponse {
    pub comparison: Vec<WireRow>,
}

/// `{"detail": ...}` body the service attaches to 4xx answers.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub detail: Value,
}

impl ErrorBody {
    pub fn message(&self) -> String {
        match &self.detail {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Text of one side as sent by the service: a chunk list or a plain string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireText {
    Chunks(Vec<TextChunk>),
    Plain(String),
}

/// One row as sent by the service. Empty strings stand for absent values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireRow {
    #[serde(rename = "type")]
    pub row_type: String,
    #[serde(default)]
    pub ratio: Value,
    #[serde(default)]
    pub text_left_id: Value,
    #[serde(default)]
    pub text_right_id: Value,
    #[serde(default)]
    pub text_left: Option<String>,
    #[serde(default)]
    pub text_right: Option<String>,
    #[serde(default)]
    pub text_left_report: Option<WireText>,
    #[serde(default)]
    pub text_right_report: Option<WireText>,
    #[serde(default)]
    pub heading_number_left: Value,
    #[serde(default)]
    pub heading_text_left: Value,
    #[serde(default)]
    pub heading_number_right: Value,
    #[serde(default)]
    pub heading_text_right: Value,
    #[serde(default)]
    pub page_number_left: Value,
    #[serde(default)]
    pub page_number_right: Value,
}

impl TryFrom<WireRow> for ComparisonRow {
    type Error = String;

    fn try_from(row: WireRow) -> Result<Self, Self::Error> {
        let row_type = RowType::from_str(&row.row_type)?;
        let similarity_ratio = match &row.ratio {
            Value::Number(n) => n.as_f64().unwrap_or(0.0).clamp(0.0, 1.0),
            Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0).clamp(0.0, 1.0),
            _ => 0.0,
        };
        Ok(ComparisonRow {
            row_type,
            similarity_ratio,
            left_text: resolve_text(row.text_left_report, row.text_left),
            right_text: resolve_text(row.text_right_report, row.text_right),
            left_identifier: scalar_text(&row.text_left_id),
            right_identifier: scalar_text(&row.text_right_id),
            left_heading: heading(&row.heading_number_left, &row.heading_text_left),
            right_heading: heading(&row.heading_number_right, &row.heading_text_right),
            left_page: page_number(&row.page_number_left),
            right_page: page_number(&row.page_number_right),
        })
    }
}

/// Convert a received row list, keeping the service's order.
pub fn rows_from_wire(rows: Vec<WireRow>) -> Result<Vec<ComparisonRow>, String> {
    rows.into_iter().map(ComparisonRow::try_from).collect()
}

fn resolve_text(report: Option<WireText>, plain: Option<String>) -> SegmentText {
    match report {
        Some(WireText::Chunks(chunks)) => SegmentText::ChunkSequence(chunks),
        Some(WireText::Plain(text)) if !text.is_empty() => SegmentText::PlainRun(text),
        _ => SegmentText::PlainRun(plain.unwrap_or_default()),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn heading(number: &Value, text: &Value) -> Option<Heading> {
    let number = scalar_text(number);
    let text = scalar_text(text);
    if number.is_none() && text.is_none() {
        return None;
    }
    Some(Heading {
        number: number.unwrap_or_default(),
        text: text.unwrap_or_default(),
    })
}

fn page_number(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Text fields of the multipart submission, in the order the service documents them.
///
/// File parts (`left_file`, `right_file`) are attached separately by the transport.
pub fn form_fields(params: &CompareParams) -> Vec<(&'static str, String)> {
    let (header_left, footer_left) = params.left.crop.rounded();
    let (header_right, footer_right) = params.right.crop.rounded();
    let column = |side: DocumentSide, text: bool| {
        let columns = &params.side(side).columns;
        let value = if text {
            &columns.text_column
        } else {
            &columns.id_column
        };
        value.clone().unwrap_or_default()
    };

    vec![
        ("header_left", header_left.to_string()),
        ("footer_left", footer_left.to_string()),
        ("size_weight_left", params.left.size_weight.to_string()),
        ("header_right", header_right.to_string()),
        ("footer_right", footer_right.to_string()),
        ("size_weight_right", params.right.size_weight.to_string()),
        ("ratio_threshold", params.ratio_threshold.to_string()),
        ("length_threshold", params.length_threshold.to_string()),
        ("text_column_left", column(DocumentSide::Left, true)),
        ("id_column_left", column(DocumentSide::Left, false)),
        ("text_column_right", column(DocumentSide::Right, true)),
        ("id_column_right", column(DocumentSide::Right, false)),
    ]
}
