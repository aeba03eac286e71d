use crate::domain::{ComparisonRow, Heading, SegmentText};
use serde::{Deserialize, Serialize};

/// Which optional columns a report carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportVariant {
    /// Pick optional columns from the fields present in the rows.
    #[default]
    Inferred,
    /// Paginated sources: headings and page numbers.
    Document,
    /// Spreadsheet sources: row identifiers.
    Spreadsheet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Type,
    Ratio,
    LeftText,
    RightText,
    LeftIdentifier,
    RightIdentifier,
    LeftHeading,
    RightHeading,
    LeftPage,
    RightPage,
}

impl Column {
    pub fn label(self) -> &'static str {
        match self {
            Column::Type => "Type",
            Column::Ratio => "Ratio",
            Column::LeftText => "Left text",
            Column::RightText => "Right text",
            Column::LeftIdentifier => "Left ID",
            Column::RightIdentifier => "Right ID",
            Column::LeftHeading => "Left heading",
            Column::RightHeading => "Right heading",
            Column::LeftPage => "Left page",
            Column::RightPage => "Right page",
        }
    }

    /// Side text carried by this column, if it is a text column.
    pub fn text<'a>(self, row: &'a ComparisonRow) -> Option<&'a SegmentText> {
        match self {
            Column::LeftText => Some(&row.left_text),
            Column::RightText => Some(&row.right_text),
            _ => None,
        }
    }

    /// Flat cell value; text columns join chunk subtexts with `separator`.
    pub fn value(self, row: &ComparisonRow, separator: &str) -> String {
        let heading = |h: &Option<Heading>| h.as_ref().map(Heading::label).unwrap_or_default();
        let page = |p: Option<u32>| p.map(|p| p.to_string()).unwrap_or_default();
        match self {
            Column::Type => row.row_type.to_string(),
            Column::Ratio if row.row_type.has_ratio() => format!("{:.2}", row.similarity_ratio),
            Column::Ratio => String::new(),
            Column::LeftText => row.left_text.joined(separator),
            Column::RightText => row.right_text.joined(separator),
            Column::LeftIdentifier => row.left_identifier.clone().unwrap_or_default(),
            Column::RightIdentifier => row.right_identifier.clone().unwrap_or_default(),
            Column::LeftHeading => heading(&row.left_heading),
            Column::RightHeading => heading(&row.right_heading),
            Column::LeftPage => page(row.left_page),
            Column::RightPage => page(row.right_page),
        }
    }
}

/// Column set for `rows` under `variant`, in output order.
pub fn columns_for(rows: &[ComparisonRow], variant: ReportVariant) -> Vec<Column> {
    let (identifiers, headings, pages) = match variant {
        ReportVariant::Document => (false, true, true),
        ReportVariant::Spreadsheet => (true, false, false),
        ReportVariant::Inferred => (
            rows.iter().any(ComparisonRow::has_identifiers),
            rows.iter().any(ComparisonRow::has_headings),
            rows.iter().any(ComparisonRow::has_pages),
        ),
    };

    let mut columns = vec![
        Column::Type,
        Column::Ratio,
        Column::LeftText,
        Column::RightText,
    ];
    if identifiers {
        columns.extend([Column::LeftIdentifier, Column::RightIdentifier]);
    }
    if headings {
        columns.extend([Column::LeftHeading, Column::RightHeading]);
    }
    if pages {
        columns.extend([Column::LeftPage, Column::RightPage]);
    }
    columns
}
