//! Boundary with the spreadsheet parser: header labels for column selection.

use anyhow::{Context, Result};

pub trait SpreadsheetReader: Send + Sync {
    /// Labels of the first row, in column order.
    fn header_labels(&self, document: &[u8]) -> Result<Vec<String>>;
}

/// Reads the header record of a comma separated file.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvHeaderReader;

impl SpreadsheetReader for CsvHeaderReader {
    fn header_labels(&self, document: &[u8]) -> Result<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(document);
        let headers = reader.headers().context("reading header row")?;
        Ok(headers
            .iter()
            .map(|label| label.trim().to_string())
            .filter(|label| !label.is_empty())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_first_row() {
        let doc = b"ID,Text,Owner\n1,Hello,ann\n2,World,bob\n";
        let labels = CsvHeaderReader.header_labels(doc).unwrap();
        assert_eq!(labels, vec!["ID", "Text", "Owner"]);
    }

    #[test]
    fn test_blank_labels_are_skipped() {
        let doc = b"ID, ,Text\n";
        let labels = CsvHeaderReader.header_labels(doc).unwrap();
        assert_eq!(labels, vec!["ID", "Text"]);
    }

    #[test]
    fn test_empty_input_has_no_labels() {
        let labels = CsvHeaderReader.header_labels(b"").unwrap();
        assert!(labels.is_empty());
    }
}
