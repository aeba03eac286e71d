//! Domain error types.
//!
//! Every failure here is scoped to the current job or the current preview and
//! is recoverable by a fresh user action.

use super::crop::DocumentSide;
use super::task::JobId;
use thiserror::Error;

/// Problems caught locally before a request is ever sent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("No file attached for the {0} document")]
    MissingFile(DocumentSide),

    #[error("Unsupported file type for the {side} document: {name}")]
    UnsupportedFileType { side: DocumentSide, name: String },

    #[error("Select a text column for the {0} spreadsheet")]
    MissingTextColumn(DocumentSide),

    #[error("Ratio threshold must be within [0, 1], got {0}")]
    ThresholdOutOfRange(f64),
}

/// Failures while producing a page preview.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("Document has no pages")]
    EmptyDocument,

    #[error("Page {index} is out of range (document has {count} pages)")]
    PageOutOfRange { index: usize, count: usize },

    #[error("Not a valid paginated document: {0}")]
    InvalidSource(String),

    #[error("Could not allocate a {width}x{height} bitmap")]
    Bitmap { width: u32, height: u32 },

    #[error("No document loaded")]
    NothingLoaded,

    #[error("Could not encode preview: {0}")]
    Encoding(String),
}

/// Errors of the comparison job lifecycle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompareError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Comparison request rejected: {0}")]
    Submission(String),

    #[error("Lost contact with the comparison service: {0}")]
    Transport(String),

    #[error("Comparison job {job_id} failed: {message}")]
    JobFailed { job_id: JobId, message: String },

    #[error("Comparison job {active} is still in progress")]
    Conflict { active: JobId },

    #[error("No result available for job {0}")]
    NotFound(JobId),

    #[error("Result of job {0} is not ready yet")]
    NotReady(JobId),

    #[error("Comparison was cancelled")]
    Cancelled,
}

impl CompareError {
    /// Whether the error ends the job it occurred in.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CompareError::Transport(_) | CompareError::JobFailed { .. }
        )
    }
}

/// Failures while serializing a report.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Report template failed to render: {0}")]
    Template(String),

    #[error("Tabular encoding failed: {0}")]
    Encoding(String),
}

impl From<handlebars::RenderError> for ExportError {
    fn from(err: handlebars::RenderError) -> Self {
        ExportError::Template(err.to_string())
    }
}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        ExportError::Encoding(err.to_string())
    }
}
