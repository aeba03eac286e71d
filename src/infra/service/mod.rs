//! Boundary with the remote comparison service.

pub mod http;
pub mod wire;

use crate::domain::{CompareError, CompareParams, ComparisonRow, JobId, TaskSnapshot};
use async_trait::async_trait;

pub use http::HttpComparisonService;

/// Operations the task controller needs from the comparison service.
///
/// Submission failures map to [`CompareError::Submission`]; anything that goes
/// wrong while polling or fetching maps to [`CompareError::Transport`].
#[async_trait]
pub trait ComparisonService: Send + Sync {
    /// Asynchronous mode: start a job and return its identifier.
    async fn start_task(&self, params: &CompareParams) -> Result<JobId, CompareError>;

    /// Synchronous mode: the response carries the rows directly.
    async fn compare(&self, params: &CompareParams) -> Result<Vec<ComparisonRow>, CompareError>;

    /// Query phase and progress of a job once.
    async fn progress(&self, job_id: &str) -> Result<TaskSnapshot, CompareError>;

    /// Retrieve the ordered rows of a completed job.
    async fn result(&self, job_id: &str) -> Result<Vec<ComparisonRow>, CompareError>;
}
