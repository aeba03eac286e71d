use crate::domain::{CompareError, JobId, TaskSnapshot};

/// Phase of the controller as seen by its owner.
///
/// `Completed` is reported only once the rows have been retrieved and are
/// ready to hand over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControllerPhase {
    #[default]
    Idle,
    Submitted,
    Running,
    Completed,
    Failed,
}

impl ControllerPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Pollable view of the controller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControllerStatus {
    pub phase: ControllerPhase,
    pub job_id: Option<JobId>,
    pub progress: u8,
    pub status_message: String,
    pub error: Option<CompareError>,
}

/// Notifications pushed to the owner of a controller. Each failure is sent once.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    Submitted { job_id: JobId },
    Progress { job_id: JobId, snapshot: TaskSnapshot },
    Completed { job_id: JobId, row_count: usize },
    Failed { job_id: JobId, error: CompareError },
    Cancelled { job_id: JobId },
}

impl TaskEvent {
    pub fn job_id(&self) -> &str {
        match self {
            TaskEvent::Submitted { job_id }
            | TaskEvent::Progress { job_id, .. }
            | TaskEvent::Completed { job_id, .. }
            | TaskEvent::Failed { job_id, .. }
            | TaskEvent::Cancelled { job_id } => job_id,
        }
    }
}
