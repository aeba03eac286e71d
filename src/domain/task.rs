use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a comparison job as issued by the service.
pub type JobId = String;

/// Lifecycle phase of a comparison job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPhase {
    Submitted,
    Running,
    Completed,
    Failed,
}

impl TaskPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    fn rank(self) -> u8 {
        match self {
            Self::Submitted => 0,
            Self::Running => 1,
            Self::Completed | Self::Failed => 2,
        }
    }
}

impl fmt::Display for TaskPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Submitted => write!(f, "submitted"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for TaskPhase {
    type Err = String;

    /// Maps the service's status vocabulary onto phases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "submitted" | "queued" | "pending" => Ok(Self::Submitted),
            "running" | "processing" | "started" | "in_progress" => Ok(Self::Running),
            "completed" | "done" => Ok(Self::Completed),
            "failed" | "error" => Ok(Self::Failed),
            other => Err(format!("unknown job status '{other}'")),
        }
    }
}

/// One observation of a job, as returned by a poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub phase: TaskPhase,
    /// Percentage in `0..=100`.
    pub progress: u8,
    #[serde(default)]
    pub status_message: String,
}

impl TaskSnapshot {
    pub fn new(phase: TaskPhase, progress: i64, status_message: impl Into<String>) -> Self {
        Self {
            phase,
            progress: progress.clamp(0, 100) as u8,
            status_message: status_message.into(),
        }
    }
}

/// What applying a snapshot did to the tracked state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Nothing observable changed.
    Unchanged,
    /// Phase, progress or message moved forward.
    Advanced,
    /// The job entered `completed` with this snapshot.
    Completed,
    /// The job entered `failed` with this snapshot.
    Failed,
}

/// The single active job of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskState {
    pub id: JobId,
    pub phase: TaskPhase,
    pub progress: u8,
    pub status_message: String,
    pub submitted_at: String,
}

impl TaskState {
    pub fn submitted(id: impl Into<JobId>) -> Self {
        Self {
            id: id.into(),
            phase: TaskPhase::Submitted,
            progress: 0,
            status_message: "submitted".to_string(),
            submitted_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Fold a poll observation into the state.
    ///
    /// Phases never move backwards and terminal phases absorb every later
    /// observation. Progress is non-decreasing; completion pins it to 100.
    pub fn apply(&mut self, snapshot: &TaskSnapshot) -> Transition {
        if self.phase.is_terminal() {
            return Transition::Unchanged;
        }

        match snapshot.phase {
            TaskPhase::Failed => {
                self.phase = TaskPhase::Failed;
                if !snapshot.status_message.is_empty() {
                    self.status_message = snapshot.status_message.clone();
                }
                Transition::Failed
            }
            TaskPhase::Completed => {
                self.phase = TaskPhase::Completed;
                self.progress = 100;
                self.status_message = if snapshot.status_message.is_empty() {
                    "completed".to_string()
                } else {
                    snapshot.status_message.clone()
                };
                Transition::Completed
            }
            phase => {
                let mut changed = false;
                if phase.rank() > self.phase.rank() {
                    self.phase = phase;
                    changed = true;
                }
                if self.phase == TaskPhase::Running && snapshot.progress > self.progress {
                    self.progress = snapshot.progress;
                    changed = true;
                }
                if phase == self.phase
                    && !snapshot.status_message.is_empty()
                    && snapshot.status_message != self.status_message
                {
                    self.status_message = snapshot.status_message.clone();
                    changed = true;
                }
                if changed {
                    Transition::Advanced
                } else {
                    Transition::Unchanged
                }
            }
        }
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            phase: self.phase,
            progress: self.progress,
            status_message: self.status_message.clone(),
        }
    }
}
