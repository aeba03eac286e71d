//! Comparison job lifecycle: submission, polling and result hand-over.

mod controller;
mod events;

pub use controller::{TaskController, TaskHandle};
pub use events::{ControllerPhase, ControllerStatus, TaskEvent};
