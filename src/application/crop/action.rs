use crate::domain::{CropEdge, CropState};

/// User intents accepted by a [`super::CropSelector`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CropAction {
    /// A handle was dragged to `display_pixels` from its page edge, measured
    /// at the current preview scale.
    SetDepth {
        edge: CropEdge,
        display_pixels: f64,
    },
    /// Replace both depths with document-space values.
    Restore(CropState),
    NextPage,
    PreviousPage,
}
