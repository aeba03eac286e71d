//! Header/footer crop selection over a rendered page preview.

mod action;
mod selector;

pub use action::CropAction;
pub use selector::{CropSelector, RenderOutcome, RenderRequest, RenderedPage};
