//! Client for a remote document comparison service: crop selection on page
//! previews, the comparison job lifecycle, and report export.

pub mod application;
pub mod domain;
pub mod infra;
pub mod state;
