//! Domain types for doccompare.
//! Defines the comparison result model, crop and job state, and request parameters.

pub mod comparison;
pub mod crop;
pub mod error;
pub mod params;
pub mod task;

pub use comparison::*;
pub use crop::*;
pub use error::*;
pub use params::*;
pub use task::*;
