//! Application layer (use-cases, policies).
//!
//! This module orchestrates domain logic without depending on any particular
//! front end or transport.

pub mod compare;
pub mod crop;
pub mod export;
pub mod results;
