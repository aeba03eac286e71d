//! Infrastructure layer (adapters/implementations).
//!
//! This module contains IO-heavy integrations (HTTP service, rasterizer, spreadsheet parsing, config).

pub mod app_config;
pub mod render;
pub mod service;
pub mod spreadsheet;
