//! Domain layer for the DMS reporting and analytics backend.
//!
//! This crate contains:
//! - Domain models (catalog metadata, data marts, reports, dashboards, analytics)
//! - The core services: connector registry, data catalog, report execution engine,
//!   advanced analytics
//! - Storage traits implemented by the persistence crate

pub mod models;
pub mod services;
