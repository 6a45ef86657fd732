//! Application services.

pub mod export;
