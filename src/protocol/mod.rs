//! Authority protocol types.

pub mod models;
