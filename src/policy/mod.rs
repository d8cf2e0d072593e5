//! Access policies.

pub mod access;
