//! Token fingerprinting.

pub mod digest;
