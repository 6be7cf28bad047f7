//! Wardpost host application library
//!
//! Configuration loading and normalization plus the warning output seam,
//! shared by the `wardpost` daemon and the `wardpost-cli` tool.

pub mod config;
pub mod warning;
