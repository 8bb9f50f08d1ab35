//! CLI commands

pub mod compose;
pub mod lint;
