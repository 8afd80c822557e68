//! Core math modules.

pub mod stats;
