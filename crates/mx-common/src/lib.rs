//! Measurement export common types, IDs, and errors.
//!
//! This crate provides foundational types shared across the export crates:
//! - Column definitions, entity classes, and the feature filter
//! - Image and object number types
//! - The row model handed from the assembler to the sinks
//! - Common error types

pub mod error;
pub mod id;
pub mod row;
pub mod schema;

pub use error::{Error, Result};
pub use id::{ImageNumber, ObjectNumber, MAX_OBJECT_COUNT};
pub use row::{CellValue, ImageRow, ObjectRow};
pub use schema::{
    ignore_feature, ignore_object, AggregateKind, ColumnDef, ValueKind, EXPERIMENT, IMAGE,
    IMAGE_NUMBER, NEIGHBORS, OBJECT_NUMBER,
};
