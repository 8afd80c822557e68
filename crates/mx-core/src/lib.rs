//! Dynamic-schema measurement export engine.
//!
//! Reconciles an open-ended, run-time measurement catalog with a fixed
//! two-table relational contract (`Per_Image`, `Per_Object`):
//!
//! - [`name_map`]: bounded, collision-free column identifiers
//! - [`schema`]: table layouts and DDL
//! - [`aggregate`]: per-image statistics over object measurements
//! - [`assemble`]: positional rows with count reconciliation
//! - [`sink`]: batched relational inserts and delimited files
//! - [`context`]: the per-run context tying them together

pub mod aggregate;
pub mod assemble;
pub mod context;
pub mod exit_codes;
pub mod name_map;
pub mod schema;
pub mod sink;
pub mod source;

pub use aggregate::Aggregator;
pub use assemble::{AssembledImageSet, ExportWarning, RowAssembler};
pub use context::{ExportContext, ExportSummary, ImageSetReport};
pub use name_map::{ColumnNameMap, NameMapper};
pub use schema::{ColumnOrigin, ColumnSpec, SchemaBuilder, SchemaLayout, TableLayout};
pub use sink::{
    CommitMode, FileSink, RecordingExecutor, RelationalSink, RowSink, ScriptExecutor,
    SqlExecutor,
};
pub use source::{InMemoryMeasurements, MeasurementSource, MeasurementValue};
