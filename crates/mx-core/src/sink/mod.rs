//! Row sinks.
//!
//! Both realizations consume the same row stream, one image set at a time
//! in ascending image-number order:
//!
//! ```text
//! write_image_row ─► write_object_rows ─► flush     (per image set)
//!                                   ...  ─► finish  (once per run)
//! ```
//!
//! After `flush` returns, everything written for the image set has been
//! handed to the underlying connection or file and a commit is safe.

pub mod escape;
pub mod file;
pub mod relational;

pub use file::FileSink;
pub use relational::{CommitMode, RecordingExecutor, RelationalSink, ScriptExecutor, SqlExecutor};

use mx_common::{ImageRow, ObjectRow, Result};

/// Narrow output interface shared by the relational and file sinks.
pub trait RowSink {
    fn write_image_row(&mut self, row: &ImageRow) -> Result<()>;

    /// Object rows of one image set; may be empty.
    fn write_object_rows(&mut self, rows: &[ObjectRow]) -> Result<()>;

    /// End of one image set.
    fn flush(&mut self) -> Result<()>;

    /// End of the run.
    fn finish(&mut self) -> Result<()>;
}

impl<T: RowSink + ?Sized> RowSink for &mut T {
    fn write_image_row(&mut self, row: &ImageRow) -> Result<()> {
        (**self).write_image_row(row)
    }

    fn write_object_rows(&mut self, rows: &[ObjectRow]) -> Result<()> {
        (**self).write_object_rows(rows)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}
