//! Batched relational inserts.
//!
//! The sink only produces statement text. Running it is delegated to a
//! [`SqlExecutor`], which owns the connection and its transaction.

use super::escape::sql_literal;
use super::RowSink;
use crate::schema::{SchemaLayout, TableLayout};
use mx_common::{CellValue, Error, ImageRow, ObjectRow, Result};
use mx_config::DatabaseType;
use std::io::Write;
use tracing::debug;

/// Connection seam: executes statements and commits.
pub trait SqlExecutor {
    fn execute(&mut self, statement: &str) -> Result<()>;
    fn commit(&mut self) -> Result<()>;
}

impl<T: SqlExecutor + ?Sized> SqlExecutor for &mut T {
    fn execute(&mut self, statement: &str) -> Result<()> {
        (**self).execute(statement)
    }

    fn commit(&mut self) -> Result<()> {
        (**self).commit()
    }
}

/// Keeps every statement in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingExecutor {
    pub statements: Vec<String>,
    /// Statement count at each commit.
    pub commits: Vec<usize>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SqlExecutor for RecordingExecutor {
    fn execute(&mut self, statement: &str) -> Result<()> {
        self.statements.push(statement.to_string());
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.commits.push(self.statements.len());
        Ok(())
    }
}

/// Writes `;`-terminated statements to a script. Commit flushes the writer.
pub struct ScriptExecutor<W: Write> {
    writer: W,
    statements: usize,
}

impl<W: Write> ScriptExecutor<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            statements: 0,
        }
    }

    pub fn statement_count(&self) -> usize {
        self.statements
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> SqlExecutor for ScriptExecutor<W> {
    fn execute(&mut self, statement: &str) -> Result<()> {
        writeln!(self.writer, "{};", statement).map_err(|e| {
            Error::Statement(format!("statement {}: {}", self.statements + 1, e))
        })?;
        self.statements += 1;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| Error::Statement(format!("flushing script: {}", e)))
    }
}

/// Who commits the inserted rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommitMode {
    /// Commit at every image-set flush.
    PerImageSet,
    /// Commit once when the run finishes.
    #[default]
    OnFinish,
    /// Never commit; the caller owns the transaction.
    Caller,
}

/// Column list of one table, with the statement prefix precomputed.
#[derive(Debug, Clone)]
struct InsertTarget {
    table: String,
    width: usize,
    prefix: String,
}

impl InsertTarget {
    fn new(table: &TableLayout) -> Self {
        Self {
            table: table.name.clone(),
            width: table.width(),
            prefix: format!(
                "INSERT INTO {} ({}) VALUES ",
                table.name,
                table.column_ids().join(",")
            ),
        }
    }

    fn check_width(&self, cells: &[CellValue]) -> Result<()> {
        if cells.len() != self.width {
            return Err(Error::RowWidth {
                table: self.table.clone(),
                expected: self.width,
                actual: cells.len(),
            });
        }
        Ok(())
    }

    fn statement<'c>(
        &self,
        rows: impl Iterator<Item = &'c [CellValue]>,
        db_type: DatabaseType,
    ) -> String {
        let tuples: Vec<String> = rows
            .map(|cells| {
                let values: Vec<String> =
                    cells.iter().map(|cell| sql_literal(cell, db_type)).collect();
                format!("({})", values.join(","))
            })
            .collect();
        format!("{}{}", self.prefix, tuples.join(","))
    }
}

/// Issues one INSERT per image row and multi-row INSERTs of at most
/// `batch_size` object rows. Text literals follow the quoting rules of
/// `db_type` (MySQL unless set).
pub struct RelationalSink<E: SqlExecutor> {
    executor: E,
    image: InsertTarget,
    object: InsertTarget,
    batch_size: usize,
    db_type: DatabaseType,
    commit_mode: CommitMode,
    statements: usize,
}

impl<E: SqlExecutor> RelationalSink<E> {
    pub fn new(executor: E, layout: &SchemaLayout, batch_size: usize) -> Self {
        Self {
            executor,
            image: InsertTarget::new(&layout.image),
            object: InsertTarget::new(&layout.object),
            batch_size: batch_size.max(1),
            db_type: DatabaseType::default(),
            commit_mode: CommitMode::default(),
            statements: 0,
        }
    }

    pub fn with_db_type(mut self, db_type: DatabaseType) -> Self {
        self.db_type = db_type;
        self
    }

    pub fn with_commit_mode(mut self, commit_mode: CommitMode) -> Self {
        self.commit_mode = commit_mode;
        self
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn into_executor(self) -> E {
        self.executor
    }

    /// INSERT statements issued so far.
    pub fn statement_count(&self) -> usize {
        self.statements
    }

    fn execute(&mut self, statement: &str) -> Result<()> {
        self.executor.execute(statement)?;
        self.statements += 1;
        Ok(())
    }
}

impl<E: SqlExecutor> RowSink for RelationalSink<E> {
    fn write_image_row(&mut self, row: &ImageRow) -> Result<()> {
        self.image.check_width(&row.cells)?;
        let statement = self
            .image
            .statement(std::iter::once(row.cells.as_slice()), self.db_type);
        self.execute(&statement)
    }

    fn write_object_rows(&mut self, rows: &[ObjectRow]) -> Result<()> {
        for row in rows {
            self.object.check_width(&row.cells)?;
        }
        for batch in rows.chunks(self.batch_size) {
            let statement = self
                .object
                .statement(batch.iter().map(|r| r.cells.as_slice()), self.db_type);
            self.execute(&statement)?;
            debug!(rows = batch.len(), table = %self.object.table, "inserted object batch");
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if self.commit_mode == CommitMode::PerImageSet {
            self.executor.commit()?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.commit_mode == CommitMode::OnFinish {
            self.executor.commit()?;
        }
        Ok(())
    }
}
