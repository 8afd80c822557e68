//! Per-run export context.
//!
//! Everything computed at schema setup lives here: the validated
//! configuration, the frozen column-name map, and both table layouts. The
//! context is immutable once built, so workers exporting image sets of the
//! same run can share one behind a reference or an `Arc`.

use crate::assemble::{ExportWarning, RowAssembler};
use crate::name_map::{ColumnNameMap, NameMapper};
use crate::schema::ddl;
use crate::schema::{SchemaBuilder, SchemaLayout};
use crate::sink::file::FileOutputs;
use crate::sink::{FileSink, RelationalSink, RowSink, SqlExecutor};
use crate::source::MeasurementSource;
use mx_common::{ColumnDef, Error, ImageNumber, Result};
use mx_config::{ConfigError, ExportConfig};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use tracing::{debug, info, warn};

/// Outcome of exporting one image set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageSetReport {
    pub image_number: ImageNumber,
    pub object_rows: usize,
    pub warnings: Vec<ExportWarning>,
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExportSummary {
    pub image_sets: usize,
    pub object_rows: usize,
    pub warnings: Vec<ExportWarning>,
}

impl ExportSummary {
    fn record(&mut self, report: ImageSetReport) {
        self.image_sets += 1;
        self.object_rows += report.object_rows;
        self.warnings.extend(report.warnings);
    }
}

/// Schema state of one run, built once and shared read-only.
#[derive(Debug, Clone)]
pub struct ExportContext {
    config: ExportConfig,
    names: ColumnNameMap,
    layout: SchemaLayout,
}

impl ExportContext {
    /// Validate `config`, assign column identifiers for `catalog`, and
    /// derive both layouts.
    ///
    /// Fails before any row is written when the configuration is invalid,
    /// the backend is unsupported, or a name cannot be placed.
    pub fn initialize(catalog: &[ColumnDef], config: ExportConfig) -> Result<Self> {
        let validation = config.validate();
        for warning in &validation.warnings {
            warn!(warning = %warning, "configuration warning");
        }
        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.errors).into());
        }
        if !config.db_type.is_supported() {
            return Err(Error::UnsupportedBackend(config.db_type.to_string()));
        }

        let builder = SchemaBuilder::new(catalog, &config.aggregate_kinds())
            .with_table_prefix(config.table_prefix());
        let mut mapper = match config.name_seed {
            Some(seed) => NameMapper::with_seed(config.max_column_name_len, seed),
            None => NameMapper::new(config.max_column_name_len),
        }
        .with_max_attempts(config.max_name_attempts);
        builder.register_names(&mut mapper);
        let names = mapper.freeze()?;
        let layout = builder.build(&names)?;

        info!(
            backend = %config.db_type,
            features = names.len(),
            object_classes = layout.object_names.len(),
            "export schema ready"
        );
        Ok(Self {
            config,
            names,
            layout,
        })
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn names(&self) -> &ColumnNameMap {
        &self.names
    }

    pub fn layout(&self) -> &SchemaLayout {
        &self.layout
    }

    /// Drop and create statements for both tables.
    pub fn schema_statements(&self) -> Vec<String> {
        ddl::schema_statements(&self.layout)
    }

    /// Execute the table definitions. A secondary worker joining a run that
    /// another process initialized passes `create = false`.
    ///
    /// The database must already be created and selected.
    pub fn create_tables<E: SqlExecutor + ?Sized>(
        &self,
        executor: &mut E,
        create: bool,
    ) -> Result<()> {
        if !create {
            debug!("skipping table creation");
            return Ok(());
        }
        for statement in self.schema_statements() {
            debug!(statement = %statement, "executing DDL");
            executor.execute(&statement)?;
        }
        executor.commit()
    }

    /// `<sql_file_prefix><first>_<last>` over the source's image numbers.
    pub fn base_name<S: MeasurementSource + ?Sized>(&self, source: &S) -> Result<String> {
        let start = source.image_set_start_number();
        let first = ImageNumber::from_index(start, 0)?;
        let last = ImageNumber::from_index(start, source.image_set_count().saturating_sub(1))?;
        Ok(self.config.base_name(first.0, last.0))
    }

    pub fn assembler(&self) -> RowAssembler<'_> {
        RowAssembler::new(&self.layout)
    }

    /// Relational sink batching object rows by the configured size and
    /// quoting text for the configured backend.
    pub fn relational_sink<E: SqlExecutor>(&self, executor: E) -> RelationalSink<E> {
        RelationalSink::new(executor, &self.layout, self.config.insert_batch_size)
            .with_db_type(self.config.db_type)
    }

    /// File sink in the configured output directory.
    pub fn file_sink(&self, base_name: &str) -> Result<(FileSink<BufWriter<File>>, FileOutputs)> {
        FileSink::create(
            &self.config.output_directory,
            &self.config,
            &self.layout,
            base_name,
        )
    }

    /// Assemble one image set and write it: image row, object rows, flush.
    pub fn export_image_set<S, K>(
        &self,
        source: &S,
        image_set_index: usize,
        sink: &mut K,
    ) -> Result<ImageSetReport>
    where
        S: MeasurementSource + ?Sized,
        K: RowSink + ?Sized,
    {
        let set = self.assembler().assemble(source, image_set_index)?;
        sink.write_image_row(&set.image_row)?;
        sink.write_object_rows(&set.object_rows)?;
        sink.flush()?;
        debug!(
            image_number = %set.image_row.image_number,
            object_rows = set.object_rows.len(),
            "exported image set"
        );
        Ok(ImageSetReport {
            image_number: set.image_row.image_number,
            object_rows: set.object_rows.len(),
            warnings: set.warnings,
        })
    }

    /// Export every image set in ascending order, then finish the sink.
    pub fn export_all<S, K>(&self, source: &S, sink: &mut K) -> Result<ExportSummary>
    where
        S: MeasurementSource + ?Sized,
        K: RowSink + ?Sized,
    {
        let mut summary = ExportSummary::default();
        for index in 0..source.image_set_count() {
            summary.record(self.export_image_set(source, index, sink)?);
        }
        sink.finish()?;
        info!(
            image_sets = summary.image_sets,
            object_rows = summary.object_rows,
            warnings = summary.warnings.len(),
            "export finished"
        );
        Ok(summary)
    }
}
