//! Row assembly for one image set.
//!
//! Measurement producers do not agree with each other on object counts,
//! and values are often non-finite. The assembler never fails over either:
//! non-finite values become 0 silently, and vectors whose length differs
//! from the image set's object count are padded or truncated with an
//! [`ExportWarning`]. A `Count` above [`MAX_OBJECT_COUNT`] is the one
//! measurement problem that stops the image set.

use crate::aggregate::Aggregator;
use crate::schema::{ColumnOrigin, SchemaLayout};
use crate::source::{MeasurementSource, MeasurementValue};
use mx_common::{
    CellValue, Error, ImageNumber, ImageRow, ObjectNumber, ObjectRow, Result, ValueKind,
    MAX_OBJECT_COUNT,
};
use serde::Serialize;
use std::fmt;
use tracing::warn;

/// Recoverable problem found while assembling an image set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExportWarning {
    /// An object feature reported a different number of values than the
    /// image set's object count.
    CountMismatch {
        image_number: ImageNumber,
        feature: String,
        expected: usize,
        actual: usize,
    },
    /// An image feature had no value; the column's zero was stored.
    MissingImageMeasurement {
        image_number: ImageNumber,
        feature: String,
    },
}

impl ExportWarning {
    pub fn image_number(&self) -> ImageNumber {
        match self {
            ExportWarning::CountMismatch { image_number, .. }
            | ExportWarning::MissingImageMeasurement { image_number, .. } => *image_number,
        }
    }
}

impl fmt::Display for ExportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportWarning::CountMismatch {
                image_number,
                feature,
                expected,
                actual,
            } => {
                let which = if actual < expected { "few" } else { "many" };
                write!(
                    f,
                    "too {} measurements for {} in image set #{}, got {}, expected {}",
                    which, feature, image_number, actual, expected
                )
            }
            ExportWarning::MissingImageMeasurement {
                image_number,
                feature,
            } => write!(f, "no value for {} in image set #{}", feature, image_number),
        }
    }
}

/// Rows and diagnostics for one image set.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledImageSet {
    pub image_row: ImageRow,
    pub object_rows: Vec<ObjectRow>,
    pub warnings: Vec<ExportWarning>,
    /// Object count that governed row generation.
    pub max_count: usize,
}

/// Builds positional rows against a frozen layout.
#[derive(Debug, Clone, Copy)]
pub struct RowAssembler<'a> {
    layout: &'a SchemaLayout,
    aggregator: Aggregator<'a>,
}

impl<'a> RowAssembler<'a> {
    pub fn new(layout: &'a SchemaLayout) -> Self {
        Self {
            layout,
            aggregator: Aggregator::new(layout),
        }
    }

    pub fn assemble<S: MeasurementSource + ?Sized>(
        &self,
        source: &S,
        image_set_index: usize,
    ) -> Result<AssembledImageSet> {
        let count = source.image_set_count();
        if image_set_index >= count {
            return Err(Error::ImageSetOutOfRange {
                index: image_set_index,
                count,
            });
        }
        let image_number =
            ImageNumber::from_index(source.image_set_start_number(), image_set_index)?;
        let mut warnings = Vec::new();

        // ── Image features ──
        let table = &self.layout.image;
        let mut image_row = ImageRow::new(image_number, table.width());
        let mut max_count: usize = 0;
        for (position, column) in table.measurement_columns() {
            let ColumnOrigin::Measurement { feature, .. } = &column.origin else {
                continue;
            };
            let cell = match source.image_value(feature, image_set_index) {
                Some(value) => image_cell(value, column.kind),
                None => {
                    warn!(
                        image_number = %image_number,
                        feature = %column.feature_name,
                        "missing image measurement"
                    );
                    warnings.push(ExportWarning::MissingImageMeasurement {
                        image_number,
                        feature: column.feature_name.clone(),
                    });
                    zero_of(column.kind)
                }
            };
            if column.feature_name.contains("Count") {
                let count = count_of(&cell);
                if count > MAX_OBJECT_COUNT {
                    return Err(Error::ObjectCountOutOfRange {
                        image_number: image_number.0,
                        feature: column.feature_name.clone(),
                        count: cell.as_f64().unwrap_or_default(),
                        limit: MAX_OBJECT_COUNT,
                    });
                }
                max_count = max_count.max(count);
            }
            image_row.cells[position] = cell;
        }

        // ── Aggregates ──
        let aggregates = if max_count == 0 {
            self.aggregator.zeros()
        } else {
            self.aggregator.compute(source, image_set_index)
        };
        for (position, column) in table.aggregate_columns() {
            let value = aggregates.get(&column.feature_name).copied().unwrap_or(0.0);
            image_row.cells[position] = CellValue::finite_float(value);
        }

        // ── Object rows ──
        let table = &self.layout.object;
        let mut object_rows: Vec<ObjectRow> = (0..max_count)
            .map(|slot| {
                ObjectRow::new(
                    image_number,
                    ObjectNumber::from_slot(slot),
                    table.width(),
                    CellValue::Float(0.0),
                )
            })
            .collect();
        if max_count > 0 {
            for (position, column) in table.measurement_columns() {
                let ColumnOrigin::Measurement {
                    object_name,
                    feature,
                } = &column.origin
                else {
                    continue;
                };
                let values = source
                    .object_values(object_name, feature, image_set_index)
                    .unwrap_or_default();
                if values.len() != max_count {
                    warn!(
                        image_number = %image_number,
                        feature = %column.feature_name,
                        got = values.len(),
                        expected = max_count,
                        "object measurement count mismatch"
                    );
                    warnings.push(ExportWarning::CountMismatch {
                        image_number,
                        feature: column.feature_name.clone(),
                        expected: max_count,
                        actual: values.len(),
                    });
                }
                for (row, value) in object_rows.iter_mut().zip(values) {
                    row.cells[position] = object_cell(value, column.kind);
                }
            }
        }

        Ok(AssembledImageSet {
            image_row,
            object_rows,
            warnings,
            max_count,
        })
    }
}

fn zero_of(kind: ValueKind) -> CellValue {
    match kind {
        ValueKind::Integer => CellValue::Integer(0),
        ValueKind::Float => CellValue::Float(0.0),
        ValueKind::Text(_) => CellValue::Text(String::new()),
    }
}

fn image_cell(value: MeasurementValue, kind: ValueKind) -> CellValue {
    match value {
        MeasurementValue::Integer(v) => match kind {
            ValueKind::Text(_) => CellValue::Text(v.to_string()),
            _ => CellValue::Integer(v),
        },
        MeasurementValue::Float(v) => match kind {
            ValueKind::Text(_) => CellValue::Text(v.to_string()),
            _ => CellValue::finite_float(v),
        },
        MeasurementValue::Text(s) => CellValue::Text(s),
    }
}

fn object_cell(value: f64, kind: ValueKind) -> CellValue {
    if kind == ValueKind::Integer && value.is_finite() && value.fract() == 0.0 {
        CellValue::Integer(value as i64)
    } else {
        CellValue::finite_float(value)
    }
}

/// Object count implied by a `Count` cell; text and negatives count as 0
/// and huge values saturate.
fn count_of(cell: &CellValue) -> usize {
    match cell.as_f64() {
        Some(v) if v.is_finite() && v > 0.0 => v as usize,
        _ => 0,
    }
}
