//! Row model shared by the assembler and the sinks.
//!
//! Rows are positional: cell `i` belongs to column `i` of the table layout
//! the row was assembled against. Rows live for one image set only.

use crate::id::{ImageNumber, ObjectNumber};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single stored value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Null,
}

impl CellValue {
    /// Numeric cells are emitted unquoted by the sinks.
    pub fn is_numeric(&self) -> bool {
        matches!(self, CellValue::Integer(_) | CellValue::Float(_))
    }

    /// Float cell with non-finite values coerced to 0.
    pub fn finite_float(value: f64) -> Self {
        if value.is_finite() {
            CellValue::Float(value)
        } else {
            CellValue::Float(0.0)
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Integer(v) => Some(*v as f64),
            CellValue::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    /// Literal text form. Floats always carry a decimal point so the
    /// output stays byte-stable across integral and fractional values.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Integer(v) => write!(f, "{}", v),
            CellValue::Float(v) => write!(f, "{:?}", v),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Null => Ok(()),
        }
    }
}

/// One row of `Per_Image`: image number first, then image features, then
/// aggregate columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRow {
    pub image_number: ImageNumber,
    pub cells: Vec<CellValue>,
}

impl ImageRow {
    /// A row of `width` cells with only the key filled in.
    pub fn new(image_number: ImageNumber, width: usize) -> Self {
        let mut cells = vec![CellValue::Null; width.max(1)];
        cells[0] = CellValue::Integer(image_number.as_key());
        Self {
            image_number,
            cells,
        }
    }

    pub fn width(&self) -> usize {
        self.cells.len()
    }
}

/// One row of `Per_Object`: image number, object number, then object
/// features.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectRow {
    pub image_number: ImageNumber,
    pub object_number: ObjectNumber,
    pub cells: Vec<CellValue>,
}

impl ObjectRow {
    /// A row of `width` cells with the keys filled in and every feature
    /// cell set to `fill`.
    pub fn new(
        image_number: ImageNumber,
        object_number: ObjectNumber,
        width: usize,
        fill: CellValue,
    ) -> Self {
        let mut cells = vec![fill; width.max(2)];
        cells[0] = CellValue::Integer(image_number.as_key());
        cells[1] = CellValue::Integer(object_number.as_key());
        Self {
            image_number,
            object_number,
            cells,
        }
    }

    pub fn width(&self) -> usize {
        self.cells.len()
    }
}
