//! Per-image summary statistics over object measurements.

use crate::schema::{ColumnOrigin, SchemaLayout};
use crate::source::MeasurementSource;
use std::collections::HashMap;

/// Aggregate feature name → value for one image set.
pub type AggregateValues = HashMap<String, f64>;

/// Computes every aggregate column of a layout for one image set.
///
/// Statistics cover only finite values. A feature with no finite value
/// yields NaN; storage-time coercion is the assembler's concern.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator<'a> {
    layout: &'a SchemaLayout,
}

impl<'a> Aggregator<'a> {
    pub fn new(layout: &'a SchemaLayout) -> Self {
        Self { layout }
    }

    /// Number of aggregate columns this aggregator fills.
    pub fn column_count(&self) -> usize {
        self.layout.image.aggregate_columns().count()
    }

    pub fn compute<S: MeasurementSource + ?Sized>(
        &self,
        source: &S,
        image_set_index: usize,
    ) -> AggregateValues {
        self.layout
            .image
            .aggregate_columns()
            .filter_map(|(_, column)| match &column.origin {
                ColumnOrigin::Aggregate {
                    kind,
                    object_name,
                    feature,
                } => Some((
                    column.feature_name.clone(),
                    source.aggregate(object_name, feature, image_set_index, *kind),
                )),
                _ => None,
            })
            .collect()
    }

    /// Every aggregate column set to 0, for image sets without objects.
    pub fn zeros(&self) -> AggregateValues {
        self.layout
            .image
            .aggregate_columns()
            .map(|(_, column)| (column.feature_name.clone(), 0.0))
            .collect()
    }
}
