//! Column definitions and the export feature filter.
//!
//! A run's measurement space is described by a catalog of [`ColumnDef`]s,
//! one per (entity class, feature) pair. The catalog is only known at run
//! time and differs between pipelines.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity class of per-image measurements.
pub const IMAGE: &str = "Image";

/// Entity class of run-level measurements; never exported.
pub const EXPERIMENT: &str = "Experiment";

/// Entity class of neighbor relationships; never exported.
pub const NEIGHBORS: &str = "Neighbors";

/// Key column shared by both tables.
pub const IMAGE_NUMBER: &str = "ImageNumber";

/// Second key column of the object table.
pub const OBJECT_NUMBER: &str = "ObjectNumber";

/// Feature prefixes that are bookkeeping, not measurements.
const IGNORED_FEATURE_PREFIXES: [&str; 4] = [
    "Description_",
    "ModuleError_",
    "TimeElapsed_",
    "ExecutionTime_",
];

/// Storage kind of a measurement column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Integer,
    Float,
    /// Variable-width text with a maximum width in characters.
    Text(u32),
}

impl ValueKind {
    /// SQL column type used in `CREATE TABLE` statements.
    pub fn sql_type(&self) -> String {
        match self {
            ValueKind::Integer => "INTEGER".to_string(),
            ValueKind::Float => "FLOAT".to_string(),
            ValueKind::Text(width) => format!("VARCHAR({})", width),
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, ValueKind::Text(_))
    }
}

/// Per-image summary statistic over an object feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateKind {
    Mean,
    Median,
    StdDev,
}

impl AggregateKind {
    /// All kinds in column order.
    pub const ALL: [AggregateKind; 3] = [
        AggregateKind::Mean,
        AggregateKind::Median,
        AggregateKind::StdDev,
    ];

    /// Prefix used to name the aggregate column.
    pub fn prefix(&self) -> &'static str {
        match self {
            AggregateKind::Mean => "Mean",
            AggregateKind::Median => "Median",
            AggregateKind::StdDev => "StDev",
        }
    }

    /// Aggregate feature name for an object feature, e.g.
    /// `Mean_Nuclei_AreaShape_Area`.
    pub fn feature_name(&self, object_name: &str, feature: &str) -> String {
        format!("{}_{}_{}", self.prefix(), object_name, feature)
    }
}

impl fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// One entry of the column-definition catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Entity class: `Image`, `Experiment`, or an object class.
    pub object_name: String,
    pub feature: String,
    pub kind: ValueKind,
}

impl ColumnDef {
    pub fn new(
        object_name: impl Into<String>,
        feature: impl Into<String>,
        kind: ValueKind,
    ) -> Self {
        Self {
            object_name: object_name.into(),
            feature: feature.into(),
            kind,
        }
    }

    /// Full feature name, `<object>_<feature>`.
    pub fn feature_name(&self) -> String {
        format!("{}_{}", self.object_name, self.feature)
    }

    pub fn is_image(&self) -> bool {
        self.object_name == IMAGE
    }

    /// Whether this column belongs to an object class.
    pub fn is_object(&self) -> bool {
        self.object_name != IMAGE && self.object_name != EXPERIMENT
    }

    /// Whether this column is exported at all.
    pub fn is_retained(&self) -> bool {
        !ignore_feature(&self.object_name, &self.feature)
    }
}

/// Entity classes that are never exported.
pub fn ignore_object(object_name: &str) -> bool {
    object_name == EXPERIMENT || object_name == NEIGHBORS
}

/// Whether a feature is excluded from export.
///
/// The same filter is applied by schema derivation, aggregation, and row
/// assembly.
pub fn ignore_feature(object_name: &str, feature: &str) -> bool {
    ignore_object(object_name)
        || IGNORED_FEATURE_PREFIXES
            .iter()
            .any(|prefix| feature.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_excludes_run_level_and_bookkeeping() {
        assert!(ignore_feature(EXPERIMENT, "Run_Date"));
        assert!(ignore_feature(NEIGHBORS, "NumberOfNeighbors"));
        assert!(ignore_feature(IMAGE, "ModuleError_01Load"));
        assert!(ignore_feature("Nuclei", "ExecutionTime_03Identify"));
        assert!(ignore_feature(IMAGE, "Description_Pipeline"));
        assert!(ignore_feature(IMAGE, "TimeElapsed_Total"));
        assert!(!ignore_feature(IMAGE, "Count_Nuclei"));
        assert!(!ignore_feature("Nuclei", "AreaShape_Area"));
    }

    #[test]
    fn aggregate_names_use_stdev_prefix() {
        assert_eq!(
            AggregateKind::Mean.feature_name("Nuclei", "AreaShape_Area"),
            "Mean_Nuclei_AreaShape_Area"
        );
        assert_eq!(
            AggregateKind::StdDev.feature_name("Cells", "Intensity"),
            "StDev_Cells_Intensity"
        );
    }

    #[test]
    fn sql_types() {
        assert_eq!(ValueKind::Integer.sql_type(), "INTEGER");
        assert_eq!(ValueKind::Float.sql_type(), "FLOAT");
        assert_eq!(ValueKind::Text(128).sql_type(), "VARCHAR(128)");
    }

    #[test]
    fn column_def_classification() {
        let image = ColumnDef::new(IMAGE, "Count_Nuclei", ValueKind::Integer);
        let object = ColumnDef::new("Nuclei", "AreaShape_Area", ValueKind::Float);
        let run = ColumnDef::new(EXPERIMENT, "Version", ValueKind::Text(64));
        assert!(image.is_image() && !image.is_object());
        assert!(object.is_object());
        assert!(!run.is_object() && !run.is_retained());
        assert_eq!(object.feature_name(), "Nuclei_AreaShape_Area");
    }

    #[test]
    fn value_kind_serde_shape() {
        let json = serde_json::to_string(&ValueKind::Text(32)).unwrap();
        assert_eq!(json, r#"{"text":32}"#);
        let kind: ValueKind = serde_json::from_str(r#""float""#).unwrap();
        assert_eq!(kind, ValueKind::Float);
    }
}
