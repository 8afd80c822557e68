//! Measurement source abstraction.
//!
//! The export engine never owns measurements. A host pipeline hands it a
//! [`MeasurementSource`] that answers per-image-set queries. The provided
//! [`InMemoryMeasurements`] backs the CLI (loaded from JSON) and the tests.

use mx_common::{AggregateKind, ColumnDef, ValueKind, IMAGE};
use mx_math::{finite_mean, finite_median, finite_std_dev};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A per-image measurement value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MeasurementValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl MeasurementValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MeasurementValue::Integer(v) => Some(*v as f64),
            MeasurementValue::Float(v) => Some(*v),
            MeasurementValue::Text(_) => None,
        }
    }

    /// Storage kind this value would be declared with.
    pub fn kind(&self) -> ValueKind {
        match self {
            MeasurementValue::Integer(_) => ValueKind::Integer,
            MeasurementValue::Float(_) => ValueKind::Float,
            MeasurementValue::Text(s) => ValueKind::Text(s.chars().count().max(1) as u32),
        }
    }
}

/// Read access to one run's measurements.
pub trait MeasurementSource {
    /// Entity classes present, including `Image`.
    fn object_names(&self) -> Vec<String>;

    /// Feature names recorded for an entity class.
    fn feature_names(&self, object_name: &str) -> Vec<String>;

    /// Scalar image measurement for one image set.
    fn image_value(&self, feature: &str, image_set_index: usize) -> Option<MeasurementValue>;

    /// Per-object values of an object feature for one image set.
    fn object_values(
        &self,
        object_name: &str,
        feature: &str,
        image_set_index: usize,
    ) -> Option<Vec<f64>>;

    /// Image number of the image set at index 0.
    fn image_set_start_number(&self) -> u64;

    /// Number of image sets available.
    fn image_set_count(&self) -> usize;

    /// Summary statistic over the finite values of an object feature.
    ///
    /// NaN when the feature is missing or has no finite value.
    fn aggregate(
        &self,
        object_name: &str,
        feature: &str,
        image_set_index: usize,
        kind: AggregateKind,
    ) -> f64 {
        let values = self
            .object_values(object_name, feature, image_set_index)
            .unwrap_or_default();
        match kind {
            AggregateKind::Mean => finite_mean(&values),
            AggregateKind::Median => finite_median(&values),
            AggregateKind::StdDev => finite_std_dev(&values),
        }
    }
}

/// Measurements of one image set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageSetMeasurements {
    /// Image feature → value; `null` marks a missing measurement.
    #[serde(default)]
    pub image: BTreeMap<String, Option<MeasurementValue>>,

    /// Object class → feature → per-object values; `null` entries are NaN.
    #[serde(default)]
    pub objects: BTreeMap<String, BTreeMap<String, Vec<Option<f64>>>>,
}

/// Measurements held in memory, loadable from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InMemoryMeasurements {
    #[serde(default = "default_start_number")]
    pub image_set_start_number: u64,

    /// Explicit column catalog; inferred from the values when absent.
    #[serde(default)]
    pub catalog: Option<Vec<ColumnDef>>,

    #[serde(default)]
    pub image_sets: Vec<ImageSetMeasurements>,
}

fn default_start_number() -> u64 {
    1
}

impl Default for InMemoryMeasurements {
    fn default() -> Self {
        Self {
            image_set_start_number: default_start_number(),
            catalog: None,
            image_sets: Vec::new(),
        }
    }
}

impl InMemoryMeasurements {
    pub fn new(image_set_start_number: u64) -> Self {
        Self {
            image_set_start_number,
            ..Self::default()
        }
    }

    pub fn from_json_str(s: &str) -> mx_common::Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_path(path: &std::path::Path) -> mx_common::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    fn image_set_mut(&mut self, index: usize) -> &mut ImageSetMeasurements {
        if self.image_sets.len() <= index {
            self.image_sets
                .resize_with(index + 1, ImageSetMeasurements::default);
        }
        &mut self.image_sets[index]
    }

    /// Record an image measurement.
    pub fn add_image_value(
        &mut self,
        index: usize,
        feature: impl Into<String>,
        value: MeasurementValue,
    ) -> &mut Self {
        self.image_set_mut(index)
            .image
            .insert(feature.into(), Some(value));
        self
    }

    /// Record per-object values; non-finite values are kept as NaN.
    pub fn add_object_values(
        &mut self,
        index: usize,
        object_name: impl Into<String>,
        feature: impl Into<String>,
        values: &[f64],
    ) -> &mut Self {
        let stored = values
            .iter()
            .map(|v| if v.is_nan() { None } else { Some(*v) })
            .collect();
        self.image_set_mut(index)
            .objects
            .entry(object_name.into())
            .or_default()
            .insert(feature.into(), stored);
        self
    }

    /// The explicit catalog, or one inferred from the recorded values.
    ///
    /// Inferred image columns take the kind of the first non-null value
    /// (text widened to the longest string seen); object columns are Float.
    pub fn column_catalog(&self) -> Vec<ColumnDef> {
        if let Some(catalog) = &self.catalog {
            return catalog.clone();
        }
        self.infer_catalog()
    }

    pub fn infer_catalog(&self) -> Vec<ColumnDef> {
        let mut image_kinds: BTreeMap<&str, ValueKind> = BTreeMap::new();
        let mut object_features: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

        for set in &self.image_sets {
            for (feature, value) in &set.image {
                let Some(value) = value else { continue };
                let kind = value.kind();
                image_kinds
                    .entry(feature.as_str())
                    .and_modify(|existing| *existing = widen(*existing, kind))
                    .or_insert(kind);
            }
            for (object_name, features) in &set.objects {
                let known = object_features.entry(object_name.as_str()).or_default();
                for feature in features.keys() {
                    if !known.contains(&feature.as_str()) {
                        known.push(feature.as_str());
                    }
                }
            }
        }

        let mut catalog: Vec<ColumnDef> = image_kinds
            .into_iter()
            .map(|(feature, kind)| ColumnDef::new(IMAGE, feature, kind))
            .collect();
        for (object_name, features) in object_features {
            for feature in features {
                catalog.push(ColumnDef::new(object_name, feature, ValueKind::Float));
            }
        }
        catalog
    }
}

fn widen(existing: ValueKind, seen: ValueKind) -> ValueKind {
    match (existing, seen) {
        (ValueKind::Text(a), ValueKind::Text(b)) => ValueKind::Text(a.max(b)),
        (ValueKind::Text(a), _) | (_, ValueKind::Text(a)) => ValueKind::Text(a),
        (ValueKind::Integer, ValueKind::Float) => ValueKind::Float,
        (kind, _) => kind,
    }
}

impl MeasurementSource for InMemoryMeasurements {
    fn object_names(&self) -> Vec<String> {
        let mut names = vec![IMAGE.to_string()];
        for set in &self.image_sets {
            for name in set.objects.keys() {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        names
    }

    fn feature_names(&self, object_name: &str) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for set in &self.image_sets {
            let features: Vec<&String> = if object_name == IMAGE {
                set.image.keys().collect()
            } else {
                set.objects
                    .get(object_name)
                    .map(|f| f.keys().collect())
                    .unwrap_or_default()
            };
            for feature in features {
                if !names.contains(feature) {
                    names.push(feature.clone());
                }
            }
        }
        names
    }

    fn image_value(&self, feature: &str, image_set_index: usize) -> Option<MeasurementValue> {
        self.image_sets
            .get(image_set_index)?
            .image
            .get(feature)?
            .clone()
    }

    fn object_values(
        &self,
        object_name: &str,
        feature: &str,
        image_set_index: usize,
    ) -> Option<Vec<f64>> {
        let values = self
            .image_sets
            .get(image_set_index)?
            .objects
            .get(object_name)?
            .get(feature)?;
        Some(values.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    }

    fn image_set_start_number(&self) -> u64 {
        self.image_set_start_number
    }

    fn image_set_count(&self) -> usize {
        self.image_sets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> InMemoryMeasurements {
        InMemoryMeasurements::from_json_str(
            r#"{
                "image_set_start_number": 5,
                "image_sets": [
                    {
                        "image": {"Count_Nuclei": 3, "FileName_DNA": "a.tif", "Threshold": 0.5},
                        "objects": {"Nuclei": {"AreaShape_Area": [1.0, 2.0, null]}}
                    },
                    {
                        "image": {"Count_Nuclei": 0, "FileName_DNA": "plate1_b.tif", "Threshold": null}
                    }
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn json_nulls_become_nan_and_missing() {
        let m = sample();
        let values = m.object_values("Nuclei", "AreaShape_Area", 0).unwrap();
        assert_eq!(values.len(), 3);
        assert!(values[2].is_nan());
        assert_eq!(m.image_value("Threshold", 1), None);
        assert_eq!(
            m.image_value("Count_Nuclei", 0),
            Some(MeasurementValue::Integer(3))
        );
        assert_eq!(m.image_set_start_number(), 5);
        assert_eq!(m.image_set_count(), 2);
    }

    #[test]
    fn default_aggregate_skips_nan() {
        let m = sample();
        let mean = m.aggregate("Nuclei", "AreaShape_Area", 0, AggregateKind::Mean);
        assert!((mean - 1.5).abs() < 1e-12);
        assert!(m
            .aggregate("Nuclei", "AreaShape_Area", 1, AggregateKind::Mean)
            .is_nan());
    }

    #[test]
    fn names_include_image_first() {
        let m = sample();
        assert_eq!(m.object_names(), vec!["Image", "Nuclei"]);
        assert_eq!(
            m.feature_names("Image"),
            vec!["Count_Nuclei", "FileName_DNA", "Threshold"]
        );
        assert_eq!(m.feature_names("Nuclei"), vec!["AreaShape_Area"]);
    }

    #[test]
    fn inferred_catalog_widens_text() {
        let catalog = sample().infer_catalog();
        let file = catalog
            .iter()
            .find(|c| c.feature == "FileName_DNA")
            .unwrap();
        assert_eq!(file.kind, ValueKind::Text(12));
        let threshold = catalog.iter().find(|c| c.feature == "Threshold").unwrap();
        assert_eq!(threshold.kind, ValueKind::Float);
        let area = catalog.iter().find(|c| c.object_name == "Nuclei").unwrap();
        assert_eq!(area.kind, ValueKind::Float);
    }

    #[test]
    fn builder_methods_grow_image_sets() {
        let mut m = InMemoryMeasurements::new(1);
        m.add_image_value(2, "Count_Cells", MeasurementValue::Integer(1))
            .add_object_values(2, "Cells", "Area", &[4.0]);
        assert_eq!(m.image_set_count(), 3);
        assert_eq!(m.object_values("Cells", "Area", 2), Some(vec![4.0]));
        assert_eq!(m.object_values("Cells", "Area", 0), None);
    }
}
