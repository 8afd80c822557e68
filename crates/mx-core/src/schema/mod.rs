//! Table layout derivation for `Per_Image` and `Per_Object`.
//!
//! The layout is computed once per run from the column catalog and never
//! renumbered: every row the assembler produces is positional against it.
//!
//! ```text
//! Per_Object: ImageNumber, ObjectNumber, <obj>_<feat> ...          (catalog order)
//! Per_Image:  ImageNumber, Image_<feat> ...,                        (catalog order)
//!             <Agg>_<obj>_<feat> ...   for each object feature, every Agg
//! ```

pub mod ddl;

use crate::name_map::{ColumnNameMap, NameMapper};
use mx_common::{
    AggregateKind, ColumnDef, Error, Result, ValueKind, IMAGE, IMAGE_NUMBER, OBJECT_NUMBER,
};
use rand::Rng;
use std::collections::HashMap;
use tracing::info;

/// Where a column's values come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnOrigin {
    /// `ImageNumber` or `ObjectNumber`.
    Key,
    /// A measurement read straight from the source.
    Measurement { object_name: String, feature: String },
    /// A per-image statistic over an object measurement.
    Aggregate {
        kind: AggregateKind,
        object_name: String,
        feature: String,
    },
}

/// One column of a table layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Feature name as registered, e.g. `Mean_Nuclei_AreaShape_Area`.
    pub feature_name: String,
    /// Bounded column identifier used in SQL and file headers.
    pub column_id: String,
    pub kind: ValueKind,
    pub origin: ColumnOrigin,
}

impl ColumnSpec {
    fn key(name: &str) -> Self {
        Self {
            feature_name: name.to_string(),
            column_id: name.to_string(),
            kind: ValueKind::Integer,
            origin: ColumnOrigin::Key,
        }
    }
}

/// Ordered columns of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    pub name: String,
    columns: Vec<ColumnSpec>,
    positions: HashMap<String, usize>,
    key_len: usize,
}

impl TableLayout {
    fn new(name: String, keys: &[&str]) -> Self {
        let mut table = Self {
            name,
            columns: Vec::new(),
            positions: HashMap::new(),
            key_len: keys.len(),
        };
        for key in keys {
            table.push(ColumnSpec::key(key));
        }
        table
    }

    fn push(&mut self, column: ColumnSpec) {
        self.positions
            .insert(column.feature_name.clone(), self.columns.len());
        self.columns.push(column);
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Number of cells in a row of this table.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Number of leading key columns.
    pub fn key_len(&self) -> usize {
        self.key_len
    }

    /// Position of a feature's column.
    pub fn position(&self, feature_name: &str) -> Option<usize> {
        self.positions.get(feature_name).copied()
    }

    /// Column identifiers in order.
    pub fn column_ids(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.column_id.as_str()).collect()
    }

    /// Measurement columns with their positions.
    pub fn measurement_columns(&self) -> impl Iterator<Item = (usize, &ColumnSpec)> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| matches!(c.origin, ColumnOrigin::Measurement { .. }))
    }

    /// Aggregate columns with their positions.
    pub fn aggregate_columns(&self) -> impl Iterator<Item = (usize, &ColumnSpec)> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| matches!(c.origin, ColumnOrigin::Aggregate { .. }))
    }
}

/// Both table layouts of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaLayout {
    pub image: TableLayout,
    pub object: TableLayout,
    /// Object classes in catalog order.
    pub object_names: Vec<String>,
    pub aggregates: Vec<AggregateKind>,
}

impl SchemaLayout {
    /// Retained (object class, feature) pairs in object-table order.
    pub fn object_features(&self) -> impl Iterator<Item = (&str, &str)> {
        self.object.columns().iter().filter_map(|c| match &c.origin {
            ColumnOrigin::Measurement {
                object_name,
                feature,
            } => Some((object_name.as_str(), feature.as_str())),
            _ => None,
        })
    }
}

/// Derives ordered table layouts from a column catalog.
pub struct SchemaBuilder<'a> {
    catalog: &'a [ColumnDef],
    aggregates: Vec<AggregateKind>,
    table_prefix: String,
}

impl<'a> SchemaBuilder<'a> {
    pub fn new(catalog: &'a [ColumnDef], aggregates: &[AggregateKind]) -> Self {
        let mut kinds: Vec<AggregateKind> = aggregates.to_vec();
        kinds.sort();
        kinds.dedup();
        Self {
            catalog,
            aggregates: kinds,
            table_prefix: String::new(),
        }
    }

    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }

    pub fn image_table_name(&self) -> String {
        format!("{}Per_Image", self.table_prefix)
    }

    pub fn object_table_name(&self) -> String {
        format!("{}Per_Object", self.table_prefix)
    }

    /// Object classes in order of first appearance, excluding `Image` and
    /// `Experiment`.
    pub fn object_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for def in self.catalog.iter().filter(|d| d.is_object()) {
            if !names.contains(&def.object_name) {
                names.push(def.object_name.clone());
            }
        }
        names
    }

    fn retained_image_defs(&self) -> impl Iterator<Item = &'a ColumnDef> {
        self.catalog
            .iter()
            .filter(|d| d.is_image() && d.is_retained())
    }

    /// Retained object definitions grouped by object class, catalog order
    /// within each class.
    fn retained_object_defs(&self) -> Vec<&'a ColumnDef> {
        let mut defs = Vec::new();
        for object_name in self.object_names() {
            defs.extend(
                self.catalog
                    .iter()
                    .filter(|d| d.object_name == object_name && d.is_retained()),
            );
        }
        defs
    }

    /// Every feature name the layout will need an identifier for.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .retained_image_defs()
            .map(ColumnDef::feature_name)
            .collect();
        let object_defs = self.retained_object_defs();
        names.extend(object_defs.iter().map(|d| d.feature_name()));
        for def in &object_defs {
            for kind in &self.aggregates {
                names.push(kind.feature_name(&def.object_name, &def.feature));
            }
        }
        names
    }

    /// Register every feature name with `mapper`.
    pub fn register_names<R: Rng>(&self, mapper: &mut NameMapper<R>) {
        for name in self.feature_names() {
            mapper.register(name);
        }
    }

    /// Build both layouts using identifiers from `names`.
    pub fn build(&self, names: &ColumnNameMap) -> Result<SchemaLayout> {
        let keys = [IMAGE_NUMBER, OBJECT_NUMBER];
        let mut object = TableLayout::new(self.object_table_name(), &keys);
        let object_defs = self.retained_object_defs();
        for def in &object_defs {
            let feature_name = def.feature_name();
            let column_id = names.resolve(&feature_name)?.to_string();
            object.push(ColumnSpec {
                feature_name,
                column_id,
                kind: def.kind,
                origin: ColumnOrigin::Measurement {
                    object_name: def.object_name.clone(),
                    feature: def.feature.clone(),
                },
            });
        }

        let mut image = TableLayout::new(self.image_table_name(), &[IMAGE_NUMBER]);
        for def in self.retained_image_defs() {
            let feature_name = def.feature_name();
            let column_id = names.resolve(&feature_name)?.to_string();
            image.push(ColumnSpec {
                feature_name,
                column_id,
                kind: def.kind,
                origin: ColumnOrigin::Measurement {
                    object_name: IMAGE.to_string(),
                    feature: def.feature.clone(),
                },
            });
        }
        for def in &object_defs {
            for kind in &self.aggregates {
                let feature_name = kind.feature_name(&def.object_name, &def.feature);
                let column_id = names.resolve(&feature_name)?.to_string();
                image.push(ColumnSpec {
                    feature_name,
                    column_id,
                    kind: ValueKind::Float,
                    origin: ColumnOrigin::Aggregate {
                        kind: *kind,
                        object_name: def.object_name.clone(),
                        feature: def.feature.clone(),
                    },
                });
            }
        }

        check_unique(&image)?;
        check_unique(&object)?;

        info!(
            image_columns = image.width(),
            object_columns = object.width(),
            aggregates = self.aggregates.len(),
            "derived table layouts"
        );

        Ok(SchemaLayout {
            image,
            object,
            object_names: self.object_names(),
            aggregates: self.aggregates.clone(),
        })
    }
}

/// A catalog listing the same feature twice would give two cells one
/// column identifier.
fn check_unique(table: &TableLayout) -> Result<()> {
    if table.positions.len() != table.columns.len() {
        return Err(Error::Schema(format!(
            "duplicate feature in {} column catalog",
            table.name
        )));
    }
    Ok(())
}
