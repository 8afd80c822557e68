//! Table-definition and bulk-load statement text.
//!
//! The text produced here is read by bulk loaders and analysis tools, so it
//! must stay byte-stable for a given layout.

use super::{SchemaLayout, TableLayout};
use mx_common::{Error, Result};
use mx_config::{DatabaseType, ExportConfig};
use std::fmt::Write as _;

pub fn drop_table(name: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", name)
}

/// `CREATE TABLE` for one layout, keys first, primary key last.
pub fn create_table(table: &TableLayout) -> String {
    let mut statement = format!("CREATE TABLE {} (", table.name);
    for (i, column) in table.columns().iter().enumerate() {
        if i > 0 {
            statement.push(',');
        }
        let _ = write!(statement, "\n{} {}", column.column_id, column.kind.sql_type());
    }
    let keys: Vec<&str> = table.columns()[..table.key_len()]
        .iter()
        .map(|c| c.column_id.as_str())
        .collect();
    let _ = write!(statement, ",\nPRIMARY KEY ({}) )", keys.join(", "));
    statement
}

/// Drop and create statements, object table first.
pub fn schema_statements(layout: &SchemaLayout) -> Vec<String> {
    vec![
        drop_table(&layout.object.name),
        create_table(&layout.object),
        drop_table(&layout.image.name),
        create_table(&layout.image),
    ]
}

/// Names of the two data files a setup script loads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFiles {
    pub image: String,
    pub object: String,
}

impl DataFiles {
    pub fn for_base_name(config: &ExportConfig, base_name: &str) -> Self {
        Self {
            image: config.image_csv_name(base_name),
            object: config.object_csv_name(base_name),
        }
    }
}

fn load_data(file: &str, table: &str) -> String {
    format!(
        "LOAD DATA LOCAL INFILE '{}' REPLACE INTO TABLE {}\n\
         FIELDS TERMINATED BY ','\n\
         OPTIONALLY ENCLOSED BY '\"' ESCAPED BY '\\\\'",
        file, table
    )
}

/// MySQL script: select the database, define both tables, bulk-load both
/// data files.
pub fn mysql_setup_script(layout: &SchemaLayout, db_name: &str, files: &DataFiles) -> String {
    let mut script = String::new();
    let _ = writeln!(script, "CREATE DATABASE IF NOT EXISTS {};", db_name);
    let _ = writeln!(script, "USE {};", db_name);
    for statement in schema_statements(layout) {
        let _ = writeln!(script, "{};", statement);
    }
    let _ = writeln!(script, "{};", load_data(&files.image, &layout.image.name));
    let _ = writeln!(script, "{};", load_data(&files.object, &layout.object.name));
    script
}

/// SQLite script for the `sqlite3` shell.
pub fn sqlite_setup_script(layout: &SchemaLayout, files: &DataFiles) -> String {
    let mut script = String::new();
    for statement in schema_statements(layout) {
        let _ = writeln!(script, "{};", statement);
    }
    script.push_str(".mode csv\n");
    let _ = writeln!(script, ".import {} {}", files.image, layout.image.name);
    let _ = writeln!(script, ".import {} {}", files.object, layout.object.name);
    script
}

/// Setup script for the configured backend.
pub fn setup_script(
    layout: &SchemaLayout,
    config: &ExportConfig,
    files: &DataFiles,
) -> Result<String> {
    match config.db_type {
        DatabaseType::MySql => Ok(mysql_setup_script(layout, &config.db_name, files)),
        DatabaseType::Sqlite => Ok(sqlite_setup_script(layout, files)),
        DatabaseType::Oracle => Err(Error::UnsupportedBackend(config.db_type.to_string())),
    }
}
