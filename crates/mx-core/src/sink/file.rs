//! Delimited-file output plus the setup script that loads it.

use super::escape::csv_line;
use super::RowSink;
use crate::schema::ddl::{setup_script, DataFiles};
use crate::schema::SchemaLayout;
use mx_common::{Error, ImageRow, ObjectRow, Result};
use mx_config::{DatabaseType, ExportConfig};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Appends image rows and object rows to two delimited files.
///
/// Image lines quote every field and object lines quote only text. Bulk
/// loaders downstream depend on that asymmetry. Text is escaped for the
/// loader of `db_type` (MySQL unless set).
pub struct FileSink<W: Write> {
    image: W,
    object: W,
    db_type: DatabaseType,
    image_rows: usize,
    object_rows: usize,
}

impl<W: Write> FileSink<W> {
    pub fn new(image: W, object: W) -> Self {
        Self {
            image,
            object,
            db_type: DatabaseType::default(),
            image_rows: 0,
            object_rows: 0,
        }
    }

    pub fn with_db_type(mut self, db_type: DatabaseType) -> Self {
        self.db_type = db_type;
        self
    }

    pub fn image_rows(&self) -> usize {
        self.image_rows
    }

    pub fn object_rows(&self) -> usize {
        self.object_rows
    }

    pub fn into_inner(self) -> (W, W) {
        (self.image, self.object)
    }
}

/// Paths written by [`FileSink::create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutputs {
    pub image: PathBuf,
    pub object: PathBuf,
    pub setup_script: PathBuf,
}

impl FileSink<BufWriter<File>> {
    /// Write the setup script into `dir` and open both data files beside it.
    pub fn create(
        dir: &Path,
        config: &ExportConfig,
        layout: &SchemaLayout,
        base_name: &str,
    ) -> Result<(Self, FileOutputs)> {
        let files = DataFiles::for_base_name(config, base_name);
        let script = setup_script(layout, config, &files)?;
        fs::create_dir_all(dir)?;

        let outputs = FileOutputs {
            image: dir.join(&files.image),
            object: dir.join(&files.object),
            setup_script: dir.join(config.setup_file_name()),
        };
        fs::write(&outputs.setup_script, script)?;
        let sink = Self::new(
            BufWriter::new(File::create(&outputs.image)?),
            BufWriter::new(File::create(&outputs.object)?),
        )
        .with_db_type(config.db_type);
        info!(
            image = %outputs.image.display(),
            object = %outputs.object.display(),
            setup = %outputs.setup_script.display(),
            "opened delimited output"
        );
        Ok((sink, outputs))
    }
}

impl<W: Write> RowSink for FileSink<W> {
    fn write_image_row(&mut self, row: &ImageRow) -> Result<()> {
        writeln!(self.image, "{}", csv_line(&row.cells, true, self.db_type))
            .map_err(|e| sink_error("image", e))?;
        self.image_rows += 1;
        Ok(())
    }

    fn write_object_rows(&mut self, rows: &[ObjectRow]) -> Result<()> {
        for row in rows {
            writeln!(self.object, "{}", csv_line(&row.cells, false, self.db_type))
                .map_err(|e| sink_error("object", e))?;
        }
        self.object_rows += rows.len();
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.image.flush().map_err(|e| sink_error("image", e))?;
        self.object.flush().map_err(|e| sink_error("object", e))?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.flush()
    }
}

fn sink_error(file: &str, err: std::io::Error) -> Error {
    Error::Sink(format!("{} file: {}", file, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name_map::NameMapper;
    use crate::schema::SchemaBuilder;
    use mx_common::{CellValue, ColumnDef, ImageNumber, ObjectNumber, ValueKind, IMAGE};

    fn layout() -> SchemaLayout {
        let defs = vec![
            ColumnDef::new(IMAGE, "Count_Nuclei", ValueKind::Integer),
            ColumnDef::new("Nuclei", "AreaShape_Area", ValueKind::Float),
        ];
        let builder = SchemaBuilder::new(&defs, &[]);
        let mut mapper = NameMapper::with_seed(64, 0);
        builder.register_names(&mut mapper);
        builder.build(&mapper.freeze().unwrap()).unwrap()
    }

    #[test]
    fn lines_follow_quoting_rules() {
        let mut sink = FileSink::new(Vec::new(), Vec::new());
        let mut image = ImageRow::new(ImageNumber(1), 2);
        image.cells[1] = CellValue::Integer(2);
        sink.write_image_row(&image).unwrap();
        let objects: Vec<ObjectRow> = (0..2)
            .map(|slot| {
                ObjectRow::new(
                    ImageNumber(1),
                    ObjectNumber::from_slot(slot),
                    3,
                    CellValue::Float(1.5),
                )
            })
            .collect();
        sink.write_object_rows(&objects).unwrap();
        sink.finish().unwrap();
        assert_eq!(sink.image_rows(), 1);
        assert_eq!(sink.object_rows(), 2);

        let (image, object) = sink.into_inner();
        assert_eq!(String::from_utf8(image).unwrap(), "\"1\",\"2\"\n");
        assert_eq!(String::from_utf8(object).unwrap(), "1,1,1.5\n1,2,1.5\n");
    }

    #[test]
    fn create_writes_setup_script() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let config = ExportConfig::default();
        let (mut sink, outputs) = FileSink::create(&out, &config, &layout(), "SQL_1_1").unwrap();
        sink.write_image_row(&ImageRow::new(ImageNumber(1), 2)).unwrap();
        sink.finish().unwrap();

        assert_eq!(outputs.setup_script, out.join("SQL__SETUP.SQL"));
        let script = fs::read_to_string(&outputs.setup_script).unwrap();
        assert!(script.contains("CREATE TABLE Per_Object"));
        assert!(script.contains("LOAD DATA LOCAL INFILE 'SQL_1_1_image.CSV'"));
        assert_eq!(fs::read_to_string(&outputs.image).unwrap(), "\"1\",\\N\n");
        assert_eq!(fs::read_to_string(&outputs.object).unwrap(), "");
    }

    #[test]
    fn mysql_text_escapes_backslashes_for_load_data() {
        let mut sink = FileSink::new(Vec::new(), Vec::new());
        let mut image = ImageRow::new(ImageNumber(1), 2);
        image.cells[1] = CellValue::Text("C:\\images\\a.tif".into());
        sink.write_image_row(&image).unwrap();
        let (image, _) = sink.into_inner();
        assert_eq!(String::from_utf8(image).unwrap(), "\"1\",\"C:\\\\images\\\\a.tif\"\n");
    }

    #[test]
    fn sqlite_text_is_imported_literally() {
        let mut sink = FileSink::new(Vec::new(), Vec::new()).with_db_type(DatabaseType::Sqlite);
        let mut image = ImageRow::new(ImageNumber(1), 2);
        image.cells[1] = CellValue::Text("C:\\images\\a.tif".into());
        sink.write_image_row(&image).unwrap();
        let (image, _) = sink.into_inner();
        assert_eq!(String::from_utf8(image).unwrap(), "\"1\",\"C:\\images\\a.tif\"\n");
    }

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("no space left on device"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_failure_is_a_sink_error() {
        let mut sink = FileSink::new(FullDisk, FullDisk);
        let err = sink.write_image_row(&ImageRow::new(ImageNumber(1), 2)).unwrap_err();
        assert!(matches!(err, Error::Sink(ref msg) if msg.starts_with("image file")));
        assert_eq!(sink.image_rows(), 0);
    }
}
