//! Literal formatting for SQL statements and delimited files.
//!
//! MySQL reads backslash escapes both in string literals and in files
//! loaded with `ESCAPED BY '\\'`. SQLite treats backslashes literally and
//! only doubles the quote character.

use mx_common::CellValue;
use mx_config::DatabaseType;

/// Escape text for a single-quoted MySQL string literal.
pub fn escape_mysql(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\x1a' => out.push_str("\\Z"),
            c => out.push(c),
        }
    }
    out
}

/// Escape text for a single-quoted standard SQL literal.
pub fn escape_sqlite(s: &str) -> String {
    s.replace('\'', "''")
}

/// SQL literal: numbers bare, text escaped for `db_type` and quoted,
/// `NULL` for null.
pub fn sql_literal(cell: &CellValue, db_type: DatabaseType) -> String {
    match cell {
        CellValue::Text(s) => match db_type {
            DatabaseType::MySql => format!("'{}'", escape_mysql(s)),
            _ => format!("'{}'", escape_sqlite(s)),
        },
        CellValue::Null => "NULL".to_string(),
        numeric => numeric.to_string(),
    }
}

/// Delimited-file field. Text is always quoted; numbers only when `quote`
/// is set. Null is the bulk loaders' `\N`.
pub fn csv_field(cell: &CellValue, quote: bool, db_type: DatabaseType) -> String {
    match cell {
        CellValue::Null => "\\N".to_string(),
        CellValue::Text(s) => match db_type {
            DatabaseType::MySql => format!("\"{}\"", escape_mysql(s)),
            _ => format!("\"{}\"", s.replace('"', "\"\"")),
        },
        numeric if quote => format!("\"{}\"", numeric),
        numeric => numeric.to_string(),
    }
}

/// One delimited line without the terminator.
pub fn csv_line(cells: &[CellValue], quote_all: bool, db_type: DatabaseType) -> String {
    cells
        .iter()
        .map(|cell| csv_field(cell, quote_all, db_type))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    const MYSQL: DatabaseType = DatabaseType::MySql;
    const SQLITE: DatabaseType = DatabaseType::Sqlite;

    #[test]
    fn mysql_escapes_quotes_and_controls() {
        assert_eq!(escape_mysql("it's"), "it\\'s");
        assert_eq!(escape_mysql("a\"b"), "a\\\"b");
        assert_eq!(escape_mysql("C:\\img\n"), "C:\\\\img\\n");
        assert_eq!(escape_mysql("x\0y\x1a"), "x\\0y\\Z");
        assert_eq!(escape_mysql("plain.tif"), "plain.tif");
    }

    #[test]
    fn sqlite_doubles_quotes_and_keeps_backslashes() {
        assert_eq!(escape_sqlite("it's"), "it''s");
        assert_eq!(escape_sqlite("C:\\img\\a.tif"), "C:\\img\\a.tif");
        assert_eq!(escape_sqlite("line\nbreak"), "line\nbreak");
    }

    #[test]
    fn sql_literals() {
        assert_eq!(sql_literal(&CellValue::Integer(3), MYSQL), "3");
        assert_eq!(sql_literal(&CellValue::Float(1.0), SQLITE), "1.0");
        assert_eq!(sql_literal(&CellValue::Text("o'k".into()), MYSQL), "'o\\'k'");
        assert_eq!(sql_literal(&CellValue::Text("it's.tif".into()), SQLITE), "'it''s.tif'");
        assert_eq!(sql_literal(&CellValue::Null, SQLITE), "NULL");
    }

    #[test]
    fn image_lines_quote_everything() {
        let cells = vec![
            CellValue::Integer(1),
            CellValue::Float(2.5),
            CellValue::Text("say \"hi\"".into()),
        ];
        assert_eq!(csv_line(&cells, true, SQLITE), "\"1\",\"2.5\",\"say \"\"hi\"\"\"");
        assert_eq!(csv_line(&cells, true, MYSQL), "\"1\",\"2.5\",\"say \\\"hi\\\"\"");
    }

    #[test]
    fn object_lines_quote_only_text() {
        let cells = vec![
            CellValue::Integer(1),
            CellValue::Integer(2),
            CellValue::Float(0.0),
            CellValue::Text("edge".into()),
            CellValue::Null,
        ];
        assert_eq!(csv_line(&cells, false, MYSQL), "1,2,0.0,\"edge\",\\N");
    }

    #[test]
    fn backslash_paths_survive_mysql_load_escaping() {
        let path = CellValue::Text("C:\\images\\a.tif".into());
        assert_eq!(csv_field(&path, true, MYSQL), "\"C:\\\\images\\\\a.tif\"");
        assert_eq!(csv_field(&path, true, SQLITE), "\"C:\\images\\a.tif\"");
    }
}
