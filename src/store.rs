use crate::error::{FaqKitError, Result};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

const UTF8_BOM: char = '\u{feff}';

fn display(path: &Path) -> String {
    path.display().to_string()
}

fn read_text(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(FaqKitError::InputNotFound {
            path: display(path),
        });
    }

    let content = fs::read_to_string(path)?;
    Ok(content.trim_start_matches(UTF8_BOM).to_string())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = read_text(path)?;
    serde_json::from_str(&content).map_err(|e| FaqKitError::Parse {
        path: display(path),
        message: e.to_string(),
    })
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    write_atomic(path, json.as_bytes())
}

/// Write through a temp file in the target directory, then rename over the target.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| FaqKitError::Io(e.error))?;

    debug!(path = %path.display(), bytes = bytes.len(), "wrote file");
    Ok(())
}

/// Read the non-empty cells of one CSV column, selected by header name.
pub fn read_csv_column(path: &Path, column: &str) -> Result<Vec<String>> {
    let content = read_text(path)?;
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader.headers().map_err(|e| parse_error(path, e))?.clone();
    let index = headers
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| FaqKitError::MissingColumn {
            path: display(path),
            column: column.to_string(),
        })?;

    let mut values = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| parse_error(path, e))?;
        if let Some(value) = record.get(index) {
            if !value.is_empty() {
                values.push(value.to_string());
            }
        }
    }

    Ok(values)
}

pub fn write_csv_column(path: &Path, header: &str, values: &[String]) -> Result<()> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer.write_record([header])?;
    for value in values {
        writer.write_record([value])?;
    }
    finish_csv(path, writer)
}

pub fn write_csv_records<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    for record in records {
        writer.serialize(record)?;
    }
    finish_csv(path, writer)
}

fn finish_csv(path: &Path, writer: csv::Writer<Vec<u8>>) -> Result<()> {
    let bytes = writer.into_inner().map_err(|e| FaqKitError::Io(e.into_error()))?;
    write_atomic(path, &bytes)
}

fn parse_error(path: &Path, error: csv::Error) -> FaqKitError {
    FaqKitError::Parse {
        path: display(path),
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Row {
        name: String,
        count: u32,
    }

    #[test]
    fn test_missing_file_is_input_not_found() {
        let dir = TempDir::new().unwrap();
        let result: Result<Vec<Row>> = read_json(&dir.path().join("nope.json"));
        assert!(matches!(result, Err(FaqKitError::InputNotFound { .. })));
    }

    #[test]
    fn test_json_round_trip_creates_parent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("rows.json");
        let rows = vec![Row {
            name: "Klinkerdäck®".to_string(),
            count: 2,
        }];

        write_json(&path, &rows).unwrap();
        let loaded: Vec<Row> = read_json(&path).unwrap();
        assert_eq!(loaded, rows);

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("Klinkerdäck®"));
    }

    #[test]
    fn test_invalid_json_names_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let error = read_json::<Vec<Row>>(&path).unwrap_err();
        match error {
            FaqKitError::Parse { path: p, .. } => assert!(p.ends_with("broken.json")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_csv_column_with_bom() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keywords.csv");
        fs::write(&path, "\u{feff}SE,EN\nKlinker, Clinker\n,Empty\n Betong ,Concrete\n").unwrap();

        let values = read_csv_column(&path, "SE").unwrap();
        assert_eq!(values, vec!["Klinker", "Betong"]);

        let missing = read_csv_column(&path, "DA").unwrap_err();
        assert!(matches!(missing, FaqKitError::MissingColumn { .. }));
    }

    #[test]
    fn test_csv_writers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");

        write_csv_column(&path, "SE", &["a, b".to_string(), "c".to_string()]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "SE\n\"a, b\"\nc\n");

        write_csv_records(
            &path,
            &[Row {
                name: "x".to_string(),
                count: 1,
            }],
        )
        .unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "name,count\nx,1\n");
    }
}
