//! CSV snapshot reader backed by the `csv` crate.

use std::fs::File;

use csv::{ReaderBuilder, Trim};

use super::{ReadError, SnapshotReader};
use crate::config::CsvConfig;
use crate::types::{Record, ResourceId, Snapshot};

/// Reads a CSV file as one record per row.
///
/// With a header row, column names come from the header. Without one,
/// columns are named by position (`"0"`, `"1"`, ...). Short rows are
/// padded with empty values and extra trailing fields are dropped.
#[derive(Debug, Clone)]
pub struct CsvSnapshotReader {
    delimiter: u8,
    has_header: bool,
    trim: bool,
}

impl CsvSnapshotReader {
    pub fn new(config: &CsvConfig) -> Self {
        let delimiter = config.delimiter_byte().unwrap_or_else(|| {
            tracing::warn!(
                "[csv-reader] delimiter {:?} is not a single ASCII byte, using ','",
                config.delimiter
            );
            b','
        });

        Self {
            delimiter,
            has_header: config.has_header,
            trim: config.trim,
        }
    }

    fn builder(&self) -> ReaderBuilder {
        let mut builder = ReaderBuilder::new();
        builder
            .delimiter(self.delimiter)
            .has_headers(self.has_header)
            .flexible(true)
            .trim(if self.trim { Trim::All } else { Trim::None });
        builder
    }
}

impl Default for CsvSnapshotReader {
    fn default() -> Self {
        Self::new(&CsvConfig::default())
    }
}

impl SnapshotReader for CsvSnapshotReader {
    fn name(&self) -> &str {
        "csv"
    }

    fn read(&self, resource: &ResourceId) -> Result<Snapshot, ReadError> {
        let file = File::open(resource.as_path()).map_err(|e| ReadError::unavailable(resource, e))?;
        let mut reader = self.builder().from_reader(file);

        let header: Option<Vec<String>> = if self.has_header {
            let header = reader
                .headers()
                .map_err(|e| ReadError::unavailable(resource, e))?;
            Some(header.iter().map(str::to_string).collect())
        } else {
            None
        };

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row.map_err(|e| ReadError::unavailable(resource, e))?;

            let record = match &header {
                Some(columns) => columns
                    .iter()
                    .enumerate()
                    .map(|(i, column)| (column.clone(), row.get(i).unwrap_or("").to_string()))
                    .collect::<Record>(),
                None => row
                    .iter()
                    .enumerate()
                    .map(|(i, value)| (i.to_string(), value.to_string()))
                    .collect::<Record>(),
            };
            records.push(record);
        }

        crate::debug_event!(
            "csv-reader",
            "read",
            "{} rows from {resource}",
            records.len()
        );

        Ok(Snapshot::new(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_csv(dir: &TempDir, name: &str, content: &str) -> ResourceId {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        ResourceId::from(path)
    }

    #[test]
    fn test_read_with_header() {
        let dir = TempDir::new().unwrap();
        let id = write_csv(&dir, "a.csv", "id,val\n1,a\n2,b\n");

        let snapshot = CsvSnapshotReader::default().read(&id).unwrap();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(
            snapshot.records()[0],
            Record::from_pairs([("id", "1"), ("val", "a")])
        );
        assert_eq!(snapshot.records()[1].get("val"), Some("b"));
    }

    #[test]
    fn test_read_header_only_is_empty() {
        let dir = TempDir::new().unwrap();
        let id = write_csv(&dir, "a.csv", "id,val\n");

        let snapshot = CsvSnapshotReader::default().read(&id).unwrap();
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_short_rows_are_padded() {
        let dir = TempDir::new().unwrap();
        let id = write_csv(&dir, "a.csv", "id,val,note\n1,a\n");

        let snapshot = CsvSnapshotReader::default().read(&id).unwrap();
        assert_eq!(snapshot.records()[0].get("note"), Some(""));
        assert_eq!(snapshot.records()[0].len(), 3);
    }

    #[test]
    fn test_read_without_header_uses_positions() {
        let dir = TempDir::new().unwrap();
        let id = write_csv(&dir, "a.csv", "1;a\n2;b\n");

        let config = CsvConfig {
            delimiter: ';',
            has_header: false,
            trim: false,
        };
        let snapshot = CsvSnapshotReader::new(&config).read(&id).unwrap();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(
            snapshot.records()[1],
            Record::from_pairs([("0", "2"), ("1", "b")])
        );
    }

    #[test]
    fn test_trim_fields() {
        let dir = TempDir::new().unwrap();
        let id = write_csv(&dir, "a.csv", "id, val\n1,  a \n");

        let config = CsvConfig {
            trim: true,
            ..CsvConfig::default()
        };
        let snapshot = CsvSnapshotReader::new(&config).read(&id).unwrap();
        assert_eq!(snapshot.records()[0].get("val"), Some("a"));
    }

    #[test]
    fn test_changed_header_yields_new_columns() {
        let dir = TempDir::new().unwrap();
        let id = write_csv(&dir, "a.csv", "id,val\n1,a\n");
        let reader = CsvSnapshotReader::default();
        let first = reader.read(&id).unwrap();

        fs::write(id.as_path(), "id,value\n1,a\n").unwrap();
        let second = reader.read(&id).unwrap();

        assert_ne!(first.records()[0], second.records()[0]);
        assert_eq!(second.records()[0].get("value"), Some("a"));
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let id = ResourceId::from(dir.path().join("missing.csv"));

        let err = CsvSnapshotReader::default().read(&id).unwrap_err();
        assert!(matches!(err, ReadError::ResourceUnavailable { .. }));
    }
}
