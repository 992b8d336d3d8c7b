//! Dataset assembly and loading.
//!
//! A dataset is a semicolon-delimited text table. The first line is the
//! sorted union of feature names seen by the batch that created the file,
//! plus the trailing label column; every further line is one record, with
//! missing features rendered as empty fields.
use crate::analyser::containers::FeatureRecord;
use crate::errors::Error;
use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Name of the ground-truth column appended to every row.
pub const LABEL_COLUMN: &str = "is_malicious";

/// Field separator. Extractor values are numeric, boolean or short strings,
/// so no quoting or escaping is applied.
pub const DELIMITER: &str = ";";

/// Writes a batch of feature records plus their label to a dataset file.
///
/// The column set is the lexicographically sorted union of the feature names
/// in this batch only. When appending, the destination must already exist
/// with a header from a prior non-append call; the existing header is reused
/// as-is, and a batch introducing unseen feature names will misalign against
/// it undetected.
pub fn dump_records(
    records: &[FeatureRecord],
    destination: &Path,
    label: i64,
    append: bool,
) -> Result<(), Error> {
    let mut features: BTreeSet<&str> = BTreeSet::new();
    for record in records {
        features.extend(record.keys().map(String::as_str));
    }
    let columns: Vec<&str> = features.into_iter().collect();

    // Append opens in strictly-append mode, so every write lands at
    // end-of-file even if the file is concurrently longer than expected.
    let file = if append {
        OpenOptions::new().append(true).open(destination)?
    } else {
        File::create(destination)?
    };
    let mut writer = BufWriter::new(file);

    if !append {
        writeln!(
            writer,
            "{}{DELIMITER}{LABEL_COLUMN}",
            columns.join(DELIMITER)
        )?;
    }

    for record in records {
        let fields: Vec<String> = columns
            .iter()
            .map(|column| {
                record
                    .get(*column)
                    .map(|value| value.to_string())
                    .unwrap_or_default()
            })
            .collect();
        writeln!(writer, "{}{DELIMITER}{label}", fields.join(DELIMITER))?;
    }

    writer.flush()?;
    log::info!(
        "Wrote {} rows ({} columns, label {label}) to {}",
        records.len(),
        columns.len(),
        destination.display()
    );

    Ok(())
}

/// An in-memory view of a loaded dataset table.
#[derive(Debug)]
pub struct Table {
    pub columns: Vec<String>,
    /// One row per record; None marks a missing (empty) cell.
    pub rows: Vec<Vec<Option<f64>>>,
}

/// Reads only the header line of a dataset, yielding its column order.
pub fn load_columns(path: &Path) -> Result<Vec<String>, Error> {
    let file = File::open(path)?;
    let mut header = String::new();
    BufReader::new(file).read_line(&mut header)?;

    let header = header.trim_end();
    if header.is_empty() {
        return Err(Error::DatasetMalformed {
            path: path.display().to_string(),
            reason: "missing header line".to_string(),
        });
    }

    Ok(header.split(DELIMITER).map(str::to_string).collect())
}

/// Loads the full table.
///
/// Cells parse as: empty means missing, `true`/`false` map to 1/0, anything
/// else is read as a number; unparseable cells are treated as missing. Rows
/// whose field count does not match the header are skipped with a warning.
pub fn load_table(path: &Path) -> Result<Table, Error> {
    let text = fs::read_to_string(path)?;
    let mut lines = text.lines();

    let header = lines.next().filter(|line| !line.is_empty()).ok_or_else(|| {
        Error::DatasetMalformed {
            path: path.display().to_string(),
            reason: "missing header line".to_string(),
        }
    })?;
    let columns: Vec<String> = header.split(DELIMITER).map(str::to_string).collect();

    let mut rows = Vec::new();
    for (number, line) in lines.enumerate() {
        if line.is_empty() {
            continue;
        }
        let row: Vec<Option<f64>> = line.split(DELIMITER).map(parse_cell).collect();
        if row.len() != columns.len() {
            log::warn!(
                "Skipping row {} of {}: {} fields, expected {}",
                number + 2,
                path.display(),
                row.len(),
                columns.len()
            );
            continue;
        }
        rows.push(row);
    }

    Ok(Table { columns, rows })
}

fn parse_cell(cell: &str) -> Option<f64> {
    match cell {
        "" => None,
        "true" | "True" => Some(1.0),
        "false" | "False" => Some(0.0),
        _ => cell.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyser::containers::FeatureValue;
    use std::collections::BTreeMap;

    fn record(pairs: &[(&str, i64)]) -> FeatureRecord {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), FeatureValue::Int(*value)))
            .collect::<BTreeMap<_, _>>()
    }

    #[test]
    fn header_is_sorted_batch_union_plus_label() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("network.csv");

        let records = vec![record(&[("a", 1), ("b", 2)]), record(&[("a", 3)])];
        dump_records(&records, &path, 1, false).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, "a;b;is_malicious\n1;2;1\n3;;1\n");
    }

    #[test]
    fn non_append_writes_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("one.csv");
        let second = dir.path().join("two.csv");

        let records = vec![record(&[("x", 7), ("y", 9)]), record(&[("y", 1)])];
        dump_records(&records, &first, 0, false).unwrap();
        dump_records(&records, &second, 0, false).unwrap();

        assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
    }

    #[test]
    fn append_adds_rows_after_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("network.csv");

        dump_records(&[record(&[("a", 1), ("b", 2)])], &path, 1, false).unwrap();
        dump_records(&[record(&[("a", 5), ("b", 6)])], &path, 0, true).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, "a;b;is_malicious\n1;2;1\n5;6;0\n");
    }

    #[test]
    fn append_to_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.csv");
        assert!(dump_records(&[record(&[("a", 1)])], &path, 0, true).is_err());
    }

    #[test]
    fn round_trip_preserves_values_and_label() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("network.csv");

        let mut with_bool = record(&[("packet_length", 74)]);
        with_bool.insert(
            "has_file_payload".to_string(),
            FeatureValue::Bool(true),
        );
        let records = vec![with_bool, record(&[("packet_length", 60)])];
        dump_records(&records, &path, 1, false).unwrap();

        let table = load_table(&path).unwrap();
        assert_eq!(
            table.columns,
            vec!["has_file_payload", "packet_length", "is_malicious"]
        );
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0], vec![Some(1.0), Some(74.0), Some(1.0)]);
        // Missing cell comes back as missing, label stays uniform.
        assert_eq!(table.rows[1], vec![None, Some(60.0), Some(1.0)]);
    }

    #[test]
    fn load_columns_reads_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("network.csv");
        dump_records(&[record(&[("a", 1), ("b", 2)])], &path, 1, false).unwrap();

        let columns = load_columns(&path).unwrap();
        assert_eq!(columns, vec!["a", "b", "is_malicious"]);
    }

    #[test]
    fn empty_file_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        fs::write(&path, "").unwrap();

        assert!(matches!(
            load_table(&path),
            Err(Error::DatasetMalformed { .. })
        ));
        assert!(matches!(
            load_columns(&path),
            Err(Error::DatasetMalformed { .. })
        ));
    }

    #[test]
    fn short_rows_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drift.csv");
        fs::write(&path, "a;b;is_malicious\n1;2;1\n9;0\n").unwrap();

        let table = load_table(&path).unwrap();
        assert_eq!(table.rows.len(), 1);
    }
}
