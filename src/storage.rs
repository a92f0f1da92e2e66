use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;

use log::{debug, warn};

use crate::{
    error::{Result, StorageError},
    source::StorageSource,
    table::Table,
    types::Float,
};

const END_HEADER: &str = "endheader";
const DEFAULT_TIME_LABEL: &str = "time";

/// Header keys the writer always emits itself.
const GENERATED_KEYS: [&str; 4] = ["version", "nRows", "nColumns", "inDegrees"];

/// A parsed storage file: header metadata, column labels, time column and rows.
///
/// Text layout:
///
/// ```text
/// state
/// version=1
/// nRows=2
/// nColumns=2
/// inDegrees=no
/// endheader
/// time    /neuron/v
/// 0       -0.07
/// 0.001   -0.0693
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Storage {
    name: Option<String>,
    header: Vec<(String, String)>,
    time_label: String,
    labels: Vec<String>,
    times: Vec<Float>,
    rows: Vec<Vec<Float>>,
}

impl Storage {
    /// Build an in-memory storage, checking that the time column and every
    /// row agree with the labels.
    pub fn new(labels: Vec<String>, times: Vec<Float>, rows: Vec<Vec<Float>>) -> Result<Self> {
        if times.len() != rows.len() {
            return Err(StorageError::inconsistent_length(
                "time column",
                rows.len(),
                times.len(),
            ));
        }
        if let Some((i, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != labels.len())
        {
            return Err(StorageError::inconsistent_length(
                format!("row {}", i),
                labels.len(),
                row.len(),
            ));
        }

        Ok(Self::from_parts(labels, times, rows))
    }

    /// Build an in-memory storage without any consistency check.
    /// Mismatched lengths are reported when the storage is read into a table.
    pub fn from_parts(labels: Vec<String>, times: Vec<Float>, rows: Vec<Vec<Float>>) -> Self {
        Storage {
            name: None,
            header: vec![],
            time_label: DEFAULT_TIME_LABEL.to_string(),
            labels,
            times,
            rows,
        }
    }

    /// Turn a table back into a storage, dropping the synthetic time column
    /// from the labels.
    pub fn from_table(table: &Table) -> Self {
        let labels = table.column_names().iter().skip(1).cloned().collect();
        let rows = table.rows().iter().map(|row| row[1..].to_vec()).collect();
        Self::from_parts(labels, table.index().to_vec(), rows)
    }

    /// Name written on the first header line. The name must survive a
    /// write and re-parse, so it cannot be empty, carry surrounding
    /// whitespace, span lines, contain `=`, or be the `endheader` keyword.
    pub fn with_name(mut self, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty()
            || name.trim() != name
            || name.contains(['=', '\n', '\r'])
            || name.eq_ignore_ascii_case(END_HEADER)
        {
            return Err(StorageError::invalid_argument(format!(
                "storage name {:?} cannot be written as a header line",
                name
            )));
        }
        self.name = Some(name);
        Ok(self)
    }

    /// Set a header entry, replacing an existing one with the same key.
    pub fn with_header_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.header.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.header.push((key, value)),
        }
        self
    }

    /// Read and parse a storage file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let origin = path.as_ref().display().to_string();
        let file = fs::File::open(path.as_ref())
            .map_err(|e| StorageError::source_unavailable(origin.as_str(), e))?;
        Self::from_reader(file, &origin)
    }

    /// Parse a storage from any reader; `origin` names the source in errors.
    pub fn from_reader<R: Read>(mut reader: R, origin: &str) -> Result<Self> {
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(|e| StorageError::source_unavailable(origin, e))?;
        parse(&text, origin)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Header entries in file order, excluding the name line.
    pub fn header(&self) -> &[(String, String)] {
        &self.header
    }

    pub fn header_value(&self, key: &str) -> Option<&str> {
        self.header
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Whether angular values are stored in degrees.
    pub fn in_degrees(&self) -> bool {
        self.header_value("inDegrees")
            .is_some_and(|v| v.eq_ignore_ascii_case("yes"))
    }

    /// Header of the time column as written in the file.
    pub fn time_label(&self) -> &str {
        &self.time_label
    }

    /// Serialize in the storage text format. A nameless storage is written
    /// without a name line.
    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        if let Some(name) = &self.name {
            writeln!(writer, "{}", name)?;
        }
        writeln!(writer, "version=1")?;
        writeln!(writer, "nRows={}", self.rows.len())?;
        writeln!(writer, "nColumns={}", self.labels.len() + 1)?;
        writeln!(
            writer,
            "inDegrees={}",
            if self.in_degrees() { "yes" } else { "no" }
        )?;
        for (key, value) in self
            .header
            .iter()
            .filter(|(k, _)| !GENERATED_KEYS.contains(&k.as_str()))
        {
            writeln!(writer, "{}={}", key, value)?;
        }
        writeln!(writer, "{}", END_HEADER)?;

        let mut columns = vec![self.time_label.as_str()];
        columns.extend(self.labels.iter().map(String::as_str));
        writeln!(writer, "{}", columns.join("\t"))?;

        for (time, row) in self.times.iter().zip(self.rows.iter()) {
            write!(writer, "{}", time)?;
            for value in row {
                write!(writer, "\t{}", value)?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }

    /// Write the storage to a file, replacing any existing one.
    pub fn write_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let origin = path.display().to_string();
        let mut file = fs::File::create(path)
            .map_err(|e| StorageError::source_unavailable(origin.as_str(), e))?;
        self.write(&mut file)
            .map_err(|e| StorageError::source_unavailable(origin.as_str(), e))?;
        debug!("wrote {} rows to {}", self.rows.len(), origin);
        Ok(())
    }
}

impl FromStr for Storage {
    type Err = StorageError;

    fn from_str(text: &str) -> Result<Self> {
        parse(text, "<text>")
    }
}

impl StorageSource for Storage {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn row_time(&self, i: usize) -> Option<Float> {
        self.times.get(i).copied()
    }

    fn row_values(&self, i: usize) -> Option<&[Float]> {
        self.rows.get(i).map(Vec::as_slice)
    }

    fn time_column(&self) -> Vec<Float> {
        self.times.clone()
    }
}

/// Column headers are tab separated; labels written by hand may use spaces.
fn split_columns(line: &str) -> Vec<String> {
    let columns: Vec<&str> = if line.contains('\t') {
        line.split('\t').map(str::trim).collect()
    } else {
        line.split_whitespace().collect()
    };
    columns
        .into_iter()
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

/// Check a declared `nRows`/`nColumns` entry against what was read.
fn check_declared(storage: &Storage, key: &str, found: usize) -> Result<()> {
    let Some(value) = storage.header_value(key) else {
        return Ok(());
    };
    match value.parse::<usize>() {
        Ok(expected) if expected != found => {
            Err(StorageError::inconsistent_length(key, expected, found))
        }
        Ok(_) => Ok(()),
        Err(_) => {
            warn!("ignoring non-numeric header entry {}={}", key, value);
            Ok(())
        }
    }
}

fn parse(text: &str, origin: &str) -> Result<Storage> {
    let mut lines = text.lines().enumerate().map(|(i, line)| (i + 1, line));

    // Header: optional name line and key=value entries up to `endheader`
    let mut name = None;
    let mut header = vec![];
    let mut ended = false;
    for (_, line) in lines.by_ref() {
        let line = line.trim();
        if line.eq_ignore_ascii_case(END_HEADER) {
            ended = true;
            break;
        }
        if line.is_empty() {
            continue;
        }
        match line.split_once('=') {
            Some((key, value)) => header.push((key.trim().to_string(), value.trim().to_string())),
            None if name.is_none() => name = Some(line.to_string()),
            None => debug!("skipping header line {:?}", line),
        }
    }
    if !ended {
        return Err(StorageError::source_unavailable(
            origin,
            "missing `endheader` line",
        ));
    }

    // Column headers
    let mut columns = lines
        .by_ref()
        .find(|(_, line)| !line.trim().is_empty())
        .map(|(_, line)| split_columns(line))
        .unwrap_or_default();
    if columns.is_empty() {
        return Err(StorageError::source_unavailable(
            origin,
            "missing column labels after `endheader`",
        ));
    }
    let time_label = columns.remove(0);
    let labels = columns;

    // Data rows: time followed by one value per label
    let mut times = vec![];
    let mut rows = vec![];
    for (lineno, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let values = line
            .split_whitespace()
            .map(|token| {
                token
                    .parse::<Float>()
                    .map_err(|_| StorageError::unsupported_value(lineno, token))
            })
            .collect::<Result<Vec<Float>>>()?;
        if values.len() != labels.len() + 1 {
            return Err(StorageError::inconsistent_length(
                format!("row on line {}", lineno),
                labels.len() + 1,
                values.len(),
            ));
        }
        times.push(values[0]);
        rows.push(values[1..].to_vec());
    }

    if name.is_none() {
        warn!("storage {} has no name line", origin);
    }
    let storage = Storage {
        name,
        header,
        time_label,
        labels,
        times,
        rows,
    };
    check_declared(&storage, "nRows", storage.rows.len())?;
    check_declared(&storage, "nColumns", storage.labels.len() + 1)?;

    debug!(
        "parsed {}: {} rows, {} labels",
        origin,
        storage.rows.len(),
        storage.labels.len()
    );
    Ok(storage)
}

#[cfg(test)]
mod storage_tests {
    use super::*;

    const NEURON_STO: &str = "state\n\
        version=1\n\
        nRows=3\n\
        nColumns=2\n\
        inDegrees=no\n\
        endheader\n\
        time\t/neuron/v\n\
        0\t-0.07\n\
        0.001\t-0.0693\n\
        0.002\t-0.0686\n";

    #[test]
    fn parse_header_and_rows() {
        // Act
        let storage: Storage = NEURON_STO.parse().unwrap();

        // Assert
        assert_eq!(storage.name(), Some("state"));
        assert_eq!(storage.header_value("version"), Some("1"));
        assert!(!storage.in_degrees());
        assert_eq!(storage.time_label(), "time");
        assert_eq!(storage.labels(), &["/neuron/v".to_string()]);
        assert_eq!(storage.row_count(), 3);
        assert_eq!(storage.time_column(), vec![0.0, 0.001, 0.002]);
        assert_eq!(storage.row_time(1), Some(0.001));
        assert_eq!(storage.row_values(2), Some(&[-0.0686][..]));
        assert_eq!(storage.row_values(3), None);
    }

    #[test]
    fn parse_whitespace_separated_without_declared_sizes() {
        let text = "endheader\n\ntime a b\n0.0 1 2\n\n0.5 3 4\n";

        let storage: Storage = text.parse().unwrap();

        assert_eq!(storage.name(), None);
        assert_eq!(storage.labels(), &["a".to_string(), "b".to_string()]);
        assert_eq!(storage.time_column(), vec![0.0, 0.5]);
        assert_eq!(storage.row_values(1), Some(&[3.0, 4.0][..]));
    }

    #[test]
    fn labels_with_spaces_are_kept_when_tab_separated() {
        let text = "endheader\ntime\tknee angle\thip angle\n0\t1\t2\n";

        let storage: Storage = text.parse().unwrap();

        assert_eq!(
            storage.labels(),
            &["knee angle".to_string(), "hip angle".to_string()]
        );
    }

    #[test]
    fn in_degrees_flag() {
        let text = "motion\ninDegrees=yes\nendheader\ntime\tq\n0\t90\n";

        let storage: Storage = text.parse().unwrap();

        assert!(storage.in_degrees());
    }

    #[test]
    fn missing_endheader_is_unavailable() {
        let result = "time\ta\n0\t1\n".parse::<Storage>();

        assert!(matches!(
            result,
            Err(StorageError::SourceUnavailable { .. })
        ));
    }

    #[test]
    fn missing_column_labels_is_unavailable() {
        let result = "state\nendheader\n\n".parse::<Storage>();

        assert!(matches!(
            result,
            Err(StorageError::SourceUnavailable { .. })
        ));
    }

    #[test]
    fn non_numeric_cell_is_unsupported() {
        let text = "endheader\ntime\ta\n0\t1\n0.1\tabc\n";

        let result = text.parse::<Storage>();

        match result {
            Err(StorageError::UnsupportedValue { line, token }) => {
                assert_eq!(line, 4);
                assert_eq!(token, "abc");
            }
            other => panic!("expected UnsupportedValue, got {:?}", other),
        }
    }

    #[test]
    fn short_row_is_inconsistent() {
        let text = "endheader\ntime\ta\tb\n0\t1\t2\n0.1\t3\n";

        let result = text.parse::<Storage>();

        assert!(matches!(
            result,
            Err(StorageError::InconsistentLength {
                expected: 3,
                found: 2,
                ..
            })
        ));
    }

    #[test]
    fn declared_row_count_must_match() {
        let text = "nRows=3\nendheader\ntime\ta\n0\t1\n0.1\t2\n";

        let result = text.parse::<Storage>();

        assert!(matches!(
            result,
            Err(StorageError::InconsistentLength {
                expected: 3,
                found: 2,
                ..
            })
        ));
    }

    #[test]
    fn declared_column_count_must_match() {
        let text = "nColumns=4\nendheader\ntime\ta\n0\t1\n";

        let result = text.parse::<Storage>();

        assert!(matches!(
            result,
            Err(StorageError::InconsistentLength {
                expected: 4,
                found: 2,
                ..
            })
        ));
    }

    #[test]
    fn new_rejects_mismatched_row() {
        let result = Storage::new(
            vec!["a".to_string(), "b".to_string()],
            vec![0.0, 1.0],
            vec![vec![1.0, 2.0], vec![3.0]],
        );

        assert!(matches!(
            result,
            Err(StorageError::InconsistentLength {
                expected: 2,
                found: 1,
                ..
            })
        ));
    }

    #[test]
    fn write_then_parse_keeps_contents() {
        // Arrange
        let storage = Storage::new(
            vec!["x".to_string(), "y".to_string()],
            vec![0.0, 0.25, 0.5],
            vec![vec![1.5, -2.0], vec![1e-10, 3.0], vec![7.0, 8.125]],
        )
        .unwrap()
        .with_name("trajectory")
        .unwrap()
        .with_header_entry("DataType", "double");

        // Act
        let mut buffer = vec![];
        storage.write(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let parsed: Storage = text.parse().unwrap();

        // Assert
        assert!(text.contains("nRows=3\n"));
        assert!(text.contains("nColumns=3\n"));
        assert!(text.contains("time\tx\ty\n"));
        assert_eq!(parsed.name(), Some("trajectory"));
        assert_eq!(parsed.header_value("DataType"), Some("double"));
        assert_eq!(parsed.labels(), storage.labels());
        assert_eq!(parsed.time_column(), storage.time_column());
        for i in 0..storage.row_count() {
            assert_eq!(parsed.row_values(i), storage.row_values(i));
        }
    }

    #[test]
    fn from_reader_names_origin_on_failure() {
        let result = Storage::from_reader("time\ta\n".as_bytes(), "buffer");

        match result {
            Err(err @ StorageError::SourceUnavailable { .. }) => {
                assert!(err.to_string().contains("buffer"))
            }
            other => panic!("expected SourceUnavailable, got {:?}", other),
        }
    }

    #[test]
    fn nameless_storage_round_trips_without_name() {
        let storage = Storage::new(vec!["a".to_string()], vec![0.0], vec![vec![1.0]]).unwrap();

        let mut buffer = vec![];
        storage.write(&mut buffer).unwrap();
        let parsed: Storage = String::from_utf8(buffer).unwrap().parse().unwrap();

        assert_eq!(parsed.name(), None);
        assert_eq!(parsed.labels(), storage.labels());
    }

    #[test]
    fn names_that_cannot_be_reparsed_are_rejected() {
        for name in ["a=b", "two\nlines", "", " padded", "endheader"] {
            let result = Storage::from_parts(vec![], vec![], vec![]).with_name(name);

            assert!(
                matches!(result, Err(StorageError::InvalidArgument(_))),
                "accepted name {:?}",
                name
            );
        }
    }

    #[test]
    fn with_header_entry_replaces_existing_key() {
        let storage = Storage::from_parts(vec![], vec![], vec![])
            .with_header_entry("inDegrees", "no")
            .with_header_entry("inDegrees", "yes");

        assert_eq!(storage.header().len(), 1);
        assert!(storage.in_degrees());
    }
}
