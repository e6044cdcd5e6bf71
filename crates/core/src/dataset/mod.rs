//! Typed record store.
//!
//! Turns the raw rows handed over by the tabular reader into the typed view
//! the rest of the crate works with: numeric records, a side table holding the
//! text columns, and the sender registry. Column types are decided once over
//! all admitted rows, so every record carries the same numeric field set.

use std::{
    collections::{HashMap, HashSet},
    io::Read,
    path::Path,
};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{config::DatasetConfig, Result, ScatterError};

/// Derived field holding the sender registry index of a record.
pub const SENDER_ID_FIELD: &str = "sender_id";
/// Derived field holding the parsed timestamp in milliseconds.
pub const TIME_FIELD: &str = "time";

/// Header plus string cells, as produced by the tabular reader.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Rows whose bytes are not valid UTF-8, keyed by row index. Their entry
    /// in `rows` is left empty.
    pub undecodable: HashMap<usize, String>,
}

impl RawTable {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(file)
    }

    /// Reads comma separated input with a header row. Rows with a deviating
    /// cell count or invalid UTF-8 are kept here and rejected later by
    /// [`ingest`].
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);
        let headers = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        let mut undecodable = HashMap::new();
        for (row, record) in reader.byte_records().enumerate() {
            let record = record?;
            let cells: std::result::Result<Vec<String>, _> = record
                .iter()
                .map(|cell| std::str::from_utf8(cell).map(str::to_string))
                .collect();
            match cells {
                Ok(cells) => rows.push(cells),
                Err(err) => {
                    undecodable.insert(row, format!("invalid UTF-8: {err}"));
                    rows.push(Vec::new());
                }
            }
        }
        Ok(Self {
            headers,
            rows,
            undecodable,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    Numeric,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

/// One admitted row of the dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub numeric: HashMap<String, f64>,
    pub sender_id: usize,
    /// Milliseconds since the Unix epoch.
    pub time: i64,
}

impl Record {
    /// Looks up a numeric column or one of the derived fields.
    pub fn value(&self, field: &str) -> Option<f64> {
        if let Some(value) = self.numeric.get(field) {
            return Some(*value);
        }
        match field {
            SENDER_ID_FIELD => Some(self.sender_id as f64),
            TIME_FIELD => Some(self.time as f64),
            _ => None,
        }
    }
}

/// Text column values, one per admitted row.
#[derive(Debug, Clone, Default)]
pub struct SideTable {
    columns: HashMap<String, Vec<String>>,
}

impl SideTable {
    pub fn get(&self, column: &str, row: usize) -> Option<&str> {
        self.columns
            .get(column)
            .and_then(|values| values.get(row))
            .map(String::as_str)
    }
}

/// Sender names in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct SenderRegistry {
    names: Vec<String>,
    ids: HashMap<String, usize>,
}

impl SenderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id of `name`, assigning the next one on first sight.
    pub fn register(&mut self, name: &str) -> usize {
        if let Some(id) = self.ids.get(name) {
            return *id;
        }
        let id = self.names.len();
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        id
    }

    pub fn id(&self, name: &str) -> Option<usize> {
        self.ids.get(name).copied()
    }

    pub fn name(&self, id: usize) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// Output of ingestion.
#[derive(Debug, Default)]
pub struct Dataset {
    pub records: Vec<Record>,
    pub side_table: SideTable,
    pub senders: SenderRegistry,
    /// Every header column with its classification, in header order.
    pub columns: Vec<Column>,
    /// Rows that were not admitted, as [`ScatterError::MalformedRow`].
    pub rejected: Vec<ScatterError>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&self, row: usize) -> Option<&Record> {
        self.records.get(row)
    }

    /// Selectable field names: numeric columns in header order, then the
    /// derived fields.
    pub fn field_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .columns
            .iter()
            .filter(|column| column.kind == ColumnKind::Numeric)
            .map(|column| column.name.clone())
            .collect();
        for derived in [SENDER_ID_FIELD, TIME_FIELD] {
            if !names.iter().any(|name| name == derived) {
                names.push(derived.to_string());
            }
        }
        names
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.field_names().iter().any(|name| name == field)
    }
}

/// Reads and ingests the file named by the dataset configuration.
pub fn load(config: &DatasetConfig) -> Result<Dataset> {
    let table = RawTable::from_path(&config.path)?;
    ingest(&table, config)
}

/// Classifies the columns of `table` and builds the typed dataset.
///
/// Fails with [`ScatterError::MissingColumn`] when a required column is not in
/// the header and with [`ScatterError::DuplicateColumn`] when a name repeats.
/// Rows with an unparseable date, a wrong cell count or undecodable bytes are
/// left out of every output structure and reported in [`Dataset::rejected`].
pub fn ingest(table: &RawTable, config: &DatasetConfig) -> Result<Dataset> {
    let names = &config.columns;
    let position = |name: &str| table.headers.iter().position(|header| header == name);

    let mut seen = HashSet::with_capacity(table.headers.len());
    for header in &table.headers {
        if !seen.insert(header.as_str()) {
            return Err(ScatterError::DuplicateColumn(header.clone()));
        }
    }

    for required in names.required() {
        if position(required).is_none() {
            return Err(ScatterError::MissingColumn(required.to_string()));
        }
    }
    let date_col =
        position(&names.date).ok_or_else(|| ScatterError::MissingColumn(names.date.clone()))?;
    let sender_col =
        position(&names.sender).ok_or_else(|| ScatterError::MissingColumn(names.sender.clone()))?;

    let mut admitted: Vec<(&[String], i64)> = Vec::with_capacity(table.rows.len());
    let mut rejected = Vec::new();
    for (row, cells) in table.rows.iter().enumerate() {
        let admission = match table.undecodable.get(&row) {
            Some(reason) => Err(ScatterError::MalformedRow {
                row,
                reason: reason.clone(),
            }),
            None => admit_row(row, cells, table.headers.len(), date_col, &config.date_format),
        };
        match admission {
            Ok(time) => admitted.push((cells.as_slice(), time)),
            Err(err) => {
                tracing::warn!(row, error = %err, "rejecting malformed row");
                rejected.push(err);
            }
        }
    }

    let textual = names.textual();
    let columns: Vec<Column> = table
        .headers
        .iter()
        .enumerate()
        .map(|(index, name)| {
            let numeric = !textual.contains(&name.as_str())
                && !admitted.is_empty()
                && admitted
                    .iter()
                    .all(|(cells, _)| parse_number(&cells[index]).is_some());
            Column {
                name: name.clone(),
                kind: if numeric {
                    ColumnKind::Numeric
                } else {
                    ColumnKind::Text
                },
            }
        })
        .collect();

    let mut senders = SenderRegistry::new();
    let mut side_table = SideTable::default();
    let mut records = Vec::with_capacity(admitted.len());
    for (cells, time) in &admitted {
        let mut numeric = HashMap::new();
        for (index, column) in columns.iter().enumerate() {
            match column.kind {
                ColumnKind::Numeric => {
                    if let Some(value) = parse_number(&cells[index]) {
                        numeric.insert(column.name.clone(), value);
                    }
                }
                ColumnKind::Text => side_table
                    .columns
                    .entry(column.name.clone())
                    .or_default()
                    .push(cells[index].clone()),
            }
        }
        records.push(Record {
            numeric,
            sender_id: senders.register(&cells[sender_col]),
            time: *time,
        });
    }

    tracing::info!(
        records = records.len(),
        rejected = rejected.len(),
        senders = senders.len(),
        "dataset ingested"
    );

    Ok(Dataset {
        records,
        side_table,
        senders,
        columns,
        rejected,
    })
}

fn admit_row(
    row: usize,
    cells: &[String],
    width: usize,
    date_col: usize,
    format: &str,
) -> Result<i64> {
    if cells.len() != width {
        return Err(ScatterError::MalformedRow {
            row,
            reason: format!("expected {width} cells, found {}", cells.len()),
        });
    }
    let date = cells.get(date_col).ok_or_else(|| ScatterError::MalformedRow {
        row,
        reason: "no date cell".to_string(),
    })?;
    parse_time(date, format).ok_or_else(|| ScatterError::MalformedRow {
        row,
        reason: format!("unparseable date `{date}`"),
    })
}

/// Parses a timestamp as UTC and returns milliseconds since the epoch.
pub fn parse_time(value: &str, format: &str) -> Option<i64> {
    NaiveDateTime::parse_from_str(value.trim(), format)
        .ok()
        .map(|time| time.and_utc().timestamp_millis())
}

/// A cell is numeric when it parses to a finite float after trimming.
pub fn parse_number(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use proptest::prelude::*;

    use super::*;

    const HEADER: &str = "Date,Sender,Receiver,Subject,Text,Text_annotated,Annotations,polarity,subjectivity,nr_tokens";

    fn row(date: &str, sender: &str, polarity: &str) -> Vec<String> {
        vec![
            date.to_string(),
            sender.to_string(),
            "bob".to_string(),
            "hello".to_string(),
            "hi there".to_string(),
            "<b>hi</b> there".to_string(),
            r#"[["hi", 0.5, 0.2]]"#.to_string(),
            polarity.to_string(),
            "0.2".to_string(),
            "10".to_string(),
        ]
    }

    fn table(rows: Vec<Vec<String>>) -> RawTable {
        RawTable {
            headers: HEADER.split(',').map(str::to_string).collect(),
            rows,
            ..RawTable::default()
        }
    }

    fn kind(dataset: &Dataset, name: &str) -> ColumnKind {
        dataset
            .columns
            .iter()
            .find(|column| column.name == name)
            .map(|column| column.kind)
            .unwrap()
    }

    #[test]
    fn classifies_columns_over_all_rows() {
        let dataset = ingest(
            &table(vec![
                row("2020-01-01 10:00:00", "alice", "0.5"),
                row("2020-01-02 10:00:00", "carol", "n/a"),
            ]),
            &DatasetConfig::default(),
        )
        .unwrap();

        assert_eq!(kind(&dataset, "polarity"), ColumnKind::Text);
        assert_eq!(kind(&dataset, "subjectivity"), ColumnKind::Numeric);
        assert_eq!(kind(&dataset, "Date"), ColumnKind::Text);
        for record in &dataset.records {
            assert!(!record.numeric.contains_key("polarity"));
            assert_eq!(record.value("nr_tokens"), Some(10.0));
        }
        assert_eq!(dataset.side_table.get("polarity", 0), Some("0.5"));
        assert_eq!(dataset.side_table.get("polarity", 1), Some("n/a"));
    }

    #[test]
    fn sender_ids_follow_first_seen_order() {
        let rows = vec![
            row("2020-01-01 10:00:00", "alice", "0.1"),
            row("2020-01-01 11:00:00", "carol", "0.2"),
            row("2020-01-01 12:00:00", "alice", "0.3"),
        ];
        let first = ingest(&table(rows.clone()), &DatasetConfig::default()).unwrap();
        let second = ingest(&table(rows), &DatasetConfig::default()).unwrap();

        let ids: Vec<usize> = first.records.iter().map(|r| r.sender_id).collect();
        assert_eq!(ids, vec![0, 1, 0]);
        assert_eq!(first.senders.names(), second.senders.names());
        assert_eq!(first.senders.id("carol"), Some(1));
        assert_eq!(first.senders.name(1), Some("carol"));
        assert_eq!(first.senders.name(2), None);
        assert_eq!(first.records[2].value(SENDER_ID_FIELD), Some(0.0));
    }

    #[test]
    fn rejects_rows_with_bad_dates_and_keeps_indices_aligned() {
        let dataset = ingest(
            &table(vec![
                row("2020-01-01 10:00:00", "alice", "0.1"),
                row("yesterday", "mallory", "0.9"),
                row("2020-01-03 10:00:00", "carol", "0.3"),
            ]),
            &DatasetConfig::default(),
        )
        .unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.rejected.len(), 1);
        assert!(matches!(
            dataset.rejected[0],
            ScatterError::MalformedRow { row: 1, .. }
        ));
        assert_eq!(dataset.side_table.get("Sender", 1), Some("carol"));
        assert_eq!(dataset.records[1].value("polarity"), Some(0.3));
        assert!(dataset.senders.id("mallory").is_none());
        assert_eq!(dataset.records[0].time, 1_577_872_800_000);
    }

    #[test]
    fn short_rows_are_rejected() {
        let mut short = row("2020-01-01 10:00:00", "alice", "0.1");
        short.pop();
        let dataset = ingest(&table(vec![short]), &DatasetConfig::default()).unwrap();
        assert!(dataset.is_empty());
        assert_eq!(dataset.rejected.len(), 1);
    }

    #[test]
    fn missing_required_column_fails() {
        let mut raw = table(vec![row("2020-01-01 10:00:00", "alice", "0.1")]);
        raw.headers[6] = "Notes".to_string();
        let err = ingest(&raw, &DatasetConfig::default()).unwrap_err();
        assert!(matches!(err, ScatterError::MissingColumn(ref name) if name == "Annotations"));
    }

    #[test]
    fn repeated_header_name_fails() {
        let mut raw = table(vec![row("2020-01-01 10:00:00", "alice", "0.1")]);
        raw.headers.push("Notes".to_string());
        raw.headers.push("Notes".to_string());
        for cells in &mut raw.rows {
            cells.push("a0".to_string());
            cells.push("b0".to_string());
        }
        let err = ingest(&raw, &DatasetConfig::default()).unwrap_err();
        assert!(matches!(err, ScatterError::DuplicateColumn(ref name) if name == "Notes"));

        let mut raw = table(vec![row("2020-01-01 10:00:00", "alice", "0.1")]);
        raw.headers[8] = "polarity".to_string();
        let err = ingest(&raw, &DatasetConfig::default()).unwrap_err();
        assert!(matches!(err, ScatterError::DuplicateColumn(ref name) if name == "polarity"));
    }

    #[test]
    fn field_names_list_numeric_then_derived() {
        let dataset = ingest(
            &table(vec![row("2020-01-01 10:00:00", "alice", "0.1")]),
            &DatasetConfig::default(),
        )
        .unwrap();
        assert_eq!(
            dataset.field_names(),
            vec!["polarity", "subjectivity", "nr_tokens", "sender_id", "time"]
        );
        assert!(!dataset.has_field("Subject"));
    }

    #[test]
    fn loads_csv_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{HEADER}").unwrap();
        writeln!(
            file,
            r#"2021-03-04 05:06:07,alice,bob,Hi,"Hello, bob",Hello,"[[""hello"", 0.0, 0.0]]",0.25,0.5,4"#
        )
        .unwrap();
        let config = DatasetConfig {
            path: file.path().to_path_buf(),
            ..DatasetConfig::default()
        };

        let dataset = load(&config).unwrap();
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.side_table.get("Text", 0), Some("Hello, bob"));
        assert_eq!(
            dataset.side_table.get("Annotations", 0),
            Some(r#"[["hello", 0.0, 0.0]]"#)
        );
        assert_eq!(dataset.records[0].value("polarity"), Some(0.25));
    }

    #[test]
    fn invalid_utf8_rejects_only_that_row() {
        let mut bytes = Vec::new();
        writeln!(bytes, "{HEADER}").unwrap();
        writeln!(bytes, "2020-01-01 10:00:00,alice,bob,Hi,hello,hello,[],0.1,0.2,3").unwrap();
        bytes.extend_from_slice(b"2020-01-02 10:00:00,mallory,bob,Hi,\xff\xfe,x,[],0.9,0.9,3\n");
        writeln!(bytes, "2020-01-03 10:00:00,carol,bob,Hi,bye,bye,[],0.3,0.4,5").unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&bytes).unwrap();
        let raw = RawTable::from_path(file.path()).unwrap();
        assert_eq!(raw.rows.len(), 3);
        assert!(raw.undecodable.contains_key(&1));

        let dataset = ingest(&raw, &DatasetConfig::default()).unwrap();
        assert_eq!(dataset.len(), 2);
        assert!(matches!(
            &dataset.rejected[..],
            [ScatterError::MalformedRow { row: 1, reason }] if reason.contains("UTF-8")
        ));
        assert_eq!(dataset.side_table.get("Sender", 1), Some("carol"));
        assert!(dataset.senders.id("mallory").is_none());
    }

    #[test]
    fn number_parsing_rejects_non_finite() {
        assert_eq!(parse_number(" 3.5 "), Some(3.5));
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number(""), None);
    }

    proptest! {
        #[test]
        fn every_record_has_the_same_numeric_keys(
            cells in proptest::collection::vec(
                prop_oneof!["-?[0-9]{1,3}\\.[0-9]{1,2}", "[a-z]{1,4}"],
                1..12,
            )
        ) {
            let rows = cells
                .iter()
                .enumerate()
                .map(|(i, cell)| row(&format!("2020-01-{:02} 10:00:00", i + 1), "alice", cell))
                .collect();
            let dataset = ingest(&table(rows), &DatasetConfig::default()).unwrap();
            let keys: Vec<Vec<&String>> = dataset
                .records
                .iter()
                .map(|record| {
                    let mut keys: Vec<&String> = record.numeric.keys().collect();
                    keys.sort();
                    keys
                })
                .collect();
            prop_assert!(keys.windows(2).all(|pair| pair[0] == pair[1]));
            let all_numeric = cells.iter().all(|cell| parse_number(cell).is_some());
            prop_assert_eq!(kind(&dataset, "polarity") == ColumnKind::Numeric, all_numeric);
        }
    }
}
