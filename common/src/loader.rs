use std::{
    fmt::Display,
    io::Read,
    path::{Path, PathBuf},
    str::FromStr,
};

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{
    dataset::{Dataset, Side, StatKey, Statistic},
    error::DatasetError,
    label::RunLabel,
};

/// Column layout of a benchmark CSV.
///
/// * `shared` - `load_factor, size, meta_bits, mean, 50, 95, 99`, one block
///   of statistics used for both series
/// * `paired` - `load_factor, size, meta_bits`, then a block for series a
///   and a block for series b
/// * `flat` - `load_factor`, a block for series a and, when the row has
///   more than five fields, a block for series b. No meta bits.
///
/// The size column is never read.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Schema {
    #[default]
    Auto,
    Shared,
    Paired,
    Flat,
}

const STATS: usize = Statistic::ALL.len();

impl Schema {
    pub fn name(&self) -> &'static str {
        match self {
            Schema::Auto => "auto",
            Schema::Shared => "shared",
            Schema::Paired => "paired",
            Schema::Flat => "flat",
        }
    }

    pub fn min_fields(&self) -> usize {
        match self {
            Schema::Auto => 0,
            Schema::Shared => 3 + STATS,
            Schema::Paired => 3 + 2 * STATS,
            Schema::Flat => 1 + STATS,
        }
    }

    /// Picks a schema from the field count of a row.
    pub fn detect(fields: usize) -> Option<Schema> {
        match fields {
            5 | 9 => Some(Schema::Flat),
            7 => Some(Schema::Shared),
            n if n >= 11 => Some(Schema::Paired),
            _ => None,
        }
    }
}

impl Display for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Schema {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Schema::Auto),
            "shared" => Ok(Schema::Shared),
            "paired" => Ok(Schema::Paired),
            "flat" => Ok(Schema::Flat),
            other => Err(format!(
                "Unknown schema {other}, expected one of auto, shared, paired, flat"
            )),
        }
    }
}

/// Reads a benchmark CSV into a [`Dataset`], labelled from its file name.
///
/// Any short row or unparsable field fails the whole file.
pub fn load(path: &Path, schema: Schema) -> Result<Dataset, DatasetError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let label = RunLabel::classify(file_name)?;
    let file = std::fs::File::open(path).map_err(|err| DatasetError::Csv {
        path: path.to_path_buf(),
        source: err.into(),
    })?;
    read_dataset(file, path, label, schema)
}

pub fn read_dataset<R: Read>(
    rdr: R,
    path: &Path,
    label: RunLabel,
    schema: Schema,
) -> Result<Dataset, DatasetError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(rdr);

    let mut dataset: Option<Dataset> = None;
    let mut record = StringRecord::new();
    let mut rows = 0usize;
    loop {
        let more = reader
            .read_record(&mut record)
            .map_err(|source| DatasetError::Csv {
                path: path.to_path_buf(),
                source,
            })?;
        if !more {
            break;
        }
        let line = record.position().map(|p| p.line()).unwrap_or_default();

        let current = match dataset.take() {
            Some(current) => current,
            None => {
                let resolved = match schema {
                    Schema::Auto => Schema::detect(record.len()).ok_or_else(|| {
                        DatasetError::UndetectedSchema {
                            path: path.to_path_buf(),
                            line,
                            fields: record.len(),
                        }
                    })?,
                    other => other,
                };
                debug!("{path:?} read as {resolved}");
                Dataset::new(label.clone(), resolved)
            }
        };
        let current = dataset.insert(current);

        let row = Row {
            record: &record,
            path,
            line,
        };
        row.apply(current)?;
        rows += 1;
    }

    trace!("{path:?}: {rows} rows");
    Ok(dataset.unwrap_or_else(|| {
        let resolved = match schema {
            Schema::Auto => Schema::Shared,
            other => other,
        };
        Dataset::new(label, resolved)
    }))
}

struct Row<'a> {
    record: &'a StringRecord,
    path: &'a Path,
    line: u64,
}

impl Row<'_> {
    fn apply(&self, dataset: &mut Dataset) -> Result<(), DatasetError> {
        let schema = dataset.schema;
        self.require(schema, schema.min_fields())?;
        let load_factor = self.float(0)?;

        match schema {
            Schema::Shared => {
                let meta_bits = Some(self.int(2)?);
                let stats = self.stats(3)?;
                for side in Side::ALL {
                    insert_block(dataset, side, load_factor, meta_bits, stats);
                }
            }
            Schema::Paired => {
                let meta_bits = Some(self.int(2)?);
                let a = self.stats(3)?;
                let b = self.stats(3 + STATS)?;
                insert_block(dataset, Side::A, load_factor, meta_bits, a);
                insert_block(dataset, Side::B, load_factor, meta_bits, b);
            }
            Schema::Flat => {
                let a = self.stats(1)?;
                insert_block(dataset, Side::A, load_factor, None, a);
                if self.record.len() > 1 + STATS {
                    self.require(schema, 1 + 2 * STATS)?;
                    let b = self.stats(1 + STATS)?;
                    insert_block(dataset, Side::B, load_factor, None, b);
                }
            }
            Schema::Auto => unreachable!("schema is resolved before the first row"),
        }
        Ok(())
    }

    fn require(&self, schema: Schema, expected: usize) -> Result<(), DatasetError> {
        if self.record.len() < expected {
            return Err(DatasetError::ShortRow {
                path: self.path.to_path_buf(),
                line: self.line,
                schema: schema.name(),
                expected,
                got: self.record.len(),
            });
        }
        Ok(())
    }

    fn field(&self, column: usize) -> &str {
        self.record.get(column).unwrap_or_default()
    }

    fn error(&self, column: usize, kind: &'static str) -> DatasetError {
        DatasetError::Field {
            path: self.path.to_path_buf(),
            line: self.line,
            column,
            value: self.field(column).to_owned(),
            kind,
        }
    }

    fn float(&self, column: usize) -> Result<f64, DatasetError> {
        self.field(column)
            .parse()
            .map_err(|_| self.error(column, "float"))
    }

    fn int(&self, column: usize) -> Result<u32, DatasetError> {
        self.field(column)
            .parse()
            .map_err(|_| self.error(column, "integer"))
    }

    fn stats(&self, start: usize) -> Result<[f64; STATS], DatasetError> {
        let mut out = [0.0; STATS];
        for (i, value) in out.iter_mut().enumerate() {
            *value = self.float(start + i)?;
        }
        Ok(out)
    }
}

fn insert_block(
    dataset: &mut Dataset,
    side: Side,
    load_factor: f64,
    meta_bits: Option<u32>,
    stats: [f64; STATS],
) {
    for (stat, value) in Statistic::ALL.into_iter().zip(stats) {
        dataset
            .series_mut(StatKey::new(side, stat))
            .insert(load_factor, meta_bits, value);
    }
}

/// `.csv` files directly inside `dir`, sorted by file name.
pub fn discover(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("csv") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(data: &str, schema: Schema) -> Result<Dataset, DatasetError> {
        read_dataset(
            data.as_bytes(),
            Path::new("churn_robinhood.csv"),
            RunLabel::classify("churn_robinhood.csv").unwrap(),
            schema,
        )
    }

    fn key(side: Side, stat: Statistic) -> StatKey {
        StatKey::new(side, stat)
    }

    #[test]
    fn paired_row_fills_both_sides() {
        let data = "0.5,1000000,8,1,2,3,4,5,6,7,8\n";
        let dataset = read(data, Schema::Auto).unwrap();
        assert_eq!(dataset.schema, Schema::Paired);
        let a_mean = dataset.series(key(Side::A, Statistic::Mean));
        let b_mean = dataset.series(key(Side::B, Statistic::Mean));
        assert_eq!(a_mean.get(0.5, Some(8)), Some(1.0));
        assert_eq!(b_mean.get(0.5, Some(8)), Some(5.0));
        assert_eq!(
            dataset.series(key(Side::B, Statistic::P99)).get(0.5, Some(8)),
            Some(8.0)
        );
    }

    #[test]
    fn shared_row_reuses_statistics() {
        let data = "0.25,10,4,1.5,1,3,7\n0.5,10,4,2.5,2,5,9\n";
        let dataset = read(data, Schema::Auto).unwrap();
        assert_eq!(dataset.schema, Schema::Shared);
        for side in Side::ALL {
            let p95 = dataset.series(key(side, Statistic::P95));
            assert_eq!(p95.len(), 2);
            assert_eq!(p95.get(0.25, Some(4)), Some(3.0));
            assert_eq!(p95.get(0.5, Some(4)), Some(5.0));
        }
    }

    #[test]
    fn flat_rows_with_and_without_b() {
        let data = "0.1,1,2,3,4\n0.2,5,6,7,8,9,10,11,12\n";
        let dataset = read(data, Schema::Auto).unwrap();
        assert_eq!(dataset.schema, Schema::Flat);
        let a_mean = dataset.series(key(Side::A, Statistic::Mean));
        let b_mean = dataset.series(key(Side::B, Statistic::Mean));
        assert_eq!(a_mean.len(), 2);
        assert_eq!(a_mean.get(0.1, None), Some(1.0));
        assert_eq!(b_mean.len(), 1);
        assert_eq!(b_mean.get(0.2, None), Some(9.0));
    }

    #[test]
    fn later_rows_overwrite_earlier_ones() {
        let data = "0.5,1,8,1,2,3,4\n0.5,1,8,10,20,30,40\n";
        let dataset = read(data, Schema::Shared).unwrap();
        let mean = dataset.series(key(Side::A, Statistic::Mean));
        assert_eq!(mean.len(), 1);
        assert_eq!(mean.get(0.5, Some(8)), Some(10.0));
    }

    #[test]
    fn surplus_fields_and_whitespace_are_tolerated() {
        let data = " 0.5 , x , 8 , 1 , 2 , 3 , 4 , extra\n";
        let dataset = read(data, Schema::Shared).unwrap();
        assert_eq!(
            dataset.series(key(Side::A, Statistic::P50)).get(0.5, Some(8)),
            Some(2.0)
        );
    }

    #[test]
    fn short_row_aborts_the_read() {
        let data = "0.5,1,8,1,2,3,4,5,6,7,8\n0.6,1,8,1,2,3\n";
        let err = read(data, Schema::Auto).unwrap_err();
        match err {
            DatasetError::ShortRow {
                line,
                expected,
                got,
                ..
            } => {
                assert_eq!(line, 2);
                assert_eq!(expected, 11);
                assert_eq!(got, 6);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn flat_row_with_partial_b_block_is_short() {
        let err = read("0.1,1,2,3,4,5,6\n", Schema::Flat).unwrap_err();
        assert!(matches!(err, DatasetError::ShortRow { expected: 9, .. }));
    }

    #[test]
    fn non_numeric_field_aborts_the_read() {
        let err = read("0.5,1,eight,1,2,3,4\n", Schema::Auto).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::Field {
                column: 2,
                kind: "integer",
                ..
            }
        ));
        let err = read("0.5,1,8,1,2,fast,4\n", Schema::Auto).unwrap_err();
        assert!(matches!(err, DatasetError::Field { column: 5, .. }));
    }

    #[test]
    fn unknown_field_count_needs_explicit_schema() {
        let err = read("0.5,1,8,1,2,3\n", Schema::Auto).unwrap_err();
        assert!(matches!(err, DatasetError::UndetectedSchema { fields: 6, .. }));
    }

    #[test]
    fn empty_input_is_an_empty_dataset() {
        let dataset = read("", Schema::Auto).unwrap();
        assert!(dataset.is_empty());
    }

    #[test]
    fn detection_table() {
        assert_eq!(Schema::detect(5), Some(Schema::Flat));
        assert_eq!(Schema::detect(9), Some(Schema::Flat));
        assert_eq!(Schema::detect(7), Some(Schema::Shared));
        assert_eq!(Schema::detect(11), Some(Schema::Paired));
        assert_eq!(Schema::detect(12), Some(Schema::Paired));
        assert_eq!(Schema::detect(8), None);
        assert_eq!("paired".parse::<Schema>(), Ok(Schema::Paired));
    }

    #[test]
    fn load_labels_from_file_name_and_discover_filters_csv() {
        let dir = tempfile::tempdir().unwrap();
        let row = "0.5,1,8,1,2,3,4\n";
        std::fs::write(dir.path().join("probe_cuckoo.csv"), row).unwrap();
        std::fs::write(dir.path().join("grow_robinhood.csv"), row).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let files = discover(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["grow_robinhood.csv", "probe_cuckoo.csv"]);

        let dataset = load(&files[1], Schema::Auto).unwrap();
        assert_eq!(dataset.label.test_kind, "probe");
        assert_eq!(dataset.label.map_kind, "cuckoo");
    }
}
