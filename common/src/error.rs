use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("File name {name:?} does not have the form <test>_<map>[...].csv")]
    FileName { name: String },
    #[error("Could not read {path:?}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error(
        "{path:?} line {line}: {fields} fields does not match any known schema, set the schema explicitly"
    )]
    UndetectedSchema {
        path: PathBuf,
        line: u64,
        fields: usize,
    },
    #[error("{path:?} line {line}: expected at least {expected} fields for schema {schema}, got {got}")]
    ShortRow {
        path: PathBuf,
        line: u64,
        schema: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("{path:?} line {line} column {column}: could not parse {value:?} as {kind}")]
    Field {
        path: PathBuf,
        line: u64,
        column: usize,
        value: String,
        kind: &'static str,
    },
}
