use std::path::PathBuf;
use thiserror::Error;

/// Fatal conditions raised while loading, diffing or pivoting result files.
///
/// Every variant aborts the run; recoverable situations (unknown labels,
/// benchmarks without data) never reach this type.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// First line of a result file is not `Version <n>`.
    #[error("{}: expected 'Version <n>' on line 1, found {line:?}", path.display())]
    MalformedVersion { path: PathBuf, line: String },

    /// Second line of a result file is not a quoted, tab-separated header.
    #[error("{}: malformed column header {line:?}", path.display())]
    MalformedHeader { path: PathBuf, line: String },

    /// Two files of the same result set disagree on version or columns.
    #[error("schema mismatch in {benchmark} ({}): {detail}", path.display())]
    SchemaMismatch {
        benchmark: String,
        path: PathBuf,
        detail: String,
    },

    /// The second result set of a comparison differs from the first.
    #[error("comparison input {} does not match the first result set for {benchmark}: {detail}", path.display())]
    ComparisonMismatch {
        benchmark: String,
        path: PathBuf,
        detail: String,
    },

    #[error("{}:{line}: expected {expected} fields, found {found}", path.display())]
    RowArity {
        path: PathBuf,
        line: usize,
        expected: usize,
        found: usize,
    },

    /// A configured column name is absent from the dataset schema.
    #[error("column {column:?} not present in schema [{}]", schema.join(", "))]
    UnknownColumn { column: String, schema: Vec<String> },

    /// A quoted label differs between paired comparison rows.
    #[error("label mismatch in column {column:?}: {left} != {right}")]
    LabelMismatch {
        column: String,
        left: String,
        right: String,
    },

    #[error("{benchmark}: first result set has {left} rows, second has {right}")]
    RowCountMismatch {
        benchmark: String,
        left: usize,
        right: usize,
    },

    #[error("{benchmark}: no row in the second result set matches [{key}]")]
    UnmatchedRow { benchmark: String, key: String },

    #[error("unknown benchmark {0:?}")]
    UnknownBenchmark(String),

    #[error("could not find archive {}", .0.display())]
    MissingArchive(PathBuf),

    #[error("unsupported archive format: {}", .0.display())]
    UnsupportedArchive(PathBuf),

    #[error(transparent)]
    Pattern(#[from] glob::PatternError),

    #[error("invalid configuration {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ReportError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReportError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
