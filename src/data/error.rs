use std::path::PathBuf;

use thiserror::Error;

/// Result alias for the data layer.
pub type Result<T> = std::result::Result<T, DataError>;

/// Everything that can go wrong while reading or querying a dataset.
#[derive(Error, Debug)]
pub enum DataError {
    /// The file could not be read at all.
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Layout violation: too few lines, a metadata line without `:`,
    /// a blank or non-numeric token or a row of the wrong width.
    #[error("malformed file at line {line}: {reason}")]
    MalformedFile { line: usize, reason: String },

    /// A row or column handed to a table does not fit its shape.
    #[error("{what} has {found} values, expected {expected}")]
    LengthMismatch {
        what: String,
        expected: usize,
        found: usize,
    },

    /// A column needed by a transform or query is not in the table.
    #[error("missing column '{0}'")]
    MissingColumn(String),

    /// A query key that is neither a KinVar nor a known metadata field.
    #[error("key '{0}' does not match any known variable")]
    UnknownQueryKey(String),

    /// A sub-table does not share the schema of its parent dataset.
    #[error("schema mismatch: expected {expected:?}, found {found:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// Per-degree-of-freedom statistics on a table without rows.
    #[error("dataset has no rows")]
    EmptyDataset,

    /// Constraints leave zero or several candidate x axes.
    #[error("cannot choose x axis: {0} kinematic variables left unconstrained")]
    AmbiguousAxis(usize),
}

impl DataError {
    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        DataError::MalformedFile {
            line,
            reason: reason.into(),
        }
    }
}
