//! Error types for listing and extracting archives.

use std::num::ParseIntError;

/// Errors produced while parsing a tool's listing output.
#[derive(Debug, thiserror::Error)]
pub enum ListError {
    /// The output ended before the start sentinel, or held no entry block.
    #[error("no entries in archive listing")]
    NoEntries,

    /// A block line could not be split into a key and a value.
    #[error("unexpected line, invalid key value pair: {line}")]
    MalformedLine { line: String },

    /// A required identity field was blank.
    #[error("{field} field can not be empty")]
    EmptyField { field: &'static str },

    /// A numeric field held something that is not a number.
    #[error("invalid value for field '{field}': {value:?}")]
    InvalidNumber {
        field: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },
}

/// Errors produced by the process glue around the external tools.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("{name} executable not available")]
    ToolNotFound { name: String },

    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} failed: {message}")]
    CommandFailed { tool: String, message: String },

    #[error("file not in the archive: {name}")]
    EntryNotFound { name: String },

    #[error("no data returned for {name}")]
    EmptyOutput { name: String },

    #[error(transparent)]
    List(#[from] ListError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
