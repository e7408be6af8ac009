use std::io;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::Serialize;
use thiserror::Error;

/// Why a file ended up in the failed folder.
///
/// The `Display` text is what the summary report prints next to the file.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    #[error("Could not determine date")]
    NoDateFound,

    #[error("Invalid date in filename: {0}")]
    InvalidDate(String),

    #[error("Metadata tool error: {0}")]
    MetadataTool(String),

    #[error("Failed to set file dates: {0}")]
    TimestampApply(String),

    #[error("Unsupported format: .{0}")]
    UnsupportedFormat(String),

    #[error("Failed to move file: {0}")]
    Move(String),
}

/// Failure talking to an external metadata tool (or reading metadata in-process).
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("could not start {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("exited with {status}: {stderr}")]
    Status { status: String, stderr: String },

    #[error("malformed output: {0}")]
    Output(String),
}

/// Failure writing a resolved date onto a file.
#[derive(Debug, Error)]
pub enum StampError {
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{0} does not exist in the local timezone")]
    NonexistentLocalTime(NaiveDateTime),
}
