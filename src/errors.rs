// Error types for pacewise

use snafu::Snafu;
use std::io;

#[derive(Debug, Snafu)]
pub enum PaceError {
    // Errors while reading the timing export
    #[snafu(display("Unable to open timing file {path}: {source}"))]
    InputFileError { path: String, source: io::Error },
    #[snafu(display("Error reading timing data: {source}"))]
    CsvReadError { source: csv::Error },
    #[snafu(display("Missing required column(s): {columns}"))]
    MissingColumns { columns: String },

    // Parameter validation errors
    #[snafu(display("Invalid parameter: {field} - {reason}"))]
    InvalidParameter { field: String, reason: String },
    #[snafu(display("Class {class} not found in session (available: {available})"))]
    UnknownClass { class: String, available: String },

    // Config management errors
    #[snafu(display("Could not find application data directory to save config file"))]
    NoConfigDir,
    #[snafu(display("Error reading or writing config file: {source}"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing config file: {source}"))]
    ConfigSerializeError { source: serde_json::Error },

    // Errors for the result writer
    #[snafu(display("Error writing results file: {source}"))]
    WriterError { source: io::Error },
}

impl PaceError {
    pub(crate) fn invalid_parameter(field: &str, reason: impl Into<String>) -> Self {
        PaceError::InvalidParameter {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}
