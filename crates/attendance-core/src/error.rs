use thiserror::Error;

/// All errors produced by the attendance tracker.
#[derive(Error, Debug)]
pub enum AttendanceError {
    /// A student name was empty (or only whitespace).
    #[error("Student name is required")]
    EmptyStudentName,

    /// A date string was not a valid `YYYY-MM-DD` calendar date.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// A student with this name is already on the roster.
    #[error("Student already exists: {0}")]
    DuplicateStudent(String),

    /// No student with this name is on the roster.
    #[error("Student not found: {0}")]
    StudentNotFound(String),

    /// An imported CSV file lacks a required column.
    #[error("CSV must contain a '{0}' column")]
    MissingColumn(String),

    /// An imported CSV file has no data rows.
    #[error("CSV file seems empty or invalid")]
    EmptyImport,

    /// The document store could not return the value stored under `key`.
    #[error("Failed to load '{key}': {message}")]
    StoreRead { key: String, message: String },

    /// The document store rejected a write for `key`.
    #[error("Failed to save '{key}': {message}")]
    StoreWrite { key: String, message: String },

    /// A background save task did not run to completion.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A CSV document could not be read or written.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a key.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AttendanceError {
    /// Validation errors are rejected before any state is touched.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyStudentName
                | Self::InvalidDate(_)
                | Self::DuplicateStudent(_)
                | Self::StudentNotFound(_)
                | Self::MissingColumn(_)
                | Self::EmptyImport
        )
    }
}

/// Convenience alias used throughout the attendance crates.
pub type Result<T> = std::result::Result<T, AttendanceError>;
