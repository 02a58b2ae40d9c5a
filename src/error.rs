/*!
 * Error handling for Star Ratings data operations
 *
 * Load failures are split into the kinds a user can act on: the file is missing,
 * the file content is malformed, the required sheet is absent, or the sheet lacks
 * the identity columns every downstream view relies on.
 */

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use serde::{Serialize, Deserialize};

/// Star Ratings library result type
pub type Result<T> = std::result::Result<T, StarRatingsError>;

/// Error types with context and suggestions
#[derive(Error, Debug)]
pub enum StarRatingsError {
    /// Source file does not exist
    #[error("File not found: {path}")]
    FileNotFound {
        path: PathBuf,
        suggestion: String,
    },

    /// Workbook or CSV content could not be read (wrong format, corrupt file)
    #[error("Could not read file content: {message}")]
    Parse {
        message: String,
        path: Option<PathBuf>,
    },

    /// Unexpected I/O failure while loading
    #[error("Unexpected I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Required worksheet absent from the workbook, or present with no data rows
    #[error("The required '{sheet}' sheet is missing or has no data")]
    MissingSheet {
        sheet: String,
        available: Vec<String>,
    },

    /// Required identity columns absent from the detailed data
    #[error("Detailed data is missing essential columns: {}", .missing_columns.join(", "))]
    Schema {
        missing_columns: Vec<String>,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        suggestion: Option<String>,
    },

    /// Export errors
    #[error("Export error: {message}")]
    Export {
        message: String,
        format: ExportFormat,
        suggestion: Option<String>,
    },

    /// Generic errors with custom message
    #[error("{message}")]
    Custom {
        message: String,
        suggestion: Option<String>,
    },
}

/// Export format for error context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Json => write!(f, "JSON"),
            ExportFormat::Csv => write!(f, "CSV"),
        }
    }
}

impl StarRatingsError {
    /// Create a file not found error with helpful suggestion
    pub fn file_not_found_with_suggestion(path: PathBuf) -> Self {
        let suggestion = if path.to_string_lossy().contains("star-ratings") {
            format!(
                "Check if the file exists at '{}'. Quarterly extracts are named like \
                'star-ratings-quarterly-data-extract-february-2025.xlsx' and can be downloaded \
                via https://www.gen-agedcaredata.gov.au/",
                path.display()
            )
        } else {
            format!(
                "Check if the file exists at '{}'. Make sure the path is correct and you have read permissions.",
                path.display()
            )
        };

        Self::FileNotFound { path, suggestion }
    }

    /// Create a missing sheet error listing the sheets that were found
    pub fn missing_sheet(sheet: &str, available: Vec<String>) -> Self {
        Self::MissingSheet {
            sheet: sheet.to_string(),
            available,
        }
    }

    /// Create a schema error for the given missing columns
    pub fn missing_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Schema {
            missing_columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether this error came from loading the source file.
    ///
    /// Load errors leave the session without data; everything else is
    /// an operational failure after a successful load.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            Self::FileNotFound { .. }
                | Self::Parse { .. }
                | Self::Io { .. }
                | Self::MissingSheet { .. }
                | Self::Schema { .. }
        )
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            Self::FileNotFound { suggestion, .. } => {
                format!("{}\n\nSuggestion: {}", self, suggestion)
            }
            Self::Parse { .. } => {
                format!("{}\n\nSuggestion: Check that the file is a valid .xlsx/.xls workbook or a CSV export of the detailed data.", self)
            }
            Self::MissingSheet { available, .. } if !available.is_empty() => {
                format!("{}\n\nSheets found: {}", self, available.join(", "))
            }
            Self::Schema { .. } => {
                format!("{}\n\nSuggestion: Use the official quarterly extract; the column headers must match the published format.", self)
            }
            Self::Configuration { suggestion: Some(sug), .. }
            | Self::Export { suggestion: Some(sug), .. }
            | Self::Custom { suggestion: Some(sug), .. } => {
                format!("{}\n\nSuggestion: {}", self, sug)
            }
            _ => self.to_string(),
        }
    }
}

// Convenience conversions
impl From<std::io::Error> for StarRatingsError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<csv::Error> for StarRatingsError {
    fn from(err: csv::Error) -> Self {
        let message = match err.position() {
            Some(pos) => format!("CSV error at line {}: {}", pos.line(), err),
            None => err.to_string(),
        };

        Self::Parse { message, path: None }
    }
}

impl From<calamine::Error> for StarRatingsError {
    fn from(err: calamine::Error) -> Self {
        Self::Parse {
            message: err.to_string(),
            path: None,
        }
    }
}

impl From<serde_json::Error> for StarRatingsError {
    fn from(err: serde_json::Error) -> Self {
        StarRatingsError::Export {
            message: err.to_string(),
            format: ExportFormat::Json,
            suggestion: Some("Check if the data is serializable to JSON.".to_string()),
        }
    }
}
