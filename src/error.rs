use std::path::PathBuf;

/// Errors raised while analysing a dataset and producing the report.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Column '{column}' not found in dataset")]
    MissingColumn { column: String },

    #[error("Data row {row} (header not counted), column '{column}': '{value}' is not a number")]
    NonNumeric {
        /// 1-based, header excluded.
        row: usize,
        column: String,
        value: String,
    },

    #[error("Invalid configuration field '{field}': {message}")]
    Config { field: String, message: String },

    #[error("Not enough data for {variable} by {factor}: {reason}")]
    InsufficientData {
        variable: String,
        factor: String,
        reason: String,
    },

    #[error("Failed to load embedded font '{name}'")]
    Font { name: &'static str },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error(transparent)]
    Pdf(#[from] lopdf::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using [`AnalysisError`].
pub type Result<T> = std::result::Result<T, AnalysisError>;

impl AnalysisError {
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn insufficient(
        variable: impl Into<String>,
        factor: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InsufficientData {
            variable: variable.into(),
            factor: factor.into(),
            reason: reason.into(),
        }
    }

    pub fn render(message: impl Into<String>) -> Self {
        Self::Render {
            message: message.into(),
        }
    }
}
