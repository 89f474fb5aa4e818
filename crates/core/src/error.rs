use thiserror::Error;

pub type DashboardResult<T> = Result<T, DashboardError>;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("File not found: {file}")]
    FileNotFound { file: String },

    #[error("Error loading {file}: {message}")]
    Parse { file: String, message: String },

    #[error("Column '{column}' not found in {table}")]
    MissingColumn { table: String, column: String },

    #[error("Join or aggregation error: {0}")]
    JoinOrAggregation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl DashboardError {
    pub fn parse(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            file: file.into(),
            message: message.into(),
        }
    }

    pub fn missing_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::MissingColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Load-time errors halt the dashboard; everything else degrades a section.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::FileNotFound { .. } | Self::Parse { .. } | Self::Config(_) | Self::Io(_)
        )
    }
}
