// src/error.rs
use std::fmt;

/// One failed (format, delimiter, encoding) combination tried by the loader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadAttempt {
    pub format: &'static str,
    pub delimiter: Option<char>,
    pub encoding: Option<&'static str>,
    pub reason: String,
}

impl fmt::Display for LoadAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format)?;
        if let Some(delimiter) = self.delimiter {
            write!(f, " delimiter={:?}", delimiter)?;
        }
        if let Some(encoding) = self.encoding {
            write!(f, " encoding={}", encoding)?;
        }
        write!(f, ": {}", self.reason)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error(
        "Unable to read '{}': no format/delimiter/encoding combination produced more than one column{}",
        .source_name,
        render_attempts(.attempts)
    )]
    UnreadableFormat {
        source_name: String,
        attempts: Vec<LoadAttempt>,
    },

    #[error("No column matching '{}' (available: {})", .hint, join_columns(.available))]
    ColumnNotFound { hint: String, available: Vec<String> },

    #[error("Required column '{0}' is missing")]
    MissingRequiredColumn(String),

    #[error("Stage {stage} failed: {source}")]
    Stage {
        stage: u8,
        #[source]
        source: Box<AuditError>,
    },

    #[error("Artifact '{0}' not found")]
    ArtifactNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl AuditError {
    /// Wrap an error with the pipeline stage that raised it
    pub fn in_stage(self, stage: u8) -> Self {
        AuditError::Stage {
            stage,
            source: Box::new(self),
        }
    }

    /// The innermost error, with any stage wrapping removed
    pub fn root(&self) -> &AuditError {
        match self {
            AuditError::Stage { source, .. } => source.root(),
            other => other,
        }
    }
}

fn join_columns(columns: &[String]) -> String {
    columns.join(", ")
}

fn render_attempts(attempts: &[LoadAttempt]) -> String {
    if attempts.is_empty() {
        return String::new();
    }
    let lines: Vec<String> = attempts.iter().map(|a| format!("\n  - {}", a)).collect();
    format!(" (tried:{})", lines.concat())
}

pub type Result<T> = std::result::Result<T, AuditError>;
