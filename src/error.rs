use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Missing required input '{path}': {reason}. Re-run the upstream extraction first")]
    MissingInput { path: PathBuf, reason: String },

    #[error("Keyword classifier could not be built: {0}")]
    ClassifierConstruction(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Metrics error: {0}")]
    Metrics(String),
}

impl ReportError {
    pub fn missing_input(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ReportError::MissingInput {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Process exit code for this failure. Missing inputs and classifier
    /// failures get their own codes so wrappers can tell them apart.
    pub fn exit_code(&self) -> i32 {
        match self {
            ReportError::MissingInput { .. } => 3,
            ReportError::ClassifierConstruction(_) => 4,
            _ => 1,
        }
    }

    pub fn is_missing_input(&self) -> bool {
        matches!(self, ReportError::MissingInput { .. })
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct() {
        let missing = ReportError::missing_input("a.csv", "not found");
        let classifier = ReportError::ClassifierConstruction("bad".into());
        let other = ReportError::Config("nope".into());

        assert_eq!(missing.exit_code(), 3);
        assert_eq!(classifier.exit_code(), 4);
        assert_eq!(other.exit_code(), 1);
        assert!(missing.is_missing_input());
        assert!(!classifier.is_missing_input());
    }

    #[test]
    fn test_missing_input_message_names_path() {
        let err = ReportError::missing_input("out/pr_task_type.csv", "No such file");
        let msg = err.to_string();
        assert!(msg.contains("out/pr_task_type.csv"));
        assert!(msg.contains("No such file"));
    }
}
