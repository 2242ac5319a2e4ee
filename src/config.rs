use crate::constants;
use crate::error::{ReportError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub report: ReportConfig,
    pub columns: ColumnConfig,
    pub classifier: ClassifierConfig,
    pub progress: ProgressConfig,
    pub extract: ExtractConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Pull request CSV (primary stream)
    pub primary: PathBuf,
    /// Task type CSV (lookup stream)
    pub lookup: PathBuf,
    pub output: PathBuf,
    /// Extra files that must exist before the report runs, even though it does not read them.
    pub also_required: Vec<PathBuf>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            primary: PathBuf::from(format!("{}.csv", constants::PULL_REQUESTS_TABLE)),
            lookup: PathBuf::from(format!("{}.csv", constants::TASK_TYPES_TABLE)),
            output: PathBuf::from(constants::SUMMARY_FILE),
            also_required: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub primary_id: String,
    pub primary_agent: String,
    pub primary_title: String,
    pub primary_body: String,
    pub lookup_id: String,
    pub lookup_class: String,
    pub lookup_confidence: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            primary_id: constants::PR_ID.to_string(),
            primary_agent: constants::PR_AGENT.to_string(),
            primary_title: constants::PR_TITLE.to_string(),
            primary_body: constants::PR_BODY.to_string(),
            lookup_id: constants::TT_ID.to_string(),
            lookup_class: constants::TT_TYPE.to_string(),
            lookup_confidence: constants::TT_CONFIDENCE.to_string(),
        }
    }
}

/// How classifier keywords are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Keywords are plain text and are escaped before compiling.
    #[default]
    Literal,
    /// Keywords are regular expression fragments.
    Pattern,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub mode: MatchMode,
    pub keywords: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            mode: MatchMode::Literal,
            keywords: constants::default_keywords(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Report progress every N joined records. Zero disables progress lines.
    pub every: u64,
    /// Extraction progress interval.
    pub extract_every: u64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            every: constants::DEFAULT_REPORT_PROGRESS_EVERY,
            extract_every: constants::DEFAULT_EXTRACT_PROGRESS_EVERY,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, `AIDEV_REPORT_CONFIG` is
    /// consulted, then `aidev_report.toml` in the working directory; if
    /// neither is present the built-in defaults are used.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let (config_path, required) = match explicit {
            Some(p) => (p.to_path_buf(), true),
            None => match std::env::var(constants::CONFIG_ENV_VAR) {
                Ok(v) if !v.trim().is_empty() => (PathBuf::from(v), true),
                _ => (PathBuf::from(constants::DEFAULT_CONFIG_FILE), false),
            },
        };

        if !config_path.exists() {
            if required {
                return Err(ReportError::Config(format!(
                    "Config file '{}' does not exist",
                    config_path.display()
                )));
            }
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(&config_path).map_err(|e| {
            ReportError::Config(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;

        Self::from_toml_str(&config_content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let cols = &self.columns;
        for (name, value) in [
            ("columns.primary_id", &cols.primary_id),
            ("columns.lookup_id", &cols.lookup_id),
        ] {
            if value.trim().is_empty() {
                return Err(ReportError::Config(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }

    /// Point the report at the CSVs written by the extraction step in `dir`,
    /// and require the other two extraction outputs to be present as well.
    pub fn chain_extract_outputs(&mut self, dir: &Path) {
        let csv = |table: &str| dir.join(format!("{table}.csv"));
        self.report.primary = csv(constants::PULL_REQUESTS_TABLE);
        self.report.lookup = csv(constants::TASK_TYPES_TABLE);
        self.report.output = dir.join(constants::SUMMARY_FILE);
        self.report.also_required = vec![
            csv(constants::REPOSITORIES_TABLE),
            csv(constants::COMMIT_DETAILS_TABLE),
        ];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_extraction_outputs() {
        let config = Config::default();
        assert_eq!(config.report.primary, PathBuf::from("all_pull_request.csv"));
        assert_eq!(config.report.lookup, PathBuf::from("pr_task_type.csv"));
        assert_eq!(config.columns.lookup_class, "PRTYPE");
        assert_eq!(config.classifier.mode, MatchMode::Literal);
        assert_eq!(config.classifier.keywords.len(), constants::SECURITY_KEYWORDS.len());
        assert!(config.report.also_required.is_empty());
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = Config::from_toml_str(
            r#"
            [report]
            output = "out/summary.csv"

            [classifier]
            keywords = ["leak", "cve"]

            [progress]
            every = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.report.output, PathBuf::from("out/summary.csv"));
        assert_eq!(config.report.primary, PathBuf::from("all_pull_request.csv"));
        assert_eq!(config.classifier.keywords, vec!["leak", "cve"]);
        assert_eq!(config.progress.every, 10);
        assert_eq!(config.progress.extract_every, 10_000);
    }

    #[test]
    fn test_pattern_mode_parses() {
        let config = Config::from_toml_str("[classifier]\nmode = \"pattern\"\n").unwrap();
        assert_eq!(config.classifier.mode, MatchMode::Pattern);
    }

    #[test]
    fn test_empty_id_column_rejected() {
        let err = Config::from_toml_str("[columns]\nlookup_id = \"\"\n").unwrap_err();
        assert!(matches!(err, ReportError::Config(_)));
    }

    #[test]
    fn test_missing_explicit_config_is_error() {
        let err = Config::load(Some(Path::new("/nonexistent/aidev_report.toml"))).unwrap_err();
        assert!(matches!(err, ReportError::Config(_)));
    }

    #[test]
    fn test_chain_extract_outputs() {
        let mut config = Config::default();
        config.chain_extract_outputs(Path::new("out"));
        assert_eq!(config.report.primary, Path::new("out").join("all_pull_request.csv"));
        assert_eq!(config.report.output, Path::new("out").join("security_summary.csv"));
        assert_eq!(config.report.also_required.len(), 2);
    }
}
