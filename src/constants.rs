/// Column names, file names and the default keyword vocabulary.
/// These constants keep the extraction outputs and the report inputs in agreement.

// Pull request table (primary stream)
pub const PR_TITLE: &str = "TITLE";
pub const PR_ID: &str = "ID";
pub const PR_AGENT: &str = "AGENTNAME";
pub const PR_BODY: &str = "BODYSTRING";
pub const PR_REPO_ID: &str = "REPOID";
pub const PR_REPO_URL: &str = "REPOURL";

// Task type table (lookup stream)
pub const TT_ID: &str = "PRID";
pub const TT_TITLE: &str = "PRTITLE";
pub const TT_REASON: &str = "PRREASON";
pub const TT_TYPE: &str = "PRTYPE";
pub const TT_CONFIDENCE: &str = "CONFIDENCE";

/// Header of the security summary, in output order.
pub const SUMMARY_HEADER: [&str; 5] = ["ID", "AGENT", "TYPE", "CONFIDENCE", "SECURITY"];

// Default file names. Sources are NDJSON exports of the dataset splits.
pub const PULL_REQUESTS_TABLE: &str = "all_pull_request";
pub const REPOSITORIES_TABLE: &str = "all_repository";
pub const TASK_TYPES_TABLE: &str = "pr_task_type";
pub const COMMIT_DETAILS_TABLE: &str = "pr_commit_details";
pub const SUMMARY_FILE: &str = "security_summary.csv";

pub const DEFAULT_CONFIG_FILE: &str = "aidev_report.toml";
pub const CONFIG_ENV_VAR: &str = "AIDEV_REPORT_CONFIG";

pub const DEFAULT_REPORT_PROGRESS_EVERY: u64 = 50_000;
pub const DEFAULT_EXTRACT_PROGRESS_EVERY: u64 = 10_000;

/// Security-related keywords. Matched as case-insensitive substrings, so short
/// terms like "css" and "dos" also hit inside longer words.
pub const SECURITY_KEYWORDS: &[&str] = &[
    "race",
    "racy",
    "buffer",
    "overflow",
    "stack",
    "integer",
    "signedness",
    "underflow",
    "improper",
    "unauthenticated",
    "gain access",
    "permission",
    "cross site",
    "css",
    "xss",
    "denial service",
    "dos",
    "crash",
    "deadlock",
    "injection",
    "request forgery",
    "csrf",
    "xsrf",
    "forged",
    "security",
    "vulnerability",
    "vulnerable",
    "exploit",
    "attack",
    "bypass",
    "backdoor",
    "threat",
    "expose",
    "breach",
    "violate",
    "fatal",
    "blacklist",
    "overrun",
    "insecure",
];

pub fn default_keywords() -> Vec<String> {
    SECURITY_KEYWORDS.iter().map(|k| k.to_string()).collect()
}
