pub mod classifier;
pub mod config;
pub mod constants;
pub mod error;
pub mod extract;
pub mod logging;
pub mod lookup;
pub mod metrics;
pub mod pipeline;
pub mod report;
pub mod sink;
pub mod sources;
pub mod types;

pub use classifier::{KeywordClassifier, KeywordVocabulary};
pub use config::Config;
pub use error::{ReportError, Result};
pub use lookup::{LookupIndex, LookupIndexBuilder};
pub use pipeline::JoinEmitPipeline;
pub use report::RunSummary;
