pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::SjrConfig;

pub use adapters::{ChromeSession, ExportFetcher, LocalStorage};
pub use crate::core::engine::{FirstCandidate, LookupEngine, PickIndex, RunOptions};
pub use crate::core::pipeline::SjrPipeline;
pub use crate::core::report::ReportWriter;
pub use crate::core::session::{SessionGateway, SessionStatus};
pub use domain::model::{
    CategoryKind, CategoryRef, JournalCandidate, LookupReport, Metric, MetricsBundle,
    PercentileRecord, Quartile, RankingRow,
};
pub use utils::error::{Result, SjrError};
