use crate::adapters::http::ExportFetcher;
use crate::config::SiteConfig;
use crate::core::extract::MetricsExtractor;
use crate::core::matcher::match_journal;
use crate::core::percentile;
use crate::core::rankings::RankingsDownloader;
use crate::core::search::SearchClient;
use crate::core::session::SessionGateway;
use crate::core::table::RankingSchema;
use crate::domain::model::{JournalCandidate, MetricsBundle, PercentileRecord};
use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use std::path::PathBuf;
use std::sync::Arc;

/// The site-backed pipeline: every step drives the one shared browser session.
pub struct SjrPipeline {
    gateway: Arc<SessionGateway>,
    site: SiteConfig,
    fetcher: ExportFetcher,
    diagnostics_dir: PathBuf,
    schema: RankingSchema,
}

impl SjrPipeline {
    pub fn new(
        gateway: Arc<SessionGateway>,
        site: SiteConfig,
        fetcher: ExportFetcher,
        diagnostics_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            gateway,
            site,
            fetcher,
            diagnostics_dir: diagnostics_dir.into(),
            schema: RankingSchema::default(),
        }
    }

    pub fn with_schema(mut self, schema: RankingSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn gateway(&self) -> &Arc<SessionGateway> {
        &self.gateway
    }
}

#[async_trait::async_trait]
impl Pipeline for SjrPipeline {
    async fn search(&self, query: &str) -> Result<Vec<JournalCandidate>> {
        SearchClient::new(&self.gateway, &self.site)
            .search(query)
            .await
    }

    async fn metrics(&self, candidate: &JournalCandidate) -> MetricsBundle {
        tracing::info!("📖 Reading indicators for '{}'", candidate.title);
        MetricsExtractor::new(&self.gateway, &self.site)
            .extract(&candidate.locator)
            .await
    }

    async fn percentiles(
        &self,
        title: &str,
        bundle: &MetricsBundle,
        year: &str,
    ) -> Vec<PercentileRecord> {
        let downloader =
            RankingsDownloader::new(&self.gateway, &self.site, &self.fetcher, &self.diagnostics_dir)
                .with_schema(self.schema);
        let mut records = Vec::new();

        for category in &bundle.categories {
            let table = match downloader.download(year, category.id, category.kind).await {
                Ok(table) => table,
                Err(e) => {
                    tracing::warn!("⚠️ Skipping {}: {}", category, e);
                    continue;
                }
            };

            match match_journal(&table, &bundle.issns, title) {
                Some(found) => {
                    let record = percentile::compute(found.row, table.total(), category);
                    tracing::info!(
                        "🎯 {}: rank {}/{} → {:.2}% (matched by {:?})",
                        category.name,
                        record.rank,
                        record.total,
                        record.percentile,
                        found.matched_by
                    );
                    records.push(record);
                }
                None => {
                    tracing::warn!(
                        "⚠️ '{}' not found among {} journals of {}",
                        title,
                        table.total(),
                        category
                    );
                }
            }
        }

        tracing::info!(
            "📈 Computed {} of {} percentile(s)",
            records.len(),
            bundle.categories.len()
        );
        records
    }
}
