use crate::domain::model::{JournalCandidate, LookupReport};
use crate::domain::ports::{CandidateSelector, Pipeline};
use crate::utils::error::{Result, SjrError};
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub year: String,
    /// Stop after the indicators; no ranking tables are fetched.
    pub metrics_only: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            year: "2022".to_string(),
            metrics_only: false,
        }
    }
}

/// Drives one lookup at a time over a pipeline.
pub struct LookupEngine<P: Pipeline> {
    pipeline: P,
    run_lock: Mutex<()>,
}

impl<P: Pipeline> LookupEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self {
            pipeline,
            run_lock: Mutex::new(()),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    /// Search, select, extract, then per-category percentiles.
    ///
    /// Fails only when the search cannot be submitted or another run holds the
    /// engine. Everything later degrades into a partial report.
    pub async fn run(
        &self,
        query: &str,
        options: &RunOptions,
        selector: &dyn CandidateSelector,
    ) -> Result<LookupReport> {
        let _running = self.run_lock.try_lock().map_err(|_| SjrError::SessionBusy)?;

        tracing::info!("🚀 Starting lookup for '{}' ({})", query, options.year);
        let candidates = self.pipeline.search(query).await?;

        let mut report = LookupReport {
            query: query.to_string(),
            year: options.year.clone(),
            candidates_found: candidates.len(),
            candidate: None,
            metrics: None,
            percentiles: Vec::new(),
        };

        if candidates.is_empty() {
            tracing::warn!("⚠️ No journals found for '{}'", query);
            return Ok(report);
        }

        let Some(candidate) = choose(&candidates, selector) else {
            tracing::info!("Selection cancelled");
            return Ok(report);
        };
        tracing::info!("✅ Selected: {}", candidate.title);

        let bundle = self.pipeline.metrics(&candidate).await;
        if !options.metrics_only {
            if bundle.categories.is_empty() {
                tracing::warn!("⚠️ No subject categories found; nothing to rank");
            } else {
                report.percentiles = self
                    .pipeline
                    .percentiles(&candidate.title, &bundle, &options.year)
                    .await;
            }
        }

        report.candidate = Some(candidate);
        report.metrics = Some(bundle);
        Ok(report)
    }
}

fn choose(candidates: &[JournalCandidate], selector: &dyn CandidateSelector) -> Option<JournalCandidate> {
    let index = selector.select(candidates)?;
    match candidates.get(index) {
        Some(candidate) => Some(candidate.clone()),
        None => {
            tracing::warn!(
                "⚠️ Selection {} is out of range (1..={})",
                index + 1,
                candidates.len()
            );
            None
        }
    }
}

/// Always takes the first search hit.
pub struct FirstCandidate;

impl CandidateSelector for FirstCandidate {
    fn select(&self, candidates: &[JournalCandidate]) -> Option<usize> {
        (!candidates.is_empty()).then_some(0)
    }
}

/// Takes a fixed 1-based position.
pub struct PickIndex(pub usize);

impl CandidateSelector for PickIndex {
    fn select(&self, _candidates: &[JournalCandidate]) -> Option<usize> {
        self.0.checked_sub(1)
    }
}
