use crate::adapters::http::ExportFetcher;
use crate::config::SiteConfig;
use crate::core::session::SessionGateway;
use crate::core::strategy::select_document;
use crate::core::table::{parse_ranking_file, ParseFailure, RankingSchema, RankingTable};
use crate::domain::model::CategoryKind;
use crate::utils::error::SjrError;
use scraper::Html;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Styled export button first, any export link second.
pub const EXPORT_SELECTORS: [&str; 2] = ["a.button[href*='out=xls']", "a[href*='out=xls']"];

/// A ranking table that could not be obtained. Always local to one category.
#[derive(Error, Debug)]
pub enum DownloadFailure {
    #[error("ranking page unreachable: {0}")]
    Navigation(#[source] SjrError),

    #[error("export control never appeared on {url}")]
    ExportControlTimeout {
        url: String,
        screenshot: Option<PathBuf>,
    },

    #[error("export transfer failed: {message}")]
    Transfer { message: String },

    #[error(transparent)]
    Parse(#[from] ParseFailure),
}

pub struct RankingsDownloader<'a> {
    gateway: &'a SessionGateway,
    site: &'a SiteConfig,
    fetcher: &'a ExportFetcher,
    diagnostics_dir: &'a Path,
    schema: RankingSchema,
}

impl<'a> RankingsDownloader<'a> {
    pub fn new(
        gateway: &'a SessionGateway,
        site: &'a SiteConfig,
        fetcher: &'a ExportFetcher,
        diagnostics_dir: &'a Path,
    ) -> Self {
        Self {
            gateway,
            site,
            fetcher,
            diagnostics_dir,
            schema: RankingSchema::default(),
        }
    }

    pub fn with_schema(mut self, schema: RankingSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Fetches the full ranking list of one classification for `year`.
    pub async fn download(
        &self,
        year: &str,
        id: u32,
        kind: CategoryKind,
    ) -> Result<RankingTable, DownloadFailure> {
        let _exclusive = self.gateway.exclusive().await;
        let timeouts = self.gateway.timeouts();
        let session = self.gateway.session();

        let url = self
            .site
            .ranking_url(kind, id, year)
            .map_err(DownloadFailure::Navigation)?;
        tracing::info!("📊 Fetching {} ranking {} for {}", kind.query_key(), id, year);

        self.gateway
            .navigate(&url, timeouts.navigation())
            .await
            .map_err(DownloadFailure::Navigation)?;

        let combined = EXPORT_SELECTORS.join(", ");
        let visible = self
            .gateway
            .await_human(&url, &combined, timeouts.export_wait())
            .await
            .map_err(DownloadFailure::Navigation)?;
        if !visible {
            let screenshot = self.capture_diagnostics().await;
            return Err(DownloadFailure::ExportControlTimeout { url, screenshot });
        }

        let html = session.content().await.map_err(transfer)?;
        let href = export_href(&html).ok_or_else(|| DownloadFailure::Transfer {
            message: "export control has no link target".to_string(),
        })?;
        let export_url = self.site.resolve(&href).map_err(transfer)?;
        let page_url = session.current_url().await.unwrap_or_else(|_| url.clone());
        let cookies = session.cookies().await.map_err(transfer)?;

        let bytes = self
            .fetcher
            .fetch(&export_url, &page_url, &cookies)
            .await
            .map_err(transfer)?;

        // 暫存檔在 drop 時自動刪除，成功或失敗都一樣
        let mut artifact = tempfile::Builder::new()
            .prefix("temp_sjr_")
            .suffix(".xlsx")
            .tempfile()
            .map_err(|e| transfer(e.into()))?;
        artifact
            .write_all(&bytes)
            .and_then(|_| artifact.flush())
            .map_err(|e| transfer(e.into()))?;

        let table = parse_ranking_file(artifact.path(), &self.schema)?;
        tracing::info!(
            "✅ {} ranking {} has {} journals",
            kind.query_key(),
            id,
            table.total()
        );
        Ok(table)
    }

    async fn capture_diagnostics(&self) -> Option<PathBuf> {
        let name = format!(
            "debug_ranking_fail_{}.png",
            chrono::Local::now().format("%Y%m%d%H%M%S")
        );
        let path = self.diagnostics_dir.join(name);
        match self.gateway.session().screenshot(&path).await {
            Ok(()) => {
                tracing::warn!("📸 Export control missing; screenshot saved to {}", path.display());
                Some(path)
            }
            Err(e) => {
                tracing::warn!("⚠️ Export control missing and screenshot failed: {}", e);
                None
            }
        }
    }
}

fn transfer(error: SjrError) -> DownloadFailure {
    DownloadFailure::Transfer {
        message: error.to_string(),
    }
}

/// Link target of the export control, trying each selector tier in order.
pub fn export_href(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    EXPORT_SELECTORS.iter().find_map(|css| {
        select_document(&document, css)
            .into_iter()
            .find_map(|anchor| anchor.value().attr("href"))
            .map(|href| href.trim().to_string())
            .filter(|href| !href.is_empty())
    })
}
