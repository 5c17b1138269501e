use crate::config::SiteConfig;
use crate::core::session::SessionGateway;
use crate::core::strategy::{select_document, Lookup, StrategyChain};
use crate::domain::model::JournalCandidate;
use crate::utils::error::{Result, SjrError};
use scraper::{ElementRef, Html};

pub const SEARCH_INPUT_SELECTOR: &str = "#searchinput";
pub const RESULTS_URL_FRAGMENT: &str = "journalsearch.php?q=";
const RESULT_CONTAINER_SELECTOR: &str = "div.search_results > a";
const RESULT_LINK_SELECTOR: &str = "a[href*='journalsearch.php?q=']";

pub struct SearchClient<'a> {
    gateway: &'a SessionGateway,
    site: &'a SiteConfig,
}

impl<'a> SearchClient<'a> {
    pub fn new(gateway: &'a SessionGateway, site: &'a SiteConfig) -> Self {
        Self { gateway, site }
    }

    /// Submits `query` through the site's search box. No hits is an empty list, not an error.
    pub async fn search(&self, query: &str) -> Result<Vec<JournalCandidate>> {
        let _exclusive = self.gateway.exclusive().await;
        let timeouts = self.gateway.timeouts();
        let session = self.gateway.session();

        tracing::info!("🔍 Searching for: {}", query);
        let root = self.site.root_url()?.to_string();
        self.gateway.navigate(&root, timeouts.navigation()).await?;

        if !session
            .wait_for_selector(SEARCH_INPUT_SELECTOR, timeouts.search_input())
            .await?
        {
            return Err(SjrError::SearchEntryNotFound {
                selector: SEARCH_INPUT_SELECTOR.to_string(),
            });
        }

        session.fill_and_submit(SEARCH_INPUT_SELECTOR, query).await?;

        // 結果頁網址沒出現也繼續，直接解析目前的 DOM
        match session
            .wait_for_url(RESULTS_URL_FRAGMENT, timeouts.results_url())
            .await
        {
            Ok(true) => {}
            Ok(false) => tracing::warn!("⚠️ Timeout waiting for search results URL"),
            Err(e) => tracing::warn!("⚠️ Waiting for search results URL failed: {}", e),
        }
        self.gateway.mitigate_interstitials().await;

        let html = session.content().await?;
        let candidates = Self::parse_results(&html);
        tracing::info!("📋 Found {} result(s) for '{}'", candidates.len(), query);
        Ok(candidates)
    }

    /// Result anchors from the listing container, or any result-template link when the
    /// container is missing.
    pub fn parse_results(html: &str) -> Vec<JournalCandidate> {
        let document = Html::parse_document(html);
        let chain = StrategyChain::new("search results")
            .then("results-container", |doc| {
                candidates_from(select_document(doc, RESULT_CONTAINER_SELECTOR))
            })
            .then("result-link-template", |doc| {
                candidates_from(select_document(doc, RESULT_LINK_SELECTOR))
            });

        chain.resolve(&document).into_option().unwrap_or_default()
    }
}

fn candidates_from(anchors: Vec<ElementRef<'_>>) -> Lookup<Vec<JournalCandidate>> {
    let candidates: Vec<JournalCandidate> = anchors
        .into_iter()
        .filter_map(|anchor| {
            let locator = anchor.value().attr("href")?.trim();
            // 標題取第一段非空白文字，後面通常是出版社資訊
            let title = anchor
                .text()
                .map(str::trim)
                .find(|text| !text.is_empty())?;
            if locator.is_empty() {
                return None;
            }
            Some(JournalCandidate {
                title: title.to_string(),
                locator: locator.to_string(),
            })
        })
        .collect();

    if candidates.is_empty() {
        Lookup::NotFound
    } else {
        Lookup::Found(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_results_from_container() {
        let html = r#"
<div class="search_results">
  <a href="journalsearch.php?q=22258&amp;tip=sid&amp;clean=0">
    <span class="jrnlname">Bioethics</span>
    <span>Wiley-Blackwell Publishing Ltd</span>
  </a>
  <a href="journalsearch.php?q=19600&amp;tip=sid&amp;clean=0"><span class="jrnlname">Developing World Bioethics</span></a>
  <a href="journalsearch.php?q=1&amp;tip=sid">   </a>
</div>
<a href="journalsearch.php?q=999&amp;tip=sid">Footer link</a>
"#;
        let candidates = SearchClient::parse_results(html);

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].title, "Bioethics");
        assert_eq!(
            candidates[0].locator,
            "journalsearch.php?q=22258&tip=sid&clean=0"
        );
        assert_eq!(candidates[1].title, "Developing World Bioethics");
    }

    #[test]
    fn test_parse_results_falls_back_to_link_template() {
        let html = r#"
<ul class="results">
  <li><a href="journalsearch.php?q=22258&amp;tip=sid">Bioethics</a></li>
  <li><a href="journalrank.php?area=1200">Arts and Humanities</a></li>
</ul>
"#;
        let candidates = SearchClient::parse_results(html);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "Bioethics");
    }

    #[test]
    fn test_parse_results_empty_listing() {
        let html = r#"<div class="search_results"><p>No results found</p></div>"#;
        assert!(SearchClient::parse_results(html).is_empty());
    }
}
