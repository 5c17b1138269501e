use crate::config::SiteConfig;
use crate::core::session::SessionGateway;
use crate::core::strategy::{
    blocks_labelled, select_all, select_document, text_of, Lookup, StrategyChain,
};
use crate::domain::model::{normalize_issn, CategoryKind, CategoryRef, MetricsBundle, Quartile};
use regex::Regex;
use scraper::Html;
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

/// Element the detail page renders once its indicators are in place.
pub const KEY_INDICATOR_SELECTOR: &str = ".hindexnumber";
pub const CATEGORY_SECTION_LABEL: &str = "Subject Area and Category";

static DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:[.,]\d+)?").expect("decimal pattern"));
static INTEGER_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)\s*$").expect("integer pattern"));
static INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("integer pattern"));
static QUARTILE_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bQ[1-4]\b").expect("quartile pattern"));
static ISSN_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{4}-?\d{3}[\dXx]\b").expect("issn pattern"));

pub struct MetricsExtractor<'a> {
    gateway: &'a SessionGateway,
    site: &'a SiteConfig,
}

impl<'a> MetricsExtractor<'a> {
    pub fn new(gateway: &'a SessionGateway, site: &'a SiteConfig) -> Self {
        Self { gateway, site }
    }

    /// Never fails: whatever could not be read stays `Unknown` or empty.
    pub async fn extract(&self, locator: &str) -> MetricsBundle {
        let _exclusive = self.gateway.exclusive().await;
        let timeouts = self.gateway.timeouts();

        let url = match self.site.resolve(locator) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("⚠️ Cannot resolve journal page '{}': {}", locator, e);
                return MetricsBundle::unknown();
            }
        };

        tracing::info!("📄 Extracting metrics from {}", url);
        if let Err(e) = self.gateway.navigate(&url, timeouts.navigation()).await {
            tracing::warn!("⚠️ Journal page unavailable, metrics left unknown: {}", e);
            return MetricsBundle::unknown();
        }

        let session = self.gateway.session();
        match session
            .wait_for_selector(KEY_INDICATOR_SELECTOR, timeouts.indicator())
            .await
        {
            Ok(true) => {}
            Ok(false) => tracing::debug!("Key indicator not visible, extracting what is present"),
            Err(e) => tracing::debug!("Waiting for key indicator failed: {}", e),
        }
        self.gateway.mitigate_interstitials().await;

        match session.content().await {
            Ok(html) => Self::extract_from_html(&html),
            Err(e) => {
                tracing::warn!("⚠️ Could not read journal page: {}", e);
                MetricsBundle::unknown()
            }
        }
    }

    /// Runs all five field chains independently over one snapshot.
    pub fn extract_from_html(html: &str) -> MetricsBundle {
        let document = Html::parse_document(html);

        let bundle = MetricsBundle {
            sjr: sjr_chain().resolve(&document).into_metric(),
            quartile: quartile_chain().resolve(&document).into_metric(),
            h_index: h_index_chain().resolve(&document).into_metric(),
            issns: issn_chain()
                .resolve(&document)
                .into_option()
                .unwrap_or_default(),
            categories: category_chain()
                .resolve(&document)
                .into_option()
                .unwrap_or_default(),
        };

        tracing::info!(
            "📊 SJR: {}, Quartile: {}, H-Index: {}, ISSNs: {}, Categories: {}",
            bundle.sjr,
            bundle.quartile,
            bundle.h_index,
            bundle.issns.len(),
            bundle.categories.len()
        );
        bundle
    }
}

pub fn sjr_chain() -> StrategyChain<f64> {
    StrategyChain::new("SJR")
        .then("hsjr-span", |doc| {
            first_parsed(doc, ".content-hindex span.hsjr", parse_decimal)
        })
        .then("sjr-heading-box", |doc| {
            labelled_value(doc, "SJR", ".hindexnumber, p", parse_decimal)
        })
        .then("sjrnumber-class", |doc| {
            first_parsed(doc, ".sjrnumber", parse_decimal)
        })
}

pub fn quartile_chain() -> StrategyChain<Quartile> {
    StrategyChain::new("Quartile")
        .then("hindex-quartile-span", |doc| {
            first_parsed(
                doc,
                ".content-hindex .hindexnumber span[class^='Q']",
                Quartile::parse_label,
            )
        })
        .then("sjr-heading-quartile", |doc| {
            labelled_value(doc, "SJR", "*", |text| {
                QUARTILE_LABEL
                    .find(text)
                    .and_then(|m| Quartile::parse_label(m.as_str()))
            })
        })
        .then("quartile-class", |doc| {
            select_document(doc, ".quartile, .Q1, .Q2, .Q3, .Q4")
                .into_iter()
                .find_map(|el| {
                    Quartile::parse_label(&text_of(el)).or_else(|| {
                        el.value().classes().find_map(Quartile::parse_label)
                    })
                })
                .into()
        })
}

pub fn h_index_chain() -> StrategyChain<u32> {
    StrategyChain::new("H-Index")
        .then("hindex-box", |doc| {
            select_document(doc, ".cuadrado")
                .into_iter()
                .filter(|block| text_of(*block).contains("H-Index"))
                .flat_map(|block| select_all(block, ".hindexnumber"))
                .find_map(|el| parse_integer(&text_of(el)))
                .into()
        })
        .then("hindex-heading", |doc| {
            labelled_value(doc, "H-Index", ".hindexnumber, p", parse_integer)
        })
        .then("hindexnumber-class", |doc| {
            // 只接受純整數，避免誤抓 SJR 區塊的小數
            first_parsed(doc, KEY_INDICATOR_SELECTOR, |text| {
                INTEGER_ONLY
                    .captures(text)
                    .and_then(|caps| caps[1].parse().ok())
            })
        })
}

pub fn issn_chain() -> StrategyChain<Vec<String>> {
    StrategyChain::new("ISSN")
        .then("issn-heading", |doc| {
            blocks_labelled(doc, "h2", "ISSN")
                .into_iter()
                .map(|block| issn_codes(&text_of(block)))
                .find(|codes| !codes.is_empty())
                .into()
        })
        .then("issn-label-text", |doc| {
            // 取包含 "ISSN" 字樣且文字最短的元素
            let mut labelled: Vec<String> = select_document(doc, "body *")
                .into_iter()
                .map(text_of)
                .filter(|text| text.contains("ISSN"))
                .collect();
            labelled.sort_by_key(String::len);
            labelled
                .iter()
                .map(|text| issn_codes(text))
                .find(|codes| !codes.is_empty())
                .into()
        })
}

pub fn category_chain() -> StrategyChain<Vec<CategoryRef>> {
    StrategyChain::new("Categories")
        .then("subject-heading-block", |doc| {
            categories_in(blocks_labelled(doc, "h2", CATEGORY_SECTION_LABEL))
        })
        .then("cellgrid-block", |doc| {
            let blocks = select_document(doc, ".cellgrid")
                .into_iter()
                .filter(|block| text_of(*block).contains(CATEGORY_SECTION_LABEL))
                .take(1)
                .collect();
            categories_in(blocks)
        })
}

fn categories_in(blocks: Vec<scraper::ElementRef<'_>>) -> Lookup<Vec<CategoryRef>> {
    let mut seen = HashSet::new();
    let categories: Vec<CategoryRef> = blocks
        .into_iter()
        .flat_map(|block| select_all(block, "a[href]"))
        .filter_map(|link| {
            let href = link.value().attr("href")?;
            let (kind, id) = parse_category_link(href)?;
            Some(CategoryRef {
                name: text_of(link),
                kind,
                id,
            })
        })
        .filter(|category| seen.insert((category.kind, category.id)))
        .collect();

    if categories.is_empty() {
        Lookup::NotFound
    } else {
        Lookup::Found(categories)
    }
}

/// Classifies a link target by its `area=` or `category=` query parameter.
pub fn parse_category_link(href: &str) -> Option<(CategoryKind, u32)> {
    let base = Url::parse("https://placeholder.invalid/").ok()?;
    let url = base.join(href.trim()).ok()?;

    let mut area = None;
    let mut category = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "area" => area = area.or_else(|| value.trim().parse::<u32>().ok()),
            "category" => category = category.or_else(|| value.trim().parse::<u32>().ok()),
            _ => {}
        }
    }

    area.map(|id| (CategoryKind::Area, id))
        .or_else(|| category.map(|id| (CategoryKind::Category, id)))
}

/// Distinct normalized ISSNs in the order they appear.
pub fn issn_codes(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    ISSN_CODE
        .find_iter(text)
        .map(|m| normalize_issn(m.as_str()))
        .filter(|code| seen.insert(code.clone()))
        .collect()
}

pub fn parse_decimal(text: &str) -> Option<f64> {
    DECIMAL
        .find(text)
        .and_then(|m| m.as_str().replace(',', ".").parse().ok())
}

pub fn parse_integer(text: &str) -> Option<u32> {
    INTEGER.find(text).and_then(|m| m.as_str().parse().ok())
}

fn first_parsed<T>(document: &Html, css: &str, parse: impl Fn(&str) -> Option<T>) -> Lookup<T> {
    select_document(document, css)
        .into_iter()
        .find_map(|el| parse(&text_of(el)))
        .into()
}

/// Value elements inside the block headed by an `h2` containing `label`.
fn labelled_value<T>(
    document: &Html,
    label: &str,
    value_css: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Lookup<T> {
    blocks_labelled(document, "h2", label)
        .into_iter()
        .flat_map(|block| select_all(block, value_css))
        .filter(|el| el.value().name() != "h2")
        .find_map(|el| parse(&text_of(el)))
        .into()
}
