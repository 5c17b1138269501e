//! Ordered, named extraction strategies.
//!
//! Each field of a detail page is resolved by a [`StrategyChain`]: a list of
//! strategies from most structure-specific to loosest, tried in order until one
//! reports [`Lookup::Found`]. Strategies are plain functions over an HTML
//! snapshot so they can be exercised against fixtures.

use crate::domain::model::Metric;
use scraper::{ElementRef, Html, Selector};

#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Lookup::NotFound, Lookup::Found)
    }
}

pub type StrategyFn<T> = fn(&Html) -> Lookup<T>;

pub struct Strategy<T> {
    pub name: &'static str,
    run: StrategyFn<T>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<T> {
    Found { value: T, strategy: &'static str },
    NotFound,
}

impl<T> Resolution<T> {
    pub fn into_metric(self) -> Metric<T> {
        match self {
            Resolution::Found { value, .. } => Metric::Known(value),
            Resolution::NotFound => Metric::Unknown,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Resolution::Found { value, .. } => Some(value),
            Resolution::NotFound => None,
        }
    }
}

pub struct StrategyChain<T> {
    field: &'static str,
    strategies: Vec<Strategy<T>>,
}

impl<T: std::fmt::Debug> StrategyChain<T> {
    pub fn new(field: &'static str) -> Self {
        Self {
            field,
            strategies: Vec::new(),
        }
    }

    pub fn then(mut self, name: &'static str, run: StrategyFn<T>) -> Self {
        self.strategies.push(Strategy { name, run });
        self
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name).collect()
    }

    pub fn resolve(&self, document: &Html) -> Resolution<T> {
        for strategy in &self.strategies {
            match (strategy.run)(document) {
                Lookup::Found(value) => {
                    tracing::debug!(
                        "🔎 {}: '{}' found {:?}",
                        self.field,
                        strategy.name,
                        value
                    );
                    return Resolution::Found {
                        value,
                        strategy: strategy.name,
                    };
                }
                Lookup::NotFound => {
                    tracing::debug!("{}: '{}' found nothing", self.field, strategy.name);
                }
            }
        }
        tracing::warn!(
            "⚠️ {} could not be extracted (tried {})",
            self.field,
            self.names().join(", ")
        );
        Resolution::NotFound
    }
}

/// Parses a static selector; an unparseable one simply matches nothing.
pub fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            tracing::debug!("Invalid selector '{}': {:?}", css, e);
            None
        }
    }
}

pub fn select_all<'a>(scope: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match selector(css) {
        Some(sel) => scope.select(&sel).collect(),
        None => Vec::new(),
    }
}

pub fn select_document<'a>(document: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match selector(css) {
        Some(sel) => document.select(&sel).collect(),
        None => Vec::new(),
    }
}

/// Text of an element with whitespace runs collapsed.
pub fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parents of every element matching `css` whose text contains `label`.
pub fn blocks_labelled<'a>(document: &'a Html, css: &str, label: &str) -> Vec<ElementRef<'a>> {
    select_document(document, css)
        .into_iter()
        .filter(|heading| text_of(*heading).contains(label))
        .filter_map(|heading| heading.parent().and_then(ElementRef::wrap))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_paragraph(document: &Html) -> Lookup<String> {
        select_document(document, "p")
            .into_iter()
            .next()
            .map(text_of)
            .into()
    }

    fn never(_document: &Html) -> Lookup<String> {
        Lookup::NotFound
    }

    #[test]
    fn test_chain_stops_at_first_found() {
        let document = Html::parse_document("<p>  hello   world </p><p>second</p>");
        let chain = StrategyChain::new("greeting")
            .then("never", never)
            .then("first-paragraph", first_paragraph);

        assert_eq!(chain.names(), vec!["never", "first-paragraph"]);
        assert_eq!(
            chain.resolve(&document),
            Resolution::Found {
                value: "hello world".to_string(),
                strategy: "first-paragraph"
            }
        );
    }

    #[test]
    fn test_chain_not_found_becomes_unknown() {
        let document = Html::parse_document("<div></div>");
        let chain = StrategyChain::new("greeting").then("first-paragraph", first_paragraph);

        let resolution = chain.resolve(&document);
        assert_eq!(resolution, Resolution::NotFound);
        assert_eq!(resolution.into_metric(), Metric::<String>::Unknown);
    }

    #[test]
    fn test_blocks_labelled() {
        let document = Html::parse_document(
            "<div id='a'><h2>ISSN</h2><p>02699702</p></div><div id='b'><h2>Other</h2></div>",
        );
        let blocks = blocks_labelled(&document, "h2", "ISSN");

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].value().attr("id"), Some("a"));
    }
}
