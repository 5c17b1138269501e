use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One search hit; `locator` is the result anchor's target as found on the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalCandidate {
    pub title: String,
    pub locator: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoryKind {
    Area,
    Category,
}

impl CategoryKind {
    /// Query parameter used by the ranking list page.
    pub fn query_key(self) -> &'static str {
        match self {
            CategoryKind::Area => "area",
            CategoryKind::Category => "category",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CategoryKind::Area => "Subject Area",
            CategoryKind::Category => "Category",
        }
    }
}

impl FromStr for CategoryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "area" | "subject area" => Ok(CategoryKind::Area),
            "category" => Ok(CategoryKind::Category),
            other => Err(format!("unknown classification kind '{}'", other)),
        }
    }
}

/// `id` is only unique within its `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryRef {
    pub name: String,
    pub kind: CategoryKind,
    pub id: u32,
}

impl fmt::Display for CategoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name, self.kind.label(), self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Quartile {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quartile {
    /// Accepts labels such as `Q1`, ` q2 ` or `Q3 (2022)`.
    pub fn parse_label(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let mut chars = trimmed.chars();
        match (chars.next(), chars.next()) {
            (Some('Q') | Some('q'), Some(digit)) => {
                let rest_ok = chars.next().map_or(true, |c| !c.is_ascii_digit());
                if !rest_ok {
                    return None;
                }
                match digit {
                    '1' => Some(Quartile::Q1),
                    '2' => Some(Quartile::Q2),
                    '3' => Some(Quartile::Q3),
                    '4' => Some(Quartile::Q4),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

impl fmt::Display for Quartile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Quartile::Q1 => "Q1",
            Quartile::Q2 => "Q2",
            Quartile::Q3 => "Q3",
            Quartile::Q4 => "Q4",
        };
        f.write_str(label)
    }
}

/// An extracted value, or `Unknown` when extraction was attempted and failed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Metric<T> {
    Known(T),
    Unknown,
}

impl<T> Metric<T> {
    pub fn is_known(&self) -> bool {
        matches!(self, Metric::Known(_))
    }

    pub fn known(&self) -> Option<&T> {
        match self {
            Metric::Known(value) => Some(value),
            Metric::Unknown => None,
        }
    }
}

impl<T> From<Option<T>> for Metric<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Metric::Unknown, Metric::Known)
    }
}

impl<T> Default for Metric<T> {
    fn default() -> Self {
        Metric::Unknown
    }
}

impl<T: fmt::Display> fmt::Display for Metric<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Known(value) => value.fmt(f),
            Metric::Unknown => f.write_str("N/A"),
        }
    }
}

/// Strips hyphens and whitespace; uppercases the `X` check digit.
pub fn normalize_issn(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Splits a possibly comma-joined ISSN cell into normalized codes.
pub fn split_issns(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(normalize_issn)
        .filter(|code| !code.is_empty())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricsBundle {
    pub sjr: Metric<f64>,
    pub quartile: Metric<Quartile>,
    pub h_index: Metric<u32>,
    /// Normalized codes, first-seen order, no duplicates.
    pub issns: Vec<String>,
    /// First-seen order, no duplicate `(kind, id)` pairs.
    pub categories: Vec<CategoryRef>,
}

impl MetricsBundle {
    /// The bundle for a page where nothing could be extracted.
    pub fn unknown() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingRow {
    pub rank: u32,
    pub title: String,
    pub issns: Vec<String>,
    pub sjr: Metric<f64>,
    pub quartile: Metric<Quartile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentileRecord {
    pub category: CategoryRef,
    pub rank: u32,
    pub total: u32,
    pub percentile: f64,
    pub sjr: Metric<f64>,
    pub quartile: Metric<Quartile>,
}

/// Everything one run assembled, possibly partial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupReport {
    pub query: String,
    pub year: String,
    pub candidates_found: usize,
    pub candidate: Option<JournalCandidate>,
    pub metrics: Option<MetricsBundle>,
    pub percentiles: Vec<PercentileRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issn_normalization() {
        assert_eq!(normalize_issn("1234-5678"), "12345678");
        assert_eq!(normalize_issn("1234 5678"), "12345678");
        assert_eq!(normalize_issn("0000-000x"), "0000000X");
    }

    #[test]
    fn test_issn_normalization_is_idempotent() {
        for raw in ["1234-5678", " 1467 8519 ", "0269970X", "02699702"] {
            let once = normalize_issn(raw);
            assert_eq!(normalize_issn(&once), once);
        }
    }

    #[test]
    fn test_split_issns() {
        assert_eq!(
            split_issns("14678519, 0269-9702"),
            vec!["14678519".to_string(), "02699702".to_string()]
        );
        assert!(split_issns("").is_empty());
        assert!(split_issns(" , ").is_empty());
    }

    #[test]
    fn test_quartile_labels() {
        assert_eq!(Quartile::parse_label("Q1"), Some(Quartile::Q1));
        assert_eq!(Quartile::parse_label(" q4 "), Some(Quartile::Q4));
        assert_eq!(Quartile::parse_label("Q2 (2022)"), Some(Quartile::Q2));
        assert_eq!(Quartile::parse_label("Q12"), None);
        assert_eq!(Quartile::parse_label("-"), None);
        assert_eq!(Quartile::parse_label(""), None);
    }

    #[test]
    fn test_metric_display_and_serde() {
        let known: Metric<f64> = Metric::Known(0.491);
        let unknown: Metric<f64> = Metric::Unknown;
        assert_eq!(known.to_string(), "0.491");
        assert_eq!(unknown.to_string(), "N/A");
        assert_eq!(serde_json::to_string(&unknown).unwrap(), "null");
        assert_eq!(serde_json::to_string(&known).unwrap(), "0.491");
    }

    #[test]
    fn test_category_kind_parsing() {
        assert_eq!("area".parse::<CategoryKind>(), Ok(CategoryKind::Area));
        assert_eq!(" Category ".parse::<CategoryKind>(), Ok(CategoryKind::Category));
        assert!("journal".parse::<CategoryKind>().is_err());
    }
}
