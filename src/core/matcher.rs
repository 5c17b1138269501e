use crate::core::table::RankingTable;
use crate::domain::model::{normalize_issn, RankingRow};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchedBy {
    Issn,
    Title,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankMatch<'t> {
    pub row: &'t RankingRow,
    pub matched_by: MatchedBy,
}

/// Finds the target journal's row: any ISSN match wins over a title match.
///
/// Rows can list several codes run together, so a normalized target ISSN only
/// needs to appear inside a normalized row code. Titles compare trimmed and
/// case-insensitively. `None` means the journal is simply not in this table.
pub fn match_journal<'t>(
    table: &'t RankingTable,
    target_issns: &[String],
    target_title: &str,
) -> Option<RankMatch<'t>> {
    let targets: Vec<String> = target_issns
        .iter()
        .map(|issn| normalize_issn(issn))
        .filter(|issn| !issn.is_empty())
        .collect();

    if !targets.is_empty() {
        let by_issn = table.rows().iter().find(|row| {
            row.issns.iter().any(|code| {
                let code = normalize_issn(code);
                targets.iter().any(|target| code.contains(target.as_str()))
            })
        });
        if let Some(row) = by_issn {
            return Some(RankMatch {
                row,
                matched_by: MatchedBy::Issn,
            });
        }
    }

    let title = target_title.trim().to_lowercase();
    if title.is_empty() {
        return None;
    }
    table
        .rows()
        .iter()
        .find(|row| row.title.trim().to_lowercase() == title)
        .map(|row| RankMatch {
            row,
            matched_by: MatchedBy::Title,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Metric;

    fn row(rank: u32, title: &str, issns: &[&str]) -> RankingRow {
        RankingRow {
            rank,
            title: title.to_string(),
            issns: issns.iter().map(|s| s.to_string()).collect(),
            sjr: Metric::Unknown,
            quartile: Metric::Unknown,
        }
    }

    fn table(rows: Vec<RankingRow>) -> RankingTable {
        RankingTable::new(vec![], rows).unwrap()
    }

    #[test]
    fn test_issn_match_beats_earlier_title_match() {
        let table = table(vec![
            row(1, "Bioethics", &["11111111"]),
            row(2, "Bioethics Quarterly", &["14678519", "02699702"]),
        ]);

        let found = match_journal(&table, &["0269-9702".to_string()], "Bioethics").unwrap();
        assert_eq!(found.row.rank, 2);
        assert_eq!(found.matched_by, MatchedBy::Issn);
    }

    #[test]
    fn test_issn_matches_inside_concatenated_codes() {
        let table = table(vec![row(1, "A", &["1467851902699702"])]);

        let found = match_journal(&table, &["02699702".to_string()], "").unwrap();
        assert_eq!(found.matched_by, MatchedBy::Issn);
    }

    #[test]
    fn test_title_fallback_is_case_insensitive() {
        let table = table(vec![
            row(1, "Journal of Medical Ethics", &["14734257"]),
            row(2, "  BIOETHICS ", &["14678519"]),
        ]);

        let found = match_journal(&table, &["99999999".to_string()], "bioethics").unwrap();
        assert_eq!(found.row.rank, 2);
        assert_eq!(found.matched_by, MatchedBy::Title);
    }

    #[test]
    fn test_title_must_match_exactly() {
        let table = table(vec![row(1, "Developing World Bioethics", &[])]);
        assert!(match_journal(&table, &[], "Bioethics").is_none());
    }

    #[test]
    fn test_not_found_is_none() {
        let table = table(vec![row(1, "A", &["11111111"])]);
        assert!(match_journal(&table, &["22222222".to_string()], "B").is_none());
        assert!(match_journal(&table, &[" ".to_string()], "   ").is_none());
    }
}
