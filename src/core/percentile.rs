use crate::domain::model::{CategoryRef, PercentileRecord, RankingRow};

/// `((total - rank + 0.5) / total) * 100`, rounded to two decimals.
///
/// Callers guarantee `1 <= rank <= total`; the half-step keeps the result
/// strictly inside `(0, 100)`.
pub fn percentile(rank: u32, total: u32) -> f64 {
    debug_assert!(rank >= 1 && rank <= total, "rank {} of {}", rank, total);
    let total = f64::from(total);
    let raw = (total - f64::from(rank) + 0.5) / total * 100.0;
    (raw * 100.0).round() / 100.0
}

pub fn compute(row: &RankingRow, total: u32, category: &CategoryRef) -> PercentileRecord {
    PercentileRecord {
        category: category.clone(),
        rank: row.rank,
        total,
        percentile: percentile(row.rank, total),
        sjr: row.sjr,
        quartile: row.quartile,
    }
}
