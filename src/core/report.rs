use crate::domain::model::{LookupReport, MetricsBundle, PercentileRecord};
use crate::domain::ports::Storage;
use crate::utils::error::Result;
use std::fmt::Write as _;

pub const PERCENTILES_FILE: &str = "percentiles.csv";
pub const REPORT_FILE: &str = "report.json";

/// Persists a finished lookup: the percentile table as CSV and the whole report as JSON.
pub struct ReportWriter<S: Storage> {
    storage: S,
}

impl<S: Storage> ReportWriter<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Returns the locations written.
    pub async fn write(&self, report: &LookupReport) -> Result<Vec<String>> {
        let csv_data = percentiles_csv(&report.percentiles)?;
        tracing::debug!("Writing {} percentile row(s)", report.percentiles.len());
        self.storage.write_file(PERCENTILES_FILE, &csv_data).await?;

        let json_data = serde_json::to_vec_pretty(report)?;
        self.storage.write_file(REPORT_FILE, &json_data).await?;

        Ok(vec![
            self.storage.location(PERCENTILES_FILE),
            self.storage.location(REPORT_FILE),
        ])
    }
}

fn percentiles_csv(records: &[PercentileRecord]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "Category",
        "Type",
        "ID",
        "Rank",
        "Total Journals",
        "Percentile",
        "SJR",
        "Quartile",
    ])?;
    for record in records {
        writer.write_record([
            record.category.name.clone(),
            record.category.kind.label().to_string(),
            record.category.id.to_string(),
            record.rank.to_string(),
            record.total.to_string(),
            format!("{:.2}", record.percentile),
            record.sjr.to_string(),
            record.quartile.to_string(),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| std::io::Error::other(e.to_string()).into())
}

/// Indicators and the classification list, one item per line.
pub fn render_metrics(title: &str, bundle: &MetricsBundle) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Metrics for: {}", title);
    let _ = writeln!(out, "SJR:      {}", bundle.sjr);
    let _ = writeln!(out, "Quartile: {}", bundle.quartile);
    let _ = writeln!(out, "H-Index:  {}", bundle.h_index);
    let issns = if bundle.issns.is_empty() {
        "N/A".to_string()
    } else {
        bundle.issns.join(", ")
    };
    let _ = writeln!(out, "ISSN:     {}", issns);
    let _ = writeln!(out, "Categories ({}):", bundle.categories.len());
    for category in &bundle.categories {
        let _ = writeln!(out, "  {}", category);
    }
    out
}

/// `Category, Type, Rank, Total Journals, Percentile` as an aligned text table.
pub fn render_summary(records: &[PercentileRecord]) -> String {
    const HEADERS: [&str; 5] = ["Category", "Type", "Rank", "Total Journals", "Percentile"];

    let rows: Vec<[String; 5]> = records
        .iter()
        .map(|r| {
            [
                r.category.name.clone(),
                r.category.kind.label().to_string(),
                r.rank.to_string(),
                r.total.to_string(),
                format!("{:.2}", r.percentile),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: [&str; 5]| -> String {
        cells
            .iter()
            .zip(widths)
            .enumerate()
            .map(|(i, (cell, width))| {
                // 文字欄靠左，數字欄靠右
                if i < 2 {
                    format!("{:<width$}", cell, width = width)
                } else {
                    format!("{:>width$}", cell, width = width)
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    let _ = writeln!(out, "{}", line(HEADERS));
    let total_width = widths.iter().sum::<usize>() + 2 * (widths.len() - 1);
    let _ = writeln!(out, "{}", "-".repeat(total_width));
    for row in &rows {
        let _ = writeln!(out, "{}", line(row.each_ref().map(String::as_str)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{CategoryKind, CategoryRef, Metric, Quartile};
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl Storage for MockStorage {
        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            self.files
                .lock()
                .await
                .insert(path.to_string(), data.to_vec());
            Ok(())
        }

        fn location(&self, path: &str) -> String {
            format!("mock://{}", path)
        }
    }

    fn record(name: &str, kind: CategoryKind, rank: u32, total: u32, percentile: f64) -> PercentileRecord {
        PercentileRecord {
            category: CategoryRef {
                name: name.to_string(),
                kind,
                id: 1,
            },
            rank,
            total,
            percentile,
            sjr: Metric::Known(0.491),
            quartile: Metric::Known(Quartile::Q2),
        }
    }

    fn report() -> LookupReport {
        LookupReport {
            query: "Bioethics".to_string(),
            year: "2022".to_string(),
            candidates_found: 1,
            candidate: None,
            metrics: None,
            percentiles: vec![
                record("Philosophy", CategoryKind::Category, 12, 700, 98.36),
                record("Arts and Humanities", CategoryKind::Area, 300, 4000, 92.51),
            ],
        }
    }

    #[tokio::test]
    async fn test_writer_stores_csv_and_json() {
        let storage = MockStorage::default();
        let writer = ReportWriter::new(storage.clone());

        let written = writer.write(&report()).await.unwrap();
        assert_eq!(written, vec!["mock://percentiles.csv", "mock://report.json"]);

        let files = storage.files.lock().await;
        let csv_text = String::from_utf8(files[PERCENTILES_FILE].clone()).unwrap();
        let mut lines = csv_text.lines();
        assert_eq!(
            lines.next(),
            Some("Category,Type,ID,Rank,Total Journals,Percentile,SJR,Quartile")
        );
        assert_eq!(lines.next(), Some("Philosophy,Category,1,12,700,98.36,0.491,Q2"));

        let json: serde_json::Value = serde_json::from_slice(&files[REPORT_FILE]).unwrap();
        assert_eq!(json["query"], "Bioethics");
        assert_eq!(json["percentiles"][1]["category"]["kind"], "Area");
    }

    #[test]
    fn test_summary_table_layout() {
        let summary = render_summary(&report().percentiles);
        let lines: Vec<&str> = summary.lines().collect();

        assert!(lines[0].starts_with("Category"));
        assert!(lines[0].ends_with("Percentile"));
        assert!(lines[1].chars().all(|c| c == '-'));
        assert!(lines[2].starts_with("Philosophy"));
        assert!(lines[2].ends_with("98.36"));
        assert!(lines[3].contains("Subject Area"));
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_metrics_listing() {
        let bundle = MetricsBundle {
            sjr: Metric::Known(0.491),
            categories: vec![CategoryRef {
                name: "Philosophy".to_string(),
                kind: CategoryKind::Category,
                id: 1211,
            }],
            ..MetricsBundle::unknown()
        };
        let text = render_metrics("Bioethics", &bundle);

        assert!(text.contains("SJR:      0.491"));
        assert!(text.contains("Quartile: N/A"));
        assert!(text.contains("ISSN:     N/A"));
        assert!(text.contains("  Philosophy (Category): 1211"));
    }
}
