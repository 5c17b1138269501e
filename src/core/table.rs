use crate::domain::model::{split_issns, Metric, Quartile, RankingRow};
use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;
use thiserror::Error;

/// Why a downloaded ranking artifact could not be turned into a table.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseFailure {
    #[error("spreadsheet reader failed: {0}")]
    Spreadsheet(String),

    #[error("delimited-text reader failed: {0}")]
    Delimited(String),

    #[error("no header row found")]
    Empty,

    #[error("column '{column}' missing from ranking export (schema {schema})")]
    MissingColumn { column: String, schema: &'static str },

    #[error("rank sequence invalid: {0}")]
    RankSequence(String),
}

/// Column names of one observed export layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankingSchema {
    pub version: &'static str,
    pub rank: &'static str,
    pub title: &'static str,
    pub issn: &'static str,
    pub sjr: &'static str,
    pub quartile: &'static str,
}

impl RankingSchema {
    pub const SCIMAGO_V1: RankingSchema = RankingSchema {
        version: "scimago-v1",
        rank: "Rank",
        title: "Title",
        issn: "Issn",
        sjr: "SJR",
        quartile: "SJR Best Quartile",
    };

    fn columns(&self) -> [&'static str; 5] {
        [self.rank, self.title, self.issn, self.sjr, self.quartile]
    }
}

impl Default for RankingSchema {
    fn default() -> Self {
        Self::SCIMAGO_V1
    }
}

/// Rows in export order; ranks are unique and lie in `1..=total`.
#[derive(Debug, Clone, PartialEq)]
pub struct RankingTable {
    columns: Vec<String>,
    rows: Vec<RankingRow>,
    total: u32,
}

impl RankingTable {
    /// Ranks must cover `1..=N` exactly.
    pub fn new(columns: Vec<String>, rows: Vec<RankingRow>) -> Result<Self, ParseFailure> {
        Self::build(columns, rows, false)
    }

    /// For exports with dropped lines: ranks may leave gaps, and the total is the
    /// larger of the row count and the highest rank.
    pub fn with_gaps(columns: Vec<String>, rows: Vec<RankingRow>) -> Result<Self, ParseFailure> {
        Self::build(columns, rows, true)
    }

    fn build(
        columns: Vec<String>,
        rows: Vec<RankingRow>,
        allow_gaps: bool,
    ) -> Result<Self, ParseFailure> {
        let highest = rows.iter().map(|row| row.rank as usize).max().unwrap_or(0);
        let total = if allow_gaps {
            rows.len().max(highest)
        } else {
            rows.len()
        };

        let mut seen = vec![false; total];
        for row in &rows {
            let index = row.rank as usize;
            if index == 0 || index > total {
                return Err(ParseFailure::RankSequence(format!(
                    "rank {} outside 1..={}",
                    row.rank, total
                )));
            }
            if std::mem::replace(&mut seen[index - 1], true) {
                return Err(ParseFailure::RankSequence(format!(
                    "rank {} appears twice",
                    row.rank
                )));
            }
        }

        if total > rows.len() {
            tracing::warn!(
                "⚠️ {} rank(s) missing from export; using {} as total",
                total - rows.len(),
                total
            );
        }
        Ok(Self {
            columns,
            rows,
            total: total as u32,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[RankingRow] {
        &self.rows
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Spreadsheet first; semicolon-delimited text when that fails.
pub fn parse_ranking_file(path: &Path, schema: &RankingSchema) -> Result<RankingTable, ParseFailure> {
    let spreadsheet = read_spreadsheet(path).and_then(|grid| table_from_grid(grid, schema, 0));
    match spreadsheet {
        Ok(table) => Ok(table),
        Err(excel_err) => {
            tracing::debug!("Spreadsheet parse failed ({}), trying CSV", excel_err);
            read_delimited(path)
                .and_then(|(grid, skipped)| table_from_grid(grid, schema, skipped))
                .map_err(|csv_err| {
                    tracing::warn!(
                        "⚠️ Ranking export unreadable: {} / {}",
                        excel_err,
                        csv_err
                    );
                    csv_err
                })
        }
    }
}

fn read_spreadsheet(path: &Path) -> Result<Vec<Vec<String>>, ParseFailure> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| ParseFailure::Spreadsheet(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ParseFailure::Spreadsheet("workbook has no sheets".to_string()))?
        .map_err(|e| ParseFailure::Spreadsheet(e.to_string()))?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect())
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// The grid plus the number of lines dropped as malformed.
fn read_delimited(path: &Path) -> Result<(Vec<Vec<String>>, usize), ParseFailure> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .quote(b'"')
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| ParseFailure::Delimited(e.to_string()))?;

    let mut grid: Vec<Vec<String>> = Vec::new();
    let mut width = None;
    let mut skipped = 0usize;

    for record in reader.byte_records() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                skipped += 1;
                tracing::debug!("Skipping unreadable CSV line: {}", e);
                continue;
            }
        };
        let cells: Vec<String> = record
            .iter()
            .map(|field| String::from_utf8_lossy(field).trim().to_string())
            .collect();

        match width {
            None => width = Some(cells.len()),
            // 欄位比表頭多的行視為壞行
            Some(expected) if cells.len() > expected => {
                skipped += 1;
                continue;
            }
            Some(_) => {}
        }
        grid.push(cells);
    }

    if skipped > 0 {
        tracing::warn!("⚠️ Skipped {} malformed line(s) in ranking export", skipped);
    }
    if grid.is_empty() {
        return Err(ParseFailure::Delimited("file is empty".to_string()));
    }
    Ok((grid, skipped))
}

fn table_from_grid(
    grid: Vec<Vec<String>>,
    schema: &RankingSchema,
    skipped_lines: usize,
) -> Result<RankingTable, ParseFailure> {
    let mut rows = grid.into_iter().skip_while(|row| row.iter().all(String::is_empty));
    let header: Vec<String> = rows
        .next()
        .ok_or(ParseFailure::Empty)?
        .into_iter()
        .map(|cell| cell.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let index_of = |column: &str| {
        header
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| ParseFailure::MissingColumn {
                column: column.to_string(),
                schema: schema.version,
            })
    };
    let [rank_at, title_at, issn_at, sjr_at, quartile_at] = {
        let mut indices = [0usize; 5];
        for (slot, column) in indices.iter_mut().zip(schema.columns()) {
            *slot = index_of(column)?;
        }
        indices
    };

    fn cell(row: &[String], at: usize) -> &str {
        row.get(at).map(String::as_str).unwrap_or("")
    }

    let parsed: Vec<RankingRow> = rows
        .filter_map(|row| {
            let rank = parse_rank(cell(&row, rank_at))?;
            Some(RankingRow {
                rank,
                title: cell(&row, title_at).trim().to_string(),
                issns: split_issns(cell(&row, issn_at))
                    .into_iter()
                    .map(pad_numeric_issn)
                    .collect(),
                sjr: parse_decimal_cell(cell(&row, sjr_at)).into(),
                quartile: Metric::from(Quartile::parse_label(cell(&row, quartile_at))),
            })
        })
        .collect();

    if skipped_lines > 0 {
        RankingTable::with_gaps(header, parsed)
    } else {
        RankingTable::new(header, parsed)
    }
}

fn parse_rank(text: &str) -> Option<u32> {
    let trimmed = text.trim();
    if let Ok(rank) = trimmed.parse::<u32>() {
        return (rank > 0).then_some(rank);
    }
    let float: f64 = trimmed.parse().ok()?;
    (float >= 1.0 && float.fract() == 0.0 && float <= u32::MAX as f64).then_some(float as u32)
}

fn parse_decimal_cell(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.replace(',', ".").parse().ok()
}

/// Numeric spreadsheet cells lose leading zeros.
fn pad_numeric_issn(code: String) -> String {
    if code.len() < 8 && code.chars().all(|c| c.is_ascii_digit()) {
        format!("{:0>8}", code)
    } else {
        code
    }
}
