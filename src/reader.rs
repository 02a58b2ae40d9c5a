/*!
 * Workbook and CSV reader for Star Ratings extracts
 *
 * Reads the quarterly extract into untyped `RawTable`s, one per sheet. The
 * file is read once and fully materialized; typing happens in `normalize`.
 */

use std::fs::File;
use std::path::Path;
use std::time::Instant;

use calamine::{open_workbook_auto, Data, DataType, Range, Reader};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use tracing::{debug, info, warn};

#[cfg(feature = "progress")]
use indicatif::{ProgressBar, ProgressStyle};

use crate::{Result, StarRatingsError};

/// A single untyped cell as read from the source file
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl RawCell {
    pub fn is_empty(&self) -> bool {
        match self {
            RawCell::Empty => true,
            RawCell::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    /// Render the cell as display text; integral numbers print without a fraction
    pub fn to_text(&self) -> Option<String> {
        match self {
            RawCell::Empty => None,
            RawCell::Text(text) => Some(text.clone()),
            RawCell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
            RawCell::Number(n) => Some(n.to_string()),
            RawCell::Date(date) => Some(date.format("%Y-%m-%d").to_string()),
        }
    }
}

impl From<&Data> for RawCell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => RawCell::Empty,
            Data::String(s) => RawCell::Text(s.clone()),
            Data::Float(f) => RawCell::Number(*f),
            Data::Int(i) => RawCell::Number(*i as f64),
            Data::Bool(b) => RawCell::Text(b.to_string()),
            Data::DateTime(_) | Data::DateTimeIso(_) => match data.as_date() {
                Some(date) => RawCell::Date(date),
                None => RawCell::Text(data.to_string()),
            },
            Data::DurationIso(s) => RawCell::Text(s.clone()),
        }
    }
}

/// One sheet: a header row plus data rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<RawCell>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<RawCell>>) -> Self {
        Self { headers, rows }
    }

    /// Cell at `(row, col)`; ragged rows read as empty past their end
    pub fn cell(&self, row: usize, col: usize) -> &RawCell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&RawCell::Empty)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn from_range(range: &Range<Data>) -> Option<Self> {
        let mut rows = range.rows();
        let header_row = rows.next()?;
        let headers = header_row
            .iter()
            .map(|cell| RawCell::from(cell).to_text().unwrap_or_default())
            .collect();

        let rows = rows
            .map(|row| row.iter().map(RawCell::from).collect::<Vec<_>>())
            .filter(|row| !row.iter().all(RawCell::is_empty))
            .collect();

        Some(Self::new(headers, rows))
    }
}

/// Sheets read from one source file
#[derive(Debug, Clone, Default)]
pub struct SourceTables {
    /// Per-service rows (required)
    pub detailed: RawTable,
    /// Summary ratings sheet, passed through untouched when present
    pub star_ratings: Option<RawTable>,
}

/// Reader for the quarterly Star Ratings extract
pub struct StarRatingsReader {
    detailed_sheet: String,
    star_ratings_sheet: String,
    #[cfg(feature = "progress")]
    show_progress_bar: bool,
}

impl Default for StarRatingsReader {
    fn default() -> Self {
        Self::new()
    }
}

impl StarRatingsReader {
    /// Create a reader looking for the standard sheet names
    pub fn new() -> Self {
        Self {
            detailed_sheet: "Detailed data".to_string(),
            star_ratings_sheet: "Star Ratings".to_string(),
            #[cfg(feature = "progress")]
            show_progress_bar: false,
        }
    }

    /// Use the sheet names from a configuration
    pub fn from_config(config: &crate::config::StarRatingsConfig) -> Self {
        Self::new()
            .with_sheet_names(&config.detailed_sheet, &config.star_ratings_sheet)
            .with_progress_bar(config.show_progress)
    }

    /// Override the sheet names (matched case-sensitively)
    pub fn with_sheet_names(mut self, detailed: &str, star_ratings: &str) -> Self {
        self.detailed_sheet = detailed.to_string();
        self.star_ratings_sheet = star_ratings.to_string();
        self
    }

    /// Enable or disable the loading spinner
    #[allow(unused_mut, unused_variables)]
    pub fn with_progress_bar(mut self, show: bool) -> Self {
        #[cfg(feature = "progress")]
        {
            self.show_progress_bar = show;
        }
        self
    }

    /// Load a source file, choosing CSV or workbook parsing by extension
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<SourceTables> {
        let path = path.as_ref();
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

        if is_csv {
            let detailed = self.load_csv(path)?;
            warn!(
                sheet = %self.star_ratings_sheet,
                "CSV input has no summary sheet; continuing without it"
            );
            Ok(SourceTables { detailed, star_ratings: None })
        } else {
            self.load_workbook(path)
        }
    }

    /// Load the detailed and summary sheets from an xlsx/xls/ods workbook
    pub fn load_workbook<P: AsRef<Path>>(&self, path: P) -> Result<SourceTables> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(StarRatingsError::file_not_found_with_suggestion(path.to_path_buf()));
        }

        let start_time = Instant::now();
        let spinner = self.start_spinner(path);

        let result = self.read_workbook(path);

        #[cfg(feature = "progress")]
        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }
        #[cfg(not(feature = "progress"))]
        let _ = spinner;

        let tables = result?;
        info!(
            path = %path.display(),
            rows = tables.detailed.row_count(),
            summary_sheet = tables.star_ratings.is_some(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "loaded workbook"
        );
        Ok(tables)
    }

    fn read_workbook(&self, path: &Path) -> Result<SourceTables> {
        let mut workbook = open_workbook_auto(path).map_err(|e| StarRatingsError::Parse {
            message: e.to_string(),
            path: Some(path.to_path_buf()),
        })?;

        let sheet_names = workbook.sheet_names();
        debug!(sheets = ?sheet_names, "workbook sheets");

        if !sheet_names.iter().any(|name| name == &self.detailed_sheet) {
            return Err(StarRatingsError::missing_sheet(&self.detailed_sheet, sheet_names));
        }

        let range = workbook
            .worksheet_range(&self.detailed_sheet)
            .map_err(|e| StarRatingsError::Parse {
                message: e.to_string(),
                path: Some(path.to_path_buf()),
            })?;
        // a sheet with no data rows counts as missing
        let detailed = RawTable::from_range(&range)
            .filter(|table| !table.is_empty())
            .ok_or_else(|| StarRatingsError::missing_sheet(&self.detailed_sheet, sheet_names.clone()))?;

        let star_ratings = if sheet_names.iter().any(|name| name == &self.star_ratings_sheet) {
            match workbook.worksheet_range(&self.star_ratings_sheet) {
                Ok(range) => RawTable::from_range(&range),
                Err(e) => {
                    warn!(sheet = %self.star_ratings_sheet, error = %e, "could not read summary sheet");
                    None
                }
            }
        } else {
            warn!(sheet = %self.star_ratings_sheet, "summary sheet not found; continuing without it");
            None
        };

        Ok(SourceTables { detailed, star_ratings })
    }

    /// Load a CSV export of the detailed data sheet
    pub fn load_csv<P: AsRef<Path>>(&self, path: P) -> Result<RawTable> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(StarRatingsError::file_not_found_with_suggestion(path.to_path_buf()));
        }

        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let headers: Vec<String> = reader.headers()?.iter().map(|s| s.to_string()).collect();
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(StarRatingsError::missing_sheet(&self.detailed_sheet, Vec::new()));
        }

        let mut rows = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result.map_err(|e| StarRatingsError::Parse {
                // +2 for the header and 0-based index
                message: format!("CSV error at line {}: {}", idx + 2, e),
                path: Some(path.to_path_buf()),
            })?;

            let row: Vec<RawCell> = record
                .iter()
                .map(|field| {
                    if field.trim().is_empty() {
                        RawCell::Empty
                    } else {
                        RawCell::Text(field.to_string())
                    }
                })
                .collect();

            if !row.iter().all(RawCell::is_empty) {
                rows.push(row);
            }
        }

        if rows.is_empty() {
            return Err(StarRatingsError::missing_sheet(&self.detailed_sheet, Vec::new()));
        }

        info!(path = %path.display(), rows = rows.len(), "loaded CSV");
        Ok(RawTable::new(headers, rows))
    }

    #[cfg(feature = "progress")]
    fn start_spinner(&self, path: &Path) -> Option<ProgressBar> {
        if !self.show_progress_bar {
            return None;
        }
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner} {msg} [{elapsed}]") {
            pb.set_style(style);
        }
        pb.set_message(format!("Reading {}", path.display()));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        Some(pb)
    }

    #[cfg(not(feature = "progress"))]
    fn start_spinner(&self, _path: &Path) -> Option<()> {
        None
    }
}
