/*!
 * Workbook loading: xlsx files written to disk and read back through the reader and dataset
 */

use chrono::NaiveDate;
use rust_xlsxwriter::{Workbook, Worksheet};
use star_ratings::constants::{DETAILED_SHEET, STAR_RATINGS_SHEET};
use star_ratings::prelude::*;
use star_ratings::reader::RawCell;
use star_ratings::schema;
use std::path::PathBuf;
use tempfile::TempDir;

enum Cell {
    Text(&'static str),
    Number(f64),
    Blank,
}

use Cell::{Blank, Number, Text};

fn fill(sheet: &mut Worksheet, name: &str, rows: &[Vec<Cell>]) {
    sheet.set_name(name).unwrap();
    for (r, row) in rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            match cell {
                Text(text) => {
                    sheet.write_string(r as u32, c as u16, *text).unwrap();
                }
                Number(value) => {
                    sheet.write_number(r as u32, c as u16, *value).unwrap();
                }
                Blank => {}
            }
        }
    }
}

fn write_workbook(dir: &TempDir, file_name: &str, sheets: &[(&str, Vec<Vec<Cell>>)]) -> PathBuf {
    let mut workbook = Workbook::new();
    for (name, rows) in sheets {
        fill(workbook.add_worksheet(), name, rows);
    }
    let path = dir.path().join(file_name);
    workbook.save(&path).unwrap();
    path
}

fn detailed_header() -> Vec<Cell> {
    vec![
        Text(schema::PROVIDER_NAME),
        Text(schema::SERVICE_NAME),
        Text(schema::STATE_TERRITORY),
        Text(schema::SIZE),
        Text(schema::MMM_CODE),
        Text(schema::OVERALL_STAR_RATING),
        Text(schema::DECISION_TYPE),
        Text(schema::DECISION_APPLIED),
    ]
}

fn detailed_rows() -> Vec<Vec<Cell>> {
    vec![
        detailed_header(),
        vec![
            Text("Acme Care"),
            Text("Home A"),
            Text("NSW"),
            Text("Small"),
            Number(1.0),
            Number(4.0),
            Text("Sanction"),
            // 2024-03-01 as a spreadsheet serial
            Number(45352.0),
        ],
        vec![Blank, Blank, Blank, Blank, Blank, Blank, Blank, Blank],
        vec![
            Text("Acme Care"),
            Text("Home B"),
            Text("VIC"),
            Text("Large"),
            Number(5.0),
            Blank,
            Blank,
            Blank,
        ],
    ]
}

fn summary_rows() -> Vec<Vec<Cell>> {
    vec![
        vec![Text("Service Name"), Text("Overall Star Rating")],
        vec![Text("Home A"), Number(4.0)],
    ]
}

fn quiet_load(path: &PathBuf) -> Result<StarRatingsDataset> {
    StarRatingsDatasetBuilder::new()
        .source(path)
        .show_progress(false)
        .build()
}

#[test]
fn test_workbook_without_detailed_sheet() {
    let dir = TempDir::new().unwrap();
    let path = write_workbook(
        &dir,
        "renamed.xlsx",
        &[("Detailed", detailed_rows()), (STAR_RATINGS_SHEET, summary_rows())],
    );

    match quiet_load(&path).unwrap_err() {
        StarRatingsError::MissingSheet { sheet, available } => {
            assert_eq!(sheet, DETAILED_SHEET);
            assert_eq!(available, vec!["Detailed".to_string(), STAR_RATINGS_SHEET.to_string()]);
        }
        other => panic!("expected missing sheet error, got {other:?}"),
    }
}

#[test]
fn test_header_only_detailed_sheet_is_missing() {
    let dir = TempDir::new().unwrap();
    let path = write_workbook(
        &dir,
        "header_only.xlsx",
        &[(DETAILED_SHEET, vec![detailed_header()]), (STAR_RATINGS_SHEET, summary_rows())],
    );

    let err = StarRatingsReader::new().with_progress_bar(false).load(&path).unwrap_err();
    assert!(matches!(err, StarRatingsError::MissingSheet { ref sheet, .. } if sheet == DETAILED_SHEET));
    assert!(err.is_load_error());

    let mut session = Session::default();
    assert!(session.load(&path).is_err());
    assert!(!session.is_loaded());
}

#[test]
fn test_blank_rows_only_detailed_sheet_is_missing() {
    let dir = TempDir::new().unwrap();
    let rows = vec![detailed_header(), vec![Text(" "), Blank, Text("  ")]];
    let path = write_workbook(&dir, "blank_rows.xlsx", &[(DETAILED_SHEET, rows)]);

    let err = quiet_load(&path).unwrap_err();
    assert!(matches!(err, StarRatingsError::MissingSheet { .. }));
}

#[test]
fn test_workbook_cells_map_to_raw_cells() {
    let dir = TempDir::new().unwrap();
    let path = write_workbook(
        &dir,
        "extract.xlsx",
        &[(DETAILED_SHEET, detailed_rows()), (STAR_RATINGS_SHEET, summary_rows())],
    );

    let tables = StarRatingsReader::new().with_progress_bar(false).load(&path).unwrap();
    let detailed = &tables.detailed;
    assert_eq!(detailed.headers[4], schema::MMM_CODE);
    // the blank spreadsheet row is dropped
    assert_eq!(detailed.row_count(), 2);
    assert_eq!(detailed.cell(0, 0), &RawCell::Text("Acme Care".to_string()));
    assert_eq!(detailed.cell(0, 4), &RawCell::Number(1.0));
    assert!(detailed.cell(1, 5).is_empty());
}

#[test]
fn test_valid_workbook_loads_with_summary_sheet() {
    let dir = TempDir::new().unwrap();
    let path = write_workbook(
        &dir,
        "extract.xlsx",
        &[(DETAILED_SHEET, detailed_rows()), (STAR_RATINGS_SHEET, summary_rows())],
    );

    let dataset = quiet_load(&path).unwrap();
    assert_eq!(dataset.len(), 2);

    let home_a = &dataset.records()[0];
    assert_eq!(home_a.service_name, "Home A");
    assert_eq!(home_a.mmm_code, "1");
    assert_eq!(home_a.ratings.overall, Some(4.0));
    let decision = home_a.compliance_decision.as_ref().unwrap();
    assert_eq!(decision.decision_type.as_deref(), Some("Sanction"));
    assert_eq!(decision.applied, NaiveDate::from_ymd_opt(2024, 3, 1));

    let home_b = &dataset.records()[1];
    assert_eq!(home_b.mmm_code, "5");
    assert_eq!(home_b.ratings.overall, None);
    assert!(!home_b.has_compliance_decision());

    assert_eq!(dataset.filter_options().mmm_codes, vec!["1".to_string(), "5".to_string()]);

    let summary = dataset.star_ratings_sheet().unwrap();
    assert_eq!(summary.headers, vec!["Service Name".to_string(), "Overall Star Rating".to_string()]);
    assert_eq!(summary.row_count(), 1);
    assert_eq!(summary.cell(0, 0), &RawCell::Text("Home A".to_string()));
    assert_eq!(summary.cell(0, 1), &RawCell::Number(4.0));
    assert!(dataset.statistics().has_star_ratings_sheet);
}

#[test]
fn test_workbook_without_summary_sheet_still_loads() {
    let dir = TempDir::new().unwrap();
    let path = write_workbook(&dir, "detailed_only.xlsx", &[(DETAILED_SHEET, detailed_rows())]);

    let dataset = quiet_load(&path).unwrap();
    assert_eq!(dataset.len(), 2);
    assert!(dataset.star_ratings_sheet().is_none());
    assert!(!dataset.statistics().has_star_ratings_sheet);
}
