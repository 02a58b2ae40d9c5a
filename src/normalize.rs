/*!
 * Schema normalizer: raw sheet rows into typed `ServiceRecord`s
 *
 * Per row, in order:
 * 1. categorical filter fields are coerced to text, missing ones become the
 *    unknown label
 * 2. numeric fields have `%` and surrounding whitespace stripped before
 *    parsing; anything unparseable is missing
 * 3. the RN and total care compliance ratios are derived from care minutes
 *
 * The identity columns are validated against the header before any row is
 * touched, so a schema failure never yields partial records.
 */

use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::config::StarRatingsConfig;
use crate::data_types::*;
use crate::reader::{RawCell, RawTable};
use crate::schema::{self, ColumnIndex, ResidentExperienceColumn};
use crate::Result;

/// Day zero of the spreadsheet serial date system (1899-12-30)
const SERIAL_DATE_EPOCH_CE: i32 = 693_594;

/// Date layouts accepted for text decision dates
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];

/// Canonical typed table
#[derive(Debug, Clone, Default)]
pub struct NormalizedTable {
    pub records: Vec<ServiceRecord>,
    /// Columns available after normalization, including the derived ratios
    pub columns: BTreeSet<String>,
}

/// Parse a numeric cell, stripping `%` and whitespace from text.
///
/// Never fails: unparseable and non-finite values are missing.
///
/// ```
/// # use star_ratings::normalize::coerce_numeric;
/// # use star_ratings::reader::RawCell;
/// assert_eq!(coerce_numeric(&RawCell::Text(" 85.5% ".into())), Some(85.5));
/// assert_eq!(coerce_numeric(&RawCell::Text("n/a".into())), None);
/// ```
pub fn coerce_numeric(cell: &RawCell) -> Option<f64> {
    let value = match cell {
        RawCell::Number(n) => *n,
        RawCell::Text(text) => text.replace('%', "").trim().parse::<f64>().ok()?,
        RawCell::Empty | RawCell::Date(_) => return None,
    };
    value.is_finite().then_some(value)
}

/// Coerce a categorical cell to trimmed text, substituting `unknown` when missing
pub fn coerce_categorical(cell: &RawCell, unknown: &str) -> String {
    cell.to_text()
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| unknown.to_string())
}

/// Parse a date cell: native dates, serial day numbers, or common text layouts
pub fn coerce_date(cell: &RawCell) -> Option<NaiveDate> {
    match cell {
        RawCell::Date(date) => Some(*date),
        RawCell::Number(serial) if serial.is_finite() && *serial >= 1.0 && *serial < 2_958_466.0 => {
            NaiveDate::from_num_days_from_ce_opt(SERIAL_DATE_EPOCH_CE + serial.trunc() as i32)
        }
        RawCell::Text(text) => {
            let text = text.trim();
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .or_else(|| {
                    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
                        .ok()
                        .map(|dt| dt.date())
                })
        }
        _ => None,
    }
}

fn coerce_text(cell: &RawCell) -> Option<String> {
    cell.to_text()
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Turns the raw "Detailed data" sheet into canonical service records
pub struct SchemaNormalizer<'a> {
    config: &'a StarRatingsConfig,
}

impl<'a> SchemaNormalizer<'a> {
    pub fn new(config: &'a StarRatingsConfig) -> Self {
        Self { config }
    }

    /// Normalize a raw table, failing with a schema error when identity columns are absent
    pub fn normalize(&self, table: &RawTable) -> Result<NormalizedTable> {
        let index = ColumnIndex::new(&table.headers);
        index.validate_required()?;

        let indicator_columns = self.indicator_columns(&index);
        let re_columns = index.resident_experience_columns();

        let mut unparseable = 0usize;
        let records: Vec<ServiceRecord> = (0..table.row_count())
            .map(|row| self.normalize_row(table, row, &index, &indicator_columns, &re_columns, &mut unparseable))
            .collect();

        let mut columns: BTreeSet<String> = index.headers().iter().cloned().collect();
        columns.insert(schema::RN_CARE_COMPLIANCE.to_string());
        columns.insert(schema::TOTAL_CARE_COMPLIANCE.to_string());

        debug!(
            records = records.len(),
            indicators = indicator_columns.len(),
            resident_experience_columns = re_columns.len(),
            unparseable_cells = unparseable,
            "normalized detailed data"
        );

        Ok(NormalizedTable { records, columns })
    }

    /// Numeric columns stored in `ServiceRecord::indicators`: every quality
    /// measure column plus any configured measure without a typed field
    fn indicator_columns(&self, index: &ColumnIndex) -> Vec<(String, usize)> {
        let configured = self
            .config
            .quality_measures
            .iter()
            .chain(&self.config.benchmark_measures)
            .chain(self.config.outlier_rules.iter().map(|rule| &rule.metric))
            .map(String::as_str);

        let quality_headers = index
            .headers()
            .iter()
            .map(String::as_str)
            .filter(|h| h.starts_with("[QM]"));

        let mut seen = BTreeSet::new();
        configured
            .chain(quality_headers)
            .filter(|name| !is_typed_column(name))
            .filter(|name| seen.insert(name.to_string()))
            .filter_map(|name| index.position(name).map(|pos| (name.to_string(), pos)))
            .collect()
    }

    fn normalize_row(
        &self,
        table: &RawTable,
        row: usize,
        index: &ColumnIndex,
        indicator_columns: &[(String, usize)],
        re_columns: &[(usize, ResidentExperienceColumn)],
        unparseable: &mut usize,
    ) -> ServiceRecord {
        let unknown = self.config.unknown_label.as_str();
        let get_cell = |column: &str| -> &RawCell {
            match index.position(column) {
                Some(col) => table.cell(row, col),
                None => &RawCell::Empty,
            }
        };

        let mut get_number = |cell: &RawCell| -> Option<f64> {
            let value = coerce_numeric(cell);
            if value.is_none() && !cell.is_empty() {
                *unparseable += 1;
            }
            value
        };

        // (a) categorical filter fields
        let [provider_name, service_name, state, mmm_code, size] =
            schema::CATEGORICAL_COLUMNS.map(|column| coerce_categorical(get_cell(column), unknown));

        // (b) numeric fields
        let ratings = StarRatings {
            overall: get_number(get_cell(schema::OVERALL_STAR_RATING)),
            compliance: get_number(get_cell(schema::COMPLIANCE_RATING)),
            residents_experience: get_number(get_cell(schema::RESIDENTS_EXPERIENCE_RATING)),
            staffing: get_number(get_cell(schema::STAFFING_RATING)),
            quality_measures: get_number(get_cell(schema::QUALITY_MEASURES_RATING)),
        };

        let care_minutes = CareMinutes {
            rn_actual: get_number(get_cell(schema::RN_MINUTES_ACTUAL)),
            rn_target: get_number(get_cell(schema::RN_MINUTES_TARGET)),
            total_actual: get_number(get_cell(schema::TOTAL_MINUTES_ACTUAL)),
            total_target: get_number(get_cell(schema::TOTAL_MINUTES_TARGET)),
        };

        let mut indicators = BTreeMap::new();
        for (name, col) in indicator_columns {
            if let Some(value) = get_number(table.cell(row, *col)) {
                indicators.insert(name.clone(), value);
            }
        }

        let resident_experience = re_columns
            .iter()
            .filter_map(|(col, column)| {
                get_number(table.cell(row, *col)).map(|percentage| ResidentExperienceResponse {
                    category: column.category.clone(),
                    frequency: column.frequency,
                    percentage,
                })
            })
            .collect();

        // (c) derived compliance ratios
        let rn_care_compliance = care_minutes.rn_compliance();
        let total_care_compliance = care_minutes.total_compliance();

        let decision = ComplianceDecision {
            decision_type: coerce_text(get_cell(schema::DECISION_TYPE)),
            applied: coerce_date(get_cell(schema::DECISION_APPLIED)),
            ends: coerce_date(get_cell(schema::DECISION_ENDS)),
        };
        let compliance_decision = (!decision.is_empty()).then_some(decision);

        ServiceRecord {
            provider_name,
            service_name,
            state,
            mmm_code,
            size,
            ratings,
            care_minutes,
            rn_care_compliance,
            total_care_compliance,
            indicators,
            resident_experience,
            compliance_decision,
        }
    }
}

fn is_typed_column(name: &str) -> bool {
    schema::TYPED_NUMERIC_COLUMNS.contains(&name)
        || name == schema::RN_CARE_COMPLIANCE
        || name == schema::TOTAL_CARE_COMPLIANCE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StarRatingsError;

    fn text(s: &str) -> RawCell {
        RawCell::Text(s.to_string())
    }

    fn table(headers: &[&str], rows: Vec<Vec<RawCell>>) -> RawTable {
        RawTable::new(headers.iter().map(|h| h.to_string()).collect(), rows)
    }

    #[test]
    fn test_coerce_numeric() {
        assert_eq!(coerce_numeric(&RawCell::Number(4.0)), Some(4.0));
        assert_eq!(coerce_numeric(&text("12%")), Some(12.0));
        assert_eq!(coerce_numeric(&text("  7.25 ")), Some(7.25));
        assert_eq!(coerce_numeric(&text("")), None);
        assert_eq!(coerce_numeric(&text("-")), None);
        assert_eq!(coerce_numeric(&text("inf")), None);
        assert_eq!(coerce_numeric(&RawCell::Number(f64::NAN)), None);
        assert_eq!(coerce_numeric(&RawCell::Empty), None);
    }

    #[test]
    fn test_coerce_categorical() {
        assert_eq!(coerce_categorical(&RawCell::Empty, "Unknown"), "Unknown");
        assert_eq!(coerce_categorical(&RawCell::Number(5.0), "Unknown"), "5");
        assert_eq!(coerce_categorical(&text(" NSW "), "Unknown"), "NSW");
    }

    #[test]
    fn test_coerce_date() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1);
        assert_eq!(coerce_date(&text("2024-03-01")), expected);
        assert_eq!(coerce_date(&text("01/03/2024")), expected);
        // 45352 is 2024-03-01 as a spreadsheet serial
        assert_eq!(coerce_date(&RawCell::Number(45352.0)), expected);
        assert_eq!(coerce_date(&text("soon")), None);
    }

    #[test]
    fn test_zero_target_yields_missing_ratio() {
        let config = StarRatingsConfig::default();
        let raw = table(
            &[
                schema::PROVIDER_NAME,
                schema::SERVICE_NAME,
                schema::STATE_TERRITORY,
                schema::RN_MINUTES_ACTUAL,
                schema::RN_MINUTES_TARGET,
                schema::TOTAL_MINUTES_ACTUAL,
                schema::TOTAL_MINUTES_TARGET,
            ],
            vec![vec![
                text("Acme"),
                text("Home A"),
                text("NSW"),
                RawCell::Number(50.0),
                RawCell::Number(0.0),
                text("200"),
                text("250"),
            ]],
        );

        let normalized = SchemaNormalizer::new(&config).normalize(&raw).unwrap();
        let record = &normalized.records[0];
        assert_eq!(record.rn_care_compliance, None);
        assert_eq!(record.total_care_compliance, Some(200.0 / 250.0 * 100.0));
        assert_eq!(record.mmm_code, "Unknown");
        assert_eq!(record.size, "Unknown");
        assert!(normalized.columns.contains(schema::RN_CARE_COMPLIANCE));
    }

    #[test]
    fn test_missing_identity_columns() {
        let config = StarRatingsConfig::default();
        let raw = table(&[schema::PROVIDER_NAME, schema::SIZE], vec![]);
        match SchemaNormalizer::new(&config).normalize(&raw) {
            Err(StarRatingsError::Schema { missing_columns }) => {
                assert_eq!(missing_columns, vec![schema::SERVICE_NAME, schema::STATE_TERRITORY]);
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_categorical_columns_map_to_fields() {
        let config = StarRatingsConfig::default();
        let raw = table(
            &[
                schema::SIZE,
                schema::STATE_TERRITORY,
                schema::MMM_CODE,
                schema::SERVICE_NAME,
                schema::PROVIDER_NAME,
            ],
            vec![vec![text("Medium"), text("QLD"), RawCell::Number(4.0), text("Home Q"), RawCell::Empty]],
        );

        let normalized = SchemaNormalizer::new(&config).normalize(&raw).unwrap();
        let record = &normalized.records[0];
        assert_eq!(record.provider_name, "Unknown");
        assert_eq!(record.service_name, "Home Q");
        assert_eq!(record.state, "QLD");
        assert_eq!(record.mmm_code, "4");
        assert_eq!(record.size, "Medium");
    }

    #[test]
    fn test_indicators_and_resident_experience() {
        let config = StarRatingsConfig::default();
        let raw = table(
            &[
                schema::PROVIDER_NAME,
                schema::SERVICE_NAME,
                schema::STATE_TERRITORY,
                "[QM] Restrictive practices",
                "[RE] Food - Always",
                "[RE] Food - Never",
                schema::DECISION_TYPE,
                schema::DECISION_APPLIED,
            ],
            vec![vec![
                text("Acme"),
                text("Home A"),
                RawCell::Empty,
                text("3.5%"),
                text("60%"),
                text("bad"),
                text("Notice to Remedy"),
                text("2024-01-31"),
            ]],
        );

        let normalized = SchemaNormalizer::new(&config).normalize(&raw).unwrap();
        let record = &normalized.records[0];
        assert_eq!(record.state, "Unknown");
        assert_eq!(record.measure("[QM] Restrictive practices"), Some(3.5));
        assert_eq!(record.measure("[QM] Pressure injuries*"), None);
        assert_eq!(record.resident_experience("Food", Frequency::Always), Some(60.0));
        assert_eq!(record.resident_experience("Food", Frequency::Never), None);
        assert!(record.has_compliance_decision());
        assert_eq!(
            record.compliance_decision.as_ref().and_then(|d| d.applied),
            NaiveDate::from_ymd_opt(2024, 1, 31)
        );
    }
}
