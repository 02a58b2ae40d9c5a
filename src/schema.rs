/*!
 * Schema definitions for the Star Ratings "Detailed data" sheet
 *
 * Column headers exactly as they appear in the quarterly data extract. The
 * normalizer resolves these once per load; everything downstream works on
 * typed fields.
 */

use std::collections::HashMap;

use crate::data_types::Frequency;

/// Provider (approved provider organisation) name
pub const PROVIDER_NAME: &str = "Provider Name";
/// Service (residential aged care home) name
pub const SERVICE_NAME: &str = "Service Name";
/// State or territory of the service
pub const STATE_TERRITORY: &str = "State/Territory";
/// Modified Monash Model remoteness classification
pub const MMM_CODE: &str = "MMM Code";
/// Service size category
pub const SIZE: &str = "Size";

pub const OVERALL_STAR_RATING: &str = "Overall Star Rating";
pub const COMPLIANCE_RATING: &str = "Compliance rating";
pub const RESIDENTS_EXPERIENCE_RATING: &str = "Residents' Experience rating";
pub const STAFFING_RATING: &str = "Staffing rating";
pub const QUALITY_MEASURES_RATING: &str = "Quality Measures rating";

pub const RN_MINUTES_ACTUAL: &str = "[S] Registered Nurse Care Minutes - Actual";
pub const RN_MINUTES_TARGET: &str = "[S] Registered Nurse Care Minutes - Target";
pub const TOTAL_MINUTES_ACTUAL: &str = "[S] Total Care Minutes - Actual";
pub const TOTAL_MINUTES_TARGET: &str = "[S] Total Care Minutes - Target";

/// Derived: RN actual / target × 100
pub const RN_CARE_COMPLIANCE: &str = "RN Care Compliance %";
/// Derived: total actual / target × 100
pub const TOTAL_CARE_COMPLIANCE: &str = "Total Care Compliance %";

pub const DECISION_TYPE: &str = "[C] Decision type";
pub const DECISION_APPLIED: &str = "[C] Date Decision Applied";
pub const DECISION_ENDS: &str = "[C] Date Decision Ends";

/// Prefix shared by every resident-experience column
pub const RESIDENT_EXPERIENCE_PREFIX: &str = "[RE]";

/// Columns that must be present for the data to be usable
pub const REQUIRED_COLUMNS: [&str; 3] = [PROVIDER_NAME, SERVICE_NAME, STATE_TERRITORY];

/// Categorical columns used by the filter cascade and record identity
pub const CATEGORICAL_COLUMNS: [&str; 5] = [
    PROVIDER_NAME,
    SERVICE_NAME,
    STATE_TERRITORY,
    MMM_CODE,
    SIZE,
];

/// Numeric columns with a dedicated field on the service record
pub const TYPED_NUMERIC_COLUMNS: [&str; 9] = [
    OVERALL_STAR_RATING,
    COMPLIANCE_RATING,
    RESIDENTS_EXPERIENCE_RATING,
    STAFFING_RATING,
    QUALITY_MEASURES_RATING,
    RN_MINUTES_ACTUAL,
    RN_MINUTES_TARGET,
    TOTAL_MINUTES_ACTUAL,
    TOTAL_MINUTES_TARGET,
];

/// Quality-measure columns published in the extract
pub const QUALITY_MEASURE_COLUMNS: [&str; 7] = [
    "[QM] Pressure injuries*",
    "[QM] Restrictive practices",
    "[QM] Unplanned weight loss*",
    "[QM] Falls and major injury - falls*",
    "[QM] Falls and major injury - major injury from a fall*",
    "[QM] Medication management - polypharmacy",
    "[QM] Medication management - antipsychotic",
];

/// Parsed form of a `[RE] <category> - <frequency>` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResidentExperienceColumn {
    pub category: String,
    pub frequency: Frequency,
}

impl ResidentExperienceColumn {
    /// Parse a resident-experience header, returning `None` for any other column
    ///
    /// ```
    /// # use star_ratings::schema::ResidentExperienceColumn;
    /// # use star_ratings::data_types::Frequency;
    /// let col = ResidentExperienceColumn::parse("[RE] Food - Most of the time").unwrap();
    /// assert_eq!(col.category, "Food");
    /// assert_eq!(col.frequency, Frequency::MostOfTheTime);
    /// ```
    pub fn parse(header: &str) -> Option<Self> {
        let rest = header.strip_prefix(RESIDENT_EXPERIENCE_PREFIX)?;
        // at least one space after the prefix
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let rest = rest.trim();

        Frequency::ALL.iter().find_map(|&frequency| {
            let head = rest.strip_suffix(frequency.label())?.trim_end();
            let category = head.strip_suffix('-')?.trim();
            if category.is_empty() {
                return None;
            }
            Some(Self {
                category: category.to_string(),
                frequency,
            })
        })
    }
}

/// Header positions for one loaded sheet
#[derive(Debug, Clone, Default)]
pub struct ColumnIndex {
    positions: HashMap<String, usize>,
    headers: Vec<String>,
}

impl ColumnIndex {
    /// Build the index from a header row; headers are matched after trimming.
    /// When a header repeats, the first occurrence wins.
    pub fn new(headers: &[String]) -> Self {
        let mut positions = HashMap::with_capacity(headers.len());
        for (idx, header) in headers.iter().enumerate() {
            positions.entry(header.trim().to_string()).or_insert(idx);
        }
        Self {
            positions,
            headers: headers.iter().map(|h| h.trim().to_string()).collect(),
        }
    }

    /// Position of a column, if present
    pub fn position(&self, column: &str) -> Option<usize> {
        self.positions.get(column).copied()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.positions.contains_key(column)
    }

    /// Headers in sheet order
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Required columns that are absent, in declaration order
    pub fn missing_required(&self) -> Vec<&'static str> {
        REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|c| !self.contains(c))
            .collect()
    }

    /// Validate that every required identity column is present
    pub fn validate_required(&self) -> crate::Result<()> {
        let missing = self.missing_required();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(crate::StarRatingsError::missing_columns(missing))
        }
    }

    /// All resident-experience columns with their positions
    pub fn resident_experience_columns(&self) -> Vec<(usize, ResidentExperienceColumn)> {
        self.headers
            .iter()
            .enumerate()
            .filter_map(|(idx, header)| {
                ResidentExperienceColumn::parse(header).map(|col| (idx, col))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_resident_experience_columns() {
        let col = ResidentExperienceColumn::parse("[RE] Safety - Always").unwrap();
        assert_eq!(col.category, "Safety");
        assert_eq!(col.frequency, Frequency::Always);

        let col = ResidentExperienceColumn::parse("[RE] Staff kind and caring - Some of the time").unwrap();
        assert_eq!(col.category, "Staff kind and caring");
        assert_eq!(col.frequency, Frequency::SomeOfTheTime);

        assert!(ResidentExperienceColumn::parse("[RE] Safety").is_none());
        assert!(ResidentExperienceColumn::parse("[RE]Safety - Never").is_none());
        assert!(ResidentExperienceColumn::parse("[RE]  - Never").is_none());
        assert!(ResidentExperienceColumn::parse("[QM] Falls - Never").is_none());
        assert!(ResidentExperienceColumn::parse("[RE] Food Never").is_none());
    }

    #[test]
    fn test_missing_required_columns() {
        let index = ColumnIndex::new(&headers(&["Provider Name", "Size"]));
        assert_eq!(index.missing_required(), vec![SERVICE_NAME, STATE_TERRITORY]);
        assert!(index.validate_required().is_err());

        let index = ColumnIndex::new(&headers(&[" Provider Name ", "Service Name", "State/Territory"]));
        assert!(index.validate_required().is_ok());
        assert_eq!(index.position(PROVIDER_NAME), Some(0));
    }

    #[test]
    fn test_duplicate_headers_keep_first() {
        let index = ColumnIndex::new(&headers(&["Size", "Size"]));
        assert_eq!(index.position(SIZE), Some(0));
    }
}
