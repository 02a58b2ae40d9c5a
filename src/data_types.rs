/*!
 * Data type definitions for Star Ratings service records
 *
 * A `ServiceRecord` is one row of the "Detailed data" sheet after
 * normalization: categorical fields are never empty, numeric fields are
 * `Option<f64>` where `None` means the observation is missing.
 */

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::schema;

/// Resident-experience response frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Frequency {
    #[serde(rename = "Always")]
    Always,
    #[serde(rename = "Most of the time")]
    MostOfTheTime,
    #[serde(rename = "Some of the time")]
    SomeOfTheTime,
    #[serde(rename = "Never")]
    Never,
}

impl Frequency {
    /// Every frequency in survey order
    pub const ALL: [Frequency; 4] = [
        Frequency::Always,
        Frequency::MostOfTheTime,
        Frequency::SomeOfTheTime,
        Frequency::Never,
    ];

    /// Label as printed in column headers
    pub fn label(&self) -> &'static str {
        match self {
            Frequency::Always => "Always",
            Frequency::MostOfTheTime => "Most of the time",
            Frequency::SomeOfTheTime => "Some of the time",
            Frequency::Never => "Never",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.label() == label.trim())
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Overall and component star ratings (typically 1–5)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StarRatings {
    pub overall: Option<f64>,
    pub compliance: Option<f64>,
    pub residents_experience: Option<f64>,
    pub staffing: Option<f64>,
    pub quality_measures: Option<f64>,
}

/// Care minutes per resident per day, actual against target
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CareMinutes {
    pub rn_actual: Option<f64>,
    pub rn_target: Option<f64>,
    pub total_actual: Option<f64>,
    pub total_target: Option<f64>,
}

impl CareMinutes {
    /// RN care compliance as a percentage of target
    pub fn rn_compliance(&self) -> Option<f64> {
        compliance_ratio(self.rn_actual, self.rn_target)
    }

    /// Total care compliance as a percentage of target
    pub fn total_compliance(&self) -> Option<f64> {
        compliance_ratio(self.total_actual, self.total_target)
    }
}

/// `actual / target × 100`, missing when either side is missing or the target is zero
pub fn compliance_ratio(actual: Option<f64>, target: Option<f64>) -> Option<f64> {
    let target = target.filter(|t| *t != 0.0)?;
    let ratio = actual? / target * 100.0;
    ratio.is_finite().then_some(ratio)
}

/// One resident-experience survey percentage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidentExperienceResponse {
    pub category: String,
    pub frequency: Frequency,
    pub percentage: f64,
}

/// Compliance decision recorded against a service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplianceDecision {
    pub decision_type: Option<String>,
    pub applied: Option<NaiveDate>,
    pub ends: Option<NaiveDate>,
}

impl ComplianceDecision {
    pub fn is_empty(&self) -> bool {
        self.decision_type.is_none() && self.applied.is_none() && self.ends.is_none()
    }
}

/// A residential aged care service as published in the quarterly extract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub provider_name: String,
    pub service_name: String,
    pub state: String,
    pub mmm_code: String,
    pub size: String,
    pub ratings: StarRatings,
    pub care_minutes: CareMinutes,
    pub rn_care_compliance: Option<f64>,
    pub total_care_compliance: Option<f64>,
    /// Quality-measure and other configured indicators, keyed by source column.
    /// Only observed values are stored.
    pub indicators: BTreeMap<String, f64>,
    pub resident_experience: Vec<ResidentExperienceResponse>,
    pub compliance_decision: Option<ComplianceDecision>,
}

impl ServiceRecord {
    /// Look up a numeric measure by its column name.
    ///
    /// Typed fields and the two derived compliance ratios resolve first, then
    /// configured indicators. Unknown names are missing.
    pub fn measure(&self, name: &str) -> Option<f64> {
        match name {
            schema::OVERALL_STAR_RATING => self.ratings.overall,
            schema::COMPLIANCE_RATING => self.ratings.compliance,
            schema::RESIDENTS_EXPERIENCE_RATING => self.ratings.residents_experience,
            schema::STAFFING_RATING => self.ratings.staffing,
            schema::QUALITY_MEASURES_RATING => self.ratings.quality_measures,
            schema::RN_MINUTES_ACTUAL => self.care_minutes.rn_actual,
            schema::RN_MINUTES_TARGET => self.care_minutes.rn_target,
            schema::TOTAL_MINUTES_ACTUAL => self.care_minutes.total_actual,
            schema::TOTAL_MINUTES_TARGET => self.care_minutes.total_target,
            schema::RN_CARE_COMPLIANCE => self.rn_care_compliance,
            schema::TOTAL_CARE_COMPLIANCE => self.total_care_compliance,
            other => self.indicators.get(other).copied(),
        }
    }

    /// Resident-experience percentage for a category and frequency
    pub fn resident_experience(&self, category: &str, frequency: Frequency) -> Option<f64> {
        self.resident_experience
            .iter()
            .find(|r| r.category == category && r.frequency == frequency)
            .map(|r| r.percentage)
    }

    /// Whether the service carries a compliance decision type
    pub fn has_compliance_decision(&self) -> bool {
        self.compliance_decision
            .as_ref()
            .is_some_and(|d| d.decision_type.is_some())
    }

    /// Display label: "Service Name (Provider Name)"
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.service_name, self.provider_name)
    }
}
