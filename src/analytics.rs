/*!
 * Descriptive analytics over a filtered view
 *
 * Headline numbers for the sector overview and the provider drill-down:
 * compliance averages, resident-experience breakdowns, quality-measure means
 * with standard errors, absolute serious-concern flags and the compliance
 * decision history.
 */

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data_types::*;
use crate::stats;

/// Analytics engine over one view of service records
pub struct StarRatingsAnalytics<'a> {
    services: &'a [&'a ServiceRecord],
}

impl<'a> StarRatingsAnalytics<'a> {
    /// Create an analytics engine over a view
    pub fn new(services: &'a [&'a ServiceRecord]) -> Self {
        Self { services }
    }

    pub fn services(&self) -> &'a [&'a ServiceRecord] {
        self.services
    }

    /// Headline metrics for the sector view
    pub fn sector_overview(&self) -> SectorOverview {
        SectorOverview {
            services: self.services.len(),
            mean_rn_care_compliance: stats::mean_observed(self.services.iter().map(|s| s.rn_care_compliance)),
            mean_total_care_compliance: stats::mean_observed(self.services.iter().map(|s| s.total_care_compliance)),
            non_compliant_services: self
                .services
                .iter()
                .filter(|s| s.ratings.compliance == Some(1.0))
                .count(),
        }
    }

    /// Averages and size mix for one provider's view
    pub fn provider_profile(&self, provider_name: &str) -> ProviderProfile {
        let mut size_counts = BTreeMap::new();
        for service in self.services {
            *size_counts.entry(service.size.clone()).or_insert(0) += 1;
        }

        ProviderProfile {
            provider_name: provider_name.to_string(),
            services: self.services.len(),
            size_counts,
            mean_overall_rating: stats::mean_observed(self.services.iter().map(|s| s.ratings.overall)),
            mean_rn_care_compliance: stats::mean_observed(self.services.iter().map(|s| s.rn_care_compliance)),
            mean_total_care_compliance: stats::mean_observed(self.services.iter().map(|s| s.total_care_compliance)),
        }
    }

    /// Mean resident-experience percentage per category and frequency.
    ///
    /// Categories keep their column order; frequencies follow `frequency_order`,
    /// with any frequency it leaves out placed last.
    pub fn resident_experience_breakdown(&self, frequency_order: &[Frequency]) -> Vec<ResidentExperienceSummary> {
        let mut categories: Vec<&str> = Vec::new();
        let mut sums: BTreeMap<(&str, Frequency), (f64, usize)> = BTreeMap::new();

        for response in self.services.iter().flat_map(|s| &s.resident_experience) {
            if !categories.contains(&response.category.as_str()) {
                categories.push(&response.category);
            }
            let entry = sums.entry((response.category.as_str(), response.frequency)).or_insert((0.0, 0));
            entry.0 += response.percentage;
            entry.1 += 1;
        }

        let rank = |frequency: Frequency| {
            frequency_order
                .iter()
                .position(|f| *f == frequency)
                .unwrap_or(frequency_order.len() + frequency as usize)
        };
        let mut frequencies = Frequency::ALL.to_vec();
        frequencies.sort_by_key(|f| rank(*f));

        categories
            .iter()
            .flat_map(|category| frequencies.iter().map(move |frequency| (*category, *frequency)))
            .filter_map(|(category, frequency)| {
                let (sum, count) = sums.get(&(category, frequency))?;
                Some(ResidentExperienceSummary {
                    category: category.to_string(),
                    frequency,
                    mean_percentage: sum / *count as f64,
                    observations: *count,
                })
            })
            .collect()
    }

    /// Mean and standard error per quality measure with at least one observation
    pub fn quality_measure_summary<S: AsRef<str>>(&self, measures: &[S]) -> Vec<QualityMeasureSummary> {
        measures
            .iter()
            .filter_map(|measure| {
                let measure = measure.as_ref();
                let values: Vec<f64> = self.services.iter().filter_map(|s| s.measure(measure)).collect();
                let mean = stats::mean(&values)?;
                Some(QualityMeasureSummary {
                    measure: measure.to_string(),
                    mean,
                    standard_error: stats::standard_error(&values),
                    observations: values.len(),
                })
            })
            .collect()
    }

    /// Services meeting any absolute concern threshold
    pub fn serious_concerns(&self) -> Vec<SeriousConcern> {
        self.services
            .iter()
            .filter_map(|service| {
                let criteria = ConcernCriterion::evaluate(&service.ratings);
                (!criteria.is_empty()).then(|| SeriousConcern {
                    provider_name: service.provider_name.clone(),
                    service_name: service.service_name.clone(),
                    ratings: service.ratings.clone(),
                    criteria,
                })
            })
            .collect()
    }

    /// Services carrying a compliance decision
    pub fn compliance_history(&self) -> Vec<ComplianceEntry> {
        self.services
            .iter()
            .filter_map(|service| {
                let decision = service.compliance_decision.as_ref()?;
                let decision_type = decision.decision_type.clone()?;
                Some(ComplianceEntry {
                    provider_name: service.provider_name.clone(),
                    service_name: service.service_name.clone(),
                    decision_type,
                    applied: decision.applied,
                    ends: decision.ends,
                })
            })
            .collect()
    }
}

/// Sector overview headline metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorOverview {
    pub services: usize,
    pub mean_rn_care_compliance: Option<f64>,
    pub mean_total_care_compliance: Option<f64>,
    /// Services with a compliance rating of 1
    pub non_compliant_services: usize,
}

/// Provider drill-down summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderProfile {
    pub provider_name: String,
    pub services: usize,
    pub size_counts: BTreeMap<String, usize>,
    pub mean_overall_rating: Option<f64>,
    pub mean_rn_care_compliance: Option<f64>,
    pub mean_total_care_compliance: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidentExperienceSummary {
    pub category: String,
    pub frequency: Frequency,
    pub mean_percentage: f64,
    pub observations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityMeasureSummary {
    pub measure: String,
    pub mean: f64,
    /// `None` with fewer than two observations
    pub standard_error: Option<f64>,
    pub observations: usize,
}

/// Absolute threshold met by a service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcernCriterion {
    /// Overall star rating of 2 or less
    LowOverallRating,
    /// Compliance rating of 1
    NonCompliant,
    LowResidentsExperience,
    LowStaffing,
    LowQualityMeasures,
}

impl ConcernCriterion {
    /// Criteria met by a set of ratings; missing ratings never qualify
    pub fn evaluate(ratings: &StarRatings) -> Vec<Self> {
        let at_most_two = |rating: Option<f64>| rating.is_some_and(|r| r <= 2.0);
        let mut criteria = Vec::new();
        if at_most_two(ratings.overall) {
            criteria.push(ConcernCriterion::LowOverallRating);
        }
        if ratings.compliance == Some(1.0) {
            criteria.push(ConcernCriterion::NonCompliant);
        }
        if at_most_two(ratings.residents_experience) {
            criteria.push(ConcernCriterion::LowResidentsExperience);
        }
        if at_most_two(ratings.staffing) {
            criteria.push(ConcernCriterion::LowStaffing);
        }
        if at_most_two(ratings.quality_measures) {
            criteria.push(ConcernCriterion::LowQualityMeasures);
        }
        criteria
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConcernCriterion::LowOverallRating => "Overall Star Rating <= 2",
            ConcernCriterion::NonCompliant => "Compliance rating = 1",
            ConcernCriterion::LowResidentsExperience => "Residents' Experience rating <= 2",
            ConcernCriterion::LowStaffing => "Staffing rating <= 2",
            ConcernCriterion::LowQualityMeasures => "Quality Measures rating <= 2",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriousConcern {
    pub provider_name: String,
    pub service_name: String,
    pub ratings: StarRatings,
    pub criteria: Vec<ConcernCriterion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceEntry {
    pub provider_name: String,
    pub service_name: String,
    pub decision_type: String,
    pub applied: Option<NaiveDate>,
    pub ends: Option<NaiveDate>,
}
