/*!
 * IQR outlier detection over the sector view
 *
 * Tukey's rule per metric: with Q1 and Q3 of the observed values, anything
 * strictly below `Q1 - k·IQR` or strictly above `Q3 + k·IQR` is an outlier,
 * but only in the direction the metric's rule treats as a concern.
 */

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::{Analysis, InsufficientData, Population};
use crate::config::StarRatingsConfig;
use crate::data_types::ServiceRecord;
use crate::stats;

/// Which side of the distribution is a concern for a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Lower is worse (ratings, care compliance)
    Low,
    /// Higher is worse (adverse-event rates)
    High,
    Both,
}

impl Direction {
    pub fn flags_low(&self) -> bool {
        matches!(self, Direction::Low | Direction::Both)
    }

    pub fn flags_high(&self) -> bool {
        matches!(self, Direction::High | Direction::Both)
    }
}

/// Metric checked for outliers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlierRule {
    pub metric: String,
    pub direction: Direction,
}

impl OutlierRule {
    pub fn new<S: Into<String>>(metric: S, direction: Direction) -> Self {
        Self {
            metric: metric.into(),
            direction,
        }
    }
}

/// Quartiles and fences for one metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IqrBounds {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

impl IqrBounds {
    /// Fences from observed values; `None` when there are none
    pub fn from_values(values: &[f64], multiplier: f64) -> Option<Self> {
        let sorted = stats::sorted(values);
        let q1 = stats::quantile_sorted(&sorted, 0.25)?;
        let q3 = stats::quantile_sorted(&sorted, 0.75)?;
        let iqr = q3 - q1;
        Some(Self {
            q1,
            q3,
            lower: q1 - multiplier * iqr,
            upper: q3 + multiplier * iqr,
        })
    }

    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierReason {
    Low,
    High,
}

/// One record flagged on one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierRecord {
    pub provider_name: String,
    pub service_name: String,
    pub metric: String,
    pub value: f64,
    pub reason: OutlierReason,
    /// The fence that was crossed
    pub bound: f64,
    pub q1: f64,
    pub q3: f64,
}

impl OutlierRecord {
    /// e.g. `High Outlier (> 14.50)`
    pub fn reason_text(&self) -> String {
        match self.reason {
            OutlierReason::Low => format!("Low Outlier (< {:.2})", self.bound),
            OutlierReason::High => format!("High Outlier (> {:.2})", self.bound),
        }
    }

    /// e.g. `[12.00 - 13.00]`
    pub fn iqr_range(&self) -> String {
        format!("[{:.2} - {:.2}]", self.q1, self.q3)
    }
}

impl fmt::Display for OutlierRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / {}: {} = {:.2} {} IQR {}",
            self.provider_name,
            self.service_name,
            self.metric,
            self.value,
            self.reason_text(),
            self.iqr_range()
        )
    }
}

/// Outliers found in one view
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OutlierReport {
    pub outliers: Vec<OutlierRecord>,
    /// Metrics with enough observations to be evaluated
    pub metrics_checked: Vec<String>,
    /// Metrics skipped for having too few observations
    pub metrics_skipped: Vec<String>,
}

impl OutlierReport {
    pub fn is_empty(&self) -> bool {
        self.outliers.is_empty()
    }

    /// Outlier count per metric, most frequent first
    pub fn counts_by_metric(&self) -> Vec<(String, usize)> {
        count_by(&self.outliers, |o| &o.metric)
    }

    /// Outlier count per provider, most frequent first
    pub fn counts_by_provider(&self) -> Vec<(String, usize)> {
        count_by(&self.outliers, |o| &o.provider_name)
    }
}

fn count_by<F>(outliers: &[OutlierRecord], key: F) -> Vec<(String, usize)>
where
    F: Fn(&OutlierRecord) -> &String,
{
    let mut counts: BTreeMap<&String, usize> = BTreeMap::new();
    for outlier in outliers {
        *counts.entry(key(outlier)).or_insert(0) += 1;
    }
    let mut counts: Vec<(String, usize)> = counts.into_iter().map(|(k, v)| (k.clone(), v)).collect();
    // stable: ties stay alphabetical
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// Detect outliers in the sector view.
///
/// Skipped entirely below `config.outlier_min_services` services; each metric
/// is further skipped below `config.outlier_min_values` observations.
pub fn detect_outliers(sector: &[&ServiceRecord], config: &StarRatingsConfig) -> Analysis<OutlierReport> {
    if let Some(shortfall) = InsufficientData::check(Population::SectorServices, config.outlier_min_services, sector.len()) {
        return shortfall.into();
    }

    let mut report = OutlierReport::default();

    for rule in &config.outlier_rules {
        let observed: Vec<(&ServiceRecord, f64)> = sector
            .iter()
            .filter_map(|r| r.measure(&rule.metric).map(|v| (*r, v)))
            .collect();

        if observed.len() < config.outlier_min_values {
            debug!(metric = %rule.metric, observations = observed.len(), "skipping metric with too few observations");
            report.metrics_skipped.push(rule.metric.clone());
            continue;
        }

        let values: Vec<f64> = observed.iter().map(|(_, v)| *v).collect();
        let Some(bounds) = IqrBounds::from_values(&values, config.iqr_multiplier) else {
            continue;
        };
        report.metrics_checked.push(rule.metric.clone());

        let flag = |reason: OutlierReason, bound: f64, crossed: &dyn Fn(f64) -> bool| {
            observed
                .iter()
                .filter(|(_, value)| crossed(*value))
                .map(|(record, value)| OutlierRecord {
                    provider_name: record.provider_name.clone(),
                    service_name: record.service_name.clone(),
                    metric: rule.metric.clone(),
                    value: *value,
                    reason,
                    bound,
                    q1: bounds.q1,
                    q3: bounds.q3,
                })
                .collect::<Vec<_>>()
        };

        if rule.direction.flags_low() {
            report.outliers.extend(flag(OutlierReason::Low, bounds.lower, &|v: f64| v < bounds.lower));
        }
        if rule.direction.flags_high() {
            report.outliers.extend(flag(OutlierReason::High, bounds.upper, &|v: f64| v > bounds.upper));
        }
    }

    debug!(
        outliers = report.outliers.len(),
        checked = report.metrics_checked.len(),
        skipped = report.metrics_skipped.len(),
        "outlier detection complete"
    );
    Analysis::Computed(report)
}
