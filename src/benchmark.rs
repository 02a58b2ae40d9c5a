/*!
 * Sector benchmarks and provider comparison
 *
 * A benchmark is the median, 75th and 90th percentile of a measure over a
 * peer set, using linear interpolation between order statistics. Missing
 * observations are dropped first; a measure with none left has an all-missing
 * benchmark.
 */

use serde::{Deserialize, Serialize};

use crate::analysis::{Analysis, InsufficientData, Population};
use crate::data_types::ServiceRecord;
use crate::stats;

/// Distribution summary for one measure over a peer set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub measure: String,
    pub median: Option<f64>,
    pub p75: Option<f64>,
    pub p90: Option<f64>,
    /// Non-missing peer observations the benchmark was computed from
    pub observations: usize,
}

impl BenchmarkResult {
    /// Benchmark with no observations
    pub fn missing<S: Into<String>>(measure: S) -> Self {
        Self {
            measure: measure.into(),
            median: None,
            p75: None,
            p90: None,
            observations: 0,
        }
    }

    /// Benchmark of already-observed values
    pub fn from_values<S: Into<String>>(measure: S, values: &[f64]) -> Self {
        let sorted = stats::sorted(values);
        Self {
            measure: measure.into(),
            median: stats::quantile_sorted(&sorted, 0.5),
            p75: stats::quantile_sorted(&sorted, 0.75),
            p90: stats::quantile_sorted(&sorted, 0.90),
            observations: sorted.len(),
        }
    }

    pub fn is_missing(&self) -> bool {
        self.observations == 0
    }
}

/// Observed values of `measure` across `records`
pub fn observed_values(records: &[&ServiceRecord], measure: &str) -> Vec<f64> {
    records.iter().filter_map(|r| r.measure(measure)).collect()
}

/// One benchmark per measure, in the order given
pub fn compute_benchmarks<S: AsRef<str>>(peers: &[&ServiceRecord], measures: &[S]) -> Vec<BenchmarkResult> {
    measures
        .iter()
        .map(|measure| {
            let measure = measure.as_ref();
            let values = observed_values(peers, measure);
            if values.is_empty() {
                BenchmarkResult::missing(measure)
            } else {
                BenchmarkResult::from_values(measure, &values)
            }
        })
        .collect()
}

/// A provider's mean over its own observed values for one measure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderAggregate {
    pub measure: String,
    pub mean: f64,
    pub observations: usize,
}

/// Provider means per measure; measures the provider never observed are left out
pub fn provider_aggregates<S: AsRef<str>>(provider: &[&ServiceRecord], measures: &[S]) -> Vec<ProviderAggregate> {
    measures
        .iter()
        .filter_map(|measure| {
            let measure = measure.as_ref();
            let values = observed_values(provider, measure);
            stats::mean(&values).map(|mean| ProviderAggregate {
                measure: measure.to_string(),
                mean,
                observations: values.len(),
            })
        })
        .collect()
}

/// Where a provider value sits against a benchmark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceTier {
    /// At or above the 90th percentile
    TopDecile,
    /// At or above the median, below the 90th percentile
    AtOrAboveMedian,
    BelowMedian,
}

impl PerformanceTier {
    /// Classify a value; missing values and missing benchmarks are never classified
    pub fn classify(value: Option<f64>, benchmark: &BenchmarkResult) -> Option<Self> {
        let value = value?;
        let median = benchmark.median?;
        match benchmark.p90 {
            Some(p90) if value >= p90 => Some(PerformanceTier::TopDecile),
            _ if value >= median => Some(PerformanceTier::AtOrAboveMedian),
            _ => Some(PerformanceTier::BelowMedian),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PerformanceTier::TopDecile => "top decile",
            PerformanceTier::AtOrAboveMedian => "at or above median",
            PerformanceTier::BelowMedian => "below median",
        }
    }
}

/// Provider value joined with its peer benchmark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkComparison {
    pub measure: String,
    pub provider_value: f64,
    pub median: Option<f64>,
    pub p75: Option<f64>,
    pub p90: Option<f64>,
    pub tier: Option<PerformanceTier>,
}

/// Inner join of benchmarks and provider aggregates on measure name,
/// in benchmark order
pub fn join_comparison(benchmarks: &[BenchmarkResult], aggregates: &[ProviderAggregate]) -> Vec<BenchmarkComparison> {
    benchmarks
        .iter()
        .filter_map(|benchmark| {
            let aggregate = aggregates.iter().find(|a| a.measure == benchmark.measure)?;
            Some(BenchmarkComparison {
                measure: benchmark.measure.clone(),
                provider_value: aggregate.mean,
                median: benchmark.median,
                p75: benchmark.p75,
                p90: benchmark.p90,
                tier: PerformanceTier::classify(Some(aggregate.mean), benchmark),
            })
        })
        .collect()
}

/// Compare a provider's services with the rest of the sector view.
///
/// The peer set is `sector` minus the provider's own services. Without
/// provider services or without any peers there is nothing to compare.
pub fn compare_provider<S: AsRef<str>>(
    sector: &[&ServiceRecord],
    provider_view: &[&ServiceRecord],
    provider_name: &str,
    measures: &[S],
) -> Analysis<Vec<BenchmarkComparison>> {
    if let Some(shortfall) = InsufficientData::check(Population::ProviderServices, 1, provider_view.len()) {
        return shortfall.into();
    }

    let peers: Vec<&ServiceRecord> = sector
        .iter()
        .copied()
        .filter(|r| r.provider_name != provider_name)
        .collect();
    if let Some(shortfall) = InsufficientData::check(Population::PeerServices, 1, peers.len()) {
        return shortfall.into();
    }

    let benchmarks = compute_benchmarks(&peers, measures);
    let aggregates = provider_aggregates(provider_view, measures);
    Analysis::Computed(join_comparison(&benchmarks, &aggregates))
}
