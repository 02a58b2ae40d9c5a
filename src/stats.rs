/*!
 * Descriptive statistics over peer distributions
 *
 * Every function takes already-filtered observations; callers drop missing
 * values before calling in. Empty input yields `None`, never a panic.
 */

use std::cmp::Ordering;

/// Arithmetic mean
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Mean of the observed values, skipping missing ones
pub fn mean_observed<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let observed: Vec<f64> = values.into_iter().flatten().collect();
    mean(&observed)
}

/// Sort a copy of the values ascending
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    sorted
}

/// Quantile of pre-sorted values using linear interpolation between order
/// statistics (position `(n - 1) * q`).
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let q = q.clamp(0.0, 1.0);
    let position = (sorted.len() - 1) as f64 * q;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    let (low, high) = (sorted[lower], sorted[upper]);
    // kept inside [low, high] so quantiles stay monotone under rounding
    Some((low + (high - low) * fraction).max(low).min(high))
}

/// Quantile of unsorted values
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    quantile_sorted(&sorted(values), q)
}

pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// Weak percentile rank: percentage of observations less than or equal to `score`
pub fn percentile_rank_weak(values: &[f64], score: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let at_or_below = values.iter().filter(|v| **v <= score).count();
    Some(100.0 * at_or_below as f64 / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator)
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values)?;
    let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Some((sum_sq / (values.len() - 1) as f64).sqrt())
}

/// Standard error of the mean
pub fn standard_error(values: &[f64]) -> Option<f64> {
    sample_std_dev(values).map(|sd| sd / (values.len() as f64).sqrt())
}
