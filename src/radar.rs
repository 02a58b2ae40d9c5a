/*!
 * Percentile radar for quality measures
 *
 * Each quality measure is scored as the weak percentile rank of the
 * provider's mean within the sector distribution. Quality measures are
 * rates of adverse events, so a rank near 0 is best.
 */

use serde::{Deserialize, Serialize};

use crate::analysis::{Analysis, InsufficientData, Population};
use crate::benchmark::observed_values;
use crate::config::StarRatingsConfig;
use crate::data_types::ServiceRecord;
use crate::stats;

/// Reading of a percentile against the concern/strength thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RadarSignal {
    PotentialConcern,
    Neutral,
    PotentialStrength,
}

impl RadarSignal {
    /// `percentile >= concern` is a concern, `percentile <= strength` a strength
    pub fn classify(percentile: f64, thresholds: &RadarThresholds) -> Self {
        if percentile >= thresholds.concern {
            RadarSignal::PotentialConcern
        } else if percentile <= thresholds.strength {
            RadarSignal::PotentialStrength
        } else {
            RadarSignal::Neutral
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadarThresholds {
    pub concern: f64,
    pub strength: f64,
}

impl Default for RadarThresholds {
    fn default() -> Self {
        Self {
            concern: 80.0,
            strength: 20.0,
        }
    }
}

impl From<&StarRatingsConfig> for RadarThresholds {
    fn from(config: &StarRatingsConfig) -> Self {
        Self {
            concern: config.radar_concern_percentile,
            strength: config.radar_strength_percentile,
        }
    }
}

/// One scored axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarScore {
    pub measure: String,
    /// Weak percentile rank in [0, 100]
    pub percentile: f64,
    pub provider_mean: f64,
    pub signal: RadarSignal,
}

impl RadarScore {
    pub fn label(&self) -> String {
        short_label(&self.measure)
    }
}

/// Scored quality measures for one provider
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RadarChart {
    pub scores: Vec<RadarScore>,
    /// Measures with sector data but no provider observations
    pub unscored: Vec<String>,
    pub sector_services: usize,
}

impl RadarChart {
    pub fn score(&self, measure: &str) -> Option<&RadarScore> {
        self.scores.iter().find(|s| s.measure == measure)
    }

    pub fn concerns(&self) -> impl Iterator<Item = &RadarScore> {
        self.scores.iter().filter(|s| s.signal == RadarSignal::PotentialConcern)
    }

    pub fn strengths(&self) -> impl Iterator<Item = &RadarScore> {
        self.scores.iter().filter(|s| s.signal == RadarSignal::PotentialStrength)
    }
}

/// Score a provider's quality measures against the sector view.
///
/// Needs a non-empty provider view and at least `config.radar_min_peers`
/// sector services. Measures without any sector observation are left out;
/// measures the provider never observed are listed as unscored.
pub fn score_radar(
    sector: &[&ServiceRecord],
    provider: &[&ServiceRecord],
    config: &StarRatingsConfig,
) -> Analysis<RadarChart> {
    if let Some(shortfall) = InsufficientData::check(Population::ProviderServices, 1, provider.len()) {
        return shortfall.into();
    }
    if let Some(shortfall) = InsufficientData::check(Population::SectorServices, config.radar_min_peers, sector.len()) {
        return shortfall.into();
    }

    let thresholds = RadarThresholds::from(config);
    let mut chart = RadarChart {
        sector_services: sector.len(),
        ..Default::default()
    };

    for measure in &config.quality_measures {
        let distribution = observed_values(sector, measure);
        if distribution.is_empty() {
            continue;
        }

        let provider_mean = stats::mean(&observed_values(provider, measure));
        let percentile = provider_mean.and_then(|mean| stats::percentile_rank_weak(&distribution, mean));

        match (provider_mean, percentile) {
            (Some(provider_mean), Some(percentile)) => chart.scores.push(RadarScore {
                measure: measure.clone(),
                percentile,
                provider_mean,
                signal: RadarSignal::classify(percentile, &thresholds),
            }),
            _ => chart.unscored.push(measure.clone()),
        }
    }

    Analysis::Computed(chart)
}

/// Compact axis label for a quality measure column
///
/// ```
/// # use star_ratings::radar::short_label;
/// assert_eq!(short_label("[QM] Medication management - antipsychotic"), "Med Mgmt-antipsychotic");
/// assert_eq!(short_label("[QM] Falls and major injury - falls*"), "falls*");
/// ```
pub fn short_label(measure: &str) -> String {
    measure
        .replace("[QM] ", "")
        .replace("Medication management - ", "Med Mgmt-")
        .replace("Falls and major injury - ", "")
        .replace(" restrictive practices", " restraint")
        .replace(" pressure injuries", " pressure inj.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use crate::data_types::*;
    use std::collections::BTreeMap;

    const QM: &str = "[QM] Pressure injuries*";

    fn service(provider: &str, qm: Option<f64>) -> ServiceRecord {
        let mut indicators = BTreeMap::new();
        if let Some(v) = qm {
            indicators.insert(QM.to_string(), v);
        }
        ServiceRecord {
            provider_name: provider.to_string(),
            service_name: format!("{provider} home"),
            state: "QLD".to_string(),
            mmm_code: "2".to_string(),
            size: "Small".to_string(),
            ratings: StarRatings::default(),
            care_minutes: CareMinutes::default(),
            rn_care_compliance: None,
            total_care_compliance: None,
            indicators,
            resident_experience: Vec::new(),
            compliance_decision: None,
        }
    }

    fn config() -> StarRatingsConfig {
        ConfigBuilder::new().quality_measures([QM, "[QM] Restrictive practices"]).build()
    }

    #[test]
    fn test_weak_percentile_of_provider_mean() {
        let sector: Vec<ServiceRecord> = (1..=10).map(|v| service("Peer", Some(v as f64))).collect();
        let focal = vec![service("Focal", Some(8.0)), service("Focal", Some(10.0))];
        let sector_view: Vec<&ServiceRecord> = sector.iter().collect();
        let provider_view: Vec<&ServiceRecord> = focal.iter().collect();

        let chart = score_radar(&sector_view, &provider_view, &config()).into_computed().unwrap();
        let score = chart.score(QM).unwrap();
        assert_eq!(score.provider_mean, 9.0);
        assert_eq!(score.percentile, 90.0);
        assert_eq!(score.signal, RadarSignal::PotentialConcern);
        // restrictive practices has no sector data at all
        assert!(chart.unscored.is_empty());
        assert_eq!(chart.scores.len(), 1);
    }

    #[test]
    fn test_extremes() {
        let sector: Vec<ServiceRecord> = [2.0, 4.0, 6.0].iter().map(|v| service("Peer", Some(*v))).collect();
        let sector_view: Vec<&ServiceRecord> = sector.iter().collect();

        let top = [&sector[2]];
        let chart = score_radar(&sector_view, &top, &config()).into_computed().unwrap();
        assert_eq!(chart.score(QM).map(|s| s.percentile), Some(100.0));

        let low = vec![service("Focal", Some(1.0))];
        let low_view: Vec<&ServiceRecord> = low.iter().collect();
        let chart = score_radar(&sector_view, &low_view, &config()).into_computed().unwrap();
        let score = chart.score(QM).unwrap();
        assert_eq!(score.percentile, 0.0);
        assert_eq!(score.signal, RadarSignal::PotentialStrength);
    }

    #[test]
    fn test_provider_without_observations_is_unscored() {
        let sector: Vec<ServiceRecord> = (1..=4).map(|v| service("Peer", Some(v as f64))).collect();
        let focal = vec![service("Focal", None)];
        let sector_view: Vec<&ServiceRecord> = sector.iter().collect();
        let provider_view: Vec<&ServiceRecord> = focal.iter().collect();

        let chart = score_radar(&sector_view, &provider_view, &config()).into_computed().unwrap();
        assert!(chart.scores.is_empty());
        assert_eq!(chart.unscored, vec![QM.to_string()]);
    }

    #[test]
    fn test_insufficient_sector() {
        let sector: Vec<ServiceRecord> = (1..=2).map(|v| service("Peer", Some(v as f64))).collect();
        let sector_view: Vec<&ServiceRecord> = sector.iter().collect();

        let result = score_radar(&sector_view, &sector_view[..1], &config());
        assert_eq!(
            result.insufficient(),
            Some(&InsufficientData::new(Population::SectorServices, 3, 2))
        );

        let result = score_radar(&sector_view, &[], &config());
        assert_eq!(result.insufficient().map(|s| s.population), Some(Population::ProviderServices));
    }

    #[test]
    fn test_signal_thresholds_are_inclusive() {
        let thresholds = RadarThresholds::default();
        assert_eq!(RadarSignal::classify(80.0, &thresholds), RadarSignal::PotentialConcern);
        assert_eq!(RadarSignal::classify(79.9, &thresholds), RadarSignal::Neutral);
        assert_eq!(RadarSignal::classify(20.0, &thresholds), RadarSignal::PotentialStrength);
        assert_eq!(RadarSignal::classify(20.1, &thresholds), RadarSignal::Neutral);
    }
}
