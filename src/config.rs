/*!
 * Configuration support for the Star Ratings library
 *
 * Every constant the analyses depend on (measure lists, outlier rules,
 * percentile thresholds, minimum peer counts) lives here so it can be
 * overridden from a TOML file or the environment.
 */

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::data_types::Frequency;
use crate::outliers::{Direction, OutlierRule};
use crate::{constants, schema};

/// Runtime configuration for loading and analysing Star Ratings data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarRatingsConfig {
    /// Sheet holding one row per service (required)
    #[serde(default = "default_detailed_sheet")]
    pub detailed_sheet: String,

    /// Summary star ratings sheet (optional, passed through untouched)
    #[serde(default = "default_star_ratings_sheet")]
    pub star_ratings_sheet: String,

    /// Sentinel for missing categorical values
    #[serde(default = "default_unknown_label")]
    pub unknown_label: String,

    /// Quality-measure fields scored on the radar
    #[serde(default = "default_quality_measures")]
    pub quality_measures: Vec<String>,

    /// Measures benchmarked against the sector (median / p75 / p90)
    #[serde(default = "default_benchmark_measures")]
    pub benchmark_measures: Vec<String>,

    /// Metrics checked for IQR outliers and the direction that is a concern
    #[serde(default = "default_outlier_rules")]
    pub outlier_rules: Vec<OutlierRule>,

    /// Ordering of resident-experience frequencies in breakdowns
    #[serde(default = "default_frequency_order")]
    pub frequency_order: Vec<Frequency>,

    /// Radar percentile at or above which a measure is a potential concern
    #[serde(default = "default_radar_concern_percentile")]
    pub radar_concern_percentile: f64,

    /// Radar percentile at or below which a measure is a potential strength
    #[serde(default = "default_radar_strength_percentile")]
    pub radar_strength_percentile: f64,

    /// Minimum sector services for radar scoring
    #[serde(default = "default_radar_min_peers")]
    pub radar_min_peers: usize,

    /// Minimum sector services before outlier detection runs at all
    #[serde(default = "default_outlier_min_services")]
    pub outlier_min_services: usize,

    /// Minimum observed values for a single metric to be checked
    #[serde(default = "default_outlier_min_values")]
    pub outlier_min_values: usize,

    /// Tukey fence multiplier
    #[serde(default = "default_iqr_multiplier")]
    pub iqr_multiplier: f64,

    /// Whether to show a spinner while loading
    #[serde(default = "default_show_progress")]
    pub show_progress: bool,
}

impl Default for StarRatingsConfig {
    fn default() -> Self {
        Self {
            detailed_sheet: default_detailed_sheet(),
            star_ratings_sheet: default_star_ratings_sheet(),
            unknown_label: default_unknown_label(),
            quality_measures: default_quality_measures(),
            benchmark_measures: default_benchmark_measures(),
            outlier_rules: default_outlier_rules(),
            frequency_order: default_frequency_order(),
            radar_concern_percentile: default_radar_concern_percentile(),
            radar_strength_percentile: default_radar_strength_percentile(),
            radar_min_peers: default_radar_min_peers(),
            outlier_min_services: default_outlier_min_services(),
            outlier_min_values: default_outlier_min_values(),
            iqr_multiplier: default_iqr_multiplier(),
            show_progress: default_show_progress(),
        }
    }
}

// Default value functions for serde
fn default_detailed_sheet() -> String {
    constants::DETAILED_SHEET.to_string()
}

fn default_star_ratings_sheet() -> String {
    constants::STAR_RATINGS_SHEET.to_string()
}

fn default_unknown_label() -> String {
    constants::UNKNOWN_LABEL.to_string()
}

fn default_quality_measures() -> Vec<String> {
    schema::QUALITY_MEASURE_COLUMNS.iter().map(|s| s.to_string()).collect()
}

fn default_benchmark_measures() -> Vec<String> {
    vec![
        schema::OVERALL_STAR_RATING.to_string(),
        schema::RN_CARE_COMPLIANCE.to_string(),
        schema::TOTAL_CARE_COMPLIANCE.to_string(),
    ]
}

fn default_outlier_rules() -> Vec<OutlierRule> {
    vec![
        OutlierRule::new(schema::OVERALL_STAR_RATING, Direction::Low),
        OutlierRule::new(schema::RN_CARE_COMPLIANCE, Direction::Low),
        OutlierRule::new(schema::TOTAL_CARE_COMPLIANCE, Direction::Low),
        OutlierRule::new("[QM] Pressure injuries*", Direction::High),
        OutlierRule::new("[QM] Restrictive practices", Direction::High),
        OutlierRule::new("[QM] Falls and major injury - falls*", Direction::High),
        OutlierRule::new("[QM] Medication management - antipsychotic", Direction::High),
    ]
}

fn default_frequency_order() -> Vec<Frequency> {
    Frequency::ALL.to_vec()
}

fn default_radar_concern_percentile() -> f64 {
    constants::RADAR_CONCERN_PERCENTILE
}

fn default_radar_strength_percentile() -> f64 {
    constants::RADAR_STRENGTH_PERCENTILE
}

fn default_radar_min_peers() -> usize {
    constants::RADAR_MIN_PEERS
}

fn default_outlier_min_services() -> usize {
    constants::OUTLIER_MIN_SERVICES
}

fn default_outlier_min_values() -> usize {
    constants::OUTLIER_MIN_VALUES
}

fn default_iqr_multiplier() -> f64 {
    constants::IQR_MULTIPLIER
}

fn default_show_progress() -> bool {
    true
}

impl StarRatingsConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables
    ///
    /// Supported environment variables:
    /// - `STAR_RATINGS_DETAILED_SHEET`: sheet name
    /// - `STAR_RATINGS_QUALITY_MEASURES`: `;`-separated column names
    /// - `STAR_RATINGS_BENCHMARK_MEASURES`: `;`-separated column names
    /// - `STAR_RATINGS_RADAR_CONCERN`: percentile
    /// - `STAR_RATINGS_RADAR_STRENGTH`: percentile
    /// - `STAR_RATINGS_RADAR_MIN_PEERS`: number
    /// - `STAR_RATINGS_OUTLIER_MIN_SERVICES`: number
    /// - `STAR_RATINGS_OUTLIER_MIN_VALUES`: number
    /// - `STAR_RATINGS_PROGRESS`: "true" or "false"
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("STAR_RATINGS_DETAILED_SHEET") {
            config.detailed_sheet = val;
        }

        if let Ok(val) = std::env::var("STAR_RATINGS_QUALITY_MEASURES") {
            config.quality_measures = split_list(&val);
        }

        if let Ok(val) = std::env::var("STAR_RATINGS_BENCHMARK_MEASURES") {
            config.benchmark_measures = split_list(&val);
        }

        if let Ok(val) = std::env::var("STAR_RATINGS_RADAR_CONCERN") {
            if let Ok(pct) = val.parse() {
                config.radar_concern_percentile = pct;
            }
        }

        if let Ok(val) = std::env::var("STAR_RATINGS_RADAR_STRENGTH") {
            if let Ok(pct) = val.parse() {
                config.radar_strength_percentile = pct;
            }
        }

        if let Ok(val) = std::env::var("STAR_RATINGS_RADAR_MIN_PEERS") {
            if let Ok(n) = val.parse() {
                config.radar_min_peers = n;
            }
        }

        if let Ok(val) = std::env::var("STAR_RATINGS_OUTLIER_MIN_SERVICES") {
            if let Ok(n) = val.parse() {
                config.outlier_min_services = n;
            }
        }

        if let Ok(val) = std::env::var("STAR_RATINGS_OUTLIER_MIN_VALUES") {
            if let Ok(n) = val.parse() {
                config.outlier_min_values = n;
            }
        }

        if let Ok(val) = std::env::var("STAR_RATINGS_PROGRESS") {
            config.show_progress = val.to_lowercase() == "true";
        }

        config
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| crate::StarRatingsError::Configuration {
                message: format!("Failed to parse config file: {}", e),
                suggestion: Some("Check that the file is valid TOML format".to_string()),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| crate::StarRatingsError::Configuration {
                message: format!("Failed to serialize config: {}", e),
                suggestion: None,
            })?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// Returns `~/.config/star-ratings/config.toml` on Unix-like systems
    /// or `%APPDATA%\star-ratings\config.toml` on Windows
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "star-ratings")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load configuration from the default location, environment, or defaults
    ///
    /// Priority order:
    /// 1. Default config file (if exists)
    /// 2. Environment variables
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Some(config_path) = Self::default_config_path() {
            if config_path.exists() {
                match Self::from_file(&config_path) {
                    Ok(config) => return config,
                    Err(e) => tracing::warn!(
                        path = %config_path.display(),
                        error = %e,
                        "ignoring unreadable config file"
                    ),
                }
            }
        }

        Self::from_env().validated_or_default("environment")
    }

    /// `self` when it passes `validate`, otherwise the built-in defaults
    fn validated_or_default(self, source: &str) -> Self {
        match self.validate() {
            Ok(()) => self,
            Err(e) => {
                tracing::warn!(source, error = %e, "ignoring invalid configuration; using defaults");
                Self::default()
            }
        }
    }

    /// Check thresholds and minimum counts for consistency
    pub fn validate(&self) -> crate::Result<()> {
        let strength = self.radar_strength_percentile;
        let concern = self.radar_concern_percentile;
        if !(0.0..=100.0).contains(&strength) || !(0.0..=100.0).contains(&concern) || strength >= concern {
            return Err(crate::StarRatingsError::Configuration {
                message: format!(
                    "Radar thresholds out of order: strength {} must be below concern {} and both within 0-100",
                    strength, concern
                ),
                suggestion: Some("The published defaults are strength 20 and concern 80".to_string()),
            });
        }

        if self.radar_min_peers == 0 || self.outlier_min_services == 0 || self.outlier_min_values == 0 {
            return Err(crate::StarRatingsError::Configuration {
                message: "Minimum peer counts must be at least 1".to_string(),
                suggestion: Some("The published defaults are 3 for radar scoring and 5 for outlier detection".to_string()),
            });
        }

        if !(self.iqr_multiplier.is_finite() && self.iqr_multiplier >= 0.0) {
            return Err(crate::StarRatingsError::Configuration {
                message: format!("Invalid IQR multiplier {}", self.iqr_multiplier),
                suggestion: Some("Tukey's rule uses 1.5".to_string()),
            });
        }

        Ok(())
    }
}

fn split_list(val: &str) -> Vec<String> {
    val.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// Global configuration support
lazy_static::lazy_static! {
    static ref GLOBAL_CONFIG: RwLock<Option<StarRatingsConfig>> = RwLock::new(None);
}

/// Set the global configuration
pub fn set_global_config(config: StarRatingsConfig) {
    *GLOBAL_CONFIG.write().unwrap_or_else(|e| e.into_inner()) = Some(config);
}

/// Get the global configuration (or load one if not set)
pub fn global_config() -> StarRatingsConfig {
    GLOBAL_CONFIG.read()
        .unwrap_or_else(|e| e.into_inner())
        .as_ref()
        .cloned()
        .unwrap_or_else(StarRatingsConfig::load)
}

/// Clear the global configuration
pub fn clear_global_config() {
    *GLOBAL_CONFIG.write().unwrap_or_else(|e| e.into_inner()) = None;
}

/// Builder for customizing configuration
#[derive(Default)]
pub struct ConfigBuilder {
    config: StarRatingsConfig,
}

impl ConfigBuilder {
    /// Start building a new configuration
    pub fn new() -> Self {
        Self::default()
    }

    pub fn detailed_sheet<S: Into<String>>(mut self, sheet: S) -> Self {
        self.config.detailed_sheet = sheet.into();
        self
    }

    pub fn quality_measures<I, S>(mut self, measures: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.quality_measures = measures.into_iter().map(Into::into).collect();
        self
    }

    pub fn benchmark_measures<I, S>(mut self, measures: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.benchmark_measures = measures.into_iter().map(Into::into).collect();
        self
    }

    pub fn outlier_rules(mut self, rules: Vec<OutlierRule>) -> Self {
        self.config.outlier_rules = rules;
        self
    }

    pub fn frequency_order(mut self, order: Vec<Frequency>) -> Self {
        self.config.frequency_order = order;
        self
    }

    /// Set radar concern and strength percentiles
    pub fn radar_thresholds(mut self, concern: f64, strength: f64) -> Self {
        self.config.radar_concern_percentile = concern;
        self.config.radar_strength_percentile = strength;
        self
    }

    pub fn radar_min_peers(mut self, n: usize) -> Self {
        self.config.radar_min_peers = n;
        self
    }

    /// Set the outlier gates: whole sector view, and per metric
    pub fn outlier_minimums(mut self, services: usize, values: usize) -> Self {
        self.config.outlier_min_services = services;
        self.config.outlier_min_values = values;
        self
    }

    pub fn show_progress(mut self, enabled: bool) -> Self {
        self.config.show_progress = enabled;
        self
    }

    /// Build the configuration
    pub fn build(self) -> StarRatingsConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = StarRatingsConfig::default();
        assert_eq!(config.detailed_sheet, "Detailed data");
        assert_eq!(config.quality_measures.len(), 7);
        assert_eq!(config.benchmark_measures[1], "RN Care Compliance %");
        assert_eq!(config.radar_concern_percentile, 80.0);
        assert_eq!(config.radar_strength_percentile, 20.0);
        assert_eq!(config.radar_min_peers, 3);
        assert_eq!(config.outlier_min_services, 5);
        assert_eq!(config.outlier_rules.len(), 7);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .quality_measures(["[QM] Restrictive practices"])
            .radar_thresholds(90.0, 10.0)
            .radar_min_peers(4)
            .outlier_minimums(6, 4)
            .show_progress(false)
            .build();

        assert_eq!(config.quality_measures, vec!["[QM] Restrictive practices"]);
        assert_eq!(config.radar_concern_percentile, 90.0);
        assert_eq!(config.radar_min_peers, 4);
        assert_eq!(config.outlier_min_services, 6);
        assert_eq!(config.outlier_min_values, 4);
        assert!(!config.show_progress);
    }

    #[test]
    fn test_validate_rejects_inverted_thresholds() {
        let config = ConfigBuilder::new().radar_thresholds(20.0, 80.0).build();
        assert!(config.validate().is_err());

        let config = ConfigBuilder::new().radar_min_peers(0).build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_settings_fall_back_to_defaults() {
        let inverted = ConfigBuilder::new().radar_thresholds(10.0, 20.0).build();
        assert_eq!(inverted.validated_or_default("environment"), StarRatingsConfig::default());

        let custom = ConfigBuilder::new().radar_min_peers(7).build();
        assert_eq!(custom.clone().validated_or_default("environment"), custom);
    }

    #[test]
    fn test_toml_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = ConfigBuilder::new()
            .outlier_rules(vec![OutlierRule::new("Staffing rating", Direction::Both)])
            .build();
        config.save(&path).unwrap();

        let loaded = StarRatingsConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: StarRatingsConfig = toml::from_str("radar_min_peers = 4\n").unwrap();
        assert_eq!(config.radar_min_peers, 4);
        assert_eq!(config.outlier_min_values, 5);
        assert_eq!(config.frequency_order, Frequency::ALL.to_vec());
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list("a; b ;;c"), vec!["a", "b", "c"]);
    }
}
