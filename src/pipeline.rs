/*!
 * Session lifecycle and full recomputation
 *
 * A `Session` owns at most one loaded dataset. Loading replaces it, a failed
 * load clears it and keeps the error for display. Every filter change runs
 * `recompute`, a pure function of dataset, filters and configuration.
 */

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analysis::Analysis;
use crate::analytics::{
    ComplianceEntry, ProviderProfile, QualityMeasureSummary, ResidentExperienceSummary, SectorOverview,
    SeriousConcern, StarRatingsAnalytics,
};
use crate::benchmark::{compare_provider, compute_benchmarks, BenchmarkComparison, BenchmarkResult};
use crate::config::StarRatingsConfig;
use crate::dataset::{StarRatingsDataset, StarRatingsDatasetBuilder};
use crate::filter::FilterState;
use crate::outliers::{detect_outliers, OutlierReport};
use crate::radar::{score_radar, RadarChart};
use crate::reader::SourceTables;
use crate::Result;

/// Provider drill-down, present when a single provider is selected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderDrillDown {
    pub profile: ProviderProfile,
    pub resident_experience: Vec<ResidentExperienceSummary>,
    pub quality_measures: Vec<QualityMeasureSummary>,
    pub serious_concerns: Vec<SeriousConcern>,
    pub compliance_history: Vec<ComplianceEntry>,
    pub comparison: Analysis<Vec<BenchmarkComparison>>,
    pub radar: Analysis<RadarChart>,
}

/// Everything derived from one filter state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutput {
    pub filters: FilterState,
    /// Heading for the sector filters, e.g. `NSW / Sizes: Small`
    pub filter_description: String,
    pub total_services: usize,
    pub sector_services: usize,
    pub provider_services: usize,
    pub provider_options: Vec<String>,
    pub sector_overview: SectorOverview,
    /// Benchmarks over the whole sector view
    pub benchmarks: Vec<BenchmarkResult>,
    pub outliers: Analysis<OutlierReport>,
    pub provider: Option<ProviderDrillDown>,
}

/// Run every analysis for one filter state
pub fn recompute(dataset: &StarRatingsDataset, filters: &FilterState, config: &StarRatingsConfig) -> PipelineOutput {
    let views = dataset.views(filters);
    let sector = StarRatingsAnalytics::new(&views.sector);

    let provider = filters.provider.selected().map(|name| {
        let analytics = StarRatingsAnalytics::new(&views.provider);
        ProviderDrillDown {
            profile: analytics.provider_profile(name),
            resident_experience: analytics.resident_experience_breakdown(&config.frequency_order),
            quality_measures: analytics.quality_measure_summary(&config.quality_measures),
            serious_concerns: analytics.serious_concerns(),
            compliance_history: analytics.compliance_history(),
            comparison: compare_provider(&views.sector, &views.provider, name, &config.benchmark_measures),
            radar: score_radar(&views.sector, &views.provider, config),
        }
    });

    PipelineOutput {
        filters: filters.clone(),
        filter_description: filters.describe(dataset.filter_options()),
        total_services: dataset.len(),
        sector_services: views.sector.len(),
        provider_services: views.provider.len(),
        provider_options: views.provider_options.clone(),
        sector_overview: sector.sector_overview(),
        benchmarks: compute_benchmarks(&views.sector, &config.benchmark_measures),
        outliers: detect_outliers(&views.sector, config),
        provider,
    }
}

/// Holds the loaded dataset between interactions
#[derive(Debug, Default)]
pub struct Session {
    config: StarRatingsConfig,
    dataset: Option<StarRatingsDataset>,
    last_error: Option<String>,
}

impl Session {
    pub fn new(config: StarRatingsConfig) -> Self {
        Self {
            config,
            dataset: None,
            last_error: None,
        }
    }

    pub fn config(&self) -> &StarRatingsConfig {
        &self.config
    }

    /// Load a source file, replacing any previous dataset.
    ///
    /// On failure the session holds no data and remembers the error.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<&StarRatingsDataset> {
        let path = path.as_ref();
        let result = StarRatingsDatasetBuilder::new()
            .config(self.config.clone())
            .source(path)
            .build();
        self.install(result)
    }

    /// Load from sheets already in memory
    pub fn load_tables(&mut self, tables: SourceTables) -> Result<&StarRatingsDataset> {
        let result = StarRatingsDataset::from_tables(tables, &self.config);
        self.install(result)
    }

    fn install(&mut self, result: Result<StarRatingsDataset>) -> Result<&StarRatingsDataset> {
        self.dataset = None;
        match result {
            Ok(dataset) => {
                info!(services = dataset.len(), "dataset loaded");
                self.last_error = None;
                let dataset: &StarRatingsDataset = self.dataset.insert(dataset);
                Ok(dataset)
            }
            Err(e) => {
                warn!(error = %e, "load failed; session has no data");
                self.last_error = Some(e.user_message());
                Err(e)
            }
        }
    }

    /// Discard the loaded dataset
    pub fn clear(&mut self) {
        self.dataset = None;
        self.last_error = None;
    }

    pub fn dataset(&self) -> Option<&StarRatingsDataset> {
        self.dataset.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.dataset.is_some()
    }

    /// Message of the most recent failed load
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Recompute every view for `filters`.
    ///
    /// Without a dataset the output is the empty result: no services, all
    /// benchmarks missing, analyses reporting insufficient data.
    pub fn recompute(&self, filters: &FilterState) -> PipelineOutput {
        match &self.dataset {
            Some(dataset) => recompute(dataset, filters, &self.config),
            None => recompute(&StarRatingsDataset::default(), filters, &self.config),
        }
    }
}
