/*!
 * Unified dataset API for Star Ratings data
 *
 * Provides a builder for loading a quarterly extract and a read-only dataset
 * that hands out filtered views and queries.
 */

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::StarRatingsConfig;
use crate::data_types::*;
use crate::filter::{FilterOptions, FilterState, FilteredViews, ServiceQuery};
use crate::normalize::SchemaNormalizer;
use crate::reader::{RawTable, SourceTables, StarRatingsReader};
use crate::{Result, StarRatingsError};

/// Builder for loading a Star Ratings dataset
///
/// # Example
/// ```no_run
/// # use star_ratings::dataset::StarRatingsDatasetBuilder;
/// let dataset = StarRatingsDatasetBuilder::new()
///     .source("star-ratings-quarterly-data-extract-february-2025.xlsx")
///     .show_progress(false)
///     .build()?;
/// println!("{} services", dataset.len());
/// # Ok::<(), star_ratings::StarRatingsError>(())
/// ```
pub struct StarRatingsDatasetBuilder {
    source_path: Option<PathBuf>,
    config: StarRatingsConfig,
}

impl Default for StarRatingsDatasetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StarRatingsDatasetBuilder {
    /// Create a new dataset builder with the default configuration
    pub fn new() -> Self {
        Self {
            source_path: None,
            config: StarRatingsConfig::default(),
        }
    }

    /// Set the workbook (or CSV export) to load
    pub fn source<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.source_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Use a specific configuration
    pub fn config(mut self, config: StarRatingsConfig) -> Self {
        self.config = config;
        self
    }

    /// Enable or disable the loading spinner
    pub fn show_progress(mut self, show: bool) -> Self {
        self.config.show_progress = show;
        self
    }

    /// Build the dataset, reading and normalizing the source file
    pub fn build(self) -> Result<StarRatingsDataset> {
        let path = self.source_path.ok_or_else(|| StarRatingsError::Custom {
            message: "Source file path not specified".to_string(),
            suggestion: Some("Use .source() to specify the quarterly extract workbook".to_string()),
        })?;

        let tables = StarRatingsReader::from_config(&self.config).load(&path)?;
        let mut dataset = StarRatingsDataset::from_tables(tables, &self.config)?;
        dataset.source = Some(path);
        Ok(dataset)
    }
}

/// Canonical, read-only Star Ratings dataset
#[derive(Debug, Clone, Default)]
pub struct StarRatingsDataset {
    records: Vec<ServiceRecord>,
    columns: BTreeSet<String>,
    star_ratings: Option<RawTable>,
    options: FilterOptions,
    source: Option<PathBuf>,
}

impl StarRatingsDataset {
    /// Normalize loaded sheets into a dataset
    pub fn from_tables(tables: SourceTables, config: &StarRatingsConfig) -> Result<Self> {
        let normalized = SchemaNormalizer::new(config).normalize(&tables.detailed)?;
        info!(
            services = normalized.records.len(),
            columns = normalized.columns.len(),
            "normalized Star Ratings data"
        );

        let mut dataset = Self::from_records(normalized.records);
        dataset.columns = normalized.columns;
        dataset.star_ratings = tables.star_ratings;
        Ok(dataset)
    }

    /// Build a dataset from already-normalized records
    pub fn from_records(records: Vec<ServiceRecord>) -> Self {
        let options = FilterOptions::from_records(&records);
        Self {
            records,
            options,
            ..Default::default()
        }
    }

    /// Load with the default configuration
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        StarRatingsDatasetBuilder::new().source(path).show_progress(false).build()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ServiceRecord] {
        &self.records
    }

    /// Column names available after normalization
    pub fn columns(&self) -> &BTreeSet<String> {
        &self.columns
    }

    /// The summary "Star Ratings" sheet, untouched, if the source had one
    pub fn star_ratings_sheet(&self) -> Option<&RawTable> {
        self.star_ratings.as_ref()
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Region, size and remoteness options
    pub fn filter_options(&self) -> &FilterOptions {
        &self.options
    }

    /// Sector and provider views for a filter state
    pub fn views(&self, filters: &FilterState) -> FilteredViews<'_> {
        filters.apply(&self.records)
    }

    /// Start a query over all records
    pub fn query(&self) -> ServiceQuery<'_> {
        ServiceQuery::new(&self.records)
    }

    /// Services of one provider, across the whole dataset
    pub fn services_for_provider(&self, provider_name: &str) -> Vec<&ServiceRecord> {
        self.records
            .iter()
            .filter(|r| r.provider_name == provider_name)
            .collect()
    }

    /// Get dataset statistics
    pub fn statistics(&self) -> DatasetStatistics {
        DatasetStatistics::from_dataset(self)
    }
}

/// Dataset statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetStatistics {
    pub total_services: usize,
    pub distinct_providers: usize,
    pub states_represented: usize,
    pub mmm_codes_represented: usize,
    pub services_with_overall_rating: usize,
    pub services_with_compliance_decisions: usize,
    pub has_star_ratings_sheet: bool,
}

impl DatasetStatistics {
    /// Calculate statistics from a dataset
    pub fn from_dataset(dataset: &StarRatingsDataset) -> Self {
        let mut providers = HashSet::new();
        let mut stats = Self {
            total_services: dataset.len(),
            distinct_providers: 0,
            states_represented: dataset.options.regions.len(),
            mmm_codes_represented: dataset.options.mmm_codes.len(),
            services_with_overall_rating: 0,
            services_with_compliance_decisions: 0,
            has_star_ratings_sheet: dataset.star_ratings.is_some(),
        };

        for record in &dataset.records {
            providers.insert(record.provider_name.as_str());
            if record.ratings.overall.is_some() {
                stats.services_with_overall_rating += 1;
            }
            if record.has_compliance_decision() {
                stats.services_with_compliance_decisions += 1;
            }
        }

        stats.distinct_providers = providers.len();
        stats
    }
}

impl fmt::Display for DatasetStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pct = |n: usize| {
            if self.total_services == 0 {
                0.0
            } else {
                n as f64 / self.total_services as f64 * 100.0
            }
        };

        writeln!(f, "=== Star Ratings Dataset Statistics ===")?;
        writeln!(f, "Total Services: {}", self.total_services)?;
        writeln!(f, "Distinct Providers: {}", self.distinct_providers)?;
        writeln!(f, "States/Territories Represented: {}", self.states_represented)?;
        writeln!(f, "MMM Codes Represented: {}", self.mmm_codes_represented)?;
        writeln!(
            f,
            "Services with Overall Star Rating: {} ({:.1}%)",
            self.services_with_overall_rating,
            pct(self.services_with_overall_rating)
        )?;
        writeln!(
            f,
            "Services with Compliance Decisions: {} ({:.1}%)",
            self.services_with_compliance_decisions,
            pct(self.services_with_compliance_decisions)
        )?;
        write!(
            f,
            "Star Ratings sheet: {}",
            if self.has_star_ratings_sheet { "present" } else { "absent" }
        )
    }
}
