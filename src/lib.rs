/*!
 * # Star Ratings Data Library
 *
 * Sector benchmarking and provider analysis over the quarterly Star Ratings
 * data extract for residential aged care services.
 *
 * ## Features
 *
 * - **Workbook loading**: reads the "Detailed data" and "Star Ratings" sheets
 *   (or a CSV export of the detailed sheet)
 * - **Schema normalization**: typed numerics, care minutes compliance,
 *   resident experience responses and compliance decisions
 * - **Filter cascade**: state, size and MMM filters define the sector, the
 *   provider selection narrows it further
 * - **Benchmarks**: sector median, 75th and 90th percentiles with a provider
 *   comparison
 * - **Percentile radar** and **IQR outlier detection** over quality measures
 * - **Export**: JSON reports and CSV tables
 *
 * ## Quick Start
 *
 * ```no_run
 * use star_ratings::prelude::*;
 *
 * # fn main() -> Result<()> {
 * let dataset = StarRatingsDataset::load("star-ratings-quarterly-data-extract.xlsx")?;
 *
 * let filters = FilterState::new()
 *     .with_region(Choice::exactly("NSW"))
 *     .with_sizes(Selection::only(["Small", "Medium"]))
 *     .with_provider(Choice::exactly("Example Care Ltd"));
 *
 * let output = recompute(&dataset, &filters, &StarRatingsConfig::default());
 * println!("{}: {} services", output.filter_description, output.sector_services);
 *
 * if let Analysis::Computed(report) = &output.outliers {
 *     for outlier in &report.outliers {
 *         println!("{}", outlier);
 *     }
 * }
 *
 * output.export_json("report.json")?;
 * # Ok(())
 * # }
 * ```
 *
 * ## Configuration
 *
 * ```no_run
 * # use star_ratings::prelude::*;
 * let config = ConfigBuilder::new()
 *     .radar_thresholds(75.0, 25.0)
 *     .outlier_minimums(10, 10)
 *     .show_progress(false)
 *     .build();
 * star_ratings::config::set_global_config(config);
 * ```
 *
 * Settings can also come from `STAR_RATINGS_*` environment variables or a
 * TOML file, see [`config::StarRatingsConfig`].
 */

// Re-export error types from root
pub use error::{ExportFormat, Result, StarRatingsError};

// Public modules
pub mod analysis;
pub mod analytics;
pub mod benchmark;
pub mod config;
pub mod data_types;
pub mod dataset;
pub mod error;
pub mod export;
pub mod filter;
pub mod normalize;
pub mod outliers;
pub mod pipeline;
pub mod radar;
pub mod reader;
pub mod schema;
pub mod stats;

/// Prelude module for convenient imports
///
/// ```
/// use star_ratings::prelude::*;
/// ```
pub mod prelude {
    pub use crate::analysis::{Analysis, InsufficientData, Population};
    pub use crate::analytics::StarRatingsAnalytics;
    pub use crate::benchmark::{BenchmarkComparison, BenchmarkResult, PerformanceTier};
    pub use crate::config::{ConfigBuilder, StarRatingsConfig};
    pub use crate::data_types::*;
    pub use crate::dataset::{DatasetStatistics, StarRatingsDataset, StarRatingsDatasetBuilder};
    pub use crate::error::{Result, StarRatingsError};
    pub use crate::export::{CsvExporter, CsvTable, JsonExporter, ReportExporter};
    pub use crate::filter::{Choice, FilterOptions, FilterState, FilteredViews, Selection};
    pub use crate::outliers::{Direction, OutlierRecord, OutlierReport, OutlierRule};
    pub use crate::pipeline::{recompute, PipelineOutput, Session};
    pub use crate::radar::{RadarChart, RadarScore, RadarSignal};
    pub use crate::reader::StarRatingsReader;
    pub use crate::ExportFormat;
}

/// Star Ratings data constants
pub mod constants {
    /// Sheet holding one row per service
    pub const DETAILED_SHEET: &str = "Detailed data";

    /// Summary sheet, kept as loaded
    pub const STAR_RATINGS_SHEET: &str = "Star Ratings";

    /// Label for missing categorical values
    pub const UNKNOWN_LABEL: &str = "Unknown";

    /// Percentile rank at or above which a measure is a potential concern
    pub const RADAR_CONCERN_PERCENTILE: f64 = 80.0;

    /// Percentile rank at or below which a measure is a potential strength
    pub const RADAR_STRENGTH_PERCENTILE: f64 = 20.0;

    /// Sector services needed before radar scoring runs
    pub const RADAR_MIN_PEERS: usize = 3;

    /// Sector services needed before outlier detection runs
    pub const OUTLIER_MIN_SERVICES: usize = 5;

    /// Observed values a metric needs before its outliers are checked
    pub const OUTLIER_MIN_VALUES: usize = 5;

    /// Tukey fence multiplier
    pub const IQR_MULTIPLIER: f64 = 1.5;
}
