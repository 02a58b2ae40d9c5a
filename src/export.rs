/*!
 * Export functionality for pipeline results
 *
 * JSON writes the full `PipelineOutput`; CSV writes one flat table
 * (outliers by default, or sector benchmarks, or the provider comparison).
 */

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::analysis::Analysis;
use crate::pipeline::PipelineOutput;
use crate::{ExportFormat, Result, StarRatingsError};

/// Trait for implementing report exporters
pub trait ReportExporter {
    /// Export one pipeline output
    fn export(&self, output: &PipelineOutput, path: &Path) -> Result<()>;

    /// Get the export format
    fn format(&self) -> ExportFormat;
}

/// JSON exporter
pub struct JsonExporter {
    /// Whether to pretty-print the JSON
    pub pretty_print: bool,
}

impl Default for JsonExporter {
    fn default() -> Self {
        Self { pretty_print: true }
    }
}

impl JsonExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pretty_print(mut self, pretty: bool) -> Self {
        self.pretty_print = pretty;
        self
    }
}

impl ReportExporter for JsonExporter {
    fn export(&self, output: &PipelineOutput, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        if self.pretty_print {
            serde_json::to_writer_pretty(&mut writer, output)?;
        } else {
            serde_json::to_writer(&mut writer, output)?;
        }
        writer.flush()?;

        info!(path = %path.display(), "exported JSON report");
        Ok(())
    }

    fn format(&self) -> ExportFormat {
        ExportFormat::Json
    }
}

/// Which table a CSV export writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CsvTable {
    #[default]
    Outliers,
    Benchmarks,
    Comparison,
}

/// CSV exporter
pub struct CsvExporter {
    pub table: CsvTable,
    /// Field delimiter
    pub delimiter: u8,
}

impl Default for CsvExporter {
    fn default() -> Self {
        Self {
            table: CsvTable::default(),
            delimiter: b',',
        }
    }
}

impl CsvExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: CsvTable) -> Self {
        self.table = table;
        self
    }

    /// Set custom delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    fn writer(&self, path: &Path) -> Result<csv::Writer<File>> {
        Ok(csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_path(path)?)
    }

    fn write_outliers(&self, output: &PipelineOutput, path: &Path) -> Result<usize> {
        let report = match &output.outliers {
            Analysis::Computed(report) => report,
            Analysis::InsufficientData(shortfall) => {
                return Err(StarRatingsError::Export {
                    message: format!("Outlier detection did not run. {}", shortfall),
                    format: ExportFormat::Csv,
                    suggestion: Some("Widen the state, size or MMM filters".to_string()),
                })
            }
        };

        let mut writer = self.writer(path)?;
        writer.write_record(["Provider Name", "Service Name", "Metric", "Value", "Reason", "IQR Range"])?;
        for outlier in &report.outliers {
            writer.write_record([
                outlier.provider_name.clone(),
                outlier.service_name.clone(),
                outlier.metric.clone(),
                format!("{:.2}", outlier.value),
                outlier.reason_text(),
                outlier.iqr_range(),
            ])?;
        }
        writer.flush()?;
        Ok(report.outliers.len())
    }

    fn write_benchmarks(&self, output: &PipelineOutput, path: &Path) -> Result<usize> {
        let mut writer = self.writer(path)?;
        writer.write_record(["Measure", "Sector Median", "Sector 75th pct", "Sector 90th pct", "Observations"])?;
        for benchmark in &output.benchmarks {
            writer.write_record([
                benchmark.measure.clone(),
                format_optional(benchmark.median),
                format_optional(benchmark.p75),
                format_optional(benchmark.p90),
                benchmark.observations.to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(output.benchmarks.len())
    }

    fn write_comparison(&self, output: &PipelineOutput, path: &Path) -> Result<usize> {
        let comparison = output
            .provider
            .as_ref()
            .and_then(|p| p.comparison.computed())
            .ok_or_else(|| StarRatingsError::Export {
                message: "No provider comparison available".to_string(),
                format: ExportFormat::Csv,
                suggestion: Some("Select a provider that has peers in the filtered sector".to_string()),
            })?;

        let mut writer = self.writer(path)?;
        writer.write_record([
            "Quality Measure",
            "Sector Median",
            "Sector 75th pct",
            "Sector 90th pct",
            "Provider Value",
            "Tier",
        ])?;
        for row in comparison {
            writer.write_record([
                row.measure.clone(),
                format_optional(row.median),
                format_optional(row.p75),
                format_optional(row.p90),
                format!("{:.1}", row.provider_value),
                row.tier.map(|t| t.label().to_string()).unwrap_or_default(),
            ])?;
        }
        writer.flush()?;
        Ok(comparison.len())
    }
}

fn format_optional(value: Option<f64>) -> String {
    value.map(|v| format!("{:.1}", v)).unwrap_or_else(|| "N/A".to_string())
}

impl ReportExporter for CsvExporter {
    fn export(&self, output: &PipelineOutput, path: &Path) -> Result<()> {
        let rows = match self.table {
            CsvTable::Outliers => self.write_outliers(output, path)?,
            CsvTable::Benchmarks => self.write_benchmarks(output, path)?,
            CsvTable::Comparison => self.write_comparison(output, path)?,
        };
        info!(path = %path.display(), rows, table = ?self.table, "exported CSV report");
        Ok(())
    }

    fn format(&self) -> ExportFormat {
        ExportFormat::Csv
    }
}

/// Convenience methods for exporting pipeline results
impl PipelineOutput {
    /// Export to JSON
    pub fn export_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        JsonExporter::new().export(self, path.as_ref())
    }

    /// Export the outlier table to CSV
    pub fn export_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        CsvExporter::new().export(self, path.as_ref())
    }

    /// Export in the given format
    pub fn export<P: AsRef<Path>>(&self, path: P, format: ExportFormat) -> Result<()> {
        let exporter: Box<dyn ReportExporter> = match format {
            ExportFormat::Json => Box::new(JsonExporter::new()),
            ExportFormat::Csv => Box::new(CsvExporter::new()),
        };
        exporter.export(self, path.as_ref())
    }
}
