//! One aggregation run: load, reduce, aggregate and write each variable.
//!
//! All variables are computed before anything is written, so a fatal error
//! in any of them leaves the output directory untouched.

use std::path::PathBuf;

use anyhow::{Context, Result};
use climate_common::MONTHS_PER_YEAR;
use feature_stats::{
    aggregate_regions, load_regions, load_settlements, region_collection, regions_file_name,
    sample_settlements, settlement_collection, settlements_file_name, write_collection, Region,
    Settlement,
};
use geojson::FeatureCollection;
use grid_processor::{reduce_monthly, GridLoader};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::AggregatorConfig;

/// What a run produced for one variable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Configured variable key
    pub variable: String,
    /// Data variable name found in the input files
    pub source_variable: String,
    pub files: usize,
    pub instants: usize,
    /// Regions with a value, per month
    pub regions_with_data: Vec<usize>,
    /// Settlements sampled, if the settlement step ran
    pub settlements_sampled: Option<usize>,
    /// Settlements outside the grid coverage
    pub settlements_clamped: usize,
    pub outputs: Vec<PathBuf>,
}

/// Output collections of one variable, not yet written.
#[derive(Debug, Clone)]
pub struct VariableOutput {
    pub summary: RunSummary,
    pub collections: Vec<(PathBuf, FeatureCollection)>,
}

/// Aggregation pipeline over a configuration.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: AggregatorConfig,
}

impl Pipeline {
    pub fn new(config: AggregatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Run the given variables (all configured ones when empty) and write
    /// their outputs.
    pub fn run(&self, variables: &[String]) -> Result<Vec<RunSummary>> {
        let keys: Vec<String> = if variables.is_empty() {
            self.config.variables.keys().cloned().collect()
        } else {
            variables.to_vec()
        };

        let regions = load_regions(&self.config.regions_path, &self.config.regions)
            .with_context(|| {
                format!("Failed to load regions from {:?}", self.config.regions_path)
            })?;
        let settlements = self.load_settlements()?;

        let mut outputs = Vec::with_capacity(keys.len());
        for key in &keys {
            outputs.push(self.compute(key, &regions, settlements.as_deref())?);
        }

        for output in &outputs {
            for (path, collection) in &output.collections {
                write_collection(path, collection)
                    .with_context(|| format!("Failed to write {:?}", path))?;
            }
        }

        Ok(outputs.into_iter().map(|o| o.summary).collect())
    }

    /// Settlements are optional: no configured path or a missing file skips them.
    fn load_settlements(&self) -> Result<Option<Vec<Settlement>>> {
        let Some(path) = self.config.settlements_path.as_ref() else {
            info!("No settlement input configured, skipping settlements");
            return Ok(None);
        };

        if !path.exists() {
            warn!(file = %path.display(), "Settlement input not found, skipping settlements");
            return Ok(None);
        }

        load_settlements(path, &self.config.settlements)
            .map(Some)
            .with_context(|| format!("Failed to load settlements from {:?}", path))
    }

    /// Compute the output collections of one variable without writing them.
    pub fn compute(
        &self,
        key: &str,
        regions: &[Region],
        settlements: Option<&[Settlement]>,
    ) -> Result<VariableOutput> {
        let spec = self.config.variable(key)?;
        let year = self.config.year;

        info!(variable = %key, year, reduction = ?spec.reduction, units = %spec.units, "Processing variable");

        let loader = GridLoader::new(self.config.loader_config(spec));
        let series = loader
            .load(spec, year)
            .with_context(|| format!("Failed to load {} grids for {}", key, year))?;
        let monthly = reduce_monthly(&series, spec);

        let (stats, samples) = rayon::join(
            || aggregate_regions(&monthly, regions),
            || {
                settlements
                    .map(|s| sample_settlements(&monthly, s, self.config.out_of_extent))
                    .transpose()
            },
        );
        let samples = samples.with_context(|| format!("Failed to sample settlements for {}", key))?;

        let prefix = spec.field_prefix.as_str();
        let mut collections = Vec::new();

        let region_path = self.config.output_dir.join(regions_file_name(prefix, year));
        collections.push((
            region_path,
            region_collection(regions, &stats, &self.config.regions, prefix),
        ));

        if let (Some(settlements), Some(samples)) = (settlements, samples.as_ref()) {
            let path = self.config.output_dir.join(settlements_file_name(prefix, year));
            collections.push((
                path,
                settlement_collection(settlements, samples, &self.config.settlements, prefix),
            ));
        }

        let regions_with_data = (0..MONTHS_PER_YEAR)
            .map(|m| stats.iter().filter(|s| s.months[m].is_some()).count())
            .collect();

        let summary = RunSummary {
            variable: key.to_string(),
            source_variable: series.variable.clone(),
            files: series.sources.len(),
            instants: series.times.len(),
            regions_with_data,
            settlements_sampled: samples.as_ref().map(|s| s.len()),
            settlements_clamped: samples
                .as_ref()
                .map(|s| s.iter().filter(|sample| sample.clamped).count())
                .unwrap_or(0),
            outputs: collections.iter().map(|(path, _)| path.clone()).collect(),
        };

        Ok(VariableOutput {
            summary,
            collections,
        })
    }
}
