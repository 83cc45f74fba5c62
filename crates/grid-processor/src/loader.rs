//! Discovery and loading of the per-month input files of one variable/year.

use std::path::PathBuf;

use climate_common::VariableSpec;
use netcdf_parser::read_grid_file;
use tracing::{debug, info};

use crate::config::LoaderConfig;
use crate::error::{GridProcessorError, Result};
use crate::series::GriddedTimeSeries;

/// Loads every matching input file and concatenates them along time.
#[derive(Debug, Clone)]
pub struct GridLoader {
    config: LoaderConfig,
}

impl GridLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// List the input files for a variable/year, sorted by file name.
    ///
    /// Only the top level of the data directory is scanned. Finding nothing
    /// is fatal and the error names the expected pattern.
    pub fn discover(&self, spec: &VariableSpec, year: i32) -> Result<Vec<PathBuf>> {
        let dir = &self.config.data_dir;
        let pattern = self.config.file_name_pattern(&spec.category, year);

        if !dir.is_dir() {
            return Err(GridProcessorError::missing_input(
                self.config.display_pattern(&spec.category, year),
            ));
        }

        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| GridProcessorError::Discovery {
                dir: dir.clone(),
                message: e.to_string(),
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            if wildcard_match(&pattern, &name) {
                debug!(file = %entry.path().display(), "Matched input file");
                files.push(entry.into_path());
            }
        }

        if files.is_empty() {
            return Err(GridProcessorError::missing_input(
                self.config.display_pattern(&spec.category, year),
            ));
        }

        Ok(files)
    }

    /// Load one variable for one year into a single time series.
    ///
    /// Every file is opened on its own and normalized; axes are checked
    /// against the first file before anything is concatenated.
    pub fn load(&self, spec: &VariableSpec, year: i32) -> Result<GriddedTimeSeries> {
        let paths = self.discover(spec, year)?;
        info!(
            category = %spec.category,
            year,
            files = paths.len(),
            "Loading input files"
        );

        let mut files = Vec::with_capacity(paths.len());
        for path in &paths {
            info!(file = %path.display(), "Opening input file");
            files.push(read_grid_file(path, spec, &self.config.schema)?);
        }

        let mut series = GriddedTimeSeries::concat(files, year)?;

        if self.config.normalize_longitude && series.normalize_longitudes() {
            info!(category = %spec.category, "Rotated longitude axis into -180..180");
        }

        info!(
            category = %spec.category,
            variable = %series.variable,
            instants = series.times.len(),
            latitudes = series.axes.ny(),
            longitudes = series.axes.nx(),
            "Loaded gridded time series"
        );

        Ok(series)
    }
}

/// Match a file name against a pattern where `*` is any run of characters
/// and `?` is exactly one character.
pub fn wildcard_match(pattern: &str, name: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let n: Vec<char> = name.chars().collect();

    let (mut pi, mut ni) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ni < n.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == n[ni]) {
            pi += 1;
            ni += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ni));
            pi += 1;
        } else if let Some((star_pi, star_ni)) = star {
            pi = star_pi + 1;
            ni = star_ni + 1;
            star = Some((star_pi, star_ni + 1));
        } else {
            return false;
        }
    }

    p[pi..].iter().all(|c| *c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_match() {
        let pattern = "era5_precipitation_2024_*.nc";
        assert!(wildcard_match(pattern, "era5_precipitation_2024_01.nc"));
        assert!(wildcard_match(pattern, "era5_precipitation_2024_q1_part2.nc"));
        assert!(wildcard_match(pattern, "era5_precipitation_2024_.nc"));
        assert!(!wildcard_match(pattern, "era5_precipitation_2023_01.nc"));
        assert!(!wildcard_match(pattern, "era5_temperature_2024_01.nc"));
        assert!(!wildcard_match(pattern, "era5_precipitation_2024_01.nc.tmp"));
    }

    #[test]
    fn test_wildcard_question_mark() {
        assert!(wildcard_match("file_??.nc", "file_03.nc"));
        assert!(!wildcard_match("file_??.nc", "file_3.nc"));
        assert!(wildcard_match("*", ""));
        assert!(!wildcard_match("?", ""));
    }

    #[test]
    fn test_discover_missing_directory() {
        let loader = GridLoader::new(LoaderConfig {
            data_dir: PathBuf::from("/nonexistent/era5"),
            ..Default::default()
        });
        let err = loader
            .discover(&VariableSpec::precipitation(), 2024)
            .unwrap_err();
        assert!(matches!(err, GridProcessorError::MissingInput { .. }));
        assert!(err
            .to_string()
            .contains("era5_precipitation_2024_*.nc"));
    }
}
