//! Configuration for multi-file grid loading.

use std::path::PathBuf;

use netcdf_parser::SchemaAliases;
use serde::{Deserialize, Serialize};

use crate::error::{GridProcessorError, Result};

/// Default input file name pattern.
pub const DEFAULT_FILE_PATTERN: &str = "era5_{category}_{year}_*.nc";

/// Where input files live and how to read them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Directory holding the per-month input files.
    pub data_dir: PathBuf,

    /// File name pattern with `{category}` and `{year}` placeholders.
    /// `*` matches any run of characters, `?` a single character.
    pub file_pattern: String,

    /// Coordinate and dimension aliases.
    pub schema: SchemaAliases,

    /// Rotate 0..360 longitude axes into -180..180.
    pub normalize_longitude: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/era5"),
            file_pattern: DEFAULT_FILE_PATTERN.to_string(),
            schema: SchemaAliases::default(),
            normalize_longitude: true,
        }
    }
}

impl LoaderConfig {
    /// File name pattern with placeholders substituted.
    pub fn file_name_pattern(&self, category: &str, year: i32) -> String {
        self.file_pattern
            .replace("{category}", category)
            .replace("{year}", &year.to_string())
    }

    /// Full pattern including the data directory, as reported in errors.
    pub fn display_pattern(&self, category: &str, year: i32) -> String {
        self.data_dir
            .join(self.file_name_pattern(category, year))
            .display()
            .to_string()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.file_pattern.is_empty() {
            return Err(GridProcessorError::ConfigError(
                "file_pattern must not be empty".to_string(),
            ));
        }

        if self.file_pattern.contains('/') {
            return Err(GridProcessorError::ConfigError(format!(
                "file_pattern must be a file name, got {}",
                self.file_pattern
            )));
        }

        for (field, aliases) in [
            ("schema.time", &self.schema.time),
            ("schema.latitude", &self.schema.latitude),
            ("schema.longitude", &self.schema.longitude),
        ] {
            if aliases.is_empty() {
                return Err(GridProcessorError::ConfigError(format!(
                    "{} must list at least one name",
                    field
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoaderConfig::default();
        assert!(config.normalize_longitude);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_name_pattern() {
        let config = LoaderConfig::default();
        assert_eq!(
            config.file_name_pattern("precipitation", 2024),
            "era5_precipitation_2024_*.nc"
        );
    }

    #[test]
    fn test_invalid_config() {
        let mut config = LoaderConfig::default();
        config.schema.time.clear();
        assert!(config.validate().is_err());

        let config = LoaderConfig {
            file_pattern: "sub/era5_*.nc".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_yaml() {
        let config: LoaderConfig =
            serde_yaml::from_str("data_dir: /srv/era5\nnormalize_longitude: false\n").unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/era5"));
        assert!(!config.normalize_longitude);
        assert_eq!(config.file_pattern, DEFAULT_FILE_PATTERN);
    }
}
