//! Configuration for the aggregation service.
//!
//! Loaded from a YAML file with environment variable substitution using
//! `${VAR}` / `${VAR:-default}` syntax, or built from defaults plus
//! `CLIMATE_*` environment overrides when no file is given.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use climate_common::VariableSpec;
use feature_stats::{FeatureSchema, OutOfExtentPolicy};
use grid_processor::{LoaderConfig, DEFAULT_FILE_PATTERN};
use netcdf_parser::SchemaAliases;
use serde::{Deserialize, Serialize};

/// Everything one aggregation run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Directory holding `era5_{category}_{year}_*.nc` files
    pub data_dir: PathBuf,
    /// Directory receiving the output collections
    pub output_dir: PathBuf,
    /// Region boundary FeatureCollection
    pub regions_path: PathBuf,
    /// Settlement FeatureCollection; the settlement step is skipped without it
    pub settlements_path: Option<PathBuf>,
    /// Calendar year being processed
    pub year: i32,
    /// Input file name pattern
    pub file_pattern: String,
    /// Rotate 0..360 longitude axes into -180..180
    pub normalize_longitude: bool,
    /// Coordinate aliases
    pub schema: SchemaAliases,
    /// Variables by key, processed in key order
    pub variables: BTreeMap<String, VariableSpec>,
    /// Region identifier fields
    pub regions: FeatureSchema,
    /// Settlement identifier fields
    pub settlements: FeatureSchema,
    /// Settlements outside the grid coverage
    pub out_of_extent: OutOfExtentPolicy,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        let mut variables = BTreeMap::new();
        variables.insert("precipitation".to_string(), VariableSpec::precipitation());
        variables.insert("temperature".to_string(), VariableSpec::temperature());

        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("data/vector"),
            regions_path: PathBuf::from("data/vector/region12Maroc.json"),
            settlements_path: Some(PathBuf::from("data/vector/villes_maroc.geojson")),
            year: 2024,
            file_pattern: DEFAULT_FILE_PATTERN.to_string(),
            normalize_longitude: true,
            schema: SchemaAliases::default(),
            variables,
            regions: FeatureSchema::regions(),
            settlements: FeatureSchema::settlements(),
            out_of_extent: OutOfExtentPolicy::default(),
        }
    }
}

impl AggregatorConfig {
    /// Defaults with `CLIMATE_*` environment overrides.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("CLIMATE_DATA_DIR") {
            config.data_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("CLIMATE_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("CLIMATE_REGIONS") {
            config.regions_path = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("CLIMATE_SETTLEMENTS") {
            config.settlements_path = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }

        if let Ok(val) = std::env::var("CLIMATE_YEAR") {
            config.year = val
                .parse()
                .with_context(|| format!("CLIMATE_YEAR is not a year: {}", val))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Input directory for a variable: `{data_dir}/{category}`.
    pub fn loader_config(&self, spec: &VariableSpec) -> LoaderConfig {
        LoaderConfig {
            data_dir: self.data_dir.join(&spec.category),
            file_pattern: self.file_pattern.clone(),
            schema: self.schema.clone(),
            normalize_longitude: self.normalize_longitude,
        }
    }

    /// Look up a configured variable.
    pub fn variable(&self, key: &str) -> Result<&VariableSpec> {
        self.variables.get(key).with_context(|| {
            format!(
                "Unknown variable '{}', configured: {}",
                key,
                self.variables.keys().cloned().collect::<Vec<_>>().join(", ")
            )
        })
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.variables.is_empty(), "At least one variable must be configured");
        anyhow::ensure!(
            (1..=9999).contains(&self.year),
            "Year must be between 1 and 9999, got {}",
            self.year
        );

        let mut prefixes = HashSet::new();
        for (key, spec) in &self.variables {
            anyhow::ensure!(
                !spec.candidates.is_empty(),
                "Variable '{}' must list at least one candidate name",
                key
            );
            anyhow::ensure!(
                !spec.category.is_empty(),
                "Variable '{}' must have a category",
                key
            );
            anyhow::ensure!(
                !spec.field_prefix.is_empty(),
                "Variable '{}' must have a field prefix",
                key
            );
            anyhow::ensure!(
                prefixes.insert(spec.field_prefix.as_str()),
                "Field prefix '{}' is used by more than one variable",
                spec.field_prefix
            );
            anyhow::ensure!(
                spec.conversion.scale != 0.0 && spec.conversion.scale.is_finite(),
                "Variable '{}' has an invalid conversion scale {}",
                key,
                spec.conversion.scale
            );
        }

        for (what, schema) in [("regions", &self.regions), ("settlements", &self.settlements)] {
            anyhow::ensure!(
                !schema.id_key.is_empty() && !schema.name_key.is_empty(),
                "{} output keys cannot be empty",
                what
            );
        }

        self.loader_config(&VariableSpec::precipitation())
            .validate()
            .map_err(anyhow::Error::from)?;

        Ok(())
    }
}

/// Load a configuration file with environment variable substitution.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AggregatorConfig> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read config from {:?}", path.as_ref()))?;

    let expanded = expand_env_vars(&content)?;

    let config: AggregatorConfig = serde_yaml::from_str(&expanded)
        .with_context(|| format!("Failed to parse config from {:?}", path.as_ref()))?;

    config.validate()?;

    Ok(config)
}

/// Expand `${VAR}` and `${VAR:-default}` references.
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::new();
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'

            let mut var_expr = String::new();
            let mut brace_count = 1;

            while brace_count > 0 {
                match chars.next() {
                    Some('{') => {
                        brace_count += 1;
                        var_expr.push('{');
                    }
                    Some('}') => {
                        brace_count -= 1;
                        if brace_count > 0 {
                            var_expr.push('}');
                        }
                    }
                    Some(c) => var_expr.push(c),
                    None => anyhow::bail!("Unclosed variable substitution: ${{{}", var_expr),
                }
            }

            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

/// Resolve variable expression (supports VAR and VAR:-default syntax)
fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim()).with_context(|| format!("Environment variable {} not set", expr))
    }
}
