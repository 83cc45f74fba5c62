//! Output feature collections and their atomic writing.

use std::io::{BufWriter, Write};
use std::path::Path;

use climate_common::month_field;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use serde_json::Value;
use tracing::info;

use crate::error::{FeatureError, Result};
use crate::features::{FeatureSchema, Region, Settlement};
use crate::regions::RegionStats;
use crate::settlements::SettlementSample;

/// `regions_{prefix}_{year}.geojson`
pub fn regions_file_name(prefix: &str, year: i32) -> String {
    format!("regions_{}_{}.geojson", prefix, year)
}

/// `villes_{prefix}_{year}.geojson`
pub fn settlements_file_name(prefix: &str, year: i32) -> String {
    format!("villes_{}_{}.geojson", prefix, year)
}

fn insert_months(properties: &mut JsonObject, prefix: &str, months: &[Option<f64>]) {
    for (m, value) in months.iter().enumerate() {
        let value = value.map(Value::from).unwrap_or(Value::Null);
        properties.insert(month_field(prefix, m as u32 + 1), value);
    }
}

/// Region features with their original properties, the identifying keys
/// and one field per month.
pub fn region_collection(
    regions: &[Region],
    stats: &[RegionStats],
    schema: &FeatureSchema,
    prefix: &str,
) -> FeatureCollection {
    let features = regions
        .iter()
        .zip(stats)
        .map(|(region, stats)| {
            let mut feature = region.feature.clone();
            let mut properties = feature.properties.take().unwrap_or_default();
            properties.insert(schema.id_key.clone(), region.id.clone());
            properties.insert(schema.name_key.clone(), region.name.clone());
            insert_months(&mut properties, prefix, &stats.months);
            feature.properties = Some(properties);
            feature.bbox = None;
            feature
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Settlement point features carrying the identifying keys and one field per month.
pub fn settlement_collection(
    settlements: &[Settlement],
    samples: &[SettlementSample],
    schema: &FeatureSchema,
    prefix: &str,
) -> FeatureCollection {
    let features = settlements
        .iter()
        .zip(samples)
        .map(|(settlement, sample)| {
            let mut properties = JsonObject::new();
            properties.insert(schema.id_key.clone(), settlement.id.clone());
            properties.insert(schema.name_key.clone(), settlement.name.clone());
            insert_months(&mut properties, prefix, &sample.months);

            Feature {
                bbox: None,
                geometry: Some(Geometry::new(geojson::Value::Point(vec![
                    settlement.lon,
                    settlement.lat,
                ]))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Write a collection through a temporary file in the target directory,
/// renamed into place once complete.
pub fn write_collection(path: &Path, collection: &FeatureCollection) -> Result<()> {
    let io_err = |source| FeatureError::Io {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(io_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    {
        let mut writer = BufWriter::new(&mut tmp);
        serde_json::to_writer(&mut writer, collection).map_err(|source| {
            FeatureError::Serialize {
                path: path.to_path_buf(),
                source,
            }
        })?;
        writer.flush().map_err(io_err)?;
    }
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    info!(
        file = %path.display(),
        features = collection.features.len(),
        "Wrote feature collection"
    );
    Ok(())
}
