//! Reading region and settlement feature collections.
//!
//! Collections are converted to geographic longitude/latitude on load when
//! they declare a Web Mercator `crs` member. Geometry of regions is kept as a
//! `geo` multipolygon for membership tests, alongside the original feature
//! so its properties survive into the output.

use std::collections::HashSet;
use std::path::Path;

use climate_common::{BoundingBox, CrsCode};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use geojson::{Feature, FeatureCollection, GeoJson};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{FeatureError, Result};

/// Which input properties identify a feature and which output keys carry them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    /// Input property holding the identifier
    pub id_field: String,
    /// Input property holding the display name
    pub name_field: String,
    /// Output key for the identifier
    pub id_key: String,
    /// Output key for the display name
    pub name_key: String,
}

impl FeatureSchema {
    /// Administrative boundaries: `id`/`name` -> `region_id`/`nom_region`.
    pub fn regions() -> Self {
        Self {
            id_field: "id".to_string(),
            name_field: "name".to_string(),
            id_key: "region_id".to_string(),
            name_key: "nom_region".to_string(),
        }
    }

    /// Settlements: `id_ville`/`nom_ville` in and out.
    pub fn settlements() -> Self {
        Self {
            id_field: "id_ville".to_string(),
            name_field: "nom_ville".to_string(),
            id_key: "id_ville".to_string(),
            name_key: "nom_ville".to_string(),
        }
    }
}

/// An administrative region.
#[derive(Debug, Clone)]
pub struct Region {
    pub id: Value,
    pub name: Value,
    /// Boundary in longitude/latitude
    pub geometry: MultiPolygon<f64>,
    pub bbox: BoundingBox,
    /// Source feature, geometry already in longitude/latitude
    pub feature: Feature,
}

impl Region {
    pub fn key(&self) -> String {
        value_key(&self.id)
    }
}

/// A named settlement point.
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub id: Value,
    pub name: Value,
    pub lon: f64,
    pub lat: f64,
}

impl Settlement {
    pub fn key(&self) -> String {
        value_key(&self.id)
    }
}

/// String form of a property value: strings unquoted, everything else as JSON.
pub fn value_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Read a FeatureCollection and convert it to longitude/latitude.
///
/// The legacy `crs` member is consumed; no declaration means WGS84.
pub fn read_collection(path: &Path) -> Result<FeatureCollection> {
    let text = std::fs::read_to_string(path).map_err(|source| FeatureError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let geojson: GeoJson = text.parse().map_err(|e: geojson::Error| FeatureError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        GeoJson::Feature(_) | GeoJson::Geometry(_) => {
            return Err(FeatureError::Parse {
                path: path.to_path_buf(),
                message: "expected a FeatureCollection".to_string(),
            })
        }
    };

    let crs = declared_crs(path, &collection)?;
    if !crs.is_geographic() {
        info!(file = %path.display(), crs = %crs, "Reprojecting features to EPSG:4326");
        for feature in &mut collection.features {
            feature.bbox = None;
            if let Some(geometry) = feature.geometry.as_mut() {
                reproject_value(&mut geometry.value, crs);
            }
        }
        collection.bbox = None;
    }

    if let Some(members) = collection.foreign_members.as_mut() {
        members.remove("crs");
    }

    Ok(collection)
}

fn declared_crs(path: &Path, collection: &FeatureCollection) -> Result<CrsCode> {
    let name = collection
        .foreign_members
        .as_ref()
        .and_then(|members| members.get("crs"))
        .and_then(|crs| crs.get("properties"))
        .and_then(|props| props.get("name"))
        .and_then(Value::as_str);

    match name {
        None => Ok(CrsCode::Epsg4326),
        Some(name) => CrsCode::from_name(name).map_err(|_| FeatureError::UnsupportedCrs {
            path: path.to_path_buf(),
            name: name.to_string(),
        }),
    }
}

fn reproject_value(value: &mut geojson::Value, crs: CrsCode) {
    use geojson::Value as G;

    let convert = |position: &mut Vec<f64>| {
        if let [x, y, ..] = position.as_mut_slice() {
            let (lon, lat) = crs.to_geographic(*x, *y);
            *x = lon;
            *y = lat;
        }
    };

    match value {
        G::Point(p) => convert(p),
        G::MultiPoint(ps) | G::LineString(ps) => ps.iter_mut().for_each(convert),
        G::MultiLineString(lines) | G::Polygon(lines) => {
            lines.iter_mut().flatten().for_each(convert)
        }
        G::MultiPolygon(polygons) => polygons.iter_mut().flatten().flatten().for_each(convert),
        G::GeometryCollection(geometries) => {
            for geometry in geometries {
                reproject_value(&mut geometry.value, crs);
            }
        }
    }
}

fn geometry_kind(value: &geojson::Value) -> &'static str {
    use geojson::Value as G;
    match value {
        G::Point(_) => "Point",
        G::MultiPoint(_) => "MultiPoint",
        G::LineString(_) => "LineString",
        G::MultiLineString(_) => "MultiLineString",
        G::Polygon(_) => "Polygon",
        G::MultiPolygon(_) => "MultiPolygon",
        G::GeometryCollection(_) => "GeometryCollection",
    }
}

fn property(feature: &Feature, name: &str) -> Option<Value> {
    feature
        .properties
        .as_ref()
        .and_then(|props| props.get(name))
        .filter(|v| !v.is_null())
        .cloned()
}

/// Load the region boundaries.
///
/// Every feature needs an identifier, a name and a Polygon/MultiPolygon
/// geometry; identifiers must be unique.
pub fn load_regions(path: &Path, schema: &FeatureSchema) -> Result<Vec<Region>> {
    let collection = read_collection(path)?;
    let mut seen = HashSet::new();
    let mut regions = Vec::with_capacity(collection.features.len());

    for (index, feature) in collection.features.into_iter().enumerate() {
        let label = format!("#{}", index);
        let missing = |property: &str| FeatureError::MissingProperty {
            path: path.to_path_buf(),
            feature: label.clone(),
            property: property.to_string(),
        };

        let id = property(&feature, &schema.id_field).ok_or_else(|| missing(&schema.id_field))?;
        let name =
            property(&feature, &schema.name_field).ok_or_else(|| missing(&schema.name_field))?;

        let invalid = |reason: String| FeatureError::InvalidGeometry {
            path: path.to_path_buf(),
            feature: value_key(&id),
            reason,
        };

        let value = match feature.geometry.as_ref() {
            Some(geometry) => &geometry.value,
            None => return Err(invalid("geometry is null".to_string())),
        };
        let geometry = to_multi_polygon(value).map_err(|reason| invalid(reason))?;

        let bbox = BoundingBox::from_coords(
            geometry
                .0
                .iter()
                .flat_map(|polygon| polygon.exterior().coords().map(|c| (c.x, c.y))),
        )
        .ok_or_else(|| invalid("geometry is empty".to_string()))?;

        if !seen.insert(value_key(&id)) {
            return Err(FeatureError::DuplicateId {
                path: path.to_path_buf(),
                id: value_key(&id),
            });
        }

        regions.push(Region {
            id,
            name,
            geometry,
            bbox,
            feature,
        });
    }

    info!(file = %path.display(), regions = regions.len(), "Loaded regions");
    Ok(regions)
}

/// Load the settlement points.
///
/// Missing identifiers default to the feature's position in the input,
/// missing names to the identifier. Features without a location are skipped.
pub fn load_settlements(path: &Path, schema: &FeatureSchema) -> Result<Vec<Settlement>> {
    let collection = read_collection(path)?;
    let mut settlements = Vec::with_capacity(collection.features.len());

    for (index, feature) in collection.features.iter().enumerate() {
        let id = property(feature, &schema.id_field).unwrap_or_else(|| Value::from(index as u64));
        let name = property(feature, &schema.name_field)
            .unwrap_or_else(|| Value::String(value_key(&id)));

        let position = match feature.geometry.as_ref().map(|g| &g.value) {
            None => {
                warn!(file = %path.display(), settlement = %value_key(&id), "Skipping settlement without geometry");
                continue;
            }
            Some(geojson::Value::Point(position)) => position,
            Some(other) => {
                return Err(FeatureError::InvalidGeometry {
                    path: path.to_path_buf(),
                    feature: value_key(&id),
                    reason: format!("expected Point, found {}", geometry_kind(other)),
                })
            }
        };

        let (lon, lat) = match position.as_slice() {
            [lon, lat, ..] => (*lon, *lat),
            _ => {
                warn!(file = %path.display(), settlement = %value_key(&id), "Skipping settlement with empty point");
                continue;
            }
        };

        settlements.push(Settlement { id, name, lon, lat });
    }

    info!(file = %path.display(), settlements = settlements.len(), "Loaded settlements");
    Ok(settlements)
}

fn to_multi_polygon(value: &geojson::Value) -> std::result::Result<MultiPolygon<f64>, String> {
    match value {
        geojson::Value::Polygon(rings) => Ok(MultiPolygon::new(vec![to_polygon(rings)?])),
        geojson::Value::MultiPolygon(polygons) => polygons
            .iter()
            .map(|rings| to_polygon(rings))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(MultiPolygon::new),
        other => Err(format!(
            "expected Polygon or MultiPolygon, found {}",
            geometry_kind(other)
        )),
    }
}

fn to_polygon(rings: &[Vec<Vec<f64>>]) -> std::result::Result<Polygon<f64>, String> {
    let (exterior, interiors) = match rings.split_first() {
        Some(split) => split,
        None => return Err("polygon has no rings".to_string()),
    };

    let interiors = interiors
        .iter()
        .map(|ring| line_string(ring))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Polygon::new(line_string(exterior)?, interiors))
}

fn line_string(ring: &[Vec<f64>]) -> std::result::Result<LineString<f64>, String> {
    if ring.len() < 4 {
        return Err(format!(
            "ring has {} positions, at least 4 are required",
            ring.len()
        ));
    }

    ring.iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] => Ok(Coord { x: *x, y: *y }),
            _ => Err("position has fewer than 2 coordinates".to_string()),
        })
        .collect::<std::result::Result<Vec<_>, _>>()
        .map(LineString::new)
}
