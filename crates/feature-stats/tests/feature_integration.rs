//! Integration tests reading GeoJSON inputs and aggregating a monthly grid.

use climate_common::{Axis, GridAxes};
use feature_stats::{
    aggregate_regions, load_regions, load_settlements, region_collection, sample_settlements,
    settlement_collection, write_collection, FeatureError, FeatureSchema, OutOfExtentPolicy,
};
use grid_processor::MonthlyGrid;
use serde_json::{json, Value};
use test_utils::{
    assert_approx_eq, assert_coords_approx_eq, axis_values, create_constant_grid,
    create_grid_with_nans, create_test_grid, feature_collection, point_feature, scratch_dir,
    square_region, write_json,
};

/// 0.25 degree grid over northern Morocco, latitude north to south.
fn axes() -> GridAxes {
    GridAxes::new(
        Axis::new(axis_values(36.0, -0.25, 9)),
        Axis::new(axis_values(-7.0, 0.25, 9)),
    )
}

fn constant_grid(value: f64) -> MonthlyGrid {
    MonthlyGrid::new(axes(), vec![create_constant_grid(9, 9, value); 12]).unwrap()
}

fn covering_regions(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("regions.json");
    write_json(
        &path,
        &feature_collection(
            vec![
                square_region("R1", "Covering", -8.0, 33.0, -4.0, 37.0),
                square_region("R2", "Partial", -6.6, 34.6, -5.4, 35.4),
            ],
            None,
        ),
    )
    .unwrap();
    path
}

// =============================================================================
// Regions
// =============================================================================

#[test]
fn test_constant_grid_gives_constant_region_means() {
    let dir = scratch_dir();
    let regions = load_regions(&covering_regions(dir.path()), &FeatureSchema::regions()).unwrap();

    for constant in [42.5, 0.1, 0.7, 21.85, -3.15, 13.37] {
        let stats = aggregate_regions(&constant_grid(constant), &regions);

        assert_eq!(stats[0].cell_count, 81);
        for s in &stats {
            assert!(s.cell_count > 0);
            for value in &s.months {
                assert_eq!(*value, Some(constant));
            }
        }
    }
}

#[test]
fn test_missing_cells_do_not_bias_region_mean() {
    let dir = scratch_dir();
    let regions = load_regions(&covering_regions(dir.path()), &FeatureSchema::regions()).unwrap();

    let mut months = vec![create_constant_grid(9, 9, 0.7); 12];
    months[6] = create_grid_with_nans(9, 9, 0.7, &[(0, 0), (4, 4), (8, 3)]);
    months[7] = vec![f64::NAN; 81];
    let stats = aggregate_regions(&MonthlyGrid::new(axes(), months).unwrap(), &regions);

    assert_eq!(stats[0].cell_count, 81);
    assert_eq!(stats[0].months[6], Some(0.7));
    assert_eq!(stats[0].months[7], None);
    assert_eq!(stats[0].months_with_data(), 11);
}

#[test]
fn test_region_without_cells_is_null_in_output() {
    let dir = scratch_dir();
    let path = dir.path().join("regions.json");
    write_json(
        &path,
        &feature_collection(
            vec![square_region("small", "Small", -6.95, 35.7, -6.8, 35.8)],
            None,
        ),
    )
    .unwrap();

    let schema = FeatureSchema::regions();
    let regions = load_regions(&path, &schema).unwrap();
    let stats = aggregate_regions(&constant_grid(0.0), &regions);
    let collection = region_collection(&regions, &stats, &schema, "precip");

    let props = collection.features[0].properties.as_ref().unwrap();
    assert_eq!(props["region_id"], json!("small"));
    assert_eq!(props["nom_region"], json!("Small"));
    assert_eq!(props["id"], json!("small"));
    for m in 1..=12 {
        assert_eq!(props[&format!("precip_{:02}", m)], Value::Null);
    }
}

#[test]
fn test_mercator_regions_are_reprojected() {
    let dir = scratch_dir();
    let path = dir.path().join("regions_3857.json");
    // -7.5..-4.5 E, 33.9..36.5 N in Web Mercator meters
    write_json(
        &path,
        &feature_collection(
            vec![square_region(
                "R1",
                "Mercator",
                -834_896.18,
                4_015_382.36,
                -500_937.71,
                4_369_640.51,
            )],
            Some("urn:ogc:def:crs:EPSG::3857"),
        ),
    )
    .unwrap();

    let regions = load_regions(&path, &FeatureSchema::regions()).unwrap();
    assert_approx_eq!(regions[0].bbox.min_x, -7.5, 1e-3);
    assert_approx_eq!(regions[0].bbox.max_y, 36.5, 1e-3);

    let stats = aggregate_regions(&constant_grid(1.0), &regions);
    assert_eq!(stats[0].cell_count, 81);
}

#[test]
fn test_unknown_crs_is_rejected() {
    let dir = scratch_dir();
    let path = dir.path().join("regions_utm.json");
    write_json(
        &path,
        &feature_collection(
            vec![square_region("R1", "UTM", 0.0, 0.0, 1.0, 1.0)],
            Some("EPSG:32629"),
        ),
    )
    .unwrap();

    let err = load_regions(&path, &FeatureSchema::regions()).unwrap_err();
    assert!(matches!(err, FeatureError::UnsupportedCrs { .. }));
}

#[test]
fn test_duplicate_region_ids_are_rejected() {
    let dir = scratch_dir();
    let path = dir.path().join("regions.json");
    write_json(
        &path,
        &feature_collection(
            vec![
                square_region("R1", "One", 0.0, 0.0, 1.0, 1.0),
                square_region("R1", "Again", 1.0, 1.0, 2.0, 2.0),
            ],
            None,
        ),
    )
    .unwrap();

    let err = load_regions(&path, &FeatureSchema::regions()).unwrap_err();
    assert!(matches!(err, FeatureError::DuplicateId { .. }));
}

#[test]
fn test_multipolygon_region() {
    let dir = scratch_dir();
    let path = dir.path().join("regions.json");
    let feature = json!({
        "type": "Feature",
        "properties": { "id": 3, "name": "Islands" },
        "geometry": {
            "type": "MultiPolygon",
            "coordinates": [
                [[[-7.1, 35.9], [-6.9, 35.9], [-6.9, 36.1], [-7.1, 36.1], [-7.1, 35.9]]],
                [[[-5.1, 33.9], [-4.9, 33.9], [-4.9, 34.1], [-5.1, 34.1], [-5.1, 33.9]]]
            ]
        }
    });
    write_json(&path, &feature_collection(vec![feature], None)).unwrap();

    let regions = load_regions(&path, &FeatureSchema::regions()).unwrap();
    assert_eq!(regions[0].key(), "3");
    assert_eq!(aggregate_regions(&constant_grid(2.0), &regions)[0].cell_count, 2);
}

// =============================================================================
// Settlements
// =============================================================================

#[test]
fn test_settlement_defaults_and_sampling() {
    let dir = scratch_dir();
    let path = dir.path().join("villes.geojson");
    write_json(
        &path,
        &feature_collection(
            vec![
                point_feature(json!({ "id_ville": 10, "nom_ville": "Tanger" }), -5.75, 35.75),
                point_feature(json!({}), -6.0, 35.0),
                json!({ "type": "Feature", "properties": {}, "geometry": null }),
            ],
            None,
        ),
    )
    .unwrap();

    let schema = FeatureSchema::settlements();
    let settlements = load_settlements(&path, &schema).unwrap();
    assert_eq!(settlements.len(), 2);
    assert_eq!(settlements[1].id, json!(1));
    assert_eq!(settlements[1].name, json!("1"));

    let samples =
        sample_settlements(&constant_grid(7.0), &settlements, OutOfExtentPolicy::Clamp).unwrap();
    let collection = settlement_collection(&settlements, &samples, &schema, "temp");

    let out = dir.path().join("villes_temp_2024.geojson");
    write_collection(&out, &collection).unwrap();

    let written: Value = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    let first = &written["features"][0];
    assert_eq!(first["properties"]["id_ville"], json!(10));
    assert_eq!(first["properties"]["nom_ville"], json!("Tanger"));
    assert_eq!(first["properties"]["temp_12"], json!(7.0));
    assert_eq!(first["geometry"]["coordinates"], json!([-5.75, 35.75]));
    assert!(written.get("crs").is_none());
}

#[test]
fn test_settlements_sample_nearest_cell() {
    let dir = scratch_dir();
    let path = dir.path().join("villes.geojson");
    write_json(
        &path,
        &feature_collection(
            vec![
                point_feature(json!({ "id_ville": 1, "nom_ville": "Inside" }), -6.1, 35.4),
                point_feature(json!({ "id_ville": 2, "nom_ville": "Offshore" }), -9.0, 37.0),
            ],
            None,
        ),
    )
    .unwrap();

    // Cell value encodes its position: col * 1000 + row
    let grid = MonthlyGrid::new(axes(), vec![create_test_grid(9, 9); 12]).unwrap();
    let settlements = load_settlements(&path, &FeatureSchema::settlements()).unwrap();
    let samples = sample_settlements(&grid, &settlements, OutOfExtentPolicy::Clamp).unwrap();

    assert_coords_approx_eq!((samples[0].cell.x, samples[0].cell.y), (-6.0, 35.5), 1e-9);
    assert_eq!(samples[0].months[0], Some(4002.0));
    assert!(!samples[0].clamped);

    assert_coords_approx_eq!((samples[1].cell.x, samples[1].cell.y), (-7.0, 36.0), 1e-9);
    assert_eq!(samples[1].months[11], Some(0.0));
    assert!(samples[1].clamped);

    let err = sample_settlements(&grid, &settlements, OutOfExtentPolicy::Error).unwrap_err();
    assert!(matches!(err, FeatureError::OutOfExtent { .. }));
}

#[test]
fn test_non_point_settlement_is_rejected() {
    let dir = scratch_dir();
    let path = dir.path().join("villes.geojson");
    write_json(
        &path,
        &feature_collection(vec![square_region("x", "x", 0.0, 0.0, 1.0, 1.0)], None),
    )
    .unwrap();

    let err = load_settlements(&path, &FeatureSchema::settlements()).unwrap_err();
    assert!(matches!(err, FeatureError::InvalidGeometry { .. }));
}
