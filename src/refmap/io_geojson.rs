// Reading the region boundaries from a GeoJSON FeatureCollection.

use std::io::Read;

use geo::{Coord, LineString, MultiPolygon, Polygon};

use referendum::schema::{self, Table};
use referendum::GeometryRecord;

use crate::refmap::*;

/// Reads the boundaries of a FeatureCollection, taking the region name from
/// the `name_property` of each feature.
///
/// Only `Polygon` and `MultiPolygon` geometries are read; the other features
/// are skipped.
pub fn read_geometry<R: Read>(
    reader: R,
    name_property: &str,
    path: &str,
) -> RefmapResult<Vec<GeometryRecord>> {
    let js: JSValue = serde_json::from_reader(reader).context(ParsingJsonSnafu { path })?;
    let features = match js["features"].as_array() {
        Some(features) => features,
        None => {
            return InvalidGeometrySnafu {
                path,
                feature: 0usize,
                message: "not a FeatureCollection",
            }
            .fail()
        }
    };

    let mut res: Vec<GeometryRecord> = Vec::new();
    for (idx, feature) in features.iter().enumerate() {
        let invalid = |message: &'static str| InvalidGeometrySnafu {
            path,
            feature: idx,
            message,
        };

        let keys: Vec<&str> = match feature["properties"].as_object() {
            Some(props) => props.keys().map(|k| k.as_str()).collect(),
            None => Vec::new(),
        };
        schema::check_named_columns(Table::Geometry, &[name_property], &keys)
            .context(SchemaSnafu { path })?;
        let name = feature["properties"][name_property]
            .as_str()
            .context(invalid("the region name is not a string"))?;

        let geometry = &feature["geometry"];
        let boundary = match geometry["type"].as_str() {
            Some("Polygon") => {
                let coords = geometry["coordinates"]
                    .as_array()
                    .context(invalid("missing coordinates"))?;
                MultiPolygon(vec![parse_polygon(coords).context(invalid("bad polygon"))?])
            }
            Some("MultiPolygon") => {
                let coords = geometry["coordinates"]
                    .as_array()
                    .context(invalid("missing coordinates"))?;
                let mut polygons: Vec<Polygon<f64>> = Vec::new();
                for p in coords {
                    let rings = p.as_array().context(invalid("bad multipolygon"))?;
                    polygons.push(parse_polygon(rings).context(invalid("bad multipolygon"))?);
                }
                MultiPolygon(polygons)
            }
            other => {
                warn!(
                    "read_geometry: {}: skipping feature {} ({}) with geometry {:?}",
                    path, idx, name, other
                );
                continue;
            }
        };
        debug!(
            "read_geometry: feature {}: {} with {} polygons",
            idx,
            name,
            boundary.0.len()
        );
        res.push(GeometryRecord {
            name: name.to_string(),
            boundary,
        });
    }
    info!("read_geometry: {} boundaries in {}", res.len(), path);
    Ok(res)
}

/// A GeoJSON polygon: the exterior ring followed by the holes.
fn parse_polygon(rings: &[JSValue]) -> Option<Polygon<f64>> {
    let mut parsed: Vec<LineString<f64>> = Vec::new();
    for ring in rings {
        parsed.push(parse_ring(ring.as_array()?)?);
    }
    if parsed.is_empty() {
        return None;
    }
    let exterior = parsed.remove(0);
    Some(Polygon::new(exterior, parsed))
}

fn parse_ring(coords: &[JSValue]) -> Option<LineString<f64>> {
    let mut points: Vec<Coord<f64>> = Vec::new();
    for pair in coords {
        let pair = pair.as_array()?;
        if pair.len() < 2 {
            return None;
        }
        points.push(Coord {
            x: pair[0].as_f64()?,
            y: pair[1].as_f64()?,
        });
    }
    // Polygon::new closes the ring.
    Some(LineString(points))
}
