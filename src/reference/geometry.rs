//! GeoJSON feature parsing into `geo` geometries.
//!
//! Only Polygon and MultiPolygon geometries are kept. Anything else (points,
//! lines, null) yields a feature without geometry, which later surfaces as
//! a NotFound on bounds queries rather than an invalid box.

use super::types::{BBox, Dataset, GeoError};
use geo::{BoundingRect, Coord, Geometry, LineString, MultiPolygon, Polygon};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

#[derive(Deserialize)]
struct FeatureCollection {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    features: Vec<RawFeature>,
}

#[derive(Deserialize)]
struct RawFeature {
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    #[serde(default)]
    geometry: Option<Value>,
}

/// One parsed feature: string attributes plus optional area geometry.
#[derive(Debug, Clone)]
pub struct Feature {
    pub properties: Map<String, Value>,
    pub geometry: Option<Geometry<f64>>,
}

impl Feature {
    /// Non-empty, trimmed string attribute.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.properties
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

pub fn parse_features(text: &str, dataset: Dataset) -> Result<Vec<Feature>, GeoError> {
    let fc: FeatureCollection = serde_json::from_str(text)?;
    if fc.kind != "FeatureCollection" {
        return Err(GeoError::Schema {
            dataset,
            detail: format!("expected a FeatureCollection, found '{}'", fc.kind),
        });
    }

    Ok(fc
        .features
        .into_iter()
        .map(|f| Feature {
            properties: f.properties.unwrap_or_default(),
            geometry: f.geometry.as_ref().and_then(to_geometry),
        })
        .collect())
}

/// Every attribute name carried by at least one feature.
pub fn attribute_names(features: &[Feature]) -> BTreeSet<&str> {
    features
        .iter()
        .flat_map(|f| f.properties.keys().map(String::as_str))
        .collect()
}

/// First candidate column present in the dataset.
pub fn pick_column<'a>(features: &[Feature], candidates: &[&'a str]) -> Option<&'a str> {
    let present = attribute_names(features);
    candidates.iter().copied().find(|c| present.contains(c))
}

pub fn bounds(geometry: &Geometry<f64>) -> Option<BBox> {
    let rect = geometry.bounding_rect()?;
    BBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
}

fn to_geometry(value: &Value) -> Option<Geometry<f64>> {
    let coords = value.get("coordinates")?;
    match value.get("type")?.as_str()? {
        "Polygon" => polygon(coords).map(Geometry::Polygon),
        "MultiPolygon" => {
            let polys: Vec<Polygon<f64>> = coords.as_array()?.iter().filter_map(polygon).collect();
            if polys.is_empty() {
                None
            } else {
                Some(Geometry::MultiPolygon(MultiPolygon::new(polys)))
            }
        }
        _ => None,
    }
}

fn polygon(value: &Value) -> Option<Polygon<f64>> {
    let rings = value.as_array()?;
    let exterior = ring(rings.first()?)?;
    let interiors = rings[1..].iter().filter_map(ring).collect();
    Some(Polygon::new(exterior, interiors))
}

fn ring(value: &Value) -> Option<LineString<f64>> {
    let coords: Vec<Coord<f64>> = value
        .as_array()?
        .iter()
        .filter_map(|p| {
            let a = p.as_array()?;
            let x = a.first()?.as_f64()?;
            let y = a.get(1)?.as_f64()?;
            (x.is_finite() && y.is_finite()).then_some(Coord { x, y })
        })
        .collect();
    if coords.is_empty() {
        None
    } else {
        Some(LineString::new(coords))
    }
}
