//! Planar point-in-polygon tests over GeoJSON (lon, lat) coordinates.

use serde::Deserialize;
use serde_json::Value;

use crate::{FetchError, model::Coordinate};

/// `(x, y)` = `(longitude, latitude)`, matching GeoJSON axis order.
pub type Position = (f64, f64);
pub type Ring = Vec<Position>;
/// Outer ring first, then holes.
pub type Polygon = Vec<Ring>;

/// Ray-casting test against a single ring. Closure of the ring is optional.
pub fn point_in_ring(point: Position, ring: &[Position]) -> bool {
    let (px, py) = point;
    let mut inside = false;
    if ring.is_empty() {
        return false;
    }

    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        if (yi > py) != (yj > py) && px < (xj - xi) * (py - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Inside the outer ring and outside every hole.
pub fn point_in_polygon(point: Position, polygon: &[Ring]) -> bool {
    let Some((outer, holes)) = polygon.split_first() else {
        return false;
    };
    point_in_ring(point, outer) && !holes.iter().any(|hole| point_in_ring(point, hole))
}

/// A Polygon or MultiPolygon. Other geometry types decode to an empty shape
/// that contains nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shape {
    pub polygons: Vec<Polygon>,
}

impl Shape {
    pub fn contains(&self, at: Coordinate) -> bool {
        let point = (at.longitude, at.latitude);
        self.polygons.iter().any(|p| point_in_polygon(point, p))
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }
}

/// GeoJSON geometry object before its coordinates are interpreted.
#[derive(Debug, Clone, Deserialize)]
pub struct RawGeometry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub coordinates: Value,
}

impl TryFrom<RawGeometry> for Shape {
    type Error = FetchError;

    fn try_from(raw: RawGeometry) -> Result<Self, Self::Error> {
        let polygons = match raw.kind.as_str() {
            "Polygon" => vec![polygon(&raw.coordinates)?],
            "MultiPolygon" => as_array(&raw.coordinates)?
                .iter()
                .map(polygon)
                .collect::<Result<_, _>>()?,
            _ => Vec::new(),
        };
        Ok(Shape { polygons })
    }
}

fn as_array(value: &Value) -> Result<&Vec<Value>, FetchError> {
    value
        .as_array()
        .ok_or_else(|| FetchError::Geometry(format!("expected array, found {value}")))
}

fn polygon(value: &Value) -> Result<Polygon, FetchError> {
    as_array(value)?.iter().map(ring).collect()
}

fn ring(value: &Value) -> Result<Ring, FetchError> {
    as_array(value)?
        .iter()
        .map(|pos| {
            let pos = as_array(pos)?;
            match (pos.first().and_then(Value::as_f64), pos.get(1).and_then(Value::as_f64)) {
                (Some(x), Some(y)) => Ok((x, y)),
                _ => Err(FetchError::Geometry("position needs two numbers".into())),
            }
        })
        .collect()
}

/// Among items whose shape covers `at`, the one with the highest rank. The
/// first item encountered wins a tie.
pub fn best_covering<'a, T>(
    items: impl IntoIterator<Item = &'a T>,
    at: Coordinate,
    shape: impl Fn(&T) -> &Shape,
    rank: impl Fn(&T) -> i64,
) -> Option<&'a T> {
    let mut best: Option<(&'a T, i64)> = None;
    for item in items {
        if !shape(item).contains(at) {
            continue;
        }
        let r = rank(item);
        if best.is_none_or(|(_, top)| r > top) {
            best = Some((item, r));
        }
    }
    best.map(|(item, _)| item)
}
