//! Adaptive polygon offsetting.
//!
//! Each polygon is moved by a distance proportional to its area/perimeter
//! ratio (roughly its stroke width), capped at `max_offset`. Offsetting uses a
//! round-join closed-polygon clipper offset; degenerate results fall back to
//! the input polygon.

use geo_clipper::{Clipper, EndType, JoinType};
use geo_types::{Coord, LineString, Polygon as GeoPolygon};
use tracing::debug;

use crate::geometry::{GeometryError, Point, Polygon};
use crate::types::{OffsetConfig, OffsetDirection};

const PERIMETER_EPSILON: f64 = 0.001;

/// `min(round(area * rate / (perimeter + eps)), max_offset)`
pub fn offset_distance(area: f64, perimeter: f64, cfg: &OffsetConfig) -> i64 {
    let raw = (area * cfg.shrink_rate / (perimeter + PERIMETER_EPSILON) + 0.5) as i64;
    raw.min(cfg.max_offset)
}

/// Offset every polygon, dropping those with area below `cfg.min_area`.
///
/// Fails if `cfg` is out of range or some polygon has fewer than 3 vertices.
pub fn offset_polygons(polygons: &[Polygon], cfg: &OffsetConfig) -> Result<Vec<Polygon>, GeometryError> {
    cfg.validate()?;
    let mut out = Vec::with_capacity(polygons.len());
    for poly in polygons {
        check_polygon(poly)?;
        let area = poly.area();
        if area < cfg.min_area {
            debug!("dropping polygon with area {:.1} < {}", area, cfg.min_area);
            continue;
        }
        out.push(offset_checked(poly, area, cfg));
    }
    Ok(out)
}

/// Offset a single polygon without the area filter.
pub fn offset_polygon(poly: &Polygon, cfg: &OffsetConfig) -> Result<Polygon, GeometryError> {
    cfg.validate()?;
    check_polygon(poly)?;
    Ok(offset_checked(poly, poly.area(), cfg))
}

fn check_polygon(poly: &Polygon) -> Result<(), GeometryError> {
    if poly.len() < 3 {
        return Err(GeometryError::InvalidPolygon { len: poly.len() });
    }
    Ok(())
}

fn offset_checked(poly: &Polygon, area: f64, cfg: &OffsetConfig) -> Polygon {
    let distance = offset_distance(area, poly.perimeter(), cfg);
    let delta = match cfg.direction {
        OffsetDirection::Inward => -(distance as f64),
        OffsetDirection::Outward => distance as f64,
    };

    let mut ring: Vec<Coord<f64>> = poly
        .points
        .iter()
        .map(|p| Coord { x: p.x as f64, y: p.y as f64 })
        .collect();
    ring.push(ring[0]);
    let geo_poly = GeoPolygon::new(LineString::from(ring), vec![]);

    let result = geo_poly.offset(delta, JoinType::Round(cfg.arc_tolerance), EndType::ClosedPolygon, 1.0);
    let Some(first) = result.0.first() else {
        debug!("offset by {} produced nothing, keeping source polygon", delta);
        return poly.clone();
    };

    let mut points: Vec<Point> = first
        .exterior()
        .0
        .iter()
        .map(|c| Point::new(c.x.round() as i32, c.y.round() as i32))
        .collect();
    // geo rings repeat the first coordinate at the end
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }

    if points.len() <= 2 {
        debug!("offset by {} collapsed to {} vertices, keeping source polygon", delta, points.len());
        return poly.clone();
    }

    Polygon::new(points)
}
