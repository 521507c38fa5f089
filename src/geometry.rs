//! Integer polygon types and the primitives shared by the extractor and the
//! offset engine.

use std::fmt;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("polygon needs at least 3 vertices, got {len}")]
    InvalidPolygon { len: usize },

    #[error("scale factors must be finite and positive, got ({sx}, {sy})")]
    InvalidScale { sx: f32, sy: f32 },

    #[error("non-finite coordinate produced while rescaling a rectangle")]
    NonFiniteCoordinate,

    #[error("mask data has {actual} values, expected {expected}")]
    MaskShape { expected: usize, actual: usize },

    #[error("mask value {value} is not binary")]
    MaskValue { value: u8 },

    #[error("score map contains a non-finite value")]
    NonFiniteScore,

    #[error("empty point set")]
    EmptyPointSet,

    #[error("offset parameter `{name}` is out of range: {value}")]
    InvalidParameter { name: &'static str, value: f64 },
}

/// Pixel coordinate in original-image space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Closed polygon, the last vertex implicitly connects back to the first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Polygon {
    pub points: Vec<Point>,
}

impl Polygon {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn from_coords(coords: &[(i32, i32)]) -> Self {
        Self {
            points: coords.iter().map(|&(x, y)| Point::new(x, y)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn area(&self) -> f64 {
        polygon_area(&self.points)
    }

    pub fn perimeter(&self) -> f64 {
        perimeter(&self.points)
    }
}

/// Minimum-area rotated rectangle of one detected region, four corners in the
/// winding order of the rectangle finder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rectangle {
    pub points: [Point; 4],
}

impl Rectangle {
    pub fn new(points: [Point; 4]) -> Self {
        Self { points }
    }

    /// `[x1, y1, x2, y2, x3, y3, x4, y4]`
    pub fn flatten(&self) -> [i32; 8] {
        let mut out = [0i32; 8];
        for (i, p) in self.points.iter().enumerate() {
            out[i * 2] = p.x;
            out[i * 2 + 1] = p.y;
        }
        out
    }

    pub fn area(&self) -> f64 {
        polygon_area(&self.points)
    }

    pub fn to_polygon(&self) -> Polygon {
        Polygon::new(self.points.to_vec())
    }
}

impl From<Rectangle> for Polygon {
    fn from(rect: Rectangle) -> Self {
        rect.to_polygon()
    }
}

impl fmt::Display for Rectangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.flatten();
        write!(
            f,
            "{}, {}, {}, {}, {}, {}, {}, {}",
            v[0], v[1], v[2], v[3], v[4], v[5], v[6], v[7]
        )
    }
}

/// Resize factor from original image to model input, per axis.
///
/// `resized = original * s`, so model-space coordinates map back to the
/// original image by dividing by `s`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactor {
    pub sx: f32,
    pub sy: f32,
}

impl ScaleFactor {
    pub fn new(sx: f32, sy: f32) -> Result<Self, GeometryError> {
        let valid = |v: f32| v.is_finite() && v > 0.0;
        if !valid(sx) || !valid(sy) {
            return Err(GeometryError::InvalidScale { sx, sy });
        }
        Ok(Self { sx, sy })
    }

    pub fn uniform(s: f32) -> Result<Self, GeometryError> {
        Self::new(s, s)
    }

    pub fn identity() -> Self {
        Self { sx: 1.0, sy: 1.0 }
    }
}

pub fn distance(a: Point, b: Point) -> f64 {
    let dx = (a.x - b.x) as f64;
    let dy = (a.y - b.y) as f64;
    (dx * dx + dy * dy).sqrt()
}

/// Sum of edge lengths, wrapping the last vertex back to the first.
pub fn perimeter(points: &[Point]) -> f64 {
    let n = points.len();
    (0..n).map(|i| distance(points[i], points[(i + 1) % n])).sum()
}

/// Shoelace formula, magnitude only.
pub fn polygon_area(points: &[Point]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut area = 0.0f64;
    for i in 0..n {
        let p1 = points[i];
        let p2 = points[(i + 1) % n];
        area += (p1.x as f64) * (p2.y as f64) - (p2.x as f64) * (p1.y as f64);
    }
    (area * 0.5).abs()
}
