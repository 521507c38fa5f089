//! Rectangle finder: convex hull + rotating calipers, with an optional OpenCV
//! backend for `min_area_rect` / `box_points`.

#[cfg(feature = "use-opencv")]
pub use opencv_impl::*;

#[cfg(not(feature = "use-opencv"))]
pub use rust_impl::*;

use crate::geometry::GeometryError;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point2f {
    pub x: f32,
    pub y: f32,
}

impl Point2f {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size2f {
    pub width: f32,
    pub height: f32,
}

impl Size2f {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Rotated rectangle. `angle` is in degrees within `[0, 90)`; `width` is the
/// extent along the direction `(cos angle, sin angle)`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RotatedRect {
    pub center: Point2f,
    pub size: Size2f,
    pub angle: f32,
}

impl RotatedRect {
    pub fn area(&self) -> f32 {
        self.size.width * self.size.height
    }
}

// Pure Rust implementation
#[cfg(not(feature = "use-opencv"))]
mod rust_impl {
    use super::{GeometryError, Point2f, RotatedRect, Size2f};

    pub fn min_area_rect(points: &[Point2f]) -> Result<RotatedRect, GeometryError> {
        if points.is_empty() {
            return Err(GeometryError::EmptyPointSet);
        }

        let hull = convex_hull(points);

        match hull.len() {
            1 => Ok(RotatedRect {
                center: hull[0],
                size: Size2f::new(0.0, 0.0),
                angle: 0.0,
            }),
            2 => {
                let (p, q) = (hull[0], hull[1]);
                let dx = (q.x - p.x) as f64;
                let dy = (q.y - p.y) as f64;
                let center = Point2f::new((p.x + q.x) / 2.0, (p.y + q.y) / 2.0);
                Ok(normalized(center, dx.hypot(dy), 0.0, dy.atan2(dx).to_degrees()))
            }
            _ => Ok(rotating_calipers(&hull)),
        }
    }

    fn rotating_calipers(hull: &[Point2f]) -> RotatedRect {
        let mut best: Option<(f64, RotatedRect)> = None;

        let n = hull.len();
        for i in 0..n {
            let p1 = hull[i];
            let p2 = hull[(i + 1) % n];

            let edge_x = (p2.x - p1.x) as f64;
            let edge_y = (p2.y - p1.y) as f64;
            let edge_len = edge_x.hypot(edge_y);
            if edge_len < 1e-9 {
                continue;
            }

            let ux = edge_x / edge_len;
            let uy = edge_y / edge_len;
            let vx = -uy;
            let vy = ux;

            let mut min_u = f64::MAX;
            let mut max_u = f64::MIN;
            let mut min_v = f64::MAX;
            let mut max_v = f64::MIN;
            for pt in hull {
                let (x, y) = (pt.x as f64, pt.y as f64);
                let u = x * ux + y * uy;
                let v = x * vx + y * vy;
                min_u = min_u.min(u);
                max_u = max_u.max(u);
                min_v = min_v.min(v);
                max_v = max_v.max(v);
            }

            let width = max_u - min_u;
            let height = max_v - min_v;
            let area = width * height;
            if best.as_ref().map(|(a, _)| area < *a - 1e-9).unwrap_or(true) {
                let cu = (min_u + max_u) / 2.0;
                let cv = (min_v + max_v) / 2.0;
                let center = Point2f::new((cu * ux + cv * vx) as f32, (cu * uy + cv * vy) as f32);
                let angle = uy.atan2(ux).to_degrees();
                best = Some((area, normalized(center, width, height, angle)));
            }
        }

        best.map(|(_, r)| r).unwrap_or(RotatedRect {
            center: hull[0],
            size: Size2f::new(0.0, 0.0),
            angle: 0.0,
        })
    }

    /// Fold the angle into `[0, 90)`, swapping sides on every quarter turn.
    fn normalized(center: Point2f, mut width: f64, mut height: f64, mut angle: f64) -> RotatedRect {
        while angle < 0.0 {
            angle += 90.0;
            std::mem::swap(&mut width, &mut height);
        }
        while angle >= 90.0 {
            angle -= 90.0;
            std::mem::swap(&mut width, &mut height);
        }
        // atan2 rounding can leave 89.99999 for an axis-aligned edge
        if 90.0 - angle < 1e-6 {
            angle = 0.0;
            std::mem::swap(&mut width, &mut height);
        }
        RotatedRect {
            center,
            size: Size2f::new(width as f32, height as f32),
            angle: angle as f32,
        }
    }

    /// Corner order follows OpenCV's `RotatedRect::points`: for an
    /// axis-aligned rectangle that is bottom-left, top-left, top-right,
    /// bottom-right in image coordinates.
    pub fn box_points(rect: &RotatedRect) -> [Point2f; 4] {
        let theta = (rect.angle as f64).to_radians();
        let b = theta.cos() * 0.5;
        let a = theta.sin() * 0.5;
        let (cx, cy) = (rect.center.x as f64, rect.center.y as f64);
        let (w, h) = (rect.size.width as f64, rect.size.height as f64);

        let p0 = (cx - a * h - b * w, cy + b * h - a * w);
        let p1 = (cx + a * h - b * w, cy - b * h - a * w);
        let p2 = (2.0 * cx - p0.0, 2.0 * cy - p0.1);
        let p3 = (2.0 * cx - p1.0, 2.0 * cy - p1.1);

        [p0, p1, p2, p3].map(|(x, y)| Point2f::new(x as f32, y as f32))
    }

    /// Andrew's monotone chain. Collinear points are dropped, so a set lying
    /// on one line collapses to its two extremes.
    pub fn convex_hull(points: &[Point2f]) -> Vec<Point2f> {
        let mut pts: Vec<Point2f> = points.to_vec();
        pts.sort_by(|a, b| {
            a.x.partial_cmp(&b.x)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal))
        });
        pts.dedup();
        if pts.len() <= 2 {
            return pts;
        }

        let cross = |o: Point2f, a: Point2f, b: Point2f| {
            ((a.x - o.x) as f64) * ((b.y - o.y) as f64) - ((a.y - o.y) as f64) * ((b.x - o.x) as f64)
        };

        let mut lower: Vec<Point2f> = Vec::with_capacity(pts.len());
        for &p in &pts {
            while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
                lower.pop();
            }
            lower.push(p);
        }

        let mut upper: Vec<Point2f> = Vec::with_capacity(pts.len());
        for &p in pts.iter().rev() {
            while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
                upper.pop();
            }
            upper.push(p);
        }

        lower.pop();
        upper.pop();
        lower.extend(upper);
        lower
    }
}

// OpenCV implementation
#[cfg(feature = "use-opencv")]
mod opencv_impl {
    use super::{GeometryError, Point2f, RotatedRect, Size2f};

    impl From<Point2f> for opencv::core::Point2f {
        fn from(p: Point2f) -> Self {
            opencv::core::Point2f::new(p.x, p.y)
        }
    }

    impl From<opencv::core::Point2f> for Point2f {
        fn from(p: opencv::core::Point2f) -> Self {
            Point2f::new(p.x, p.y)
        }
    }

    pub fn min_area_rect(points: &[Point2f]) -> Result<RotatedRect, GeometryError> {
        if points.is_empty() {
            return Err(GeometryError::EmptyPointSet);
        }
        let cv_points: opencv::core::Vector<opencv::core::Point2f> =
            points.iter().map(|&p| p.into()).collect();

        let rect = opencv::imgproc::min_area_rect(&cv_points)
            .map_err(|_| GeometryError::EmptyPointSet)?;
        Ok(RotatedRect {
            center: rect.center.into(),
            size: Size2f::new(rect.size.width, rect.size.height),
            angle: rect.angle,
        })
    }

    pub fn box_points(rect: &RotatedRect) -> [Point2f; 4] {
        let cv_rect = opencv::core::RotatedRect {
            center: rect.center.into(),
            size: opencv::core::Size2f::new(rect.size.width, rect.size.height),
            angle: rect.angle,
        };

        let mut pts = [opencv::core::Point2f::default(); 4];
        if cv_rect.points(&mut pts).is_err() {
            return [rect.center; 4];
        }
        pts.map(Point2f::from)
    }
}

#[cfg(all(test, not(feature = "use-opencv")))]
mod tests {
    use super::*;

    fn pts(coords: &[(f32, f32)]) -> Vec<Point2f> {
        coords.iter().map(|&(x, y)| Point2f::new(x, y)).collect()
    }

    #[test]
    fn test_min_area_rect_axis_aligned() {
        let points = pts(&[(2.0, 3.0), (12.0, 3.0), (12.0, 8.0), (2.0, 8.0), (7.0, 5.0)]);
        let rect = min_area_rect(&points).unwrap();
        assert!((rect.center.x - 7.0).abs() < 1e-4);
        assert!((rect.center.y - 5.5).abs() < 1e-4);
        assert!((rect.area() - 50.0).abs() < 1e-3);
        assert_eq!(rect.angle, 0.0);

        let corners = box_points(&rect);
        let expected = [(2.0, 8.0), (2.0, 3.0), (12.0, 3.0), (12.0, 8.0)];
        for (c, e) in corners.iter().zip(expected.iter()) {
            assert!((c.x - e.0).abs() < 1e-3 && (c.y - e.1).abs() < 1e-3, "{:?} vs {:?}", c, e);
        }
    }

    #[test]
    fn test_min_area_rect_rotated_square() {
        // diamond: a square of side sqrt(50) rotated by 45 degrees
        let points = pts(&[(5.0, 0.0), (10.0, 5.0), (5.0, 10.0), (0.0, 5.0)]);
        let rect = min_area_rect(&points).unwrap();
        assert!((rect.area() - 50.0).abs() < 1e-3);
        assert!((rect.angle - 45.0).abs() < 1e-3);

        let corners = box_points(&rect);
        for c in corners {
            assert!(points.iter().any(|p| (p.x - c.x).abs() < 1e-3 && (p.y - c.y).abs() < 1e-3));
        }
    }

    #[test]
    fn test_min_area_rect_degenerate_inputs() {
        assert!(matches!(min_area_rect(&[]), Err(GeometryError::EmptyPointSet)));

        let single = min_area_rect(&pts(&[(4.0, 4.0), (4.0, 4.0)])).unwrap();
        assert_eq!(single.area(), 0.0);
        assert_eq!(box_points(&single), [Point2f::new(4.0, 4.0); 4]);

        let line = min_area_rect(&pts(&[(0.0, 0.0), (3.0, 0.0), (6.0, 0.0)])).unwrap();
        assert_eq!(line.area(), 0.0);
        assert!((line.size.width - 6.0).abs() < 1e-4);
    }

    #[test]
    fn test_convex_hull_drops_interior_points() {
        let points = pts(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0), (2.0, 2.0), (1.0, 3.0)]);
        let hull = convex_hull(&points);
        assert_eq!(hull.len(), 4);
        assert!(!hull.contains(&Point2f::new(2.0, 2.0)));
    }
}
