//! # Territory Boundary Generator
//!
//! Approximates a territory's coverage area as a closed polygon of
//! (lat, lon) vertices.
//!
//! | Points | Polygon                                        |
//! |--------|------------------------------------------------|
//! | 0      | empty                                          |
//! | 1      | square around the point, `margin` each side    |
//! | 2      | bounding rectangle plus `margin`               |
//! | 3+     | convex hull; bounding rectangle when collinear |
//!
//! Non-empty polygons always repeat their first vertex at the end.

use crate::models::{Coordinates, Location};
use crate::territory::Territory;
use fxhash::FxHashMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// How a boundary polygon was constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryMethod {
    Empty,
    Square,
    Rectangle,
    ConvexHull,
    /// Hull unavailable (collinear or coincident points)
    BoundingBoxFallback,
}

/// Closed polygon around one territory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    pub city: String,
    pub territory: String,
    pub agent_id: String,
    pub method: BoundaryMethod,
    pub point_count: usize,
    pub vertices: Vec<Coordinates>,
}

impl Boundary {
    pub fn is_closed(&self) -> bool {
        match (self.vertices.first(), self.vertices.last()) {
            (Some(first), Some(last)) => self.vertices.len() >= 4 && first == last,
            _ => false,
        }
    }

    /// Polygon area in square degrees.
    pub fn area(&self) -> f64 {
        ring_area(&self.vertices)
    }

    pub fn contains(&self, point: Coordinates) -> bool {
        ring_contains(&self.vertices, point)
    }
}

/// Shoelace area of a closed ring (absolute value).
pub fn ring_area(ring: &[Coordinates]) -> f64 {
    if ring.len() < 4 {
        return 0.0;
    }
    let twice: f64 = ring
        .windows(2)
        .map(|w| w[0].lon * w[1].lat - w[1].lon * w[0].lat)
        .sum();
    twice.abs() / 2.0
}

/// Even-odd containment test; points on an edge count as inside.
pub fn ring_contains(ring: &[Coordinates], p: Coordinates) -> bool {
    if ring.len() < 4 {
        return false;
    }

    let mut inside = false;
    for w in ring.windows(2) {
        let (a, b) = (w[0], w[1]);
        if on_segment(a, b, p) {
            return true;
        }
        if (a.lat > p.lat) != (b.lat > p.lat) {
            let x = a.lon + (p.lat - a.lat) * (b.lon - a.lon) / (b.lat - a.lat);
            if p.lon < x {
                inside = !inside;
            }
        }
    }
    inside
}

fn on_segment(a: Coordinates, b: Coordinates, p: Coordinates) -> bool {
    const EPS: f64 = 1e-12;
    cross(a, b, p).abs() <= EPS
        && p.lon >= a.lon.min(b.lon) - EPS
        && p.lon <= a.lon.max(b.lon) + EPS
        && p.lat >= a.lat.min(b.lat) - EPS
        && p.lat <= a.lat.max(b.lat) + EPS
}

/// z-component of (a - o) x (b - o), with lon as x and lat as y.
fn cross(o: Coordinates, a: Coordinates, b: Coordinates) -> f64 {
    (a.lon - o.lon) * (b.lat - o.lat) - (a.lat - o.lat) * (b.lon - o.lon)
}

/// Closed axis-aligned rectangle around `points`, grown by `margin`.
pub fn bounding_rectangle(points: &[Coordinates], margin: f64) -> Vec<Coordinates> {
    let min_lat = points.iter().map(|p| p.lat).fold(f64::INFINITY, f64::min) - margin;
    let max_lat = points.iter().map(|p| p.lat).fold(f64::NEG_INFINITY, f64::max) + margin;
    let min_lon = points.iter().map(|p| p.lon).fold(f64::INFINITY, f64::min) - margin;
    let max_lon = points.iter().map(|p| p.lon).fold(f64::NEG_INFINITY, f64::max) + margin;

    vec![
        Coordinates::new(min_lat, min_lon),
        Coordinates::new(min_lat, max_lon),
        Coordinates::new(max_lat, max_lon),
        Coordinates::new(max_lat, min_lon),
        Coordinates::new(min_lat, min_lon),
    ]
}

/// Hulls with less area than this fraction of the squared point spread are
/// treated as collinear.
const DEGENERATE_HULL_RATIO: f64 = 1e-9;

/// Convex hull by monotone chain. Collinear points are dropped; `None` when
/// fewer than three hull vertices remain or the hull has no real area.
pub fn convex_hull(points: &[Coordinates]) -> Option<Vec<Coordinates>> {
    let mut pts: Vec<Coordinates> = points.to_vec();
    pts.sort_by(|a, b| a.lon.total_cmp(&b.lon).then(a.lat.total_cmp(&b.lat)));
    pts.dedup();

    if pts.len() < 3 {
        return None;
    }

    let mut lower: Vec<Coordinates> = Vec::with_capacity(pts.len());
    for &p in &pts {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<Coordinates> = Vec::with_capacity(pts.len());
    for &p in pts.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);

    if lower.len() < 3 {
        return None;
    }

    // Sliver hulls from float noise count as collinear
    let span_lat = pts.iter().map(|p| p.lat).fold(f64::NEG_INFINITY, f64::max)
        - pts.iter().map(|p| p.lat).fold(f64::INFINITY, f64::min);
    let span_lon = pts[pts.len() - 1].lon - pts[0].lon;
    let span = span_lat.max(span_lon);
    let twice_area: f64 = lower.windows(2).skip(1).map(|w| cross(lower[0], w[0], w[1])).sum();
    if twice_area.abs() <= span * span * DEGENERATE_HULL_RATIO {
        return None;
    }

    Some(lower)
}

/// Order vertices counter-clockwise by polar angle around their centroid and
/// repeat the first vertex.
pub fn close_ring_by_angle(mut vertices: Vec<Coordinates>) -> Vec<Coordinates> {
    if vertices.is_empty() {
        return vertices;
    }

    let n = vertices.len() as f64;
    let c_lat = vertices.iter().map(|v| v.lat).sum::<f64>() / n;
    let c_lon = vertices.iter().map(|v| v.lon).sum::<f64>() / n;
    let angle = |v: &Coordinates| (v.lat - c_lat).atan2(v.lon - c_lon);

    vertices.sort_by(|a, b| angle(a).total_cmp(&angle(b)));
    vertices.push(vertices[0]);
    vertices
}

/// Build the polygon for a set of points.
pub fn territory_polygon(points: &[Coordinates], margin: f64) -> (Vec<Coordinates>, BoundaryMethod) {
    match points.len() {
        0 => (Vec::new(), BoundaryMethod::Empty),
        1 => (bounding_rectangle(points, margin), BoundaryMethod::Square),
        2 => (bounding_rectangle(points, margin), BoundaryMethod::Rectangle),
        _ => match convex_hull(points) {
            Some(hull) => (close_ring_by_angle(hull), BoundaryMethod::ConvexHull),
            None => (bounding_rectangle(points, margin), BoundaryMethod::BoundingBoxFallback),
        },
    }
}

/// Boundary of every territory, in territory order.
pub fn generate_boundaries(
    territories: &[Territory],
    locations: &[Location],
    margin: f64,
) -> Vec<Boundary> {
    let by_id: FxHashMap<&str, Coordinates> =
        locations.iter().map(|l| (l.id.as_str(), l.coordinates)).collect();

    territories
        .par_iter()
        .map(|t| {
            let points: Vec<Coordinates> =
                t.location_ids.iter().filter_map(|id| by_id.get(id.as_str()).copied()).collect();
            let (vertices, method) = territory_polygon(&points, margin);
            Boundary {
                city: t.city.clone(),
                territory: t.label.clone(),
                agent_id: t.agent_id.clone(),
                method,
                point_count: points.len(),
                vertices,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARGIN: f64 = 0.005;

    fn c(lat: f64, lon: f64) -> Coordinates {
        Coordinates::new(lat, lon)
    }

    fn boundary(points: &[Coordinates]) -> Boundary {
        let (vertices, method) = territory_polygon(points, MARGIN);
        Boundary {
            city: "X".to_string(),
            territory: "X".to_string(),
            agent_id: "A".to_string(),
            method,
            point_count: points.len(),
            vertices,
        }
    }

    #[test]
    fn test_empty_territory() {
        let b = boundary(&[]);
        assert_eq!(b.method, BoundaryMethod::Empty);
        assert!(b.vertices.is_empty());
        assert!(!b.is_closed());
    }

    #[test]
    fn test_single_point_square() {
        let p = c(55.75, 37.61);
        let b = boundary(&[p]);

        assert_eq!(b.method, BoundaryMethod::Square);
        assert_eq!(b.vertices.len(), 5);
        assert!(b.is_closed());
        assert!(b.contains(p));
        assert!((b.area() - (2.0 * MARGIN) * (2.0 * MARGIN)).abs() < 1e-12);
    }

    #[test]
    fn test_two_points_rectangle_with_margin() {
        let (p, q) = (c(55.70, 37.50), c(55.80, 37.70));
        let b = boundary(&[p, q]);

        assert_eq!(b.method, BoundaryMethod::Rectangle);
        assert_eq!(b.vertices.len(), 5);
        assert!(b.is_closed());
        assert!(b.contains(p) && b.contains(q));
        let min_lat = b.vertices.iter().map(|v| v.lat).fold(f64::INFINITY, f64::min);
        let max_lon = b.vertices.iter().map(|v| v.lon).fold(f64::NEG_INFINITY, f64::max);
        assert!(p.lat - min_lat > 0.0);
        assert!(max_lon - q.lon > 0.0);
    }

    #[test]
    fn test_hull_drops_interior_points() {
        let points = [
            c(55.0, 37.0),
            c(55.0, 38.0),
            c(56.0, 38.0),
            c(56.0, 37.0),
            c(55.5, 37.5),
            c(55.2, 37.8),
        ];
        let b = boundary(&points);

        assert_eq!(b.method, BoundaryMethod::ConvexHull);
        assert_eq!(b.vertices.len(), 5);
        assert!(b.is_closed());
        assert!(points.iter().all(|p| b.contains(*p)));
        assert!((b.area() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_scattered_points_hull() {
        let outer = [
            c(55.60, 37.40),
            c(55.58, 37.70),
            c(55.75, 37.90),
            c(55.92, 37.72),
            c(55.90, 37.38),
            c(55.78, 37.30),
        ];
        let points = [
            c(55.70, 37.55),
            outer[3],
            c(55.66, 37.45),
            outer[0],
            c(55.85, 37.50),
            outer[4],
            c(55.74, 37.80),
            outer[1],
            c(55.80, 37.60),
            outer[5],
            c(55.62, 37.62),
            outer[2],
        ];
        let b = boundary(&points);

        assert_eq!(b.method, BoundaryMethod::ConvexHull);
        assert_eq!(b.point_count, 12);
        assert_eq!(b.vertices.len(), 7);
        assert!(b.is_closed());
        assert!(points.iter().all(|p| b.contains(*p)));
        for v in &b.vertices[..6] {
            assert!(outer.contains(v), "unexpected hull vertex {:?}", v);
        }
        let bbox_area = (55.92 - 55.58) * (37.90 - 37.30);
        assert!(b.area() > 0.0 && b.area() < bbox_area);
    }

    #[test]
    fn test_triangle_has_four_vertices() {
        let b = boundary(&[c(55.0, 37.0), c(55.0, 38.0), c(56.0, 37.5)]);
        assert_eq!(b.method, BoundaryMethod::ConvexHull);
        assert_eq!(b.vertices.len(), 4);
        assert!(b.is_closed());
    }

    #[test]
    fn test_collinear_points_fall_back_to_bounding_box() {
        let points = [c(55.0, 37.0), c(55.1, 37.1), c(55.2, 37.2)];
        let b = boundary(&points);

        assert_eq!(b.method, BoundaryMethod::BoundingBoxFallback);
        assert_eq!(b.vertices.len(), 5);
        assert!(points.iter().all(|p| b.contains(*p)));
    }

    #[test]
    fn test_coincident_points_fall_back() {
        let b = boundary(&[c(55.0, 37.0); 3]);
        assert_eq!(b.method, BoundaryMethod::BoundingBoxFallback);
        assert!(b.area() > 0.0);
    }

    #[test]
    fn test_ring_ordered_counter_clockwise() {
        let hull = convex_hull(&[c(0.0, 0.0), c(0.0, 2.0), c(2.0, 2.0), c(2.0, 0.0), c(1.0, 1.0)])
            .unwrap();
        let ring = close_ring_by_angle(hull);
        // Positive signed area means counter-clockwise
        let signed: f64 = ring.windows(2).map(|w| w[0].lon * w[1].lat - w[1].lon * w[0].lat).sum();
        assert!(signed > 0.0);
    }

    #[test]
    fn test_generate_boundaries_follows_territories() {
        use crate::models::Category;
        let locations = vec![
            Location::new("P1", 55.0, 37.0, "X", Category::Convenience),
            Location::new("P2", 55.1, 37.2, "X", Category::Convenience),
        ];
        let territories = vec![
            Territory {
                city: "X".to_string(),
                label: "X-West".to_string(),
                agent_id: "A".to_string(),
                location_ids: vec!["P1".to_string(), "P2".to_string()],
            },
            Territory {
                city: "X".to_string(),
                label: "X-Center".to_string(),
                agent_id: "B".to_string(),
                location_ids: Vec::new(),
            },
        ];

        let boundaries = generate_boundaries(&territories, &locations, MARGIN);

        assert_eq!(boundaries.len(), 2);
        assert_eq!(boundaries[0].method, BoundaryMethod::Rectangle);
        assert_eq!(boundaries[0].point_count, 2);
        assert_eq!(boundaries[1].method, BoundaryMethod::Empty);
    }

    #[cfg(all(test, feature = "proptest"))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: every non-empty boundary is closed and holds its points
            #[test]
            fn prop_boundary_closed_and_containing(
                raw in prop::collection::vec((41.0f64..82.0, 19.0f64..180.0), 1..40)
            ) {
                let points: Vec<Coordinates> =
                    raw.iter().map(|&(lat, lon)| Coordinates::new(lat, lon)).collect();
                let (vertices, _) = territory_polygon(&points, MARGIN);

                prop_assert!(vertices.len() >= 4);
                prop_assert_eq!(vertices.first(), vertices.last());
                for p in &points {
                    prop_assert!(ring_contains(&vertices, *p));
                }
            }
        }
    }
}
