//! Pure geometry helpers used by selection.

use kurbo::Point;

/// Check whether `point` lies inside `polygon` using ray casting.
///
/// A horizontal ray is cast from the point towards +x and every polygon edge
/// it crosses toggles the result. Each edge covers the half-open vertical
/// interval between its endpoints, so a vertex lying exactly on the ray is
/// counted once. The polygon may be given open or closed (first vertex
/// repeated at the end); the closing edge is implied either way.
pub fn point_in_polygon(point: Point, polygon: &[Point]) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let a = polygon[i];
        let b = polygon[j];
        if (a.y > point.y) != (b.y > point.y) {
            let cross_x = (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x;
            if point.x < cross_x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Check whether any of `points` lies inside `polygon`.
pub fn any_point_in_polygon<I>(points: I, polygon: &[Point]) -> bool
where
    I: IntoIterator<Item = Point>,
{
    points.into_iter().any(|p| point_in_polygon(p, polygon))
}

/// Close a polygon by appending its first vertex, unless it is already closed.
pub fn close_polygon(polygon: &mut Vec<Point>) {
    if let (Some(&first), Some(&last)) = (polygon.first(), polygon.last()) {
        if polygon.len() > 1 && first != last {
            polygon.push(first);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(100.0, 100.0),
            Point::new(0.0, 100.0),
        ]
    }

    #[test]
    fn test_point_inside_square() {
        assert!(point_in_polygon(Point::new(45.0, 45.0), &square()));
        assert!(!point_in_polygon(Point::new(150.0, 45.0), &square()));
        assert!(!point_in_polygon(Point::new(-1.0, 50.0), &square()));
    }

    #[test]
    fn test_closed_and_open_agree() {
        let open = square();
        let mut closed = square();
        close_polygon(&mut closed);
        assert_eq!(closed.len(), 5);

        for p in [
            Point::new(45.0, 45.0),
            Point::new(99.0, 1.0),
            Point::new(101.0, 50.0),
            Point::new(50.0, -10.0),
        ] {
            assert_eq!(point_in_polygon(p, &open), point_in_polygon(p, &closed));
        }
    }

    #[test]
    fn test_invariant_under_rotation() {
        let polygon = vec![
            Point::new(0.0, 0.0),
            Point::new(60.0, 10.0),
            Point::new(100.0, 80.0),
            Point::new(40.0, 50.0),
            Point::new(10.0, 90.0),
        ];
        let probes = [
            Point::new(30.0, 20.0),
            Point::new(40.0, 50.0),
            Point::new(70.0, 40.0),
            Point::new(12.0, 80.0),
            Point::new(90.0, 20.0),
            Point::new(50.0, 60.0),
        ];

        for shift in 0..polygon.len() {
            let mut rotated = polygon.clone();
            rotated.rotate_left(shift);
            for &p in &probes {
                assert_eq!(
                    point_in_polygon(p, &polygon),
                    point_in_polygon(p, &rotated),
                    "shift {shift} probe {p:?}"
                );
            }
        }
    }

    #[test]
    fn test_ray_through_vertex_counted_once() {
        // Diamond whose left/right vertices sit exactly on the ray y = 50.
        let diamond = vec![
            Point::new(50.0, 0.0),
            Point::new(100.0, 50.0),
            Point::new(50.0, 100.0),
            Point::new(0.0, 50.0),
        ];
        assert!(point_in_polygon(Point::new(50.0, 50.0), &diamond));
        assert!(!point_in_polygon(Point::new(-20.0, 50.0), &diamond));
    }

    #[test]
    fn test_degenerate_polygon() {
        let line = vec![Point::new(0.0, 0.0), Point::new(10.0, 10.0)];
        assert!(!point_in_polygon(Point::new(5.0, 5.0), &line));
        assert!(!point_in_polygon(Point::new(5.0, 5.0), &[]));
    }

    #[test]
    fn test_close_polygon_idempotent() {
        let mut polygon = square();
        close_polygon(&mut polygon);
        close_polygon(&mut polygon);
        assert_eq!(polygon.len(), 5);
        assert_eq!(polygon.first(), polygon.last());
    }
}
