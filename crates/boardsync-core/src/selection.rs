//! Selection set and lasso selection.

use crate::element::{Element, ElementId, Shape};
use crate::geometry::{any_point_in_polygon, close_polygon, point_in_polygon};
use crate::viewport::Viewport;
use kurbo::Point;
use std::time::{Duration, Instant};

/// Minimum number of lasso vertices needed to classify anything.
pub const MIN_LASSO_VERTICES: usize = 3;

/// Ordered set of selected element ids plus the primary element.
///
/// Non-empty selections always have a primary that is a member; an empty
/// selection has none.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<ElementId>,
    primary: Option<ElementId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select exactly one element.
    pub fn select_only(&mut self, id: impl Into<ElementId>) {
        let id = id.into();
        self.ids = vec![id.clone()];
        self.primary = Some(id);
    }

    /// Replace the selection; the first id becomes primary.
    pub fn set(&mut self, ids: Vec<ElementId>) {
        let mut unique: Vec<ElementId> = Vec::with_capacity(ids.len());
        for id in ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        self.primary = unique.first().cloned();
        self.ids = unique;
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.primary = None;
    }

    pub fn remove(&mut self, id: &str) {
        self.retain(|other| other != id);
    }

    /// Keep only ids matching `keep`. A dropped primary is reassigned to the
    /// first remaining member.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.ids.retain(|id| keep(id));
        let primary_kept = self
            .primary
            .as_ref()
            .is_some_and(|p| self.ids.contains(p));
        if !primary_kept {
            self.primary = self.ids.first().cloned();
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|s| s == id)
    }

    pub fn ids(&self) -> &[ElementId] {
        &self.ids
    }

    pub fn primary(&self) -> Option<&str> {
        self.primary.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }
}

/// Lasso gesture state.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum LassoState {
    #[default]
    Idle,
    Drawing {
        /// Vertices in board coordinates.
        points: Vec<Point>,
        last_sample: Instant,
    },
}

/// Freehand lasso tracking pointer samples.
#[derive(Debug, Clone, Default)]
pub struct Lasso {
    state: LassoState,
}

impl Lasso {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &LassoState {
        &self.state
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.state, LassoState::Drawing { .. })
    }

    /// Start a lasso at a screen-space pointer sample. Restarts any lasso in
    /// progress.
    pub fn begin(&mut self, screen_point: Point, viewport: &Viewport, now: Instant) {
        self.state = LassoState::Drawing {
            points: vec![viewport.screen_to_world(screen_point)],
            last_sample: now,
        };
    }

    /// Append a screen-space sample. Ignored when idle.
    pub fn extend(&mut self, screen_point: Point, viewport: &Viewport, now: Instant) {
        if let LassoState::Drawing {
            points,
            last_sample,
        } = &mut self.state
        {
            points.push(viewport.screen_to_world(screen_point));
            *last_sample = now;
        }
    }

    /// The board-space vertices collected so far.
    pub fn points(&self) -> &[Point] {
        match &self.state {
            LassoState::Drawing { points, .. } => points,
            LassoState::Idle => &[],
        }
    }

    /// End the gesture and return the closed polygon, or `None` when fewer
    /// than [`MIN_LASSO_VERTICES`] were collected. Always returns to idle.
    pub fn finish(&mut self) -> Option<Vec<Point>> {
        match std::mem::take(&mut self.state) {
            LassoState::Drawing { mut points, .. } if points.len() >= MIN_LASSO_VERTICES => {
                close_polygon(&mut points);
                Some(points)
            }
            _ => None,
        }
    }

    pub fn cancel(&mut self) {
        self.state = LassoState::Idle;
    }

    /// Whether a drawing lasso has been idle longer than `timeout`.
    pub fn is_expired(&self, now: Instant, timeout: Duration) -> bool {
        match &self.state {
            LassoState::Drawing { last_sample, .. } => {
                now.saturating_duration_since(*last_sample) > timeout
            }
            LassoState::Idle => false,
        }
    }
}

/// Whether the lasso polygon captures an element.
///
/// Boxes match on their center or any corner (rotation ignored), circles and
/// text on their position, lines and polygons on any vertex. Transient
/// elements never match.
pub fn element_in_lasso(element: &Element, polygon: &[Point]) -> bool {
    if element.is_transient() {
        return false;
    }
    match &element.shape {
        Shape::Rectangle { .. } | Shape::Image { .. } => match element.frame() {
            Some(frame) => {
                let probes = [
                    frame.center(),
                    Point::new(frame.x0, frame.y0),
                    Point::new(frame.x1, frame.y0),
                    Point::new(frame.x1, frame.y1),
                    Point::new(frame.x0, frame.y1),
                ];
                any_point_in_polygon(probes, polygon)
            }
            None => false,
        },
        Shape::Circle { .. } | Shape::Text { .. } => point_in_polygon(element.position(), polygon),
        Shape::Line { .. } | Shape::Polygon { .. } => {
            any_point_in_polygon(element.vertices(), polygon)
        }
    }
}

/// Ids of the elements captured by `polygon`, in page order.
pub fn elements_in_lasso(elements: &[Element], polygon: &[Point]) -> Vec<ElementId> {
    elements
        .iter()
        .filter(|e| element_in_lasso(e, polygon))
        .map(|e| e.id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Vec2;

    fn square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(100.0, 100.0),
            Point::new(0.0, 100.0),
            Point::new(0.0, 0.0),
        ]
    }

    #[test]
    fn test_rectangle_center_inside_square() {
        let rect = Element::rectangle(40.0, 40.0, 10.0, 10.0).with_id("r");
        assert!(element_in_lasso(&rect, &square()));
    }

    #[test]
    fn test_rectangle_corner_is_enough() {
        let rect = Element::rectangle(90.0, 90.0, 50.0, 50.0).with_id("r");
        assert!(element_in_lasso(&rect, &square()));
        let far = Element::rectangle(150.0, 150.0, 10.0, 10.0).with_id("far");
        assert!(!element_in_lasso(&far, &square()));
    }

    #[test]
    fn test_circle_and_text_use_position() {
        assert!(element_in_lasso(&Element::circle(50.0, 50.0, 500.0).with_id("c"), &square()));
        assert!(!element_in_lasso(&Element::circle(150.0, 50.0, 500.0).with_id("c"), &square()));
        assert!(element_in_lasso(&Element::text(10.0, 10.0, "hi").with_id("t"), &square()));
    }

    #[test]
    fn test_line_vertices_are_offset() {
        let mut line = Element::line(vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]).with_id("l");
        line.x = 200.0;
        assert!(!element_in_lasso(&line, &square()));
        line.x = 50.0;
        line.y = 50.0;
        assert!(element_in_lasso(&line, &square()));
    }

    #[test]
    fn test_polygon_elements_are_classified() {
        let poly = Element::polygon(vec![
            Point::new(90.0, 90.0),
            Point::new(200.0, 90.0),
            Point::new(200.0, 200.0),
        ])
        .with_id("p");
        assert!(element_in_lasso(&poly, &square()));
    }

    #[test]
    fn test_transient_never_selected() {
        let preview = Element::line(vec![Point::new(10.0, 10.0), Point::new(20.0, 20.0)])
            .with_id("temp-lasso-line-1");
        assert!(!element_in_lasso(&preview, &square()));
    }

    #[test]
    fn test_selection_primary_invariant() {
        let mut selection = Selection::new();
        selection.set(vec!["a".into(), "b".into(), "a".into()]);
        assert_eq!(selection.ids(), ["a", "b"]);
        assert_eq!(selection.primary(), Some("a"));

        selection.remove("a");
        assert_eq!(selection.primary(), Some("b"));

        selection.remove("b");
        assert!(selection.is_empty());
        assert_eq!(selection.primary(), None);
    }

    #[test]
    fn test_lasso_converts_screen_points() {
        let viewport = Viewport {
            offset: Vec2::new(10.0, 10.0),
            scale: 2.0,
            ..Viewport::default()
        };
        let now = Instant::now();
        let mut lasso = Lasso::new();
        lasso.begin(Point::new(10.0, 10.0), &viewport, now);
        lasso.extend(Point::new(210.0, 10.0), &viewport, now);
        lasso.extend(Point::new(210.0, 210.0), &viewport, now);
        assert_eq!(lasso.points()[1], Point::new(100.0, 0.0));

        let polygon = lasso.finish().unwrap();
        assert_eq!(polygon.len(), 4);
        assert_eq!(polygon.first(), polygon.last());
        assert!(!lasso.is_drawing());
    }

    #[test]
    fn test_lasso_needs_three_vertices() {
        let viewport = Viewport::default();
        let now = Instant::now();
        let mut lasso = Lasso::new();
        lasso.begin(Point::new(0.0, 0.0), &viewport, now);
        lasso.extend(Point::new(5.0, 5.0), &viewport, now);
        assert!(lasso.finish().is_none());
        assert!(lasso.finish().is_none());
    }

    #[test]
    fn test_lasso_expiry() {
        let viewport = Viewport::default();
        let now = Instant::now();
        let timeout = Duration::from_secs(30);
        let mut lasso = Lasso::new();
        assert!(!lasso.is_expired(now, timeout));

        lasso.begin(Point::ZERO, &viewport, now);
        assert!(!lasso.is_expired(now + Duration::from_secs(10), timeout));
        assert!(lasso.is_expired(now + Duration::from_secs(31), timeout));

        lasso.extend(Point::new(1.0, 1.0), &viewport, now + Duration::from_secs(20));
        assert!(!lasso.is_expired(now + Duration::from_secs(31), timeout));
    }
}
