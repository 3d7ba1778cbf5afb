//! Resolution of move/rotate/resize gestures into persisted geometry.

use crate::element::{Element, Shape};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// A move/rotate/resize gesture as reported by a transform handle.
///
/// Position and rotation are absolute; scale factors are relative to the
/// geometry the gesture started from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformGesture {
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl TransformGesture {
    /// Identity gesture anchored at an element's current placement.
    pub fn at(element: &Element) -> Self {
        Self {
            x: element.x,
            y: element.y,
            rotation: element.rotation,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }

    pub fn reset_scale(&mut self) {
        self.scale_x = 1.0;
        self.scale_y = 1.0;
    }
}

fn text_multipliers(original: &Element, gesture: &TransformGesture) -> (f64, f64) {
    (
        original.scale_x.unwrap_or(1.0) * gesture.scale_x,
        original.scale_y.unwrap_or(1.0) * gesture.scale_y,
    )
}

/// Live preview of a gesture in progress: placement from the gesture, scale
/// carried as transient multipliers.
pub fn preview(original: &Element, gesture: &TransformGesture) -> Element {
    let mut element = original.clone();
    element.x = gesture.x;
    element.y = gesture.y;
    element.rotation = gesture.rotation;
    let (sx, sy) = match original.shape {
        Shape::Text { .. } => text_multipliers(original, gesture),
        _ => (gesture.scale_x, gesture.scale_y),
    };
    element.scale_x = Some(sx);
    element.scale_y = Some(sy);
    element
}

/// Bake a finished gesture into `original`'s geometry and reset the
/// gesture's scale to (1, 1).
///
/// Text keeps its scale as persistent multipliers; every other type folds
/// the scale into its dimensions and drops the multipliers.
pub fn resolve(original: &Element, gesture: &mut TransformGesture) -> Element {
    let (sx, sy) = (gesture.scale_x, gesture.scale_y);
    let mut element = original.clone();
    element.x = gesture.x;
    element.y = gesture.y;
    element.rotation = gesture.rotation;
    element.scale_x = None;
    element.scale_y = None;

    match &mut element.shape {
        Shape::Rectangle { width, height } | Shape::Image { width, height, .. } => {
            *width = (*width * sx).abs();
            *height = (*height * sy).abs();
        }
        Shape::Circle { radius } => {
            *radius = (*radius * sx.max(sy)).abs();
        }
        Shape::Line { points } | Shape::Polygon { points } => {
            for p in points.iter_mut() {
                *p = Point::new(p.x * sx, p.y * sy);
            }
        }
        Shape::Text { .. } => {
            let (tx, ty) = text_multipliers(original, gesture);
            element.scale_x = Some(tx);
            element.scale_y = Some(ty);
        }
    }

    gesture.reset_scale();
    element
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gesture(x: f64, y: f64, rotation: f64, scale_x: f64, scale_y: f64) -> TransformGesture {
        TransformGesture {
            x,
            y,
            rotation,
            scale_x,
            scale_y,
        }
    }

    #[test]
    fn test_rectangle_dimensions_absolute() {
        let rect = Element::rectangle(0.0, 0.0, 100.0, 50.0).with_id("r");
        let mut g = gesture(10.0, 20.0, 45.0, -2.0, 0.5);
        let resolved = resolve(&rect, &mut g);

        assert_eq!(resolved.shape, Shape::Rectangle { width: 200.0, height: 25.0 });
        assert_eq!(resolved.position(), Point::new(10.0, 20.0));
        assert_eq!(resolved.rotation, 45.0);
        assert_eq!(resolved.scale_x, None);
        assert_eq!((g.scale_x, g.scale_y), (1.0, 1.0));
    }

    #[test]
    fn test_circle_uses_larger_factor() {
        let circle = Element::circle(5.0, 5.0, 10.0).with_id("c");
        let mut g = gesture(5.0, 5.0, 0.0, 1.5, 3.0);
        assert_eq!(resolve(&circle, &mut g).shape, Shape::Circle { radius: 30.0 });
    }

    #[test]
    fn test_line_points_scaled_independently() {
        let line = Element::line(vec![Point::new(0.0, 0.0), Point::new(10.0, 10.0)]).with_id("l");
        let mut g = gesture(0.0, 0.0, 0.0, 2.0, 3.0);
        let resolved = resolve(&line, &mut g);
        assert_eq!(
            resolved.shape,
            Shape::Line {
                points: vec![Point::new(0.0, 0.0), Point::new(20.0, 30.0)]
            }
        );
    }

    #[test]
    fn test_text_accumulates_multipliers() {
        let text = Element::text(0.0, 0.0, "hello").with_id("t");
        let mut g = gesture(0.0, 0.0, 0.0, 2.0, 2.0);
        let once = resolve(&text, &mut g);
        assert_eq!((once.scale_x, once.scale_y), (Some(2.0), Some(2.0)));

        g.scale_x = 1.5;
        let twice = resolve(&once, &mut g);
        assert_eq!((twice.scale_x, twice.scale_y), (Some(3.0), Some(2.0)));
    }

    #[test]
    fn test_preview_does_not_touch_geometry() {
        let rect = Element::rectangle(0.0, 0.0, 100.0, 50.0).with_id("r");
        let previewed = preview(&rect, &gesture(3.0, 4.0, 10.0, 2.0, 2.0));
        assert_eq!(previewed.shape, rect.shape);
        assert_eq!(previewed.scale_x, Some(2.0));
        assert_eq!(previewed.position(), Point::new(3.0, 4.0));
    }
}
