//! Pan/zoom transform between screen and board coordinates.

use kurbo::{Affine, Point, Vec2};
use serde::{Deserialize, Serialize};

/// Viewport state of a replica's canvas.
///
/// Pointer samples arrive in screen space; tools convert them with
/// [`Viewport::screen_to_world`] before handing them to the board.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Pan offset in screen pixels.
    pub offset: Vec2,
    /// Zoom factor (1.0 = 100%).
    pub scale: f64,
    /// Minimum allowed zoom.
    pub min_scale: f64,
    /// Maximum allowed zoom.
    pub max_scale: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            scale: 1.0,
            min_scale: 0.1,
            max_scale: 10.0,
        }
    }
}

impl Viewport {
    pub fn new() -> Self {
        Self::default()
    }

    /// World → screen.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.scale)
    }

    /// Screen → world.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.scale) * Affine::translate(-self.offset)
    }

    /// Convert a screen point to board coordinates: `(p - offset) / scale`.
    pub fn screen_to_world(&self, screen_point: Point) -> Point {
        self.inverse_transform() * screen_point
    }

    /// Convert a board point to screen coordinates.
    pub fn world_to_screen(&self, world_point: Point) -> Point {
        self.transform() * world_point
    }

    /// Pan by a delta in screen coordinates.
    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Zoom by `factor`, keeping the given screen point fixed.
    pub fn zoom_at(&mut self, screen_point: Point, factor: f64) {
        let new_scale = (self.scale * factor).clamp(self.min_scale, self.max_scale);
        if (new_scale - self.scale).abs() < f64::EPSILON {
            return;
        }

        let world_point = self.screen_to_world(screen_point);
        self.scale = new_scale;

        let new_screen = self.world_to_screen(world_point);
        self.offset += Vec2::new(screen_point.x - new_screen.x, screen_point.y - new_screen.y);
    }
}
