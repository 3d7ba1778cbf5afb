//! Drawable elements and the page mapping that holds them.

mod style;

pub use style::{Color, ColorParseError, ElementStyle};

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Unique identifier of an element, unique across the whole document.
pub type ElementId = String;

/// Page number (1-based).
pub type PageNumber = u32;

/// Page number → elements in z-order (back to front).
pub type Pages = BTreeMap<PageNumber, Vec<Element>>;

/// Ids with this prefix belong to transient tool previews.
pub const TRANSIENT_ID_PREFIX: &str = "temp-";

/// Generate a fresh element id.
pub fn new_element_id() -> ElementId {
    Uuid::new_v4().to_string()
}

/// Element type discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Line,
    Rectangle,
    Circle,
    Image,
    Text,
    Polygon,
}

impl ElementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Line => "line",
            ElementKind::Rectangle => "rectangle",
            ElementKind::Circle => "circle",
            ElementKind::Image => "image",
            ElementKind::Text => "text",
            ElementKind::Polygon => "polygon",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-specific geometry of an element.
///
/// Point lists are relative to the element position and travel on the wire
/// as flat `[x0, y0, x1, y1, ...]` arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum Shape {
    Line {
        #[serde(with = "flat_points")]
        points: Vec<Point>,
    },
    Rectangle {
        width: f64,
        height: f64,
    },
    Circle {
        radius: f64,
    },
    Image {
        width: f64,
        height: f64,
        #[serde(default)]
        src: String,
    },
    Text {
        text: String,
        #[serde(default = "default_font_size")]
        font_size: f64,
    },
    Polygon {
        #[serde(with = "flat_points")]
        points: Vec<Point>,
    },
}

fn default_font_size() -> f64 {
    20.0
}

impl Shape {
    pub fn kind(&self) -> ElementKind {
        match self {
            Shape::Line { .. } => ElementKind::Line,
            Shape::Rectangle { .. } => ElementKind::Rectangle,
            Shape::Circle { .. } => ElementKind::Circle,
            Shape::Image { .. } => ElementKind::Image,
            Shape::Text { .. } => ElementKind::Text,
            Shape::Polygon { .. } => ElementKind::Polygon,
        }
    }
}

/// A drawable unit on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub id: ElementId,
    /// Position (top-left for boxes, center for circles, anchor for text,
    /// origin of the point list for lines and polygons).
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(flatten)]
    pub shape: Shape,
    /// Rotation in degrees.
    #[serde(default)]
    pub rotation: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_y: Option<f64>,
    #[serde(flatten)]
    pub style: ElementStyle,
}

impl Element {
    /// Create an element without an id. The board assigns one when the
    /// element is added.
    pub fn new(x: f64, y: f64, shape: Shape) -> Self {
        Self {
            id: ElementId::new(),
            x,
            y,
            shape,
            rotation: 0.0,
            scale_x: None,
            scale_y: None,
            style: ElementStyle::default(),
        }
    }

    pub fn rectangle(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(x, y, Shape::Rectangle { width, height })
    }

    pub fn circle(x: f64, y: f64, radius: f64) -> Self {
        Self::new(x, y, Shape::Circle { radius })
    }

    pub fn image(x: f64, y: f64, width: f64, height: f64, src: impl Into<String>) -> Self {
        Self::new(
            x,
            y,
            Shape::Image {
                width,
                height,
                src: src.into(),
            },
        )
    }

    pub fn text(x: f64, y: f64, text: impl Into<String>) -> Self {
        Self::new(
            x,
            y,
            Shape::Text {
                text: text.into(),
                font_size: default_font_size(),
            },
        )
    }

    pub fn line(points: Vec<Point>) -> Self {
        Self::new(0.0, 0.0, Shape::Line { points })
    }

    pub fn polygon(points: Vec<Point>) -> Self {
        Self::new(0.0, 0.0, Shape::Polygon { points })
    }

    /// Set the id (builder style).
    pub fn with_id(mut self, id: impl Into<ElementId>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the style (builder style).
    pub fn with_style(mut self, style: ElementStyle) -> Self {
        self.style = style;
        self
    }

    pub fn kind(&self) -> ElementKind {
        self.shape.kind()
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Whether this element is a tool preview that selection must ignore.
    pub fn is_transient(&self) -> bool {
        self.id.starts_with(TRANSIENT_ID_PREFIX)
    }

    /// Box of rectangles and images in board coordinates, ignoring rotation.
    pub fn frame(&self) -> Option<Rect> {
        match self.shape {
            Shape::Rectangle { width, height } | Shape::Image { width, height, .. } => {
                Some(Rect::new(self.x, self.y, self.x + width, self.y + height))
            }
            _ => None,
        }
    }

    /// Vertices of lines and polygons in board coordinates.
    pub fn vertices(&self) -> Vec<Point> {
        match &self.shape {
            Shape::Line { points } | Shape::Polygon { points } => points
                .iter()
                .map(|p| Point::new(p.x + self.x, p.y + self.y))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Serde adapter for `Vec<Point>` as a flat number array.
pub(crate) mod flat_points {
    use kurbo::Point;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(points: &[Point], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(points.iter().flat_map(|p| [p.x, p.y]))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Point>, D::Error> {
        let flat = Vec::<f64>::deserialize(deserializer)?;
        if flat.len() % 2 != 0 {
            return Err(D::Error::custom(format!(
                "point list has odd length {}",
                flat.len()
            )));
        }
        Ok(flat.chunks_exact(2).map(|c| Point::new(c[0], c[1])).collect())
    }
}
