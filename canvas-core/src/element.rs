//! Canvas elements - the building blocks of the canvas.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimum width of an image element, keeps resize handles usable.
pub const IMAGE_MIN_WIDTH: f32 = 50.0;
/// Minimum height of an image element.
pub const IMAGE_MIN_HEIGHT: f32 = 50.0;
/// Minimum width of a text element.
pub const TEXT_MIN_WIDTH: f32 = 50.0;
/// Minimum height of a text element.
pub const TEXT_MIN_HEIGHT: f32 = 20.0;

/// Content shown by a freshly inserted text element, and committed in place
/// of an empty edit.
pub const TEXT_PLACEHOLDER: &str = "Click to edit text";

/// Unique identifier for an element.
///
/// Backed by a v4 UUID, so identifiers are never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId(Uuid);

impl ElementId {
    /// Create a new unique element ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One of the four resize handles drawn on the selected element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    /// Top-left handle.
    TopLeft,
    /// Top-right handle.
    TopRight,
    /// Bottom-left handle.
    BottomLeft,
    /// Bottom-right handle.
    BottomRight,
}

impl Corner {
    /// All corners, in hit-test order.
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    /// Sign applied to the horizontal pointer delta before it is added to the width.
    #[must_use]
    pub const fn width_sign(self) -> f32 {
        match self {
            Corner::TopLeft | Corner::BottomLeft => -1.0,
            Corner::TopRight | Corner::BottomRight => 1.0,
        }
    }

    /// Sign applied to the vertical pointer delta before it is added to the height.
    #[must_use]
    pub const fn height_sign(self) -> f32 {
        match self {
            Corner::TopLeft | Corner::TopRight => -1.0,
            Corner::BottomLeft | Corner::BottomRight => 1.0,
        }
    }
}

/// Position, size and stacking key of an element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// X position (pixels from the canvas left edge).
    pub x: f32,
    /// Y position (pixels from the canvas top edge).
    pub y: f32,
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
    /// Z-index for layering. Only relative order matters.
    pub z_index: i32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
            z_index: 0,
        }
    }
}

impl Transform {
    /// Check if a point (in canvas coordinates) is within the bounding box.
    #[must_use]
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }

    /// Canvas coordinates of a corner.
    #[must_use]
    pub fn corner_point(&self, corner: Corner) -> (f32, f32) {
        match corner {
            Corner::TopLeft => (self.x, self.y),
            Corner::TopRight => (self.x + self.width, self.y),
            Corner::BottomLeft => (self.x, self.y + self.height),
            Corner::BottomRight => (self.x + self.width, self.y + self.height),
        }
    }
}

/// Font weight of a text element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    /// Regular weight.
    #[default]
    Normal,
    /// Bold weight.
    Bold,
}

impl FontWeight {
    /// The other weight.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Normal => Self::Bold,
            Self::Bold => Self::Normal,
        }
    }

    /// CSS/SVG keyword.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Bold => "bold",
        }
    }
}

/// Font style of a text element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    /// Upright.
    #[default]
    Normal,
    /// Italic.
    Italic,
}

impl FontStyle {
    /// The other style.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Normal => Self::Italic,
            Self::Italic => Self::Normal,
        }
    }

    /// CSS/SVG keyword.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Italic => "italic",
        }
    }
}

/// A generated image placed on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageContent {
    /// Reference to the bitmap currently displayed (may carry a cache-busting suffix).
    pub source_ref: String,
    /// The feed path this element was inserted from.
    pub origin: String,
    /// The code/query that produced the image, if known.
    pub recipe: Option<String>,
    /// The natural-language ask behind the image, if known.
    pub query: Option<String>,
}

impl ImageContent {
    /// Whether the image carries a recipe worth showing in the preview overlay.
    #[must_use]
    pub fn has_recipe(&self) -> bool {
        self.recipe.as_deref().is_some_and(|r| !r.trim().is_empty())
    }
}

/// An editable text block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    /// Text content.
    pub content: String,
    /// Font family name.
    pub font_family: String,
    /// Font size in points.
    pub font_size_pt: f32,
    /// Text color as hex.
    pub color: String,
    /// Font weight.
    pub font_weight: FontWeight,
    /// Font style.
    pub font_style: FontStyle,
}

impl Default for TextContent {
    fn default() -> Self {
        Self {
            content: TEXT_PLACEHOLDER.to_string(),
            font_family: "Arial".to_string(),
            font_size_pt: 16.0,
            color: "#000000".to_string(),
            font_weight: FontWeight::Normal,
            font_style: FontStyle::Normal,
        }
    }
}

/// The type of content an element contains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ElementKind {
    /// A generated image.
    Image(ImageContent),
    /// A text block.
    Text(TextContent),
}

/// A canvas element with content and transform.
///
/// Selection is not stored here; it is derived from the single selected id
/// held by the interaction controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Unique identifier.
    pub id: ElementId,
    /// Element content type.
    pub kind: ElementKind,
    /// Position, size and z-index.
    pub transform: Transform,
}

impl Element {
    /// Create a new element with the given kind.
    #[must_use]
    pub fn new(kind: ElementKind) -> Self {
        Self {
            id: ElementId::new(),
            kind,
            transform: Transform::default(),
        }
    }

    /// Create an image element shown from `source_ref`.
    #[must_use]
    pub fn image(
        source_ref: impl Into<String>,
        recipe: Option<String>,
        query: Option<String>,
    ) -> Self {
        let source_ref = source_ref.into();
        Self::new(ElementKind::Image(ImageContent {
            origin: source_ref.clone(),
            source_ref,
            recipe,
            query,
        }))
    }

    /// Create a text element with default styling.
    #[must_use]
    pub fn text() -> Self {
        Self::new(ElementKind::Text(TextContent::default()))
    }

    /// Set the transform.
    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Variant-specific minimum `(width, height)`.
    #[must_use]
    pub fn min_size(&self) -> (f32, f32) {
        match &self.kind {
            ElementKind::Image(_) => (IMAGE_MIN_WIDTH, IMAGE_MIN_HEIGHT),
            ElementKind::Text(_) => (TEXT_MIN_WIDTH, TEXT_MIN_HEIGHT),
        }
    }

    /// Raise width and height to the variant floor.
    pub fn enforce_min_size(&mut self) {
        let (min_w, min_h) = self.min_size();
        self.transform.width = self.transform.width.max(min_w);
        self.transform.height = self.transform.height.max(min_h);
    }

    /// Image payload, if this is an image.
    #[must_use]
    pub fn as_image(&self) -> Option<&ImageContent> {
        match &self.kind {
            ElementKind::Image(image) => Some(image),
            ElementKind::Text(_) => None,
        }
    }

    /// Text payload, if this is a text block.
    #[must_use]
    pub fn as_text(&self) -> Option<&TextContent> {
        match &self.kind {
            ElementKind::Text(text) => Some(text),
            ElementKind::Image(_) => None,
        }
    }

    /// Short variant name, used in logs and the status line.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            ElementKind::Image(_) => "image",
            ElementKind::Text(_) => "text",
        }
    }

    /// Check if a point (in canvas coordinates) is within this element.
    #[must_use]
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        self.transform.contains_point(x, y)
    }
}
