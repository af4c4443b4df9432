//! Partial element updates.
//!
//! A patch names only the fields it changes. Fields that do not exist, or that
//! belong to the other element variant, make the whole patch invalid; nothing
//! is applied in that case.

use serde::{Deserialize, Serialize};

use crate::element::{Element, ElementKind, FontStyle, FontWeight};
use crate::{CanvasError, CanvasResult};

/// A partial merge applied to one element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElementPatch {
    /// New X position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    /// New Y position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    /// New width.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    /// New height.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    /// New stacking key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,

    /// Image only: new bitmap reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ref: Option<String>,
    /// Image only: new generation recipe.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe: Option<String>,
    /// Image only: new source query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,

    /// Text only: new content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Text only: new font family.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    /// Text only: new font size in points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size_pt: Option<f32>,
    /// Text only: new color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Text only: new weight.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<FontWeight>,
    /// Text only: new style.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_style: Option<FontStyle>,
}

impl ElementPatch {
    /// Patch that moves an element.
    #[must_use]
    pub fn position(x: f32, y: f32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    /// Patch that resizes an element.
    #[must_use]
    pub fn size(width: f32, height: f32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Self::default()
        }
    }

    /// Patch that replaces text content.
    #[must_use]
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// Parse a patch from JSON, rejecting unknown fields.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidPatch`] if the value is not a patch object.
    pub fn from_json(value: &serde_json::Value) -> CanvasResult<Self> {
        Self::deserialize(value).map_err(|e| CanvasError::InvalidPatch(e.to_string()))
    }

    /// Whether the patch moves or resizes the element.
    #[must_use]
    pub fn touches_geometry(&self) -> bool {
        self.x.is_some() || self.y.is_some() || self.width.is_some() || self.height.is_some()
    }

    fn touches_image_fields(&self) -> bool {
        self.source_ref.is_some() || self.recipe.is_some() || self.query.is_some()
    }

    fn touches_text_fields(&self) -> bool {
        self.content.is_some()
            || self.font_family.is_some()
            || self.font_size_pt.is_some()
            || self.color.is_some()
            || self.font_weight.is_some()
            || self.font_style.is_some()
    }

    fn validate_numbers(&self) -> CanvasResult<()> {
        let numbers = [
            ("x", self.x),
            ("y", self.y),
            ("width", self.width),
            ("height", self.height),
            ("font_size_pt", self.font_size_pt),
        ];
        for (name, value) in numbers {
            if value.is_some_and(|v| !v.is_finite()) {
                return Err(CanvasError::InvalidPatch(format!("{name} must be finite")));
            }
        }
        Ok(())
    }

    /// Check the patch against an element without modifying it.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidPatch`] for non-finite numbers or fields
    /// foreign to the element's variant.
    pub fn validate_for(&self, element: &Element) -> CanvasResult<()> {
        self.validate_numbers()?;
        match &element.kind {
            ElementKind::Image(_) if self.touches_text_fields() => Err(CanvasError::InvalidPatch(
                format!("text fields on image element {}", element.id),
            )),
            ElementKind::Text(_) if self.touches_image_fields() => Err(CanvasError::InvalidPatch(
                format!("image fields on text element {}", element.id),
            )),
            _ => Ok(()),
        }
    }

    /// Merge into `element`, then enforce the variant's minimum size.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidPatch`] if validation fails; the element
    /// is left untouched.
    pub fn apply_to(&self, element: &mut Element) -> CanvasResult<()> {
        self.validate_for(element)?;

        let tf = &mut element.transform;
        if let Some(x) = self.x {
            tf.x = x;
        }
        if let Some(y) = self.y {
            tf.y = y;
        }
        if let Some(width) = self.width {
            tf.width = width;
        }
        if let Some(height) = self.height {
            tf.height = height;
        }
        if let Some(z) = self.z_index {
            tf.z_index = z;
        }

        match &mut element.kind {
            ElementKind::Image(image) => {
                if let Some(source_ref) = &self.source_ref {
                    image.source_ref.clone_from(source_ref);
                }
                if let Some(recipe) = &self.recipe {
                    image.recipe = Some(recipe.clone());
                }
                if let Some(query) = &self.query {
                    image.query = Some(query.clone());
                }
            }
            ElementKind::Text(text) => {
                if let Some(content) = &self.content {
                    text.content.clone_from(content);
                }
                if let Some(family) = &self.font_family {
                    text.font_family.clone_from(family);
                }
                if let Some(size) = self.font_size_pt {
                    text.font_size_pt = size;
                }
                if let Some(color) = &self.color {
                    text.color.clone_from(color);
                }
                if let Some(weight) = self.font_weight {
                    text.font_weight = weight;
                }
                if let Some(style) = self.font_style {
                    text.font_style = style;
                }
            }
        }

        element.enforce_min_size();
        Ok(())
    }
}
