//! The element model: every placed element, plus the session's removed-image set.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::element::Corner;
use crate::event::PointerTarget;
use crate::{CanvasError, CanvasResult, Element, ElementId, ElementPatch, Transform};

/// Offset between consecutive inserts so stacked elements stay individually selectable.
pub const CASCADE_STEP: f32 = 30.0;

/// Number of cascade steps before placement wraps back to the top row.
///
/// Each wrap starts a new diagonal shifted right by two steps, so no two
/// inserts share an origin.
pub const CASCADE_WRAP: usize = 10;

/// Half-size of the square hit area around each resize handle.
pub const HANDLE_RADIUS: f32 = 8.0;

const IMAGE_ORIGIN: (f32, f32) = (50.0, 50.0);
const IMAGE_SIZE: (f32, f32) = (300.0, 200.0);
const TEXT_ORIGIN: (f32, f32) = (100.0, 100.0);
const TEXT_SIZE: (f32, f32) = (200.0, 40.0);

/// Image sources the user explicitly deleted during this session.
///
/// Inbound feed items whose path is a member are never re-inserted until the
/// set is cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedImageSet {
    sources: BTreeSet<String>,
}

impl RemovedImageSet {
    /// Record a source as removed.
    pub fn insert(&mut self, source: impl Into<String>) {
        self.sources.insert(source.into());
    }

    /// Whether `source` was removed.
    #[must_use]
    pub fn contains(&self, source: &str) -> bool {
        self.sources.contains(source)
    }

    /// Forget every removed source, returning how many there were.
    pub fn clear(&mut self) -> usize {
        let count = self.sources.len();
        self.sources.clear();
        count
    }

    /// Number of removed sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether nothing has been removed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Iterate removed sources in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(String::as_str)
    }
}

/// All elements on the canvas and the canvas dimensions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scene {
    /// All elements, indexed by ID.
    elements: HashMap<ElementId, Element>,
    /// Insertion order; breaks z-index ties.
    order: Vec<ElementId>,
    /// Sources of images the user deleted.
    removed: RemovedImageSet,
    /// Inserts so far; never decremented.
    #[serde(default)]
    inserted: usize,
    /// Canvas width in pixels.
    pub width: f32,
    /// Canvas height in pixels.
    pub height: f32,
}

impl Scene {
    /// Create a new empty scene with the given canvas size.
    #[must_use]
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            elements: HashMap::new(),
            order: Vec::new(),
            removed: RemovedImageSet::default(),
            inserted: 0,
            width,
            height,
        }
    }

    /// Set the canvas dimensions.
    pub fn set_size(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    /// Add a fully built element to the scene.
    ///
    /// The element keeps its transform except for the size floor. An element
    /// whose id is already present is given a fresh id.
    pub fn add_element(&mut self, mut element: Element) -> ElementId {
        if self.elements.contains_key(&element.id) {
            tracing::warn!("Duplicate element id {}, assigning a new one", element.id);
            element.id = ElementId::new();
        }
        element.enforce_min_size();
        let id = element.id;
        self.order.push(id);
        self.elements.insert(id, element);
        id
    }

    /// Insert an image at the next cascade position, on top of everything else.
    pub fn insert_image(
        &mut self,
        source_ref: impl Into<String>,
        recipe: Option<String>,
        query: Option<String>,
    ) -> ElementId {
        let (x, y) = self.cascade_origin(IMAGE_ORIGIN);
        let element = Element::image(source_ref, recipe, query).with_transform(Transform {
            x,
            y,
            width: IMAGE_SIZE.0,
            height: IMAGE_SIZE.1,
            z_index: self.next_z_index(),
        });
        let id = self.add_element(element);
        tracing::debug!("Inserted image element {id} at ({x}, {y})");
        id
    }

    /// Insert a placeholder text block at the next cascade position.
    pub fn insert_text(&mut self) -> ElementId {
        let (x, y) = self.cascade_origin(TEXT_ORIGIN);
        let element = Element::text().with_transform(Transform {
            x,
            y,
            width: TEXT_SIZE.0,
            height: TEXT_SIZE.1,
            z_index: self.next_z_index(),
        });
        let id = self.add_element(element);
        tracing::debug!("Inserted text element {id} at ({x}, {y})");
        id
    }

    /// Next free cascade slot. Slots a live element already sits on are skipped.
    fn cascade_origin(&mut self, base: (f32, f32)) -> (f32, f32) {
        loop {
            let origin = cascade_slot(base, self.inserted);
            self.inserted += 1;
            let taken = self.elements.values().any(|e| {
                (e.transform.x - origin.0).abs() < f32::EPSILON
                    && (e.transform.y - origin.1).abs() < f32::EPSILON
            });
            if !taken {
                return origin;
            }
        }
    }

    fn next_z_index(&self) -> i32 {
        self.elements
            .values()
            .map(|e| e.transform.z_index)
            .max()
            .map_or(0, |z| z.saturating_add(1))
    }

    /// Apply a partial update to an element.
    ///
    /// Geometry changes are clamped so the element stays inside the canvas.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidPatch`] if the element is gone or the
    /// patch does not fit its variant.
    pub fn update(&mut self, id: ElementId, patch: &ElementPatch) -> CanvasResult<()> {
        let element = self
            .elements
            .get_mut(&id)
            .ok_or_else(|| CanvasError::InvalidPatch(format!("element {id} does not exist")))?;
        patch.apply_to(element)?;
        if patch.touches_geometry() {
            let resized = patch.width.is_some() || patch.height.is_some();
            clamp_to_canvas(element, self.width, self.height, resized);
        }
        Ok(())
    }

    /// Apply a JSON patch object to an element.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidPatch`] for unknown fields, a missing
    /// element, or fields foreign to the element's variant.
    pub fn update_json(&mut self, id: ElementId, value: &serde_json::Value) -> CanvasResult<()> {
        let patch = ElementPatch::from_json(value)?;
        self.update(id, &patch)
    }

    /// Remove an element. Removing an image records its sources in the
    /// removed-image set.
    ///
    /// # Errors
    ///
    /// Returns an error if the element is not found.
    pub fn remove(&mut self, id: ElementId) -> CanvasResult<Element> {
        let element = self
            .elements
            .remove(&id)
            .ok_or_else(|| CanvasError::ElementNotFound(id.to_string()))?;
        self.order.retain(|&eid| eid != id);
        if let Some(image) = element.as_image() {
            self.removed.insert(image.origin.clone());
            self.removed.insert(image.source_ref.clone());
        }
        tracing::debug!("Removed {} element {id}", element.kind_name());
        Ok(element)
    }

    /// Get an element by ID.
    #[must_use]
    pub fn get_element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    pub(crate) fn get_element_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(&id)
    }

    /// Whether an element with this id is live.
    #[must_use]
    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(&id)
    }

    /// All elements in insertion order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.order.iter().filter_map(|id| self.elements.get(id))
    }

    /// Elements in render order: ascending z-index, insertion order on ties.
    #[must_use]
    pub fn list_ordered_by_z(&self) -> Vec<&Element> {
        let mut ordered: Vec<&Element> = self.elements().collect();
        // stable sort keeps insertion order for equal keys
        ordered.sort_by_key(|e| e.transform.z_index);
        ordered
    }

    /// Find the topmost element at the given canvas coordinates.
    #[must_use]
    pub fn element_at(&self, x: f32, y: f32) -> Option<ElementId> {
        self.list_ordered_by_z()
            .into_iter()
            .rev()
            .find(|e| e.contains_point(x, y))
            .map(|e| e.id)
    }

    /// Resolve what a pointer at canvas coordinates lands on.
    ///
    /// Handles exist only on the selected element and win over any body.
    #[must_use]
    pub fn target_at(&self, x: f32, y: f32, selected: Option<ElementId>) -> PointerTarget {
        if let Some(element) = selected.and_then(|id| self.elements.get(&id)) {
            for corner in Corner::ALL {
                let (cx, cy) = element.transform.corner_point(corner);
                if (x - cx).abs() <= HANDLE_RADIUS && (y - cy).abs() <= HANDLE_RADIUS {
                    return PointerTarget::Handle(element.id, corner);
                }
            }
        }
        self.element_at(x, y)
            .map_or(PointerTarget::Background, PointerTarget::Element)
    }

    /// Whether a live image is displayed from, or was inserted from, `source`.
    #[must_use]
    pub fn has_image_source(&self, source: &str) -> bool {
        self.elements
            .values()
            .filter_map(Element::as_image)
            .any(|image| image.origin == source || image.source_ref == source)
    }

    /// Sources of images the user removed this session.
    #[must_use]
    pub fn removed_images(&self) -> &RemovedImageSet {
        &self.removed
    }

    /// Clear the removed-image set, returning how many entries were dropped.
    pub fn restore_removed_images(&mut self) -> usize {
        let count = self.removed.clear();
        tracing::debug!("Restored {count} removed image sources");
        count
    }

    /// Get the number of elements in the scene.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Check if the scene is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Serialize the scene to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> CanvasResult<String> {
        serde_json::to_string(self).map_err(CanvasError::Serialization)
    }

    /// Deserialize a scene from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn from_json(json: &str) -> CanvasResult<Self> {
        serde_json::from_str(json).map_err(CanvasError::Serialization)
    }
}

/// Origin of the `n`th insert.
#[allow(clippy::cast_precision_loss)]
fn cascade_slot(base: (f32, f32), n: usize) -> (f32, f32) {
    let step = (n % CASCADE_WRAP) as f32 * CASCADE_STEP;
    let shift = (n / CASCADE_WRAP) as f32 * 2.0 * CASCADE_STEP;
    (base.0 + step + shift, base.1 + step)
}

/// Keep an element inside `[0, width] x [0, height]`.
///
/// A resize is capped to the room right of and below the origin, with the
/// minimum size floor winning over the cap. The origin is then pulled back so
/// the element fits.
fn clamp_to_canvas(element: &mut Element, width: f32, height: f32, resized: bool) {
    let (min_w, min_h) = element.min_size();
    let tf = &mut element.transform;
    tf.x = tf.x.max(0.0);
    tf.y = tf.y.max(0.0);
    if resized {
        tf.width = tf.width.min(width - tf.x).max(min_w);
        tf.height = tf.height.min(height - tf.y).max(min_h);
    }
    tf.x = tf.x.min((width - tf.width).max(0.0));
    tf.y = tf.y.min((height - tf.height).max(0.0));
}
