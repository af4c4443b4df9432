//! Front/back ordering over the element set.
//!
//! Rendering order is a pure function of z-index (see
//! [`Scene::list_ordered_by_z`]); these operations only rewrite one key.

use crate::{ElementId, Scene};

impl Scene {
    /// Lowest and highest z-index among live elements.
    #[must_use]
    pub fn z_bounds(&self) -> Option<(i32, i32)> {
        let mut zs = self.elements().map(|e| e.transform.z_index);
        let first = zs.next()?;
        Some(zs.fold((first, first), |(lo, hi), z| (lo.min(z), hi.max(z))))
    }

    /// Set the element's z-index to one above the current maximum.
    ///
    /// Returns the new z-index, or `None` if the element is gone.
    pub fn bring_to_front(&mut self, id: ElementId) -> Option<i32> {
        let (_, hi) = self.z_bounds()?;
        let element = self.get_element_mut(id)?;
        element.transform.z_index = hi.saturating_add(1);
        tracing::debug!("Element {id} raised to z={}", element.transform.z_index);
        Some(element.transform.z_index)
    }

    /// Set the element's z-index to one below the current minimum.
    ///
    /// Returns the new z-index, or `None` if the element is gone.
    pub fn send_to_back(&mut self, id: ElementId) -> Option<i32> {
        let (lo, _) = self.z_bounds()?;
        let element = self.get_element_mut(id)?;
        element.transform.z_index = lo.saturating_sub(1);
        tracing::debug!("Element {id} lowered to z={}", element.transform.z_index);
        Some(element.transform.z_index)
    }
}
