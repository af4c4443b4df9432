//! Inbound feed reconciliation.
//!
//! The query/upload side delivers descriptors of generated images and
//! plain messages. Images are inserted unless an element already shows that
//! source or the user removed it earlier in the session.

use serde::{Deserialize, Serialize};

use crate::{CanvasError, CanvasResult, ElementId, Scene};

/// One inbound descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FeedItem {
    /// A generated image and the recipe behind it.
    Image {
        /// Where the image lives.
        #[serde(rename = "imagePath")]
        image_path: String,
        /// Generation recipe (code).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        /// Natural-language query that led to the image.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        query: Option<String>,
    },
    /// A text message for the user.
    Message {
        /// Message body.
        message: String,
    },
}

impl FeedItem {
    /// Image descriptor without recipe or query.
    #[must_use]
    pub fn image(path: impl Into<String>) -> Self {
        Self::Image {
            image_path: path.into(),
            code: None,
            query: None,
        }
    }

    /// Parse a JSON array of descriptors.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::Serialization`] on malformed input.
    pub fn parse_batch(json: &str) -> CanvasResult<Vec<Self>> {
        serde_json::from_str(json).map_err(CanvasError::Serialization)
    }
}

/// What one reconciliation pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedReport {
    /// Elements created, in feed order.
    pub inserted: Vec<ElementId>,
    /// Images skipped because the user removed them.
    pub suppressed: usize,
    /// Images skipped because they are already on the canvas.
    pub duplicates: usize,
    /// Message bodies, in feed order.
    pub messages: Vec<String>,
}

impl Scene {
    /// Reconcile a batch of descriptors into the scene.
    pub fn apply_feed<'a>(&mut self, items: impl IntoIterator<Item = &'a FeedItem>) -> FeedReport {
        let mut report = FeedReport::default();
        for item in items {
            match item {
                FeedItem::Image {
                    image_path,
                    code,
                    query,
                } => {
                    if self.removed_images().contains(image_path) {
                        tracing::debug!("Feed image {image_path} suppressed, removed by user");
                        report.suppressed += 1;
                    } else if self.has_image_source(image_path) {
                        report.duplicates += 1;
                    } else {
                        let id = self.insert_image(image_path.clone(), code.clone(), query.clone());
                        report.inserted.push(id);
                    }
                }
                FeedItem::Message { message } => report.messages.push(message.clone()),
            }
        }
        tracing::debug!(
            "Feed reconciled: {} inserted, {} suppressed, {} duplicates",
            report.inserted.len(),
            report.suppressed,
            report.duplicates
        );
        report
    }
}
