//! Scene export to image formats.
//!
//! Renders a [`Scene`] to PNG, JPEG, or SVG using an SVG intermediate
//! representation and the resvg/tiny-skia rasterization pipeline. Elements
//! are drawn in ascending z-order, so the snapshot matches what is on screen.

use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use canvas_core::{Element, ElementKind, ImageContent, Scene, TextContent, Transform};
use image::ImageEncoder;
use serde::{Deserialize, Serialize};

use crate::error::{RenderError, RenderResult};
use crate::image::load_data_uri;

/// Points to CSS pixels.
const PX_PER_PT: f32 = 96.0 / 72.0;

/// Line height as a multiple of the font size.
const LINE_HEIGHT: f32 = 1.2;

/// Export output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// PNG image.
    #[default]
    Png,
    /// JPEG image.
    Jpeg,
    /// SVG vector graphics.
    Svg,
}

impl ExportFormat {
    /// File extension without the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Svg => "svg",
        }
    }

    /// MIME type of the encoded artifact.
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Svg => "image/svg+xml",
        }
    }

    /// The fixed artifact file name for this format.
    #[must_use]
    pub fn file_name(self) -> String {
        format!("canvas-export.{}", self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "svg" => Ok(Self::Svg),
            other => Err(RenderError::Export(format!("unknown export format: {other}"))),
        }
    }
}

/// Configuration for scene export.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Background color as RGBA bytes.
    pub background: [u8; 4],
    /// JPEG quality 1-100 (default: 90).
    pub jpeg_quality: u8,
    /// Scale factor (e.g. 2.0 for retina).
    pub scale: f32,
    /// Directory image source paths resolve against.
    pub asset_root: Option<PathBuf>,
    /// Load system fonts for text rasterization.
    pub system_fonts: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            background: [255, 255, 255, 255],
            jpeg_quality: 90,
            scale: 1.0,
            asset_root: None,
            system_fonts: true,
        }
    }
}

/// An encoded snapshot ready to be offered as a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    /// Deterministic file name, e.g. `canvas-export.png`.
    pub file_name: String,
    /// MIME type.
    pub mime_type: &'static str,
    /// Encoded bytes.
    pub bytes: Vec<u8>,
}

/// Exports a [`Scene`] to various image formats.
#[derive(Debug, Clone)]
pub struct SceneExporter {
    config: ExportConfig,
}

impl SceneExporter {
    /// Create a new exporter with the given configuration.
    #[must_use]
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    /// Create an exporter with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(ExportConfig::default())
    }

    /// Get the current configuration.
    #[must_use]
    pub const fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Export a scene to an artifact in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if the scene cannot be rendered or encoded.
    pub fn export(&self, scene: &Scene, format: ExportFormat) -> RenderResult<ExportArtifact> {
        let bytes = match format {
            ExportFormat::Png => self.render_to_png(scene)?,
            ExportFormat::Jpeg => self.render_to_jpeg(scene)?,
            ExportFormat::Svg => self.render_to_svg(scene)?.into_bytes(),
        };
        tracing::debug!(
            "Exported {} elements as {} ({} bytes)",
            scene.element_count(),
            format.extension(),
            bytes.len()
        );
        Ok(ExportArtifact {
            file_name: format.file_name(),
            mime_type: format.mime_type(),
            bytes,
        })
    }

    /// Export the scene to PNG bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or encoding fails.
    pub fn render_to_png(&self, scene: &Scene) -> RenderResult<Vec<u8>> {
        let svg_string = self.render_to_svg(scene)?;
        let pixmap = self.rasterize_svg(&svg_string)?;

        pixmap
            .encode_png()
            .map_err(|e| RenderError::Export(format!("PNG encoding failed: {e}")))
    }

    /// Export the scene to JPEG bytes, flattening alpha onto the background.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or encoding fails.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn render_to_jpeg(&self, scene: &Scene) -> RenderResult<Vec<u8>> {
        let svg_string = self.render_to_svg(scene)?;
        let pixmap = self.rasterize_svg(&svg_string)?;

        let (width, height) = (pixmap.width(), pixmap.height());
        let bg = &self.config.background;
        let mut rgb_data = Vec::with_capacity((width * height * 3) as usize);
        // tiny-skia stores premultiplied RGBA
        for pixel in pixmap.data().chunks_exact(4) {
            let inv = 1.0 - f32::from(pixel[3]) / 255.0;
            for (&src, &back) in pixel[..3].iter().zip(bg.iter()) {
                let value = f32::from(back).mul_add(inv, f32::from(src));
                rgb_data.push(value.round().clamp(0.0, 255.0) as u8);
            }
        }

        let mut buf = std::io::Cursor::new(Vec::new());
        let encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, self.config.jpeg_quality);
        encoder
            .write_image(&rgb_data, width, height, image::ExtendedColorType::Rgb8)
            .map_err(|e| RenderError::Export(format!("JPEG encoding failed: {e}")))?;

        Ok(buf.into_inner())
    }

    /// Export the scene to an SVG string.
    ///
    /// # Errors
    ///
    /// Returns an error if the canvas has no drawable area.
    #[allow(clippy::cast_precision_loss)]
    pub fn render_to_svg(&self, scene: &Scene) -> RenderResult<String> {
        let (out_w, out_h) = self.output_dimensions(scene)?;

        let mut svg = String::with_capacity(4096);
        let _ = write!(
            svg,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{out_w}\" height=\"{out_h}\" viewBox=\"0 0 {} {}\">",
            scene.width, scene.height,
        );

        // Background
        let bg = &self.config.background;
        let bg_alpha = f32::from(bg[3]) / 255.0;
        let _ = write!(
            svg,
            "<rect width=\"100%\" height=\"100%\" fill=\"rgb({},{},{})\" fill-opacity=\"{bg_alpha}\"/>",
            bg[0], bg[1], bg[2],
        );

        for element in scene.list_ordered_by_z() {
            self.render_element_svg(&mut svg, element);
        }

        svg.push_str("</svg>");
        Ok(svg)
    }

    /// Output dimensions (width, height) in pixels.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn output_dimensions(&self, scene: &Scene) -> RenderResult<(u32, u32)> {
        let scale = self.config.scale;
        if !(scene.width.is_finite() && scene.height.is_finite() && scale.is_finite())
            || scene.width <= 0.0
            || scene.height <= 0.0
            || scale <= 0.0
        {
            return Err(RenderError::Export(format!(
                "canvas {}x{} at scale {scale} has no drawable area",
                scene.width, scene.height
            )));
        }
        let out_w = (scene.width * scale).round() as u32;
        let out_h = (scene.height * scale).round() as u32;
        Ok((out_w.max(1), out_h.max(1)))
    }

    /// Rasterize an SVG string to a tiny-skia Pixmap.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn rasterize_svg(&self, svg_string: &str) -> RenderResult<tiny_skia::Pixmap> {
        let mut opt = usvg::Options::default();
        if self.config.system_fonts {
            opt.fontdb_mut().load_system_fonts();
        }
        let tree = usvg::Tree::from_str(svg_string, &opt)
            .map_err(|e| RenderError::Export(format!("SVG parsing failed: {e}")))?;

        let px_w = tree.size().width().ceil() as u32;
        let px_h = tree.size().height().ceil() as u32;

        let mut pixmap = tiny_skia::Pixmap::new(px_w.max(1), px_h.max(1))
            .ok_or_else(|| RenderError::Export("Failed to create pixmap".to_string()))?;

        resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

        Ok(pixmap)
    }

    /// Render a single element to SVG.
    fn render_element_svg(&self, svg: &mut String, element: &Element) {
        let tf = &element.transform;
        match &element.kind {
            ElementKind::Image(image) => self.render_image_svg(svg, tf, image),
            ElementKind::Text(text) => render_text_svg(svg, tf, text),
        }
    }

    fn render_image_svg(&self, svg: &mut String, tf: &Transform, image: &ImageContent) {
        let root = self
            .config
            .asset_root
            .as_deref()
            .unwrap_or_else(|| Path::new("."));
        match load_data_uri(root, &image.source_ref) {
            Ok(href) => {
                let _ = write!(
                    svg,
                    "<image x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" preserveAspectRatio=\"xMidYMid meet\" href=\"{}\"/>",
                    tf.x,
                    tf.y,
                    tf.width,
                    tf.height,
                    escape_xml(&href),
                );
            }
            Err(e) => {
                tracing::warn!("Image {} drawn as placeholder: {e}", image.source_ref);
                render_placeholder_svg(svg, tf, "Image unavailable");
            }
        }
    }
}

/// Render a text block: one line per newline, font size converted from points.
fn render_text_svg(svg: &mut String, tf: &Transform, text: &TextContent) {
    let font_px = text.font_size_pt * PX_PER_PT;
    let line_px = font_px * LINE_HEIGHT;
    let _ = write!(
        svg,
        "<text x=\"{}\" y=\"{}\" font-size=\"{font_px}\" font-family=\"{}\" font-weight=\"{}\" font-style=\"{}\" fill=\"{}\">",
        tf.x,
        tf.y + font_px,
        escape_xml(&text.font_family),
        text.font_weight.as_str(),
        text.font_style.as_str(),
        escape_xml(&text.color),
    );
    for (idx, line) in text.content.split('\n').enumerate() {
        let dy = if idx == 0 { 0.0 } else { line_px };
        let _ = write!(
            svg,
            "<tspan x=\"{}\" dy=\"{dy}\">{}</tspan>",
            tf.x,
            escape_xml(line),
        );
    }
    svg.push_str("</text>");
}

fn render_placeholder_svg(svg: &mut String, tf: &Transform, label: &str) {
    let _ = write!(
        svg,
        "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"#e0e0e0\" stroke=\"#999\" stroke-width=\"1\"/>",
        tf.x, tf.y, tf.width, tf.height,
    );
    let center_x = tf.x + tf.width / 2.0;
    let center_y = tf.y + tf.height / 2.0;
    let _ = write!(
        svg,
        "<text x=\"{center_x}\" y=\"{center_y}\" font-size=\"14\" fill=\"#666\" text-anchor=\"middle\" font-family=\"sans-serif\">{label}</text>",
    );
}

/// Escape special XML characters.
fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas_core::{ElementPatch, FontWeight};

    fn exporter() -> SceneExporter {
        SceneExporter::new(ExportConfig {
            system_fonts: false,
            ..ExportConfig::default()
        })
    }

    fn text_scene(content: &str) -> Scene {
        let mut scene = Scene::new(200.0, 100.0);
        let id = scene.insert_text();
        scene
            .update(id, &ElementPatch::content(content))
            .expect("text patch");
        scene
    }

    #[test]
    fn test_svg_export_empty_scene() {
        let scene = Scene::new(800.0, 600.0);
        let svg = exporter().render_to_svg(&scene).expect("svg export");
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("width=\"800\""));
        assert!(svg.contains("height=\"600\""));
    }

    #[test]
    fn test_svg_text_styling() {
        let mut scene = text_scene("Hello World");
        let id = scene.elements().next().expect("text").id;
        scene
            .update(
                id,
                &ElementPatch {
                    font_weight: Some(FontWeight::Bold),
                    font_family: Some("Georgia".into()),
                    ..ElementPatch::default()
                },
            )
            .expect("style patch");

        let svg = exporter().render_to_svg(&scene).expect("svg export");
        assert!(svg.contains("Hello World"));
        assert!(svg.contains("font-weight=\"bold\""));
        assert!(svg.contains("font-family=\"Georgia\""));
        // 16pt is 21.333px
        assert!(svg.contains("font-size=\"21.33"));
    }

    #[test]
    fn test_multiline_text_uses_tspans() {
        let scene = text_scene("line one\nline two");
        let svg = exporter().render_to_svg(&scene).expect("svg");
        assert_eq!(svg.matches("<tspan").count(), 2);
    }

    #[test]
    fn test_xml_escaping() {
        let scene = text_scene("A < B & C > D");
        let svg = exporter().render_to_svg(&scene).expect("svg");
        assert!(svg.contains("A &lt; B &amp; C &gt; D"));
    }

    #[test]
    fn test_missing_image_becomes_placeholder() {
        let mut scene = Scene::new(400.0, 300.0);
        scene.insert_image("/nowhere/1.png?v=1-1", None, None);
        let svg = exporter().render_to_svg(&scene).expect("svg");
        assert!(svg.contains("Image unavailable"));
        assert!(svg.contains("#e0e0e0"));
    }

    #[test]
    fn test_render_order_follows_z() {
        let mut scene = Scene::new(400.0, 300.0);
        let first = scene.insert_text();
        let second = scene.insert_text();
        scene.update(first, &ElementPatch::content("FIRST")).expect("first");
        scene.update(second, &ElementPatch::content("SECOND")).expect("second");

        let svg = exporter().render_to_svg(&scene).expect("svg");
        assert!(svg.find("FIRST") < svg.find("SECOND"));

        scene.bring_to_front(first);
        let svg = exporter().render_to_svg(&scene).expect("svg");
        assert!(svg.find("SECOND") < svg.find("FIRST"));
    }

    #[test]
    fn test_png_export_produces_valid_bytes() {
        let scene = text_scene("Test");
        let png = exporter().render_to_png(&scene).expect("png export");
        // PNG magic bytes: \x89PNG
        assert!(png.len() > 8);
        assert_eq!(&png[0..4], &[137, 80, 78, 71]);
    }

    #[test]
    fn test_jpeg_export_produces_valid_bytes() {
        let scene = text_scene("Test");
        let jpeg = exporter().render_to_jpeg(&scene).expect("jpeg export");
        // JPEG magic bytes: FFD8
        assert!(jpeg.len() > 2);
        assert_eq!(jpeg[0], 0xFF);
        assert_eq!(jpeg[1], 0xD8);
    }

    #[test]
    fn test_export_artifact_naming() {
        let scene = text_scene("Dispatch");
        let png = exporter().export(&scene, ExportFormat::Png).expect("png");
        assert_eq!(png.file_name, "canvas-export.png");
        assert_eq!(png.mime_type, "image/png");

        let svg = exporter().export(&scene, ExportFormat::Svg).expect("svg");
        assert_eq!(svg.file_name, "canvas-export.svg");
        assert!(String::from_utf8(svg.bytes).expect("utf8").starts_with("<svg"));

        let jpeg = exporter().export(&scene, ExportFormat::Jpeg).expect("jpeg");
        assert_eq!(jpeg.file_name, "canvas-export.jpg");
    }

    #[test]
    fn test_scale_factor() {
        let scene = Scene::new(100.0, 100.0);
        let exporter = SceneExporter::new(ExportConfig {
            scale: 2.0,
            system_fonts: false,
            ..ExportConfig::default()
        });

        let svg = exporter.render_to_svg(&scene).expect("svg");
        // At 2x scale, output should be 200x200
        assert!(svg.contains("width=\"200\""));
        assert!(svg.contains("height=\"200\""));
        // But viewBox should still map to 100x100
        assert!(svg.contains("viewBox=\"0 0 100 100\""));
    }

    #[test]
    fn test_degenerate_canvas_fails() {
        let scene = Scene::new(0.0, 100.0);
        assert!(matches!(
            exporter().export(&scene, ExportFormat::Png),
            Err(RenderError::Export(_))
        ));
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("PNG".parse::<ExportFormat>().expect("png"), ExportFormat::Png);
        assert_eq!("jpeg".parse::<ExportFormat>().expect("jpeg"), ExportFormat::Jpeg);
        assert_eq!("jpg".parse::<ExportFormat>().expect("jpg"), ExportFormat::Jpeg);
        assert!("pdf".parse::<ExportFormat>().is_err());
    }
}
