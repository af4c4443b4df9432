//! End-to-end tests for the canvas session.
//!
//! A real session talks to a wiremock regeneration service and renders
//! snapshots from image assets written to a temporary directory.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use canvas_core::{FeedItem, HoverEvent, InputEvent, NoticeLevel, RegenerationOutcome};
use canvas_renderer::{ExportConfig, ExportFormat};
use canvas_session::{HttpGateway, SessionConfig, SessionHandle};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn write_solid_png(dir: &Path, name: &str, rgba: [u8; 4]) {
    image::RgbaImage::from_pixel(4, 4, image::Rgba(rgba))
        .save(dir.join(name))
        .expect("write png");
}

fn session_for(server: &MockServer, assets: &Path) -> SessionHandle {
    let config = SessionConfig {
        service_url: server.uri(),
        file_id: Some("upload-42".into()),
        canvas_width: 400.0,
        canvas_height: 300.0,
        export: ExportConfig {
            asset_root: Some(assets.to_path_buf()),
            system_fonts: false,
            ..ExportConfig::default()
        },
        ..SessionConfig::default()
    };
    let gateway = HttpGateway::new(&config.service_url, Duration::from_secs(5)).expect("gateway");
    SessionHandle::spawn(config, Arc::new(gateway))
}

fn center_pixel(png: &[u8]) -> [u8; 4] {
    let decoded = image::load_from_memory(png).expect("decode").to_rgba8();
    decoded.get_pixel(200, 150).0
}

// ==========================================================================
// Regeneration round trip
// ==========================================================================

#[tokio::test]
#[cfg_attr(
    target_os = "macos",
    ignore = "wiremock/reqwest system-configuration issue on macOS"
)]
async fn regenerated_image_appears_in_snapshot() {
    let assets = tempfile::tempdir().expect("tempdir");
    write_solid_png(assets.path(), "before.png", [255, 0, 0, 255]);
    write_solid_png(assets.path(), "after.png", [0, 0, 255, 255]);

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/query-graph/"))
        .and(body_json(json!({
            "file_id": "upload-42",
            "query": "df.plot(color='blue')",
            "is_code_update": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "images": ["/after.png"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = session_for(&server, assets.path());
    let feed = FeedItem::parse_batch(
        r#"[
            {"type": "message", "message": "Here is your chart"},
            {"type": "image", "imagePath": "/before.png", "code": "df.plot(color='red')"}
        ]"#,
    )
    .expect("feed");
    let report = session.apply_feed(feed).await.expect("apply");
    assert_eq!(report.messages, vec!["Here is your chart".to_string()]);
    let id = report.inserted[0];

    let before = session.export(ExportFormat::Png).await.expect("export");
    let pixel = center_pixel(&before.bytes);
    assert!(pixel[0] > 200 && pixel[2] < 60, "{pixel:?}");

    session
        .send_input(InputEvent::Hover(HoverEvent::EnterElement(id)))
        .await
        .expect("hover");
    let outcome = session
        .regenerate("df.plot(color='blue')")
        .await
        .expect("regenerate");
    assert_eq!(
        outcome,
        RegenerationOutcome::Success {
            image_path: "/after.png".into()
        }
    );

    // the overlay is still up during the confirmation delay; the snapshot hides it
    assert!(session.status().await.expect("status").overlay_visible);
    let after = session.export(ExportFormat::Png).await.expect("export");
    let pixel = center_pixel(&after.bytes);
    assert!(pixel[2] > 200 && pixel[0] < 60, "{pixel:?}");
    assert!(session.status().await.expect("status").overlay_visible);

    let notices = session.drain_notices().await.expect("notices");
    let messages: Vec<_> = notices.iter().map(|n| n.message.as_str()).collect();
    assert!(messages.contains(&"Image regenerated"));
    assert!(notices.iter().all(|n| n.level == NoticeLevel::Info));
}

#[tokio::test]
#[cfg_attr(
    target_os = "macos",
    ignore = "wiremock/reqwest system-configuration issue on macOS"
)]
async fn service_error_leaves_image_untouched() {
    let assets = tempfile::tempdir().expect("tempdir");
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/query-graph/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "SyntaxError: unexpected EOF"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = session_for(&server, assets.path());
    let report = session
        .apply_feed(vec![FeedItem::Image {
            image_path: "/plot.png".into(),
            code: Some("df.plot()".into()),
            query: None,
        }])
        .await
        .expect("apply");
    let id = report.inserted[0];

    session
        .send_input(InputEvent::Hover(HoverEvent::EnterElement(id)))
        .await
        .expect("hover");
    let outcome = session.regenerate("df.plot(").await.expect("regenerate");
    assert_eq!(
        outcome,
        RegenerationOutcome::ApplicationError("SyntaxError: unexpected EOF".into())
    );

    let scene = session.snapshot().await.expect("snapshot");
    let image = scene
        .get_element(id)
        .and_then(|e| e.as_image())
        .expect("image");
    assert_eq!(image.source_ref, "/plot.png");
    assert_eq!(image.recipe.as_deref(), Some("df.plot()"));

    let notices = session.drain_notices().await.expect("notices");
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].message, "Error: SyntaxError: unexpected EOF");
}

// ==========================================================================
// Removal survives feed replays
// ==========================================================================

#[tokio::test]
async fn removed_image_stays_removed_until_restored() {
    let assets = tempfile::tempdir().expect("tempdir");
    let server = MockServer::start().await;
    let session = session_for(&server, assets.path());

    let feed = vec![FeedItem::image("/a.png"), FeedItem::image("/b.png")];
    let report = session.apply_feed(feed.clone()).await.expect("apply");
    let removed = report.inserted[0];

    session
        .inspect(move |state| state.remove(removed))
        .await
        .expect("session")
        .expect("remove");

    let replay = session.apply_feed(feed).await.expect("replay");
    assert!(replay.inserted.is_empty());
    assert_eq!(replay.suppressed, 1);
    assert_eq!(replay.duplicates, 1);

    let restored = session
        .inspect(|state| state.restore_images())
        .await
        .expect("session");
    assert_eq!(restored.inserted.len(), 1);

    let status = session.status().await.expect("status");
    assert_eq!(status.element_count, 2);
    assert_eq!(status.removed_images, 0);
}
