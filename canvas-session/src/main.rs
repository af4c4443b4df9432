//! Headless canvas session.
//!
//! Reconciles a feed file onto a fresh canvas, optionally regenerates the
//! first recipe-bearing image, and writes a snapshot.

use std::sync::Arc;

use anyhow::Context;
use canvas_core::{FeedItem, HoverEvent, InputEvent, NoticeLevel, RegenerationOutcome};
use canvas_session::{CliArgs, HttpGateway, SessionConfig, SessionHandle};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,canvas_session=debug,canvas_core=debug"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    // Use JSON format in production (RUST_LOG_FORMAT=json)
    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = CliArgs::parse();
    let feed_path = args.feed.clone();
    let out_dir = args.out.clone();
    let format = args.format;
    let recipe = args.regenerate_with.clone();
    let config = SessionConfig::from(args);

    let gateway = HttpGateway::new(&config.service_url, config.timeout)?;
    tracing::info!("Regeneration endpoint: {}", gateway.endpoint());
    let session = SessionHandle::spawn(config, Arc::new(gateway));

    if let Some(path) = feed_path {
        let json = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read feed {}", path.display()))?;
        let items = FeedItem::parse_batch(&json)?;
        let report = session.apply_feed(items).await?;
        tracing::info!(
            "Feed applied: {} inserted, {} suppressed, {} duplicates",
            report.inserted.len(),
            report.suppressed,
            report.duplicates
        );
        for message in &report.messages {
            tracing::info!("Assistant: {message}");
        }
    }

    if let Some(recipe) = recipe {
        regenerate_first(&session, recipe).await?;
    }

    let artifact = session.export(format).await?;
    tokio::fs::create_dir_all(&out_dir)
        .await
        .with_context(|| format!("failed to create {}", out_dir.display()))?;
    let target = out_dir.join(&artifact.file_name);
    tokio::fs::write(&target, &artifact.bytes)
        .await
        .with_context(|| format!("failed to write {}", target.display()))?;
    tracing::info!("Wrote {} ({} bytes)", target.display(), artifact.bytes.len());

    for notice in session.drain_notices().await? {
        match notice.level {
            NoticeLevel::Info => tracing::info!("{}", notice.message),
            NoticeLevel::Error => tracing::error!("{}", notice.message),
        }
    }

    Ok(())
}

/// Open the overlay on the first recipe-bearing image and submit `recipe`.
async fn regenerate_first(session: &SessionHandle, recipe: String) -> anyhow::Result<()> {
    let target = session
        .inspect(|state| {
            state
                .scene()
                .elements()
                .find(|e| e.as_image().is_some_and(canvas_core::ImageContent::has_recipe))
                .map(|e| e.id)
        })
        .await?;

    let Some(id) = target else {
        tracing::warn!("No image with a recipe to regenerate");
        return Ok(());
    };

    session
        .send_input(InputEvent::Hover(HoverEvent::EnterElement(id)))
        .await?;
    match session.regenerate(recipe).await? {
        RegenerationOutcome::Success { image_path } => {
            tracing::info!("Regenerated {id} from {image_path}");
        }
        RegenerationOutcome::ApplicationError(message)
        | RegenerationOutcome::TransportError(message) => {
            tracing::error!("Regeneration of {id} failed: {message}");
        }
    }
    Ok(())
}
