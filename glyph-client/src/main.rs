//! Glyphpad - hand-drawn character classification from the command line.
//!
//! ```bash
//! glyphpad --api-base http://localhost:8000 infer --model rnn --strokes drawing.json
//! ```

use anyhow::Context;
use clap::Parser;
use glyph_client::{
    save_preview, CliArgs, Command, HttpClient, PadConfig, SessionController, Transport,
};
use glyph_core::{normalize, Session, TARGET_SIDE};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing with optional JSON format.
///
/// Set `RUST_LOG_FORMAT=json` for structured JSON output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,glyph_client=debug,glyph_core=debug"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

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
    let config = PadConfig::from(&args);

    tracing::info!(
        version = glyph_core::VERSION,
        api_base = %config.api_base,
        canvas_size = config.canvas_size,
        "Starting glyphpad"
    );

    match args.command {
        Command::Check => {
            let client = HttpClient::new(&config.client_config())?;
            let status = client
                .health()
                .await
                .with_context(|| format!("{} is not answering", client.base_url()))?;
            println!("{}: {}", client.base_url(), status.message);
        }
        Command::Infer {
            model,
            source,
            save_preview: preview_path,
            verdict,
        } => {
            let session = source.load(&config).context("Failed to load drawing")?;
            if let Some(path) = preview_path {
                write_preview(&session, &path)?;
            }

            let client = HttpClient::new(&config.client_config())?;
            let controller = SessionController::new(session, client);
            run_cycle(&controller, model, verdict).await?;
        }
        Command::Preview { source, output } => {
            let session = source.load(&config).context("Failed to load drawing")?;
            write_preview(&session, &output)?;
        }
    }

    Ok(())
}

async fn run_cycle<T: Transport>(
    controller: &SessionController<T>,
    model: glyph_core::ModelKind,
    verdict: Option<glyph_core::Verdict>,
) -> anyhow::Result<()> {
    let result = controller
        .capture(model)
        .await
        .with_context(|| format!("{} prediction failed", model.display_name()))?;
    println!("{} predicts: {}", model.display_name(), result.label);

    if let Some(verdict) = verdict {
        controller
            .submit_feedback(verdict)
            .await
            .context("Failed to submit feedback")?;
        println!("Feedback recorded: {verdict}");
    }
    Ok(())
}

fn write_preview(session: &Session, path: &std::path::Path) -> anyhow::Result<()> {
    let surface = session.surface();
    let tensor = normalize(surface.snapshot(), surface.side(), TARGET_SIDE)?;
    save_preview(&tensor, path)?;
    let lit = tensor.as_slice().iter().filter(|&&v| v > 0.0).count();
    println!(
        "Preview written to {} ({}x{}, {lit} lit cells, coverage {:.2})",
        path.display(),
        tensor.side(),
        tensor.side(),
        tensor.sum()
    );
    Ok(())
}
