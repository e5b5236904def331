use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use blip_image_analyzer::{
    caption::{BlipCaptioner, Captioner},
    config::{Cli, Command, ServeArgs},
    web::{create_app, AppState, SharedAnalyzer},
    ImageAnalyzer, ModelInfo,
};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn serve(analyzer: SharedAnalyzer, args: ServeArgs) -> Result<()> {
    let app = create_app(AppState::new(analyzer), args.max_upload_bytes());

    let addr = args.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("Server running on http://{}", addr);
    info!("Open in your browser and upload an image to analyze it");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

fn analyze_once(analyzer: &ImageAnalyzer<Arc<dyn Captioner>>, path: &Path) -> Result<()> {
    let outcome = analyzer.analyze_file(path);
    let success = outcome.is_success();
    let (text, record) = outcome.into_parts();

    println!("{}", text);
    println!("{}", serde_json::to_string_pretty(&record)?);

    if !success {
        anyhow::bail!("analysis of {} failed", path.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    info!("Starting BLIP image content analysis");

    let model_args = cli.model.clone();
    let captioner = tokio::task::spawn_blocking(move || BlipCaptioner::load(&model_args))
        .await
        .context("model loading task failed")?
        .with_context(|| format!("failed to load BLIP model {}", cli.model.model_id))?;
    info!("BLIP model {} ready", captioner.model_id());

    let model_info = ModelInfo::blip(captioner.model_id());
    let captioner: Arc<dyn Captioner> = Arc::new(captioner);
    let analyzer = Arc::new(ImageAnalyzer::new(captioner, model_info));

    match cli.resolved_command() {
        Command::Serve => serve(analyzer, cli.serve.clone()).await,
        Command::Analyze { path } => {
            tokio::task::spawn_blocking(move || analyze_once(&analyzer, &path))
                .await
                .context("analysis task failed")?
        }
    }
}
