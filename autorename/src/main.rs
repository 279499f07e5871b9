use std::sync::Arc;

use anyhow::Context;
use autorename::config::AppConfig;
use autorename::debounce::DebounceGate;
use autorename::dispatcher::Dispatcher;
use autorename::logging;
use autorename::pipeline::{PipelineServices, RenamePipeline};
use autorename::preferences::JsonPreferenceStore;
use autorename::probe::FfprobeProbe;
use autorename::telegram::TelegramClient;
use autorename::thumbnail::ImageThumbnailNormalizer;
use autorename::utils::fs;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("loading configuration")?;
    let _log_guard = logging::init_logging(&config.log_dir)?;

    let cancel = CancellationToken::new();
    logging::start_retention_cleanup(config.log_dir.clone(), cancel.child_token());

    fs::ensure_dir_all_with_op("creating download directory", &config.pipeline.download_dir)
        .await?;

    let client = Arc::new(TelegramClient::new(&config.api_url, &config.bot_token)?);
    let preferences = Arc::new(JsonPreferenceStore::load(&config.preferences_path).await?);
    let gate = Arc::new(DebounceGate::with_capacity(
        config.debounce_window,
        config.debounce_max_entries,
    ));

    let services = PipelineServices {
        preferences: preferences.clone(),
        transport: client.clone(),
        messenger: client.clone(),
        probe: Arc::new(FfprobeProbe::new(&config.ffprobe_path)),
        normalizer: Arc::new(ImageThumbnailNormalizer::new(config.thumbnail_max_width)),
    };
    let pipeline = Arc::new(RenamePipeline::new(gate, services, config.pipeline.clone()));
    let dispatcher = Dispatcher::new(client, preferences, pipeline, config.poll_timeout);

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown requested"),
            Err(e) => {
                error!(error = %e, "Failed to listen for ctrl-c");
                return;
            }
        }
        shutdown.cancel();
    });

    info!(
        download_dir = %config.pipeline.download_dir.display(),
        track_number_fallback = config.pipeline.track_number_fallback,
        "autorename started"
    );
    dispatcher.run(cancel).await?;
    info!("autorename stopped");

    Ok(())
}
