use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use swipe_engine::config::{LoggingSettings, Settings};
use swipe_engine::services::{
    ConsoleCodeProvider, CredentialStore, ProfileService, SessionManager, WordListStore,
};
use swipe_engine::{ProfileJudge, SwipeBot};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_logging(settings: &LoggingSettings) {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| settings.level.clone());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| settings.format.clone());

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load();
    init_logging(
        &settings
            .as_ref()
            .map(|s| s.logging.clone())
            .unwrap_or_default(),
    );

    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Configuration loaded successfully");

    let words = Arc::new(
        WordListStore::new(&settings.storage.data_dir)
            .with_lock_timeout(Duration::from_millis(settings.storage.lock_timeout_ms)),
    );
    let credentials = CredentialStore::new(&settings.storage.credentials_file);

    let session = match SessionManager::new(
        settings.api.base_url.clone(),
        Duration::from_secs(settings.api.timeout_secs),
        credentials,
        Box::new(ConsoleCodeProvider),
    ) {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let service = ProfileService::new(session)
        .with_recs_count(settings.api.recs_count)
        .with_swipe_timeout(Duration::from_millis(settings.api.swipe_timeout_ms));

    let judge = ProfileJudge::from_settings(&settings.judging, words);
    info!(
        "Profile judge initialized: too close < {} km, too far > {} km, judges {:?}",
        settings.judging.too_close_km, settings.judging.too_far_km, settings.judging.judges
    );

    let bot = SwipeBot::new(service, judge).with_max_batches(settings.bot.max_batches);

    match bot.run().await {
        Ok(summary) => {
            info!("Run summary: {:?}", summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Run aborted: {}", e);
            ExitCode::FAILURE
        }
    }
}
