use std::sync::Arc;

use nsfw_sentinel::bot::Bot;
use nsfw_sentinel::classify::ClassifierClient;
use nsfw_sentinel::config::Config;
use nsfw_sentinel::dispatch::ActionDispatcher;
use nsfw_sentinel::gate::AdmissionGate;
use nsfw_sentinel::pipeline::ModerationPipeline;
use nsfw_sentinel::scorer::HttpScorer;
use nsfw_sentinel::transport::MatrixTransport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("NSFW_SENTINEL_CONFIG").ok())
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Arc::new(Config::load(&config_path)?);

    eprintln!("🛡 NSFW Sentinel v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Config: {}", config_path);
    eprintln!("   Homeserver: {}", config.homeserver.base_url);
    eprintln!("   User: {}", config.homeserver.user_id);
    eprintln!("   Classifier: {}", config.classifier.endpoint);
    eprintln!("   Max concurrent jobs: {}", config.max_concurrent_jobs);
    eprintln!(
        "   Actions: ignore_sfw={} redact_nsfw={} direct_reply={} report_to_room={}",
        config.actions.ignore_sfw,
        config.actions.redact_nsfw,
        config.actions.direct_reply,
        config.actions.report_to_room.as_deref().unwrap_or("-"),
    );

    let transport = Arc::new(MatrixTransport::new(
        config.homeserver.base_url.clone(),
        config.homeserver.access_token.clone(),
    ));

    let classifier = ClassifierClient::new(
        transport.clone(),
        Arc::new(HttpScorer::new(config.classifier.endpoint.clone())),
        AdmissionGate::new(config.max_concurrent_jobs),
        config.classifier.max_image_bytes,
    );

    let pipeline = Arc::new(ModerationPipeline::new(
        Arc::clone(&config),
        classifier,
        ActionDispatcher::new(transport.clone()),
    ));

    let bot = Bot::new(transport, pipeline, config.homeserver.user_id.clone());
    bot.run().await?;

    Ok(())
}
