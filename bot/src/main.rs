use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use reactionlog::config::BotConfig;
use reactionlog::engine::state::LoggerPhase;
use reactionlog::replay::{GuildFixture, parse_events, replay};

/// Reaction logger: replays gateway events against a guild snapshot and
/// prints every log entry the logger would post.
#[derive(Parser)]
#[command(name = "reactionlog", version)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, default_value = "reactionlog.toml")]
    config: String,
    /// JSON guild fixture (overrides [replay] fixture).
    #[arg(long)]
    fixture: Option<String>,
    /// JSON-lines event file (overrides [replay] events).
    #[arg(long)]
    events: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = BotConfig::load(&cli.config)?;
    if cli.fixture.is_some() {
        config.replay.fixture = cli.fixture;
    }
    if cli.events.is_some() {
        config.replay.events = cli.events;
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log.level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let fixture_path = config
        .replay
        .fixture
        .clone()
        .context("no guild fixture configured (--fixture or [replay] fixture)")?;
    let events_path = config
        .replay
        .events
        .clone()
        .context("no event file configured (--events or [replay] events)")?;

    let fixture = std::fs::read_to_string(&fixture_path)
        .with_context(|| format!("failed to read fixture {fixture_path}"))?;
    let fixture = GuildFixture::from_json(&fixture)?;

    let mut settings = config.to_logger_settings();
    if config.guild.id == 0 {
        settings.guild_id = fixture.guild_id;
    }

    let events = std::fs::read_to_string(&events_path)
        .with_context(|| format!("failed to read events {events_path}"))?;
    let events = parse_events(&events)?;

    let platform = Arc::new(fixture.build_platform()?);

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.cancel();
        }
    });

    info!(guild_id = %settings.guild_id, events = events.len(), "Reaction logger starting");
    let report = replay(platform, settings, events, cancel).await?;

    for (webhook, entry) in &report.deliveries {
        // One embed per line, rendered the way the webhook message shows it.
        let line = serde_json::json!({
            "webhook": webhook.name,
            "title": entry.title,
            "description": entry.description(),
            "thumbnail": entry.thumbnail_url,
            "footer": entry.footer.text(),
            "timestamp": entry.timestamp,
            "color": entry.color,
        });
        println!("{line}");
    }

    if let LoggerPhase::Disabled(reason) = &report.phase {
        error!(reason = %reason, "reaction logger was disabled");
        std::process::exit(1);
    }
    Ok(())
}
