use anyhow::Context;
use clap::Parser;
use host_rotation::core::RosterProvider;
use host_rotation::utils::error::ErrorSeverity;
use host_rotation::utils::{logger, validation::Validate};
use host_rotation::{
    BotConfig, CliConfig, RotationEngine, RotationError, RotationLedger, Scheduler,
    TelegramClient, TelegramTransport,
};
use tokio::sync::mpsc;

const EVENT_QUEUE_CAPACITY: usize = 64;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("🚀 Starting host-rotation bot");
    tracing::info!("📁 Loading configuration from: {}", cli.config);

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(exit_code(&e));
        }
    };

    let ledger = RotationLedger::with_counts(config.roster())
        .context("failed to build the rotation ledger")?;
    for entry in ledger.entries() {
        tracing::debug!("Roster: {} ({} weeks since hosting)", entry.member, entry.weeks_since);
    }

    let client = TelegramClient::new(config.api_base_url(), config.bot_token(), config.poll_timeout())
        .context("failed to build the Telegram client")?;
    tracing::info!("🤖 Using bot token {}", client.token_masked());

    let transport = TelegramTransport::new(client, config.chat_id);
    match transport.chat_id() {
        Some(chat_id) => tracing::info!("💬 Group chat {} configured", chat_id),
        None => tracing::info!("💬 No chat configured, send /start in the group to bind it"),
    }

    let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);

    let poller = transport.poller(config.poll_timeout(), config.retry_delay());
    let poller_task = tokio::spawn(poller.run(tx.clone()));

    let cadence = config.cadence(cli.debug).context("invalid schedule")?;
    let scheduler_task = tokio::spawn(Scheduler::new(cadence).run(tx));

    let mut engine = RotationEngine::new(ledger, transport);

    tokio::select! {
        _ = engine.run(rx) => {}
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl-C")?;
            tracing::info!("🛑 Shutdown requested");
        }
    }

    poller_task.abort();
    scheduler_task.abort();

    for entry in engine.ledger().entries() {
        tracing::info!("📊 {}: {} weeks since hosting", entry.member, entry.weeks_since);
    }

    Ok(())
}

fn load_config(path: &str) -> host_rotation::Result<BotConfig> {
    let config = BotConfig::from_file(path)?;
    config.validate()?;
    tracing::info!("✅ Configuration loaded and validated successfully");
    Ok(config)
}

// 根據錯誤嚴重程度決定退出碼
fn exit_code(e: &RotationError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}
