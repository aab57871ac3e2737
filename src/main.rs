use color_eyre::{eyre::eyre, Result};
use joyremote::config::{self, AppConfig};
use joyremote::controller::{keyboard_debug, ControllerHandle};
use joyremote::status::StatusReporter;
use joyremote::transport::TransportHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config_path = config::config_path();
    config::ensure_default_config(&config_path).await?;
    let app_config = AppConfig::load(&config_path).await?;
    setup_logging(app_config.log_level()?);
    info!("Using configuration {}", config_path.display());

    let shutdown = CancellationToken::new();

    let transport = TransportHandle::spawn(&app_config.transport, shutdown.child_token())
        .map_err(|e| eyre!("Failed to start transport: {}", e))?;
    info!("Sending to {}", app_config.transport.endpoint());

    let controller = ControllerHandle::spawn(
        Some(app_config.controller.clone()),
        app_config.sampler.clone(),
        transport.sender(),
        shutdown.clone(),
    )
    .await
    .map_err(|e| eyre!("Failed to spawn controller: {}", e))?;

    let status = StatusReporter::spawn(controller.subscribe(), shutdown.child_token());
    if app_config.keyboard_debug {
        // Detached: a pending stdin read must not hold up shutdown
        let _keyboard = keyboard_debug::spawn(controller.event_sender(), shutdown.child_token())
            .map_err(|e| eyre!("Failed to start keyboard debug channel: {}", e))?;
    }

    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received, shutting down");

    controller.shutdown().await;
    if let Err(e) = status.await {
        error!("Status reporter panicked: {}", e);
    }
    transport.join().await;

    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    Ok(())
}

fn setup_logging(level: Level) {
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
