use std::path::PathBuf;

use arma3_watchdog::config::WatchdogSettings;
use arma3_watchdog::process_monitor::SystemProbe;
use arma3_watchdog::supervisor::{ServerStartup, ShellLauncher, Supervisor};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();
    tracing::info!("Arma 3 server watchdog starting");

    let settings_path = std::env::var("ARMA_WATCHDOG_SETTINGS")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("watchdog.toml"));
    let settings = WatchdogSettings::load(&settings_path);

    let launcher = ShellLauncher::new(&settings.shell);
    let startup = ServerStartup::new(&settings, launcher);
    let mut supervisor = Supervisor::new(SystemProbe, startup, &settings);

    // 감시 루프는 스스로 끝나지 않는다. Ctrl+C / 외부 종료로만 멈춤
    tokio::select! {
        _ = supervisor.run() => {}
        _ = shutdown_signal() => tracing::info!("Shutdown signal received"),
    }

    tracing::info!("Arma 3 server watchdog shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        // 신호를 받을 수 없으면 외부 kill 전까지 계속 감시
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
