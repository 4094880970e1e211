use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// cablecastd: headless control-surface daemon for Cablecast automation
#[derive(Parser)]
#[command(name = "cablecastd", version, about)]
struct Cli {
    /// Path to the config file (TOML).
    #[arg(short, long, default_value = "/etc/cablecastd/config.toml")]
    config: PathBuf,

    /// Enable JSON log output (for journald).
    #[arg(long)]
    json: bool,

    /// Validate config and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries listings for the control surface.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cablecastd=info"));

    if cli.json {
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    info!("cablecastd v{}", env!("CARGO_PKG_VERSION"));

    let config_path = cli
        .config
        .canonicalize()
        .unwrap_or_else(|_| cli.config.clone());
    let config = cablecastd::config::load(&config_path)?;

    if cli.check {
        let server = &config.cablecast;
        println!(
            "config OK: host {}, location {}, {} bindings",
            if server.host.is_empty() { "<unset>" } else { server.host.as_str() },
            server.location_id,
            config.bindings.len(),
        );
        if let Some(field) = server.missing_field() {
            println!("warning: {field} is not set, polling will stay disconnected");
        }
        return Ok(());
    }

    info!(
        "loaded config: polling every {} ms, {} bindings",
        config.daemon.poll_interval_ms,
        config.bindings.len()
    );

    cablecastd::daemon::run(config, config_path).await?;

    Ok(())
}
