use tea_sepolia::app::App;
use tea_sepolia::config::TeaConfig;
use tea_sepolia::menu;

use anyhow::{Context, Result};
use clap::Parser;
use core_logic::setup_logger;
use dotenv::dotenv;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "chains/tea-sepolia/config.toml")]
    config: String,

    /// Skip the menu and run the daily schedule until Ctrl+C
    #[arg(long)]
    schedule: bool,

    /// Skip the menu and send one batch of this many transfers per account
    #[arg(long, conflicts_with = "schedule")]
    count: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    let config = TeaConfig::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config))?;

    // Keep guard alive for file logging
    let _log_guard = setup_logger(&config.log_dir);
    info!("Loaded config from: {}", args.config);

    let mut app = match App::connect(config).await {
        Ok(app) => app,
        Err(e) => {
            error!("Startup failed: {:#}", e);
            return Err(e);
        }
    };

    if let Some(count) = args.count {
        app.run_batch(count).await?;
    } else if args.schedule {
        app.run_schedule().await?;
    } else {
        menu::run(&mut app).await?;
    }

    Ok(())
}
