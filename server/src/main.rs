use anyhow::Context;
use clap::Parser;
use generator::dataset::GeneratorConfig;
use gui_bridge::bridge::{BridgeState, GuiBridge};
use gui_bridge::model::MapConfigPayload;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::ServerConfig;
use workflow::runner::{load_catalog, summarize};

mod generator;
mod gui_bridge;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Station data and geocoding bridge for the EV map")]
struct Args {
    /// Load server settings from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    /// Station dataset (compact JSON array or Open Charge Map export)
    #[arg(long)]
    dataset: Option<PathBuf>,
    /// Generate this many synthetic stations when no dataset is given
    #[arg(long)]
    synthetic: Option<usize>,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    #[arg(long)]
    bind: Option<SocketAddr>,
    /// Print a dataset summary and exit unless --serve is also set
    #[arg(long, default_value_t = false)]
    summary: bool,
    /// Keep the HTTP bridge alive for the visualizer
    #[arg(long, default_value_t = false)]
    serve: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    }
    .apply_env();
    if let Some(dataset) = args.dataset {
        config.dataset = Some(dataset);
    }
    if let Some(count) = args.synthetic {
        config.synthetic = Some(GeneratorConfig {
            count,
            seed: args.seed,
            ..Default::default()
        });
    }
    if let Some(bind) = args.bind {
        config.bind = bind;
    }

    let catalog = load_catalog(&config)?;

    if args.summary {
        let summary = summarize(&catalog);
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("encoding summary")?
        );
    }

    if args.serve {
        if config.access_token.is_none() {
            log::warn!("no map access token configured; clients fall back to catalog search");
        }
        let bridge = GuiBridge::start(
            BridgeState::new(catalog, MapConfigPayload::from(&config)),
            config.bind,
        )?;
        bridge.publish_status(&format!(
            "HTTP bridge running on {} (Ctrl+C to stop)...",
            bridge.address()
        ));
        let runtime = TokioBuilder::new_current_thread()
            .enable_all()
            .build()
            .context("creating runtime for signal handling")?;
        runtime.block_on(async {
            signal::ctrl_c().await.context("awaiting Ctrl+C to exit")?;
            Ok::<(), anyhow::Error>(())
        })?;
    }

    Ok(())
}
