mod config;
mod controller;
mod error;
mod format;
mod output;
mod projection;
mod search;
mod session;
mod sources;
mod types;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use controller::{Command, Controller};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "price-target",
    about = "Project the market cap a crypto asset needs to reach a target price"
)]
struct Args {
    /// Path to config YAML file (optional; defaults apply when missing)
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output format for one-shot commands: "table" (default) or "json"
    #[arg(short, long, default_value = "table")]
    output: String,

    /// Skip the network and answer from the built-in asset list
    #[arg(long)]
    offline: bool,

    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// List one page of assets ordered by market cap
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Search assets by name or symbol
    Search { query: String },
    /// Show one asset by id
    Coin { id: String },
    /// Market cap and multiplier required to reach a target price
    Project {
        /// Asset id, e.g. "bitcoin"
        #[arg(long, conflicts_with = "custom", required_unless_present = "custom")]
        coin: Option<String>,

        /// Your own asset instead of a listed one
        #[arg(long, num_args = 4, value_names = ["NAME", "SYMBOL", "PRICE", "SUPPLY"])]
        custom: Option<Vec<String>>,

        /// Target price in USD
        #[arg(long)]
        target: String,
    },
    /// Interactive session reading commands from stdin (default)
    Interactive,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let json = match args.output.as_str() {
        "table" => false,
        "json" => true,
        other => anyhow::bail!("unknown output format '{}' (expected table or json)", other),
    };

    let mut cfg = config::Config::load_or_default(&args.config)
        .with_context(|| format!("loading config from {}", args.config.display()))?;
    if args.offline {
        cfg.use_backup_data = true;
    }

    let coingecko_key = std::env::var("COINGECKO_API_KEY").ok();
    let client = reqwest::Client::builder()
        .user_agent("price-target/0.1")
        .build()
        .context("building HTTP client")?;

    let gateway = sources::Gateway::new(&cfg, client, coingecko_key);
    info!("Using {} market source(s) before built-in data", gateway.source_count());

    let fmt = format::Formatter::from_config(&cfg);
    let command = args.command.unwrap_or(Cmd::Interactive);
    let mut out = std::io::stdout();

    match command {
        Cmd::List { page } => {
            if page == 0 {
                anyhow::bail!("--page starts at 1");
            }
            let assets = gateway.fetch_asset_page(page, cfg.items_per_page).await;
            if json {
                output::write_json(&mut out, &assets)?;
            } else {
                output::write_asset_table(&mut out, &assets, None, &fmt)?;
            }
        }
        Cmd::Search { query } => {
            let assets = gateway.search_assets(&query).await;
            if json {
                output::write_json(&mut out, &assets)?;
            } else {
                output::write_asset_table(&mut out, &assets, None, &fmt)?;
            }
        }
        Cmd::Coin { id } => {
            let asset = gateway
                .fetch_asset_details(&id)
                .await
                .with_context(|| format!("no asset found with id '{}'", id))?;
            if json {
                output::write_json(&mut out, &asset)?;
            } else {
                output::write_selection(&mut out, &asset, &fmt)?;
            }
        }
        Cmd::Project {
            coin,
            custom,
            target,
        } => {
            let target = projection::validate_target_price(&target)?;
            let asset = match (coin, custom) {
                (_, Some(fields)) => {
                    projection::create_custom_asset(&fields[0], &fields[1], &fields[2], &fields[3])?
                }
                (Some(id), None) => gateway
                    .fetch_asset_details(&id)
                    .await
                    .with_context(|| format!("no asset found with id '{}'", id))?,
                (None, None) => anyhow::bail!("pass --coin <id> or --custom <name> <symbol> <price> <supply>"),
            };
            let result = projection::calculate_projection(&asset, target);
            if json {
                output::write_projection_json(&mut out, &result)?;
            } else {
                output::write_selection(&mut out, &asset, &fmt)?;
                output::write_projection(&mut out, &result, &fmt)?;
            }
        }
        Cmd::Interactive => {
            let (mut controller, inbox) = Controller::new(&cfg, Arc::new(gateway), out);
            let (tx, rx) = mpsc::unbounded_channel();
            // Blocking reads on a plain thread; the process exits without
            // waiting for it.
            std::thread::spawn(move || read_commands(tx));
            controller.run(inbox, rx).await?;
            return Ok(());
        }
    }

    out.flush().context("flushing stdout")?;
    Ok(())
}

fn read_commands(tx: mpsc::UnboundedSender<Command>) {
    for line in std::io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("reading stdin: {}", e);
                return;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<Command>() {
            Ok(cmd) => {
                if tx.send(cmd).is_err() {
                    return;
                }
            }
            Err(e) => eprintln!("Error: {}", e),
        }
    }
}
