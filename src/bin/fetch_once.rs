//! Run one aggregation against the configured calendar and print the JSON payload.
//!
//! ```text
//! fetch-once --tiers major --tiers mid --lookback-hours 48 --max-per-feed 5
//! ```

use calendar_rss::{api, build_state, logging, AggregateParams, ServiceConfig};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "fetch-once", about = "Aggregate calendar feeds once and print JSON")]
struct Args {
    /// Tier to include; repeat for several. Defaults to major, mid and light.
    #[arg(long = "tiers")]
    tiers: Vec<String>,

    #[arg(long, default_value_t = 8760.0)]
    lookback_hours: f64,

    #[arg(long, default_value_t = 10)]
    max_per_feed: usize,

    /// Calendar file; overrides CALENDAR_PATH.
    #[arg(long)]
    calendar: Option<std::path::PathBuf>,

    /// Pretty-print the payload.
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    logging::init();
    let args = Args::parse();

    let mut cfg = ServiceConfig::from_env();
    if args.calendar.is_some() {
        cfg.calendar_path = args.calendar.clone();
    }
    let state = build_state(&cfg)?;

    let mut params = AggregateParams {
        lookback_hours: args.lookback_hours,
        max_per_feed: args.max_per_feed,
        ..AggregateParams::default()
    };
    if !args.tiers.is_empty() {
        params.tiers = args.tiers;
    }

    let payload = match api::respond(&state.aggregator, &params).await {
        Ok(p) => p,
        Err(never) => match never {},
    };
    let out = if args.pretty {
        serde_json::to_string_pretty(&payload)?
    } else {
        serde_json::to_string(&payload)?
    };
    println!("{out}");
    Ok(())
}
