#![allow(dead_code)]

mod cache;
mod client;
mod config;
mod error;
mod failure_memory;
mod fees;
mod model;
mod payment;
mod picker;
mod probe;
mod rapid;
mod routes;
mod rpc;
mod scid;
mod selector;
mod session;
mod stats;
mod ui;

mod attempt_loop;

use clap::Parser;
use client::RpcNodeClient;
use config::Config;
use log::{error, info, warn};
use session::Session;
use stats::StatsWriter;
use std::path::PathBuf;
use std::process::ExitCode;

/// CLI flags mirror the commonly-tuned config knobs (§2.1); anything set on
/// the command line overrides the TOML value for this run only.
#[derive(Parser)]
#[command(name = "rebalancer", about = "Circular rebalancer for a Lightning node")]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "rebalancer.toml")]
    config: PathBuf,

    /// Fixed amount to rebalance per attempt, in satoshis
    #[arg(long)]
    amount: Option<u64>,
    /// Only consider these source channels (decimal or block×tx×output scid)
    #[arg(long, value_delimiter = ',')]
    from: Option<Vec<String>>,
    /// Only consider these target channels (decimal or block×tx×output scid)
    #[arg(long, value_delimiter = ',')]
    to: Option<Vec<String>>,
    /// Shorthand for --fromperc and --toperc together
    #[arg(long)]
    perc: Option<f64>,
    /// Liquidity threshold a source channel must exceed, as % of capacity
    #[arg(long)]
    fromperc: Option<f64>,
    /// Liquidity threshold a target channel must be under, as % of capacity
    #[arg(long)]
    toperc: Option<f64>,
    /// Economic-ratio fee strategy multiplier
    #[arg(long)]
    econratio: Option<f64>,
    /// Fixed-PPM fee cap
    #[arg(long)]
    feeppm: Option<u32>,
}

impl Cli {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(amount) = self.amount {
            config.amount.amount_sat = amount;
        }
        if let Some(from) = &self.from {
            config.selector.only_from = from.clone();
        }
        if let Some(to) = &self.to {
            config.selector.only_to = to.clone();
        }
        if let Some(perc) = self.perc {
            config.selector.from_pct = perc;
            config.selector.to_pct = perc;
        }
        if let Some(fromperc) = self.fromperc {
            config.selector.from_pct = fromperc;
        }
        if let Some(toperc) = self.toperc {
            config.selector.to_pct = toperc;
        }
        if let Some(econratio) = self.econratio {
            config.fees.econ_ratio = econratio;
        }
        if let Some(feeppm) = self.feeppm {
            config.fees.fee_limit_ppm = feeppm;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("invalid configuration: {}", e);
            return ExitCode::from(1);
        }
    };
    cli.apply_overrides(&mut config);
    if let Err(e) = config.validate() {
        eprintln!("invalid configuration after CLI overrides: {}", e);
        return ExitCode::from(1);
    }

    env_logger::Builder::new()
        .filter_level(config.general.log_level.parse().unwrap_or(log::LevelFilter::Info))
        .format_timestamp_secs()
        .init();

    info!("rebalancer v{} starting", env!("CARGO_PKG_VERSION"));
    if config.general.dry_run {
        warn!("dry-run mode: no payments will be sent");
    }

    match run(config).await {
        Ok(code) => code,
        Err(e) => {
            error!("session aborted: {:#}", e);
            ExitCode::from(1)
        }
    }
}

/// Connects, collects a session snapshot, runs the attempt loop to
/// completion, persists caches, and maps the outcome onto the exit-code
/// contract (§6): `0` on any successful attempt, `1` on a non-retry setup
/// error, `2` if the session deadline tripped before a single success.
async fn run(config: Config) -> anyhow::Result<ExitCode> {
    let channel = rpc::connect(&config.node.rpc_uri, &config.node.tls_cert_path).await?;
    let client = RpcNodeClient::new(channel, config.node.macaroon_hex.clone());

    let now = chrono::Utc::now().timestamp();
    let mut session = Session::collect(&client, &config, now).await?;

    let stats = config.stats.csv_path.clone().map(StatsWriter::new);

    let result = attempt_loop::run(&client, &config, &mut session, stats.as_ref(), now).await;

    if let Err(e) = session.persist_caches(now) {
        warn!("failed to persist node cache: {:#}", e);
    }

    info!(
        "session complete: {} succeeded, {} failed, {} sat rebalanced, {} msat in fees",
        result.successful_attempts, result.failed_attempts, result.successful_amt_sat, result.paid_fee_msat
    );

    if result.successful_attempts > 0 {
        Ok(ExitCode::from(0))
    } else {
        Ok(ExitCode::from(2))
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use client::mock::MockNodeClient;

    /// Exercises the full wiring (`Session::collect` -> `attempt_loop::run`)
    /// without a live node: no channels means no candidate pairs, so the
    /// session ends on its first pick instead of looping.
    #[tokio::test]
    async fn session_ends_immediately_with_no_candidate_pairs() {
        let mock = MockNodeClient::new();
        let config = Config::test_default("/dev/null".into());
        let mut session = Session::collect(&mock, &config, 1000).await.unwrap();

        let result = attempt_loop::run(&mock, &config, &mut session, None, 1000).await;

        assert_eq!(result.successful_attempts, 0);
        assert_eq!(result.failed_attempts, 0);
    }
}
