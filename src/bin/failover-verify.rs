//! Failover verification harness.
//!
//! Exit codes: 0 pass, 1 assertion failure, 2 setup or connectivity failure.

use std::process::ExitCode;
use std::time::Duration;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use url::Url;

use failover_proxy::harness::{self, ChaosMode, Criteria, HarnessConfig, Progress, VerificationError};
use failover_proxy::routing::PoolId;

#[derive(Debug, Parser)]
#[command(name = "failover-verify")]
#[command(about = "Inject a fault into the primary pool and verify the proxy fails over cleanly")]
struct Cli {
    /// Public endpoint of the proxy
    #[arg(long, env = "PROXY_URL", default_value = "http://localhost:8080")]
    proxy_url: Url,

    /// Direct address of the primary backend (fault control)
    #[arg(long, env = "PRIMARY_URL", default_value = "http://localhost:8081")]
    primary_url: Url,

    /// Pool label the primary reports
    #[arg(long, env = "ACTIVE_POOL", default_value = "blue")]
    primary_pool: PoolId,

    /// Path probed through the proxy
    #[arg(long, default_value = "/version")]
    status_path: String,

    #[arg(long, value_enum, default_value_t = ChaosMode::Error)]
    chaos_mode: ChaosMode,

    /// Sampling window
    #[arg(long, default_value_t = 10_000, value_parser = clap::value_parser!(u64).range(1..))]
    duration_ms: u64,

    /// Delay between samples
    #[arg(long, default_value_t = 150, value_parser = clap::value_parser!(u64).range(1..))]
    interval_ms: u64,

    /// Per-request timeout
    #[arg(long, default_value_t = 6_000, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_ms: u64,

    /// Minimum share of samples served by the backup, in percent
    #[arg(long, default_value_t = 95.0)]
    min_backup_ratio: f64,

    /// After cleanup, wait this long and require the primary to serve again
    #[arg(long)]
    recovery_wait_ms: Option<u64>,

    /// Print the summary as JSON instead of text
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn harness_config(&self) -> HarnessConfig {
        HarnessConfig {
            proxy_url: self.proxy_url.clone(),
            primary_url: self.primary_url.clone(),
            primary_pool: self.primary_pool,
            status_path: self.status_path.clone(),
            chaos_mode: self.chaos_mode,
            duration: Duration::from_millis(self.duration_ms),
            interval: Duration::from_millis(self.interval_ms),
            request_timeout: Duration::from_millis(self.timeout_ms),
            criteria: Criteria {
                max_non2xx: 0,
                min_backup_ratio: self.min_backup_ratio,
            },
            recovery_wait: self.recovery_wait_ms.map(Duration::from_millis),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "failover_proxy=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.harness_config();

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let quiet = cli.json;
    let backup = config.primary_pool.other();
    let result = harness::run_verification(&config, &cancel, |progress| {
        if quiet {
            return;
        }
        match progress {
            Progress::Baseline(observation) => println!("baseline: {}", observation.describe()),
            Progress::FaultInjected(mode) => {
                println!("fault injected on {} (mode={mode})", config.primary_pool)
            }
            Progress::Sample(sample) => println!(
                "[{:>5}ms] #{} {}",
                sample.offset_ms,
                sample.seq,
                sample.observation.describe()
            ),
            Progress::FaultReleased => println!("fault cleared"),
            Progress::Recovery(observation) => println!("recovery: {}", observation.describe()),
        }
    })
    .await;

    match result {
        Ok(summary) => {
            if cli.json {
                print_json(&summary);
            } else {
                println!("{}", summary.render());
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            match (&err, cli.json) {
                (VerificationError::Assertion { summary, .. }, true) => print_json(summary),
                (VerificationError::Assertion { summary, .. }, false) => {
                    println!("{}", summary.render())
                }
                _ => {}
            }
            eprintln!("FAIL: {err} (backup pool {backup})");
            ExitCode::from(err.exit_code())
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("failed to serialize summary: {e}"),
    }
}
