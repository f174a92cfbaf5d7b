use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use flightload::config::CONFIG;
use flightload::data_models::{DEFAULT_MAX_PRICE, DEFAULT_MAX_STOPS, SearchRequest};
use flightload::metrics::MetricsCollector;
use flightload::scenario::{FlightSearchScenario, ScenarioOptions, build_client};
use flightload::scheduler::Scheduler;
use flightload::stages::{StageProfile, parse_duration};
use flightload::stub::{self, StubOptions};

#[derive(Parser)]
#[command(name = "flightload", about = "Load generator for the flight search endpoint")]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ramp virtual users against the search endpoint and report check results
    Run(RunArgs),
    /// Serve a stub flight search endpoint
    Stub(StubArgs),
}

#[derive(Args)]
struct RunArgs {
    #[arg(long, default_value_t = CONFIG.target_url.clone())]
    url: String,
    #[arg(long, default_value_t = DEFAULT_MAX_PRICE)]
    max_price: f64,
    #[arg(long, default_value_t = DEFAULT_MAX_STOPS)]
    max_stops: u32,
    /// Comma separated `<duration>:<target>` stages, e.g. `30s:100,1m:100,30s:0`
    #[arg(long, default_value_t = CONFIG.stages.clone())]
    stages: String,
    #[arg(long, default_value_t = CONFIG.think_time.clone())]
    think_time: String,
    #[arg(long, default_value_t = CONFIG.latency_threshold.clone())]
    latency_threshold: String,
    #[arg(long, default_value_t = CONFIG.request_timeout.clone())]
    timeout: String,
    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
    /// Exit with a failure status if any check failed
    #[arg(long)]
    fail_on_check_failure: bool,
}

#[derive(Args)]
struct StubArgs {
    #[arg(long, default_value_t = CONFIG.stub_addr.clone())]
    addr: String,
    /// Delay added to every search response
    #[arg(long, default_value = "0s")]
    delay: String,
    /// Answer every search with this status code
    #[arg(long)]
    status: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    // Also installs the log -> tracing bridge, so log::info! etc. work
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(true)
        .init();

    match cli.command {
        Command::Run(args) => run(args).await,
        Command::Stub(args) => {
            serve_stub(args).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run(args: RunArgs) -> Result<ExitCode> {
    let profile: StageProfile = args.stages.parse().context("Invalid --stages")?;
    let options = ScenarioOptions {
        url: args.url,
        request: SearchRequest::new(args.max_price, args.max_stops),
        think_time: parse_duration(&args.think_time).context("Invalid --think-time")?,
        latency_threshold: parse_duration(&args.latency_threshold)
            .context("Invalid --latency-threshold")?,
    };
    let client = build_client(parse_duration(&args.timeout).context("Invalid --timeout")?)?;

    let scenario = Arc::new(FlightSearchScenario::new(client, options));
    let metrics = Arc::new(MetricsCollector::new(scenario.check_set()));

    let shutdown = CancellationToken::new();
    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let summary = Scheduler::new(scenario, profile, metrics)
        .run(shutdown)
        .await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{summary}");
    }

    if args.fail_on_check_failure && summary.has_failures() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

async fn serve_stub(args: StubArgs) -> Result<()> {
    let addr: SocketAddr = args
        .addr
        .parse()
        .with_context(|| format!("Invalid --addr '{}'", args.addr))?;
    let options = StubOptions {
        delay: parse_duration(&args.delay).context("Invalid --delay")?,
        forced_status: args.status,
    };
    stub::serve(addr, options).await
}
