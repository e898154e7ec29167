//! driftwatch CLI: run a full consistency report for one tenant and print
//! the JSON report.
//!
//! Exit codes: 0 when every check passed, 1 when drift was found, 2 on
//! operational failure (bad config, unreachable database, internal defect).

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use driftwatch::config::Config;
use driftwatch::dashboard::HttpDashboardClient;
use driftwatch::db::{seed_demo, SqliteStore};
use driftwatch::report::ReportRunner;
use driftwatch::validator::ConsistencyValidator;

struct Args {
    tenant_id: String,
    config_path: Option<PathBuf>,
    seed_demo: bool,
    pretty: bool,
}

fn print_usage() {
    eprintln!(
        "Usage: driftwatch <tenant-id> [options]\n\
         \n\
         Options:\n\
         \x20 --config <path>   Read config from <path> instead of ~/.driftwatch/config.json\n\
         \x20 --seed-demo       Seed the configured database with demo fixtures first\n\
         \x20 --pretty          Pretty-print the JSON report"
    );
}

fn parse_args() -> Result<Args, String> {
    let mut tenant_id = None;
    let mut config_path = None;
    let mut seed_demo = false;
    let mut pretty = false;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| "--config requires a path".to_string())?;
                config_path = Some(PathBuf::from(path));
            }
            "--seed-demo" => seed_demo = true,
            "--pretty" => pretty = true,
            "--help" | "-h" => return Err(String::new()),
            other if other.starts_with('-') => {
                return Err(format!("Unknown option: {other}"));
            }
            other => {
                if tenant_id.replace(other.to_string()).is_some() {
                    return Err("Only one tenant id may be given".to_string());
                }
            }
        }
    }

    Ok(Args {
        tenant_id: tenant_id.ok_or_else(|| "Missing required <tenant-id>".to_string())?,
        config_path,
        seed_demo,
        pretty,
    })
}

async fn run(args: Args) -> Result<bool, String> {
    let config = match &args.config_path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .map_err(|e| e.to_string())?;

    // One reference instant per run, taken in the tenant timezone and
    // threaded explicitly through every resolver and builder call.
    let now = chrono::Utc::now().with_timezone(&config.tz()).naive_local();
    log::info!(
        "Running report for tenant {} at {} ({})",
        args.tenant_id,
        now,
        config.timezone
    );

    let store = SqliteStore::open_at(&config.database_path).map_err(|e| e.to_string())?;
    if args.seed_demo {
        seed_demo(&store, &args.tenant_id, now).map_err(|e| e.to_string())?;
    }

    let dashboard = HttpDashboardClient::new(
        &config.dashboard_base_url,
        config.api_token.clone(),
        Duration::from_secs(config.request_timeout_secs),
    )
    .map_err(|e| e.to_string())?;

    let validator = ConsistencyValidator::new(Arc::new(dashboard), Arc::new(store))
        .with_drift_threshold(config.drift_threshold);
    let runner =
        ReportRunner::new(validator).with_max_concurrent_checks(config.max_concurrent_checks);

    let report = runner
        .run_full_report(&args.tenant_id, now)
        .await
        .map_err(|e| e.to_string())?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    }
    .map_err(|e| e.to_string())?;
    println!("{json}");

    Ok(report.is_valid)
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            if !message.is_empty() {
                eprintln!("{message}\n");
            }
            print_usage();
            return ExitCode::from(2);
        }
    };

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(message) => {
            eprintln!("driftwatch: {message}");
            ExitCode::from(2)
        }
    }
}
