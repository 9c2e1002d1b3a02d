//! Smoke-checks a running access-control backend.
//!
//! Usage: `access-smoke [--config <file>]`. Without a file, configuration comes
//! from `ACCESS_API_*` variables (a `.env` file is honored). Log level is
//! taken from `ACCESS_CLIENT_LOG`, then `RUST_LOG`, defaulting to `info`.

use std::path::PathBuf;
use std::process::ExitCode;

use access_client::{AccessApi, ClientConfig, ClientError, ConfiguredClient};
use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const ADMIN_USER: &str = "admin";
const ADMIN_PASSWORD: &str = "admin123";
const ADMIN_PIN: &str = "8729";

#[derive(Debug, Parser)]
#[command(author, version, about = "Smoke-check a running access-control backend")]
struct Args {
    /// TOML config file; `ACCESS_API_*` variables are used when omitted.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_env("ACCESS_CLIENT_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn load_config(args: &Args) -> anyhow::Result<ClientConfig> {
    match &args.config {
        Some(path) => ClientConfig::from_file(path).with_context(|| format!("loading {}", path.display())),
        None => ClientConfig::from_env().context("loading ACCESS_API_* environment"),
    }
}

fn check<T, F>(name: &str, f: F) -> bool
where
    F: FnOnce() -> Result<T, ClientError>,
    T: std::fmt::Debug,
{
    match f() {
        Ok(value) => {
            info!(check = name, ?value, "ok");
            true
        }
        Err(err) => {
            error!(check = name, error = %err, "failed");
            false
        }
    }
}

fn run(args: &Args) -> anyhow::Result<bool> {
    let config = load_config(args)?;
    info!(base_url = config.base_url(), timeout_ms = config.timeout_ms(), "starting smoke checks");
    let api = AccessApi::new(ConfiguredClient::new(config)?);

    let results = [
        check("status", || api.status()),
        check("admin login", || api.login(ADMIN_USER, ADMIN_PASSWORD)),
        check("access verify", || api.verify_access(ADMIN_PIN)),
        check("logs", || api.list_logs().map(|logs| logs.len())),
    ];
    let passed = results.iter().filter(|ok| **ok).count();
    info!(passed, total = results.len(), "smoke checks finished");
    Ok(passed == results.len())
}

fn main() -> ExitCode {
    let args = Args::parse();
    // A missing .env is fine.
    let _ = dotenvy::dotenv();
    init_tracing();

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
