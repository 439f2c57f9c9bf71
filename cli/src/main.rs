use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use probe_core::{ComplianceProbe, ProbeConfig, ProbeError, UreqTransport};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Check a search server's REST endpoints for HTTP method compliance.
///
/// Values come from the optional JSON config file first; flags and their
/// environment variables override them.
#[derive(Parser)]
#[command(name = "rest-probe")]
struct Cli {
    /// JSON file with `base_url`, `index_name`, `timeout_secs` and `cleanup`.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Defaults to http://127.0.0.1:9200.
    #[arg(long, env = "PROBE_BASE_URL")]
    base_url: Option<String>,
    /// Index used by the settings scenarios; a unique name is generated if unset.
    #[arg(long, env = "PROBE_INDEX")]
    index: Option<String>,
    #[arg(long, env = "PROBE_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,
    /// Leave the index in place after the run.
    #[arg(long)]
    no_cleanup: bool,
}

impl Cli {
    fn into_config(self) -> Result<ProbeConfig, ProbeError> {
        let base = match &self.config {
            Some(path) => ProbeConfig::from_json_file(path)?,
            None => ProbeConfig::default(),
        };
        Ok(self.apply(base))
    }

    fn apply(self, mut config: ProbeConfig) -> ProbeConfig {
        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }
        if let Some(index) = self.index {
            config.index_name = Some(index);
        }
        if let Some(timeout_secs) = self.timeout_secs {
            config.timeout_secs = timeout_secs;
        }
        if self.no_cleanup {
            config.cleanup = false;
        }
        config
    }
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Cli::parse().into_config()?;
    let probe = ComplianceProbe::from_config(&config)?;
    tracing::info!(base_url = %config.base_url, index = probe.index_name(), "starting probe");

    let report = probe.run(&UreqTransport::new(config.timeout()));
    println!("{report}");

    Ok(if report.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
