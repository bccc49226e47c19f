use clap::Parser;
use miette::{IntoDiagnostic, Result, bail};
use paywatch::application::poller::{PollerConfig, PollerHooks, StatusPoller};
use paywatch::domain::status::{StatusError, StatusResult};
use paywatch::infrastructure::http::HttpStatusGateway;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Invoice or order identifier to watch
    invoice_id: String,

    /// Payment gateway status endpoint
    #[arg(long)]
    endpoint: String,

    /// Bearer token for the gateway, if it requires one
    #[arg(long)]
    api_key: Option<String>,

    /// Milliseconds between status checks
    #[arg(long, default_value_t = 3000)]
    interval_ms: u64,

    /// Maximum milliseconds to keep polling before giving up
    #[arg(long, default_value_t = 300_000)]
    timeout_ms: u64,

    /// Perform a single check and exit instead of polling
    #[arg(long)]
    once: bool,
}

enum Outcome {
    Paid(StatusResult),
    Failed(StatusError),
    TimedOut,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let gateway =
        Arc::new(HttpStatusGateway::new(&cli.endpoint, cli.api_key.clone()).into_diagnostic()?);
    let config = PollerConfig {
        interval: Duration::from_millis(cli.interval_ms),
        timeout: Duration::from_millis(cli.timeout_ms),
        auto_start: !cli.once,
    };

    if cli.once {
        let poller = StatusPoller::new(gateway, &cli.invoice_id, config, PollerHooks::new());
        return match poller.check_status().await {
            Some(Ok(snapshot)) => {
                let rendered = serde_json::to_string_pretty(&snapshot).into_diagnostic()?;
                println!("{rendered}");
                Ok(())
            }
            Some(Err(error)) => bail!("status check failed: {error}"),
            None => bail!("polling window already elapsed"),
        };
    }

    let (sender, mut receiver) = mpsc::unbounded_channel();
    let hooks = {
        let success_tx = sender.clone();
        let error_tx = sender.clone();
        let timeout_tx = sender;
        PollerHooks::new()
            .on_status(|result| match result {
                Ok(snapshot) => info!(status = %snapshot.status, "status update"),
                Err(error) => warn!(error = %error, "status check failed"),
            })
            .on_success(move |result| {
                let _ = success_tx.send(Outcome::Paid(result.clone()));
            })
            .on_error(move |error| {
                let _ = error_tx.send(Outcome::Failed(error.clone()));
            })
            .on_timeout(move || {
                let _ = timeout_tx.send(Outcome::TimedOut);
            })
    };

    // Keep the poller alive until the session reports back; dropping it
    // would tear the session down.
    let _poller = StatusPoller::new(gateway, &cli.invoice_id, config, hooks);
    match receiver.recv().await {
        Some(Outcome::Paid(Ok(snapshot))) => {
            let rendered = serde_json::to_string_pretty(&snapshot).into_diagnostic()?;
            println!("{rendered}");
            Ok(())
        }
        Some(Outcome::Paid(Err(_))) => bail!("payment confirmed but no payload was returned"),
        Some(Outcome::Failed(error)) => bail!("payment did not complete: {error}"),
        Some(Outcome::TimedOut) => bail!(
            "gave up after {} ms without a terminal payment status",
            cli.timeout_ms
        ),
        None => bail!("poller ended without reporting an outcome"),
    }
}
