//! `welcomer` - daily new-hire welcome emails over Microsoft Graph
//!
//! Reads the new-hire feed, signs in with the device code flow (or a cached
//! account), sends each of today's hires a welcome email and mails a delivery
//! report to the Site IT distribution list.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use welcomer_core::config::{
    DEFAULT_REPORT_RECIPIENT, DEFAULT_SEND_MAIL_ENDPOINT, DEFAULT_SITE_LOCATION,
};
use welcomer_core::{Credentials, DeviceAuthorization, RunConfiguration, RunSummary};

/// Command line. Secrets (`TENANT_ID`, `APP_ID`, `SECRET`, `DEV_PASS`) are
/// only read from the environment.
#[derive(Parser, Debug)]
#[command(name = "welcomer", version, about = "Send welcome emails to today's new hires")]
struct Cli {
    /// URL of the new-hire CSV feed
    #[arg(long, env = "NEW_HIRE_CSV_URL")]
    csv_url: String,

    /// Site whose new hires are greeted
    #[arg(long, env = "NEW_HIRE_LOCATION", default_value = DEFAULT_SITE_LOCATION)]
    location: String,

    /// Start date to match (YYYY-MM-DD), defaults to today
    #[arg(long, env = "NEW_HIRE_DATE")]
    date: Option<NaiveDate>,

    /// Plaintext token cache path; the encrypted copy is stored beside it with `.enc`
    #[arg(long, env = "NEW_HIRE_CACHE_FILE")]
    cache_file: Option<PathBuf>,

    /// Distribution address for delivery reports
    #[arg(long, env = "NEW_HIRE_REPORT_TO", default_value = DEFAULT_REPORT_RECIPIENT)]
    report_to: String,

    /// Cached username to sign in as when the cache holds several accounts
    #[arg(long, env = "NEW_HIRE_ACCOUNT")]
    account: Option<String>,

    /// Graph sendMail endpoint
    #[arg(long, env = "GRAPH_SEND_MAIL_ENDPOINT", default_value = DEFAULT_SEND_MAIL_ENDPOINT)]
    endpoint: String,
}

impl Cli {
    fn into_config(self, credentials: Credentials) -> anyhow::Result<RunConfiguration> {
        let mut config = RunConfiguration::new(credentials, &self.csv_url)?
            .with_site_location(self.location)
            .with_report_recipient(self.report_to)
            .with_preferred_account(self.account)
            .with_endpoint(&self.endpoint)?;

        if let Some(date) = self.date {
            config = config.with_reference_date(date);
        }
        if let Some(path) = self.cache_file {
            config = config.with_cache_path(path);
        }
        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "welcomer=info,welcomer_core=info,welcomer_oauth=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(summary) => {
            println!("{summary}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Run aborted: {e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<RunSummary> {
    let credentials = Credentials::from_env()?;
    let config = cli.into_config(credentials)?;

    info!(
        "Looking for new hires starting {} at {}",
        config.reference_date_str(),
        config.site_location
    );

    welcomer_core::run(&config, show_device_prompt)
        .await
        .context("welcome run failed")
}

fn show_device_prompt(auth: &DeviceAuthorization) {
    let message = auth.message();
    if let Err(e) = write_prompt(&mut std::io::stdout().lock(), &message) {
        warn!("Could not print the sign-in prompt ({e}): {message}");
    }
}

fn write_prompt(out: &mut impl Write, message: &str) -> std::io::Result<()> {
    writeln!(out, "{message}")?;
    out.flush()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn credentials() -> Credentials {
        Credentials::from_lookup(|key| Some(format!("{key}-value"))).unwrap()
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_overrides_reach_config() {
        let cli = Cli::try_parse_from([
            "welcomer",
            "--csv-url",
            "https://feeds.example.com/hires.csv",
            "--location",
            "Austin",
            "--date",
            "2022-09-27",
            "--cache-file",
            "/tmp/welcomer-cache.json",
            "--report-to",
            "ops@example.com",
            "--account",
            "runner@example.com",
        ])
        .unwrap();

        let config = cli.into_config(credentials()).unwrap();
        assert_eq!(config.site_location, "Austin");
        assert_eq!(config.reference_date_str(), "2022-09-27");
        assert_eq!(config.cache_path, PathBuf::from("/tmp/welcomer-cache.json"));
        assert_eq!(config.report_recipient, "ops@example.com");
        assert_eq!(config.preferred_account.as_deref(), Some("runner@example.com"));
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_prompt_write_reports_failure() {
        let mut out = Vec::new();
        write_prompt(&mut out, "enter the code ABCD").unwrap();
        assert_eq!(out, b"enter the code ABCD\n");

        let err = write_prompt(&mut ClosedPipe, "enter the code ABCD").unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_bad_date_is_rejected() {
        let result = Cli::try_parse_from([
            "welcomer",
            "--csv-url",
            "https://feeds.example.com/hires.csv",
            "--date",
            "27/09/2022",
        ]);
        assert!(result.is_err());
    }
}
