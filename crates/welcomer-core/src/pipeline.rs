//! One end-to-end run: ingest, authenticate, deliver, re-seal the cache.

use std::fmt;

use reqwest::Client;
use tracing::info;
use welcomer_oauth::{DeviceAuthorization, OAuthClient, Provider, PublicClientApp};

use crate::auth;
use crate::config::RunConfiguration;
use crate::dispatch::{self, DeliveryOutcome, GraphMailer};
use crate::error::Result;
use crate::roster;
use crate::session::CacheSession;

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Candidates matched in the feed.
    pub candidates: usize,
    /// Welcome emails Graph accepted.
    pub welcomed: usize,
    /// Welcome emails rejected or not sent.
    pub failed: usize,
    /// Reports Graph accepted.
    pub reports_sent: usize,
}

impl RunSummary {
    /// Tallies delivery outcomes.
    #[must_use]
    pub fn from_outcomes(outcomes: &[DeliveryOutcome]) -> Self {
        let welcomed = outcomes.iter().filter(|o| o.welcomed()).count();
        Self {
            candidates: outcomes.len(),
            welcomed,
            failed: outcomes.len() - welcomed,
            reports_sent: outcomes.iter().filter(|o| o.reported()).count(),
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} new hire(s): {} welcomed, {} failed, {} report(s) sent",
            self.candidates, self.welcomed, self.failed, self.reports_sent
        )
    }
}

/// Runs the whole job.
///
/// The token cache is re-encrypted on every exit path, including errors.
///
/// # Errors
///
/// Returns an error if the feed cannot be fetched or parsed, or if no token
/// can be obtained. Individual delivery failures are not errors.
pub async fn run(
    config: &RunConfiguration,
    prompt: impl FnOnce(&DeviceAuthorization),
) -> Result<RunSummary> {
    let http = Client::new();

    let candidates = roster::fetch_candidates(
        &http,
        &config.csv_url,
        &config.reference_date_str(),
        &config.site_location,
    )
    .await?;

    let mut session = CacheSession::open(&config.cache_path, &config.passphrase);

    let token = {
        let provider = Provider::from_authority(config.authority.as_str())?;
        let client = OAuthClient::new(&config.client_id, provider).with_http_client(http.clone());
        let mut app = PublicClientApp::new(client, session.cache_mut());
        auth::acquire_token(
            &mut app,
            &config.scopes,
            config.preferred_account.as_deref(),
            prompt,
        )
        .await?
    };

    let mailer = GraphMailer::new(http, config.endpoint.clone(), token);
    let outcomes = dispatch::deliver_all(&mailer, &candidates, &config.report_recipient).await;

    session.close();

    let summary = RunSummary::from_outcomes(&outcomes);
    info!("{summary}");
    Ok(summary)
}
