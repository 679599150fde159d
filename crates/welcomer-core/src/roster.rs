//! New-hire feed ingestion.
//!
//! The feed is a CSV document whose header names the columns `Name`,
//! `Start_Date`, `Location` and `Email` (any order, extra columns ignored).
//! A row becomes a [`CandidateRecord`] when its start date and location match
//! exactly and its email is not empty.

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::error::{Error, Result};

/// One new hire selected from the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRecord {
    /// Given and family name separated by whitespace.
    pub full_name: String,
    /// Start date as written in the feed (`YYYY-MM-DD`).
    pub start_date: String,
    /// Site the hire reports to.
    pub location: String,
    /// Address the welcome email goes to; never empty.
    pub contact_address: String,
}

impl CandidateRecord {
    /// First whitespace-delimited token of the full name.
    #[must_use]
    pub fn first_name(&self) -> &str {
        self.full_name.split_whitespace().next().unwrap_or_default()
    }

    /// Last whitespace-delimited token of the full name.
    #[must_use]
    pub fn last_name(&self) -> &str {
        self.full_name
            .split_whitespace()
            .next_back()
            .unwrap_or_default()
    }

    /// First and last name, dropping any middle names.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name(), self.last_name())
    }
}

/// Header names every feed must carry.
const REQUIRED_COLUMNS: [&str; 4] = ["Name", "Start_Date", "Location", "Email"];

#[derive(Debug, Deserialize)]
struct FeedRow {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Start_Date")]
    start_date: String,
    #[serde(rename = "Location")]
    location: String,
    #[serde(rename = "Email")]
    email: String,
}

impl FeedRow {
    fn matches(&self, reference_date: &str, target_location: &str) -> bool {
        self.start_date == reference_date
            && self.location == target_location
            && !self.email.is_empty()
    }
}

impl From<FeedRow> for CandidateRecord {
    fn from(row: FeedRow) -> Self {
        Self {
            full_name: row.name,
            start_date: row.start_date,
            location: row.location,
            contact_address: row.email,
        }
    }
}

/// Downloads the feed and returns the matching candidates in feed order.
///
/// # Errors
///
/// Returns [`Error::Transport`] if the feed cannot be fetched (including
/// non-success statuses) and [`Error::Parse`] if it is malformed.
pub async fn fetch_candidates(
    http: &Client,
    source_url: &Url,
    reference_date: &str,
    target_location: &str,
) -> Result<Vec<CandidateRecord>> {
    debug!("Fetching new-hire feed from {source_url}");
    let text = http
        .get(source_url.clone())
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    let candidates = parse_candidates(&text, reference_date, target_location)?;
    info!(
        "{} new hire(s) starting {reference_date} at {target_location}",
        candidates.len()
    );
    Ok(candidates)
}

/// Filters feed text down to the matching candidates, keeping feed order and duplicates.
///
/// # Errors
///
/// Returns [`Error::Parse`] if a required column is missing or a row has the
/// wrong number of fields.
pub fn parse_candidates(
    text: &str,
    reference_date: &str,
    target_location: &str,
) -> Result<Vec<CandidateRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .trim(csv::Trim::None)
        .from_reader(text.as_bytes());

    let headers = reader.headers().map_err(parse_error)?;
    if let Some(missing) = REQUIRED_COLUMNS
        .iter()
        .find(|column| !headers.iter().any(|h| h == **column))
    {
        return Err(Error::Parse {
            line: headers.position().map_or(1, csv::Position::line),
            reason: format!("missing column {missing}"),
        });
    }

    let mut candidates = Vec::new();
    for row in reader.deserialize::<FeedRow>() {
        let row = row.map_err(parse_error)?;
        if row.matches(reference_date, target_location) {
            candidates.push(CandidateRecord::from(row));
        }
    }
    Ok(candidates)
}

fn parse_error(err: csv::Error) -> Error {
    let line = err.position().map_or(0, csv::Position::line);
    let reason = match err.kind() {
        csv::ErrorKind::UnequalLengths {
            expected_len, len, ..
        } => format!("expected {expected_len} fields, found {len}"),
        _ => err.to_string(),
    };
    Error::Parse { line, reason }
}
