//! Mail dispatch through the Graph API.
//!
//! Every message is one POST with no retry. A failed welcome email is still
//! followed by a report, which records the failure.

use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use tracing::{debug, info, warn};
use url::Url;

use crate::compose::{self, MessagePayload, escape_html};
use crate::roster::CandidateRecord;

/// HTTP outcome of one send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResult {
    /// HTTP status code.
    pub status_code: u16,
    /// Status line and response body as received.
    pub raw_response: String,
}

impl DispatchResult {
    /// Returns true for 2xx statuses (Graph answers `202 Accepted`).
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status_code >= 200 && self.status_code < 300
    }
}

/// A send that produced no HTTP response.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The request could not be sent or the response could not be read.
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Something that can deliver a message payload.
#[allow(async_fn_in_trait)]
pub trait MailTransport {
    /// Sends `payload` once.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] if no HTTP response was received. Error
    /// statuses are not errors; they come back in the [`DispatchResult`].
    async fn send(&self, payload: &MessagePayload) -> Result<DispatchResult, DispatchError>;
}

/// Sends mail as the signed-in user through Graph.
#[derive(Debug, Clone)]
pub struct GraphMailer {
    http: Client,
    endpoint: Url,
    token: String,
}

impl GraphMailer {
    /// Creates a mailer for `endpoint` authenticated with a bearer `token`.
    #[must_use]
    pub fn new(http: Client, endpoint: Url, token: impl Into<String>) -> Self {
        Self {
            http,
            endpoint,
            token: token.into(),
        }
    }
}

impl MailTransport for GraphMailer {
    async fn send(&self, payload: &MessagePayload) -> Result<DispatchResult, DispatchError> {
        send(&self.http, &self.endpoint, &self.token, payload).await
    }
}

/// POSTs `payload` as JSON to `endpoint` with `Authorization: Bearer <token>`.
///
/// # Errors
///
/// Returns [`DispatchError::Transport`] if no response was received.
pub async fn send(
    http: &Client,
    endpoint: &Url,
    token: &str,
    payload: &MessagePayload,
) -> Result<DispatchResult, DispatchError> {
    debug!(
        "POST '{}' to {}",
        payload.message.subject,
        payload.recipients().collect::<Vec<_>>().join(", ")
    );
    let response = http
        .post(endpoint.clone())
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .json(payload)
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;
    let mut raw_response = format!("<Response [{status}]>");
    if !body.is_empty() {
        raw_response.push(' ');
        raw_response.push_str(&body);
    }

    Ok(DispatchResult {
        status_code: status.as_u16(),
        raw_response,
    })
}

/// What happened to one candidate's welcome email and its report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    /// Candidate's full name.
    pub full_name: String,
    /// Candidate's address.
    pub contact_address: String,
    /// Welcome email result, or the transport failure.
    pub welcome: Result<DispatchResult, String>,
    /// Report email result, or the transport failure.
    pub report: Result<DispatchResult, String>,
}

impl DeliveryOutcome {
    /// Returns true if Graph accepted the welcome email.
    #[must_use]
    pub fn welcomed(&self) -> bool {
        self.welcome.as_ref().is_ok_and(DispatchResult::is_success)
    }

    /// Returns true if Graph accepted the report.
    #[must_use]
    pub fn reported(&self) -> bool {
        self.report.as_ref().is_ok_and(DispatchResult::is_success)
    }
}

/// HTML report describing the welcome email sent to `candidate`.
#[must_use]
pub fn report_body(
    result: &Result<DispatchResult, DispatchError>,
    candidate: &CandidateRecord,
) -> String {
    let (status, response) = match result {
        Ok(r) => (r.status_code.to_string(), r.raw_response.clone()),
        Err(e) => ("unavailable".to_string(), e.to_string()),
    };

    format!(
        "Status Code: {}<br>\nResponse: {}<br>\nName: {}<br>\nEmail: {}",
        escape_html(&status),
        escape_html(&response),
        escape_html(&candidate.display_name()),
        escape_html(&candidate.contact_address),
    )
}

/// Sends each candidate a welcome email followed by a report to `report_recipient`.
///
/// Candidates are handled one at a time in the given order.
pub async fn deliver_all<T: MailTransport>(
    transport: &T,
    candidates: &[CandidateRecord],
    report_recipient: &str,
) -> Vec<DeliveryOutcome> {
    let mut outcomes = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        info!(
            "Welcoming {} <{}>",
            candidate.display_name(),
            candidate.contact_address
        );

        let welcome = transport.send(&compose::compose_welcome(candidate)).await;
        match &welcome {
            Ok(r) if r.is_success() => info!("Welcome accepted ({})", r.status_code),
            Ok(r) => warn!("Welcome rejected: {}", r.raw_response),
            Err(e) => warn!("Welcome not sent: {e}"),
        }

        let body = report_body(&welcome, candidate);
        let report = transport
            .send(&compose::compose_report(&body, report_recipient))
            .await;
        match &report {
            Ok(r) if r.is_success() => {}
            Ok(r) => warn!(
                "Report for {} rejected: {}",
                candidate.contact_address, r.raw_response
            ),
            Err(e) => warn!("Report for {} not sent: {e}", candidate.contact_address),
        }

        outcomes.push(DeliveryOutcome {
            full_name: candidate.full_name.clone(),
            contact_address: candidate.contact_address.clone(),
            welcome: welcome.map_err(|e| e.to_string()),
            report: report.map_err(|e| e.to_string()),
        });
    }

    outcomes
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::compose::{REPORT_SUBJECT, WELCOME_SUBJECT};
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Records every payload and answers with scripted outcomes; `None` is a
    /// send that never reached the server.
    #[derive(Default)]
    struct ScriptedTransport {
        replies: RefCell<VecDeque<Option<u16>>>,
        sent: RefCell<Vec<MessagePayload>>,
    }

    impl ScriptedTransport {
        fn new(replies: impl IntoIterator<Item = Option<u16>>) -> Self {
            Self {
                replies: RefCell::new(replies.into_iter().collect()),
                sent: RefCell::default(),
            }
        }
    }

    impl MailTransport for ScriptedTransport {
        async fn send(&self, payload: &MessagePayload) -> Result<DispatchResult, DispatchError> {
            self.sent.borrow_mut().push(payload.clone());
            match self.replies.borrow_mut().pop_front().unwrap_or(Some(202)) {
                Some(code) => Ok(DispatchResult {
                    status_code: code,
                    raw_response: format!("<Response [{code}]>"),
                }),
                None => Err(unreachable_host()),
            }
        }
    }

    fn unreachable_host() -> DispatchError {
        Client::new()
            .post("not a url")
            .build()
            .unwrap_err()
            .into()
    }

    fn candidate(name: &str, address: &str) -> CandidateRecord {
        CandidateRecord {
            full_name: name.into(),
            start_date: "2022-09-27".into(),
            location: "Redwood City".into(),
            contact_address: address.into(),
        }
    }

    #[tokio::test]
    async fn test_failed_welcome_still_reports() {
        let transport = ScriptedTransport::new([Some(500), Some(202)]);
        let outcomes =
            deliver_all(&transport, &[candidate("Jane Doe", "jane@x.com")], "dl@x.com").await;

        let sent = transport.sent.borrow();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].message.subject, WELCOME_SUBJECT);
        assert_eq!(sent[1].message.subject, REPORT_SUBJECT);
        assert_eq!(sent[1].recipients().collect::<Vec<_>>(), ["dl@x.com"]);

        let report = &sent[1].message.body.content;
        assert!(report.contains("Status Code: 500"));
        assert!(report.contains("Jane Doe"));
        assert!(report.contains("jane@x.com"));

        assert!(!outcomes[0].welcomed());
        assert!(outcomes[0].reported());
    }

    #[tokio::test]
    async fn test_transport_failure_is_reported() {
        let transport = ScriptedTransport::new([None, Some(202)]);
        let outcomes =
            deliver_all(&transport, &[candidate("Sam Lee", "sam@x.com")], "dl@x.com").await;

        let report = transport.sent.borrow()[1].message.body.content.clone();
        assert!(report.contains("Status Code: unavailable"));
        assert!(report.contains("Request failed"));
        assert!(outcomes[0].welcome.is_err());
    }

    #[tokio::test]
    async fn test_report_failure_does_not_stop_loop() {
        let transport = ScriptedTransport::new([Some(202), None, Some(202), Some(202)]);
        let candidates = [candidate("A One", "a@x.com"), candidate("B Two", "b@x.com")];
        let outcomes = deliver_all(&transport, &candidates, "dl@x.com").await;

        assert_eq!(transport.sent.borrow().len(), 4);
        assert!(!outcomes[0].reported());
        assert!(outcomes[1].welcomed() && outcomes[1].reported());
    }

    #[tokio::test]
    async fn test_no_candidates_no_calls() {
        let transport = ScriptedTransport::default();
        let outcomes = deliver_all(&transport, &[], "dl@x.com").await;
        assert!(outcomes.is_empty());
        assert!(transport.sent.borrow().is_empty());
    }

    #[test]
    fn test_report_body_escapes_response() {
        let result = Ok(DispatchResult {
            status_code: 202,
            raw_response: "<Response [202 Accepted]>".into(),
        });
        let body = report_body(&result, &candidate("Mary Ann Smith", "m@x.com"));
        assert!(body.contains("&lt;Response [202 Accepted]&gt;"));
        assert!(body.contains("Name: Mary Smith"));
    }

    #[test]
    fn test_success_range() {
        let result = |code| DispatchResult {
            status_code: code,
            raw_response: String::new(),
        };
        assert!(result(202).is_success());
        assert!(!result(199).is_success());
        assert!(!result(401).is_success());
    }
}
