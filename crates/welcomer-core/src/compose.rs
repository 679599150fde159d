//! Graph `sendMail` payloads.

use serde::Serialize;

use crate::roster::CandidateRecord;

/// Subject of the welcome email.
pub const WELCOME_SUBJECT: &str = "Welcome to EA!!!";
/// Subject of the delivery report.
pub const REPORT_SUBJECT: &str = "Welcome New Hire Report";
/// Content type of both emails.
pub const HTML_CONTENT_TYPE: &str = "HTML";

/// Request body for `POST /me/sendMail`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessagePayload {
    /// The message to send.
    pub message: Message,
}

/// A Graph message resource, reduced to the fields we set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Subject line.
    pub subject: String,
    /// Message body.
    pub body: ItemBody,
    /// `To` recipients.
    pub to_recipients: Vec<Recipient>,
}

/// Message body with its content type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemBody {
    /// `HTML` or `Text`.
    pub content_type: String,
    /// The body itself.
    pub content: String,
}

/// A single recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    /// Recipient address.
    pub email_address: EmailAddress,
}

/// An email address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailAddress {
    /// SMTP address.
    pub address: String,
}

impl MessagePayload {
    /// Builds a payload with one recipient.
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        content_type: impl Into<String>,
        content: impl Into<String>,
        recipient: impl Into<String>,
    ) -> Self {
        Self {
            message: Message {
                subject: subject.into(),
                body: ItemBody {
                    content_type: content_type.into(),
                    content: content.into(),
                },
                to_recipients: vec![Recipient {
                    email_address: EmailAddress {
                        address: recipient.into(),
                    },
                }],
            },
        }
    }

    /// Addresses this payload is sent to.
    pub fn recipients(&self) -> impl Iterator<Item = &str> {
        self.message
            .to_recipients
            .iter()
            .map(|r| r.email_address.address.as_str())
    }
}

/// Welcome email for a new hire.
#[must_use]
pub fn compose_welcome(candidate: &CandidateRecord) -> MessagePayload {
    welcome_message(candidate.first_name(), &candidate.contact_address)
}

/// Welcome email addressed to `recipient`, greeting `first_name`.
#[must_use]
pub fn welcome_message(first_name: &str, recipient: &str) -> MessagePayload {
    MessagePayload::new(
        WELCOME_SUBJECT,
        HTML_CONTENT_TYPE,
        welcome_html(first_name),
        recipient,
    )
}

/// Delivery report sent to `recipient`; `report_body` is used verbatim.
#[must_use]
pub fn compose_report(report_body: &str, recipient: &str) -> MessagePayload {
    MessagePayload::new(REPORT_SUBJECT, HTML_CONTENT_TYPE, report_body, recipient)
}

fn welcome_html(first_name: &str) -> String {
    let name = escape_html(first_name);
    format!(
        "<html><body>\
         <p>Hi {name},</p>\
         <p>Welcome to EA! We are excited to have you on the team.</p>\
         <p>On your first day, please stop by the Site IT desk so we can get your \
         laptop, badge and accounts ready. If you need anything before then, just \
         reply to this email.</p>\
         <p>Best regards,<br>Site IT</p>\
         </body></html>"
    )
}

/// Escapes the characters that are significant in HTML text and attributes.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn jane() -> CandidateRecord {
        CandidateRecord {
            full_name: "Jane Doe".into(),
            start_date: "2022-09-27".into(),
            location: "Redwood City".into(),
            contact_address: "jane@x.com".into(),
        }
    }

    #[test]
    fn test_welcome_for_jane() {
        let payload = compose_welcome(&jane());
        assert_eq!(payload.message.subject, "Welcome to EA!!!");
        assert_eq!(payload.message.body.content_type, "HTML");
        assert!(payload.message.body.content.contains("Jane"));
        assert!(!payload.message.body.content.contains("Doe"));
        assert_eq!(payload.recipients().collect::<Vec<_>>(), ["jane@x.com"]);
    }

    #[test]
    fn test_welcome_is_deterministic() {
        let first = serde_json::to_vec(&compose_welcome(&jane())).unwrap();
        let second = serde_json::to_vec(&compose_welcome(&jane())).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_graph_wire_shape() {
        let value = serde_json::to_value(compose_report("Status Code: 202", "dl@x.com")).unwrap();
        assert_eq!(
            value,
            json!({
                "message": {
                    "subject": "Welcome New Hire Report",
                    "body": { "contentType": "HTML", "content": "Status Code: 202" },
                    "toRecipients": [ { "emailAddress": { "address": "dl@x.com" } } ]
                }
            })
        );
    }

    #[test]
    fn test_welcome_escapes_name() {
        let payload = welcome_message("<b>Bob</b>", "bob@x.com");
        assert!(payload.message.body.content.contains("&lt;b&gt;Bob&lt;/b&gt;"));
    }

    #[test]
    fn test_welcome_message_without_record() {
        let payload = welcome_message("Ana", "ana@x.com");
        assert!(payload.message.body.content.contains("Hi Ana,"));
    }
}
