//! # welcomer-core
//!
//! Daily new-hire welcome job.
//!
//! This crate provides:
//! - **Ingestion** of the new-hire CSV feed ([`roster`])
//! - **Token cache vault**, passphrase encryption of the cache at rest ([`vault`], [`session`])
//! - **Token acquisition**, silent or via device code ([`auth`])
//! - **Message composition** for Graph `sendMail` ([`compose`])
//! - **Dispatch** of welcome emails and delivery reports ([`dispatch`])
//! - The end-to-end **run** ([`pipeline`])

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod auth;
pub mod compose;
pub mod config;
pub mod dispatch;
mod error;
pub mod pipeline;
pub mod roster;
pub mod session;
pub mod vault;

pub use auth::{AcquisitionState, Authenticator, acquire_token, select_account};
pub use compose::{MessagePayload, compose_report, compose_welcome, welcome_message};
pub use config::{Credentials, Passphrase, RunConfiguration};
pub use dispatch::{
    DeliveryOutcome, DispatchError, DispatchResult, GraphMailer, MailTransport, deliver_all,
    report_body,
};
pub use error::{Error, Result};
pub use pipeline::{RunSummary, run};
pub use roster::{CandidateRecord, fetch_candidates, parse_candidates};
pub use session::CacheSession;
pub use vault::VaultError;
pub use welcomer_oauth::DeviceAuthorization;
