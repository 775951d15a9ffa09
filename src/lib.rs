//! Clockify Weekly Report Library
//!
//! Logs into Clockify, pulls last week's summary report as a PDF and as
//! billing totals, and emails the PDF when there is something to bill.

pub mod config;
pub mod error;
pub mod helpers;
pub mod models;
pub mod service;

pub use config::{ReportConfig, Settings};
pub use error::ReportError;
pub use service::{ReportService, RunOutcome};

// Re-export key types for convenience
pub use helpers::billing::Billable;
pub use helpers::clockify::{utils::ReportWindow, ClockifyClient, Endpoints};
pub use helpers::email::{Mailer, OutgoingReport, SmtpMailer};
