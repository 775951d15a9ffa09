use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::{
    config::{ReportConfig, Settings},
    error::Result,
    helpers::{
        billing::compute_billable,
        clockify::{utils::report_window, ClockifyClient},
        deadline::Deadline,
        email::{compose_report_email, Mailer, OutgoingReport, SmtpMailer},
    },
};

/// How a successful run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    NothingToBill,
    Sent { amount: String },
}

/// Runs the weekly billing report: window, login, workspace, PDF, totals,
/// and an email only when something is owed.
pub struct ReportService<M> {
    pub clockify: ClockifyClient,
    pub mailer: M,
    pub config: ReportConfig,
}

impl<M: Mailer> ReportService<M> {
    pub fn new(clockify: ClockifyClient, mailer: M, config: ReportConfig) -> Self {
        info!("Creating new ReportService instance");
        Self {
            clockify,
            mailer,
            config,
        }
    }

    pub fn from_config(config: ReportConfig, mailer: M) -> Result<Self> {
        let clockify = ClockifyClient::new(config.endpoints.clone())?;
        Ok(Self::new(clockify, mailer, config))
    }

    /// One billable run. Any failure aborts at the step that hit it; no step
    /// is retried.
    pub async fn process_report(&self, now: DateTime<Utc>) -> Result<RunOutcome> {
        let window = report_window(now)?;
        let deadline = Deadline::after(self.config.timeout);

        let token = self
            .clockify
            .login(&deadline, &self.config.credentials)
            .await?;
        let workspace_id = self.clockify.first_workspace(&deadline, &token).await?;

        let pdf = self
            .clockify
            .fetch_pdf(&deadline, &token, &workspace_id, &window)
            .await?;
        info!("Fetched report PDF, size: {} bytes", pdf.len());

        let summary = self
            .clockify
            .fetch_summary(&deadline, &token, &workspace_id, &window)
            .await?;
        let billable = compute_billable(&summary)?;

        if !billable.send_bill {
            info!("Nothing to bill for the week of {}", window.start_date());
            return Ok(RunOutcome::NothingToBill);
        }

        let composed = compose_report_email(&billable.amount, window.start_date());
        let outgoing = OutgoingReport {
            from: self.config.from_email.clone(),
            to: self.config.recipients.clone(),
            subject: composed.subject,
            body: composed.body,
            pdf,
        };

        match self.mailer.send_report(&outgoing).await {
            Ok(()) => {
                info!(
                    "Weekly report for {} sent to {:?}",
                    billable.amount, outgoing.to
                );
                Ok(RunOutcome::Sent {
                    amount: billable.amount,
                })
            }
            Err(e) => {
                warn!("Error sending report email: {}", e);
                Err(e)
            }
        }
    }
}

/// Validate `settings`, then run once with the supplied mailer. Validation
/// happens before any client is built, so bad configuration never reaches
/// the network.
pub async fn run_with_mailer<M: Mailer>(
    settings: Settings,
    mailer: M,
    now: DateTime<Utc>,
) -> Result<RunOutcome> {
    let config = settings.validate()?;
    ReportService::from_config(config, mailer)?
        .process_report(now)
        .await
}

/// Validate `settings` and run once, delivering over SMTP.
pub async fn run(settings: Settings, now: DateTime<Utc>) -> Result<RunOutcome> {
    let config = settings.validate()?;
    let mailer = SmtpMailer::new(&config.smtp)?;
    ReportService::from_config(config, mailer)?
        .process_report(now)
        .await
}
