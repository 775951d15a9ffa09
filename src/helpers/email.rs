use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use lettre::{
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials as SmtpCredentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{info, warn};

use crate::{
    config::SmtpConfig,
    error::{ReportError, Result},
};

pub const ATTACHMENT_NAME: &str = "report.pdf";
pub const ATTACHMENT_TYPE: &str = "application/pdf";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedEmail {
    pub body: String,
    pub subject: String,
}

/// Everything the mail capability needs to deliver one report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingReport {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
    pub pdf: Vec<u8>,
}

/// Delivery of a composed report.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_report(&self, email: &OutgoingReport) -> Result<()>;
}

pub fn compose_report_email(amount: &str, window_start: NaiveDate) -> ComposedEmail {
    let start = format!(
        "{}-{}-{}",
        window_start.year(),
        window_start.month(),
        window_start.day()
    );

    let body = format!(
        "Attached you will find the weekly report for {start}.\n\n\
         The total for the week is: {amount}. Please validate this with the attached report.\n\n\n\
         beep boop.\n\
         This is an automated email set for every Monday at 0400 EST.\n\n\
         This email is not monitored."
    );
    let subject = format!("{start} Weekly Report (AUTOMATED)");

    info!("Composed email with subject: {}", subject);
    ComposedEmail { body, subject }
}

pub fn build_message(email: &OutgoingReport) -> Result<Message> {
    let from: Mailbox = email
        .from
        .parse()
        .map_err(|e| ReportError::Email(format!("invalid sender {}: {e}", email.from)))?;

    let mut builder = Message::builder().from(from).subject(email.subject.as_str());
    for recipient in &email.to {
        let mailbox: Mailbox = recipient
            .parse()
            .map_err(|e| ReportError::Email(format!("invalid recipient {recipient}: {e}")))?;
        builder = builder.to(mailbox);
    }

    let pdf_type = ContentType::parse(ATTACHMENT_TYPE)
        .map_err(|e| ReportError::Email(format!("invalid attachment type: {e}")))?;
    let attachment = Attachment::new(ATTACHMENT_NAME.to_string()).body(email.pdf.clone(), pdf_type);

    builder
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(email.body.clone()))
                .singlepart(attachment),
        )
        .map_err(|e| ReportError::Email(e.to_string()))
}

/// Authenticated STARTTLS submission.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        info!("Initializing SMTP transport for {}:{}", config.host, config.port);

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| {
                warn!("Failed to configure SMTP relay {}: {}", config.host, e);
                ReportError::Email(format!("invalid SMTP relay {}: {e}", config.host))
            })?
            .port(config.port)
            .credentials(SmtpCredentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self { transport })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_report(&self, email: &OutgoingReport) -> Result<()> {
        info!("Preparing email with subject: {}", email.subject);
        info!("Report attachment size: {} bytes", email.pdf.len());

        let message = build_message(email)?;

        match self.transport.send(message).await {
            Ok(response) => {
                info!(
                    "Report email sent to {} recipient(s), server replied {}",
                    email.to.len(),
                    response.code()
                );
                Ok(())
            }
            Err(e) => {
                warn!("Failed to send report email: {}", e);
                Err(ReportError::Delivery(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outgoing() -> OutgoingReport {
        OutgoingReport {
            from: "billing@example.com".to_string(),
            to: vec!["a@x.com".to_string(), "b@y.com".to_string()],
            subject: "2026-10-12 Weekly Report (AUTOMATED)".to_string(),
            body: "total".to_string(),
            pdf: b"%PDF-1.4 fake".to_vec(),
        }
    }

    #[test]
    fn composes_unpadded_date_and_amount() {
        let start = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let email = compose_report_email("$50.00", start);

        assert_eq!(email.subject, "2026-3-2 Weekly Report (AUTOMATED)");
        assert!(email.body.starts_with("Attached you will find the weekly report for 2026-3-2.\n\n"));
        assert!(email.body.contains("The total for the week is: $50.00. Please validate"));
        assert!(email.body.ends_with("This email is not monitored."));
    }

    #[test]
    fn message_carries_pdf_attachment() {
        let message = build_message(&outgoing()).unwrap();
        let raw = String::from_utf8_lossy(&message.formatted()).to_string();

        assert!(raw.contains("Subject: 2026-10-12 Weekly Report (AUTOMATED)"));
        assert!(raw.contains("a@x.com"));
        assert!(raw.contains("b@y.com"));
        assert!(raw.contains("application/pdf"));
        assert!(raw.contains("report.pdf"));
    }

    #[test]
    fn invalid_recipient_is_an_email_error() {
        let mut email = outgoing();
        email.to.push("not an address".to_string());
        assert!(matches!(build_message(&email), Err(ReportError::Email(_))));
    }
}
