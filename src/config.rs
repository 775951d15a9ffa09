use std::{fmt, time::Duration};

use tracing::{info, warn};

use crate::{
    error::{ReportError, Result},
    helpers::clockify::{Endpoints, DEFAULT_API_URL, DEFAULT_REPORTS_URL},
    models::clockify::Credentials,
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Raw values as read from the environment. Nothing is checked until
/// [`Settings::validate`].
#[derive(Clone, Default)]
pub struct Settings {
    pub clockify_email: String,
    pub clockify_password: String,
    pub from_email: String,
    pub smtp_addr: String,
    pub smtp_password: String,
    pub to_emails: String,
    pub api_url: Option<String>,
    pub reports_url: Option<String>,
    pub timeout: Option<String>,
}

#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Validated configuration for one run.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub credentials: Credentials,
    pub from_email: String,
    pub recipients: Vec<String>,
    pub smtp: SmtpConfig,
    pub endpoints: Endpoints,
    pub timeout: Duration,
}

impl Settings {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).unwrap_or_default();
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            clockify_email: required("CLOCKIFY_EMAIL"),
            clockify_password: required("CLOCKIFY_PASSWORD"),
            from_email: required("FROM_EMAIL"),
            smtp_addr: required("SMTP_ADDR"),
            smtp_password: required("SMTP_PASSWORD"),
            to_emails: required("TO_EMAILS"),
            api_url: optional("CLOCKIFY_API_URL"),
            reports_url: optional("CLOCKIFY_REPORTS_URL"),
            timeout: optional("REPORT_TIMEOUT"),
        }
    }

    pub fn validate(self) -> Result<ReportConfig> {
        let missing: Vec<&'static str> = [
            ("CLOCKIFY_EMAIL", &self.clockify_email),
            ("CLOCKIFY_PASSWORD", &self.clockify_password),
            ("FROM_EMAIL", &self.from_email),
            ("SMTP_ADDR", &self.smtp_addr),
            ("SMTP_PASSWORD", &self.smtp_password),
            ("TO_EMAILS", &self.to_emails),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(key, _)| key)
        .collect();

        if !missing.is_empty() {
            warn!("Required environment variables empty: {}", missing.join(", "));
            return Err(ReportError::MissingConfig(missing));
        }

        let recipients = parse_recipients(&self.to_emails)?;
        let (host, port) = parse_smtp_addr(&self.smtp_addr)?;
        let timeout = match &self.timeout {
            Some(raw) => humantime::parse_duration(raw).map_err(|e| ReportError::InvalidConfig {
                key: "REPORT_TIMEOUT",
                message: e.to_string(),
            })?,
            None => DEFAULT_TIMEOUT,
        };

        let endpoints = Endpoints {
            api_url: self.api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            reports_url: self
                .reports_url
                .unwrap_or_else(|| DEFAULT_REPORTS_URL.to_string()),
        };

        info!(
            "Configuration loaded: {} recipient(s), smtp={}:{}, timeout={:?}",
            recipients.len(),
            host,
            port,
            timeout
        );

        Ok(ReportConfig {
            credentials: Credentials {
                email: self.clockify_email,
                password: self.clockify_password,
            },
            smtp: SmtpConfig {
                host,
                port,
                username: self.from_email.clone(),
                password: self.smtp_password,
            },
            from_email: self.from_email,
            recipients,
            endpoints,
            timeout,
        })
    }
}

/// Split a comma separated list, trimming each entry and dropping blanks.
pub fn parse_recipients(raw: &str) -> Result<Vec<String>> {
    let recipients: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if recipients.is_empty() {
        warn!("No destination emails were set");
        return Err(ReportError::NoRecipients);
    }
    Ok(recipients)
}

fn parse_smtp_addr(raw: &str) -> Result<(String, u16)> {
    let raw = raw.trim();
    match raw.rsplit_once(':') {
        Some((host, port)) => {
            let port = port.parse().map_err(|_| ReportError::InvalidConfig {
                key: "SMTP_ADDR",
                message: format!("bad port in {raw}"),
            })?;
            Ok((host.to_string(), port))
        }
        None => Ok((raw.to_string(), DEFAULT_SMTP_PORT)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Settings {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    fn complete() -> Vec<(&'static str, &'static str)> {
        vec![
            ("CLOCKIFY_EMAIL", "me@example.com"),
            ("CLOCKIFY_PASSWORD", "hunter2"),
            ("FROM_EMAIL", "billing@example.com"),
            ("SMTP_ADDR", "smtp.example.com"),
            ("SMTP_PASSWORD", "smtp-secret"),
            ("TO_EMAILS", "a@x.com, b@y.com ,c@z.com"),
        ]
    }

    #[test]
    fn recipients_are_trimmed_in_order() {
        assert_eq!(
            parse_recipients("a@x.com, b@y.com ,c@z.com").unwrap(),
            vec!["a@x.com", "b@y.com", "c@z.com"]
        );
    }

    #[test]
    fn blank_recipient_list_is_fatal() {
        assert!(matches!(parse_recipients(" , ,"), Err(ReportError::NoRecipients)));
    }

    #[test]
    fn complete_settings_validate_with_defaults() {
        let config = settings(&complete()).validate().unwrap();

        assert_eq!(config.credentials.email, "me@example.com");
        assert_eq!(config.recipients, vec!["a@x.com", "b@y.com", "c@z.com"]);
        assert_eq!(config.smtp.host, "smtp.example.com");
        assert_eq!(config.smtp.port, DEFAULT_SMTP_PORT);
        assert_eq!(config.smtp.username, "billing@example.com");
        assert_eq!(config.endpoints, Endpoints::default());
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn every_missing_value_is_reported() {
        for (key, _) in complete() {
            let pairs: Vec<_> = complete().into_iter().filter(|(k, _)| *k != key).collect();
            match settings(&pairs).validate() {
                Err(ReportError::MissingConfig(missing)) => assert_eq!(missing, vec![key]),
                other => panic!("expected missing {key}, got {other:?}"),
            }
        }

        match settings(&[]).validate() {
            Err(ReportError::MissingConfig(missing)) => assert_eq!(missing.len(), 6),
            other => panic!("expected all missing, got {other:?}"),
        }
    }

    #[test]
    fn whitespace_only_counts_as_missing() {
        let mut pairs = complete();
        pairs.retain(|(k, _)| *k != "SMTP_PASSWORD");
        pairs.push(("SMTP_PASSWORD", "   "));
        assert!(matches!(
            settings(&pairs).validate(),
            Err(ReportError::MissingConfig(m)) if m == vec!["SMTP_PASSWORD"]
        ));
    }

    #[test]
    fn optional_overrides_are_applied() {
        let mut pairs = complete();
        pairs.retain(|(k, _)| *k != "SMTP_ADDR");
        pairs.extend([
            ("SMTP_ADDR", "mail.example.com:2525"),
            ("CLOCKIFY_API_URL", "http://127.0.0.1:9000"),
            ("CLOCKIFY_REPORTS_URL", "http://127.0.0.1:9001"),
            ("REPORT_TIMEOUT", "3s"),
        ]);
        let config = settings(&pairs).validate().unwrap();

        assert_eq!((config.smtp.host.as_str(), config.smtp.port), ("mail.example.com", 2525));
        assert_eq!(config.endpoints.api_url, "http://127.0.0.1:9000");
        assert_eq!(config.endpoints.reports_url, "http://127.0.0.1:9001");
        assert_eq!(config.timeout, Duration::from_secs(3));
    }

    #[test]
    fn bad_timeout_is_rejected() {
        let mut pairs = complete();
        pairs.push(("REPORT_TIMEOUT", "soon"));
        assert!(matches!(
            settings(&pairs).validate(),
            Err(ReportError::InvalidConfig { key: "REPORT_TIMEOUT", .. })
        ));
    }
}
