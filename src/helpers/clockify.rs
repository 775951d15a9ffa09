use reqwest::{
    header::{self, HeaderValue},
    Client, RequestBuilder,
};
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::{
    error::{ReportError, Result},
    helpers::deadline::Deadline,
    models::clockify::{
        AuthToken, Credentials, ExportType, TokenResponse, Workspace,
    },
};

use self::utils::ReportWindow;

pub const DEFAULT_API_URL: &str = "https://global.api.clockify.me";
pub const DEFAULT_REPORTS_URL: &str = "https://reports.api.clockify.me";

const AUTH_HEADER: &str = "X-Auth-Token";
const MAX_ERROR_BODY: usize = 512;

/// Base URLs for the two Clockify hosts the job talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub api_url: String,
    pub reports_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            reports_url: DEFAULT_REPORTS_URL.to_string(),
        }
    }
}

impl Endpoints {
    pub fn token(&self) -> String {
        format!("{}/auth/token", self.api_url.trim_end_matches('/'))
    }

    pub fn workspaces(&self) -> String {
        format!("{}/workspaces/", self.api_url.trim_end_matches('/'))
    }

    pub fn summary_report(&self, workspace_id: &str) -> String {
        format!(
            "{}/workspaces/{workspace_id}/reports/summary",
            self.reports_url.trim_end_matches('/')
        )
    }
}

pub fn clockify_client_init() -> Result<Client> {
    info!("Initializing Clockify client");

    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );

    match Client::builder().default_headers(headers).build() {
        Ok(client) => {
            info!("Clockify client initialized successfully");
            Ok(client)
        }
        Err(e) => {
            warn!("Failed to build Clockify client: {}", e);
            Err(ReportError::Http {
                endpoint: "client init".to_string(),
                source: e,
            })
        }
    }
}

#[derive(Clone)]
pub struct ClockifyClient {
    http: Client,
    endpoints: Endpoints,
}

impl ClockifyClient {
    pub fn new(endpoints: Endpoints) -> Result<Self> {
        Ok(Self::with_client(clockify_client_init()?, endpoints))
    }

    pub fn with_client(http: Client, endpoints: Endpoints) -> Self {
        Self { http, endpoints }
    }

    /// Exchange account credentials for a run-scoped token.
    ///
    /// Every failure, including the deadline, is reported as
    /// [`ReportError::Auth`].
    pub async fn login(&self, deadline: &Deadline, credentials: &Credentials) -> Result<AuthToken> {
        let url = self.endpoints.token();
        info!("Requesting auth token for {}", credentials.email);

        let payload = serde_json::to_vec(credentials)
            .map_err(|e| ReportError::Auth(format!("could not encode credentials: {e}")))?;
        let request = self.http.post(&url).body(payload);

        let body = deadline.run(self.send(&url, request)).await.map_err(|e| {
            warn!("Login request failed: {}", e);
            ReportError::Auth(e.to_string())
        })?;

        let parsed: TokenResponse = serde_json::from_slice(&body).map_err(|e| {
            warn!("Failed to parse token response: {}", e);
            ReportError::Auth(format!("could not decode token response: {e}"))
        })?;

        match parsed.token {
            Some(token) if !token.is_empty() => {
                info!("Auth token received");
                Ok(AuthToken::new(token))
            }
            _ => {
                warn!("Token response did not contain a token");
                Err(ReportError::Auth("response did not contain a token".to_string()))
            }
        }
    }

    pub async fn first_workspace(&self, deadline: &Deadline, token: &AuthToken) -> Result<String> {
        let url = self.endpoints.workspaces();
        info!("Fetching workspaces from {}", url);

        let request = self.http.get(&url).header(AUTH_HEADER, token_header(token)?);
        let body = deadline.run(self.send(&url, request)).await?;

        let workspaces: Vec<Workspace> = decode(&url, &body)?;
        info!("Found {} workspace(s)", workspaces.len());

        let workspace_id = select_workspace(&workspaces)?;
        info!("Using workspace {}", workspace_id);
        Ok(workspace_id)
    }

    /// POST the summary filter for `window`. With an export type the body
    /// carries `exportType` and the response is the rendered document;
    /// without one it is the JSON summary. Either way the bytes are returned
    /// untouched.
    pub async fn fetch_report(
        &self,
        deadline: &Deadline,
        token: &AuthToken,
        workspace_id: &str,
        window: &ReportWindow,
        export: Option<ExportType>,
    ) -> Result<Vec<u8>> {
        let url = self.endpoints.summary_report(workspace_id);
        let body = utils::build_report_request(window, export);
        info!(
            "Fetching summary report {} to {} (export: {:?})",
            body.date_range_start, body.date_range_end, export
        );

        let payload = serde_json::to_vec(&body).map_err(|source| ReportError::Encode {
            endpoint: url.clone(),
            source,
        })?;
        let request = self
            .http
            .post(&url)
            .header(AUTH_HEADER, token_header(token)?)
            .body(payload);

        let bytes = deadline.run(self.send(&url, request)).await?;
        info!("Summary report response size: {} bytes", bytes.len());
        Ok(bytes)
    }

    pub async fn fetch_pdf(
        &self,
        deadline: &Deadline,
        token: &AuthToken,
        workspace_id: &str,
        window: &ReportWindow,
    ) -> Result<Vec<u8>> {
        self.fetch_report(deadline, token, workspace_id, window, Some(ExportType::Pdf))
            .await
    }

    pub async fn fetch_summary(
        &self,
        deadline: &Deadline,
        token: &AuthToken,
        workspace_id: &str,
        window: &ReportWindow,
    ) -> Result<Vec<u8>> {
        self.fetch_report(deadline, token, workspace_id, window, None)
            .await
    }

    async fn send(&self, endpoint: &str, request: RequestBuilder) -> Result<Vec<u8>> {
        let response = match request.send().await {
            Ok(resp) => {
                if !resp.status().is_success() {
                    let status = resp.status();
                    let error_text = resp
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    warn!(
                        "Clockify API returned error status {} from {}: {}",
                        status, endpoint, error_text
                    );
                    return Err(ReportError::Status {
                        endpoint: endpoint.to_string(),
                        status,
                        body: truncate(&error_text),
                    });
                }
                resp
            }
            Err(e) => {
                warn!("Failed to send request to {}: {}", endpoint, e);
                return Err(ReportError::Http {
                    endpoint: endpoint.to_string(),
                    source: e,
                });
            }
        };

        match response.bytes().await {
            Ok(bytes) => Ok(bytes.to_vec()),
            Err(e) => {
                warn!("Failed to read response body from {}: {}", endpoint, e);
                Err(ReportError::Http {
                    endpoint: endpoint.to_string(),
                    source: e,
                })
            }
        }
    }
}

/// The first membership of the first workspace. Later workspaces are never
/// consulted, even when the first has no memberships.
pub fn select_workspace(workspaces: &[Workspace]) -> Result<String> {
    workspaces
        .first()
        .and_then(|workspace| workspace.memberships.first())
        .map(|membership| membership.target_id.clone())
        .ok_or(ReportError::NoWorkspaces)
}

fn token_header(token: &AuthToken) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(token.as_str())
        .map_err(|e| ReportError::Auth(format!("token is not a valid header value: {e}")))?;
    value.set_sensitive(true);
    Ok(value)
}

fn decode<T: DeserializeOwned>(endpoint: &str, body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|source| {
        warn!("Failed to parse response from {}: {}", endpoint, source);
        ReportError::Decode {
            endpoint: endpoint.to_string(),
            source,
        }
    })
}

fn truncate(s: &str) -> String {
    if s.chars().count() > MAX_ERROR_BODY {
        let head: String = s.chars().take(MAX_ERROR_BODY).collect();
        format!("{head}...")
    } else {
        s.to_string()
    }
}

pub mod utils {
    use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
    use chrono_tz::Tz;
    use tracing::info;

    use crate::{
        error::{ReportError, Result},
        models::clockify::{ExportType, SummaryFilter, SummaryReportRequest},
    };

    pub const REPORT_TIMEZONE: &str = "America/New_York";
    pub const WINDOW_DAYS: u64 = 7;

    const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

    /// The trailing week being billed. Both bounds are local midnight in the
    /// reference timezone, `end` being today.
    ///
    /// "7 days" means calendar days: `start` is midnight seven dates before
    /// `end`, so a week containing a DST change spans 167 or 169 hours.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ReportWindow {
        pub start: DateTime<Tz>,
        pub end: DateTime<Tz>,
    }

    impl ReportWindow {
        pub fn start_date(&self) -> NaiveDate {
            self.start.date_naive()
        }

        pub fn wire_start(&self) -> String {
            self.start.format(WIRE_FORMAT).to_string()
        }

        pub fn wire_end(&self) -> String {
            self.end.format(WIRE_FORMAT).to_string()
        }
    }

    pub fn report_window(now: DateTime<Utc>) -> Result<ReportWindow> {
        report_window_in(now, REPORT_TIMEZONE)
    }

    pub fn report_window_in(now: DateTime<Utc>, timezone: &str) -> Result<ReportWindow> {
        let tz: Tz = timezone
            .parse()
            .map_err(|_| ReportError::Timezone(timezone.to_string()))?;

        let today = now.with_timezone(&tz).date_naive();
        let start_day = today
            .checked_sub_days(Days::new(WINDOW_DAYS))
            .ok_or_else(|| ReportError::Timezone(format!("{timezone}: date out of range")))?;

        let window = ReportWindow {
            start: local_midnight(tz, start_day)?,
            end: local_midnight(tz, today)?,
        };
        info!(
            "Report window calculated: {} to {} ({})",
            window.start, window.end, timezone
        );
        Ok(window)
    }

    fn local_midnight(tz: Tz, day: NaiveDate) -> Result<DateTime<Tz>> {
        day.and_hms_opt(0, 0, 0)
            .and_then(|midnight| tz.from_local_datetime(&midnight).earliest())
            .ok_or_else(|| ReportError::Timezone(format!("no local midnight on {day}")))
    }

    pub fn build_report_request(
        window: &ReportWindow,
        export: Option<ExportType>,
    ) -> SummaryReportRequest {
        SummaryReportRequest {
            date_range_start: window.wire_start(),
            date_range_end: window.wire_end(),
            sort_order: "ASCENDING",
            description: "",
            rounding: false,
            without_description: false,
            amount_shown: "EARNED",
            zoom_level: "WEEK",
            user_locale: "en_US",
            custom_fields: None,
            summary_filter: SummaryFilter {
                sort_column: "GROUP",
                groups: ["PROJECT", "TIMEENTRY"],
            },
            export_type: export,
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspaces(raw: &str) -> Vec<Workspace> {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn selects_first_membership_of_first_workspace() {
        let list = workspaces(
            r#"[{"memberships":[{"targetId":"W1"},{"targetId":"W9"}]},{"memberships":[{"targetId":"W2"}]}]"#,
        );
        assert_eq!(select_workspace(&list).unwrap(), "W1");
    }

    #[test]
    fn empty_first_workspace_does_not_fall_through() {
        let list = workspaces(r#"[{"memberships":[]},{"memberships":[{"targetId":"W2"}]}]"#);
        assert!(matches!(select_workspace(&list), Err(ReportError::NoWorkspaces)));
    }

    #[test]
    fn no_workspaces_is_an_error() {
        assert!(matches!(select_workspace(&[]), Err(ReportError::NoWorkspaces)));
        let list = workspaces(r#"[{}]"#);
        assert!(matches!(select_workspace(&list), Err(ReportError::NoWorkspaces)));
    }

    #[test]
    fn endpoints_tolerate_trailing_slash() {
        let endpoints = Endpoints {
            api_url: "http://localhost:1/".to_string(),
            reports_url: "http://localhost:2".to_string(),
        };
        assert_eq!(endpoints.token(), "http://localhost:1/auth/token");
        assert_eq!(endpoints.workspaces(), "http://localhost:1/workspaces/");
        assert_eq!(
            endpoints.summary_report("W1"),
            "http://localhost:2/workspaces/W1/reports/summary"
        );
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let body = "x".repeat(MAX_ERROR_BODY + 10);
        let short = truncate(&body);
        assert_eq!(short.len(), MAX_ERROR_BODY + 3);
        assert!(short.ends_with("..."));
    }
}
