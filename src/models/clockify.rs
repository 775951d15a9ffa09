use serde::{Deserialize, Serialize};
use std::fmt;

/// Login body for the token endpoint.
#[derive(Serialize, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Deserialize, Debug)]
pub struct TokenResponse {
    pub token: Option<String>,
}

/// Bearer token for one run. Sent as `X-Auth-Token` on every call after login.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

#[derive(Deserialize, Debug)]
pub struct Workspace {
    #[serde(default)]
    pub memberships: Vec<Membership>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub target_id: String,
}

/// Value of the `exportType` field. Its presence switches the summary
/// endpoint from JSON aggregates to a rendered document.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExportType {
    Pdf,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SummaryReportRequest {
    pub date_range_start: String,
    pub date_range_end: String,
    pub sort_order: &'static str,
    pub description: &'static str,
    pub rounding: bool,
    pub without_description: bool,
    pub amount_shown: &'static str,
    pub zoom_level: &'static str,
    pub user_locale: &'static str,
    pub custom_fields: Option<serde_json::Value>,
    pub summary_filter: SummaryFilter,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_type: Option<ExportType>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SummaryFilter {
    pub sort_column: &'static str,
    pub groups: [&'static str; 2],
}

#[derive(Deserialize, Debug)]
pub struct SummaryResponse {
    #[serde(default)]
    pub totals: Vec<SummaryTotal>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SummaryTotal {
    pub total_amount: f64,
}
