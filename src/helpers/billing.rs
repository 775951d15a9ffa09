use tracing::{info, warn};

use crate::{
    error::{ReportError, Result},
    models::clockify::SummaryResponse,
};

/// Outcome of inspecting a summary response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Billable {
    /// Dollar string such as `$123.45`; empty when nothing is owed.
    pub amount: String,
    pub send_bill: bool,
}

impl Billable {
    fn nothing() -> Self {
        Self {
            amount: String::new(),
            send_bill: false,
        }
    }
}

/// Decide whether a bill is owed from the raw summary JSON.
///
/// Only the first `totals` entry is consulted. Its `totalAmount` is in minor
/// units, so it is divided by 100.
pub fn compute_billable(response: &[u8]) -> Result<Billable> {
    let summary: SummaryResponse = serde_json::from_slice(response).map_err(|source| {
        warn!("Failed to parse summary totals: {}", source);
        ReportError::Decode {
            endpoint: "summary totals".to_string(),
            source,
        }
    })?;

    let Some(first) = summary.totals.first() else {
        info!("Summary contained no totals");
        return Ok(Billable::nothing());
    };

    if first.total_amount == 0.0 {
        info!("Summary total is zero");
        return Ok(Billable::nothing());
    }

    let amount = format_dollars(first.total_amount);
    info!("Billable total for the week: {}", amount);
    Ok(Billable {
        amount,
        send_bill: true,
    })
}

fn format_dollars(minor_units: f64) -> String {
    format!("${:.2}", minor_units / 100.0)
}
