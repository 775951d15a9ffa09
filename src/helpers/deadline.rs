use std::future::Future;
use std::time::Duration;

use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use crate::error::{ReportError, Result};

/// One time budget shared by every remote call in a run.
///
/// Created once per run; each call is raced against the same instant, so a
/// slow login leaves less time for the report fetches that follow.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
            budget,
        }
    }

    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        debug!("{:?} left of the run deadline", self.remaining());
        match timeout_at(self.at, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Run deadline of {:?} exceeded", self.budget);
                Err(ReportError::DeadlineExceeded(self.budget))
            }
        }
    }
}
