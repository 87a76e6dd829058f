//! Best-effort deletion of remote objects.

use crate::service::PromptService;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Outcome of a cleanup pass. Cleanup never fails as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    /// Every name a deletion was attempted for, in order.
    pub attempted: Vec<String>,
    /// Names deleted successfully.
    pub deleted: Vec<String>,
    /// `(name, error)` for each deletion that failed.
    pub failed: Vec<(String, String)>,
}

impl CleanupReport {
    /// Whether every attempted deletion succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Deletes each object in `names`, one after another.
///
/// Each deletion gets its own `timeout`. Failures are logged and recorded,
/// and the remaining deletions still run.
pub async fn cleanup_objects<S, I>(service: &S, names: I, timeout: Duration) -> CleanupReport
where
    S: PromptService + ?Sized,
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut report = CleanupReport::default();

    for name in names {
        let name = name.as_ref().to_string();
        report.attempted.push(name.clone());

        match tokio::time::timeout(timeout, service.delete_object(&name)).await {
            Ok(Ok(_)) => {
                debug!(object = %name, "deleted remote object");
                report.deleted.push(name);
            }
            Ok(Err(e)) => {
                warn!(object = %name, error = %e, "failed to delete remote object");
                report.failed.push((name, e.to_string()));
            }
            Err(_) => {
                let msg = format!("deletion timed out after {}s", timeout.as_secs_f64());
                warn!(object = %name, "{}", msg);
                report.failed.push((name, msg));
            }
        }
    }

    info!(
        attempted = report.attempted.len(),
        deleted = report.deleted.len(),
        failed = report.failed.len(),
        "cleanup finished"
    );
    report
}
