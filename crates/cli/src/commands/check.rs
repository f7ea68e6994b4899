//! Read-only audit of client/contact references.

use tracing::{info, warn};
use washline_store::{EntityStore, audit_references};

/// Report every one-sided reference.
///
/// # Errors
///
/// Returns an error if the store cannot be read or any issue is found, so the
/// process exits non-zero.
pub async fn run(store: &EntityStore) -> Result<(), Box<dyn std::error::Error>> {
    let report = audit_references(store).await?;

    info!(
        "Checked {} clients and {} contacts",
        report.clients_checked, report.contacts_checked
    );
    if report.is_consistent() {
        info!("All references are consistent");
        return Ok(());
    }

    for issue in &report.issues {
        warn!("  - {issue}");
    }
    Err(format!("{} reference issues found", report.issues.len()).into())
}
