use tracing::{debug, info};

use crate::db::{from_rows, quoted_list, Repository};
use crate::reports::repo_types::{Report, ReportStatus};

impl Report {
    pub async fn create(
        repo: &dyn Repository,
        reporter_id: i64,
        property_id: i64,
        reason: &str,
        details: Option<String>,
    ) -> Option<i64> {
        repo.insert(
            "INSERT INTO reports (reporter_id, property_id, reason, details, status) \
             VALUES ($1, $2, $3, $4, 'pending')",
            &[
                reporter_id.into(),
                property_id.into(),
                reason.into(),
                details.into(),
            ],
        )
        .await
    }

    /// Pending and reviewed reports, oldest first.
    pub async fn list_open(repo: &dyn Repository) -> Vec<Report> {
        from_rows(
            repo.fetch_all(
                "SELECT r.*, p.title AS property_title, u.full_name AS reporter_name \
                 FROM reports r \
                 JOIN properties p ON p.id = r.property_id \
                 JOIN users u ON u.id = r.reporter_id \
                 WHERE r.status IN ('pending', 'reviewed') ORDER BY r.created_at",
                &[],
            )
            .await,
        )
        .into_iter()
        .filter(|r: &Report| r.status.is_open())
        .collect()
    }

    pub async fn set_status(repo: &dyn Repository, id: i64, next: ReportStatus) -> bool {
        let from = next.reachable_from();
        if from.is_empty() {
            debug!(id, next = next.as_str(), "report transition refused");
            return false;
        }
        let sql = format!(
            "UPDATE reports SET status = $1 WHERE id = $2 AND status IN ({})",
            quoted_list(from)
        );
        let changed = repo.update(&sql, &[next.as_str().into(), id.into()]).await > 0;
        info!(id, next = next.as_str(), changed, "report status change");
        changed
    }
}
