use tracing::{debug, warn};

use crate::db::{from_row, from_rows, quoted_list, Repository};
use crate::inquiries::repo_types::{Inquiry, InquiryStatus};

impl Inquiry {
    pub async fn create(
        repo: &dyn Repository,
        property_id: i64,
        buyer_id: i64,
        message: &str,
    ) -> Option<i64> {
        repo.insert(
            "INSERT INTO inquiries (property_id, buyer_id, message, status) VALUES ($1, $2, $3, 'new')",
            &[property_id.into(), buyer_id.into(), message.into()],
        )
        .await
    }

    pub async fn find(repo: &dyn Repository, id: i64) -> Option<Inquiry> {
        repo.fetch_one(
            "SELECT i.*, p.title AS property_title FROM inquiries i \
             JOIN properties p ON p.id = i.property_id WHERE i.id = $1",
            &[id.into()],
        )
        .await
        .and_then(from_row)
    }

    pub async fn list_for_buyer(repo: &dyn Repository, buyer_id: i64) -> Vec<Inquiry> {
        from_rows(
            repo.fetch_all(
                "SELECT i.*, p.title AS property_title FROM inquiries i \
                 JOIN properties p ON p.id = i.property_id \
                 WHERE i.buyer_id = $1 ORDER BY i.created_at DESC",
                &[buyer_id.into()],
            )
            .await,
        )
    }

    /// Inquiries on any of the seller's listings.
    pub async fn list_for_seller(repo: &dyn Repository, seller_id: i64) -> Vec<Inquiry> {
        from_rows(
            repo.fetch_all(
                "SELECT i.*, p.title AS property_title, u.full_name AS buyer_name \
                 FROM inquiries i \
                 JOIN properties p ON p.id = i.property_id \
                 JOIN users u ON u.id = i.buyer_id \
                 WHERE p.seller_id = $1 ORDER BY i.created_at DESC",
                &[seller_id.into()],
            )
            .await,
        )
    }

    /// Move an inquiry on the seller's own listing to `next`. Transitions the
    /// workflow does not allow are refused here or by the WHERE clause.
    pub async fn set_status(
        repo: &dyn Repository,
        id: i64,
        seller_id: i64,
        next: InquiryStatus,
    ) -> bool {
        let from = next.reachable_from();
        if from.is_empty() {
            debug!(id, next = next.as_str(), "inquiry transition refused");
            return false;
        }
        let sql = format!(
            "UPDATE inquiries SET status = $1 WHERE id = $2 AND status IN ({}) \
             AND property_id IN (SELECT id FROM properties WHERE seller_id = $3)",
            quoted_list(from)
        );
        let changed = repo
            .update(&sql, &[next.as_str().into(), id.into(), seller_id.into()])
            .await
            > 0;
        if !changed {
            warn!(id, seller_id, next = next.as_str(), "inquiry status unchanged");
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::db::fixture::FixtureRepository;
    use crate::db::{DataMode, Param, Row};

    #[derive(Default)]
    struct Recorder {
        updates: Mutex<Vec<(String, Vec<Param>)>>,
    }

    #[async_trait]
    impl Repository for Recorder {
        fn mode(&self) -> DataMode {
            DataMode::Live
        }
        async fn fetch_all(&self, _q: &str, _p: &[Param]) -> Vec<Row> {
            Vec::new()
        }
        async fn fetch_one(&self, _q: &str, _p: &[Param]) -> Option<Row> {
            None
        }
        async fn insert(&self, _q: &str, _p: &[Param]) -> Option<i64> {
            None
        }
        async fn update(&self, q: &str, p: &[Param]) -> u64 {
            self.updates.lock().unwrap().push((q.to_string(), p.to_vec()));
            1
        }
        async fn record_exists(&self, _q: &str, _p: &[Param]) -> bool {
            false
        }
    }

    #[test]
    fn transition_table() {
        assert!(InquiryStatus::New.reachable_from().is_empty());
        assert_eq!(InquiryStatus::Responded.reachable_from(), &["new"]);
        assert_eq!(InquiryStatus::Closed.reachable_from(), &["new", "responded"]);
        assert_eq!("Closed".parse::<InquiryStatus>(), Ok(InquiryStatus::Closed));
        assert!("reopened".parse::<InquiryStatus>().is_err());
    }

    #[tokio::test]
    async fn moving_back_to_new_never_reaches_the_store() {
        let repo = Recorder::default();
        assert!(!Inquiry::set_status(&repo, 1, 2, InquiryStatus::New).await);
        assert!(repo.updates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn allowed_sources_and_ownership_go_in_the_where_clause() {
        let repo = Recorder::default();
        assert!(Inquiry::set_status(&repo, 7, 2, InquiryStatus::Closed).await);

        let updates = repo.updates.lock().unwrap();
        let (sql, params) = &updates[0];
        assert!(sql.contains("status IN ('new', 'responded')"));
        assert!(sql.contains("seller_id = $3"));
        assert_eq!(params, &vec![Param::from("closed"), Param::Int(7), Param::Int(2)]);
    }

    #[tokio::test]
    async fn demo_mode_has_no_inquiries() {
        let repo = FixtureRepository::new();
        assert!(Inquiry::list_for_buyer(&repo, 3).await.is_empty());
        assert!(Inquiry::list_for_seller(&repo, 2).await.is_empty());
        assert!(Inquiry::find(&repo, 1).await.is_none());
        let id = Inquiry::create(&repo, 1, 3, "Is the basement finished?").await;
        assert!(id.is_some());
    }
}
