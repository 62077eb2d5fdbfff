use serde_json::Value;

use crate::db::{from_rows, Repository};
use crate::inquiries::repo_types::Message;

impl Message {
    pub async fn send(
        repo: &dyn Repository,
        sender_id: i64,
        receiver_id: i64,
        property_id: Option<i64>,
        body: &str,
    ) -> Option<i64> {
        repo.insert(
            "INSERT INTO messages (sender_id, receiver_id, property_id, body, is_read) \
             VALUES ($1, $2, $3, $4, FALSE)",
            &[
                sender_id.into(),
                receiver_id.into(),
                property_id.into(),
                body.into(),
            ],
        )
        .await
    }

    /// Messages received by the user, newest first, with the sender's name.
    pub async fn inbox(repo: &dyn Repository, user_id: i64) -> Vec<Message> {
        from_rows(
            repo.fetch_all(
                "SELECT m.*, u.full_name AS sender_name FROM messages m \
                 JOIN users u ON u.id = m.sender_id \
                 WHERE m.receiver_id = $1 ORDER BY m.created_at DESC",
                &[user_id.into()],
            )
            .await,
        )
    }

    pub async fn unread_count(repo: &dyn Repository, user_id: i64) -> i64 {
        repo.fetch_one(
            "SELECT COUNT(*) AS unread FROM messages WHERE receiver_id = $1 AND NOT is_read",
            &[user_id.into()],
        )
        .await
        .and_then(|row| row.get("unread").and_then(Value::as_i64))
        .unwrap_or(0)
    }

    pub async fn mark_all_read(repo: &dyn Repository, user_id: i64) -> u64 {
        repo.update(
            "UPDATE messages SET is_read = TRUE WHERE receiver_id = $1 AND NOT is_read",
            &[user_id.into()],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::db::fixture::FixtureRepository;
    use crate::db::{DataMode, Param, Row};

    struct Counted(i64);

    #[async_trait]
    impl Repository for Counted {
        fn mode(&self) -> DataMode {
            DataMode::Live
        }
        async fn fetch_all(&self, _q: &str, _p: &[Param]) -> Vec<Row> {
            Vec::new()
        }
        async fn fetch_one(&self, _q: &str, _p: &[Param]) -> Option<Row> {
            json!({ "unread": self.0 }).as_object().cloned()
        }
        async fn insert(&self, _q: &str, _p: &[Param]) -> Option<i64> {
            None
        }
        async fn update(&self, _q: &str, _p: &[Param]) -> u64 {
            0
        }
        async fn record_exists(&self, _q: &str, _p: &[Param]) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn unread_count_reads_the_aggregate_column() {
        assert_eq!(Message::unread_count(&Counted(4), 3).await, 4);
        assert_eq!(Message::unread_count(&FixtureRepository::new(), 3).await, 0);
    }

    #[tokio::test]
    async fn demo_inbox_is_empty_and_sends_are_acknowledged() {
        let repo = FixtureRepository::new();
        assert!(Message::inbox(&repo, 3).await.is_empty());
        assert!(Message::send(&repo, 3, 2, Some(1), "hello").await.is_some());
        assert_eq!(Message::mark_all_read(&repo, 3).await, 1);
    }
}
