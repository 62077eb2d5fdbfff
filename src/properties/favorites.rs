use tracing::{debug, warn};

use crate::db::{from_rows, Param, Repository};
use crate::properties::repo_types::Property;

const CANDIDATE_TABLES: [&str; 2] = ["favorites", "buyer_favorites"];

/// The favorites table this schema uses, if any.
pub async fn resolve_table(repo: &dyn Repository) -> Option<&'static str> {
    for table in CANDIDATE_TABLES {
        if repo.table_exists(table).await {
            return Some(table);
        }
    }
    debug!("no favorites table in schema");
    None
}

pub async fn list_for_buyer(repo: &dyn Repository, buyer_id: i64) -> Vec<Property> {
    let Some(table) = resolve_table(repo).await else {
        return Vec::new();
    };
    let sql = format!(
        "SELECT p.* FROM {table} f JOIN properties p ON p.id = f.property_id \
         WHERE f.buyer_id = $1 ORDER BY f.created_at DESC"
    );
    from_rows(repo.fetch_all(&sql, &[buyer_id.into()]).await)
}

pub async fn is_favorite(repo: &dyn Repository, buyer_id: i64, property_id: i64) -> bool {
    let Some(table) = resolve_table(repo).await else {
        return false;
    };
    let sql = format!("SELECT 1 FROM {table} WHERE buyer_id = $1 AND property_id = $2");
    repo.record_exists(&sql, &[buyer_id.into(), property_id.into()])
        .await
}

/// Flip the favorite flag. Returns the new state, or `None` when nothing
/// could be written.
pub async fn toggle(repo: &dyn Repository, buyer_id: i64, property_id: i64) -> Option<bool> {
    let Some(table) = resolve_table(repo).await else {
        warn!(buyer_id, property_id, "favorite not saved: no favorites table");
        return None;
    };
    let params: [Param; 2] = [buyer_id.into(), property_id.into()];

    let exists_sql = format!("SELECT 1 FROM {table} WHERE buyer_id = $1 AND property_id = $2");
    if repo.record_exists(&exists_sql, &params).await {
        let sql = format!("DELETE FROM {table} WHERE buyer_id = $1 AND property_id = $2");
        (repo.delete(&sql, &params).await > 0).then_some(false)
    } else {
        let sql = format!("INSERT INTO {table} (buyer_id, property_id) VALUES ($1, $2)");
        repo.insert(&sql, &params).await.map(|_| true)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::db::fixture::FixtureRepository;
    use crate::db::{DataMode, Row};

    /// Schema with only the legacy table, recording every statement.
    #[derive(Default)]
    struct LegacySchema {
        favorited: bool,
        statements: Mutex<Vec<String>>,
    }

    impl LegacySchema {
        fn log(&self, q: &str) {
            self.statements.lock().unwrap().push(q.to_string());
        }
    }

    #[async_trait]
    impl Repository for LegacySchema {
        fn mode(&self) -> DataMode {
            DataMode::Live
        }
        async fn fetch_all(&self, q: &str, _p: &[Param]) -> Vec<Row> {
            self.log(q);
            Vec::new()
        }
        async fn fetch_one(&self, q: &str, _p: &[Param]) -> Option<Row> {
            self.log(q);
            None
        }
        async fn insert(&self, q: &str, _p: &[Param]) -> Option<i64> {
            self.log(q);
            Some(1)
        }
        async fn update(&self, q: &str, _p: &[Param]) -> u64 {
            self.log(q);
            1
        }
        async fn record_exists(&self, q: &str, p: &[Param]) -> bool {
            if q.contains("information_schema") {
                return p.first() == Some(&Param::from("buyer_favorites"));
            }
            self.log(q);
            self.favorited
        }
    }

    #[tokio::test]
    async fn falls_back_to_the_legacy_table() {
        let repo = LegacySchema::default();
        assert_eq!(resolve_table(&repo).await, Some("buyer_favorites"));

        assert_eq!(toggle(&repo, 3, 1).await, Some(true));
        let statements = repo.statements.lock().unwrap().clone();
        assert!(statements.last().unwrap().starts_with("INSERT INTO buyer_favorites"));
    }

    #[tokio::test]
    async fn toggling_an_existing_favorite_removes_it() {
        let repo = LegacySchema {
            favorited: true,
            ..Default::default()
        };
        assert!(is_favorite(&repo, 3, 1).await);
        assert_eq!(toggle(&repo, 3, 1).await, Some(false));
        let statements = repo.statements.lock().unwrap().clone();
        assert!(statements.last().unwrap().starts_with("DELETE FROM buyer_favorites"));
    }

    #[tokio::test]
    async fn demo_mode_has_no_favorites() {
        let repo = FixtureRepository::new();
        assert_eq!(resolve_table(&repo).await, None);
        assert!(list_for_buyer(&repo, 3).await.is_empty());
        assert!(!is_favorite(&repo, 3, 1).await);
        assert_eq!(toggle(&repo, 3, 1).await, None);
    }
}
