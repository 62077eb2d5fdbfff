use std::collections::HashMap;

use async_trait::async_trait;
use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use time::macros::datetime;
use tracing::{debug, warn};

use super::{DataMode, Param, Repository, Row};
use crate::auth::repo_types::{Role, User, UserStatus};
use crate::properties::repo_types::{ListingStatus, Property};

/// Argon2id hash of the fixture password `password`, shared by every demo account.
pub const FIXTURE_PASSWORD_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$ZXN0YXRlLWZpeHR1cmVzIQ$74Q6+dkeemTo3KKHKMv8Bh11tI5oayVTSO6stmHJBWg";

lazy_static! {
    static ref SUBJECT_RE: Regex =
        Regex::new(r#"(?i)\b(?:from|into|update)\s+"?([a-z_][a-z0-9_]*)"#).unwrap();
}

/// The table a statement is about: the first name after FROM / INTO / UPDATE.
pub fn query_subject(query: &str) -> Option<String> {
    SUBJECT_RE
        .captures(query)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_ascii_lowercase())
}

pub fn users() -> Vec<User> {
    let account = |id: i64, name: &str, email: &str, role: Role, status: UserStatus| User {
        id,
        full_name: name.to_string(),
        email: email.to_string(),
        phone: Some(format!("+1 555 01{id:02}")),
        password_hash: FIXTURE_PASSWORD_HASH.to_string(),
        role,
        status,
        created_at: datetime!(2024-01-05 09:00 UTC),
        last_login: None,
    };
    vec![
        account(1, "Alice Admin", "admin@example.com", Role::Admin, UserStatus::Active),
        account(2, "Sam Seller", "seller@example.com", Role::Seller, UserStatus::Active),
        account(3, "Bella Buyer", "buyer@example.com", Role::Buyer, UserStatus::Active),
        account(4, "Ivan Idle", "inactive@example.com", Role::Buyer, UserStatus::Inactive),
    ]
}

pub fn demo_user_by_email(email: &str) -> Option<User> {
    users()
        .into_iter()
        .find(|u| u.email.eq_ignore_ascii_case(email.trim()))
}

pub fn properties() -> Vec<Property> {
    #[allow(clippy::too_many_arguments)]
    fn listing(
        id: i64,
        title: &str,
        property_type: &str,
        status: ListingStatus,
        price: i64,
        address: (&str, &str, &str, &str),
        rooms: (i32, f64, i32),
        featured: bool,
        description: &str,
    ) -> Property {
        let (street, city, state, zip) = address;
        let (bedrooms, bathrooms, area_sqft) = rooms;
        Property {
            id,
            seller_id: 2,
            title: title.to_string(),
            description: description.to_string(),
            property_type: property_type.to_string(),
            status,
            price,
            address: street.to_string(),
            city: city.to_string(),
            state: state.to_string(),
            zip_code: zip.to_string(),
            bedrooms,
            bathrooms,
            area_sqft,
            image_url: None,
            featured,
            created_at: datetime!(2024-02-01 12:00 UTC) + time::Duration::days(id),
        }
    }

    vec![
        listing(
            1,
            "Sunny Family Home",
            "house",
            ListingStatus::Available,
            425_000,
            ("128 Maple Street", "Springfield", "IL", "62704"),
            (4, 2.5, 2200),
            true,
            "Bright two-story home with a fenced yard, updated kitchen and a finished basement.",
        ),
        listing(
            2,
            "Downtown Loft",
            "apartment",
            ListingStatus::Available,
            315_000,
            ("77 Market Ave, Unit 5B", "Chicago", "IL", "60607"),
            (2, 2.0, 1150),
            true,
            "Exposed brick, 14ft ceilings and a short walk to the river and the L.",
        ),
        listing(
            3,
            "Lakeside Cottage",
            "house",
            ListingStatus::Available,
            289_000,
            ("9 Shoreline Drive", "Madison", "WI", "53703"),
            (3, 1.5, 1400),
            false,
            "Cozy cottage steps from the water with a screened porch and private dock access.",
        ),
        listing(
            4,
            "Modern Condo with Skyline View",
            "condo",
            ListingStatus::Pending,
            499_000,
            ("1200 Lakeshore Blvd #1802", "Chicago", "IL", "60611"),
            (2, 2.0, 1300),
            false,
            "Eighteenth-floor corner unit with floor-to-ceiling windows, gym and doorman.",
        ),
        listing(
            5,
            "Suburban Ranch",
            "house",
            ListingStatus::Available,
            365_000,
            ("451 Oak Ridge Road", "Naperville", "IL", "60540"),
            (3, 2.0, 1850),
            false,
            "Single-level living on a quiet cul-de-sac, two-car garage and new roof.",
        ),
        listing(
            6,
            "Vacant Lot near Prairie Park",
            "land",
            ListingStatus::Available,
            95_000,
            ("Lot 14, Prairie View Lane", "Springfield", "IL", "62711"),
            (0, 0.0, 10_890),
            false,
            "Quarter-acre buildable lot with utilities at the street.",
        ),
    ]
}

fn to_rows<T: Serialize>(items: &[T]) -> Vec<Row> {
    items
        .iter()
        .filter_map(|item| match serde_json::to_value(item) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        })
        .collect()
}

/// In-memory demo backend. Reads serve a fixed dataset per known table;
/// writes are acknowledged but never stored.
pub struct FixtureRepository {
    datasets: HashMap<&'static str, Vec<Row>>,
}

impl FixtureRepository {
    pub fn new() -> Self {
        let mut datasets = HashMap::new();
        datasets.insert("properties", to_rows(&properties()));
        datasets.insert("users", to_rows(&users()));
        Self { datasets }
    }

    fn dataset(&self, query: &str) -> Option<&Vec<Row>> {
        let subject = query_subject(query)?;
        self.datasets.get(subject.as_str())
    }
}

impl Default for FixtureRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn matches_identifier(row: &Row, param: &Param) -> bool {
    match param {
        Param::Int(id) => row.get("id").and_then(Value::as_i64) == Some(*id),
        Param::Text(key) => row
            .get("email")
            .and_then(Value::as_str)
            .is_some_and(|email| email.eq_ignore_ascii_case(key.trim())),
        _ => false,
    }
}

#[async_trait]
impl Repository for FixtureRepository {
    fn mode(&self) -> DataMode {
        DataMode::Demo
    }

    async fn fetch_all(&self, query: &str, _params: &[Param]) -> Vec<Row> {
        let rows = self.dataset(query).cloned().unwrap_or_default();
        debug!(subject = ?query_subject(query), rows = rows.len(), "demo fetch_all");
        rows
    }

    async fn fetch_one(&self, query: &str, params: &[Param]) -> Option<Row> {
        let key = params.first()?;
        self.dataset(query)?
            .iter()
            .find(|row| matches_identifier(row, key))
            .cloned()
    }

    async fn insert(&self, query: &str, _params: &[Param]) -> Option<i64> {
        let id = rand::thread_rng().gen_range(1000..=9999);
        warn!(subject = ?query_subject(query), id, "demo mode: insert acknowledged but not stored");
        Some(id)
    }

    async fn update(&self, query: &str, _params: &[Param]) -> u64 {
        warn!(subject = ?query_subject(query), "demo mode: write acknowledged but not stored");
        1
    }

    async fn record_exists(&self, _query: &str, _params: &[Param]) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_is_first_table_after_keyword() {
        assert_eq!(
            query_subject("SELECT p.*, u.full_name FROM properties p JOIN users u ON u.id = p.seller_id")
                .as_deref(),
            Some("properties")
        );
        assert_eq!(
            query_subject("insert into Inquiries (message) values ($1)").as_deref(),
            Some("inquiries")
        );
        assert_eq!(
            query_subject("UPDATE \"users\" SET last_login = NOW()").as_deref(),
            Some("users")
        );
        assert_eq!(query_subject("SELECT 1"), None);
    }

    #[tokio::test]
    async fn property_queries_return_the_same_six_rows_every_time() {
        let repo = FixtureRepository::new();
        let first = repo
            .fetch_all("SELECT * FROM properties WHERE city = $1", &["Nowhere".into()])
            .await;
        let second = repo.fetch_all("SELECT * FROM properties", &[]).await;
        assert_eq!(first.len(), 6);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn unknown_subjects_are_empty() {
        let repo = FixtureRepository::new();
        assert!(repo.fetch_all("SELECT * FROM inquiries", &[]).await.is_empty());
        assert!(repo.fetch_all("SELECT 1", &[]).await.is_empty());
    }

    #[tokio::test]
    async fn fetch_one_matches_id_or_email() {
        let repo = FixtureRepository::new();
        let by_id = repo
            .fetch_one("SELECT * FROM properties WHERE id = $1", &[Param::Int(4)])
            .await
            .expect("property 4");
        assert_eq!(by_id["title"], "Modern Condo with Skyline View");

        let by_email = repo
            .fetch_one("SELECT * FROM users WHERE email = $1", &["BUYER@example.com".into()])
            .await
            .expect("buyer fixture");
        assert_eq!(by_email["role"], "buyer");

        assert!(repo
            .fetch_one("SELECT * FROM users WHERE id = $1", &[Param::Int(99)])
            .await
            .is_none());
        assert!(repo.fetch_one("SELECT * FROM users", &[]).await.is_none());
    }

    #[tokio::test]
    async fn writes_are_simulated() {
        let repo = FixtureRepository::new();
        let id = repo
            .insert("INSERT INTO users (email) VALUES ($1)", &["x@y.z".into()])
            .await
            .expect("placeholder id");
        assert!((1000..=9999).contains(&id));
        assert_eq!(repo.update("UPDATE users SET status = 'inactive'", &[]).await, 1);
        assert_eq!(repo.delete("DELETE FROM favorites WHERE id = $1", &[Param::Int(1)]).await, 1);
        assert!(!repo.record_exists("SELECT 1 FROM users WHERE email = $1", &["buyer@example.com".into()]).await);
        assert!(!repo.table_exists("favorites").await);
        assert_eq!(repo.mode(), DataMode::Demo);
    }
}
