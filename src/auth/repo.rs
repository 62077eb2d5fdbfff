use crate::auth::repo_types::{NewUser, User, UserStatus};
use crate::db::{from_row, from_rows, Repository};

const USER_COLUMNS: &str =
    "id, full_name, email, phone, password_hash, role, status, created_at, last_login";

impl User {
    /// Find a user by (already normalized) email.
    pub async fn find_by_email(repo: &dyn Repository, email: &str) -> Option<User> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        repo.fetch_one(&sql, &[email.into()]).await.and_then(from_row)
    }

    pub async fn email_exists(repo: &dyn Repository, email: &str) -> bool {
        repo.record_exists("SELECT 1 FROM users WHERE email = $1", &[email.into()])
            .await
    }

    /// Insert a new active user, returning its id.
    pub async fn create(repo: &dyn Repository, new: &NewUser) -> Option<i64> {
        repo.insert(
            r#"
            INSERT INTO users (full_name, email, phone, password_hash, role, status)
            VALUES ($1, $2, $3, $4, $5, 'active')
            "#,
            &[
                new.full_name.as_str().into(),
                new.email.as_str().into(),
                new.phone.clone().into(),
                new.password_hash.as_str().into(),
                new.role.as_str().into(),
            ],
        )
        .await
    }

    pub async fn touch_last_login(repo: &dyn Repository, id: i64) -> bool {
        repo.update("UPDATE users SET last_login = NOW() WHERE id = $1", &[id.into()])
            .await
            > 0
    }

    pub async fn set_status(repo: &dyn Repository, id: i64, status: UserStatus) -> bool {
        repo.update(
            "UPDATE users SET status = $1 WHERE id = $2",
            &[status.as_str().into(), id.into()],
        )
        .await
            > 0
    }

    pub async fn list_all(repo: &dyn Repository) -> Vec<User> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC");
        from_rows(repo.fetch_all(&sql, &[]).await)
    }
}

