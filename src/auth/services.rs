use std::sync::Arc;

use axum::{
    extract::FromRef,
    response::{IntoResponse, Redirect, Response},
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, error, info, warn};

use crate::{
    auth::{
        dto::{AuthResponse, PublicUser, RegisterForm},
        error::AuthError,
        password::{hash_password, meets_policy, password_matches, MIN_PASSWORD_LEN},
        repo_types::{NewUser, Role, User, UserStatus},
    },
    db::{fixture, DataMode, Repository},
    session::{Session, SessionData},
    state::AppState,
};

pub(crate) const LOGIN_OK: &str = "Login successful.";
pub(crate) const REGISTER_OK: &str = "Registration successful. You can now log in.";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Where a failed role check sends the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denied {
    Login,
    Dashboard(Role),
}

impl Denied {
    pub fn location(self) -> &'static str {
        match self {
            Denied::Login => "/login",
            Denied::Dashboard(role) => role.dashboard_path(),
        }
    }
}

impl IntoResponse for Denied {
    fn into_response(self) -> Response {
        Redirect::to(self.location()).into_response()
    }
}

/// Login, logout, registration and the role gate over an explicit `Session`.
/// Fixture accounts exist only behind the demo repository, so in live mode
/// every identity comes from the `users` table.
#[derive(Clone)]
pub struct AuthService {
    repo: Arc<dyn Repository>,
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.repo.clone())
    }
}

impl AuthService {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    pub async fn login(&self, session: &mut Session, email: &str, password: &str) -> AuthResponse {
        match self.try_login(session, email, password).await {
            Ok(user) => {
                info!(user_id = user.id, role = %user.role, "user logged in");
                AuthResponse::ok(LOGIN_OK, Some(user))
            }
            Err(e) => {
                warn!(reason = ?e, "login rejected");
                AuthResponse::failed(e.to_string())
            }
        }
    }

    async fn try_login(
        &self,
        session: &mut Session,
        email: &str,
        password: &str,
    ) -> Result<PublicUser, AuthError> {
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            return Err(AuthError::InvalidCredentials);
        }

        let user = User::find_by_email(self.repo.as_ref(), &email)
            .await
            .ok_or(AuthError::InvalidCredentials)?;
        if !password_matches(password, &user.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }
        if !user.is_active() {
            return Err(AuthError::InactiveAccount);
        }

        let identity = SessionData {
            user_id: user.id,
            user_name: user.full_name.clone(),
            user_email: user.email.clone(),
            user_role: user.role,
        };
        session
            .establish(identity)
            .await
            .map_err(|e| AuthError::SessionStore(e.into()))?;

        if self.repo.mode() == DataMode::Live
            && !User::touch_last_login(self.repo.as_ref(), user.id).await
        {
            warn!(user_id = user.id, "last_login not updated");
        }

        Ok(PublicUser::from(&user))
    }

    /// Idempotent.
    pub async fn logout(&self, session: &mut Session) {
        match session.clear().await {
            Ok(true) => info!("user logged out"),
            Ok(false) => debug!("logout without a signed-in user"),
            Err(e) => warn!(error = %e, "session flush failed"),
        }
    }

    pub async fn register(&self, form: RegisterForm) -> AuthResponse {
        match self.try_register(form).await {
            Ok(id) => {
                info!(user_id = id, "user registered");
                AuthResponse::ok(REGISTER_OK, None)
            }
            Err(e) => {
                warn!(reason = ?e, "registration rejected");
                AuthResponse::failed(e.to_string())
            }
        }
    }

    async fn try_register(&self, form: RegisterForm) -> Result<i64, AuthError> {
        let full_name = form.full_name.trim().to_string();
        if full_name.is_empty() {
            return Err(AuthError::validation("Please enter your full name."));
        }
        let email = normalize_email(&form.email);
        if !is_valid_email(&email) {
            return Err(AuthError::validation("Please enter a valid email address."));
        }
        if !meets_policy(&form.password) {
            return Err(AuthError::validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters long."
            )));
        }
        let role = match form.role.parse::<Role>() {
            Ok(role @ (Role::Buyer | Role::Seller)) => role,
            _ => {
                return Err(AuthError::validation(
                    "Please choose a buyer or seller account.",
                ))
            }
        };

        let fixture_taken = self.repo.mode() == DataMode::Demo
            && fixture::demo_user_by_email(&email).is_some();
        if fixture_taken || User::email_exists(self.repo.as_ref(), &email).await {
            return Err(AuthError::DuplicateEmail);
        }

        let password_hash = hash_password(&form.password).map_err(|e| {
            error!(error = %e, "password hashing failed");
            AuthError::Storage
        })?;
        let phone = form
            .phone
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        let new = NewUser {
            full_name,
            email,
            phone,
            password_hash,
            role,
        };
        User::create(self.repo.as_ref(), &new)
            .await
            .ok_or(AuthError::Storage)
    }

    pub async fn set_user_status(&self, user_id: i64, status: UserStatus) -> bool {
        let changed = User::set_status(self.repo.as_ref(), user_id, status).await;
        info!(user_id, status = status.as_str(), changed, "user status change");
        changed
    }

    pub fn is_logged_in(&self, session: &Session) -> bool {
        session.is_authenticated()
    }

    pub fn current_user(&self, session: &Session) -> Option<PublicUser> {
        session.identity().map(PublicUser::from)
    }

    /// The role gate. An empty `allowed` admits any authenticated session.
    pub fn check_permission(
        &self,
        session: &Session,
        allowed: &[Role],
    ) -> Result<SessionData, Denied> {
        let identity = session.identity().ok_or(Denied::Login)?;
        if allowed.is_empty() || allowed.contains(&identity.user_role) {
            Ok(identity.clone())
        } else {
            debug!(role = %identity.user_role, ?allowed, "role not permitted");
            Err(Denied::Dashboard(identity.user_role))
        }
    }
}
