use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{LoginForm, RegisterForm},
        extractors::CurrentSession,
        services::AuthService,
    },
    state::AppState,
    views::{self, RegisterValues},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_form).post(login))
        .route("/register", get(register_form).post(register))
        .route("/logout", post(logout))
}

#[instrument(skip_all)]
pub async fn login_form(CurrentSession(session): CurrentSession) -> Response {
    match session.role() {
        Some(role) => Redirect::to(role.dashboard_path()).into_response(),
        None => views::login_page(&session, None, "").into_response(),
    }
}

#[instrument(skip_all)]
pub async fn login(
    State(auth): State<AuthService>,
    CurrentSession(mut session): CurrentSession,
    Form(form): Form<LoginForm>,
) -> Response {
    let res = auth.login(&mut session, &form.email, &form.password).await;
    match (res.success, session.role()) {
        (true, Some(role)) => Redirect::to(role.dashboard_path()).into_response(),
        _ => views::login_page(&session, Some((&res.message, false)), form.email.trim())
            .into_response(),
    }
}

#[instrument(skip_all)]
pub async fn register_form(CurrentSession(session): CurrentSession) -> Html<String> {
    views::register_page(&session, None, &RegisterValues::default())
}

#[instrument(skip_all)]
pub async fn register(
    State(auth): State<AuthService>,
    CurrentSession(session): CurrentSession,
    Form(form): Form<RegisterForm>,
) -> Html<String> {
    let full_name = form.full_name.clone();
    let email = form.email.clone();
    let phone = form.phone.clone().unwrap_or_default();
    let role = form.role.clone();

    let res = auth.register(form).await;
    if res.success {
        return views::login_page(&session, Some((&res.message, true)), email.trim());
    }
    let values = RegisterValues {
        full_name: &full_name,
        email: &email,
        phone: &phone,
        role: &role,
    };
    views::register_page(&session, Some(&res.message), &values)
}

#[instrument(skip_all)]
pub async fn logout(
    State(auth): State<AuthService>,
    CurrentSession(mut session): CurrentSession,
) -> Redirect {
    auth.logout(&mut session).await;
    Redirect::to("/login")
}
