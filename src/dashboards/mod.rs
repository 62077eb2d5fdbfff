//! Role dashboards and the moderation actions behind them.

pub mod handlers;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::buyer_routes())
        .merge(handlers::seller_routes())
        .merge(handlers::admin_routes())
        .merge(handlers::message_routes())
}
