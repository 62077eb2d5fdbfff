use anyhow::Context;
use axum::{response::Redirect, routing::get, Router};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::state::AppState;
use crate::{auth, dashboards, properties, session};

pub fn build_app(state: AppState) -> Router {
    let sessions = session::layer(state.sessions.clone(), &state.config.session);

    Router::new()
        .route("/", get(|| async { Redirect::to("/properties") }))
        .route("/health", get(|| async { "ok" }))
        .merge(auth::router())
        .merge(properties::router())
        .merge(dashboards::router())
        .with_state(state)
        .layer(sessions)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, ?latency, "response");
                        } else {
                            tracing::info!(%status, ?latency, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, server: &ServerConfig) -> anyhow::Result<()> {
    let listener = TcpListener::bind((server.host.as_str(), server.port))
        .await
        .with_context(|| format!("cannot bind {}:{}", server.host, server.port))?;
    tracing::info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
