use std::{net::SocketAddr, time::Duration};

use axum::{
    extract::{MatchedPath, State},
    http::{header, HeaderValue, Method, Request, Response, StatusCode, Uri},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::Span;

use crate::config::{AppConfig, MailBackend, StoreBackend};
use crate::referrals;
use crate::state::AppState;

const AVAILABLE_ROUTES: [&str; 6] = [
    "GET /",
    "GET /api/test",
    "POST /api/send-signin-email",
    "POST /api/verify-success",
    "GET /api/leaderboard",
    "GET /api/referrals/:email",
];

pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    Router::new()
        .route("/", get(|| async { "June backend is live" }))
        .route("/api/test", get(api_test))
        .merge(referrals::router())
        .fallback(not_found)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(request_span)
                .on_response(record_response),
        )
}

/// Span per request. Records the path only, never the query string.
fn request_span<B>(req: &Request<B>) -> Span {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(MatchedPath::as_str)
        .unwrap_or("<unmatched>");
    tracing::info_span!(
        "request",
        method = %req.method(),
        path = %req.uri().path(),
        route,
        status = tracing::field::Empty,
        latency_ms = tracing::field::Empty,
    )
}

fn record_response<B>(res: &Response<B>, latency: Duration, span: &Span) {
    let status = res.status();
    span.record("status", status.as_u16());
    span.record("latency_ms", latency.as_millis() as u64);
    if status.is_server_error() {
        tracing::error!(%status, "request failed");
    } else if status.is_client_error() {
        tracing::warn!(%status, "request rejected");
    } else {
        tracing::debug!(%status, "request done");
    }
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring unparsable CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

async fn api_test(State(state): State<AppState>) -> Json<serde_json::Value> {
    let timestamp = OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();
    let cfg = &state.config;
    Json(json!({
        "status": "OK",
        "timestamp": timestamp,
        "env": {
            "hasStoreConfig": cfg.store == StoreBackend::Memory || cfg.database_url.is_some(),
            "hasMailConfig": cfg.mail == MailBackend::Log || cfg.mailgun.is_some(),
        }
    }))
}

async fn not_found(method: Method, uri: Uri) -> impl IntoResponse {
    tracing::warn!(%method, path = %uri.path(), "route not found");
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Route not found",
            "method": method.as_str(),
            "path": uri.path(),
            "availableRoutes": AVAILABLE_ROUTES,
        })),
    )
}

pub async fn serve(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received, draining connections");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn api_test_reports_configured_collaborators() {
        let Json(body) = api_test(State(AppState::fake())).await;
        assert_eq!(body["status"], "OK");
        assert_eq!(body["env"]["hasStoreConfig"], true);
        assert_eq!(body["env"]["hasMailConfig"], true);
    }

    #[tokio::test]
    async fn unknown_route_lists_available_routes() {
        let res = not_found(Method::GET, Uri::from_static("/nope"))
            .await
            .into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn app_builds_with_fake_state() {
        let _app: Router = build_app(AppState::fake());
    }
}
