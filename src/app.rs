use std::net::SocketAddr;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::{AppConfig, ServerConfig};
use crate::error::ErrorReport;
use crate::state::AppState;
use crate::{auth, courses, users};

pub fn build_app(state: AppState) -> Router {
    // credentials are only resolved on routes that act as a user
    let protected = Router::new()
        .merge(users::handlers::protected_routes())
        .merge(courses::handlers::write_routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::resolve_identity,
        ));

    let api = Router::new()
        .merge(protected)
        .merge(users::handlers::public_routes())
        .merge(courses::handlers::read_routes())
        .route("/health", get(|| async { "ok" }));

    Router::new()
        .nest("/api", api)
        .route("/", get(welcome))
        .fallback(route_not_found)
        .layer(middleware::from_fn_with_state(state.clone(), log_errors))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

async fn welcome() -> Json<serde_json::Value> {
    Json(json!({ "message": "Welcome to the REST API project!" }))
}

async fn route_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": "Route Not Found" })),
    )
}

/// Global error handler: reports the cause attached by `AppError` when enabled.
async fn log_errors(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let res = next.run(req).await;
    if let Some(report) = error_report(&res, &state.config) {
        tracing::error!(status = %res.status(), error = %report, "global error handler");
    }
    res
}

fn error_report<'a>(res: &'a Response, config: &AppConfig) -> Option<&'a str> {
    if !config.enable_global_error_logging {
        return None;
    }
    res.extensions()
        .get::<ErrorReport>()
        .map(|ErrorReport(report)| report.as_str())
}

pub async fn serve(app: Router, server: &ServerConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", server.host, server.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
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
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    use axum::body::Body;
    use tower::ServiceExt;

    use super::*;
    use crate::db::MemoryStore;
    use crate::error::AppError;

    fn config(enable_global_error_logging: bool) -> AppConfig {
        AppConfig {
            database_url: "memory://".into(),
            db_max_connections: 1,
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 0,
            },
            enable_global_error_logging,
        }
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    /// Sends an unauthenticated `GET /api/users` and returns everything logged meanwhile.
    async fn logs_for_unauthorized_request(enable_global_error_logging: bool) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let state = AppState::from_parts(
            Arc::new(MemoryStore::new()),
            Arc::new(config(enable_global_error_logging)),
        );
        let request = axum::http::Request::builder()
            .uri("/api/users")
            .body(Body::empty())
            .unwrap();
        let response = build_app(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        captured.text()
    }

    #[test]
    fn error_report_is_returned_only_when_enabled() {
        let res = AppError::not_found("Course not found").into_response();
        assert_eq!(error_report(&res, &config(true)), Some("Course not found"));
        assert_eq!(error_report(&res, &config(false)), None);
    }

    #[test]
    fn successful_response_has_no_error_report() {
        let res = StatusCode::NO_CONTENT.into_response();
        assert_eq!(error_report(&res, &config(true)), None);
    }

    #[tokio::test]
    async fn enabled_error_logging_reports_failed_requests() {
        let logs = logs_for_unauthorized_request(true).await;
        assert!(logs.contains("global error handler"), "logs: {logs}");
        assert!(logs.contains("401"), "logs: {logs}");
    }

    #[tokio::test]
    async fn disabled_error_logging_stays_quiet() {
        let logs = logs_for_unauthorized_request(false).await;
        assert!(!logs.contains("global error handler"), "logs: {logs}");
    }
}
