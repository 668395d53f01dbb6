use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use core_config::AppInfo;
use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use utoipa::ToSchema;

/// Liveness payload
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub name: &'static str,
    pub version: &'static str,
}

/// Readiness payload: overall status plus one entry per dependency
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub checks: BTreeMap<String, &'static str>,
}

/// A named dependency check, e.g. a database ping
pub type HealthCheckFuture<'a> = Pin<Box<dyn Future<Output = Result<(), String>> + Send + 'a>>;

/// Runs every check concurrently.
///
/// Returns 200 when all succeed, 503 otherwise; failures are logged.
pub async fn run_health_checks(
    checks: Vec<(&str, HealthCheckFuture<'_>)>,
) -> (StatusCode, Json<ReadyResponse>) {
    let (names, pending): (Vec<_>, Vec<_>) = checks.into_iter().unzip();
    let results = join_all(pending).await;

    let mut ready = true;
    let checks = names
        .into_iter()
        .zip(results)
        .map(|(name, result)| {
            let status = match result {
                Ok(()) => "up",
                Err(e) => {
                    tracing::error!(check = name, error = %e, "Readiness check failed");
                    ready = false;
                    "down"
                }
            };
            (name.to_string(), status)
        })
        .collect();

    let (code, status) = if ready {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    };

    (code, Json(ReadyResponse { status, checks }))
}

async fn health_handler(State(app): State<AppInfo>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        name: app.name,
        version: app.version,
    })
}

/// `GET /health`, always 200 while the process is serving.
pub fn health_router(app_info: AppInfo) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(app_info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_reports_app_info() {
        let app = health_router(AppInfo {
            name: "accounts_api",
            version: "1.2.3",
        });

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["name"], "accounts_api");
        assert_eq!(json["version"], "1.2.3");
    }

    #[tokio::test]
    async fn test_all_checks_up() {
        let (status, Json(body)) = run_health_checks(vec![(
            "database",
            Box::pin(async { Ok(()) }) as HealthCheckFuture<'_>,
        )])
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ready");
        assert_eq!(body.checks["database"], "up");
    }

    #[tokio::test]
    async fn test_failed_check_is_unavailable() {
        let (status, Json(body)) = run_health_checks(vec![
            ("database", Box::pin(async { Err("refused".to_string()) }) as HealthCheckFuture<'_>),
            ("other", Box::pin(async { Ok(()) }) as HealthCheckFuture<'_>),
        ])
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.status, "not ready");
        assert_eq!(body.checks["database"], "down");
        assert_eq!(body.checks["other"], "up");
    }
}
