use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use subtle::ConstantTimeEq;
use tower_http::trace::TraceLayer;

use crate::store::NotificationStore;

pub mod handlers;

/// Shared state of the read API.
#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn NotificationStore>,
    pub admin_key: Option<String>,
}

/// Build the read API router: health check plus `/api/v1` notification routes.
pub fn router(state: ApiState) -> Router {
    let api = Router::new()
        .route(
            "/users/:recipient/notifications",
            get(handlers::list_notifications),
        )
        .route(
            "/users/:recipient/notifications/unread",
            get(handlers::count_unread_notifications),
        )
        .route(
            "/users/:recipient/notifications/:action_key/read",
            post(handlers::mark_notification_read),
        )
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth))
        .fallback(fallback_404);

    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn fallback_404() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Middleware: when an admin key is configured, require it in `X-Admin-Key`
/// (or as a bearer token).
async fn admin_auth(
    State(state): State<ApiState>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = state.admin_key.as_deref() else {
        return Ok(next.run(req).await);
    };

    let provided_key = req
        .headers()
        .get("x-admin-key")
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            req.headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(|t| t.trim())
        });

    match provided_key {
        Some(k) if bool::from(k.as_bytes().ct_eq(expected.as_bytes())) => Ok(next.run(req).await),
        Some(_) => {
            tracing::warn!("read API: invalid admin key");
            Err(StatusCode::UNAUTHORIZED)
        }
        None => {
            tracing::warn!("read API: missing X-Admin-Key header");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
