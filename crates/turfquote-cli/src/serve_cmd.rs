use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;

use turfquote_core::catalog::{Catalog, SubscriptionPlan};
use turfquote_core::identity::{self, IdentityEvent, SIGNATURE_HEADER};
use turfquote_core::input::{footage_notice, parse_footage};
use turfquote_core::pricing::{QuoteRequest, QuoteResult, ServiceEstimate, compute_quote, estimate_services};
use turfquote_db::models::SubscriptionTier;
use turfquote_db::queries::users::{self, NewUser, UserConflict};

use crate::plan_cmds::{PlanPrice, price_plan};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub catalog: Arc<Catalog>,
    /// `None` disables the identity webhook.
    pub webhook_secret: Option<Arc<Vec<u8>>>,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: msg.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: msg.into(),
        }
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: msg.into(),
        }
    }

    pub fn internal(err: anyhow::Error) -> Self {
        tracing::error!(error = %format!("{err:#}"), "request failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("{err:#}"),
        }
    }
}

/// A [`UserConflict`] becomes 409; anything else is a 500.
fn user_write_error(err: anyhow::Error) -> AppError {
    match err.downcast_ref::<UserConflict>() {
        Some(conflict) => AppError::conflict(conflict.to_string()),
        None => AppError::internal(err),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct FootageQuery {
    pub sq_ft: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QuoteQuery {
    pub sq_ft: Option<String>,
    /// Comma-separated service IDs.
    pub services: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TierUpdate {
    pub subscription_tier: SubscriptionTier,
}

#[derive(Debug, Serialize)]
pub struct ServicesResponse {
    pub square_footage: Option<u32>,
    pub notice: Option<String>,
    pub services: Vec<ServiceEstimate>,
}

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub square_footage: Option<u32>,
    pub notice: Option<String>,
    #[serde(flatten)]
    pub quote: QuoteResult,
}

fn notice_for(footage: Option<u32>, catalog: &Catalog) -> Option<String> {
    footage_notice(footage, catalog).map(|n| n.to_string())
}

fn footage_param(raw: Option<&str>) -> Result<Option<u32>, AppError> {
    match raw {
        Some(raw) => parse_footage(raw).map_err(|e| AppError::bad_request(e.to_string())),
        None => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/services", get(list_services))
        .route("/api/quote", get(get_quote))
        .route("/api/plans", get(list_plans))
        .route("/api/plans/{slug}/price", get(get_plan_price))
        .route("/api/users", post(create_user))
        .route("/api/users/{external_id}", get(get_user))
        .route("/api/users/{external_id}/tier", put(set_user_tier))
        .route("/api/webhooks/identity", post(identity_webhook))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(state: AppState, bind: &str, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!("turfquote serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("turfquote serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C; shutting down");
    }
}

// ---------------------------------------------------------------------------
// Pricing handlers
// ---------------------------------------------------------------------------

async fn index(State(state): State<AppState>) -> Html<String> {
    let services = state
        .catalog
        .services()
        .iter()
        .map(|s| {
            let kind = if s.is_tiered() { "priced by size" } else { "contact us" };
            format!(
                "<tr><td>{}</td><td>{}</td><td>{kind}</td></tr>",
                escape_html(&s.id),
                escape_html(&s.label)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let plans = state
        .catalog
        .plans()
        .iter()
        .map(|p| {
            format!(
                "<li><a href=\"/api/plans/{slug}/price?sq_ft=1000\">{name}</a></li>",
                slug = escape_html(&p.slug),
                name = escape_html(&p.name),
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    Html(format!(
        "<!DOCTYPE html>\
<html><head><title>turfquote</title></head><body>\
<h1>turfquote</h1>\
<p><a href=\"/api/services\">/api/services</a> | <a href=\"/api/plans\">/api/plans</a></p>\
<table><tr><th>ID</th><th>Service</th><th>Pricing</th></tr>{services}</table>\
<h2>Seasonal plans</h2><ul>{plans}</ul>\
</body></html>"
    ))
}

/// Escape text for an HTML body or a double-quoted attribute.
fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

async fn list_services(
    State(state): State<AppState>,
    Query(query): Query<FootageQuery>,
) -> Result<Json<ServicesResponse>, AppError> {
    let footage = footage_param(query.sq_ft.as_deref())?;
    Ok(Json(ServicesResponse {
        square_footage: footage,
        notice: notice_for(footage, &state.catalog),
        services: estimate_services(footage, &state.catalog),
    }))
}

async fn get_quote(
    State(state): State<AppState>,
    Query(query): Query<QuoteQuery>,
) -> Result<Json<QuoteResponse>, AppError> {
    let footage = footage_param(query.sq_ft.as_deref())?;
    let selected = query
        .services
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty());
    let request = QuoteRequest::new(footage, selected);

    Ok(Json(QuoteResponse {
        square_footage: footage,
        notice: notice_for(footage, &state.catalog),
        quote: compute_quote(&request, &state.catalog),
    }))
}

async fn list_plans(State(state): State<AppState>) -> Json<Vec<SubscriptionPlan>> {
    Json(state.catalog.plans().to_vec())
}

async fn get_plan_price(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<FootageQuery>,
) -> Result<Json<PlanPrice>, AppError> {
    let plan = state
        .catalog
        .plan(&slug)
        .ok_or_else(|| AppError::not_found(format!("plan {slug} not found")))?;
    let footage = footage_param(query.sq_ft.as_deref())?;
    Ok(Json(price_plan(plan, footage)))
}

// ---------------------------------------------------------------------------
// User handlers
// ---------------------------------------------------------------------------

async fn create_user(
    State(state): State<AppState>,
    Json(new): Json<NewUser>,
) -> Result<axum::response::Response, AppError> {
    if new.external_id.trim().is_empty() {
        return Err(AppError::bad_request("external_id must not be empty"));
    }
    if !new.email.contains('@') {
        return Err(AppError::bad_request(format!("invalid email address: {}", new.email)));
    }

    let user = users::create_user(&state.pool, &new)
        .await
        .map_err(user_write_error)?;
    Ok((StatusCode::CREATED, Json(user)).into_response())
}

async fn get_user(
    State(state): State<AppState>,
    Path(external_id): Path<String>,
) -> Result<axum::response::Response, AppError> {
    let user = users::get_user(&state.pool, &external_id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("user {external_id} not found")))?;
    Ok(Json(user).into_response())
}

async fn set_user_tier(
    State(state): State<AppState>,
    Path(external_id): Path<String>,
    Json(update): Json<TierUpdate>,
) -> Result<axum::response::Response, AppError> {
    users::get_user(&state.pool, &external_id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("user {external_id} not found")))?;

    let user = users::update_subscription_tier(&state.pool, &external_id, update.subscription_tier)
        .await
        .map_err(AppError::internal)?;
    tracing::info!(external_id = %user.external_id, tier = %user.subscription_tier, "subscription tier changed");
    Ok(Json(user).into_response())
}

// ---------------------------------------------------------------------------
// Identity webhook
// ---------------------------------------------------------------------------

async fn identity_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<axum::response::Response, AppError> {
    let secret = state
        .webhook_secret
        .as_ref()
        .ok_or_else(|| AppError::unavailable("identity webhook is not configured"))?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    identity::verify_signature(secret, &body, signature).map_err(|e| {
        tracing::warn!(error = %e, "rejected identity webhook");
        AppError::unauthorized(e.to_string())
    })?;

    let event = identity::parse_event(&body).map_err(|e| AppError::bad_request(e.to_string()))?;
    let profile = match event {
        IdentityEvent::UserCreated(profile) => profile,
        IdentityEvent::Other(kind) => {
            tracing::debug!(event = %kind, "ignoring identity event");
            return Ok(Json(serde_json::json!({ "status": "ignored", "type": kind })).into_response());
        }
    };

    let new = identity::new_user_from_event(&profile).map_err(|e| AppError::bad_request(e.to_string()))?;

    let Some(user) = users::insert_user_if_absent(&state.pool, &new)
        .await
        .map_err(user_write_error)?
    else {
        let existing = users::get_user(&state.pool, &new.external_id)
            .await
            .map_err(AppError::internal)?
            .ok_or_else(|| {
                AppError::internal(anyhow::anyhow!(
                    "user {} was deleted during webhook delivery",
                    new.external_id
                ))
            })?;
        return Ok(Json(serde_json::json!({ "status": "exists", "user": existing })).into_response());
    };
    tracing::info!(external_id = %user.external_id, "user created from identity webhook");
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "status": "created", "user": user })),
    )
        .into_response())
}
