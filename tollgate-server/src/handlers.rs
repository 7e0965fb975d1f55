//! Request handlers.

use axum::extract::{FromRequest, Path, Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use serde::{Deserialize, Serialize};
use tollgate_license::LicenseError;
use tollgate_types::{KeyInfo, KeySpec, License, LicenseDraft, Product};

use crate::error::ApiError;
use crate::AppState;

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Returned by `POST /admin/licenses`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedLicense {
    pub id: String,
    pub token: String,
}

/// Returned by `POST /admin/keys`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedKey {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
        })
    }
}

/// Body of `POST /license/verify`, as a form or as JSON.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub token: String,
}

/// Outcome of `POST /license/verify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

fn verification_failed(message: impl Into<String>) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(VerifyResponse {
            valid: false,
            message: Some(message.into()),
        }),
    )
        .into_response()
}

/// The token of a verify request, read from JSON when the content type says
/// so and from a urlencoded form otherwise.
pub struct TokenInput(pub String);

impl<S> FromRequest<S> for TokenInput
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        let parsed = if is_json {
            Json::<VerifyRequest>::from_request(req, state)
                .await
                .map(|Json(body)| body)
                .map_err(|rejection| rejection.body_text())
        } else {
            Form::<VerifyRequest>::from_request(req, state)
                .await
                .map(|Form(body)| body)
                .map_err(|rejection| rejection.body_text())
        };

        match parsed {
            Ok(body) => Ok(Self(body.token)),
            Err(message) => Err(verification_failed(message)),
        }
    }
}

// ── Licenses ─────────────────────────────────────────────────────

pub async fn generate_license(
    State(state): State<AppState>,
    Json(draft): Json<LicenseDraft>,
) -> ApiResult<IssuedLicense> {
    let license = state.service.generate(&draft).await?;
    Ok(Json(IssuedLicense {
        id: license.id,
        token: license.token,
    }))
}

pub async fn list_licenses(State(state): State<AppState>) -> ApiResult<Vec<License>> {
    Ok(Json(state.service.list().await?))
}

pub async fn get_license(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<License> {
    Ok(Json(state.service.get(&id).await?))
}

pub async fn activate_license(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<MessageBody> {
    state.service.activate(&id).await?;
    Ok(MessageBody::new("Activated"))
}

pub async fn inactivate_license(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<MessageBody> {
    state.service.inactivate(&id).await?;
    Ok(MessageBody::new("Inactivated"))
}

pub async fn delete_license(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<MessageBody> {
    state.service.delete(&id).await?;
    Ok(MessageBody::new("Deleted"))
}

// ── Keys ─────────────────────────────────────────────────────────

pub async fn upload_key(
    State(state): State<AppState>,
    Json(spec): Json<KeySpec>,
) -> ApiResult<UploadedKey> {
    let id = state.service.vault().upload(&spec).await?;
    Ok(Json(UploadedKey { id }))
}

pub async fn list_keys(State(state): State<AppState>) -> ApiResult<Vec<KeyInfo>> {
    Ok(Json(state.service.vault().list().await?))
}

pub async fn key_info(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<KeyInfo> {
    Ok(Json(state.service.vault().info(&id).await?))
}

pub async fn delete_key(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<MessageBody> {
    state.service.vault().delete(&id).await?;
    Ok(MessageBody::new("Deleted"))
}

// ── Products ─────────────────────────────────────────────────────

pub async fn list_products(State(state): State<AppState>) -> Json<Vec<Product>> {
    let products = state.service.catalog().products();
    Json(products.iter().map(Product::redacted).collect())
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Product> {
    state
        .service
        .catalog()
        .product(&name)
        .map(|p| Json(p.redacted()))
        .ok_or_else(|| ApiError(LicenseError::ProductNotFound(name)))
}

// ── Public ───────────────────────────────────────────────────────

pub async fn verify_license(State(state): State<AppState>, TokenInput(token): TokenInput) -> Response {
    match state.service.verify_token(&token).await {
        Ok(verdict) => Json(VerifyResponse {
            valid: verdict.valid,
            message: verdict.reason,
        })
        .into_response(),
        Err(err) => {
            tracing::debug!(error = %err, "License verification failed");
            verification_failed(err.to_string())
        }
    }
}

pub async fn ping() -> Json<serde_json::Value> {
    Json(serde_json::json!({}))
}
