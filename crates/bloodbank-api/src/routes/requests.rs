//! # Blood Requests API
//!
//! Submission, review and fulfillment of blood requests.
//!
//! ## Endpoints
//!
//! - `POST /requests`: submit a request
//! - `GET /requests`: list requests (`?status=&bank_id=&blood_group=`)
//! - `GET /requests/{id}`: get one request
//! - `PUT /requests/{id}/status`: approve or reject
//! - `POST /requests/{id}/fulfill`: mark an approved request fulfilled

use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use bloodbank_core::{BankId, RecipientId, RequestId};
use bloodbank_engine::{RequestFilter, ReviewDecision};
use bloodbank_state::{BloodRequest, RequestDraft, RequestStatus, RequestTransitionRecord};

use crate::error::AppError;
use crate::extractors::{
    extract_json, extract_optional_json, extract_query, extract_validated_json,
    parse_group_param, parse_id_param, Validate,
};
use crate::state::AppState;

// ── Request/Response DTOs ───────────────────────────────────────────

/// Request to submit a new blood request.
///
/// Fields are camelCase on the wire; the snake_case spellings used by the
/// rest of the API are accepted as aliases.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequestBody {
    /// Who the blood is for.
    #[serde(alias = "recipient_id")]
    pub recipient_id: Uuid,
    /// The bank to draw from.
    #[serde(alias = "bank_id")]
    pub bank_id: Uuid,
    /// One of A+, A-, B+, B-, AB+, AB-, O+, O-.
    #[serde(alias = "blood_group")]
    pub blood_group: String,
    /// Units requested; must be positive.
    pub units: i64,
    /// Date by which the units are needed; today or later.
    #[serde(alias = "required_by")]
    pub required_by: NaiveDate,
    /// Clinical purpose, 1 to 500 characters.
    pub purpose: String,
}

impl From<SubmitRequestBody> for RequestDraft {
    fn from(body: SubmitRequestBody) -> Self {
        RequestDraft {
            recipient_id: RecipientId::from_uuid(body.recipient_id),
            bank_id: BankId::from_uuid(body.bank_id),
            blood_group: body.blood_group,
            units: body.units,
            required_by: body.required_by,
            purpose: body.purpose,
        }
    }
}

/// Review decision for a pending request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewRequestBody {
    /// `approve` or `reject`.
    pub decision: String,
    /// Reviewer notes; required when rejecting.
    #[serde(default)]
    pub notes: Option<String>,
}

impl Validate for ReviewRequestBody {
    fn validate(&self) -> Result<(), String> {
        self.decision.parse::<ReviewDecision>().map(|_| ())
    }
}

/// Optional body for fulfillment.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct FulfillRequestBody {
    /// Notes recorded with the fulfillment.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Query filters for listing requests.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListRequestsQuery {
    /// pending, approved, rejected or fulfilled.
    pub status: Option<String>,
    /// Bank UUID.
    pub bank_id: Option<String>,
    /// Blood group, e.g. `O-` (escape `+` as `%2B`).
    pub blood_group: Option<String>,
}

impl ListRequestsQuery {
    fn into_filter(self) -> Result<RequestFilter, AppError> {
        Ok(RequestFilter {
            status: self
                .status
                .map(|s| s.parse::<RequestStatus>().map_err(AppError::BadRequest))
                .transpose()?,
            bank_id: self
                .bank_id
                .map(|b| parse_id_param::<BankId>("bank_id", &b))
                .transpose()?,
            blood_group: self
                .blood_group
                .map(|g| parse_group_param(&g))
                .transpose()?,
        })
    }
}

/// One entry in a request's status history.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransitionEntry {
    pub from_state: String,
    pub to_state: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl From<RequestTransitionRecord> for TransitionEntry {
    fn from(t: RequestTransitionRecord) -> Self {
        Self {
            from_state: t.from_state.to_string(),
            to_state: t.to_state.to_string(),
            timestamp: t.timestamp,
            notes: t.notes,
        }
    }
}

/// A blood request as returned by the API.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BloodRequestRecord {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub bank_id: Uuid,
    pub blood_group: String,
    pub units: u32,
    pub required_by: NaiveDate,
    pub purpose: String,
    /// pending, approved, rejected or fulfilled.
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub transitions: Vec<TransitionEntry>,
}

impl From<BloodRequest> for BloodRequestRecord {
    fn from(r: BloodRequest) -> Self {
        Self {
            id: *r.id.as_uuid(),
            recipient_id: *r.recipient_id.as_uuid(),
            bank_id: *r.bank_id.as_uuid(),
            blood_group: r.blood_group.to_string(),
            units: r.units.get(),
            required_by: r.required_by,
            purpose: r.purpose,
            status: r.status.to_string(),
            notes: r.notes,
            created_at: r.created_at,
            updated_at: r.updated_at,
            transitions: r.transitions.into_iter().map(Into::into).collect(),
        }
    }
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the requests router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/requests", get(list_requests).post(submit_request))
        .route("/requests/{id}", get(get_request))
        .route("/requests/{id}/status", put(review_request))
        .route("/requests/{id}/fulfill", post(fulfill_request))
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /requests: Submit a blood request.
#[utoipa::path(
    post,
    path = "/requests",
    request_body = SubmitRequestBody,
    responses(
        (status = 201, description = "Request created as pending", body = BloodRequestRecord),
        (status = 400, description = "Validation error or malformed body", body = crate::error::ErrorBody),
        (status = 503, description = "Storage unavailable", body = crate::error::ErrorBody),
    ),
    tag = "requests"
)]
async fn submit_request(
    State(state): State<AppState>,
    body: Result<Json<SubmitRequestBody>, JsonRejection>,
) -> Result<(StatusCode, Json<BloodRequestRecord>), AppError> {
    let body = extract_json(body)?;
    let request = state.controller.submit_request(body.into()).await?;
    Ok((StatusCode::CREATED, Json(request.into())))
}

/// GET /requests: List requests, oldest first.
#[utoipa::path(
    get,
    path = "/requests",
    params(ListRequestsQuery),
    responses(
        (status = 200, description = "Matching requests", body = Vec<BloodRequestRecord>),
        (status = 400, description = "Unparseable filter", body = crate::error::ErrorBody),
    ),
    tag = "requests"
)]
async fn list_requests(
    State(state): State<AppState>,
    query: Result<Query<ListRequestsQuery>, QueryRejection>,
) -> Result<Json<Vec<BloodRequestRecord>>, AppError> {
    let filter = extract_query(query)?.into_filter()?;
    let requests = state.controller.list_requests(filter).await?;
    Ok(Json(requests.into_iter().map(Into::into).collect()))
}

/// GET /requests/{id}: Get a single request.
#[utoipa::path(
    get,
    path = "/requests/{id}",
    params(("id" = Uuid, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Request found", body = BloodRequestRecord),
        (status = 404, description = "Request not found", body = crate::error::ErrorBody),
    ),
    tag = "requests"
)]
async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BloodRequestRecord>, AppError> {
    let id: RequestId = parse_id_param("request id", &id)?;
    let request = state.controller.get_request(id).await?;
    Ok(Json(request.into()))
}

/// PUT /requests/{id}/status: Approve or reject a pending request.
///
/// Approval debits the bank's stock. When stock is short the request stays
/// pending and the response is 422.
#[utoipa::path(
    put,
    path = "/requests/{id}/status",
    params(("id" = Uuid, Path, description = "Request ID")),
    request_body = ReviewRequestBody,
    responses(
        (status = 200, description = "Request reviewed", body = BloodRequestRecord),
        (status = 400, description = "Unknown decision or missing rejection notes", body = crate::error::ErrorBody),
        (status = 404, description = "Request not found", body = crate::error::ErrorBody),
        (status = 409, description = "Request is not pending", body = crate::error::ErrorBody),
        (status = 422, description = "Insufficient inventory", body = crate::error::ErrorBody),
    ),
    tag = "requests"
)]
async fn review_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<ReviewRequestBody>, JsonRejection>,
) -> Result<Json<BloodRequestRecord>, AppError> {
    let id: RequestId = parse_id_param("request id", &id)?;
    let body = extract_validated_json(body)?;
    let decision: ReviewDecision = body.decision.parse().map_err(AppError::BadRequest)?;
    let request = state
        .controller
        .review_request(id, decision, body.notes)
        .await?;
    Ok(Json(request.into()))
}

/// POST /requests/{id}/fulfill: Mark an approved request fulfilled.
#[utoipa::path(
    post,
    path = "/requests/{id}/fulfill",
    params(("id" = Uuid, Path, description = "Request ID")),
    request_body(content = FulfillRequestBody, description = "Optional; an empty body is accepted"),
    responses(
        (status = 200, description = "Request fulfilled", body = BloodRequestRecord),
        (status = 404, description = "Request not found", body = crate::error::ErrorBody),
        (status = 409, description = "Request is not approved", body = crate::error::ErrorBody),
    ),
    tag = "requests"
)]
async fn fulfill_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<BloodRequestRecord>, AppError> {
    let id: RequestId = parse_id_param("request id", &id)?;
    let body: FulfillRequestBody = extract_optional_json(&body)?;
    let request = state.controller.fulfill_request(id, body.notes).await?;
    Ok(Json(request.into()))
}
