//! # Inventory API
//!
//! ## Endpoints
//!
//! - `GET /inventory`: stock per (bank, blood group), `?bank_id=&blood_group=`
//! - `POST /inventory/donations`: credit donated units to a bank

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use bloodbank_core::{BankId, BloodGroup};
use bloodbank_engine::{InventoryEntry, InventoryFilter};

use crate::error::AppError;
use crate::extractors::{extract_json, extract_query, parse_group_param, parse_id_param};
use crate::state::AppState;

// ── Request/Response DTOs ───────────────────────────────────────────

/// Stock held by one bank for one blood group.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InventoryRecord {
    pub bank_id: Uuid,
    pub blood_group: String,
    pub units: u32,
    pub updated_at: DateTime<Utc>,
}

impl From<&InventoryEntry> for InventoryRecord {
    fn from(entry: &InventoryEntry) -> Self {
        Self {
            bank_id: *entry.bank_id.as_uuid(),
            blood_group: entry.blood_group.to_string(),
            units: entry.units,
            updated_at: entry.updated_at,
        }
    }
}

/// Donated units to credit.
#[derive(Debug, Deserialize, ToSchema)]
pub struct DonationBody {
    pub bank_id: Uuid,
    /// One of A+, A-, B+, B-, AB+, AB-, O+, O-.
    pub blood_group: String,
    /// Units donated; must be positive.
    pub units: i64,
}

/// Query filters for inventory.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct InventoryQuery {
    /// Bank UUID.
    pub bank_id: Option<String>,
    /// Blood group, e.g. `AB-` (escape `+` as `%2B`).
    pub blood_group: Option<String>,
}

impl InventoryQuery {
    fn into_filter(self) -> Result<InventoryFilter, AppError> {
        Ok(InventoryFilter {
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

// ── Router ──────────────────────────────────────────────────────────

/// Build the inventory router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/inventory", get(list_inventory))
        .route("/inventory/donations", post(record_donation))
}

// ── Handlers ────────────────────────────────────────────────────────

/// GET /inventory: Stock entries ordered by bank and blood group.
#[utoipa::path(
    get,
    path = "/inventory",
    params(InventoryQuery),
    responses(
        (status = 200, description = "Matching inventory entries", body = Vec<InventoryRecord>),
        (status = 400, description = "Unparseable filter", body = crate::error::ErrorBody),
    ),
    tag = "inventory"
)]
async fn list_inventory(
    State(state): State<AppState>,
    query: Result<Query<InventoryQuery>, QueryRejection>,
) -> Result<Json<Vec<InventoryRecord>>, AppError> {
    let filter = extract_query(query)?.into_filter()?;
    let view = state.controller.ledger().query(filter).await?;
    Ok(Json(view.iter().map(InventoryRecord::from).collect()))
}

/// POST /inventory/donations: Credit donated units.
#[utoipa::path(
    post,
    path = "/inventory/donations",
    request_body = DonationBody,
    responses(
        (status = 201, description = "Units credited; returns the updated entry", body = InventoryRecord),
        (status = 400, description = "Validation error or malformed body", body = crate::error::ErrorBody),
    ),
    tag = "inventory"
)]
async fn record_donation(
    State(state): State<AppState>,
    body: Result<Json<DonationBody>, JsonRejection>,
) -> Result<(StatusCode, Json<InventoryRecord>), AppError> {
    let body = extract_json(body)?;
    let blood_group: BloodGroup = body.blood_group.parse()?;
    let entry = state
        .controller
        .record_donation(BankId::from_uuid(body.bank_id), blood_group, body.units)
        .await?;
    Ok((StatusCode::CREATED, Json(InventoryRecord::from(&entry))))
}
