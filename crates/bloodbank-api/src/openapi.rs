//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI 3.1 document,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI document for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Blood Bank API",
        version = "0.1.0",
        description = "Blood request lifecycle and per-bank inventory reconciliation.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(
        // Requests
        crate::routes::requests::submit_request,
        crate::routes::requests::list_requests,
        crate::routes::requests::get_request,
        crate::routes::requests::review_request,
        crate::routes::requests::fulfill_request,
        // Inventory
        crate::routes::inventory::list_inventory,
        crate::routes::inventory::record_donation,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::requests::SubmitRequestBody,
        crate::routes::requests::ReviewRequestBody,
        crate::routes::requests::FulfillRequestBody,
        crate::routes::requests::BloodRequestRecord,
        crate::routes::requests::TransitionEntry,
        crate::routes::inventory::InventoryRecord,
        crate::routes::inventory::DonationBody,
    )),
    tags(
        (name = "requests", description = "Blood request lifecycle"),
        (name = "inventory", description = "Per-bank blood inventory"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json: Return the generated OpenAPI document.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
