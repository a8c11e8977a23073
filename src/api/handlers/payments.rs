//! Months, payment plans, payments and receipts.

use super::Deleted;
use crate::{
    api::AppState,
    core::payment::{
        self, PaymentDetails, PaymentInput, PlanDetails, PlanInput, ReceiptInput, RecordedReceipt,
    },
    entities::{month, receipt},
    errors::{Error, Result},
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use tracing::info;

/// Router mounted at `/api/plans`.
pub fn plan_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_plans).post(create_plan))
        .route("/:id", get(show_plan).put(update_plan).delete(delete_plan))
}

/// Router mounted at `/api/payments`.
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_payments).post(create_payment))
        .route("/:id", get(show_payment).delete(delete_payment))
        .route("/:id/recompute", post(recompute_payment))
}

/// Router mounted at `/api/receipts`.
pub fn receipt_routes() -> Router<AppState> {
    Router::new().route("/", get(list_receipts).post(record_receipt))
}

/// Optional `?payment_id=` filter.
#[derive(Debug, Default, Deserialize)]
pub struct ReceiptQuery {
    /// Only receipts of this payment
    pub payment_id: Option<i64>,
}

/// `GET /api/months`
pub async fn list_months(State(state): State<AppState>) -> Result<Json<Vec<month::Model>>> {
    Ok(Json(payment::list_months(&state.db).await?))
}

async fn list_plans(State(state): State<AppState>) -> Result<Json<Vec<PlanDetails>>> {
    Ok(Json(payment::list_plans(&state.db).await?))
}

async fn create_plan(
    State(state): State<AppState>,
    Json(input): Json<PlanInput>,
) -> Result<(StatusCode, Json<PlanDetails>)> {
    let created = payment::create_plan(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn show_plan(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<PlanDetails>> {
    payment::get_plan(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found("Payment plan", id))
}

async fn update_plan(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<PlanInput>,
) -> Result<Json<PlanDetails>> {
    Ok(Json(payment::update_plan(&state.db, id, input).await?))
}

async fn delete_plan(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Deleted>> {
    payment::delete_plan(&state.db, id).await?;
    Ok(Json(Deleted { deleted: id }))
}

async fn list_payments(State(state): State<AppState>) -> Result<Json<Vec<PaymentDetails>>> {
    Ok(Json(payment::list_payments(&state.db).await?))
}

async fn create_payment(
    State(state): State<AppState>,
    Json(input): Json<PaymentInput>,
) -> Result<(StatusCode, Json<PaymentDetails>)> {
    let created = payment::create_payment(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn show_payment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PaymentDetails>> {
    payment::get_payment(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found("Payment", id))
}

async fn delete_payment(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Deleted>> {
    payment::delete_payment(&state.db, id).await?;
    Ok(Json(Deleted { deleted: id }))
}

async fn recompute_payment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PaymentDetails>> {
    Ok(Json(payment::recompute_payment(&state.db, id).await?))
}

async fn list_receipts(
    State(state): State<AppState>,
    Query(query): Query<ReceiptQuery>,
) -> Result<Json<Vec<receipt::Model>>> {
    Ok(Json(payment::list_receipts(&state.db, query.payment_id).await?))
}

async fn record_receipt(
    State(state): State<AppState>,
    Json(input): Json<ReceiptInput>,
) -> Result<(StatusCode, Json<RecordedReceipt>)> {
    let recorded = payment::record_receipt(&state.db, input).await?;
    info!("POST /api/receipts - {}", recorded.receipt.receipt_number);
    Ok((StatusCode::CREATED, Json(recorded)))
}
