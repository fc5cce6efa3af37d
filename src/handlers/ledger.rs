// src/handlers/ledger.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    common::{error::AppError, pagination::PageRequest},
    config::AppState,
    middleware::rbac::{PermLedgerRebuild, RequirePermission},
    models::{
        item::ItemFilter,
        ledger::{LedgerReport, LedgerSummary, RebuildReport, RecomputeOutcome},
    },
};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LedgerSummaryQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    /// Só itens com status `low`
    pub low_stock: Option<bool>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LedgerQuery {
    /// Inclusivo (YYYY-MM-DD)
    pub start_date: Option<NaiveDate>,
    /// Inclusivo (YYYY-MM-DD)
    pub end_date: Option<NaiveDate>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

// ---
// Handler: get_ledger_summary
// ---
#[utoipa::path(
    get,
    path = "/api/stores/ledger",
    tag = "Ledger",
    params(LedgerSummaryQuery),
    responses(
        (status = 200, description = "Saldo e status de cada item + estatísticas", body = LedgerSummary)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_ledger_summary(
    State(app_state): State<AppState>,
    Query(query): Query<LedgerSummaryQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = ItemFilter {
        category: query.category,
        search: query.search.filter(|s| !s.trim().is_empty()),
        low_stock_only: query.low_stock.unwrap_or(false),
    };

    let summary = app_state
        .ledger_service
        .get_summary(&filter, PageRequest::new(query.page, query.limit))
        .await?;

    Ok((StatusCode::OK, Json(summary)))
}

// ---
// Handler: get_item_ledger
// ---
#[utoipa::path(
    get,
    path = "/api/stores/ledger/{item_id}",
    tag = "Ledger",
    params(
        ("item_id" = i64, Path, description = "ID do item"),
        LedgerQuery
    ),
    responses(
        (status = 200, description = "Lançamentos do item, mais recentes primeiro", body = LedgerReport),
        (status = 404, description = "Item não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_item_ledger(
    State(app_state): State<AppState>,
    Path(item_id): Path<i64>,
    Query(query): Query<LedgerQuery>,
) -> Result<impl IntoResponse, AppError> {
    let report = app_state
        .ledger_service
        .get_ledger(
            &app_state.db_pool,
            item_id,
            query.start_date,
            query.end_date,
            PageRequest::new(query.page, query.limit),
        )
        .await?;

    Ok((StatusCode::OK, Json(report)))
}

// ---
// Handler: recalculate_item
// ---
#[utoipa::path(
    post,
    path = "/api/stores/ledger/{item_id}/recalculate",
    tag = "Ledger",
    params(("item_id" = i64, Path, description = "ID do item")),
    responses(
        (status = 200, description = "Razão do item reconstruído", body = RecomputeOutcome),
        (status = 403, description = "Sem permissão"),
        (status = 404, description = "Item não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn recalculate_item(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermLedgerRebuild>,
    Path(item_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = app_state
        .ledger_service
        .recalculate_item(&app_state.db_pool, item_id)
        .await?;

    Ok((StatusCode::OK, Json(outcome)))
}

// ---
// Handler: recalculate_all
// ---
#[utoipa::path(
    post,
    path = "/api/stores/ledger/recalculate",
    tag = "Ledger",
    responses(
        (status = 200, description = "Razão de todos os itens reconstruído", body = RebuildReport),
        (status = 403, description = "Sem permissão")
    ),
    security(("api_jwt" = []))
)]
pub async fn recalculate_all(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermLedgerRebuild>,
) -> Result<impl IntoResponse, AppError> {
    let report = app_state.ledger_service.recalculate_all(&app_state.db_pool).await?;
    Ok((StatusCode::OK, Json(report)))
}
