// src/handlers/issuance.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    common::{error::AppError, pagination::{PageRequest, Paginated}},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{ensure_permission, PermStoresApprove, PermStoresWrite, PermissionDef, RequirePermission},
    },
    models::issuance::{
        CreatedIssuance, IssuanceDetail, IssuanceHeader, IssuanceStatus, IssuanceSummary, IssuanceUpdate,
        NewIssuanceLine,
    },
};

// ---
// Payloads
// ---
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct IssuanceLinePayload {
    pub item_id: i64,

    #[validate(range(min = 0, message = "quantity_ordered cannot be negative."))]
    pub quantity_ordered: i32,

    #[validate(range(min = 0, message = "quantity_approved cannot be negative."))]
    #[serde(default)]
    pub quantity_approved: i32,

    #[validate(range(min = 0, message = "quantity_issued cannot be negative."))]
    #[serde(default)]
    pub quantity_issued: i32,

    pub remarks: Option<String>,
}

impl From<IssuanceLinePayload> for NewIssuanceLine {
    fn from(p: IssuanceLinePayload) -> Self {
        NewIssuanceLine {
            item_id: p.item_id,
            quantity_ordered: p.quantity_ordered,
            quantity_approved: p.quantity_approved,
            quantity_issued: p.quantity_issued,
            remarks: p.remarks,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateIssuancePayload {
    #[validate(length(min = 1, message = "from_department is required."))]
    #[schema(example = "Protocol")]
    pub from_department: String,

    /// Padrão: data de hoje
    pub issuance_date: Option<NaiveDate>,
    pub requested_by: Option<String>,
    pub approved_by: Option<String>,
    pub issued_by: Option<String>,
    pub received_by: Option<String>,
    pub remarks: Option<String>,

    #[validate(length(min = 1, message = "At least one item is required"))]
    #[validate(nested)]
    #[serde(default)]
    pub items: Vec<IssuanceLinePayload>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateIssuancePayload {
    #[validate(length(min = 1, message = "from_department cannot be empty."))]
    pub from_department: Option<String>,
    pub issuance_date: Option<NaiveDate>,
    pub requested_by: Option<String>,
    pub approved_by: Option<String>,
    pub issued_by: Option<String>,
    pub received_by: Option<String>,
    pub remarks: Option<String>,

    /// `pending`, `approved`, `issued` ou `rejected`
    #[schema(example = "issued")]
    pub approval_status: Option<String>,

    #[validate(nested)]
    pub items: Option<Vec<IssuanceLinePayload>>,
}

impl UpdateIssuancePayload {
    fn edits_document(&self) -> bool {
        self.items.is_some()
            || self.issuance_date.is_some()
            || [
                &self.from_department,
                &self.requested_by,
                &self.approved_by,
                &self.issued_by,
                &self.received_by,
                &self.remarks,
            ]
            .iter()
            .any(|field| field.is_some())
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct IssuanceListQuery {
    /// `pending`, `approved`, `issued` ou `rejected`
    pub status: Option<String>,
    pub from_department: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

fn parse_status(raw: Option<&str>) -> Result<Option<IssuanceStatus>, AppError> {
    raw.map(str::parse::<IssuanceStatus>).transpose()
}

// ---
// Handler: create_issuance
// ---
#[utoipa::path(
    post,
    path = "/api/stores/issuance",
    tag = "Issuance",
    request_body = CreateIssuancePayload,
    responses(
        (status = 201, description = "Guia criada como pending", body = CreatedIssuance),
        (status = 400, description = "Sem linhas ou quantidades inconsistentes")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_issuance(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermStoresWrite>,
    Json(payload): Json<CreateIssuancePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let header = IssuanceHeader {
        from_department: None,
        issuance_date: payload.issuance_date,
        requested_by: payload.requested_by,
        approved_by: payload.approved_by,
        issued_by: payload.issued_by,
        received_by: payload.received_by,
        remarks: payload.remarks,
    };
    let lines = payload.items.into_iter().map(NewIssuanceLine::from).collect();

    let created = app_state
        .issuance_service
        .create_issuance(&app_state.db_pool, payload.from_department, header, lines)
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

// ---
// Handler: list_issuances
// ---
#[utoipa::path(
    get,
    path = "/api/stores/issuance",
    tag = "Issuance",
    params(IssuanceListQuery),
    responses(
        (status = 200, description = "Guias com item_count e total_value", body = Paginated<IssuanceSummary>),
        (status = 400, description = "Status inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_issuances(
    State(app_state): State<AppState>,
    Query(query): Query<IssuanceListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let status = parse_status(query.status.as_deref())?;
    let from_department = query.from_department.as_deref().filter(|d| !d.is_empty());

    let issuances = app_state
        .issuance_service
        .list_issuances(status, from_department, PageRequest::new(query.page, query.limit))
        .await?;

    Ok((StatusCode::OK, Json(issuances)))
}

// ---
// Handler: get_issuance
// ---
#[utoipa::path(
    get,
    path = "/api/stores/issuance/{id}",
    tag = "Issuance",
    params(("id" = i64, Path, description = "ID da guia")),
    responses(
        (status = 200, description = "Cabeçalho + linhas", body = IssuanceDetail),
        (status = 404, description = "Guia não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_issuance(
    State(app_state): State<AppState>,
    Path(issuance_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let issuance = app_state.issuance_service.get_issuance(issuance_id).await?;
    Ok((StatusCode::OK, Json(issuance)))
}

// ---
// Handler: update_issuance
// ---
#[utoipa::path(
    patch,
    path = "/api/stores/issuance/{id}",
    tag = "Issuance",
    params(("id" = i64, Path, description = "ID da guia")),
    request_body = UpdateIssuancePayload,
    responses(
        (status = 200, description = "Guia atualizada", body = IssuanceDetail),
        (status = 400, description = "Guia já emitida, status ou dados inválidos"),
        (status = 403, description = "Sem permissão"),
        (status = 404, description = "Guia não encontrada"),
        (status = 409, description = "Transição de status não permitida")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_issuance(
    State(app_state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(issuance_id): Path<i64>,
    Json(payload): Json<UpdateIssuancePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let approval_status = parse_status(payload.approval_status.as_deref())?;
    if approval_status.is_some() {
        ensure_permission(&claims, PermStoresApprove::slug())?;
    }
    if payload.edits_document() {
        ensure_permission(&claims, PermStoresWrite::slug())?;
    }

    let update = IssuanceUpdate {
        items: payload
            .items
            .map(|items| items.into_iter().map(NewIssuanceLine::from).collect()),
        header: IssuanceHeader {
            from_department: payload.from_department,
            issuance_date: payload.issuance_date,
            requested_by: payload.requested_by,
            approved_by: payload.approved_by,
            issued_by: payload.issued_by,
            received_by: payload.received_by,
            remarks: payload.remarks,
        },
        approval_status,
    };

    let issuance = app_state
        .issuance_service
        .update_issuance(&app_state.db_pool, issuance_id, update)
        .await?;

    Ok((StatusCode::OK, Json(issuance)))
}

// ---
// Handler: delete_issuance
// ---
#[utoipa::path(
    delete,
    path = "/api/stores/issuance/{id}",
    tag = "Issuance",
    params(("id" = i64, Path, description = "ID da guia")),
    responses(
        (status = 200, description = "Guia removida"),
        (status = 400, description = "Cannot delete issued issuance"),
        (status = 404, description = "Guia não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_issuance(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermStoresWrite>,
    Path(issuance_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    app_state
        .issuance_service
        .delete_issuance(&app_state.db_pool, issuance_id)
        .await?;
    Ok((StatusCode::OK, Json(json!({ "message": "Issuance deleted successfully" }))))
}
