// src/handlers/grn.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    common::{error::AppError, pagination::{PageRequest, Paginated}},
    config::AppState,
    handlers::items::validate_not_negative,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{ensure_permission, PermStoresApprove, PermStoresWrite, PermissionDef, RequirePermission},
    },
    models::grn::{CreatedGrn, GrnDetail, GrnHeader, GrnStatus, GrnSummary, GrnUpdate, NewGrnLine},
};

// ---
// Payloads
// ---
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct GrnLinePayload {
    pub item_id: i64,

    #[validate(range(min = 0, message = "quantity_ordered cannot be negative."))]
    #[serde(default)]
    pub quantity_ordered: i32,

    #[validate(range(min = 0, message = "quantity_delivered cannot be negative."))]
    pub quantity_delivered: i32,

    #[validate(custom(function = "validate_not_negative"))]
    #[schema(example = "4.50")]
    pub unit_cost: Decimal,

    pub remarks: Option<String>,
}

impl From<GrnLinePayload> for NewGrnLine {
    fn from(p: GrnLinePayload) -> Self {
        NewGrnLine {
            item_id: p.item_id,
            quantity_ordered: p.quantity_ordered,
            quantity_delivered: p.quantity_delivered,
            unit_cost: p.unit_cost,
            remarks: p.remarks,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateGrnPayload {
    pub procurement_reference: Option<String>,
    pub lpo_number: Option<String>,
    pub delivery_note_number: Option<String>,
    pub tax_invoice_number: Option<String>,
    pub receiving_officer: Option<String>,
    pub issuing_officer: Option<String>,
    pub approving_officer: Option<String>,
    pub remarks: Option<String>,

    #[validate(length(min = 1, message = "At least one item is required"))]
    #[validate(nested)]
    #[serde(default)]
    pub items: Vec<GrnLinePayload>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateGrnPayload {
    pub procurement_reference: Option<String>,
    pub lpo_number: Option<String>,
    pub delivery_note_number: Option<String>,
    pub tax_invoice_number: Option<String>,
    pub receiving_officer: Option<String>,
    pub issuing_officer: Option<String>,
    pub approving_officer: Option<String>,
    pub remarks: Option<String>,

    /// `pending`, `approved` ou `rejected`
    #[schema(example = "approved")]
    pub approval_status: Option<String>,

    /// Substitui todas as linhas do GRN
    #[validate(nested)]
    pub items: Option<Vec<GrnLinePayload>>,
}

impl UpdateGrnPayload {
    // Alguma coisa além do status muda o documento?
    fn edits_document(&self) -> bool {
        self.items.is_some()
            || [
                &self.procurement_reference,
                &self.lpo_number,
                &self.delivery_note_number,
                &self.tax_invoice_number,
                &self.receiving_officer,
                &self.issuing_officer,
                &self.approving_officer,
                &self.remarks,
            ]
            .iter()
            .any(|field| field.is_some())
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GrnListQuery {
    /// `pending`, `approved` ou `rejected`
    pub status: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

fn parse_status(raw: Option<&str>) -> Result<Option<GrnStatus>, AppError> {
    raw.map(str::parse::<GrnStatus>).transpose()
}

// ---
// Handler: create_grn
// ---
#[utoipa::path(
    post,
    path = "/api/stores/grn",
    tag = "GRN",
    request_body = CreateGrnPayload,
    responses(
        (status = 201, description = "GRN criado como pending", body = CreatedGrn),
        (status = 400, description = "Sem linhas ou dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_grn(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermStoresWrite>,
    Json(payload): Json<CreateGrnPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let header = GrnHeader {
        procurement_reference: payload.procurement_reference,
        lpo_number: payload.lpo_number,
        delivery_note_number: payload.delivery_note_number,
        tax_invoice_number: payload.tax_invoice_number,
        receiving_officer: payload.receiving_officer,
        issuing_officer: payload.issuing_officer,
        approving_officer: payload.approving_officer,
        remarks: payload.remarks,
    };
    let lines = payload.items.into_iter().map(NewGrnLine::from).collect();

    let created = app_state
        .grn_service
        .create_grn(&app_state.db_pool, header, lines)
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

// ---
// Handler: list_grns
// ---
#[utoipa::path(
    get,
    path = "/api/stores/grn",
    tag = "GRN",
    params(GrnListQuery),
    responses(
        (status = 200, description = "GRNs com item_count e total_value", body = Paginated<GrnSummary>),
        (status = 400, description = "Status inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_grns(
    State(app_state): State<AppState>,
    Query(query): Query<GrnListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let status = parse_status(query.status.as_deref())?;

    let grns = app_state
        .grn_service
        .list_grns(status, PageRequest::new(query.page, query.limit))
        .await?;

    Ok((StatusCode::OK, Json(grns)))
}

// ---
// Handler: get_grn
// ---
#[utoipa::path(
    get,
    path = "/api/stores/grn/{id}",
    tag = "GRN",
    params(("id" = i64, Path, description = "ID do GRN")),
    responses(
        (status = 200, description = "Cabeçalho + linhas", body = GrnDetail),
        (status = 404, description = "GRN não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_grn(
    State(app_state): State<AppState>,
    Path(grn_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let grn = app_state.grn_service.get_grn(grn_id).await?;
    Ok((StatusCode::OK, Json(grn)))
}

// ---
// Handler: update_grn
// ---
// A permissão depende do corpo: status exige `stores:approve`, edição exige `stores:write`.
#[utoipa::path(
    patch,
    path = "/api/stores/grn/{id}",
    tag = "GRN",
    params(("id" = i64, Path, description = "ID do GRN")),
    request_body = UpdateGrnPayload,
    responses(
        (status = 200, description = "GRN atualizado", body = GrnDetail),
        (status = 400, description = "GRN aprovado, status ou dados inválidos"),
        (status = 403, description = "Sem permissão"),
        (status = 404, description = "GRN não encontrado"),
        (status = 409, description = "Transição de status não permitida")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_grn(
    State(app_state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(grn_id): Path<i64>,
    Json(payload): Json<UpdateGrnPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let approval_status = parse_status(payload.approval_status.as_deref())?;
    if approval_status.is_some() {
        ensure_permission(&claims, PermStoresApprove::slug())?;
    }
    if payload.edits_document() {
        ensure_permission(&claims, PermStoresWrite::slug())?;
    }

    let update = GrnUpdate {
        items: payload
            .items
            .map(|items| items.into_iter().map(NewGrnLine::from).collect()),
        header: GrnHeader {
            procurement_reference: payload.procurement_reference,
            lpo_number: payload.lpo_number,
            delivery_note_number: payload.delivery_note_number,
            tax_invoice_number: payload.tax_invoice_number,
            receiving_officer: payload.receiving_officer,
            issuing_officer: payload.issuing_officer,
            approving_officer: payload.approving_officer,
            remarks: payload.remarks,
        },
        approval_status,
    };

    let grn = app_state
        .grn_service
        .update_grn(&app_state.db_pool, grn_id, update)
        .await?;

    Ok((StatusCode::OK, Json(grn)))
}

// ---
// Handler: delete_grn
// ---
#[utoipa::path(
    delete,
    path = "/api/stores/grn/{id}",
    tag = "GRN",
    params(("id" = i64, Path, description = "ID do GRN")),
    responses(
        (status = 200, description = "GRN removido"),
        (status = 400, description = "Cannot delete approved GRN"),
        (status = 404, description = "GRN não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_grn(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermStoresWrite>,
    Path(grn_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    app_state.grn_service.delete_grn(&app_state.db_pool, grn_id).await?;
    Ok((StatusCode::OK, Json(json!({ "message": "GRN deleted successfully" }))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_only_patch_is_not_a_document_edit() {
        let payload = UpdateGrnPayload {
            approval_status: Some("approved".into()),
            ..Default::default()
        };
        assert!(!payload.edits_document());

        let payload = UpdateGrnPayload {
            remarks: Some("Short delivery on line 2".into()),
            ..Default::default()
        };
        assert!(payload.edits_document());
    }

    #[test]
    fn empty_item_list_fails_validation() {
        let payload: CreateGrnPayload = serde_json::from_value(json!({ "lpo_number": "LPO-7" })).unwrap();
        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("items"));
    }

    #[test]
    fn delivery_with_lines_passes_validation() {
        let payload: CreateGrnPayload = serde_json::from_value(json!({
            "lpo_number": "LPO-2025-118",
            "items": [
                { "item_id": 1, "quantity_ordered": 60, "quantity_delivered": 50, "unit_cost": 2.5 },
                { "item_id": 2, "quantity_delivered": 0, "unit_cost": 0 }
            ]
        }))
        .unwrap();
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn negative_line_quantity_is_reported_per_line() {
        let payload: CreateGrnPayload = serde_json::from_value(json!({
            "items": [{ "item_id": 1, "quantity_delivered": -3, "unit_cost": 1 }]
        }))
        .unwrap();
        let errors = payload.validate().unwrap_err();
        assert!(errors.to_string().contains("quantity_delivered cannot be negative."));
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(matches!(parse_status(Some("closed")), Err(AppError::InvalidStatus(s)) if s == "closed"));
        assert_eq!(parse_status(None).unwrap(), None);
    }
}
