// src/handlers/items.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::{
    common::{
        error::AppError,
        pagination::{PageRequest, Paginated},
    },
    config::AppState,
    middleware::rbac::{PermStoresWrite, RequirePermission},
    models::item::{Item, ItemFilter, NewItem},
};

// ---
// Validação Customizada
// ---
pub(crate) fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("Value cannot be negative.".into());
        return Err(err);
    }
    Ok(())
}

fn validate_thresholds(payload: &CreateItemPayload) -> Result<(), ValidationError> {
    if payload.minimum_stock_level > payload.maximum_stock_level {
        let mut err = ValidationError::new("thresholds");
        err.message = Some("minimum_stock_level cannot exceed maximum_stock_level.".into());
        return Err(err);
    }
    Ok(())
}

// ---
// Payload: CreateItem
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_thresholds"))]
pub struct CreateItemPayload {
    #[validate(length(min = 1, message = "Item code is required."))]
    #[schema(example = "STN-0042")]
    pub code: String,

    #[validate(length(min = 1, message = "Description is required."))]
    pub description: String,

    #[validate(length(min = 1, message = "Unit of issue is required."))]
    #[schema(example = "ream")]
    pub unit_of_issue: String,

    pub category: Option<String>,
    pub subcategory: Option<String>,

    #[validate(range(min = 0, message = "Minimum stock level cannot be negative."))]
    #[serde(default)]
    pub minimum_stock_level: i32,

    #[validate(range(min = 0, message = "Maximum stock level cannot be negative."))]
    #[serde(default)]
    pub maximum_stock_level: i32,

    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)] // Se o JSON não tiver esse campo, assume 0
    pub unit_cost: Decimal,

    pub supplier: Option<String>,
}

impl CreateItemPayload {
    fn into_new_item(self) -> NewItem {
        NewItem {
            code: self.code.trim().to_string(),
            description: self.description,
            unit_of_issue: self.unit_of_issue,
            category: self.category,
            subcategory: self.subcategory,
            minimum_stock_level: self.minimum_stock_level,
            maximum_stock_level: self.maximum_stock_level,
            unit_cost: self.unit_cost,
            supplier: self.supplier,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ItemListQuery {
    pub category: Option<String>,
    /// Busca em código e descrição (sem diferenciar maiúsculas)
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

// ---
// Handler: create_item
// ---
#[utoipa::path(
    post,
    path = "/api/stores/items",
    tag = "Items",
    request_body = CreateItemPayload,
    responses(
        (status = 201, description = "Item criado", body = Item),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "Código já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_item(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermStoresWrite>,
    Json(payload): Json<CreateItemPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let item = app_state
        .catalog_service
        .create_item(&app_state.db_pool, payload.into_new_item())
        .await?;

    Ok((StatusCode::CREATED, Json(item)))
}

// ---
// Handler: list_items
// ---
#[utoipa::path(
    get,
    path = "/api/stores/items",
    tag = "Items",
    params(ItemListQuery),
    responses(
        (status = 200, description = "Catálogo paginado", body = Paginated<Item>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_items(
    State(app_state): State<AppState>,
    Query(query): Query<ItemListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = ItemFilter {
        category: query.category,
        search: query.search.filter(|s| !s.trim().is_empty()),
        low_stock_only: false,
    };

    let items = app_state
        .catalog_service
        .list_items(&filter, PageRequest::new(query.page, query.limit))
        .await?;

    Ok((StatusCode::OK, Json(items)))
}

// ---
// Handler: get_item
// ---
#[utoipa::path(
    get,
    path = "/api/stores/items/{id}",
    tag = "Items",
    params(("id" = i64, Path, description = "ID do item")),
    responses(
        (status = 200, description = "Item", body = Item),
        (status = 404, description = "Item não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_item(
    State(app_state): State<AppState>,
    Path(item_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let item = app_state.catalog_service.get_item(item_id).await?;
    Ok((StatusCode::OK, Json(item)))
}
