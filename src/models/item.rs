// src/models/item.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

// --- Item do catálogo ---
// `current_stock` é só o cache do saldo do razão.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Item {
    #[schema(example = 12)]
    pub id: i64,
    #[schema(example = "STN-0042")]
    pub code: String,
    #[schema(example = "A4 printing paper, 80gsm")]
    pub description: String,
    #[schema(example = "ream")]
    pub unit_of_issue: String,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub minimum_stock_level: i32,
    pub maximum_stock_level: i32,
    #[schema(example = "4.50")]
    pub unit_cost: Decimal,
    pub supplier: Option<String>,
    pub current_stock: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Dados já validados para inserir no catálogo
#[derive(Debug, Clone)]
pub struct NewItem {
    pub code: String,
    pub description: String,
    pub unit_of_issue: String,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub minimum_stock_level: i32,
    pub maximum_stock_level: i32,
    pub unit_cost: Decimal,
    pub supplier: Option<String>,
}

// Filtros de catálogo / resumo do razão
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub category: Option<String>,
    // Busca em código + descrição (ILIKE)
    pub search: Option<String>,
    pub low_stock_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    Low,
    Normal,
    High,
}
