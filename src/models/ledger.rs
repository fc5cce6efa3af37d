// src/models/ledger.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::{
    common::pagination::Pagination,
    models::{
        grn::GrnStatus,
        issuance::IssuanceStatus,
        item::{Item, StockStatus},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "ledger_transaction_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    // A ordem das variantes é o desempate: entrada antes de saída no mesmo instante
    Receipt,
    Issue,
}

// --- Candidatos ao razão (linhas de documento + status do documento) ---

#[derive(Debug, Clone, FromRow)]
pub struct ReceiptLine {
    pub grn_id: i64,
    pub line_id: i64,
    pub grn_status: GrnStatus,
    pub created_at: DateTime<Utc>,
    pub quantity_delivered: i32,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct IssueLine {
    pub issuance_id: i64,
    pub line_id: i64,
    pub issuance_status: IssuanceStatus,
    pub created_at: DateTime<Utc>,
    pub quantity_issued: i32,
    pub remarks: Option<String>,
}

/// Lançamento gerado pelo recálculo, ainda não persistido.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLedgerEntry {
    pub item_id: i64,
    pub transaction_date: DateTime<Utc>,
    pub sequence: i32,
    pub grn_id: Option<i64>,
    pub grn_line_id: Option<i64>,
    pub issuance_id: Option<i64>,
    pub issuance_line_id: Option<i64>,
    pub opening_stock: i64,
    pub received_quantity: i64,
    pub issued_quantity: i64,
    pub closing_balance: i64,
    pub transaction_type: TransactionType,
    pub remarks: Option<String>,
}

// Lançamento persistido, com a referência legível do documento de origem
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct LedgerEntry {
    pub id: i64,
    pub item_id: i64,
    pub transaction_date: DateTime<Utc>,
    pub sequence: i32,
    pub grn_id: Option<i64>,
    pub grn_number: Option<String>,
    pub issuance_id: Option<i64>,
    pub serial_number: Option<String>,
    pub opening_stock: i64,
    pub received_quantity: i64,
    pub issued_quantity: i64,
    pub closing_balance: i64,
    pub transaction_type: TransactionType,
    pub remarks: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LedgerReport {
    pub item: Item,
    pub ledger_entries: Vec<LedgerEntry>,
    /// Saldo de abertura do primeiro lançamento do histórico completo (sem filtro de data)
    pub opening_stock: i64,
    pub current_stock: i64,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LedgerSummaryRow {
    #[serde(flatten)]
    pub item: Item,
    pub stock_status: StockStatus,
    pub total_value: Decimal,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, ToSchema)]
pub struct LedgerStatistics {
    pub total_items: i64,
    pub low_stock_items: i64,
    pub high_stock_items: i64,
    pub total_value: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LedgerSummary {
    pub items: Vec<LedgerSummaryRow>,
    pub statistics: LedgerStatistics,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecomputeOutcome {
    pub current_stock: i64,
    pub transactions_processed: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RebuildReport {
    pub items_processed: usize,
    pub transactions_processed: usize,
}
