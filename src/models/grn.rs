// src/models/grn.rs

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::common::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "grn_status", rename_all = "lowercase")] // Banco
#[serde(rename_all = "lowercase")] // JSON
pub enum GrnStatus {
    Pending,
    Approved,
    Rejected,
}

impl GrnStatus {
    /// Só `approved` movimenta o estoque.
    pub fn affects_stock(self) -> bool {
        self == GrnStatus::Approved
    }

    /// pending -> approved | rejected. Os dois destinos são terminais.
    pub fn can_transition_to(self, next: GrnStatus) -> bool {
        matches!(
            (self, next),
            (GrnStatus::Pending, GrnStatus::Approved) | (GrnStatus::Pending, GrnStatus::Rejected)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GrnStatus::Pending => "pending",
            GrnStatus::Approved => "approved",
            GrnStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for GrnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GrnStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(GrnStatus::Pending),
            "approved" => Ok(GrnStatus::Approved),
            "rejected" => Ok(GrnStatus::Rejected),
            other => Err(AppError::InvalidStatus(other.to_string())),
        }
    }
}

// --- Cabeçalho do GRN (tabela `grn`) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Grn {
    pub id: i64,
    #[schema(example = "GRN-202610-4821")]
    pub grn_number: String,
    pub procurement_reference: Option<String>,
    pub lpo_number: Option<String>,
    pub delivery_note_number: Option<String>,
    pub tax_invoice_number: Option<String>,
    pub receiving_officer: Option<String>,
    pub issuing_officer: Option<String>,
    pub approving_officer: Option<String>,
    pub remarks: Option<String>,
    pub approval_status: GrnStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Campos editáveis do cabeçalho. No PATCH, `None` mantém o valor atual.
#[derive(Debug, Clone, Default)]
pub struct GrnHeader {
    pub procurement_reference: Option<String>,
    pub lpo_number: Option<String>,
    pub delivery_note_number: Option<String>,
    pub tax_invoice_number: Option<String>,
    pub receiving_officer: Option<String>,
    pub issuing_officer: Option<String>,
    pub approving_officer: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewGrnLine {
    pub item_id: i64,
    pub quantity_ordered: i32,
    pub quantity_delivered: i32,
    pub unit_cost: Decimal,
    pub remarks: Option<String>,
}

// PATCH /grn/{id}: cabeçalho parcial, transição opcional, troca opcional das linhas
#[derive(Debug, Clone, Default)]
pub struct GrnUpdate {
    pub header: GrnHeader,
    pub approval_status: Option<GrnStatus>,
    pub items: Option<Vec<NewGrnLine>>,
}

// Linha com os dados do item (JOIN com `items`)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct GrnLineDetail {
    pub id: i64,
    pub item_id: i64,
    pub item_code: String,
    pub item_description: String,
    pub unit_of_issue: String,
    pub quantity_ordered: i32,
    pub quantity_delivered: i32,
    pub unit_cost: Decimal,
    pub remarks: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GrnDetail {
    #[serde(flatten)]
    pub header: Grn,
    pub items: Vec<GrnLineDetail>,
}

// Linha da listagem: agregados calculados na consulta, não persistidos
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct GrnSummary {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub header: Grn,
    pub item_count: i64,
    pub total_value: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedGrn {
    pub id: i64,
    pub grn_number: String,
}
