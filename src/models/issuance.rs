// src/models/issuance.rs

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::common::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "issuance_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum IssuanceStatus {
    Pending,
    Approved,
    Issued,
    Rejected,
}

impl IssuanceStatus {
    /// Só `issued` representa saída física do estoque.
    pub fn affects_stock(self) -> bool {
        self == IssuanceStatus::Issued
    }

    /// pending -> approved -> issued, com rejeição possível antes de `issued`.
    /// Cada passo é único: não existe pending -> issued direto.
    pub fn can_transition_to(self, next: IssuanceStatus) -> bool {
        use IssuanceStatus::*;
        matches!(
            (self, next),
            (Pending, Approved) | (Approved, Issued) | (Pending, Rejected) | (Approved, Rejected)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IssuanceStatus::Pending => "pending",
            IssuanceStatus::Approved => "approved",
            IssuanceStatus::Issued => "issued",
            IssuanceStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for IssuanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssuanceStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(IssuanceStatus::Pending),
            "approved" => Ok(IssuanceStatus::Approved),
            "issued" => Ok(IssuanceStatus::Issued),
            "rejected" => Ok(IssuanceStatus::Rejected),
            other => Err(AppError::InvalidStatus(other.to_string())),
        }
    }
}

// --- Guia de saída / requisição (tabela `issuance`) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Issuance {
    pub id: i64,
    #[schema(example = "ISS-202610-0937")]
    pub serial_number: String,
    #[schema(example = "Logistics")]
    pub from_department: String,
    pub issuance_date: NaiveDate,
    pub requested_by: Option<String>,
    pub approved_by: Option<String>,
    pub issued_by: Option<String>,
    pub received_by: Option<String>,
    pub remarks: Option<String>,
    pub approval_status: IssuanceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// No PATCH, `None` mantém o valor atual.
#[derive(Debug, Clone, Default)]
pub struct IssuanceHeader {
    pub from_department: Option<String>,
    pub issuance_date: Option<NaiveDate>,
    pub requested_by: Option<String>,
    pub approved_by: Option<String>,
    pub issued_by: Option<String>,
    pub received_by: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewIssuanceLine {
    pub item_id: i64,
    pub quantity_ordered: i32,
    pub quantity_approved: i32,
    pub quantity_issued: i32,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct IssuanceUpdate {
    pub header: IssuanceHeader,
    pub approval_status: Option<IssuanceStatus>,
    pub items: Option<Vec<NewIssuanceLine>>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct IssuanceLineDetail {
    pub id: i64,
    pub item_id: i64,
    pub item_code: String,
    pub item_description: String,
    pub unit_of_issue: String,
    pub quantity_ordered: i32,
    pub quantity_approved: i32,
    pub quantity_issued: i32,
    pub remarks: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IssuanceDetail {
    #[serde(flatten)]
    pub header: Issuance,
    pub items: Vec<IssuanceLineDetail>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct IssuanceSummary {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub header: Issuance,
    pub item_count: i64,
    /// Σ(quantity_issued × custo unitário do item)
    pub total_value: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedIssuance {
    pub id: i64,
    pub serial_number: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use IssuanceStatus::*;

    #[test]
    fn each_step_is_one_way() {
        assert!(Pending.can_transition_to(Approved));
        assert!(Approved.can_transition_to(Issued));
        assert!(!Pending.can_transition_to(Issued));
        assert!(!Approved.can_transition_to(Pending));
        assert!(!Issued.can_transition_to(Approved));
    }

    #[test]
    fn rejection_only_before_issue() {
        assert!(Pending.can_transition_to(Rejected));
        assert!(Approved.can_transition_to(Rejected));
        assert!(!Issued.can_transition_to(Rejected));
        assert!(!Rejected.can_transition_to(Approved));
        assert!([Pending, Approved, Issued].iter().all(|s| !Rejected.can_transition_to(*s)));
    }

    #[test]
    fn only_issued_affects_stock() {
        assert!(Issued.affects_stock());
        assert!([Pending, Approved, Rejected].iter().all(|s| !s.affects_stock()));
    }
}
