// src/services/issuance_service.rs

use std::time::Duration;

use chrono::Utc;
use sqlx::{Acquire, Connection, PgConnection, Postgres};

use crate::{
    common::{
        db_utils::begin_stores_tx,
        error::AppError,
        pagination::{PageRequest, Paginated},
    },
    db::IssuanceRepository,
    models::issuance::{
        CreatedIssuance, Issuance, IssuanceDetail, IssuanceHeader, IssuanceStatus, IssuanceSummary, IssuanceUpdate,
        NewIssuanceLine,
    },
    services::{
        ledger_service::LedgerService,
        reference::{generate_reference, ISSUANCE_PREFIX, MAX_REFERENCE_ATTEMPTS},
    },
};

/// Quantidades de cada linha: emitido <= aprovado <= pedido.
pub fn validate_issuance_lines(lines: &[NewIssuanceLine]) -> Result<(), AppError> {
    for (index, line) in lines.iter().enumerate() {
        if line.quantity_approved > line.quantity_ordered {
            return Err(AppError::InvalidInput(format!(
                "items[{}]: quantity_approved ({}) exceeds quantity_ordered ({})",
                index, line.quantity_approved, line.quantity_ordered
            )));
        }
        if line.quantity_issued > line.quantity_approved {
            return Err(AppError::InvalidInput(format!(
                "items[{}]: quantity_issued ({}) exceeds quantity_approved ({})",
                index, line.quantity_issued, line.quantity_approved
            )));
        }
    }
    Ok(())
}

#[derive(Clone)]
pub struct IssuanceService {
    issuance_repo: IssuanceRepository,
    ledger: LedgerService,
    statement_timeout: Duration,
}

impl IssuanceService {
    pub fn new(issuance_repo: IssuanceRepository, ledger: LedgerService, statement_timeout: Duration) -> Self {
        Self {
            issuance_repo,
            ledger,
            statement_timeout,
        }
    }

    // --- CREATE ISSUANCE ---
    pub async fn create_issuance<'c, A>(
        &self,
        db: A,
        from_department: String,
        header: IssuanceHeader,
        lines: Vec<NewIssuanceLine>,
    ) -> Result<CreatedIssuance, AppError>
    where
        A: Acquire<'c, Database = Postgres>,
    {
        if lines.is_empty() {
            return Err(AppError::InvalidInput("At least one item is required".into()));
        }
        validate_issuance_lines(&lines)?;

        let mut tx = begin_stores_tx(db, self.statement_timeout).await?;

        let issuance = self
            .insert_with_unique_serial(&mut *tx, &from_department, &header)
            .await?;
        self.issuance_repo.insert_lines(&mut *tx, issuance.id, &lines).await?;

        tx.commit().await?;

        tracing::info!(
            issuance_id = issuance.id,
            serial_number = %issuance.serial_number,
            from_department = %issuance.from_department,
            lines = lines.len(),
            "Guia de saída criada"
        );
        Ok(CreatedIssuance {
            id: issuance.id,
            serial_number: issuance.serial_number,
        })
    }

    async fn insert_with_unique_serial(
        &self,
        conn: &mut PgConnection,
        from_department: &str,
        header: &IssuanceHeader,
    ) -> Result<Issuance, AppError> {
        for attempt in 1..=MAX_REFERENCE_ATTEMPTS {
            let serial_number = generate_reference(ISSUANCE_PREFIX, Utc::now(), &mut rand::thread_rng());

            let mut savepoint = Connection::begin(&mut *conn).await?;
            match self
                .issuance_repo
                .insert(&mut *savepoint, &serial_number, from_department, header)
                .await?
            {
                Some(issuance) => {
                    savepoint.commit().await?;
                    return Ok(issuance);
                }
                None => {
                    savepoint.rollback().await?;
                    tracing::warn!(attempt, %serial_number, "Número de série já existe, sorteando outro");
                }
            }
        }

        Err(anyhow::anyhow!(
            "could not allocate a unique issuance serial number after {} attempts",
            MAX_REFERENCE_ATTEMPTS
        )
        .into())
    }

    // --- UPDATE ISSUANCE ---
    pub async fn update_issuance<'c, A>(
        &self,
        db: A,
        issuance_id: i64,
        update: IssuanceUpdate,
    ) -> Result<IssuanceDetail, AppError>
    where
        A: Acquire<'c, Database = Postgres>,
    {
        let replacement = update.items.as_deref();
        if let Some(lines) = replacement {
            if lines.is_empty() {
                return Err(AppError::InvalidInput("At least one item is required".into()));
            }
            validate_issuance_lines(lines)?;
        }

        let mut tx = begin_stores_tx(db, self.statement_timeout).await?;

        let current = self
            .issuance_repo
            .lock(&mut *tx, issuance_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Issuance {}", issuance_id)))?;

        if current.approval_status == IssuanceStatus::Issued {
            return Err(AppError::Conflict("Cannot modify issued issuance".into()));
        }

        if let Some(lines) = replacement {
            self.issuance_repo.delete_lines(&mut *tx, issuance_id).await?;
            self.issuance_repo.insert_lines(&mut *tx, issuance_id, lines).await?;
        }

        self.issuance_repo
            .update_header(&mut *tx, issuance_id, &update.header)
            .await?;

        if let Some(next) = update.approval_status {
            if next != current.approval_status {
                if !current.approval_status.can_transition_to(next) {
                    return Err(AppError::InvalidTransition {
                        from: current.approval_status.to_string(),
                        to: next.to_string(),
                    });
                }

                self.issuance_repo.set_status(&mut *tx, issuance_id, next).await?;
                tracing::info!(
                    issuance_id,
                    from = %current.approval_status,
                    to = %next,
                    "Status da guia de saída alterado"
                );

                if next.affects_stock() {
                    let item_ids = self.issuance_repo.item_ids(&mut *tx, issuance_id).await?;
                    self.ledger.recompute_items(&mut *tx, &item_ids).await?;
                }
            }
        }

        tx.commit().await?;

        self.get_issuance(issuance_id).await
    }

    // --- DELETE ISSUANCE ---
    pub async fn delete_issuance<'c, A>(&self, db: A, issuance_id: i64) -> Result<(), AppError>
    where
        A: Acquire<'c, Database = Postgres>,
    {
        let mut tx = begin_stores_tx(db, self.statement_timeout).await?;

        let issuance = self
            .issuance_repo
            .lock(&mut *tx, issuance_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Issuance {}", issuance_id)))?;

        if issuance.approval_status == IssuanceStatus::Issued {
            return Err(AppError::Conflict("Cannot delete issued issuance".into()));
        }

        self.issuance_repo.delete(&mut *tx, issuance_id).await?;
        tx.commit().await?;

        tracing::info!(issuance_id, serial_number = %issuance.serial_number, "Guia de saída removida");
        Ok(())
    }

    // --- READ ---
    pub async fn get_issuance(&self, issuance_id: i64) -> Result<IssuanceDetail, AppError> {
        self.issuance_repo
            .find_detail(issuance_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Issuance {}", issuance_id)))
    }

    pub async fn list_issuances(
        &self,
        status: Option<IssuanceStatus>,
        from_department: Option<&str>,
        page: PageRequest,
    ) -> Result<Paginated<IssuanceSummary>, AppError> {
        let (data, total) = self.issuance_repo.list(status, from_department, page).await?;
        Ok(Paginated {
            data,
            pagination: page.meta(total),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(ordered: i32, approved: i32, issued: i32) -> NewIssuanceLine {
        NewIssuanceLine {
            item_id: 1,
            quantity_ordered: ordered,
            quantity_approved: approved,
            quantity_issued: issued,
            remarks: None,
        }
    }

    #[test]
    fn accepts_issue_up_to_the_approved_quantity() {
        assert!(validate_issuance_lines(&[line(20, 20, 20), line(10, 5, 0)]).is_ok());
    }

    #[test]
    fn rejects_approval_above_order() {
        let err = validate_issuance_lines(&[line(10, 12, 0)]).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(msg) if msg.starts_with("items[0]: quantity_approved")));
    }

    #[test]
    fn rejects_issue_above_approval_and_points_at_the_line() {
        let err = validate_issuance_lines(&[line(10, 10, 10), line(10, 8, 9)]).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(msg) if msg.starts_with("items[1]: quantity_issued")));
    }
}
