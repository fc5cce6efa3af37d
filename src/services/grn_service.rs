// src/services/grn_service.rs

use std::time::Duration;

use chrono::Utc;
use sqlx::{Acquire, Connection, PgConnection, Postgres};

use crate::{
    common::{
        db_utils::begin_stores_tx,
        error::AppError,
        pagination::{PageRequest, Paginated},
    },
    db::GrnRepository,
    models::grn::{CreatedGrn, Grn, GrnDetail, GrnHeader, GrnStatus, GrnSummary, GrnUpdate, NewGrnLine},
    services::{
        ledger_service::LedgerService,
        reference::{generate_reference, GRN_PREFIX, MAX_REFERENCE_ATTEMPTS},
    },
};

#[derive(Clone)]
pub struct GrnService {
    grn_repo: GrnRepository,
    ledger: LedgerService,
    statement_timeout: Duration,
}

impl GrnService {
    pub fn new(grn_repo: GrnRepository, ledger: LedgerService, statement_timeout: Duration) -> Self {
        Self {
            grn_repo,
            ledger,
            statement_timeout,
        }
    }

    // --- CREATE GRN ---
    pub async fn create_grn<'c, A>(
        &self,
        db: A,
        header: GrnHeader,
        lines: Vec<NewGrnLine>,
    ) -> Result<CreatedGrn, AppError>
    where
        A: Acquire<'c, Database = Postgres>,
    {
        if lines.is_empty() {
            return Err(AppError::InvalidInput("At least one item is required".into()));
        }

        let mut tx = begin_stores_tx(db, self.statement_timeout).await?;

        let grn = self.insert_with_unique_number(&mut *tx, &header).await?;
        self.grn_repo.insert_lines(&mut *tx, grn.id, &lines).await?;

        tx.commit().await?;

        tracing::info!(grn_id = grn.id, grn_number = %grn.grn_number, lines = lines.len(), "GRN criado");
        Ok(CreatedGrn {
            id: grn.id,
            grn_number: grn.grn_number,
        })
    }

    // Cada tentativa roda num savepoint: a colisão desfaz só o INSERT
    // e a transação externa continua válida.
    async fn insert_with_unique_number(&self, conn: &mut PgConnection, header: &GrnHeader) -> Result<Grn, AppError> {
        for attempt in 1..=MAX_REFERENCE_ATTEMPTS {
            let grn_number = generate_reference(GRN_PREFIX, Utc::now(), &mut rand::thread_rng());

            let mut savepoint = Connection::begin(&mut *conn).await?;
            match self.grn_repo.insert(&mut *savepoint, &grn_number, header).await? {
                Some(grn) => {
                    savepoint.commit().await?;
                    return Ok(grn);
                }
                None => {
                    savepoint.rollback().await?;
                    tracing::warn!(attempt, %grn_number, "Número de GRN já existe, sorteando outro");
                }
            }
        }

        Err(anyhow::anyhow!(
            "could not allocate a unique GRN number after {} attempts",
            MAX_REFERENCE_ATTEMPTS
        )
        .into())
    }

    // --- UPDATE GRN ---
    /// Cabeçalho, linhas e status numa transação só. Ao entrar em `approved`,
    /// o razão de cada item das linhas é recalculado antes do commit.
    pub async fn update_grn<'c, A>(&self, db: A, grn_id: i64, update: GrnUpdate) -> Result<GrnDetail, AppError>
    where
        A: Acquire<'c, Database = Postgres>,
    {
        // `items: []` não apaga as linhas: é erro, como na criação
        if update.items.as_ref().is_some_and(Vec::is_empty) {
            return Err(AppError::InvalidInput("At least one item is required".into()));
        }

        let mut tx = begin_stores_tx(db, self.statement_timeout).await?;

        let current = self
            .grn_repo
            .lock(&mut *tx, grn_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("GRN {}", grn_id)))?;

        if current.approval_status == GrnStatus::Approved {
            return Err(AppError::Conflict("Cannot modify approved GRN".into()));
        }

        if let Some(lines) = update.items.as_deref() {
            self.grn_repo.delete_lines(&mut *tx, grn_id).await?;
            self.grn_repo.insert_lines(&mut *tx, grn_id, lines).await?;
        }

        self.grn_repo.update_header(&mut *tx, grn_id, &update.header).await?;

        if let Some(next) = update.approval_status {
            // Repetir o status atual não é transição
            if next != current.approval_status {
                if !current.approval_status.can_transition_to(next) {
                    return Err(AppError::InvalidTransition {
                        from: current.approval_status.to_string(),
                        to: next.to_string(),
                    });
                }

                self.grn_repo.set_status(&mut *tx, grn_id, next).await?;
                tracing::info!(grn_id, from = %current.approval_status, to = %next, "Status do GRN alterado");

                if next.affects_stock() {
                    let item_ids = self.grn_repo.item_ids(&mut *tx, grn_id).await?;
                    self.ledger.recompute_items(&mut *tx, &item_ids).await?;
                }
            }
        }

        tx.commit().await?;

        self.get_grn(grn_id).await
    }

    // --- DELETE GRN ---
    pub async fn delete_grn<'c, A>(&self, db: A, grn_id: i64) -> Result<(), AppError>
    where
        A: Acquire<'c, Database = Postgres>,
    {
        let mut tx = begin_stores_tx(db, self.statement_timeout).await?;

        let grn = self
            .grn_repo
            .lock(&mut *tx, grn_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("GRN {}", grn_id)))?;

        if grn.approval_status == GrnStatus::Approved {
            return Err(AppError::Conflict("Cannot delete approved GRN".into()));
        }

        self.grn_repo.delete(&mut *tx, grn_id).await?;
        tx.commit().await?;

        tracing::info!(grn_id, grn_number = %grn.grn_number, "GRN removido");
        Ok(())
    }

    // --- READ ---
    pub async fn get_grn(&self, grn_id: i64) -> Result<GrnDetail, AppError> {
        self.grn_repo
            .find_detail(grn_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("GRN {}", grn_id)))
    }

    pub async fn list_grns(
        &self,
        status: Option<GrnStatus>,
        page: PageRequest,
    ) -> Result<Paginated<GrnSummary>, AppError> {
        let (data, total) = self.grn_repo.list(status, page).await?;
        Ok(Paginated {
            data,
            pagination: page.meta(total),
        })
    }
}
