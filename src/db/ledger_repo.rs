// src/db/ledger_repo.rs

use chrono::NaiveDate;
use sqlx::{PgConnection, Postgres, QueryBuilder};

use crate::{
    common::{error::AppError, pagination::PageRequest},
    models::ledger::{IssueLine, LedgerEntry, NewLedgerEntry, ReceiptLine},
};

// Postgres aceita no máximo 65535 binds por comando; 13 colunas por linha
const INSERT_CHUNK_SIZE: usize = 1000;

// Sem pool próprio: toda operação do razão roda numa transação aberta pelo serviço.
#[derive(Clone, Default)]
pub struct LedgerRepository;

impl LedgerRepository {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    //  RECÁLCULO (dentro da transação que trava o item)
    // =========================================================================

    pub async fn delete_for_item(&self, conn: &mut PgConnection, item_id: i64) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM ledger_entries WHERE item_id = $1")
            .bind(item_id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }

    /// Todas as linhas de GRN do item, de qualquer status. Quem filtra é o fold.
    pub async fn receipt_lines_for_item(
        &self,
        conn: &mut PgConnection,
        item_id: i64,
    ) -> Result<Vec<ReceiptLine>, AppError> {
        let lines = sqlx::query_as::<_, ReceiptLine>(
            r#"
            SELECT
                g.id AS grn_id,
                gi.id AS line_id,
                g.approval_status AS grn_status,
                g.created_at,
                gi.quantity_delivered,
                gi.remarks
            FROM grn_items gi
            JOIN grn g ON g.id = gi.grn_id
            WHERE gi.item_id = $1
            "#,
        )
        .bind(item_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(lines)
    }

    pub async fn issue_lines_for_item(
        &self,
        conn: &mut PgConnection,
        item_id: i64,
    ) -> Result<Vec<IssueLine>, AppError> {
        let lines = sqlx::query_as::<_, IssueLine>(
            r#"
            SELECT
                s.id AS issuance_id,
                ii.id AS line_id,
                s.approval_status AS issuance_status,
                s.created_at,
                ii.quantity_issued,
                ii.remarks
            FROM issuance_items ii
            JOIN issuance s ON s.id = ii.issuance_id
            WHERE ii.item_id = $1
            "#,
        )
        .bind(item_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(lines)
    }

    pub async fn insert_entries(&self, conn: &mut PgConnection, entries: &[NewLedgerEntry]) -> Result<(), AppError> {
        for chunk in entries.chunks(INSERT_CHUNK_SIZE) {
            let mut qb = QueryBuilder::<Postgres>::new(
                r#"INSERT INTO ledger_entries (
                    item_id, transaction_date, sequence,
                    grn_id, grn_line_id, issuance_id, issuance_line_id,
                    opening_stock, received_quantity, issued_quantity, closing_balance,
                    transaction_type, remarks
                ) "#,
            );
            qb.push_values(chunk, |mut row, entry| {
                row.push_bind(entry.item_id)
                    .push_bind(entry.transaction_date)
                    .push_bind(entry.sequence)
                    .push_bind(entry.grn_id)
                    .push_bind(entry.grn_line_id)
                    .push_bind(entry.issuance_id)
                    .push_bind(entry.issuance_line_id)
                    .push_bind(entry.opening_stock)
                    .push_bind(entry.received_quantity)
                    .push_bind(entry.issued_quantity)
                    .push_bind(entry.closing_balance)
                    .push_bind(entry.transaction_type)
                    .push_bind(entry.remarks.clone());
            });
            qb.build().execute(&mut *conn).await?;
        }
        Ok(())
    }

    // =========================================================================
    //  CONSULTA
    // =========================================================================

    // Leituras rodam na conexão do chamador, que abre um snapshot só para o relatório.

    /// Lançamentos do item, mais recentes primeiro. Datas inclusivas, no dia UTC.
    pub async fn list_for_item(
        &self,
        conn: &mut PgConnection,
        item_id: i64,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        page: PageRequest,
    ) -> Result<(Vec<LedgerEntry>, i64), AppError> {
        let entries = sqlx::query_as::<_, LedgerEntry>(
            r#"
            SELECT
                le.id, le.item_id, le.transaction_date, le.sequence,
                le.grn_id, g.grn_number,
                le.issuance_id, s.serial_number,
                le.opening_stock, le.received_quantity, le.issued_quantity, le.closing_balance,
                le.transaction_type, le.remarks
            FROM ledger_entries le
            LEFT JOIN grn g ON g.id = le.grn_id
            LEFT JOIN issuance s ON s.id = le.issuance_id
            WHERE le.item_id = $1
              AND ($2::date IS NULL OR (le.transaction_date AT TIME ZONE 'UTC')::date >= $2)
              AND ($3::date IS NULL OR (le.transaction_date AT TIME ZONE 'UTC')::date <= $3)
            ORDER BY le.transaction_date DESC, le.sequence DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(item_id)
        .bind(start_date)
        .bind(end_date)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&mut *conn)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM ledger_entries
            WHERE item_id = $1
              AND ($2::date IS NULL OR (transaction_date AT TIME ZONE 'UTC')::date >= $2)
              AND ($3::date IS NULL OR (transaction_date AT TIME ZONE 'UTC')::date <= $3)
            "#,
        )
        .bind(item_id)
        .bind(start_date)
        .bind(end_date)
        .fetch_one(&mut *conn)
        .await?;

        Ok((entries, total))
    }

    /// Abertura do primeiro lançamento (sequence = 1). Sem histórico, zero.
    pub async fn first_opening_stock(&self, conn: &mut PgConnection, item_id: i64) -> Result<i64, AppError> {
        let opening = sqlx::query_scalar::<_, i64>(
            "SELECT opening_stock FROM ledger_entries WHERE item_id = $1 ORDER BY sequence ASC LIMIT 1",
        )
        .bind(item_id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(opening.unwrap_or(0))
    }
}
