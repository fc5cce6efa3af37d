// src/db/grn_repo.rs

use sqlx::{Executor, PgConnection, PgPool, Postgres, QueryBuilder};

use crate::{
    common::{
        db_utils::{is_foreign_key_violation, is_unique_violation},
        error::AppError,
        pagination::PageRequest,
    },
    models::grn::{Grn, GrnDetail, GrnHeader, GrnLineDetail, GrnStatus, GrnSummary, NewGrnLine},
};

#[derive(Clone)]
pub struct GrnRepository {
    pool: PgPool,
}

impl GrnRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    pub async fn find_by_id(&self, grn_id: i64) -> Result<Option<Grn>, AppError> {
        let grn = sqlx::query_as::<_, Grn>("SELECT * FROM grn WHERE id = $1")
            .bind(grn_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(grn)
    }

    pub async fn find_detail(&self, grn_id: i64) -> Result<Option<GrnDetail>, AppError> {
        let Some(header) = self.find_by_id(grn_id).await? else {
            return Ok(None);
        };
        let items = self.list_lines(&self.pool, grn_id).await?;
        Ok(Some(GrnDetail { header, items }))
    }

    pub async fn list_lines<'e, E>(&self, executor: E, grn_id: i64) -> Result<Vec<GrnLineDetail>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lines = sqlx::query_as::<_, GrnLineDetail>(
            r#"
            SELECT
                gi.id, gi.item_id,
                i.code AS item_code,
                i.description AS item_description,
                i.unit_of_issue,
                gi.quantity_ordered, gi.quantity_delivered, gi.unit_cost, gi.remarks
            FROM grn_items gi
            JOIN items i ON i.id = gi.item_id
            WHERE gi.grn_id = $1
            ORDER BY gi.id ASC
            "#,
        )
        .bind(grn_id)
        .fetch_all(executor)
        .await?;
        Ok(lines)
    }

    /// Listagem com `item_count` e `total_value` calculados na hora (não persistidos).
    pub async fn list(
        &self,
        status: Option<GrnStatus>,
        page: PageRequest,
    ) -> Result<(Vec<GrnSummary>, i64), AppError> {
        let rows = sqlx::query_as::<_, GrnSummary>(
            r#"
            SELECT
                g.*,
                COUNT(gi.id) AS item_count,
                COALESCE(SUM(gi.quantity_delivered * gi.unit_cost), 0) AS total_value
            FROM grn g
            LEFT JOIN grn_items gi ON gi.grn_id = g.id
            WHERE ($1::grn_status IS NULL OR g.approval_status = $1)
            GROUP BY g.id
            ORDER BY g.created_at DESC, g.id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM grn WHERE ($1::grn_status IS NULL OR approval_status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok((rows, total))
    }

    // =========================================================================
    //  ESCRITA (sempre dentro de uma transação)
    // =========================================================================

    /// Insere o cabeçalho. `Ok(None)` quando o número sorteado já existe:
    /// o chamador tenta outro (dentro de um savepoint).
    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        grn_number: &str,
        header: &GrnHeader,
    ) -> Result<Option<Grn>, AppError> {
        let result = sqlx::query_as::<_, Grn>(
            r#"
            INSERT INTO grn (
                grn_number, procurement_reference, lpo_number, delivery_note_number,
                tax_invoice_number, receiving_officer, issuing_officer, approving_officer, remarks
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(grn_number)
        .bind(&header.procurement_reference)
        .bind(&header.lpo_number)
        .bind(&header.delivery_note_number)
        .bind(&header.tax_invoice_number)
        .bind(&header.receiving_officer)
        .bind(&header.issuing_officer)
        .bind(&header.approving_officer)
        .bind(&header.remarks)
        .fetch_one(&mut *conn)
        .await;

        match result {
            Ok(grn) => Ok(Some(grn)),
            Err(e) if is_unique_violation(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn insert_lines(
        &self,
        conn: &mut PgConnection,
        grn_id: i64,
        lines: &[NewGrnLine],
    ) -> Result<(), AppError> {
        if lines.is_empty() {
            return Ok(());
        }

        let mut qb = QueryBuilder::<Postgres>::new(
            "INSERT INTO grn_items (grn_id, item_id, quantity_ordered, quantity_delivered, unit_cost, remarks) ",
        );
        qb.push_values(lines, |mut row, line| {
            row.push_bind(grn_id)
                .push_bind(line.item_id)
                .push_bind(line.quantity_ordered)
                .push_bind(line.quantity_delivered)
                .push_bind(line.unit_cost)
                .push_bind(line.remarks.clone());
        });

        qb.build().execute(&mut *conn).await.map_err(|e| {
            if is_foreign_key_violation(&e) {
                return AppError::InvalidInput("One or more line items reference an unknown item".into());
            }
            e.into()
        })?;
        Ok(())
    }

    /// Trava o GRN para a atualização (status + linhas + recálculo).
    pub async fn lock(&self, conn: &mut PgConnection, grn_id: i64) -> Result<Option<Grn>, AppError> {
        let grn = sqlx::query_as::<_, Grn>("SELECT * FROM grn WHERE id = $1 FOR UPDATE")
            .bind(grn_id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(grn)
    }

    pub async fn update_header(
        &self,
        conn: &mut PgConnection,
        grn_id: i64,
        patch: &GrnHeader,
    ) -> Result<(), AppError> {
        // COALESCE: campo ausente no PATCH mantém o valor atual
        sqlx::query(
            r#"
            UPDATE grn SET
                procurement_reference = COALESCE($2, procurement_reference),
                lpo_number            = COALESCE($3, lpo_number),
                delivery_note_number  = COALESCE($4, delivery_note_number),
                tax_invoice_number    = COALESCE($5, tax_invoice_number),
                receiving_officer     = COALESCE($6, receiving_officer),
                issuing_officer       = COALESCE($7, issuing_officer),
                approving_officer     = COALESCE($8, approving_officer),
                remarks               = COALESCE($9, remarks),
                updated_at            = NOW()
            WHERE id = $1
            "#,
        )
        .bind(grn_id)
        .bind(&patch.procurement_reference)
        .bind(&patch.lpo_number)
        .bind(&patch.delivery_note_number)
        .bind(&patch.tax_invoice_number)
        .bind(&patch.receiving_officer)
        .bind(&patch.issuing_officer)
        .bind(&patch.approving_officer)
        .bind(&patch.remarks)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn set_status(&self, conn: &mut PgConnection, grn_id: i64, status: GrnStatus) -> Result<(), AppError> {
        sqlx::query("UPDATE grn SET approval_status = $2, updated_at = NOW() WHERE id = $1")
            .bind(grn_id)
            .bind(status)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    pub async fn delete_lines(&self, conn: &mut PgConnection, grn_id: i64) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM grn_items WHERE grn_id = $1")
            .bind(grn_id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(&self, conn: &mut PgConnection, grn_id: i64) -> Result<(), AppError> {
        // grn_items cai junto (ON DELETE CASCADE)
        sqlx::query("DELETE FROM grn WHERE id = $1")
            .bind(grn_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Itens distintos tocados pelo GRN, em ordem crescente (ordem de travamento).
    pub async fn item_ids(&self, conn: &mut PgConnection, grn_id: i64) -> Result<Vec<i64>, AppError> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT DISTINCT item_id FROM grn_items WHERE grn_id = $1 ORDER BY item_id ASC",
        )
        .bind(grn_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(ids)
    }
}
