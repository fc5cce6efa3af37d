// src/db/issuance_repo.rs

use sqlx::{Executor, PgConnection, PgPool, Postgres, QueryBuilder};

use crate::{
    common::{
        db_utils::{is_foreign_key_violation, is_unique_violation},
        error::AppError,
        pagination::PageRequest,
    },
    models::issuance::{
        Issuance, IssuanceDetail, IssuanceHeader, IssuanceLineDetail, IssuanceStatus, IssuanceSummary,
        NewIssuanceLine,
    },
};

#[derive(Clone)]
pub struct IssuanceRepository {
    pool: PgPool,
}

impl IssuanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    pub async fn find_by_id(&self, issuance_id: i64) -> Result<Option<Issuance>, AppError> {
        let issuance = sqlx::query_as::<_, Issuance>("SELECT * FROM issuance WHERE id = $1")
            .bind(issuance_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(issuance)
    }

    pub async fn find_detail(&self, issuance_id: i64) -> Result<Option<IssuanceDetail>, AppError> {
        let Some(header) = self.find_by_id(issuance_id).await? else {
            return Ok(None);
        };
        let items = self.list_lines(&self.pool, issuance_id).await?;
        Ok(Some(IssuanceDetail { header, items }))
    }

    pub async fn list_lines<'e, E>(&self, executor: E, issuance_id: i64) -> Result<Vec<IssuanceLineDetail>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lines = sqlx::query_as::<_, IssuanceLineDetail>(
            r#"
            SELECT
                ii.id, ii.item_id,
                i.code AS item_code,
                i.description AS item_description,
                i.unit_of_issue,
                ii.quantity_ordered, ii.quantity_approved, ii.quantity_issued, ii.remarks
            FROM issuance_items ii
            JOIN items i ON i.id = ii.item_id
            WHERE ii.issuance_id = $1
            ORDER BY ii.id ASC
            "#,
        )
        .bind(issuance_id)
        .fetch_all(executor)
        .await?;
        Ok(lines)
    }

    pub async fn list(
        &self,
        status: Option<IssuanceStatus>,
        from_department: Option<&str>,
        page: PageRequest,
    ) -> Result<(Vec<IssuanceSummary>, i64), AppError> {
        let rows = sqlx::query_as::<_, IssuanceSummary>(
            r#"
            SELECT
                s.*,
                COUNT(ii.id) AS item_count,
                COALESCE(SUM(ii.quantity_issued * it.unit_cost), 0) AS total_value
            FROM issuance s
            LEFT JOIN issuance_items ii ON ii.issuance_id = s.id
            LEFT JOIN items it ON it.id = ii.item_id
            WHERE ($1::issuance_status IS NULL OR s.approval_status = $1)
              AND ($2::text IS NULL OR s.from_department = $2)
            GROUP BY s.id
            ORDER BY s.created_at DESC, s.id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(status)
        .bind(from_department)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM issuance
            WHERE ($1::issuance_status IS NULL OR approval_status = $1)
              AND ($2::text IS NULL OR from_department = $2)
            "#,
        )
        .bind(status)
        .bind(from_department)
        .fetch_one(&self.pool)
        .await?;

        Ok((rows, total))
    }

    // =========================================================================
    //  ESCRITA
    // =========================================================================

    /// `Ok(None)` quando o número de série sorteado já existe.
    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        serial_number: &str,
        from_department: &str,
        header: &IssuanceHeader,
    ) -> Result<Option<Issuance>, AppError> {
        let result = sqlx::query_as::<_, Issuance>(
            r#"
            INSERT INTO issuance (
                serial_number, from_department, issuance_date,
                requested_by, approved_by, issued_by, received_by, remarks
            )
            VALUES ($1, $2, COALESCE($3, CURRENT_DATE), $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(serial_number)
        .bind(from_department)
        .bind(header.issuance_date)
        .bind(&header.requested_by)
        .bind(&header.approved_by)
        .bind(&header.issued_by)
        .bind(&header.received_by)
        .bind(&header.remarks)
        .fetch_one(&mut *conn)
        .await;

        match result {
            Ok(issuance) => Ok(Some(issuance)),
            Err(e) if is_unique_violation(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn insert_lines(
        &self,
        conn: &mut PgConnection,
        issuance_id: i64,
        lines: &[NewIssuanceLine],
    ) -> Result<(), AppError> {
        if lines.is_empty() {
            return Ok(());
        }

        let mut qb = QueryBuilder::<Postgres>::new(
            "INSERT INTO issuance_items (issuance_id, item_id, quantity_ordered, quantity_approved, quantity_issued, remarks) ",
        );
        qb.push_values(lines, |mut row, line| {
            row.push_bind(issuance_id)
                .push_bind(line.item_id)
                .push_bind(line.quantity_ordered)
                .push_bind(line.quantity_approved)
                .push_bind(line.quantity_issued)
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

    pub async fn lock(&self, conn: &mut PgConnection, issuance_id: i64) -> Result<Option<Issuance>, AppError> {
        let issuance = sqlx::query_as::<_, Issuance>("SELECT * FROM issuance WHERE id = $1 FOR UPDATE")
            .bind(issuance_id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(issuance)
    }

    pub async fn update_header(
        &self,
        conn: &mut PgConnection,
        issuance_id: i64,
        patch: &IssuanceHeader,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE issuance SET
                from_department = COALESCE($2, from_department),
                issuance_date   = COALESCE($3, issuance_date),
                requested_by    = COALESCE($4, requested_by),
                approved_by     = COALESCE($5, approved_by),
                issued_by       = COALESCE($6, issued_by),
                received_by     = COALESCE($7, received_by),
                remarks         = COALESCE($8, remarks),
                updated_at      = NOW()
            WHERE id = $1
            "#,
        )
        .bind(issuance_id)
        .bind(&patch.from_department)
        .bind(patch.issuance_date)
        .bind(&patch.requested_by)
        .bind(&patch.approved_by)
        .bind(&patch.issued_by)
        .bind(&patch.received_by)
        .bind(&patch.remarks)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn set_status(
        &self,
        conn: &mut PgConnection,
        issuance_id: i64,
        status: IssuanceStatus,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE issuance SET approval_status = $2, updated_at = NOW() WHERE id = $1")
            .bind(issuance_id)
            .bind(status)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    pub async fn delete_lines(&self, conn: &mut PgConnection, issuance_id: i64) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM issuance_items WHERE issuance_id = $1")
            .bind(issuance_id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(&self, conn: &mut PgConnection, issuance_id: i64) -> Result<(), AppError> {
        sqlx::query("DELETE FROM issuance WHERE id = $1")
            .bind(issuance_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    pub async fn item_ids(&self, conn: &mut PgConnection, issuance_id: i64) -> Result<Vec<i64>, AppError> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT DISTINCT item_id FROM issuance_items WHERE issuance_id = $1 ORDER BY item_id ASC",
        )
        .bind(issuance_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(ids)
    }
}
