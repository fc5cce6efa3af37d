// src/db/item_repo.rs

use sqlx::{Executor, PgConnection, PgPool, Postgres, QueryBuilder};

use crate::{
    common::{db_utils::is_unique_violation, error::AppError, pagination::PageRequest},
    models::item::{Item, ItemFilter, NewItem},
};

#[derive(Clone)]
pub struct ItemRepository {
    pool: PgPool,
}

// Busca literal: `%`, `_` e `\` digitados pelo usuário não viram curinga
fn contains_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

// WHERE compartilhado entre a listagem, a contagem e o resumo do razão
fn push_item_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, filter: &ItemFilter) {
    qb.push(" WHERE TRUE");
    if let Some(category) = &filter.category {
        qb.push(" AND category = ").push_bind(category.clone());
    }
    if let Some(search) = &filter.search {
        let pattern = contains_pattern(search);
        qb.push(" AND (code ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if filter.low_stock_only {
        // Mesmo critério do avaliador: baixo = saldo <= mínimo
        qb.push(" AND current_stock <= minimum_stock_level");
    }
}

impl ItemRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Funções de "Leitura"
    // ---
    // Funções de leitura são simples e podem usar a pool principal.

    pub async fn find_by_id(&self, item_id: i64) -> Result<Option<Item>, AppError> {
        self.find_by_id_with(&self.pool, item_id).await
    }

    /// Mesma leitura, mas no executor do chamador (ex.: o snapshot do razão).
    pub async fn find_by_id_with<'e, E>(&self, executor: E, item_id: i64) -> Result<Option<Item>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1")
            .bind(item_id)
            .fetch_optional(executor)
            .await?;
        Ok(item)
    }

    pub async fn list_items(
        &self,
        filter: &ItemFilter,
        page: PageRequest,
    ) -> Result<(Vec<Item>, i64), AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM items");
        push_item_filters(&mut qb, filter);
        qb.push(" ORDER BY code ASC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let items = qb.build_query_as::<Item>().fetch_all(&self.pool).await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM items");
        push_item_filters(&mut count, filter);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        Ok((items, total))
    }

    /// Todos os itens do filtro, sem paginação (as estatísticas do resumo cobrem o conjunto inteiro).
    pub async fn list_all_matching(&self, filter: &ItemFilter) -> Result<Vec<Item>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM items");
        push_item_filters(&mut qb, filter);
        qb.push(" ORDER BY code ASC");
        let items = qb.build_query_as::<Item>().fetch_all(&self.pool).await?;
        Ok(items)
    }

    pub async fn all_ids(&self) -> Result<Vec<i64>, AppError> {
        let ids = sqlx::query_scalar::<_, i64>("SELECT id FROM items ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    // ---
    // Funções de "Escrita" (Transacionais)
    // ---

    /// Cria um item de catálogo com saldo zero.
    pub async fn create_item<'e, E>(&self, executor: E, item: &NewItem) -> Result<Item, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO items (
                code, description, unit_of_issue, category, subcategory,
                minimum_stock_level, maximum_stock_level, unit_cost, supplier
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(&item.code)
        .bind(&item.description)
        .bind(&item.unit_of_issue)
        .bind(&item.category)
        .bind(&item.subcategory)
        .bind(item.minimum_stock_level)
        .bind(item.maximum_stock_level)
        .bind(item.unit_cost)
        .bind(&item.supplier)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return AppError::DuplicateCode(item.code.clone());
            }
            e.into()
        })
    }

    /// Trava a linha do item até o fim da transação.
    /// É isso que serializa dois recálculos do mesmo item.
    pub async fn lock_item(&self, conn: &mut PgConnection, item_id: i64) -> Result<Option<Item>, AppError> {
        let item = sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1 FOR UPDATE")
            .bind(item_id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(item)
    }

    /// Único caminho que escreve `current_stock`: chamado só pelo recálculo.
    pub(crate) async fn store_current_stock(
        &self,
        conn: &mut PgConnection,
        item_id: i64,
        current_stock: i64,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE items SET current_stock = $2, updated_at = NOW() WHERE id = $1")
            .bind(item_id)
            .bind(current_stock)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_wildcards_are_escaped() {
        assert_eq!(contains_pattern("pen"), "%pen%");
        assert_eq!(contains_pattern("100%_cotton"), "%100\\%\\_cotton%");
        assert_eq!(contains_pattern("A\\B"), "%A\\\\B%");
    }

    #[test]
    fn search_filter_covers_code_and_description() {
        let filter = ItemFilter {
            category: None,
            search: Some("50%".into()),
            low_stock_only: false,
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM items");
        push_item_filters(&mut qb, &filter);
        assert!(qb.sql().contains("code ILIKE $1 OR description ILIKE $2"));
    }
}
