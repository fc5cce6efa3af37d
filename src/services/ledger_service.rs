// src/services/ledger_service.rs

use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Acquire, PgConnection, PgPool, Postgres};

use crate::{
    common::{db_utils::begin_stores_tx, error::AppError, pagination::PageRequest},
    db::{ItemRepository, LedgerRepository},
    models::{
        item::{Item, ItemFilter, StockStatus},
        ledger::{LedgerReport, LedgerStatistics, LedgerSummary, LedgerSummaryRow, RebuildReport, RecomputeOutcome},
    },
    services::{
        ledger_fold::{chain_is_consistent, plan_ledger},
        stock_policy,
    },
};

#[derive(Clone)]
pub struct LedgerService {
    item_repo: ItemRepository,
    ledger_repo: LedgerRepository,
    statement_timeout: Duration,
}

impl LedgerService {
    pub fn new(item_repo: ItemRepository, ledger_repo: LedgerRepository, statement_timeout: Duration) -> Self {
        Self {
            item_repo,
            ledger_repo,
            statement_timeout,
        }
    }

    // =========================================================================
    //  RECÁLCULO
    // =========================================================================

    /// Reconstrói o razão de um item dentro da transação do chamador.
    ///
    /// A trava na linha do item vem antes de tudo; dois recálculos do mesmo
    /// item esperam um pelo outro, itens diferentes não se bloqueiam.
    pub async fn recompute_in_tx(&self, conn: &mut PgConnection, item_id: i64) -> Result<RecomputeOutcome, AppError> {
        self.item_repo
            .lock_item(&mut *conn, item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item {}", item_id)))?;

        self.ledger_repo.delete_for_item(&mut *conn, item_id).await?;

        let receipts = self.ledger_repo.receipt_lines_for_item(&mut *conn, item_id).await?;
        let issues = self.ledger_repo.issue_lines_for_item(&mut *conn, item_id).await?;

        let plan = plan_ledger(item_id, &receipts, &issues);
        debug_assert!(chain_is_consistent(&plan.entries));

        let min_balance = plan.min_balance();
        if min_balance < 0 {
            tracing::warn!(item_id, min_balance, "Saldo do razão ficou negativo durante o recálculo");
        }

        self.ledger_repo.insert_entries(&mut *conn, &plan.entries).await?;
        self.item_repo
            .store_current_stock(&mut *conn, item_id, plan.closing_balance)
            .await?;

        tracing::info!(
            item_id,
            current_stock = plan.closing_balance,
            transactions = plan.entries.len(),
            "Razão recalculado"
        );

        Ok(RecomputeOutcome {
            current_stock: plan.closing_balance,
            transactions_processed: plan.entries.len(),
        })
    }

    /// Recalcula vários itens na mesma transação, sempre em ordem crescente
    /// de id (a ordem de travamento evita deadlock entre documentos).
    pub async fn recompute_items(&self, conn: &mut PgConnection, item_ids: &[i64]) -> Result<usize, AppError> {
        let mut ids = item_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mut transactions = 0;
        for item_id in ids {
            transactions += self.recompute_in_tx(&mut *conn, item_id).await?.transactions_processed;
        }
        Ok(transactions)
    }

    pub async fn recalculate_item<'c, A>(&self, db: A, item_id: i64) -> Result<RecomputeOutcome, AppError>
    where
        A: Acquire<'c, Database = Postgres>,
    {
        let mut tx = begin_stores_tx(db, self.statement_timeout).await?;
        let outcome = self.recompute_in_tx(&mut *tx, item_id).await?;
        tx.commit().await?;
        Ok(outcome)
    }

    /// Reconstrói todos os itens, uma transação por item.
    /// Um erro interrompe a varredura; os itens já commitados ficam.
    pub async fn recalculate_all(&self, pool: &PgPool) -> Result<RebuildReport, AppError> {
        let ids = self.item_repo.all_ids().await?;
        let mut report = RebuildReport::default();

        for item_id in ids {
            let outcome = self.recalculate_item(pool, item_id).await?;
            report.items_processed += 1;
            report.transactions_processed += outcome.transactions_processed;
        }

        tracing::info!(
            items = report.items_processed,
            transactions = report.transactions_processed,
            "Reconstrução completa do razão concluída"
        );
        Ok(report)
    }

    // =========================================================================
    //  CONSULTAS
    // =========================================================================

    /// Item, página, contagem e abertura saem do mesmo snapshot: um recálculo
    /// commitado no meio da consulta não aparece pela metade.
    pub async fn get_ledger<'c, A>(
        &self,
        db: A,
        item_id: i64,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        page: PageRequest,
    ) -> Result<LedgerReport, AppError>
    where
        A: Acquire<'c, Database = Postgres>,
    {
        if let (Some(start), Some(end)) = (start_date, end_date) {
            if start > end {
                return Err(AppError::InvalidInput("startDate must not be after endDate".into()));
            }
        }

        let mut tx = db.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let item = self
            .item_repo
            .find_by_id_with(&mut *tx, item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item {}", item_id)))?;

        let (ledger_entries, total) = self
            .ledger_repo
            .list_for_item(&mut *tx, item_id, start_date, end_date, page)
            .await?;
        let opening_stock = self.ledger_repo.first_opening_stock(&mut *tx, item_id).await?;

        tx.commit().await?;

        Ok(LedgerReport {
            current_stock: item.current_stock,
            item,
            ledger_entries,
            opening_stock,
            pagination: page.meta(total),
        })
    }

    /// Resumo por item. As estatísticas cobrem o conjunto filtrado inteiro,
    /// a lista de itens é só a página pedida.
    pub async fn get_summary(&self, filter: &ItemFilter, page: PageRequest) -> Result<LedgerSummary, AppError> {
        let items = self.item_repo.list_all_matching(filter).await?;
        let statistics = summarize(&items);
        let pagination = page.meta(items.len() as i64);

        let rows = items
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .map(summary_row)
            .collect();

        Ok(LedgerSummary {
            items: rows,
            statistics,
            pagination,
        })
    }
}

fn stock_value(item: &Item) -> Decimal {
    Decimal::from(item.current_stock) * item.unit_cost
}

fn summary_row(item: Item) -> LedgerSummaryRow {
    LedgerSummaryRow {
        stock_status: stock_policy::evaluate(item.current_stock, item.minimum_stock_level, item.maximum_stock_level),
        total_value: stock_value(&item),
        item,
    }
}

pub fn summarize(items: &[Item]) -> LedgerStatistics {
    items.iter().fold(LedgerStatistics::default(), |mut stats, item| {
        stats.total_items += 1;
        match stock_policy::evaluate(item.current_stock, item.minimum_stock_level, item.maximum_stock_level) {
            StockStatus::Low => stats.low_stock_items += 1,
            StockStatus::High => stats.high_stock_items += 1,
            StockStatus::Normal => {}
        }
        stats.total_value += stock_value(item);
        stats
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn item(code: &str, current_stock: i64, min: i32, max: i32, unit_cost: Decimal) -> Item {
        Item {
            id: 1,
            code: code.into(),
            description: format!("{} description", code),
            unit_of_issue: "piece".into(),
            category: Some("Stationery".into()),
            subcategory: None,
            minimum_stock_level: min,
            maximum_stock_level: max,
            unit_cost,
            supplier: None,
            current_stock,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn statistics_count_by_status_and_value_stock() {
        let items = vec![
            item("A", 30, 10, 40, dec("2.50")),
            item("B", 10, 10, 40, dec("1.00")),
            item("C", 40, 10, 40, dec("0.25")),
            item("D", -5, 0, 10, dec("3.00")),
        ];

        let stats = summarize(&items);
        assert_eq!(stats.total_items, 4);
        assert_eq!(stats.low_stock_items, 2);
        assert_eq!(stats.high_stock_items, 1);
        // 75 + 10 + 10 - 15
        assert_eq!(stats.total_value, dec("80.00"));
    }

    #[test]
    fn empty_catalog_has_zeroed_statistics() {
        assert_eq!(summarize(&[]), LedgerStatistics::default());
    }

    #[test]
    fn summary_row_carries_policy_status() {
        let row = summary_row(item("A", 12, 5, 10, dec("4.00")));
        assert_eq!(row.stock_status, StockStatus::High);
        assert_eq!(row.total_value, dec("48.00"));
    }
}
