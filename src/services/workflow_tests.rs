// src/services/workflow_tests.rs
//
// Fluxo completo contra um Postgres de verdade: cada teste recebe um banco
// novo do `#[sqlx::test]`, já com as migrações aplicadas.
// Rodar com: DATABASE_URL=postgres://... cargo test -- --ignored

use std::time::Duration;

use chrono::{Days, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::{
    common::{error::AppError, pagination::PageRequest},
    config::{AppState, Config},
    models::{
        grn::{GrnHeader, GrnStatus, GrnUpdate, NewGrnLine},
        issuance::{IssuanceHeader, IssuanceStatus, IssuanceUpdate, NewIssuanceLine},
        item::{Item, NewItem},
        ledger::{LedgerReport, TransactionType},
    },
};

fn state(pool: PgPool) -> AppState {
    let config = Config {
        database_url: String::new(),
        jwt_secret: "workflow-secret".into(),
        bind_addr: "127.0.0.1:0".into(),
        db_max_connections: 2,
        db_acquire_timeout: Duration::from_secs(5),
        statement_timeout: Duration::from_secs(5),
    };
    AppState::with_pool(pool, config)
}

async fn new_item(app: &AppState, code: &str) -> Item {
    app.catalog_service
        .create_item(
            &app.db_pool,
            NewItem {
                code: code.into(),
                description: format!("{} for delegate packs", code),
                unit_of_issue: "piece".into(),
                category: Some("Stationery".into()),
                subcategory: None,
                minimum_stock_level: 10,
                maximum_stock_level: 200,
                unit_cost: Decimal::new(250, 2),
                supplier: None,
            },
        )
        .await
        .unwrap()
}

async fn new_grn(app: &AppState, item_id: i64, delivered: i32) -> i64 {
    let line = NewGrnLine {
        item_id,
        quantity_ordered: delivered,
        quantity_delivered: delivered,
        unit_cost: Decimal::new(250, 2),
        remarks: None,
    };
    app.grn_service
        .create_grn(&app.db_pool, GrnHeader::default(), vec![line])
        .await
        .unwrap()
        .id
}

async fn set_grn_status(app: &AppState, grn_id: i64, status: GrnStatus) -> Result<(), AppError> {
    let update = GrnUpdate {
        approval_status: Some(status),
        ..Default::default()
    };
    app.grn_service.update_grn(&app.db_pool, grn_id, update).await.map(|_| ())
}

async fn new_issuance(app: &AppState, item_id: i64, quantity: i32) -> i64 {
    let line = NewIssuanceLine {
        item_id,
        quantity_ordered: quantity,
        quantity_approved: quantity,
        quantity_issued: quantity,
        remarks: None,
    };
    app.issuance_service
        .create_issuance(&app.db_pool, "Protocol".into(), IssuanceHeader::default(), vec![line])
        .await
        .unwrap()
        .id
}

async fn set_issuance_status(app: &AppState, issuance_id: i64, status: IssuanceStatus) -> Result<(), AppError> {
    let update = IssuanceUpdate {
        approval_status: Some(status),
        ..Default::default()
    };
    app.issuance_service
        .update_issuance(&app.db_pool, issuance_id, update)
        .await
        .map(|_| ())
}

async fn ledger(app: &AppState, item_id: i64) -> LedgerReport {
    app.ledger_service
        .get_ledger(&app.db_pool, item_id, None, None, PageRequest::new(None, Some(100)))
        .await
        .unwrap()
}

// (sequence, abertura, entrada, saída, fechamento, grn, guia)
fn projection(report: &LedgerReport) -> Vec<(i32, i64, i64, i64, i64, Option<i64>, Option<i64>)> {
    report
        .ledger_entries
        .iter()
        .map(|e| {
            (
                e.sequence,
                e.opening_stock,
                e.received_quantity,
                e.issued_quantity,
                e.closing_balance,
                e.grn_id,
                e.issuance_id,
            )
        })
        .collect()
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at a Postgres server"]
async fn approving_a_delivery_posts_it_to_the_ledger(pool: PgPool) {
    let app = state(pool);
    let pens = new_item(&app, "PEN-BLUE").await;
    let grn_id = new_grn(&app, pens.id, 50).await;

    let before = ledger(&app, pens.id).await;
    assert!(before.ledger_entries.is_empty());
    assert_eq!(before.current_stock, 0);

    set_grn_status(&app, grn_id, GrnStatus::Approved).await.unwrap();

    let after = ledger(&app, pens.id).await;
    assert_eq!(after.current_stock, 50);
    assert_eq!(after.opening_stock, 0);
    assert_eq!(projection(&after), vec![(1, 0, 50, 0, 50, Some(grn_id), None)]);
    assert_eq!(after.ledger_entries[0].transaction_type, TransactionType::Receipt);
    assert!(after.ledger_entries[0].grn_number.is_some());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at a Postgres server"]
async fn issuing_after_a_delivery_leaves_the_difference(pool: PgPool) {
    let app = state(pool);
    let pens = new_item(&app, "PEN-BLUE").await;
    let grn_id = new_grn(&app, pens.id, 50).await;
    set_grn_status(&app, grn_id, GrnStatus::Approved).await.unwrap();

    let issuance_id = new_issuance(&app, pens.id, 20).await;
    set_issuance_status(&app, issuance_id, IssuanceStatus::Approved).await.unwrap();
    assert_eq!(ledger(&app, pens.id).await.current_stock, 50);

    set_issuance_status(&app, issuance_id, IssuanceStatus::Issued).await.unwrap();

    let report = ledger(&app, pens.id).await;
    assert_eq!(report.current_stock, 30);
    // Mais recente primeiro
    assert_eq!(
        projection(&report),
        vec![
            (2, 50, 0, 20, 30, None, Some(issuance_id)),
            (1, 0, 50, 0, 50, Some(grn_id), None),
        ]
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at a Postgres server"]
async fn pending_and_rejected_documents_do_not_move_stock(pool: PgPool) {
    let app = state(pool);
    let pens = new_item(&app, "PEN-BLUE").await;

    let approved = new_grn(&app, pens.id, 50).await;
    set_grn_status(&app, approved, GrnStatus::Approved).await.unwrap();
    new_grn(&app, pens.id, 100).await;
    let rejected = new_grn(&app, pens.id, 70).await;
    set_grn_status(&app, rejected, GrnStatus::Rejected).await.unwrap();

    let voucher = new_issuance(&app, pens.id, 5).await;
    set_issuance_status(&app, voucher, IssuanceStatus::Approved).await.unwrap();

    app.ledger_service.recalculate_item(&app.db_pool, pens.id).await.unwrap();

    let report = ledger(&app, pens.id).await;
    assert_eq!(report.current_stock, 50);
    assert_eq!(projection(&report), vec![(1, 0, 50, 0, 50, Some(approved), None)]);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at a Postgres server"]
async fn approved_delivery_cannot_be_deleted_or_edited(pool: PgPool) {
    let app = state(pool);
    let pens = new_item(&app, "PEN-BLUE").await;
    let grn_id = new_grn(&app, pens.id, 50).await;
    set_grn_status(&app, grn_id, GrnStatus::Approved).await.unwrap();
    let before = projection(&ledger(&app, pens.id).await);

    let err = app.grn_service.delete_grn(&app.db_pool, grn_id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(msg) if msg == "Cannot delete approved GRN"));

    let edit = GrnUpdate {
        header: GrnHeader {
            remarks: Some("Recount".into()),
            ..Default::default()
        },
        ..Default::default()
    };
    let err = app.grn_service.update_grn(&app.db_pool, grn_id, edit).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(msg) if msg == "Cannot modify approved GRN"));

    let grn = app.grn_service.get_grn(grn_id).await.unwrap();
    assert_eq!(grn.header.approval_status, GrnStatus::Approved);
    assert_eq!(grn.header.remarks, None);
    assert_eq!(grn.items.len(), 1);

    let after = ledger(&app, pens.id).await;
    assert_eq!(projection(&after), before);
    assert_eq!(after.current_stock, 50);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at a Postgres server"]
async fn issued_voucher_cannot_be_deleted_or_edited(pool: PgPool) {
    let app = state(pool);
    let pens = new_item(&app, "PEN-BLUE").await;
    let grn_id = new_grn(&app, pens.id, 50).await;
    set_grn_status(&app, grn_id, GrnStatus::Approved).await.unwrap();
    let voucher = new_issuance(&app, pens.id, 20).await;
    set_issuance_status(&app, voucher, IssuanceStatus::Approved).await.unwrap();
    set_issuance_status(&app, voucher, IssuanceStatus::Issued).await.unwrap();
    let before = projection(&ledger(&app, pens.id).await);

    let err = app.issuance_service.delete_issuance(&app.db_pool, voucher).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(msg) if msg == "Cannot delete issued issuance"));

    let err = set_issuance_status(&app, voucher, IssuanceStatus::Rejected).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(msg) if msg == "Cannot modify issued issuance"));

    let detail = app.issuance_service.get_issuance(voucher).await.unwrap();
    assert_eq!(detail.header.approval_status, IssuanceStatus::Issued);

    let after = ledger(&app, pens.id).await;
    assert_eq!(projection(&after), before);
    assert_eq!(after.current_stock, 30);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at a Postgres server"]
async fn skipping_approval_rolls_the_whole_update_back(pool: PgPool) {
    let app = state(pool);
    let pens = new_item(&app, "PEN-BLUE").await;
    let voucher = new_issuance(&app, pens.id, 5).await;

    let update = IssuanceUpdate {
        header: IssuanceHeader {
            remarks: Some("Rush order".into()),
            ..Default::default()
        },
        approval_status: Some(IssuanceStatus::Issued),
        ..Default::default()
    };
    let err = app
        .issuance_service
        .update_issuance(&app.db_pool, voucher, update)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }));

    let detail = app.issuance_service.get_issuance(voucher).await.unwrap();
    assert_eq!(detail.header.approval_status, IssuanceStatus::Pending);
    assert_eq!(detail.header.remarks, None);
    assert_eq!(ledger(&app, pens.id).await.current_stock, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at a Postgres server"]
async fn recalculating_twice_rebuilds_the_same_ledger(pool: PgPool) {
    let app = state(pool);
    let pens = new_item(&app, "PEN-BLUE").await;
    let pads = new_item(&app, "PAD-A4").await;

    for (item_id, delivered) in [(pens.id, 40), (pads.id, 12), (pens.id, 10)] {
        let grn_id = new_grn(&app, item_id, delivered).await;
        set_grn_status(&app, grn_id, GrnStatus::Approved).await.unwrap();
    }
    let voucher = new_issuance(&app, pens.id, 15).await;
    set_issuance_status(&app, voucher, IssuanceStatus::Approved).await.unwrap();
    set_issuance_status(&app, voucher, IssuanceStatus::Issued).await.unwrap();

    let first = app.ledger_service.recalculate_item(&app.db_pool, pens.id).await.unwrap();
    let snapshot = projection(&ledger(&app, pens.id).await);
    let second = app.ledger_service.recalculate_item(&app.db_pool, pens.id).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.current_stock, 35);
    assert_eq!(first.transactions_processed, 3);
    assert_eq!(projection(&ledger(&app, pens.id).await), snapshot);

    let report = app.ledger_service.recalculate_all(&app.db_pool).await.unwrap();
    assert_eq!(report.items_processed, 2);
    assert_eq!(report.transactions_processed, 4);
    assert_eq!(projection(&ledger(&app, pens.id).await), snapshot);
    assert_eq!(ledger(&app, pads.id).await.current_stock, 12);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at a Postgres server"]
async fn date_filter_narrows_entries_but_not_balances(pool: PgPool) {
    let app = state(pool);
    let pens = new_item(&app, "PEN-BLUE").await;
    let grn_id = new_grn(&app, pens.id, 50).await;
    set_grn_status(&app, grn_id, GrnStatus::Approved).await.unwrap();

    let today = Utc::now().date_naive();
    let tomorrow = today + Days::new(1);
    let page = PageRequest::new(None, None);

    let same_day = app
        .ledger_service
        .get_ledger(&app.db_pool, pens.id, Some(today), Some(today), page)
        .await
        .unwrap();
    assert_eq!(same_day.ledger_entries.len(), 1);

    let later = app
        .ledger_service
        .get_ledger(&app.db_pool, pens.id, Some(tomorrow), None, page)
        .await
        .unwrap();
    assert!(later.ledger_entries.is_empty());
    assert_eq!(later.pagination.total, 0);
    assert_eq!(later.current_stock, 50);
    assert_eq!(later.opening_stock, 0);
}
