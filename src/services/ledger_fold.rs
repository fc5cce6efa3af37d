// src/services/ledger_fold.rs
//
// Parte pura do motor do razão: filtra as linhas que movimentam estoque,
// ordena e acumula o saldo corrente. Nada aqui toca o banco.

use chrono::{DateTime, Utc};

use crate::models::ledger::{IssueLine, NewLedgerEntry, ReceiptLine, TransactionType};

/// Resultado do recálculo de um item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerPlan {
    pub entries: Vec<NewLedgerEntry>,
    pub closing_balance: i64,
}

impl LedgerPlan {
    pub fn min_balance(&self) -> i64 {
        self.entries.iter().map(|e| e.closing_balance).min().unwrap_or(0)
    }
}

#[derive(Debug)]
struct StockTransaction {
    date: DateTime<Utc>,
    kind: TransactionType,
    document_id: i64,
    line_id: i64,
    quantity: i64,
    remarks: Option<String>,
}

impl StockTransaction {
    // (data, tipo, documento, linha): entradas antes de saídas no mesmo instante,
    // depois a ordem de criação dos documentos e das linhas.
    fn sort_key(&self) -> (DateTime<Utc>, TransactionType, i64, i64) {
        (self.date, self.kind, self.document_id, self.line_id)
    }
}

/// Monta o razão completo de um item a partir das linhas candidatas.
///
/// Só entram linhas de GRN `approved` e de guias `issued`; o resto ainda não
/// mexeu no estoque físico. Linha com quantidade zero não vira lançamento.
/// A ordem de entrada não importa: o resultado é
/// determinístico para o mesmo conjunto de documentos.
pub fn plan_ledger(item_id: i64, receipts: &[ReceiptLine], issues: &[IssueLine]) -> LedgerPlan {
    let mut transactions: Vec<StockTransaction> = receipts
        .iter()
        .filter(|r| r.grn_status.affects_stock() && r.quantity_delivered != 0)
        .map(|r| StockTransaction {
            date: r.created_at,
            kind: TransactionType::Receipt,
            document_id: r.grn_id,
            line_id: r.line_id,
            quantity: i64::from(r.quantity_delivered),
            remarks: r.remarks.clone(),
        })
        .chain(
            issues
                .iter()
                .filter(|i| i.issuance_status.affects_stock() && i.quantity_issued != 0)
                .map(|i| StockTransaction {
                    date: i.created_at,
                    kind: TransactionType::Issue,
                    document_id: i.issuance_id,
                    line_id: i.line_id,
                    quantity: i64::from(i.quantity_issued),
                    remarks: i.remarks.clone(),
                }),
        )
        .collect();

    transactions.sort_by_key(StockTransaction::sort_key);

    let mut balance = 0i64;
    let mut entries = Vec::with_capacity(transactions.len());

    for (index, tx) in transactions.into_iter().enumerate() {
        let opening_stock = balance;
        let (received_quantity, issued_quantity) = match tx.kind {
            TransactionType::Receipt => (tx.quantity, 0),
            TransactionType::Issue => (0, tx.quantity),
        };
        balance = opening_stock + received_quantity - issued_quantity;

        let (grn_id, grn_line_id, issuance_id, issuance_line_id) = match tx.kind {
            TransactionType::Receipt => (Some(tx.document_id), Some(tx.line_id), None, None),
            TransactionType::Issue => (None, None, Some(tx.document_id), Some(tx.line_id)),
        };

        entries.push(NewLedgerEntry {
            item_id,
            transaction_date: tx.date,
            sequence: index as i32 + 1,
            grn_id,
            grn_line_id,
            issuance_id,
            issuance_line_id,
            opening_stock,
            received_quantity,
            issued_quantity,
            closing_balance: balance,
            transaction_type: tx.kind,
            remarks: tx.remarks,
        });
    }

    LedgerPlan {
        entries,
        closing_balance: balance,
    }
}

/// Confere o encadeamento: abertura = fechamento anterior (0 no primeiro),
/// fechamento = abertura + entrada - saída, e exatamente uma das duas quantidades diferente de zero.
pub fn chain_is_consistent(entries: &[NewLedgerEntry]) -> bool {
    let mut previous_closing = 0i64;
    for entry in entries {
        if entry.opening_stock != previous_closing {
            return false;
        }
        if (entry.received_quantity != 0) == (entry.issued_quantity != 0) {
            return false;
        }
        if entry.closing_balance != entry.opening_stock + entry.received_quantity - entry.issued_quantity {
            return false;
        }
        previous_closing = entry.closing_balance;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{grn::GrnStatus, issuance::IssuanceStatus};
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    const ITEM_X: i64 = 1;

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn receipt(grn_id: i64, status: GrnStatus, when: DateTime<Utc>, qty: i32) -> ReceiptLine {
        ReceiptLine {
            grn_id,
            line_id: grn_id * 10,
            grn_status: status,
            created_at: when,
            quantity_delivered: qty,
            remarks: None,
        }
    }

    fn issue(issuance_id: i64, status: IssuanceStatus, when: DateTime<Utc>, qty: i32) -> IssueLine {
        IssueLine {
            issuance_id,
            line_id: issuance_id * 10,
            issuance_status: status,
            created_at: when,
            quantity_issued: qty,
            remarks: None,
        }
    }

    #[test]
    fn scenario_a_single_approved_delivery() {
        let plan = plan_ledger(ITEM_X, &[receipt(1, GrnStatus::Approved, at(0), 50)], &[]);

        assert_eq!(plan.entries.len(), 1);
        let e = &plan.entries[0];
        assert_eq!((e.opening_stock, e.received_quantity, e.closing_balance), (0, 50, 50));
        assert_eq!(e.transaction_type, TransactionType::Receipt);
        assert_eq!(e.grn_id, Some(1));
        assert_eq!(plan.closing_balance, 50);
    }

    #[test]
    fn scenario_b_issue_after_delivery() {
        let plan = plan_ledger(
            ITEM_X,
            &[receipt(1, GrnStatus::Approved, at(0), 50)],
            &[issue(1, IssuanceStatus::Issued, at(30), 20)],
        );

        assert_eq!(plan.entries.len(), 2);
        let second = &plan.entries[1];
        assert_eq!(second.opening_stock, 50);
        assert_eq!(second.issued_quantity, 20);
        assert_eq!(second.received_quantity, 0);
        assert_eq!(second.closing_balance, 30);
        assert_eq!(second.issuance_id, Some(1));
        assert_eq!(plan.closing_balance, 30);
    }

    #[test]
    fn scenario_c_pending_documents_are_ignored() {
        let plan = plan_ledger(
            ITEM_X,
            &[
                receipt(1, GrnStatus::Approved, at(0), 50),
                receipt(2, GrnStatus::Pending, at(10), 100),
                receipt(3, GrnStatus::Rejected, at(20), 70),
            ],
            &[
                issue(1, IssuanceStatus::Issued, at(30), 20),
                issue(2, IssuanceStatus::Approved, at(40), 5),
                issue(3, IssuanceStatus::Pending, at(50), 5),
            ],
        );

        assert_eq!(plan.entries.len(), 2);
        assert_eq!(plan.closing_balance, 30);
    }

    #[test]
    fn receipts_precede_issues_at_the_same_instant() {
        let plan = plan_ledger(
            ITEM_X,
            &[receipt(9, GrnStatus::Approved, at(0), 10)],
            &[issue(1, IssuanceStatus::Issued, at(0), 4)],
        );

        assert_eq!(plan.entries[0].transaction_type, TransactionType::Receipt);
        assert_eq!(plan.entries[1].opening_stock, 10);
        assert!(plan.entries.iter().all(|e| e.closing_balance >= 0));
    }

    #[test]
    fn same_instant_documents_follow_creation_order() {
        let plan = plan_ledger(
            ITEM_X,
            &[receipt(7, GrnStatus::Approved, at(0), 1), receipt(3, GrnStatus::Approved, at(0), 2)],
            &[],
        );
        let ids: Vec<_> = plan.entries.iter().map(|e| e.grn_id.unwrap()).collect();
        assert_eq!(ids, vec![3, 7]);
        assert_eq!(plan.entries.iter().map(|e| e.sequence).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn empty_history_leaves_zero_stock() {
        let plan = plan_ledger(ITEM_X, &[], &[issue(1, IssuanceStatus::Approved, at(0), 5)]);
        assert!(plan.entries.is_empty());
        assert_eq!(plan.closing_balance, 0);
        assert_eq!(plan.min_balance(), 0);
    }

    #[test]
    fn over_issue_is_recorded_as_negative_balance() {
        let plan = plan_ledger(
            ITEM_X,
            &[receipt(1, GrnStatus::Approved, at(5), 3)],
            &[issue(1, IssuanceStatus::Issued, at(0), 5)],
        );
        assert_eq!(plan.min_balance(), -5);
        assert_eq!(plan.closing_balance, -2);
        assert!(chain_is_consistent(&plan.entries));
    }

    #[test]
    fn zero_quantity_lines_leave_no_entry() {
        let plan = plan_ledger(
            ITEM_X,
            &[receipt(1, GrnStatus::Approved, at(0), 0), receipt(2, GrnStatus::Approved, at(1), 8)],
            &[issue(1, IssuanceStatus::Issued, at(2), 0)],
        );

        assert_eq!(plan.entries.len(), 1);
        assert_eq!(plan.entries[0].grn_id, Some(2));
        assert_eq!(plan.entries[0].sequence, 1);
        assert_eq!(plan.closing_balance, 8);
        assert!(chain_is_consistent(&plan.entries));
    }

    #[test]
    fn chain_check_rejects_an_entry_without_movement() {
        let mut plan = plan_ledger(ITEM_X, &[receipt(1, GrnStatus::Approved, at(0), 5)], &[]);
        plan.entries[0].received_quantity = 0;
        plan.entries[0].closing_balance = 0;
        assert!(!chain_is_consistent(&plan.entries));
    }

    #[test]
    fn chain_check_detects_a_broken_link() {
        let mut plan = plan_ledger(
            ITEM_X,
            &[receipt(1, GrnStatus::Approved, at(0), 5), receipt(2, GrnStatus::Approved, at(1), 5)],
            &[],
        );
        assert!(chain_is_consistent(&plan.entries));
        plan.entries[1].opening_stock = 4;
        assert!(!chain_is_consistent(&plan.entries));
    }

    fn grn_status() -> impl Strategy<Value = GrnStatus> {
        prop_oneof![Just(GrnStatus::Pending), Just(GrnStatus::Approved), Just(GrnStatus::Rejected)]
    }

    fn issuance_status() -> impl Strategy<Value = IssuanceStatus> {
        prop_oneof![
            Just(IssuanceStatus::Pending),
            Just(IssuanceStatus::Approved),
            Just(IssuanceStatus::Issued),
            Just(IssuanceStatus::Rejected),
        ]
    }

    fn receipts() -> impl Strategy<Value = Vec<ReceiptLine>> {
        prop::collection::vec((grn_status(), 0i64..20, 0i32..500), 0..25).prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (status, minute, qty))| receipt(i as i64 + 1, status, at(minute), qty))
                .collect()
        })
    }

    fn issues() -> impl Strategy<Value = Vec<IssueLine>> {
        prop::collection::vec((issuance_status(), 0i64..20, 0i32..500), 0..25).prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (status, minute, qty))| issue(i as i64 + 1, status, at(minute), qty))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn conservation_holds(r in receipts(), i in issues()) {
            let plan = plan_ledger(ITEM_X, &r, &i);
            let received: i64 = plan.entries.iter().map(|e| e.received_quantity).sum();
            let issued: i64 = plan.entries.iter().map(|e| e.issued_quantity).sum();

            prop_assert_eq!(plan.closing_balance, received - issued);
            prop_assert_eq!(plan.closing_balance, plan.entries.last().map_or(0, |e| e.closing_balance));

            let expected_received: i64 = r.iter().filter(|l| l.grn_status.affects_stock())
                .map(|l| i64::from(l.quantity_delivered)).sum();
            let expected_issued: i64 = i.iter().filter(|l| l.issuance_status.affects_stock())
                .map(|l| i64::from(l.quantity_issued)).sum();
            prop_assert_eq!(received, expected_received);
            prop_assert_eq!(issued, expected_issued);
        }

        #[test]
        fn chain_is_continuous_and_exclusive(r in receipts(), i in issues()) {
            let plan = plan_ledger(ITEM_X, &r, &i);
            prop_assert!(chain_is_consistent(&plan.entries));
            for e in &plan.entries {
                prop_assert!((e.received_quantity != 0) != (e.issued_quantity != 0));
            }
            for pair in plan.entries.windows(2) {
                prop_assert!(pair[0].transaction_date <= pair[1].transaction_date);
                prop_assert_eq!(pair[1].sequence, pair[0].sequence + 1);
            }
        }

        #[test]
        fn recompute_is_idempotent_and_order_independent(r in receipts(), i in issues()) {
            let first = plan_ledger(ITEM_X, &r, &i);
            let second = plan_ledger(ITEM_X, &r, &i);
            prop_assert_eq!(&first, &second);

            let mut r_rev = r.clone();
            r_rev.reverse();
            let mut i_rev = i.clone();
            i_rev.reverse();
            prop_assert_eq!(first, plan_ledger(ITEM_X, &r_rev, &i_rev));
        }
    }
}
