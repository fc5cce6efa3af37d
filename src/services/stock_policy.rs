// src/services/stock_policy.rs

use crate::models::item::StockStatus;

/// Classifica o saldo contra os limites do item.
/// O teste de mínimo vem primeiro: com min = max = saldo, o resultado é `Low`.
pub fn evaluate(current_stock: i64, minimum_stock_level: i32, maximum_stock_level: i32) -> StockStatus {
    if current_stock <= i64::from(minimum_stock_level) {
        StockStatus::Low
    } else if current_stock >= i64::from(maximum_stock_level) {
        StockStatus::High
    } else {
        StockStatus::Normal
    }
}
