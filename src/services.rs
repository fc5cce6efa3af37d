pub mod auth;
pub mod catalog_service;
pub mod grn_service;
pub mod issuance_service;
pub mod ledger_fold;
pub mod ledger_service;
pub mod reference;
pub mod stock_policy;

#[cfg(test)]
mod workflow_tests;
