pub mod auth;
pub mod grn;
pub mod issuance;
pub mod item;
pub mod ledger;
