pub mod grn;
pub mod issuance;
pub mod items;
pub mod ledger;
