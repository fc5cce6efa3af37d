pub mod item_repo;
pub use item_repo::ItemRepository;
pub mod grn_repo;
pub use grn_repo::GrnRepository;
pub mod issuance_repo;
pub use issuance_repo::IssuanceRepository;
pub mod ledger_repo;
pub use ledger_repo::LedgerRepository;
