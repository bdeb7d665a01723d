pub mod claim_repo;
pub mod code_repo;
pub mod redemption_repo;
pub mod scan_repo;
pub mod voucher_repo;
