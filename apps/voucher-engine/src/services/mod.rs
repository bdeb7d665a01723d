pub mod claim_service;
pub mod code_issuer;
pub mod nearby_service;
pub mod redemption_service;
pub mod scan_service;
pub mod voucher_service;
