pub mod availability;
pub mod db;
pub mod error;
pub mod guard;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod repositories;
pub mod store;

pub use sqlx;

pub use availability::{Availability, VoucherStatus};
pub use error::StoreError;
pub use guard::RedemptionRejection;
pub use memory::InMemoryVoucherStore;
pub use postgres::{PgVoucherStore, TxSettings};
pub use store::VoucherStore;
