pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod retry;
pub mod services;
pub mod state;
pub mod views;

pub use error::VoucherError;
pub use state::AppState;
