use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use voucher_db::db::init_db;
use voucher_db::{InMemoryVoucherStore, PgVoucherStore, VoucherStore};

use crate::clock::{Clock, SystemClock};
use crate::config::{EngineConfig, StoreBackend};
use crate::services::claim_service::ClaimService;
use crate::services::code_issuer::CodeIssuer;
use crate::services::nearby_service::{NearbyLocator, locator_from_config};
use crate::services::redemption_service::RedemptionService;
use crate::services::scan_service::ScanTracker;
use crate::services::voucher_service::VoucherService;

#[derive(Clone)]
pub struct AppState {
    pub vouchers: Arc<VoucherService>,
    pub claims: Arc<ClaimService>,
    pub redemptions: Arc<RedemptionService>,
    pub scans: Arc<ScanTracker>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn VoucherStore>,
        config: &EngineConfig,
        clock: Arc<dyn Clock>,
        nearby: Arc<dyn NearbyLocator>,
    ) -> Self {
        let issuer = CodeIssuer::from_config(store.clone(), &config.codes);
        Self {
            vouchers: Arc::new(VoucherService::new(
                store.clone(),
                clock.clone(),
                issuer,
                config.codes.default_types.clone(),
            )),
            claims: Arc::new(ClaimService::new(store.clone(), clock.clone())),
            redemptions: Arc::new(RedemptionService::new(
                store.clone(),
                clock.clone(),
                config.redemption.retry_policy(),
            )),
            scans: Arc::new(ScanTracker::new(store, clock.clone(), nearby)),
            clock,
        }
    }

    /// Production wiring: wall clock and the configured nearby lookup.
    pub fn from_config(store: Arc<dyn VoucherStore>, config: &EngineConfig) -> Result<Self> {
        let nearby = locator_from_config(&config.nearby)?;
        Ok(Self::new(store, config, Arc::new(SystemClock), nearby))
    }
}

/// Opens the configured store backend. Postgres runs pending migrations.
pub async fn open_store(config: &EngineConfig) -> Result<Arc<dyn VoucherStore>> {
    match config.server.store {
        StoreBackend::Postgres => {
            let url = config
                .database
                .url
                .as_deref()
                .context("DATABASE_URL must be set for the postgres store")?;
            let pool = init_db(url, config.database.max_connections).await?;
            info!("Using postgres voucher store");
            Ok(Arc::new(PgVoucherStore::new(
                pool,
                config.redemption.tx_settings(),
            )))
        }
        StoreBackend::Memory => {
            info!("Using in-memory voucher store, data is lost on exit");
            Ok(Arc::new(InMemoryVoucherStore::new(
                config.redemption.lock_timeout(),
            )))
        }
    }
}
