#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use voucher_db::models::{
    CodeType, DiscountType, LocalizedText, NewClaim, NewScan, NewVoucher, RedemptionAttempt,
    RedemptionReceipt, TextPatch, Voucher, VoucherClaim, VoucherCode, VoucherFilter, VoucherScan,
};
use voucher_db::{InMemoryVoucherStore, StoreError, VoucherStore};
use voucher_engine::AppState;
use voucher_engine::clock::FixedClock;
use voucher_engine::config::EngineConfig;
use voucher_engine::services::nearby_service::{DisabledNearbyLocator, NearbyLocator};

pub struct Harness {
    pub store: Arc<FaultyStore>,
    pub clock: Arc<FixedClock>,
    pub state: AppState,
}

pub fn config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.redemption.max_retries = 3;
    config.redemption.initial_backoff_ms = 1;
    config.redemption.max_backoff_ms = 5;
    config
}

pub fn harness() -> Harness {
    harness_with(Arc::new(DisabledNearbyLocator))
}

pub fn harness_with(nearby: Arc<dyn NearbyLocator>) -> Harness {
    let store = Arc::new(FaultyStore::new(InMemoryVoucherStore::new(
        Duration::from_secs(5),
    )));
    let clock = Arc::new(FixedClock::new(Utc::now()));
    let state = AppState::new(store.clone(), &config(), clock.clone(), nearby);
    Harness {
        store,
        clock,
        state,
    }
}

pub fn voucher_spec(
    max_redemptions: Option<i32>,
    per_user: i32,
    valid_from: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> NewVoucher {
    NewVoucher {
        provider_id: Uuid::new_v4(),
        category_id: None,
        title: LocalizedText::from([("en".to_string(), "Free coffee".to_string())]),
        description: LocalizedText::new(),
        terms: LocalizedText::new(),
        discount_type: DiscountType::FreeItem,
        discount_value: 0.0,
        currency: None,
        location: None,
        valid_from,
        expires_at,
        max_redemptions,
        max_redemptions_per_user: per_user,
        code_types: vec![CodeType::Short, CodeType::Qr],
    }
}

impl Harness {
    pub fn now(&self) -> DateTime<Utc> {
        use voucher_engine::clock::Clock;
        self.clock.now()
    }

    /// Active voucher (window started an hour ago, ends in a day) and its
    /// SHORT code.
    pub async fn active_voucher(&self, max: Option<i32>, per_user: i32) -> (Voucher, VoucherCode) {
        let now = self.now();
        self.voucher_with_window(
            max,
            per_user,
            now - chrono::Duration::hours(1),
            now + chrono::Duration::days(1),
        )
        .await
    }

    pub async fn voucher_with_window(
        &self,
        max: Option<i32>,
        per_user: i32,
        valid_from: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> (Voucher, VoucherCode) {
        let (voucher, codes) = self
            .state
            .vouchers
            .create_voucher(voucher_spec(max, per_user, valid_from, expires_at))
            .await
            .expect("voucher creation");
        let short = codes
            .into_iter()
            .find(|c| c.code_type == CodeType::Short)
            .expect("short code issued");
        (voucher, short)
    }

    pub async fn current_redemptions(&self, voucher_id: Uuid) -> i32 {
        self.store
            .get_voucher(voucher_id)
            .await
            .unwrap()
            .unwrap()
            .current_redemptions
    }
}

/// Delegates to the in-memory store, with switches to inject failures.
pub struct FaultyStore {
    pub inner: InMemoryVoucherStore,
    pub fail_scans: AtomicBool,
    /// Number of upcoming `commit_redemption` calls that fail with a lock timeout.
    pub lock_timeouts: AtomicUsize,
    pub commit_calls: AtomicUsize,
}

impl FaultyStore {
    pub fn new(inner: InMemoryVoucherStore) -> Self {
        Self {
            inner,
            fail_scans: AtomicBool::new(false),
            lock_timeouts: AtomicUsize::new(0),
            commit_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl VoucherStore for FaultyStore {
    async fn insert_voucher(&self, id: Uuid, new: &NewVoucher) -> Result<Voucher, StoreError> {
        self.inner.insert_voucher(id, new).await
    }

    async fn get_voucher(&self, id: Uuid) -> Result<Option<Voucher>, StoreError> {
        self.inner.get_voucher(id).await
    }

    async fn search_vouchers(&self, filter: &VoucherFilter) -> Result<Vec<Voucher>, StoreError> {
        self.inner.search_vouchers(filter).await
    }

    async fn update_voucher_text(
        &self,
        id: Uuid,
        patch: &TextPatch,
    ) -> Result<Voucher, StoreError> {
        self.inner.update_voucher_text(id, patch).await
    }

    async fn set_valid_from(
        &self,
        id: Uuid,
        valid_from: DateTime<Utc>,
    ) -> Result<Voucher, StoreError> {
        self.inner.set_valid_from(id, valid_from).await
    }

    async fn insert_code(
        &self,
        voucher_id: Uuid,
        code: &str,
        code_type: CodeType,
    ) -> Result<VoucherCode, StoreError> {
        self.inner.insert_code(voucher_id, code, code_type).await
    }

    async fn find_code(&self, code: &str) -> Result<Option<VoucherCode>, StoreError> {
        self.inner.find_code(code).await
    }

    async fn list_codes(&self, voucher_id: Uuid) -> Result<Vec<VoucherCode>, StoreError> {
        self.inner.list_codes(voucher_id).await
    }

    async fn set_code_active(
        &self,
        code_id: Uuid,
        active: bool,
    ) -> Result<VoucherCode, StoreError> {
        self.inner.set_code_active(code_id, active).await
    }

    async fn insert_claim(&self, new: &NewClaim) -> Result<VoucherClaim, StoreError> {
        self.inner.insert_claim(new).await
    }

    async fn find_claim(
        &self,
        voucher_id: Uuid,
        customer_id: Uuid,
    ) -> Result<Option<VoucherClaim>, StoreError> {
        self.inner.find_claim(voucher_id, customer_id).await
    }

    async fn list_claims(&self, customer_id: Uuid) -> Result<Vec<VoucherClaim>, StoreError> {
        self.inner.list_claims(customer_id).await
    }

    async fn commit_redemption(
        &self,
        attempt: &RedemptionAttempt,
    ) -> Result<RedemptionReceipt, StoreError> {
        self.commit_calls.fetch_add(1, Ordering::SeqCst);
        let injected = self
            .lock_timeouts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::LockTimeout);
        }
        self.inner.commit_redemption(attempt).await
    }

    async fn count_redemptions(
        &self,
        voucher_id: Uuid,
        customer_id: Option<Uuid>,
    ) -> Result<i64, StoreError> {
        self.inner.count_redemptions(voucher_id, customer_id).await
    }

    async fn insert_scan(&self, new: &NewScan) -> Result<VoucherScan, StoreError> {
        if self.fail_scans.load(Ordering::SeqCst) {
            return Err(StoreError::Database(voucher_db::sqlx::Error::PoolClosed));
        }
        self.inner.insert_scan(new).await
    }

    async fn count_scans(&self, voucher_id: Uuid) -> Result<i64, StoreError> {
        self.inner.count_scans(voucher_id).await
    }
}
