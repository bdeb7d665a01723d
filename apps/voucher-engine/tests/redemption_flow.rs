mod common;

use std::sync::atomic::Ordering;

use chrono::Duration;
use uuid::Uuid;
use voucher_db::VoucherStore;
use voucher_db::models::{CodeType, NotificationPreferences};
use voucher_engine::VoucherError;

use common::harness;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_redemptions_never_oversell() {
    let h = harness();
    let (voucher, code) = h.active_voucher(Some(10), 1).await;
    let voucher_id = voucher.id;

    let mut handles = Vec::new();
    for _ in 0..40 {
        let redemptions = h.state.redemptions.clone();
        let code = code.code.clone();
        handles.push(tokio::spawn(async move {
            redemptions.redeem(voucher_id, Uuid::new_v4(), &code).await
        }));
    }

    let mut ok = 0;
    let mut sold_out = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => ok += 1,
            Err(VoucherError::SoldOut) => sold_out += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(ok, 10);
    assert_eq!(sold_out, 30);
    assert_eq!(h.current_redemptions(voucher.id).await, 10);
    assert_eq!(h.store.inner.redemption_rows(voucher.id).await.len(), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn last_unit_goes_to_exactly_one_customer() {
    let h = harness();
    let (voucher, code) = h.active_voucher(Some(1), 1).await;
    let voucher_id = voucher.id;

    let a = {
        let redemptions = h.state.redemptions.clone();
        let code = code.code.clone();
        tokio::spawn(async move { redemptions.redeem(voucher_id, Uuid::new_v4(), &code).await })
    };
    let b = {
        let redemptions = h.state.redemptions.clone();
        let code = code.code.clone();
        tokio::spawn(async move { redemptions.redeem(voucher_id, Uuid::new_v4(), &code).await })
    };

    let results = [a.await.unwrap(), b.await.unwrap()];
    let winners = results.iter().filter(|r| r.is_ok()).count();
    let sold_out = results
        .iter()
        .filter(|r| matches!(r, Err(VoucherError::SoldOut)))
        .count();

    assert_eq!(winners, 1);
    assert_eq!(sold_out, 1);
    assert_eq!(h.store.inner.redemption_rows(voucher.id).await.len(), 1);

    let receipt = results.into_iter().find_map(Result::ok).unwrap();
    assert!(receipt.exhausted());
    assert_eq!(receipt.remaining(), Some(0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn same_customer_hammering_stays_within_personal_limit() {
    let h = harness();
    let (voucher, code) = h.active_voucher(Some(100), 3).await;
    let voucher_id = voucher.id;
    let customer = Uuid::new_v4();

    let mut handles = Vec::new();
    for _ in 0..20 {
        let redemptions = h.state.redemptions.clone();
        let code = code.code.clone();
        handles.push(tokio::spawn(async move {
            redemptions.redeem(voucher_id, customer, &code).await
        }));
    }

    let mut ok = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => ok += 1,
            Err(VoucherError::PerUserLimitExceeded) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(ok, 3);
    assert_eq!(
        h.store.count_redemptions(voucher.id, Some(customer)).await.unwrap(),
        3
    );
    assert_eq!(h.current_redemptions(voucher.id).await, 3);
}

#[tokio::test]
async fn second_redemption_by_same_customer_is_refused() {
    let h = harness();
    let (voucher, code) = h.active_voucher(Some(10), 1).await;
    let customer = Uuid::new_v4();

    let receipt = h
        .state
        .redemptions
        .redeem(voucher.id, customer, &code.code)
        .await
        .unwrap();
    assert_eq!(receipt.current_redemptions, 1);
    assert_eq!(receipt.customer_redemptions, 1);

    let err = h
        .state
        .redemptions
        .redeem(voucher.id, customer, &code.code)
        .await
        .unwrap_err();
    assert!(matches!(err, VoucherError::PerUserLimitExceeded));
    assert_eq!(h.current_redemptions(voucher.id).await, 1);
}

#[tokio::test]
async fn shared_code_serves_many_customers() {
    let h = harness();
    let (voucher, code) = h.active_voucher(None, 1).await;

    for _ in 0..5 {
        h.state
            .redemptions
            .redeem(voucher.id, Uuid::new_v4(), &code.code)
            .await
            .unwrap();
    }

    assert_eq!(h.current_redemptions(voucher.id).await, 5);
    let code = h.store.find_code(&code.code).await.unwrap().unwrap();
    assert!(code.is_active);
}

#[tokio::test]
async fn future_voucher_is_not_yet_redeemable() {
    let h = harness();
    let now = h.now();
    let (voucher, code) = h
        .voucher_with_window(Some(5), 1, now + Duration::days(1), now + Duration::days(2))
        .await;

    let err = h
        .state
        .redemptions
        .redeem(voucher.id, Uuid::new_v4(), &code.code)
        .await
        .unwrap_err();

    assert!(matches!(err, VoucherError::NotYetValid));
    assert_eq!(h.current_redemptions(voucher.id).await, 0);
    assert!(h.store.inner.redemption_rows(voucher.id).await.is_empty());
}

#[tokio::test]
async fn expired_voucher_never_redeems_even_when_claimed() {
    let h = harness();
    let (voucher, code) = h.active_voucher(Some(5), 1).await;
    let customer = Uuid::new_v4();

    h.state
        .claims
        .claim(voucher.id, customer, NotificationPreferences::default())
        .await
        .unwrap();

    // The wallet still shows the voucher; the window decides.
    h.clock.advance(Duration::days(2));

    let err = h
        .state
        .redemptions
        .redeem(voucher.id, customer, &code.code)
        .await
        .unwrap_err();
    assert!(matches!(err, VoucherError::Expired));
    assert_eq!(h.current_redemptions(voucher.id).await, 0);
}

#[tokio::test]
async fn invalid_codes_leave_counter_untouched() {
    let h = harness();
    let (voucher, code) = h.active_voucher(Some(5), 1).await;
    let (_, foreign_code) = h.active_voucher(Some(5), 1).await;

    for presented in ["NOPE2345", "", "   ", foreign_code.code.as_str()] {
        let err = h
            .state
            .redemptions
            .redeem(voucher.id, Uuid::new_v4(), presented)
            .await
            .unwrap_err();
        assert!(
            matches!(err, VoucherError::InvalidCode),
            "'{presented}' gave {err}"
        );
    }

    h.state
        .vouchers
        .set_code_active(code.id, false)
        .await
        .unwrap();
    let err = h
        .state
        .redemptions
        .redeem(voucher.id, Uuid::new_v4(), &code.code)
        .await
        .unwrap_err();
    assert!(matches!(err, VoucherError::InvalidCode));

    assert_eq!(h.current_redemptions(voucher.id).await, 0);
}

#[tokio::test]
async fn presented_codes_are_normalized() {
    let h = harness();
    let (voucher, code) = h.active_voucher(Some(5), 2).await;

    let sloppy = format!("  {}\n", code.code.to_lowercase());
    h.state
        .redemptions
        .redeem(voucher.id, Uuid::new_v4(), &sloppy)
        .await
        .unwrap();

    let qr = h
        .store
        .list_codes(voucher.id)
        .await
        .unwrap()
        .into_iter()
        .find(|c| c.code_type == CodeType::Qr)
        .unwrap();
    h.state
        .redemptions
        .redeem(voucher.id, Uuid::new_v4(), &format!(" {} ", qr.code))
        .await
        .unwrap();

    assert_eq!(h.current_redemptions(voucher.id).await, 2);
}

#[tokio::test]
async fn unknown_voucher_is_not_found() {
    let h = harness();
    let (_, code) = h.active_voucher(Some(5), 1).await;

    let err = h
        .state
        .redemptions
        .redeem(Uuid::new_v4(), Uuid::new_v4(), &code.code)
        .await
        .unwrap_err();
    assert!(matches!(err, VoucherError::NotFound { entity: "voucher" }));
}

#[tokio::test]
async fn lock_timeouts_are_retried() {
    let h = harness();
    let (voucher, code) = h.active_voucher(Some(5), 1).await;
    h.store.lock_timeouts.store(2, Ordering::SeqCst);

    h.state
        .redemptions
        .redeem(voucher.id, Uuid::new_v4(), &code.code)
        .await
        .unwrap();

    assert_eq!(h.store.commit_calls.load(Ordering::SeqCst), 3);
    assert_eq!(h.current_redemptions(voucher.id).await, 1);
}

#[tokio::test]
async fn persistent_contention_surfaces_as_retryable() {
    let h = harness();
    let (voucher, code) = h.active_voucher(Some(5), 1).await;
    h.store.lock_timeouts.store(usize::MAX, Ordering::SeqCst);

    let err = h
        .state
        .redemptions
        .redeem(voucher.id, Uuid::new_v4(), &code.code)
        .await
        .unwrap_err();

    assert!(matches!(err, VoucherError::TransientConcurrency));
    assert!(err.is_retryable());
    // First attempt plus three retries from the harness config.
    assert_eq!(h.store.commit_calls.load(Ordering::SeqCst), 4);
    assert_eq!(h.current_redemptions(voucher.id).await, 0);
}

#[tokio::test]
async fn business_rejections_are_not_retried() {
    let h = harness();
    let (voucher, code) = h.active_voucher(Some(0), 1).await;

    let err = h
        .state
        .redemptions
        .redeem(voucher.id, Uuid::new_v4(), &code.code)
        .await
        .unwrap_err();

    assert!(matches!(err, VoucherError::SoldOut));
    assert_eq!(h.store.commit_calls.load(Ordering::SeqCst), 1);
}
