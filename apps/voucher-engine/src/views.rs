//! Mapping from store rows to the API types in `voucher-shared`.

use chrono::{DateTime, Utc};
use voucher_db::models::{RedemptionReceipt, Voucher, VoucherClaim, VoucherCode};
use voucher_shared::api::{
    ClaimResponse, CodeView, Location, RedemptionResponse, VoucherView, WalletEntry,
};

pub fn voucher_view(voucher: &Voucher, now: DateTime<Utc>) -> VoucherView {
    VoucherView {
        id: voucher.id,
        provider_id: voucher.provider_id,
        category_id: voucher.category_id,
        title: voucher.title.0.clone(),
        description: voucher.description.0.clone(),
        terms: voucher.terms.0.clone(),
        discount_type: voucher.discount_type.as_str().to_string(),
        discount_value: voucher.discount_value,
        currency: voucher.currency.clone(),
        location: voucher.location().map(|p| Location {
            latitude: p.latitude,
            longitude: p.longitude,
        }),
        valid_from: voucher.valid_from,
        expires_at: voucher.expires_at,
        status: voucher.status(now).as_str().to_string(),
        available: voucher.availability(now).is_available() && !voucher.is_sold_out(),
        max_redemptions: voucher.max_redemptions,
        max_redemptions_per_user: voucher.max_redemptions_per_user,
        current_redemptions: voucher.current_redemptions,
        remaining_redemptions: voucher.remaining_redemptions(),
    }
}

pub fn code_view(code: &VoucherCode) -> CodeView {
    CodeView {
        id: code.id,
        code: code.code.clone(),
        code_type: code.code_type.as_str().to_string(),
        is_active: code.is_active,
    }
}

pub fn claim_response(claim: &VoucherClaim) -> ClaimResponse {
    ClaimResponse {
        claim_id: claim.id,
        voucher_id: claim.voucher_id,
        customer_id: claim.customer_id,
        claimed_at: claim.claimed_at,
        wallet_position: claim.wallet_position,
    }
}

pub fn redemption_response(receipt: &RedemptionReceipt) -> RedemptionResponse {
    RedemptionResponse {
        redemption_id: receipt.redemption.id,
        voucher_id: receipt.redemption.voucher_id,
        customer_id: receipt.redemption.customer_id,
        redeemed_at: receipt.redemption.redeemed_at,
        remaining_redemptions: receipt.remaining(),
        customer_remaining: (i64::from(receipt.max_redemptions_per_user)
            - receipt.customer_redemptions)
            .max(0),
        sold_out: receipt.exhausted(),
    }
}

pub fn wallet_entry(claim: &VoucherClaim, voucher: &Voucher, now: DateTime<Utc>) -> WalletEntry {
    WalletEntry {
        claim_id: claim.id,
        wallet_position: claim.wallet_position,
        claimed_at: claim.claimed_at,
        voucher: voucher_view(voucher, now),
    }
}
