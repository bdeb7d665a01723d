use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use uuid::Uuid;
use voucher_db::models::{GeoPoint, NotificationPreferences, ScanSource, VoucherFilter};
use voucher_shared::api::{
    ClaimRequest, ClaimResponse, RedeemRequest, RedemptionResponse, ScanResponse,
    TrackScanRequest, VoucherView, WalletEntry,
};

use crate::error::VoucherError;
use crate::services::scan_service::ScanRequest;
use crate::state::AppState;
use crate::views;

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub provider_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub available_only: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn list_vouchers(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<VoucherView>>, VoucherError> {
    let filter = VoucherFilter {
        provider_id: params.provider_id,
        category_id: params.category_id,
        limit: params.limit,
        offset: params.offset,
    };
    let vouchers = state.vouchers.search(&filter, params.available_only).await?;
    let now = state.clock.now();
    Ok(Json(
        vouchers.iter().map(|v| views::voucher_view(v, now)).collect(),
    ))
}

pub async fn get_voucher(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<VoucherView>, VoucherError> {
    let voucher = state.vouchers.get_voucher(id).await?;
    Ok(Json(views::voucher_view(&voucher, state.clock.now())))
}

pub async fn track_scan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<TrackScanRequest>,
) -> Result<Json<ScanResponse>, VoucherError> {
    let scan_source: ScanSource = body.scan_source.parse().map_err(VoucherError::Validation)?;
    let request = ScanRequest {
        voucher_id: id,
        customer_id: body.customer_id,
        scan_source,
        location: body.location.map(|l| GeoPoint {
            latitude: l.latitude,
            longitude: l.longitude,
        }),
        device_info: body.device_info,
    };

    let outcome = state.scans.track_scan(request).await?;
    Ok(Json(ScanResponse {
        voucher: views::voucher_view(&outcome.voucher, state.clock.now()),
        scan_id: outcome.scan_id,
        can_claim: outcome.can_claim,
        already_claimed: outcome.already_claimed,
        nearby_locations: outcome.nearby_locations,
    }))
}

pub async fn claim_voucher(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ClaimRequest>,
) -> Result<Json<ClaimResponse>, VoucherError> {
    let defaults = NotificationPreferences::default();
    let preferences = NotificationPreferences {
        notify_before_expiry: body
            .notify_before_expiry
            .unwrap_or(defaults.notify_before_expiry),
        notify_nearby: body.notify_nearby.unwrap_or(defaults.notify_nearby),
    };
    let claim = state
        .claims
        .claim(id, body.customer_id, preferences)
        .await?;
    Ok(Json(views::claim_response(&claim)))
}

pub async fn redeem_voucher(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<RedeemRequest>,
) -> Result<Json<RedemptionResponse>, VoucherError> {
    let receipt = state
        .redemptions
        .redeem(id, body.customer_id, &body.code)
        .await?;
    Ok(Json(views::redemption_response(&receipt)))
}

pub async fn get_wallet(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<Vec<WalletEntry>>, VoucherError> {
    let entries = state.claims.wallet(customer_id).await?;
    let now = state.clock.now();
    Ok(Json(
        entries
            .iter()
            .map(|(claim, voucher)| views::wallet_entry(claim, voucher, now))
            .collect(),
    ))
}
