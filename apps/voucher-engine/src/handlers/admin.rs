//! Provider-side operations. Authentication sits in front of this service.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use uuid::Uuid;
use voucher_db::models::{CodeType, NewVoucher, TextPatch};
use voucher_shared::api::{CodeView, CreatedVoucher, VoucherStats, VoucherView};

use crate::error::VoucherError;
use crate::state::AppState;
use crate::views;

pub async fn create_voucher(
    State(state): State<AppState>,
    Json(body): Json<NewVoucher>,
) -> Result<(StatusCode, Json<CreatedVoucher>), VoucherError> {
    let (voucher, codes) = state.vouchers.create_voucher(body).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedVoucher {
            voucher: views::voucher_view(&voucher, state.clock.now()),
            codes: codes.iter().map(views::code_view).collect(),
        }),
    ))
}

pub async fn publish_voucher(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<VoucherView>, VoucherError> {
    let voucher = state.vouchers.publish_voucher(id).await?;
    Ok(Json(views::voucher_view(&voucher, state.clock.now())))
}

pub async fn update_text(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<TextPatch>,
) -> Result<Json<VoucherView>, VoucherError> {
    let voucher = state.vouchers.update_text(id, &patch).await?;
    Ok(Json(views::voucher_view(&voucher, state.clock.now())))
}

pub async fn voucher_stats(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<VoucherStats>, VoucherError> {
    Ok(Json(state.vouchers.stats(id).await?))
}

pub async fn list_codes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<CodeView>>, VoucherError> {
    let codes = state.vouchers.list_codes(id).await?;
    Ok(Json(codes.iter().map(views::code_view).collect()))
}

#[derive(Debug, Deserialize)]
pub struct IssueCodesRequest {
    pub code_types: Vec<CodeType>,
}

pub async fn issue_codes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<IssueCodesRequest>,
) -> Result<(StatusCode, Json<Vec<CodeView>>), VoucherError> {
    let codes = state.vouchers.issue_codes(id, &body.code_types).await?;
    Ok((
        StatusCode::CREATED,
        Json(codes.iter().map(views::code_view).collect()),
    ))
}

pub async fn deactivate_code(
    State(state): State<AppState>,
    Path(code_id): Path<Uuid>,
) -> Result<Json<CodeView>, VoucherError> {
    let code = state.vouchers.set_code_active(code_id, false).await?;
    Ok(Json(views::code_view(&code)))
}

pub async fn activate_code(
    State(state): State<AppState>,
    Path(code_id): Path<Uuid>,
) -> Result<Json<CodeView>, VoucherError> {
    let code = state.vouchers.set_code_active(code_id, true).await?;
    Ok(Json(views::code_view(&code)))
}
