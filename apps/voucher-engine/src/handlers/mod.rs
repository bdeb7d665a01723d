pub mod admin;
pub mod health;
pub mod vouchers;

use axum::Router;
use axum::routing::{get, patch, post};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        // Customer facing
        .route("/vouchers", get(vouchers::list_vouchers))
        .route("/vouchers/{id}", get(vouchers::get_voucher))
        .route("/vouchers/{id}/scan", post(vouchers::track_scan))
        .route("/vouchers/{id}/claim", post(vouchers::claim_voucher))
        .route("/vouchers/{id}/redeem", post(vouchers::redeem_voucher))
        .route("/customers/{id}/wallet", get(vouchers::get_wallet))
        // Provider / admin
        .route("/admin/vouchers", post(admin::create_voucher))
        .route("/admin/vouchers/{id}/publish", post(admin::publish_voucher))
        .route("/admin/vouchers/{id}/text", patch(admin::update_text))
        .route("/admin/vouchers/{id}/stats", get(admin::voucher_stats))
        .route(
            "/admin/vouchers/{id}/codes",
            get(admin::list_codes).post(admin::issue_codes),
        )
        .route("/admin/codes/{id}/deactivate", post(admin::deactivate_code))
        .route("/admin/codes/{id}/activate", post(admin::activate_code))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
