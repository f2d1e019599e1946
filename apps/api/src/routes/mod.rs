pub mod health;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::referrals::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Referral quality
        .route(
            "/api/v1/referrals/quality",
            get(handlers::handle_quality_analytics).post(handlers::handle_submit_quality),
        )
        .route(
            "/api/v1/referrals/leaderboard",
            get(handlers::handle_leaderboard),
        )
        // Referral lifecycle
        .route("/api/v1/referrals", post(handlers::handle_create_referral))
        .route("/api/v1/referrals/mine", get(handlers::handle_my_referrals))
        .route(
            "/api/v1/referrals/:id/status",
            patch(handlers::handle_update_status),
        )
        // Payouts
        .route(
            "/api/v1/payments/:id/paid",
            post(handlers::handle_mark_payment_paid),
        )
        .with_state(state)
}
