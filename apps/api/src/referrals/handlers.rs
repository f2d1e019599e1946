//! Axum route handlers for the Referrals API.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::models::referral::{PaymentRow, QualityDetail, ReferralQualityRow, ReferralRow};
use crate::notify::HireEvent;
use crate::referrals::analytics::{
    build_leaderboard, resolve_window, summarize, AnalyticsSummary, LeaderboardEntry,
};
use crate::referrals::codes::generate_referral_code;
use crate::referrals::lifecycle::ReferralStatus;
use crate::referrals::quality::{compute_quality_score, QualityInput};
use crate::referrals::store::{AccessScope, NewQuality, NewReferral};
use crate::state::AppState;

const CODE_ATTEMPTS: usize = 5;
const DEFAULT_LEADERBOARD_LIMIT: usize = 10;
const MAX_LEADERBOARD_LIMIT: usize = 50;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQuery {
    pub referral_id: Option<Uuid>,
    pub days: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AnalyticsResponse {
    Referral(QualityDetail),
    Summary(AnalyticsSummary),
}

/// Every field is optional at the wire level so a missing `referralId` is
/// reported before anything else.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQualityRequest {
    pub referral_id: Option<Uuid>,
    pub profile_match: Option<f64>,
    pub experience_match: Option<f64>,
    pub skills_match: Option<f64>,
    pub response_time: Option<f64>,
    pub interview_performance: Option<f64>,
    #[serde(default)]
    pub hire_success: bool,
}

impl SubmitQualityRequest {
    fn input(&self) -> Result<QualityInput, AppError> {
        fn required(value: Option<f64>, field: &str) -> Result<f64, AppError> {
            value.ok_or_else(|| AppError::Validation(format!("{field} is required")))
        }

        Ok(QualityInput {
            profile_match: required(self.profile_match, "profileMatch")?,
            experience_match: required(self.experience_match, "experienceMatch")?,
            skills_match: required(self.skills_match, "skillsMatch")?,
            response_time: required(self.response_time, "responseTime")?,
            interview_performance: self.interview_performance,
            hire_success: self.hire_success,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardQuery {
    pub days: Option<i64>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardResponse {
    pub period_days: i64,
    pub entries: Vec<LeaderboardEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReferralRequest {
    pub job_id: Uuid,
    pub candidate_email: String,
    pub candidate_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateResponse {
    pub referral: ReferralRow,
    pub previous_status: ReferralStatus,
    pub payment: Option<PaymentRow>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/referrals/quality
///
/// With `referralId`: the single quality record. Otherwise the summary over
/// the last `days` (default 30).
pub async fn handle_quality_analytics(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiQuery(params): ApiQuery<AnalyticsQuery>,
) -> Result<Json<AnalyticsResponse>, AppError> {
    let scope = AccessScope::for_user(&user).ok_or(AppError::Forbidden)?;

    if let Some(referral_id) = params.referral_id {
        let detail = state
            .store
            .quality_detail(referral_id, scope)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No quality record for referral {referral_id}"))
            })?;
        return Ok(Json(AnalyticsResponse::Referral(detail)));
    }

    let days = resolve_window(params.days)?;
    let scope_key = scope.cache_key();

    let mut slot = None;
    if let Some(cache) = &state.cache {
        let lookup = cache.get::<AnalyticsSummary>(&scope_key, days).await;
        if let Some(summary) = lookup.value {
            return Ok(Json(AnalyticsResponse::Summary(summary)));
        }
        slot = lookup.slot;
    }

    let since = Utc::now() - Duration::days(days);
    let records = state.store.quality_since(scope, since).await?;
    let summary = summarize(&records, days);

    if let (Some(cache), Some(slot)) = (&state.cache, slot) {
        cache.put(slot, &scope_key, days, &summary).await;
    }

    Ok(Json(AnalyticsResponse::Summary(summary)))
}

/// POST /api/v1/referrals/quality
///
/// Scores a referral and upserts its quality record. Only the recruiter who
/// owns the referral's job may submit; anyone else gets 404.
pub async fn handle_submit_quality(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(request): ApiJson<SubmitQualityRequest>,
) -> Result<Json<ReferralQualityRow>, AppError> {
    if !user.is_recruiter() {
        return Err(AppError::Unauthorized);
    }

    let referral_id = request
        .referral_id
        .ok_or_else(|| AppError::Validation("referralId is required".to_string()))?;

    let input = request.input()?;
    if let Some(field) = input.first_non_finite() {
        return Err(AppError::Validation(format!("{field} must be a finite number")));
    }

    let referral = state
        .store
        .find_referral(referral_id, AccessScope::Recruiter(user.id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Referral {referral_id} not found")))?;

    let quality_score = compute_quality_score(&input);
    let outcome = state
        .store
        .save_quality(
            &NewQuality {
                referral_id,
                input,
                quality_score,
            },
            &state.config.payout_currency,
        )
        .await?;

    if let Some(cache) = &state.cache {
        cache.invalidate().await;
    }

    if let Some(plan) = outcome.transition.filter(|p| p.enters_hired()) {
        info!("Referral {referral_id} marked HIRED by quality submission (from {})", plan.from);
        state.notifier.spawn_referral_hired(HireEvent::new(
            referral.id,
            referral.referrer_id,
            referral.job_id,
            outcome.payment.is_some(),
        ));
    }

    Ok(Json(outcome.quality))
}

/// GET /api/v1/referrals/leaderboard
///
/// Referrers ranked by average quality score over the window.
pub async fn handle_leaderboard(
    State(state): State<AppState>,
    _user: CurrentUser,
    ApiQuery(params): ApiQuery<LeaderboardQuery>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    let days = resolve_window(params.days)?;
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
        .clamp(1, MAX_LEADERBOARD_LIMIT);

    let since = Utc::now() - Duration::days(days);
    let rows = state.store.referrer_scores_since(since).await?;

    Ok(Json(LeaderboardResponse {
        period_days: days,
        entries: build_leaderboard(&rows, limit),
    }))
}

/// POST /api/v1/referrals
///
/// Refers a candidate (by email) to a job on behalf of the caller.
pub async fn handle_create_referral(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(request): ApiJson<CreateReferralRequest>,
) -> Result<(StatusCode, Json<ReferralRow>), AppError> {
    let candidate_email = normalize_email(&request.candidate_email)?;
    let candidate_name = request
        .candidate_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    let job = state
        .store
        .find_job(request.job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {} not found", request.job_id)))?;

    let referred_candidate_id = state
        .store
        .find_candidate_id_by_email(&candidate_email)
        .await?;

    for _ in 0..CODE_ATTEMPTS {
        let new_referral = NewReferral {
            referrer_id: user.id,
            job_id: job.id,
            referred_candidate_id,
            candidate_email: candidate_email.clone(),
            candidate_name: candidate_name.clone(),
            code: generate_referral_code(),
            reward_amount: job.referral_reward,
        };
        if let Some(referral) = state.store.insert_referral(&new_referral).await? {
            info!(
                "User {} referred {} to job {} ({})",
                user.id, referral.candidate_email, job.id, referral.code
            );
            return Ok((StatusCode::CREATED, Json(referral)));
        }
    }

    Err(AppError::Conflict(
        "Could not allocate a unique referral code".to_string(),
    ))
}

/// GET /api/v1/referrals/mine
pub async fn handle_my_referrals(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<ReferralRow>>, AppError> {
    Ok(Json(state.store.referrals_by_referrer(user.id).await?))
}

/// PATCH /api/v1/referrals/:id/status
///
/// Sets the referral status directly. Entering HIRED with a reward creates
/// one pending payout; repeating the call does not create another.
pub async fn handle_update_status(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(referral_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<UpdateStatusRequest>,
) -> Result<Json<StatusUpdateResponse>, AppError> {
    let scope = AccessScope::for_user(&user).ok_or(AppError::Forbidden)?;
    let target: ReferralStatus = request.status.parse().map_err(AppError::Validation)?;

    state
        .store
        .find_referral(referral_id, scope)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Referral {referral_id} not found")))?;

    let outcome = state
        .store
        .update_status(referral_id, target, &state.config.payout_currency)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Referral {referral_id} not found")))?;

    if outcome.plan.status_changed {
        if let Some(cache) = &state.cache {
            cache.invalidate().await;
        }
    }

    if outcome.plan.enters_hired() {
        state.notifier.spawn_referral_hired(HireEvent::new(
            outcome.referral.id,
            outcome.referral.referrer_id,
            outcome.referral.job_id,
            outcome.payment.is_some(),
        ));
    }

    Ok(Json(StatusUpdateResponse {
        previous_status: outcome.plan.from,
        referral: outcome.referral,
        payment: outcome.payment,
    }))
}

/// POST /api/v1/payments/:id/paid
pub async fn handle_mark_payment_paid(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(payment_id): ApiPath<Uuid>,
) -> Result<Json<PaymentRow>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden);
    }

    let payment = state
        .store
        .mark_payment_paid(payment_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Payment {payment_id} not found")))?;

    info!("Payment {payment_id} settled by admin {}", user.id);
    Ok(Json(payment))
}

fn normalize_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(AppError::Validation(format!(
            "'{}' is not a valid email address",
            raw.trim()
        )))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
