//! Data-access seam for referrals.
//!
//! `AppState` holds an `Arc<dyn ReferralStore>`; `PgReferralStore` is the
//! production backend. Every multi-row write is one atomic unit.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::referral::{
    JobRow, PaymentRow, QualityDetail, ReferralQualityRow, ReferralRow, ReferrerScoreRow,
};
use crate::models::user::UserRole;
use crate::referrals::lifecycle::{ReferralStatus, TransitionPlan};
use crate::referrals::quality::QualityInput;

/// Which referrals a caller may see: all of them, or those on one recruiter's jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessScope {
    All,
    Recruiter(Uuid),
}

impl AccessScope {
    /// Admins see everything, recruiters their own jobs, others nothing.
    pub fn for_user(user: &CurrentUser) -> Option<Self> {
        match user.role {
            UserRole::Admin => Some(AccessScope::All),
            UserRole::Recruiter => Some(AccessScope::Recruiter(user.id)),
            _ => None,
        }
    }

    pub fn recruiter_id(&self) -> Option<Uuid> {
        match self {
            AccessScope::All => None,
            AccessScope::Recruiter(id) => Some(*id),
        }
    }

    pub fn cache_key(&self) -> String {
        match self {
            AccessScope::All => "all".to_string(),
            AccessScope::Recruiter(id) => id.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewReferral {
    pub referrer_id: Uuid,
    pub job_id: Uuid,
    pub referred_candidate_id: Option<Uuid>,
    pub candidate_email: String,
    pub candidate_name: Option<String>,
    pub code: String,
    pub reward_amount: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewQuality {
    pub referral_id: Uuid,
    pub input: QualityInput,
    pub quality_score: i32,
}

#[derive(Debug, Clone)]
pub struct QualityOutcome {
    pub quality: ReferralQualityRow,
    /// Set when the submission moved the referral to HIRED.
    pub transition: Option<TransitionPlan>,
    pub payment: Option<PaymentRow>,
}

#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub referral: ReferralRow,
    pub plan: TransitionPlan,
    pub payment: Option<PaymentRow>,
}

#[async_trait]
pub trait ReferralStore: Send + Sync {
    async fn find_job(&self, job_id: Uuid) -> Result<Option<JobRow>, AppError>;

    /// Resolves a candidate account by email, case-insensitively.
    async fn find_candidate_id_by_email(&self, email: &str) -> Result<Option<Uuid>, AppError>;

    /// Returns `None` when the referral code is already taken.
    async fn insert_referral(&self, referral: &NewReferral) -> Result<Option<ReferralRow>, AppError>;

    /// Newest first.
    async fn referrals_by_referrer(&self, referrer_id: Uuid) -> Result<Vec<ReferralRow>, AppError>;

    /// Returns `None` when the referral is missing or outside `scope`.
    async fn find_referral(
        &self,
        referral_id: Uuid,
        scope: AccessScope,
    ) -> Result<Option<ReferralRow>, AppError>;

    /// Upserts the quality record keyed by referral id. When `hire_success` is
    /// set and the referral is not HIRED yet, moves it to HIRED (with payout)
    /// in the same transaction.
    async fn save_quality(
        &self,
        quality: &NewQuality,
        payout_currency: &str,
    ) -> Result<QualityOutcome, AppError>;

    /// Sets the referral status; creates at most one payout when entering HIRED.
    /// Returns `None` when the referral does not exist.
    async fn update_status(
        &self,
        referral_id: Uuid,
        target: ReferralStatus,
        payout_currency: &str,
    ) -> Result<Option<TransitionOutcome>, AppError>;

    async fn quality_detail(
        &self,
        referral_id: Uuid,
        scope: AccessScope,
    ) -> Result<Option<QualityDetail>, AppError>;

    /// Quality records last updated at or after `since`.
    async fn quality_since(
        &self,
        scope: AccessScope,
        since: DateTime<Utc>,
    ) -> Result<Vec<QualityDetail>, AppError>;

    async fn referrer_scores_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<ReferrerScoreRow>, AppError>;

    /// Settles a payout. Already-paid payments are returned unchanged.
    async fn mark_payment_paid(&self, payment_id: Uuid) -> Result<Option<PaymentRow>, AppError>;
}
