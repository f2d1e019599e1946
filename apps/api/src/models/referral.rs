use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::AppError;
use crate::referrals::lifecycle::ReferralStatus;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct JobRow {
    pub id: Uuid,
    pub recruiter_id: Uuid,
    pub title: String,
    /// Minor currency units.
    pub referral_reward: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReferralRow {
    pub id: Uuid,
    pub referrer_id: Uuid,
    pub referred_candidate_id: Option<Uuid>,
    pub candidate_email: String,
    pub candidate_name: Option<String>,
    pub job_id: Uuid,
    pub code: String,
    pub status: String,
    /// Minor currency units, copied from the job at creation.
    pub reward_amount: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl ReferralRow {
    pub fn status(&self) -> Result<ReferralStatus, AppError> {
        self.status.parse().map_err(|e: String| {
            AppError::Internal(anyhow::anyhow!("referral {} has {e}", self.id))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReferralQualityRow {
    pub id: Uuid,
    pub referral_id: Uuid,
    pub quality_score: i32,
    pub profile_match: f64,
    pub experience_match: f64,
    pub skills_match: f64,
    pub response_time: f64,
    pub interview_performance: Option<f64>,
    pub hire_success: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A quality record joined with the referral, job and candidate display fields.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct QualityDetail {
    pub id: Uuid,
    pub referral_id: Uuid,
    pub quality_score: i32,
    pub profile_match: f64,
    pub experience_match: f64,
    pub skills_match: f64,
    pub response_time: f64,
    pub interview_performance: Option<f64>,
    pub hire_success: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub referral_code: String,
    pub referral_status: String,
    pub referrer_id: Uuid,
    pub job_id: Uuid,
    pub job_title: String,
    pub candidate_name: Option<String>,
    pub candidate_email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRow {
    pub id: Uuid,
    pub referral_id: Uuid,
    pub payee_id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

/// One scored referral, attributed to its referrer.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReferrerScoreRow {
    pub referrer_id: Uuid,
    pub referrer_name: String,
    pub quality_score: i32,
    pub hire_success: bool,
}
