use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::referral::{
    JobRow, PaymentRow, QualityDetail, ReferralQualityRow, ReferralRow, ReferrerScoreRow,
};
use crate::referrals::lifecycle::{plan_transition, ReferralStatus, TransitionPlan};
use crate::referrals::store::{
    AccessScope, NewQuality, NewReferral, QualityOutcome, ReferralStore, TransitionOutcome,
};

const QUALITY_DETAIL_SELECT: &str = r#"
    SELECT q.id, q.referral_id, q.quality_score, q.profile_match, q.experience_match,
           q.skills_match, q.response_time, q.interview_performance, q.hire_success,
           q.created_at, q.updated_at,
           r.code AS referral_code, r.status AS referral_status, r.referrer_id, r.job_id,
           j.title AS job_title,
           COALESCE(c.name, r.candidate_name) AS candidate_name,
           r.candidate_email
    FROM referral_quality q
    JOIN referrals r ON r.id = q.referral_id
    JOIN jobs j ON j.id = r.job_id
    LEFT JOIN users c ON c.id = r.referred_candidate_id
"#;

pub struct PgReferralStore {
    pool: PgPool,
}

impl PgReferralStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Locks the referral row for the rest of the transaction.
async fn lock_referral(
    tx: &mut Transaction<'_, Postgres>,
    referral_id: Uuid,
) -> Result<Option<ReferralRow>, AppError> {
    Ok(
        sqlx::query_as::<_, ReferralRow>("SELECT * FROM referrals WHERE id = $1 FOR UPDATE")
            .bind(referral_id)
            .fetch_optional(&mut **tx)
            .await?,
    )
}

/// Writes a status change and, if planned, the payout. The payments unique key
/// turns a racing duplicate into a no-op.
async fn apply_plan(
    tx: &mut Transaction<'_, Postgres>,
    referral: &ReferralRow,
    plan: TransitionPlan,
    payout_currency: &str,
) -> Result<(ReferralRow, Option<PaymentRow>), AppError> {
    let updated = sqlx::query_as::<_, ReferralRow>(
        "UPDATE referrals SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
    )
    .bind(plan.to.as_str())
    .bind(referral.id)
    .fetch_one(&mut **tx)
    .await?;

    let payment = match (plan.create_payout, referral.reward_amount) {
        (true, Some(amount)) => {
            sqlx::query_as::<_, PaymentRow>(
                r#"
                INSERT INTO payments (referral_id, payee_id, amount, currency)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (referral_id) DO NOTHING
                RETURNING *
                "#,
            )
            .bind(referral.id)
            .bind(referral.referrer_id)
            .bind(amount)
            .bind(payout_currency)
            .fetch_optional(&mut **tx)
            .await?
        }
        _ => None,
    };

    info!(
        "Referral {} moved {} -> {} (payout created: {})",
        referral.id,
        plan.from,
        plan.to,
        payment.is_some()
    );

    Ok((updated, payment))
}

#[async_trait]
impl ReferralStore for PgReferralStore {
    async fn find_job(&self, job_id: Uuid) -> Result<Option<JobRow>, AppError> {
        Ok(sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_candidate_id_by_email(&self, email: &str) -> Result<Option<Uuid>, AppError> {
        Ok(sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM users WHERE LOWER(email) = LOWER($1) AND role = 'candidate'",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn insert_referral(&self, referral: &NewReferral) -> Result<Option<ReferralRow>, AppError> {
        Ok(sqlx::query_as::<_, ReferralRow>(
            r#"
            INSERT INTO referrals
                (referrer_id, referred_candidate_id, candidate_email, candidate_name,
                 job_id, code, reward_amount)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (code) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(referral.referrer_id)
        .bind(referral.referred_candidate_id)
        .bind(&referral.candidate_email)
        .bind(&referral.candidate_name)
        .bind(referral.job_id)
        .bind(&referral.code)
        .bind(referral.reward_amount)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn referrals_by_referrer(&self, referrer_id: Uuid) -> Result<Vec<ReferralRow>, AppError> {
        Ok(sqlx::query_as::<_, ReferralRow>(
            "SELECT * FROM referrals WHERE referrer_id = $1 ORDER BY created_at DESC",
        )
        .bind(referrer_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn find_referral(
        &self,
        referral_id: Uuid,
        scope: AccessScope,
    ) -> Result<Option<ReferralRow>, AppError> {
        Ok(sqlx::query_as::<_, ReferralRow>(
            r#"
            SELECT r.*
            FROM referrals r
            JOIN jobs j ON j.id = r.job_id
            WHERE r.id = $1 AND ($2::uuid IS NULL OR j.recruiter_id = $2)
            "#,
        )
        .bind(referral_id)
        .bind(scope.recruiter_id())
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn save_quality(
        &self,
        quality: &NewQuality,
        payout_currency: &str,
    ) -> Result<QualityOutcome, AppError> {
        let mut tx = self.pool.begin().await?;

        let referral = lock_referral(&mut tx, quality.referral_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Referral {} not found", quality.referral_id))
            })?;

        let input = &quality.input;
        let saved = sqlx::query_as::<_, ReferralQualityRow>(
            r#"
            INSERT INTO referral_quality
                (referral_id, quality_score, profile_match, experience_match, skills_match,
                 response_time, interview_performance, hire_success)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (referral_id) DO UPDATE SET
                quality_score = EXCLUDED.quality_score,
                profile_match = EXCLUDED.profile_match,
                experience_match = EXCLUDED.experience_match,
                skills_match = EXCLUDED.skills_match,
                response_time = EXCLUDED.response_time,
                interview_performance = EXCLUDED.interview_performance,
                hire_success = EXCLUDED.hire_success,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(quality.referral_id)
        .bind(quality.quality_score)
        .bind(input.profile_match)
        .bind(input.experience_match)
        .bind(input.skills_match)
        .bind(input.response_time)
        .bind(input.interview_performance)
        .bind(input.hire_success)
        .fetch_one(&mut *tx)
        .await?;

        let mut transition = None;
        let mut payment = None;
        if saved.hire_success {
            let plan = plan_transition(
                referral.status()?,
                ReferralStatus::Hired,
                referral.reward_amount,
            );
            if plan.status_changed {
                let (_, created) = apply_plan(&mut tx, &referral, plan, payout_currency).await?;
                payment = created;
                transition = Some(plan);
            }
        }

        tx.commit().await?;

        info!(
            "Stored quality score {} for referral {}",
            saved.quality_score, saved.referral_id
        );

        Ok(QualityOutcome {
            quality: saved,
            transition,
            payment,
        })
    }

    async fn update_status(
        &self,
        referral_id: Uuid,
        target: ReferralStatus,
        payout_currency: &str,
    ) -> Result<Option<TransitionOutcome>, AppError> {
        let mut tx = self.pool.begin().await?;

        let Some(referral) = lock_referral(&mut tx, referral_id).await? else {
            return Ok(None);
        };

        let plan = plan_transition(referral.status()?, target, referral.reward_amount);
        let (referral, payment) = if plan.status_changed {
            apply_plan(&mut tx, &referral, plan, payout_currency).await?
        } else {
            (referral, None)
        };

        tx.commit().await?;

        Ok(Some(TransitionOutcome {
            referral,
            plan,
            payment,
        }))
    }

    async fn quality_detail(
        &self,
        referral_id: Uuid,
        scope: AccessScope,
    ) -> Result<Option<QualityDetail>, AppError> {
        let sql = format!(
            "{QUALITY_DETAIL_SELECT} WHERE q.referral_id = $1 AND ($2::uuid IS NULL OR j.recruiter_id = $2)"
        );
        Ok(sqlx::query_as::<_, QualityDetail>(&sql)
            .bind(referral_id)
            .bind(scope.recruiter_id())
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn quality_since(
        &self,
        scope: AccessScope,
        since: DateTime<Utc>,
    ) -> Result<Vec<QualityDetail>, AppError> {
        let sql = format!(
            "{QUALITY_DETAIL_SELECT} WHERE q.updated_at >= $1 AND ($2::uuid IS NULL OR j.recruiter_id = $2) ORDER BY q.updated_at ASC"
        );
        Ok(sqlx::query_as::<_, QualityDetail>(&sql)
            .bind(since)
            .bind(scope.recruiter_id())
            .fetch_all(&self.pool)
            .await?)
    }

    async fn referrer_scores_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<ReferrerScoreRow>, AppError> {
        Ok(sqlx::query_as::<_, ReferrerScoreRow>(
            r#"
            SELECT r.referrer_id, u.name AS referrer_name, q.quality_score, q.hire_success
            FROM referral_quality q
            JOIN referrals r ON r.id = q.referral_id
            JOIN users u ON u.id = r.referrer_id
            WHERE q.updated_at >= $1
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn mark_payment_paid(&self, payment_id: Uuid) -> Result<Option<PaymentRow>, AppError> {
        let mut tx = self.pool.begin().await?;

        let payment = sqlx::query_as::<_, PaymentRow>(
            r#"
            UPDATE payments
            SET status = 'PAID', paid_at = COALESCE(paid_at, NOW())
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(payment_id)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(payment) = &payment {
            sqlx::query(
                "UPDATE referrals SET paid_at = $1, updated_at = NOW() WHERE id = $2 AND paid_at IS NULL",
            )
            .bind(payment.paid_at)
            .bind(payment.referral_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(payment)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests (Postgres in a throwaway container; skipped when Docker is unavailable)
// ────────────────────────────────────────────────────────────────────────────
