//! In-memory `ReferralStore` for handler tests. Mirrors the Postgres
//! semantics: upsert keyed by referral id, one payout per referral.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::referral::{
    JobRow, PaymentRow, QualityDetail, ReferralQualityRow, ReferralRow, ReferrerScoreRow,
};
use crate::models::user::UserRole;
use crate::referrals::lifecycle::{plan_transition, ReferralStatus, TransitionPlan};
use crate::referrals::store::{
    AccessScope, NewQuality, NewReferral, QualityOutcome, ReferralStore, TransitionOutcome,
};

struct UserRecord {
    name: String,
    email: String,
    role: UserRole,
}

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, UserRecord>,
    jobs: HashMap<Uuid, JobRow>,
    referrals: HashMap<Uuid, ReferralRow>,
    quality: HashMap<Uuid, ReferralQualityRow>,
    payments: Vec<PaymentRow>,
}

#[derive(Default)]
pub struct MemoryReferralStore {
    tables: Mutex<Tables>,
    fail_writes: AtomicBool,
}

impl MemoryReferralStore {
    pub fn add_user(&self, name: &str, email: &str, role: UserRole) -> Uuid {
        let id = Uuid::new_v4();
        self.tables.lock().unwrap().users.insert(
            id,
            UserRecord {
                name: name.to_string(),
                email: email.to_string(),
                role,
            },
        );
        id
    }

    pub fn add_job(&self, recruiter_id: Uuid, title: &str, referral_reward: Option<i64>) -> Uuid {
        let job = JobRow {
            id: Uuid::new_v4(),
            recruiter_id,
            title: title.to_string(),
            referral_reward,
            created_at: Utc::now(),
        };
        let id = job.id;
        self.tables.lock().unwrap().jobs.insert(id, job);
        id
    }

    /// Makes every write fail as if the database were unreachable.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn referral(&self, id: Uuid) -> ReferralRow {
        self.tables.lock().unwrap().referrals[&id].clone()
    }

    pub fn quality(&self, referral_id: Uuid) -> ReferralQualityRow {
        self.tables.lock().unwrap().quality[&referral_id].clone()
    }

    pub fn quality_count(&self) -> usize {
        self.tables.lock().unwrap().quality.len()
    }

    pub fn payments_for(&self, referral_id: Uuid) -> Vec<PaymentRow> {
        self.tables
            .lock()
            .unwrap()
            .payments
            .iter()
            .filter(|p| p.referral_id == referral_id)
            .cloned()
            .collect()
    }

    fn check_writable(&self) -> Result<(), AppError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

impl Tables {
    fn in_scope(&self, referral: &ReferralRow, scope: AccessScope) -> bool {
        self.jobs
            .get(&referral.job_id)
            .map(|job| scope.recruiter_id().map_or(true, |id| id == job.recruiter_id))
            .unwrap_or(false)
    }

    fn detail(&self, quality: &ReferralQualityRow) -> Option<QualityDetail> {
        let referral = self.referrals.get(&quality.referral_id)?;
        let job = self.jobs.get(&referral.job_id)?;
        let candidate_name = referral
            .referred_candidate_id
            .and_then(|id| self.users.get(&id))
            .map(|u| u.name.clone())
            .or_else(|| referral.candidate_name.clone());
        Some(QualityDetail {
            id: quality.id,
            referral_id: quality.referral_id,
            quality_score: quality.quality_score,
            profile_match: quality.profile_match,
            experience_match: quality.experience_match,
            skills_match: quality.skills_match,
            response_time: quality.response_time,
            interview_performance: quality.interview_performance,
            hire_success: quality.hire_success,
            created_at: quality.created_at,
            updated_at: quality.updated_at,
            referral_code: referral.code.clone(),
            referral_status: referral.status.clone(),
            referrer_id: referral.referrer_id,
            job_id: referral.job_id,
            job_title: job.title.clone(),
            candidate_name,
            candidate_email: referral.candidate_email.clone(),
        })
    }

    fn apply_plan(
        &mut self,
        referral_id: Uuid,
        plan: TransitionPlan,
        currency: &str,
    ) -> (ReferralRow, Option<PaymentRow>) {
        let now = Utc::now();
        let referral = self
            .referrals
            .get_mut(&referral_id)
            .expect("referral locked by caller");
        referral.status = plan.to.as_str().to_string();
        referral.updated_at = now;
        let referral = referral.clone();

        let already_paid_out = self.payments.iter().any(|p| p.referral_id == referral_id);
        let payment = match (plan.create_payout, referral.reward_amount) {
            (true, Some(amount)) if !already_paid_out => {
                let payment = PaymentRow {
                    id: Uuid::new_v4(),
                    referral_id,
                    payee_id: referral.referrer_id,
                    amount,
                    currency: currency.to_string(),
                    status: "PENDING".to_string(),
                    created_at: now,
                    paid_at: None,
                };
                self.payments.push(payment.clone());
                Some(payment)
            }
            _ => None,
        };
        (referral, payment)
    }
}

#[async_trait]
impl ReferralStore for MemoryReferralStore {
    async fn find_job(&self, job_id: Uuid) -> Result<Option<JobRow>, AppError> {
        Ok(self.tables.lock().unwrap().jobs.get(&job_id).cloned())
    }

    async fn find_candidate_id_by_email(&self, email: &str) -> Result<Option<Uuid>, AppError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|(_, u)| u.role == UserRole::Candidate && u.email.eq_ignore_ascii_case(email))
            .map(|(id, _)| *id))
    }

    async fn insert_referral(&self, referral: &NewReferral) -> Result<Option<ReferralRow>, AppError> {
        self.check_writable()?;
        let mut tables = self.tables.lock().unwrap();
        if tables.referrals.values().any(|r| r.code == referral.code) {
            return Ok(None);
        }
        let now = Utc::now();
        let row = ReferralRow {
            id: Uuid::new_v4(),
            referrer_id: referral.referrer_id,
            referred_candidate_id: referral.referred_candidate_id,
            candidate_email: referral.candidate_email.clone(),
            candidate_name: referral.candidate_name.clone(),
            job_id: referral.job_id,
            code: referral.code.clone(),
            status: ReferralStatus::Pending.as_str().to_string(),
            reward_amount: referral.reward_amount,
            created_at: now,
            updated_at: now,
            paid_at: None,
        };
        tables.referrals.insert(row.id, row.clone());
        Ok(Some(row))
    }

    async fn referrals_by_referrer(&self, referrer_id: Uuid) -> Result<Vec<ReferralRow>, AppError> {
        let tables = self.tables.lock().unwrap();
        let mut rows: Vec<ReferralRow> = tables
            .referrals
            .values()
            .filter(|r| r.referrer_id == referrer_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn find_referral(
        &self,
        referral_id: Uuid,
        scope: AccessScope,
    ) -> Result<Option<ReferralRow>, AppError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .referrals
            .get(&referral_id)
            .filter(|r| tables.in_scope(r, scope))
            .cloned())
    }

    async fn save_quality(
        &self,
        quality: &NewQuality,
        payout_currency: &str,
    ) -> Result<QualityOutcome, AppError> {
        self.check_writable()?;
        let mut tables = self.tables.lock().unwrap();
        let referral = tables
            .referrals
            .get(&quality.referral_id)
            .cloned()
            .ok_or_else(|| {
                AppError::NotFound(format!("Referral {} not found", quality.referral_id))
            })?;

        let now = Utc::now();
        let input = &quality.input;
        let (id, created_at) = tables
            .quality
            .get(&quality.referral_id)
            .map(|existing| (existing.id, existing.created_at))
            .unwrap_or_else(|| (Uuid::new_v4(), now));
        let saved = ReferralQualityRow {
            id,
            referral_id: quality.referral_id,
            quality_score: quality.quality_score,
            profile_match: input.profile_match,
            experience_match: input.experience_match,
            skills_match: input.skills_match,
            response_time: input.response_time,
            interview_performance: input.interview_performance,
            hire_success: input.hire_success,
            created_at,
            updated_at: now,
        };
        tables.quality.insert(quality.referral_id, saved.clone());

        let mut transition = None;
        let mut payment = None;
        if saved.hire_success {
            let plan = plan_transition(
                referral.status()?,
                ReferralStatus::Hired,
                referral.reward_amount,
            );
            if plan.status_changed {
                let (_, created) = tables.apply_plan(referral.id, plan, payout_currency);
                payment = created;
                transition = Some(plan);
            }
        }

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
        self.check_writable()?;
        let mut tables = self.tables.lock().unwrap();
        let Some(referral) = tables.referrals.get(&referral_id).cloned() else {
            return Ok(None);
        };

        let plan = plan_transition(referral.status()?, target, referral.reward_amount);
        let (referral, payment) = if plan.status_changed {
            tables.apply_plan(referral_id, plan, payout_currency)
        } else {
            (referral, None)
        };

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
        let tables = self.tables.lock().unwrap();
        let Some(quality) = tables.quality.get(&referral_id) else {
            return Ok(None);
        };
        let referral = &tables.referrals[&referral_id];
        if !tables.in_scope(referral, scope) {
            return Ok(None);
        }
        Ok(tables.detail(quality))
    }

    async fn quality_since(
        &self,
        scope: AccessScope,
        since: DateTime<Utc>,
    ) -> Result<Vec<QualityDetail>, AppError> {
        let tables = self.tables.lock().unwrap();
        let mut details: Vec<QualityDetail> = tables
            .quality
            .values()
            .filter(|q| q.updated_at >= since)
            .filter(|q| tables.in_scope(&tables.referrals[&q.referral_id], scope))
            .filter_map(|q| tables.detail(q))
            .collect();
        details.sort_by(|a, b| a.updated_at.cmp(&b.updated_at));
        Ok(details)
    }

    async fn referrer_scores_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<ReferrerScoreRow>, AppError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .quality
            .values()
            .filter(|q| q.updated_at >= since)
            .filter_map(|q| {
                let referral = tables.referrals.get(&q.referral_id)?;
                let referrer = tables.users.get(&referral.referrer_id)?;
                Some(ReferrerScoreRow {
                    referrer_id: referral.referrer_id,
                    referrer_name: referrer.name.clone(),
                    quality_score: q.quality_score,
                    hire_success: q.hire_success,
                })
            })
            .collect())
    }

    async fn mark_payment_paid(&self, payment_id: Uuid) -> Result<Option<PaymentRow>, AppError> {
        self.check_writable()?;
        let mut tables = self.tables.lock().unwrap();
        let Some(payment) = tables.payments.iter_mut().find(|p| p.id == payment_id) else {
            return Ok(None);
        };
        payment.status = "PAID".to_string();
        let paid_at = *payment.paid_at.get_or_insert_with(Utc::now);
        let payment = payment.clone();

        if let Some(referral) = tables.referrals.get_mut(&payment.referral_id) {
            referral.paid_at.get_or_insert(paid_at);
        }
        Ok(Some(payment))
    }
}
