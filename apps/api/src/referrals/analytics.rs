use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::referral::{QualityDetail, ReferrerScoreRow};

pub const DEFAULT_WINDOW_DAYS: i64 = 30;
pub const MAX_WINDOW_DAYS: i64 = 365;
const TOP_PERFORMER_LIMIT: usize = 5;

/// Bucket bounds are inclusive, listed highest first.
const QUALITY_BUCKETS: &[(&str, &str, i32, i32)] = &[
    ("80-100", "Excellent", 80, 100),
    ("60-79", "Good", 60, 79),
    ("40-59", "Average", 40, 59),
    ("0-39", "Below Average", 0, 39),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionBucket {
    pub range: String,
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopPerformer {
    pub referral_id: Uuid,
    pub referral_code: String,
    pub referrer_id: Uuid,
    pub job_title: String,
    pub candidate_name: Option<String>,
    pub quality_score: i32,
    pub hire_success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub average_score: i64,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub average_quality_score: i64,
    pub total_referrals: usize,
    pub successful_hires: usize,
    /// Percentage with one decimal, or "0" when there is nothing to rate.
    pub success_rate: String,
    pub quality_distribution: Vec<DistributionBucket>,
    pub top_performers: Vec<TopPerformer>,
    pub trends: Vec<TrendPoint>,
    pub period_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub referrer_id: Uuid,
    pub referrer_name: String,
    pub average_quality_score: i64,
    pub total_referrals: usize,
    pub hires: usize,
}

/// Validates the analytics window, falling back to 30 days.
pub fn resolve_window(days: Option<i64>) -> Result<i64, AppError> {
    match days {
        None => Ok(DEFAULT_WINDOW_DAYS),
        Some(d) if (1..=MAX_WINDOW_DAYS).contains(&d) => Ok(d),
        Some(d) => Err(AppError::Validation(format!(
            "days must be between 1 and {MAX_WINDOW_DAYS}, got {d}"
        ))),
    }
}

/// Label of the bucket a score falls in.
pub fn bucket_label(score: i32) -> &'static str {
    QUALITY_BUCKETS
        .iter()
        .find(|(_, _, min, max)| (*min..=*max).contains(&score.clamp(0, 100)))
        .map(|(_, label, _, _)| *label)
        .unwrap_or("Below Average")
}

/// Aggregates the quality records of one analytics window.
pub fn summarize(records: &[QualityDetail], period_days: i64) -> AnalyticsSummary {
    let total_referrals = records.len();
    let successful_hires = records.iter().filter(|r| r.hire_success).count();

    let average_quality_score = average_score(records.iter().map(|r| r.quality_score));

    let success_rate = if total_referrals > 0 {
        format!(
            "{:.1}",
            successful_hires as f64 / total_referrals as f64 * 100.0
        )
    } else {
        "0".to_string()
    };

    let quality_distribution = QUALITY_BUCKETS
        .iter()
        .map(|(range, label, _, _)| DistributionBucket {
            range: range.to_string(),
            label: label.to_string(),
            count: records
                .iter()
                .filter(|r| bucket_label(r.quality_score) == *label)
                .count(),
        })
        .filter(|b| b.count > 0)
        .collect();

    let mut ranked: Vec<&QualityDetail> = records.iter().collect();
    ranked.sort_by(|a, b| {
        b.quality_score
            .cmp(&a.quality_score)
            .then_with(|| b.updated_at.cmp(&a.updated_at))
    });
    let top_performers = ranked
        .into_iter()
        .take(TOP_PERFORMER_LIMIT)
        .map(|r| TopPerformer {
            referral_id: r.referral_id,
            referral_code: r.referral_code.clone(),
            referrer_id: r.referrer_id,
            job_title: r.job_title.clone(),
            candidate_name: r.candidate_name.clone(),
            quality_score: r.quality_score,
            hire_success: r.hire_success,
        })
        .collect();

    let mut by_day: BTreeMap<NaiveDate, Vec<i32>> = BTreeMap::new();
    for r in records {
        by_day
            .entry(r.updated_at.date_naive())
            .or_default()
            .push(r.quality_score);
    }
    let trends = by_day
        .into_iter()
        .map(|(date, scores)| TrendPoint {
            date,
            count: scores.len(),
            average_score: average_score(scores.into_iter()),
        })
        .collect();

    AnalyticsSummary {
        average_quality_score,
        total_referrals,
        successful_hires,
        success_rate,
        quality_distribution,
        top_performers,
        trends,
        period_days,
    }
}

/// Ranks referrers by average quality, then hires, then volume. Name and
/// referrer id settle any remaining tie so the order is stable.
pub fn build_leaderboard(rows: &[ReferrerScoreRow], limit: usize) -> Vec<LeaderboardEntry> {
    struct Tally<'a> {
        name: &'a str,
        scores: Vec<i32>,
        hires: usize,
    }

    let mut tallies: HashMap<Uuid, Tally<'_>> = HashMap::new();
    for row in rows {
        let tally = tallies.entry(row.referrer_id).or_insert_with(|| Tally {
            name: &row.referrer_name,
            scores: Vec::new(),
            hires: 0,
        });
        tally.scores.push(row.quality_score);
        if row.hire_success {
            tally.hires += 1;
        }
    }

    let mut entries: Vec<LeaderboardEntry> = tallies
        .into_iter()
        .map(|(referrer_id, tally)| LeaderboardEntry {
            rank: 0,
            referrer_id,
            referrer_name: tally.name.to_string(),
            total_referrals: tally.scores.len(),
            average_quality_score: average_score(tally.scores.into_iter()),
            hires: tally.hires,
        })
        .collect();

    entries.sort_by(|a, b| {
        b.average_quality_score
            .cmp(&a.average_quality_score)
            .then_with(|| b.hires.cmp(&a.hires))
            .then_with(|| b.total_referrals.cmp(&a.total_referrals))
            .then_with(|| a.referrer_name.cmp(&b.referrer_name))
            .then_with(|| a.referrer_id.cmp(&b.referrer_id))
    });
    entries.truncate(limit);
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = i + 1;
    }
    entries
}

fn average_score(scores: impl Iterator<Item = i32>) -> i64 {
    let (sum, count) = scores.fold((0i64, 0i64), |(s, c), v| (s + v as i64, c + 1));
    if count == 0 {
        return 0;
    }
    (sum as f64 / count as f64).round() as i64
}
