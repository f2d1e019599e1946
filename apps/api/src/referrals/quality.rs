//! Referral Quality Scorer: turns recruiter-supplied signals into a 0-100 score.
//!
//! The score is a pure function of its inputs, so a stored `quality_score`
//! can always be recomputed from the sub-scores stored next to it.

use serde::{Deserialize, Serialize};

/// Weights of the four base signals. They sum to exactly 1.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityWeights {
    pub profile_match: f64,
    pub experience_match: f64,
    pub skills_match: f64,
    pub response_time: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            profile_match: 0.30,
            experience_match: 0.25,
            skills_match: 0.25,
            response_time: 0.20,
        }
    }
}

/// Hours per day used by the response-time decay.
const HOURS_PER_DAY: f64 = 24.0;
/// Points lost per elapsed day of response time.
const RESPONSE_DECAY_PER_DAY: f64 = 10.0;
/// Share of the blended score taken by interview performance.
const INTERVIEW_BLEND: f64 = 0.2;
const HIRE_BONUS: f64 = 1.2;
const MAX_SCORE: f64 = 100.0;

/// Raw signals for one referral assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityInput {
    pub profile_match: f64,
    pub experience_match: f64,
    pub skills_match: f64,
    /// Hours between referral creation and the candidate's first action.
    pub response_time: f64,
    /// `None` (or 0) means "not interviewed yet", not a zero score.
    pub interview_performance: Option<f64>,
    pub hire_success: bool,
}

impl QualityInput {
    /// Returns the name of the first non-finite field, if any.
    pub fn first_non_finite(&self) -> Option<&'static str> {
        let fields = [
            ("profileMatch", Some(self.profile_match)),
            ("experienceMatch", Some(self.experience_match)),
            ("skillsMatch", Some(self.skills_match)),
            ("responseTime", Some(self.response_time)),
            ("interviewPerformance", self.interview_performance),
        ];
        fields
            .into_iter()
            .find(|(_, v)| v.map(|v| !v.is_finite()).unwrap_or(false))
            .map(|(name, _)| name)
    }
}

/// Linear decay: 100 at zero hours, minus 10 points per day, floored at 0.
pub fn response_time_component(response_time_hours: f64) -> f64 {
    (MAX_SCORE - (response_time_hours / HOURS_PER_DAY * RESPONSE_DECAY_PER_DAY)).max(0.0)
}

/// Computes the quality score with the default weights.
pub fn compute_quality_score(input: &QualityInput) -> i32 {
    compute_quality_score_with(input, &QualityWeights::default())
}

pub fn compute_quality_score_with(input: &QualityInput, weights: &QualityWeights) -> i32 {
    let profile = clamp_percent(input.profile_match);
    let experience = clamp_percent(input.experience_match);
    let skills = clamp_percent(input.skills_match);
    let response = response_time_component(input.response_time.max(0.0));

    let mut score = profile * weights.profile_match
        + experience * weights.experience_match
        + skills * weights.skills_match
        + response * weights.response_time;

    let interview = input.interview_performance.map(clamp_percent).unwrap_or(0.0);
    if interview > 0.0 {
        score = score * (1.0 - INTERVIEW_BLEND) + interview * INTERVIEW_BLEND;
    }

    if input.hire_success {
        score = (score * HIRE_BONUS).min(MAX_SCORE);
    }

    score.round().clamp(0.0, MAX_SCORE) as i32
}

fn clamp_percent(value: f64) -> f64 {
    value.clamp(0.0, MAX_SCORE)
}
