use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Referral lifecycle: PENDING -> APPLIED -> INTERVIEW -> HIRED, REJECTED from anywhere.
/// Transitions are set directly by an admin or the owning recruiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferralStatus {
    Pending,
    Applied,
    Interview,
    Hired,
    Rejected,
}

impl ReferralStatus {
    pub const ALL: [ReferralStatus; 5] = [
        ReferralStatus::Pending,
        ReferralStatus::Applied,
        ReferralStatus::Interview,
        ReferralStatus::Hired,
        ReferralStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReferralStatus::Pending => "PENDING",
            ReferralStatus::Applied => "APPLIED",
            ReferralStatus::Interview => "INTERVIEW",
            ReferralStatus::Hired => "HIRED",
            ReferralStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for ReferralStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferralStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReferralStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown referral status '{s}'"))
    }
}

/// What a status change must do, decided before anything is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionPlan {
    pub from: ReferralStatus,
    pub to: ReferralStatus,
    pub status_changed: bool,
    /// True only when entering HIRED from another state with a reward set.
    pub create_payout: bool,
}

impl TransitionPlan {
    pub fn enters_hired(&self) -> bool {
        self.status_changed && self.to == ReferralStatus::Hired
    }
}

pub fn plan_transition(
    current: ReferralStatus,
    target: ReferralStatus,
    reward_amount: Option<i64>,
) -> TransitionPlan {
    let status_changed = current != target;
    let create_payout = target == ReferralStatus::Hired
        && current != ReferralStatus::Hired
        && reward_amount.is_some();

    TransitionPlan {
        from: current,
        to: target,
        status_changed,
        create_payout,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("hired".parse::<ReferralStatus>(), Ok(ReferralStatus::Hired));
        assert_eq!(
            " Interview ".parse::<ReferralStatus>(),
            Ok(ReferralStatus::Interview)
        );
        assert!("ONBOARDED".parse::<ReferralStatus>().is_err());
    }

    #[test]
    fn test_display_matches_storage_form() {
        for status in ReferralStatus::ALL {
            assert_eq!(status.to_string().parse::<ReferralStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_serde_uses_upper_case() {
        let json = serde_json::to_string(&ReferralStatus::Interview).unwrap();
        assert_eq!(json, "\"INTERVIEW\"");
    }

    #[test]
    fn test_entering_hired_with_reward_creates_payout() {
        for from in [
            ReferralStatus::Pending,
            ReferralStatus::Applied,
            ReferralStatus::Interview,
            ReferralStatus::Rejected,
        ] {
            let plan = plan_transition(from, ReferralStatus::Hired, Some(50_000));
            assert!(plan.status_changed);
            assert!(plan.create_payout, "from {from}");
            assert!(plan.enters_hired());
        }
    }

    #[test]
    fn test_hired_to_hired_is_noop() {
        let plan = plan_transition(ReferralStatus::Hired, ReferralStatus::Hired, Some(50_000));
        assert!(!plan.status_changed);
        assert!(!plan.create_payout);
        assert!(!plan.enters_hired());
    }

    #[test]
    fn test_no_reward_no_payout() {
        let plan = plan_transition(ReferralStatus::Interview, ReferralStatus::Hired, None);
        assert!(plan.status_changed);
        assert!(!plan.create_payout);
    }

    #[test]
    fn test_only_hired_target_creates_payout() {
        for from in ReferralStatus::ALL {
            for to in ReferralStatus::ALL {
                let plan = plan_transition(from, to, Some(1));
                assert_eq!(plan.status_changed, from != to);
                assert_eq!(
                    plan.create_payout,
                    to == ReferralStatus::Hired && from != ReferralStatus::Hired
                );
            }
        }
    }
}
