use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Portal roles. Only recruiters and admins act on referral quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Candidate,
    Recruiter,
    Expert,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Candidate => "candidate",
            UserRole::Recruiter => "recruiter",
            UserRole::Expert => "expert",
            UserRole::Admin => "admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "candidate" => Ok(UserRole::Candidate),
            "recruiter" => Ok(UserRole::Recruiter),
            "expert" => Ok(UserRole::Expert),
            "admin" => Ok(UserRole::Admin),
            other => Err(format!("Unknown role '{other}'")),
        }
    }
}
