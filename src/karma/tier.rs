//! Security Tier Rule
//!
//! Tiers are a pure function of the karma score. Thresholds are inclusive
//! lower bounds, checked from the highest tier down.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Security level, ordered by ascending threshold
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Tier {
    #[default]
    Rookie,
    Guardian,
    Sentinel,
    #[serde(rename = "Cyber Knight")]
    CyberKnight,
}

impl Tier {
    pub const GUARDIAN_THRESHOLD: i64 = 50;
    pub const SENTINEL_THRESHOLD: i64 = 150;
    pub const CYBER_KNIGHT_THRESHOLD: i64 = 300;

    /// Map a score to its tier
    pub fn for_score(score: i64) -> Tier {
        if score >= Self::CYBER_KNIGHT_THRESHOLD {
            Tier::CyberKnight
        } else if score >= Self::SENTINEL_THRESHOLD {
            Tier::Sentinel
        } else if score >= Self::GUARDIAN_THRESHOLD {
            Tier::Guardian
        } else {
            Tier::Rookie
        }
    }

    /// Minimum score for this tier (`None` for the open-ended bottom tier)
    pub fn threshold(&self) -> Option<i64> {
        match self {
            Tier::Rookie => None,
            Tier::Guardian => Some(Self::GUARDIAN_THRESHOLD),
            Tier::Sentinel => Some(Self::SENTINEL_THRESHOLD),
            Tier::CyberKnight => Some(Self::CYBER_KNIGHT_THRESHOLD),
        }
    }

    pub fn next(&self) -> Option<Tier> {
        match self {
            Tier::Rookie => Some(Tier::Guardian),
            Tier::Guardian => Some(Tier::Sentinel),
            Tier::Sentinel => Some(Tier::CyberKnight),
            Tier::CyberKnight => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Rookie => "Rookie",
            Tier::Guardian => "Guardian",
            Tier::Sentinel => "Sentinel",
            Tier::CyberKnight => "Cyber Knight",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Rookie" => Ok(Tier::Rookie),
            "Guardian" => Ok(Tier::Guardian),
            "Sentinel" => Ok(Tier::Sentinel),
            "Cyber Knight" => Ok(Tier::CyberKnight),
            other => Err(format!("Unknown tier: {}", other)),
        }
    }
}

/// Shorthand for [`Tier::for_score`]
pub fn tier_for(score: i64) -> Tier {
    Tier::for_score(score)
}

/// Distance from a score to the next tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierProgress {
    pub current: Tier,
    pub next: Option<Tier>,
    /// Points still needed to reach `next` (0 at the top tier)
    pub points_needed: i64,
}

pub fn progress(score: i64) -> TierProgress {
    let current = Tier::for_score(score);
    let next = current.next();
    let points_needed = next
        .and_then(|tier| tier.threshold())
        .map(|threshold| threshold - score)
        .unwrap_or(0);

    TierProgress {
        current,
        next,
        points_needed,
    }
}
