//! XP reward table and the variable-reward formula

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::ports::RandomSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    CompleteWorkout,
    CompleteSet,
    StreakBonus,
    PersonalRecord,
    ShareWorkout,
    WatchTutorial,
    DailyGoalMet,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CompleteWorkout => "completeWorkout",
            Self::CompleteSet => "completeSet",
            Self::StreakBonus => "streakBonus",
            Self::PersonalRecord => "personalRecord",
            Self::ShareWorkout => "shareWorkout",
            Self::WatchTutorial => "watchTutorial",
            Self::DailyGoalMet => "dailyGoalMet",
        }
    }

    pub fn reward(&self) -> XpReward {
        match self {
            Self::CompleteWorkout => XpReward { base: 50, variance: 10 },
            Self::CompleteSet => XpReward { base: 5, variance: 2 },
            Self::StreakBonus => XpReward { base: 25, variance: 5 },
            Self::PersonalRecord => XpReward { base: 100, variance: 25 },
            Self::ShareWorkout => XpReward { base: 30, variance: 10 },
            Self::WatchTutorial => XpReward { base: 15, variance: 5 },
            Self::DailyGoalMet => XpReward { base: 40, variance: 10 },
        }
    }

    pub fn all() -> &'static [ActionKind] {
        &[
            Self::CompleteWorkout,
            Self::CompleteSet,
            Self::StreakBonus,
            Self::PersonalRecord,
            Self::ShareWorkout,
            Self::WatchTutorial,
            Self::DailyGoalMet,
        ]
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ActionKind {
    type Err = EngineError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .find(|k| k.as_str() == s)
            .copied()
            .ok_or_else(|| EngineError::UnknownActionKind(s.to_string()))
    }
}

/// Base amount and symmetric spread for one action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpReward {
    pub base: i64,
    pub variance: i64,
}

impl XpReward {
    /// `max(1, round((base + uniform[-variance, variance]) * multiplier))`
    pub fn roll(&self, multiplier: f64, rng: &mut dyn RandomSource) -> u64 {
        let draw = rng.spread(self.variance);
        variance_xp(self.base, draw, multiplier)
    }
}

/// Apply a drawn offset and multiplier, floored at 1
///
/// A multiplier that is not a finite non-negative number counts as 1. Huge
/// finite multipliers saturate at `u64::MAX`.
pub fn variance_xp(base: i64, offset: i64, multiplier: f64) -> u64 {
    let multiplier = sanitize_multiplier(multiplier);
    let raw = ((base + offset) as f64 * multiplier).round();
    if raw.is_nan() || raw < 1.0 {
        1
    } else {
        raw as u64
    }
}

fn sanitize_multiplier(multiplier: f64) -> f64 {
    if multiplier.is_finite() && multiplier >= 0.0 {
        multiplier
    } else {
        1.0
    }
}
