//! Weekly challenge catalog
//!
//! The active challenge is a pure function of time: whole weeks since the Unix
//! epoch, modulo the catalog length. Nothing about the rotation is persisted.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::{ExerciseLogEntry, WorkoutCompletion};

const WEEK_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// What a challenge counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeMetric {
    /// One per completed workout
    Workouts,
    /// Weight x reps, from workouts and logged exercises
    Volume,
    /// Sets, from workouts and logged exercises
    Sets,
    /// Sets, from logged exercises only
    LoggedSets,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub target: f64,
    pub unit: &'static str,
    pub xp_reward: u64,
    pub metric: ChallengeMetric,
}

pub static CHALLENGES: &[ChallengeDefinition] = &[
    ChallengeDefinition {
        id: "consistency",
        name: "Consistency Is King",
        description: "Complete 4 workouts this week",
        target: 4.0,
        unit: "workouts",
        xp_reward: 150,
        metric: ChallengeMetric::Workouts,
    },
    ChallengeDefinition {
        id: "volume_boost",
        name: "Volume Boost",
        description: "Move 20,000 lbs of total volume this week",
        target: 20_000.0,
        unit: "lbs",
        xp_reward: 200,
        metric: ChallengeMetric::Volume,
    },
    ChallengeDefinition {
        id: "set_crusher",
        name: "Set Crusher",
        description: "Complete 75 sets this week",
        target: 75.0,
        unit: "sets",
        xp_reward: 200,
        metric: ChallengeMetric::Sets,
    },
    ChallengeDefinition {
        id: "upper_body",
        name: "Upper Body Blitz",
        description: "Log 40 sets of upper body work",
        target: 40.0,
        unit: "sets",
        xp_reward: 175,
        metric: ChallengeMetric::LoggedSets,
    },
    ChallengeDefinition {
        id: "leg_day",
        name: "Never Skip Leg Day",
        description: "Log 30 sets of leg work",
        target: 30.0,
        unit: "sets",
        xp_reward: 175,
        metric: ChallengeMetric::LoggedSets,
    },
    ChallengeDefinition {
        id: "compound_king",
        name: "Compound King",
        description: "Log 25 sets of squats, deadlifts, bench or overhead press",
        target: 25.0,
        unit: "sets",
        xp_reward: 200,
        metric: ChallengeMetric::LoggedSets,
    },
];

impl ChallengeDefinition {
    pub fn get(id: &str) -> Option<&'static ChallengeDefinition> {
        CHALLENGES.iter().find(|c| c.id == id)
    }

    /// Same as [`ChallengeDefinition::get`], failing with `UnknownChallenge`
    pub fn parse(id: &str) -> EngineResult<&'static ChallengeDefinition> {
        Self::get(id).ok_or_else(|| EngineError::UnknownChallenge(id.to_string()))
    }

    /// Challenge in rotation at `now`
    pub fn current(now: DateTime<Utc>) -> &'static ChallengeDefinition {
        let weeks = now.timestamp_millis().div_euclid(WEEK_MS);
        let idx = weeks.rem_euclid(CHALLENGES.len() as i64) as usize;
        &CHALLENGES[idx]
    }

    /// Progress contributed by a completed workout
    pub fn workout_contribution(&self, workout: &WorkoutCompletion) -> f64 {
        match self.metric {
            ChallengeMetric::Workouts => 1.0,
            ChallengeMetric::Volume => workout.total_volume,
            ChallengeMetric::Sets => workout.total_sets as f64,
            ChallengeMetric::LoggedSets => 0.0,
        }
    }

    /// Progress contributed by a manually logged exercise
    pub fn exercise_contribution(&self, entry: &ExerciseLogEntry) -> f64 {
        match self.metric {
            ChallengeMetric::Workouts => 0.0,
            ChallengeMetric::Volume => entry.volume(),
            ChallengeMetric::Sets | ChallengeMetric::LoggedSets => entry.sets as f64,
        }
    }
}

/// Monday of the ISO week containing `date`
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}
