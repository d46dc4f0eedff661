//! Badge definitions and their unlock rules
//!
//! Each badge is a threshold on one monotonically increasing counter, so the
//! whole set is evaluated by a single generic check.

use serde::{Deserialize, Serialize};

use crate::models::ProgressionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

/// Counter a badge threshold is measured against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKey {
    StreakDays,
    TotalWorkouts,
    TotalPrs,
    SharesCount,
    TutorialsWatched,
    /// Highest per-exercise set count
    ExerciseSets,
}

impl StatKey {
    pub fn read(&self, state: &ProgressionState) -> u64 {
        match self {
            Self::StreakDays => state.streak_days as u64,
            Self::TotalWorkouts => state.stats.total_workouts,
            Self::TotalPrs => state.stats.total_prs,
            Self::SharesCount => state.stats.shares_count,
            Self::TutorialsWatched => state.stats.tutorials_watched,
            Self::ExerciseSets => state.stats.max_exercise_sets(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub rarity: Rarity,
    pub icon: &'static str,
    pub xp_bonus: u64,
    pub stat: StatKey,
    pub threshold: u64,
}

impl BadgeDefinition {
    pub fn qualifies(&self, state: &ProgressionState) -> bool {
        self.stat.read(state) >= self.threshold
    }

    pub fn get(id: &str) -> Option<&'static BadgeDefinition> {
        BADGES.iter().find(|b| b.id == id)
    }
}

const fn badge(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    rarity: Rarity,
    icon: &'static str,
    xp_bonus: u64,
    stat: StatKey,
    threshold: u64,
) -> BadgeDefinition {
    BadgeDefinition { id, name, description, rarity, icon, xp_bonus, stat, threshold }
}

pub static BADGES: &[BadgeDefinition] = &[
    // Streaks
    badge("streak_3", "On a Roll", "Train 3 days in a row", Rarity::Common, "🔥", 25, StatKey::StreakDays, 3),
    badge("streak_7", "Week Warrior", "Train 7 days in a row", Rarity::Uncommon, "⚡", 75, StatKey::StreakDays, 7),
    badge("streak_14", "Unstoppable", "Train 14 days in a row", Rarity::Rare, "💪", 150, StatKey::StreakDays, 14),
    badge("streak_30", "Iron Habit", "Train 30 days in a row", Rarity::Epic, "🏆", 400, StatKey::StreakDays, 30),
    badge("streak_100", "Centurion", "Train 100 days in a row", Rarity::Legendary, "👑", 1500, StatKey::StreakDays, 100),
    // Workout milestones
    badge("workouts_1", "First Rep", "Complete your first workout", Rarity::Common, "🎯", 25, StatKey::TotalWorkouts, 1),
    badge("workouts_10", "Getting Serious", "Complete 10 workouts", Rarity::Common, "📈", 75, StatKey::TotalWorkouts, 10),
    badge("workouts_50", "Gym Regular", "Complete 50 workouts", Rarity::Rare, "🏋️", 250, StatKey::TotalWorkouts, 50),
    badge("workouts_100", "Century Club", "Complete 100 workouts", Rarity::Epic, "💯", 500, StatKey::TotalWorkouts, 100),
    // Personal records
    badge("prs_1", "Record Breaker", "Set your first personal record", Rarity::Common, "🥇", 50, StatKey::TotalPrs, 1),
    badge("prs_5", "PR Hunter", "Set 5 personal records", Rarity::Uncommon, "🎖️", 150, StatKey::TotalPrs, 5),
    badge("prs_20", "Limit Breaker", "Set 20 personal records", Rarity::Epic, "🚀", 500, StatKey::TotalPrs, 20),
    // Sharing
    badge("shares_1", "Show Off", "Share a workout", Rarity::Common, "📣", 25, StatKey::SharesCount, 1),
    badge("shares_25", "Influencer", "Share 25 workouts", Rarity::Rare, "🌟", 250, StatKey::SharesCount, 25),
    // Learning
    badge("tutorials_5", "Student of the Game", "Watch 5 technique tutorials", Rarity::Uncommon, "🎓", 75, StatKey::TutorialsWatched, 5),
    // Specialization
    badge("exercise_sets_100", "Specialist", "Log 100 sets of a single exercise", Rarity::Rare, "🔩", 200, StatKey::ExerciseSets, 100),
];
