//! Gamification: XP, levels, badges, streaks, weekly challenges, daily bonus

mod badges;
mod challenges;
mod engine;
mod levels;
mod rewards;

pub use badges::{BadgeDefinition, Rarity, StatKey, BADGES};
pub use challenges::{week_start, ChallengeDefinition, ChallengeMetric, CHALLENGES};
pub use engine::{
    ActionReward, ChallengeExerciseResult, ChallengeStatus, ChallengeUpdate, ProgressionEngine,
    ProgressionSnapshot, StreakUpdate, WorkoutReward, XpAward, BONUS_BADGE_PROGRESS_XP,
    XP_PER_LOGGED_SET,
};
pub use levels::{LevelDefinition, LevelProgress, LEVELS};
pub use rewards::{variance_xp, ActionKind, XpReward};

/// Level number for a cumulative XP total
pub fn level_from_xp(xp: u64) -> u32 {
    LevelDefinition::for_xp(xp).level
}
