pub mod progression;
pub mod workout;

pub use progression::{
  BonusKind, ChallengeLogEntry, DailyBonus, LifetimeStats, ProgressionState,
  WeeklyChallengeProgress, XpWindow,
};
pub use workout::{
  ExerciseLog, ExerciseLogEntry, PersonalRecord, SetLog, WorkoutCompletion, WorkoutHistoryRecord,
};
