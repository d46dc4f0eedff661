//! Progression Engine
//!
//! Mutates one athlete's `ProgressionState` in response to training events:
//! - variable XP awards (base +/- variance, times the daily bonus)
//! - calendar-day streaks
//! - one-time badge unlocks with fixed XP bonuses
//! - weekly challenge progress with a one-time completion reward
//! - a once-per-day bonus roll
//!
//! Key principles:
//! - Every XP grant flows through one path, so totalXP is the sum of grants
//! - Badges and challenge rewards are granted at most once
//! - Unknown action kinds or challenge ids award nothing instead of failing
//! - Time and randomness are injected

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::badges::{BadgeDefinition, BADGES};
use super::challenges::{week_start, ChallengeDefinition};
use super::levels::{LevelDefinition, LevelProgress};
use super::rewards::ActionKind;
use crate::models::{
    BonusKind, ChallengeLogEntry, DailyBonus, ExerciseLogEntry, ProgressionState,
    WeeklyChallengeProgress, WorkoutCompletion,
};
use crate::ports::{Clock, RandomSource};

/// Flat XP per manually logged set
pub const XP_PER_LOGGED_SET: u64 = 5;

/// Flat XP granted when the bonus roll lands on bonusBadgeProgress
pub const BONUS_BADGE_PROGRESS_XP: u64 = 25;

// Cumulative thresholds for the single daily draw
// (2% triple, 10% double, 15% bonus badge progress)
const TRIPLE_XP_THRESHOLD: f64 = 0.02;
const DOUBLE_XP_THRESHOLD: f64 = 0.12;
const BONUS_BADGE_THRESHOLD: f64 = 0.27;

// ---------------------------------------------------------------------------
/// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XpAward {
    #[serde(rename = "earnedXP")]
    pub earned_xp: u64,
    #[serde(rename = "totalXP")]
    pub total_xp: u64,
    pub level: u32,
    pub level_progress: LevelProgress,
    pub leveled_up: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakUpdate {
    pub streak_days: u32,
    #[serde(rename = "streakBonusXP")]
    pub streak_bonus_xp: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeUpdate {
    pub challenge_id: String,
    pub progress: f64,
    pub target: f64,
    pub completed: bool,
    /// True only on the call that crossed the target
    pub just_completed: bool,
    #[serde(rename = "rewardXP")]
    pub reward_xp: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutReward {
    pub challenge: ChallengeUpdate,
    pub streak: StreakUpdate,
    pub xp: XpAward,
    #[serde(rename = "dailyGoalXP")]
    pub daily_goal_xp: u64,
    pub new_badges: Vec<&'static BadgeDefinition>,
    #[serde(rename = "totalXP")]
    pub total_xp: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeExerciseResult {
    #[serde(rename = "xpGained")]
    pub xp_gained: u64,
    #[serde(rename = "totalXP")]
    pub total_xp: u64,
    pub level: u32,
    pub new_progress: f64,
    pub challenge_completed: bool,
    pub new_badges: Vec<&'static BadgeDefinition>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionReward {
    pub xp: XpAward,
    pub new_badges: Vec<&'static BadgeDefinition>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeStatus {
    pub definition: &'static ChallengeDefinition,
    pub progress: f64,
    pub percentage: u32,
    pub completed: bool,
    pub week_start_date: Option<NaiveDate>,
}

/// Everything presentation needs in one read
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionSnapshot {
    #[serde(rename = "totalXP")]
    pub total_xp: u64,
    pub level_progress: LevelProgress,
    pub streak_days: u32,
    pub badges: Vec<&'static BadgeDefinition>,
    pub challenge: ChallengeStatus,
    pub daily_bonus: Option<DailyBonus>,
    #[serde(rename = "dailyXP")]
    pub daily_xp: u64,
    #[serde(rename = "weeklyXP")]
    pub weekly_xp: u64,
    /// Today's XP against the daily goal, 0-100
    pub daily_goal_percentage: u32,
    /// This week's XP against the weekly goal, 0-100
    pub weekly_goal_percentage: u32,
}

// ---------------------------------------------------------------------------
/// Engine
// ---------------------------------------------------------------------------

pub struct ProgressionEngine<'a> {
    state: &'a mut ProgressionState,
    clock: &'a dyn Clock,
    rng: &'a mut dyn RandomSource,
}

impl<'a> ProgressionEngine<'a> {
    pub fn new(
        state: &'a mut ProgressionState,
        clock: &'a dyn Clock,
        rng: &'a mut dyn RandomSource,
    ) -> Self {
        Self { state, clock, rng }
    }

    pub fn state(&self) -> &ProgressionState {
        &*self.state
    }

    // -----------------------------------------------------------------------
    // XP
    // -----------------------------------------------------------------------

    /// Award XP for an action using the variance formula
    pub fn award_xp(&mut self, kind: ActionKind, multiplier: f64) -> XpAward {
        let level_before = LevelDefinition::for_xp(self.state.current_xp).level;
        let earned = kind.reward().roll(multiplier, self.rng);
        self.grant(earned, kind.as_str());
        self.xp_award(earned, level_before)
    }

    /// Award XP by action name; unknown names award nothing
    pub fn award_xp_named(&mut self, action: &str, multiplier: f64) -> XpAward {
        match action.parse::<ActionKind>() {
            Ok(kind) => self.award_xp(kind, multiplier),
            Err(e) => {
                tracing::warn!("{}, no XP awarded", e);
                let level = LevelDefinition::for_xp(self.state.current_xp).level;
                self.xp_award(0, level)
            }
        }
    }

    /// Multiplier from today's bonus roll, 1.0 otherwise
    pub fn bonus_multiplier(&self) -> f64 {
        let today = self.clock.today();
        self.state
            .daily_bonus
            .as_ref()
            .filter(|b| b.rolled_on == today)
            .map(|b| b.multiplier)
            .unwrap_or(1.0)
    }

    /// One-shot dailyGoalMet award once today's XP reaches the daily goal
    pub fn claim_daily_goal(&mut self) -> u64 {
        let today = self.clock.today();
        self.state.daily_xp.roll(today);
        let window = &self.state.daily_xp;
        if window.goal_met || window.amount < window.goal {
            return 0;
        }
        self.state.daily_xp.goal_met = true;
        let earned = ActionKind::DailyGoalMet.reward().roll(1.0, self.rng);
        self.grant(earned, ActionKind::DailyGoalMet.as_str());
        earned
    }

    fn grant(&mut self, amount: u64, reason: &str) {
        if amount == 0 {
            return;
        }
        let today = self.clock.today();

        self.state.total_xp = self.state.total_xp.saturating_add(amount);
        self.state.current_xp = self.state.current_xp.saturating_add(amount);

        self.state.daily_xp.roll(today);
        self.state.daily_xp.amount = self.state.daily_xp.amount.saturating_add(amount);

        self.state.weekly_xp.roll(week_start(today));
        self.state.weekly_xp.amount = self.state.weekly_xp.amount.saturating_add(amount);
        if self.state.weekly_xp.amount >= self.state.weekly_xp.goal {
            self.state.weekly_xp.goal_met = true;
        }

        tracing::debug!(
            "Granted {} XP for {} (total {})",
            amount,
            reason,
            self.state.total_xp
        );
    }

    fn xp_award(&self, earned: u64, level_before: u32) -> XpAward {
        let level_progress = LevelProgress::for_xp(self.state.current_xp);
        if level_progress.level > level_before {
            tracing::info!(
                "Level up: {} -> {} ({})",
                level_before,
                level_progress.level,
                level_progress.title
            );
        }
        XpAward {
            earned_xp: earned,
            total_xp: self.state.total_xp,
            level: level_progress.level,
            leveled_up: level_progress.level > level_before,
            level_progress,
        }
    }

    // -----------------------------------------------------------------------
    // Badges
    // -----------------------------------------------------------------------

    /// Unlock every qualifying badge not yet earned, granting its fixed bonus
    pub fn evaluate_badges(&mut self) -> Vec<&'static BadgeDefinition> {
        let mut newly_earned = Vec::new();

        for badge in BADGES {
            if self.state.has_badge(badge.id) || !badge.qualifies(&*self.state) {
                continue;
            }
            self.state.earned_badges.insert(badge.id.to_string());
            self.grant(badge.xp_bonus, badge.id);
            tracing::info!("Badge unlocked: {} (+{} XP)", badge.id, badge.xp_bonus);
            newly_earned.push(badge);
        }

        newly_earned
    }

    // -----------------------------------------------------------------------
    // Streak
    // -----------------------------------------------------------------------

    /// Advance the calendar-day streak
    ///
    /// Same day: unchanged. Yesterday: +1. Anything else, including the very
    /// first workout, sets the streak to 1.
    pub fn update_streak(&mut self) -> StreakUpdate {
        let today = self.clock.today();

        match self.state.last_workout_date {
            Some(last) if last == today => {
                return StreakUpdate {
                    streak_days: self.state.streak_days,
                    streak_bonus_xp: 0,
                };
            }
            Some(last) if last.succ_opt() == Some(today) => {
                self.state.streak_days += 1;
            }
            _ => {
                self.state.streak_days = 1;
            }
        }
        self.state.last_workout_date = Some(today);

        let bonus = self.award_xp(ActionKind::StreakBonus, 1.0);
        tracing::debug!("Streak now {} days", self.state.streak_days);

        StreakUpdate {
            streak_days: self.state.streak_days,
            streak_bonus_xp: bonus.earned_xp,
        }
    }

    // -----------------------------------------------------------------------
    // Weekly Challenge
    // -----------------------------------------------------------------------

    /// Reset challenge progress if a new Monday-start week has begun
    ///
    /// Returns the definition the stored progress belongs to.
    fn sync_weekly_challenge(&mut self) -> &'static ChallengeDefinition {
        let this_week = week_start(self.clock.today());

        if self.state.weekly_challenge.week_start_date != Some(this_week) {
            let current = ChallengeDefinition::current(self.clock.now());
            tracing::info!(
                "New challenge week {}: {} (was {:?})",
                this_week,
                current.id,
                self.state.weekly_challenge.week_start_date
            );
            self.state.weekly_challenge = WeeklyChallengeProgress {
                challenge_id: current.id.to_string(),
                progress: 0.0,
                completed: false,
                week_start_date: Some(this_week),
            };
            return current;
        }

        ChallengeDefinition::get(&self.state.weekly_challenge.challenge_id)
            .unwrap_or_else(|| ChallengeDefinition::current(self.clock.now()))
    }

    /// Add progress to the active challenge, paying its reward once
    fn advance_challenge(
        &mut self,
        definition: &'static ChallengeDefinition,
        amount: f64,
    ) -> ChallengeUpdate {
        if amount > 0.0 {
            self.state.weekly_challenge.progress += amount;
        }

        let mut just_completed = false;
        let mut reward_xp = 0;
        if !self.state.weekly_challenge.completed
            && self.state.weekly_challenge.progress >= definition.target
        {
            self.state.weekly_challenge.completed = true;
            self.grant(definition.xp_reward, definition.id);
            just_completed = true;
            reward_xp = definition.xp_reward;
            tracing::info!("Weekly challenge {} completed (+{} XP)", definition.id, reward_xp);
        }

        ChallengeUpdate {
            challenge_id: definition.id.to_string(),
            progress: self.state.weekly_challenge.progress,
            target: definition.target,
            completed: self.state.weekly_challenge.completed,
            just_completed,
            reward_xp,
        }
    }

    pub fn challenge_status(&mut self) -> ChallengeStatus {
        let definition = self.sync_weekly_challenge();
        let progress = self.state.weekly_challenge.progress;
        let percentage = if definition.target > 0.0 {
            ((progress / definition.target) * 100.0).round().min(100.0) as u32
        } else {
            100
        };
        ChallengeStatus {
            definition,
            progress,
            percentage,
            completed: self.state.weekly_challenge.completed,
            week_start_date: self.state.weekly_challenge.week_start_date,
        }
    }

    /// Exercise log entries from the current week only
    pub fn challenge_log_this_week(&self) -> Vec<&ChallengeLogEntry> {
        let this_week = week_start(self.clock.today());
        self.state
            .challenge_log
            .iter()
            .filter(|e| e.log_date() >= this_week)
            .collect()
    }

    // -----------------------------------------------------------------------
    // Recording Actions
    // -----------------------------------------------------------------------

    /// Workout completed: challenge, streak, XP, daily goal, then badges
    pub fn record_workout(&mut self, workout: &WorkoutCompletion) -> WorkoutReward {
        self.state.stats.total_workouts += 1;

        let definition = self.sync_weekly_challenge();
        let contribution = definition.workout_contribution(workout);
        let challenge = self.advance_challenge(definition, contribution);

        let streak = self.update_streak();
        let multiplier = self.bonus_multiplier();
        let xp = self.award_xp(ActionKind::CompleteWorkout, multiplier);
        let daily_goal_xp = self.claim_daily_goal();
        let new_badges = self.evaluate_badges();

        WorkoutReward {
            challenge,
            streak,
            xp,
            daily_goal_xp,
            new_badges,
            total_xp: self.state.total_xp,
        }
    }

    /// Manually logged exercise toward a weekly challenge
    ///
    /// Pays a flat rate per set rather than the variance formula.
    pub fn record_challenge_exercise(
        &mut self,
        challenge_id: &str,
        entry: &ExerciseLogEntry,
    ) -> ChallengeExerciseResult {
        let requested = match ChallengeDefinition::parse(challenge_id) {
            Ok(definition) => definition,
            Err(e) => {
                tracing::warn!("{}, no XP awarded", e);
                return ChallengeExerciseResult {
                    xp_gained: 0,
                    total_xp: self.state.total_xp,
                    level: LevelDefinition::for_xp(self.state.current_xp).level,
                    new_progress: self.state.weekly_challenge.progress,
                    challenge_completed: self.state.weekly_challenge.completed,
                    new_badges: Vec::new(),
                };
            }
        };

        let active = self.sync_weekly_challenge();
        let now = self.clock.now();
        let today = self.clock.today();
        let this_week = week_start(today);
        let volume = entry.volume();

        self.state.challenge_log.retain(|e| e.log_date() >= this_week);
        self.state.challenge_log.push(ChallengeLogEntry {
            challenge_id: requested.id.to_string(),
            exercise_name: entry.exercise_name.clone(),
            sets: entry.sets,
            reps: entry.reps,
            weight: entry.weight,
            volume,
            logged_at: now,
            logged_on: Some(today),
        });

        let stats = &mut self.state.stats;
        *stats
            .exercise_set_counts
            .entry(entry.exercise_name.clone())
            .or_insert(0) += entry.sets as u64;
        stats.total_sets += entry.sets as u64;
        stats.total_volume += volume;

        let multiplier = self.bonus_multiplier();
        let flat_xp = (entry.sets as f64 * XP_PER_LOGGED_SET as f64 * multiplier).round() as u64;
        self.grant(flat_xp, "loggedSets");

        let mut xp_gained = flat_xp;
        if active.id == requested.id {
            let update = self.advance_challenge(active, requested.exercise_contribution(entry));
            xp_gained = xp_gained.saturating_add(update.reward_xp);
        } else {
            tracing::debug!(
                "{} logged against inactive challenge {} (active: {})",
                entry.exercise_name,
                requested.id,
                active.id
            );
        }

        let new_badges = self.evaluate_badges();

        ChallengeExerciseResult {
            xp_gained,
            total_xp: self.state.total_xp,
            level: LevelDefinition::for_xp(self.state.current_xp).level,
            new_progress: self.state.weekly_challenge.progress,
            challenge_completed: self.state.weekly_challenge.completed,
            new_badges,
        }
    }

    pub fn record_pr(&mut self) -> ActionReward {
        self.state.stats.total_prs += 1;
        let multiplier = self.bonus_multiplier();
        self.reward_action(ActionKind::PersonalRecord, multiplier)
    }

    pub fn record_share(&mut self) -> ActionReward {
        self.state.stats.shares_count += 1;
        let multiplier = self.bonus_multiplier();
        self.reward_action(ActionKind::ShareWorkout, multiplier)
    }

    pub fn record_tutorial_watched(&mut self) -> ActionReward {
        self.state.stats.tutorials_watched += 1;
        self.reward_action(ActionKind::WatchTutorial, 1.0)
    }

    /// Generic set completion, paid with the variance formula
    pub fn record_set_completed(&mut self) -> ActionReward {
        let multiplier = self.bonus_multiplier();
        self.reward_action(ActionKind::CompleteSet, multiplier)
    }

    fn reward_action(&mut self, kind: ActionKind, multiplier: f64) -> ActionReward {
        let xp = self.award_xp(kind, multiplier);
        let new_badges = self.evaluate_badges();
        ActionReward { xp, new_badges }
    }

    // -----------------------------------------------------------------------
    // Daily Bonus
    // -----------------------------------------------------------------------

    /// Roll the daily bonus once per calendar day; repeat calls return the
    /// cached result
    pub fn check_daily_bonus(&mut self) -> Option<DailyBonus> {
        let today = self.clock.today();

        if self.state.last_bonus_check == Some(today) {
            return self
                .state
                .daily_bonus
                .clone()
                .filter(|b| b.rolled_on == today);
        }
        self.state.last_bonus_check = Some(today);

        let draw = self.rng.next_f64();
        let kind = if draw < TRIPLE_XP_THRESHOLD {
            Some((BonusKind::TripleXp, 3.0))
        } else if draw < DOUBLE_XP_THRESHOLD {
            Some((BonusKind::DoubleXp, 2.0))
        } else if draw < BONUS_BADGE_THRESHOLD {
            Some((BonusKind::BonusBadgeProgress, 1.0))
        } else {
            None
        };

        self.state.daily_bonus = kind.map(|(kind, multiplier)| DailyBonus {
            kind,
            multiplier,
            rolled_on: today,
        });

        match &self.state.daily_bonus {
            Some(bonus) => {
                tracing::info!("Daily bonus rolled: {} (draw {:.3})", bonus.kind.as_str(), draw);
                if bonus.kind == BonusKind::BonusBadgeProgress {
                    self.grant(BONUS_BADGE_PROGRESS_XP, bonus.kind.as_str());
                }
            }
            None => tracing::debug!("No daily bonus today (draw {:.3})", draw),
        }

        self.state.daily_bonus.clone()
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    pub fn snapshot(&mut self) -> ProgressionSnapshot {
        let challenge = self.challenge_status();
        let today = self.clock.today();
        self.state.daily_xp.roll(today);
        self.state.weekly_xp.roll(week_start(today));

        ProgressionSnapshot {
            total_xp: self.state.total_xp,
            level_progress: LevelProgress::for_xp(self.state.current_xp),
            streak_days: self.state.streak_days,
            badges: BADGES
                .iter()
                .filter(|b| self.state.has_badge(b.id))
                .collect(),
            challenge,
            daily_bonus: self
                .state
                .daily_bonus
                .clone()
                .filter(|b| b.rolled_on == today),
            daily_xp: self.state.daily_xp.amount,
            weekly_xp: self.state.weekly_xp.amount,
            daily_goal_percentage: self.state.daily_xp.percentage(),
            weekly_goal_percentage: self.state.weekly_xp.percentage(),
        }
    }
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------
