//! Smart coaching messages
//!
//! A fixed rule pipeline over an [`AthleteContext`] derived from workout
//! history. Rules append prioritised candidates, the list is stable-sorted by
//! priority and cut to [`MAX_MESSAGES`]. Wording comes from template buckets
//! picked through the injected [`RandomSource`].

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use crate::analysis::{Readiness, ReadinessStatus};
use crate::models::{PersonalRecord, WorkoutHistoryRecord};
use crate::ports::RandomSource;

pub const MAX_MESSAGES: usize = 4;
const MIN_MESSAGES_BEFORE_FALLBACK: usize = 3;
const COMPLIANCE_WINDOW: usize = 16;
const STREAK_GAP_DAYS: i64 = 2;
const PLATEAU_WEEKS: i64 = 4;
const PLATEAU_MIN_WORKOUTS: usize = 16;
const RECENT_PR_DAYS: i64 = 7;
const DEFAULT_NAME: &str = "there";

/// ---------------------------------------------------------------------------
/// Types
/// ---------------------------------------------------------------------------

/// Ordering is significant: `High` sorts first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
  High,
  Medium,
  Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
  ReturnSupportive,
  ReturnConcern,
  Motivation,
  MissedWorkout,
  ComplianceDrop,
  PrCelebration,
  LongStreak,
  MediumStreak,
  Recovery,
  Plateau,
  HighPerformance,
  CheckInProgress,
  CheckInCasual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartMessage {
  pub kind: MessageKind,
  pub priority: Priority,
  pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceTrend {
  Improving,
  Stable,
  Declining,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentPr {
  pub exercise: String,
  pub weight: f64,
  pub reps: i64,
  pub achieved_at: DateTime<Utc>,
}

/// Everything the rules look at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AthleteContext {
  pub name: Option<String>,
  /// `None` when there is no workout on record
  pub days_since_last_workout: Option<i64>,
  /// Completed workouts per week over the last 28 days
  pub weekly_average: f64,
  pub current_streak: u32,
  /// Newest first
  pub recent_prs: Vec<RecentPr>,
  pub compliance_trend: ComplianceTrend,
  pub plateau: bool,
  pub last_pr_exercise: Option<String>,
  pub readiness_score: u32,
  pub readiness_status: ReadinessStatus,
  pub total_workouts: usize,
}

/// ---------------------------------------------------------------------------
/// Context Derivation
/// ---------------------------------------------------------------------------

impl AthleteContext {
  pub fn derive(
    history: &[WorkoutHistoryRecord],
    prs: &HashMap<String, PersonalRecord>,
    now: DateTime<Utc>,
    name: Option<&str>,
  ) -> Self {
    let today = now.date_naive();

    let days_since_last_workout = history
      .iter()
      .filter(|w| w.completed)
      .map(|w| w.date())
      .max()
      .map(|last| (today - last).num_days().max(0));

    let month_ago = now - Duration::days(28);
    let last_four_weeks = history
      .iter()
      .filter(|w| w.completed && w.performed_at > month_ago && w.performed_at <= now)
      .count();

    let mut recent_prs: Vec<RecentPr> = prs
      .values()
      .filter(|pr| pr.achieved_at <= now && (now - pr.achieved_at).num_days() < RECENT_PR_DAYS)
      .map(|pr| RecentPr {
        exercise: pr.exercise.clone(),
        weight: pr.weight,
        reps: pr.reps,
        achieved_at: pr.achieved_at,
      })
      .collect();
    recent_prs.sort_by(|a, b| b.achieved_at.cmp(&a.achieved_at).then_with(|| a.exercise.cmp(&b.exercise)));

    let last_pr = prs.values().max_by_key(|pr| pr.achieved_at);
    let weeks_since_pr = last_pr.map(|pr| (now - pr.achieved_at).num_weeks());
    let total_workouts = history.len();
    let plateau = weeks_since_pr.map_or(true, |w| w >= PLATEAU_WEEKS) && total_workouts > PLATEAU_MIN_WORKOUTS;

    let readiness = Readiness::compute(history, now);

    Self {
      name: name.map(str::to_string).filter(|n| !n.trim().is_empty()),
      days_since_last_workout,
      weekly_average: last_four_weeks as f64 / 4.0,
      current_streak: current_streak(history, today),
      recent_prs,
      compliance_trend: compliance_trend(history),
      plateau,
      last_pr_exercise: last_pr.map(|pr| pr.exercise.clone()),
      readiness_score: readiness.score,
      readiness_status: readiness.status,
      total_workouts,
    }
  }

  pub fn display_name(&self) -> &str {
    self.name.as_deref().unwrap_or(DEFAULT_NAME)
  }
}

/// Distinct completed workout days, newest first, chained while gaps stay
/// within two days. Zero once the latest workout is more than two days old.
pub fn current_streak(history: &[WorkoutHistoryRecord], today: NaiveDate) -> u32 {
  let days: BTreeSet<NaiveDate> = history
    .iter()
    .filter(|w| w.completed && w.date() <= today)
    .map(|w| w.date())
    .collect();

  let mut newest_first = days.into_iter().rev();
  let Some(mut prev) = newest_first.next() else {
    return 0;
  };
  if (today - prev).num_days() > STREAK_GAP_DAYS {
    return 0;
  }

  let mut streak = 1;
  for day in newest_first {
    if (prev - day).num_days() > STREAK_GAP_DAYS {
      break;
    }
    streak += 1;
    prev = day;
  }
  streak
}

/// Completion rate of the newest 8 workouts against the 8 before them
pub fn compliance_trend(history: &[WorkoutHistoryRecord]) -> ComplianceTrend {
  if history.len() < COMPLIANCE_WINDOW {
    return ComplianceTrend::Stable;
  }

  let mut ordered: Vec<_> = history.iter().collect();
  ordered.sort_by(|a, b| b.performed_at.cmp(&a.performed_at));
  let window = &ordered[..COMPLIANCE_WINDOW];
  let (newer, older) = window.split_at(COMPLIANCE_WINDOW / 2);

  let rate = |half: &[&WorkoutHistoryRecord]| {
    half.iter().filter(|w| w.completed).count() as f64 / half.len() as f64
  };
  let delta = rate(newer) - rate(older);

  if delta > 0.2 {
    ComplianceTrend::Improving
  } else if delta < -0.2 {
    ComplianceTrend::Declining
  } else {
    ComplianceTrend::Stable
  }
}

/// ---------------------------------------------------------------------------
/// Templates
/// ---------------------------------------------------------------------------

impl MessageKind {
  pub fn templates(&self) -> &'static [&'static str] {
    match self {
      MessageKind::ReturnSupportive => &[
        "Hey {name}, it's been {days} days. Life happens. Start with something light today.",
        "{name}, no judgement after {days} days away. One short session gets the ball rolling.",
      ],
      MessageKind::ReturnConcern => &[
        "{days} days without training, {name}. Is something getting in the way? Let's adjust the plan.",
        "It's been {days} days, {name}. Your progress is worth protecting. Can we find 20 minutes this week?",
      ],
      MessageKind::Motivation => &[
        "A week off is fine, {name}. Your strength is still there. Time to use it.",
        "{days} days since your last session. Today is a good day to get back in, {name}.",
        "The bar misses you, {name}. Let's get a workout in.",
      ],
      MessageKind::MissedWorkout => &[
        "Missed a couple of sessions, {name}? Jump back in before it becomes a habit.",
        "{days} days since your last workout. A quick session keeps the rhythm going.",
      ],
      MessageKind::ComplianceDrop => &[
        "You've been finishing fewer workouts lately, {name}. Shorter sessions still count.",
        "Completion is slipping. Try trimming accessories and nail the main lifts.",
      ],
      MessageKind::PrCelebration => &[
        "New PR on {exercise} at {weight} lbs! Great work, {name}!",
        "{weight} lbs on {exercise}. That's a personal record, {name}. Celebrate it.",
        "Huge {exercise} PR: {weight} lbs. The work is paying off.",
      ],
      MessageKind::LongStreak => &[
        "{streak} days strong, {name}. That kind of consistency builds champions.",
        "A {streak}-day streak! You're making training a habit.",
      ],
      MessageKind::MediumStreak => &[
        "{streak}-day streak going, {name}. Keep it alive.",
        "Nice {streak}-day run. Consistency is your superpower.",
      ],
      MessageKind::Recovery => &[
        "Your body is showing fatigue, {name}. A deload or rest day will pay off.",
        "Readiness is low. Prioritise sleep and recovery before the next hard session.",
      ],
      MessageKind::Plateau => &[
        "{exercise} has stalled for a while, {name}. Try a new rep scheme or a variation.",
        "Time to shake up your {exercise} work. A few weeks of change can break the plateau.",
      ],
      MessageKind::HighPerformance => &[
        "Fresh, consistent and setting PRs. You're in a great spot, {name}.",
        "Everything is clicking right now, {name}. Keep doing what you're doing.",
      ],
      MessageKind::CheckInProgress => &[
        "You've put in serious work, {name}. Check your progress and set the next goal.",
        "Every session adds up, {name}. Take a look at how far you've come.",
      ],
      MessageKind::CheckInCasual => &[
        "Hey {name}! Ready for today's workout?",
        "Good to see you, {name}. Let's make today count.",
      ],
    }
  }
}

/// Values substituted into template placeholders
#[derive(Debug, Default, Clone)]
struct TemplateVars<'a> {
  name: &'a str,
  days: Option<i64>,
  streak: Option<u32>,
  exercise: Option<&'a str>,
  weight: Option<f64>,
}

fn format_weight(weight: f64) -> String {
  if weight.fract() == 0.0 {
    format!("{:.0}", weight)
  } else {
    format!("{}", weight)
  }
}

fn interpolate(template: &str, vars: &TemplateVars<'_>) -> String {
  let mut text = template.replace("{name}", vars.name);
  if let Some(days) = vars.days {
    text = text.replace("{days}", &days.to_string());
  }
  if let Some(streak) = vars.streak {
    text = text.replace("{streak}", &streak.to_string());
  }
  if let Some(exercise) = vars.exercise {
    text = text.replace("{exercise}", exercise);
  }
  if let Some(weight) = vars.weight {
    text = text.replace("{weight}", &format_weight(weight));
  }
  text
}

/// ---------------------------------------------------------------------------
/// Rule Pipeline
/// ---------------------------------------------------------------------------

struct Collector<'r> {
  rng: &'r mut dyn RandomSource,
  messages: Vec<SmartMessage>,
}

impl Collector<'_> {
  fn push(&mut self, kind: MessageKind, priority: Priority, vars: &TemplateVars<'_>) {
    let bucket = kind.templates();
    let template = bucket[self.rng.pick(bucket.len())];
    self.messages.push(SmartMessage {
      kind,
      priority,
      text: interpolate(template, vars),
    });
  }
}

/// Run every rule in order and return at most four messages, highest
/// priority first
pub fn select_messages(ctx: &AthleteContext, rng: &mut dyn RandomSource) -> Vec<SmartMessage> {
  let name = ctx.display_name();
  let base = TemplateVars {
    name,
    ..Default::default()
  };
  let mut out = Collector {
    rng,
    messages: Vec::new(),
  };

  // Re-engagement
  if let Some(days) = ctx.days_since_last_workout {
    let vars = TemplateVars {
      days: Some(days),
      ..base.clone()
    };
    if days >= 14 {
      out.push(MessageKind::ReturnSupportive, Priority::High, &vars);
      out.push(MessageKind::ReturnConcern, Priority::High, &vars);
    } else if days >= 7 {
      out.push(MessageKind::Motivation, Priority::Medium, &vars);
    } else if days >= 4 {
      out.push(MessageKind::MissedWorkout, Priority::Low, &vars);
    }
  }

  if ctx.compliance_trend == ComplianceTrend::Declining {
    out.push(MessageKind::ComplianceDrop, Priority::Medium, &base);
  }

  if let Some(pr) = ctx.recent_prs.first() {
    let vars = TemplateVars {
      exercise: Some(&pr.exercise),
      weight: Some(pr.weight),
      ..base.clone()
    };
    out.push(MessageKind::PrCelebration, Priority::High, &vars);
  }

  let streak_vars = TemplateVars {
    streak: Some(ctx.current_streak),
    ..base.clone()
  };
  if ctx.current_streak >= 14 {
    out.push(MessageKind::LongStreak, Priority::Medium, &streak_vars);
  } else if ctx.current_streak >= 7 {
    out.push(MessageKind::MediumStreak, Priority::Low, &streak_vars);
  }

  if ctx.readiness_status == ReadinessStatus::Fatigued || ctx.readiness_score < 40 {
    out.push(MessageKind::Recovery, Priority::High, &base);
  }

  if ctx.plateau {
    let vars = TemplateVars {
      exercise: Some(ctx.last_pr_exercise.as_deref().unwrap_or("your main lifts")),
      ..base.clone()
    };
    out.push(MessageKind::Plateau, Priority::Medium, &vars);
  }

  if ctx.readiness_score > 80 && ctx.weekly_average >= 4.0 && !ctx.recent_prs.is_empty() {
    out.push(MessageKind::HighPerformance, Priority::Low, &base);
  }

  if out.messages.len() < MIN_MESSAGES_BEFORE_FALLBACK {
    let kind = if ctx.total_workouts > 10 {
      MessageKind::CheckInProgress
    } else {
      MessageKind::CheckInCasual
    };
    out.push(kind, Priority::Low, &base);
  }

  let mut messages = out.messages;
  messages.sort_by_key(|m| m.priority);
  messages.truncate(MAX_MESSAGES);

  debug!(count = messages.len(), "Selected coaching messages");
  messages
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ports::FixedRandom;
  use crate::test_utils::{mock_personal_record, mock_workout, mock_workout_with_completion};
  use chrono::TimeZone;

  fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 12, 18, 0, 0).unwrap()
  }

  fn base_context() -> AthleteContext {
    AthleteContext {
      name: Some("Sam".to_string()),
      days_since_last_workout: Some(1),
      weekly_average: 3.0,
      current_streak: 2,
      recent_prs: Vec::new(),
      compliance_trend: ComplianceTrend::Stable,
      plateau: false,
      last_pr_exercise: None,
      readiness_score: 70,
      readiness_status: ReadinessStatus::Good,
      total_workouts: 5,
    }
  }

  fn kinds(messages: &[SmartMessage]) -> Vec<MessageKind> {
    messages.iter().map(|m| m.kind).collect()
  }

  #[test]
  fn test_streak_chains_across_short_gaps() {
    let today = now().date_naive();
    let history = vec![
      mock_workout("Squat", now(), 225.0, 5),
      mock_workout("Squat", now() - Duration::days(2), 225.0, 5),
      mock_workout("Squat", now() - Duration::days(3), 225.0, 5),
      mock_workout("Squat", now() - Duration::days(3) - Duration::hours(2), 225.0, 5),
      // Gap of 3 days breaks the chain
      mock_workout("Squat", now() - Duration::days(6), 225.0, 5),
    ];
    assert_eq!(current_streak(&history, today), 3);
  }

  #[test]
  fn test_streak_zero_when_idle() {
    let today = now().date_naive();
    let history = vec![mock_workout("Squat", now() - Duration::days(3), 225.0, 5)];
    assert_eq!(current_streak(&history, today), 0);
    assert_eq!(current_streak(&[], today), 0);
  }

  #[test]
  fn test_compliance_needs_full_window() {
    let history: Vec<_> = (0..15)
      .map(|i| mock_workout_with_completion(now() - Duration::days(i), i < 8))
      .collect();
    assert_eq!(compliance_trend(&history), ComplianceTrend::Stable);
  }

  #[test]
  fn test_compliance_declining() {
    // Newest 8: 4 completed; older 8: all completed
    let history: Vec<_> = (0..16)
      .map(|i| mock_workout_with_completion(now() - Duration::days(i), i >= 8 || i % 2 == 0))
      .collect();
    assert_eq!(compliance_trend(&history), ComplianceTrend::Declining);
  }

  #[test]
  fn test_compliance_improving() {
    let history: Vec<_> = (0..16)
      .map(|i| mock_workout_with_completion(now() - Duration::days(i), i < 8))
      .collect();
    assert_eq!(compliance_trend(&history), ComplianceTrend::Improving);
  }

  #[test]
  fn test_derive_context() {
    let history = vec![
      mock_workout("Squat", now() - Duration::days(1), 225.0, 5),
      mock_workout("Bench Press", now() - Duration::days(3), 185.0, 5),
      mock_workout("Squat", now() - Duration::days(40), 205.0, 5),
    ];
    let mut prs = HashMap::new();
    prs.insert("Squat".to_string(), mock_personal_record("Squat", 225.0, 5, now() - Duration::days(1)));
    prs.insert(
      "Bench Press".to_string(),
      mock_personal_record("Bench Press", 185.0, 5, now() - Duration::days(20)),
    );

    let ctx = AthleteContext::derive(&history, &prs, now(), None);

    assert_eq!(ctx.display_name(), "there");
    assert_eq!(ctx.days_since_last_workout, Some(1));
    crate::assert_approx_eq!(ctx.weekly_average, 0.5, 1e-9);
    assert_eq!(ctx.current_streak, 2);
    assert_eq!(ctx.recent_prs.len(), 1);
    assert_eq!(ctx.recent_prs[0].exercise, "Squat");
    assert_eq!(ctx.last_pr_exercise.as_deref(), Some("Squat"));
    assert!(!ctx.plateau);
    assert_eq!(ctx.total_workouts, 3);
  }

  #[test]
  fn test_plateau_without_prs_after_many_workouts() {
    let history: Vec<_> = (0..17)
      .map(|i| mock_workout("Row", now() - Duration::days(i * 2), 135.0, 10))
      .collect();
    let ctx = AthleteContext::derive(&history, &HashMap::new(), now(), Some("Sam"));
    assert!(ctx.plateau);
    assert!(ctx.last_pr_exercise.is_none());
  }

  #[test]
  fn test_long_absence_two_high_messages() {
    let ctx = AthleteContext {
      days_since_last_workout: Some(20),
      current_streak: 0,
      ..base_context()
    };
    let messages = select_messages(&ctx, &mut FixedRandom(0.0));

    assert_eq!(messages[0].kind, MessageKind::ReturnSupportive);
    assert_eq!(messages[0].priority, Priority::High);
    assert_eq!(messages[1].kind, MessageKind::ReturnConcern);
    assert!(messages[0].text.contains("Sam"));
    assert!(messages[0].text.contains("20"));
    // Two messages plus one check-in
    assert_eq!(messages.len(), 3);
  }

  #[test]
  fn test_absence_bands() {
    let week = AthleteContext {
      days_since_last_workout: Some(9),
      ..base_context()
    };
    let messages = select_messages(&week, &mut FixedRandom(0.0));
    assert!(messages.iter().any(|m| m.kind == MessageKind::Motivation && m.priority == Priority::Medium));

    let few = AthleteContext {
      days_since_last_workout: Some(5),
      ..base_context()
    };
    let messages = select_messages(&few, &mut FixedRandom(0.0));
    assert!(messages.iter().any(|m| m.kind == MessageKind::MissedWorkout && m.priority == Priority::Low));
  }

  #[test]
  fn test_pr_celebration_interpolates() {
    let ctx = AthleteContext {
      recent_prs: vec![RecentPr {
        exercise: "Deadlift".to_string(),
        weight: 405.0,
        reps: 1,
        achieved_at: now(),
      }],
      ..base_context()
    };
    let messages = select_messages(&ctx, &mut FixedRandom(0.0));
    assert_eq!(messages[0].kind, MessageKind::PrCelebration);
    assert_eq!(messages[0].text, "New PR on Deadlift at 405 lbs! Great work, Sam!");
  }

  #[test]
  fn test_priority_sort_and_truncation() {
    let ctx = AthleteContext {
      days_since_last_workout: Some(0),
      current_streak: 15,
      compliance_trend: ComplianceTrend::Declining,
      recent_prs: vec![RecentPr {
        exercise: "Squat".to_string(),
        weight: 315.0,
        reps: 3,
        achieved_at: now(),
      }],
      readiness_score: 30,
      readiness_status: ReadinessStatus::Fatigued,
      plateau: true,
      last_pr_exercise: Some("Squat".to_string()),
      ..base_context()
    };
    let messages = select_messages(&ctx, &mut FixedRandom(0.0));

    assert_eq!(messages.len(), MAX_MESSAGES);
    assert!(messages.windows(2).all(|w| w[0].priority <= w[1].priority));
    // Stable sort keeps rule order within a priority
    assert_eq!(
      kinds(&messages),
      vec![
        MessageKind::PrCelebration,
        MessageKind::Recovery,
        MessageKind::ComplianceDrop,
        MessageKind::LongStreak,
      ]
    );
  }

  #[test]
  fn test_plateau_generic_fallback() {
    let ctx = AthleteContext {
      plateau: true,
      ..base_context()
    };
    let messages = select_messages(&ctx, &mut FixedRandom(0.0));
    let plateau = messages.iter().find(|m| m.kind == MessageKind::Plateau).unwrap();
    assert!(plateau.text.contains("your main lifts"));
  }

  #[test]
  fn test_high_performance_acknowledged() {
    let ctx = AthleteContext {
      readiness_score: 90,
      readiness_status: ReadinessStatus::Optimal,
      weekly_average: 4.5,
      recent_prs: vec![RecentPr {
        exercise: "Bench Press".to_string(),
        weight: 227.5,
        reps: 2,
        achieved_at: now(),
      }],
      ..base_context()
    };
    let messages = select_messages(&ctx, &mut FixedRandom(0.0));
    assert!(messages.iter().any(|m| m.kind == MessageKind::HighPerformance));
    assert!(messages[0].text.contains("227.5"));
  }

  #[test]
  fn test_fallback_check_in_flavour() {
    let casual = select_messages(&base_context(), &mut FixedRandom(0.0));
    assert_eq!(kinds(&casual), vec![MessageKind::CheckInCasual]);

    let veteran = AthleteContext {
      total_workouts: 40,
      ..base_context()
    };
    let progress = select_messages(&veteran, &mut FixedRandom(0.0));
    assert_eq!(kinds(&progress), vec![MessageKind::CheckInProgress]);
  }

  #[test]
  fn test_template_pick_follows_rng() {
    let first = select_messages(&base_context(), &mut FixedRandom(0.0));
    let last = select_messages(&base_context(), &mut FixedRandom(0.99));
    let bucket = MessageKind::CheckInCasual.templates();
    assert_eq!(first[0].text, bucket[0].replace("{name}", "Sam"));
    assert_eq!(last[0].text, bucket[bucket.len() - 1].replace("{name}", "Sam"));
  }

  #[test]
  fn test_every_template_bucket_nonempty() {
    let all = [
      MessageKind::ReturnSupportive,
      MessageKind::ReturnConcern,
      MessageKind::Motivation,
      MessageKind::MissedWorkout,
      MessageKind::ComplianceDrop,
      MessageKind::PrCelebration,
      MessageKind::LongStreak,
      MessageKind::MediumStreak,
      MessageKind::Recovery,
      MessageKind::Plateau,
      MessageKind::HighPerformance,
      MessageKind::CheckInProgress,
      MessageKind::CheckInCasual,
    ];
    for kind in all {
      assert!(!kind.templates().is_empty(), "{:?}", kind);
    }
  }
}
