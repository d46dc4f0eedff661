//! Level curve
//!
//! Cumulative XP thresholds with a title and a color tier per level.

use serde::{Deserialize, Serialize};

/// Level definition
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelDefinition {
    pub level: u32,
    pub xp_required: u64,
    pub title: &'static str,
    pub color: &'static str,
}

/// All level definitions (must be sorted ascending by xp_required)
pub static LEVELS: &[LevelDefinition] = &[
    LevelDefinition { level: 1, xp_required: 0, title: "Rookie", color: "gray" },
    LevelDefinition { level: 2, xp_required: 100, title: "Beginner", color: "green" },
    LevelDefinition { level: 3, xp_required: 250, title: "Regular", color: "green" },
    LevelDefinition { level: 4, xp_required: 500, title: "Committed", color: "blue" },
    LevelDefinition { level: 5, xp_required: 850, title: "Dedicated", color: "blue" },
    LevelDefinition { level: 6, xp_required: 1300, title: "Athlete", color: "purple" },
    LevelDefinition { level: 7, xp_required: 1900, title: "Competitor", color: "purple" },
    LevelDefinition { level: 8, xp_required: 2650, title: "Iron Will", color: "orange" },
    LevelDefinition { level: 9, xp_required: 3600, title: "Powerhouse", color: "orange" },
    LevelDefinition { level: 10, xp_required: 4800, title: "Elite", color: "red" },
    LevelDefinition { level: 11, xp_required: 6300, title: "Champion", color: "red" },
    LevelDefinition { level: 12, xp_required: 8100, title: "Titan", color: "gold" },
    LevelDefinition { level: 13, xp_required: 10300, title: "Legend", color: "gold" },
    LevelDefinition { level: 14, xp_required: 13000, title: "Mythic", color: "platinum" },
    LevelDefinition { level: 15, xp_required: 16500, title: "Immortal", color: "diamond" },
];

impl LevelDefinition {
    /// Highest level whose threshold is at or below `xp`
    pub fn for_xp(xp: u64) -> &'static LevelDefinition {
        LEVELS
            .iter()
            .rev()
            .find(|l| xp >= l.xp_required)
            .unwrap_or(&LEVELS[0])
    }

    /// Next level up, None at the cap
    pub fn next(&self) -> Option<&'static LevelDefinition> {
        LEVELS.iter().find(|l| l.level == self.level + 1)
    }

    pub fn max_level() -> u32 {
        LEVELS.last().map(|l| l.level).unwrap_or(1)
    }
}

/// Where the athlete sits inside their current level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelProgress {
    pub level: u32,
    pub title: String,
    pub color: String,
    pub current_into_level: u64,
    /// XP span of the current level; 0 at the cap
    pub required_for_next: u64,
    /// 0-100, pinned to 100 at the cap
    pub percentage: u32,
    pub next_level: Option<u32>,
}

impl LevelProgress {
    pub fn for_xp(xp: u64) -> Self {
        let current = LevelDefinition::for_xp(xp);
        let current_into_level = xp - current.xp_required;

        match current.next() {
            Some(next) => {
                let required_for_next = next.xp_required - current.xp_required;
                let percentage = if required_for_next == 0 {
                    100
                } else {
                    ((current_into_level as f64 / required_for_next as f64) * 100.0)
                        .round()
                        .min(100.0) as u32
                };
                Self {
                    level: current.level,
                    title: current.title.to_string(),
                    color: current.color.to_string(),
                    current_into_level,
                    required_for_next,
                    percentage,
                    next_level: Some(next.level),
                }
            }
            // Max level: no span to divide by
            None => Self {
                level: current.level,
                title: current.title.to_string(),
                color: current.color.to_string(),
                current_into_level,
                required_for_next: 0,
                percentage: 100,
                next_level: None,
            },
        }
    }
}
