use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub const DEFAULT_HEADER_THRESHOLD: usize = 3;
pub const STRICT_HEADER_THRESHOLD: usize = 4;
pub const DEFAULT_HEADER_WINDOW: usize = 40;

/// Fallback for counters (groups, interns per group) whose text did not parse.
pub const DEFAULT_COUNTER: u32 = 1;
/// Fallback individual hours for the level-multiplier formula.
pub const DEFAULT_INDIVIDUAL_HOURS: f64 = 4.0;

/// Which hours formula feeds the per-subject rollups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum HoursFormula {
    /// Declared individual hours, or session length × weekday occurrences.
    #[default]
    Calendar,
    /// groups × interns per group × individual hours × level multiplier.
    LevelMultiplier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum WeekdayMode {
    /// Count only the first declared weekday.
    #[default]
    First,
    /// Sum occurrences over every declared weekday.
    All,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub header_threshold: usize,
    pub header_window: usize,
    pub hourly_rate: Option<f64>,
    pub hours_formula: HoursFormula,
    pub weekday_mode: WeekdayMode,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            header_threshold: DEFAULT_HEADER_THRESHOLD,
            header_window: DEFAULT_HEADER_WINDOW,
            hourly_rate: None,
            hours_formula: HoursFormula::default(),
            weekday_mode: WeekdayMode::default(),
        }
    }
}
