use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::config::{
    ExtractionConfig, HoursFormula, WeekdayMode, DEFAULT_COUNTER, DEFAULT_INDIVIDUAL_HOURS,
};
use crate::models::{ActivityRecord, Normalized, TimeRange};

/// Fills the derived hour and value fields of extracted records.
pub struct WorkloadCalculator {
    hourly_rate: Option<f64>,
    formula: HoursFormula,
    weekday_mode: WeekdayMode,
}

impl WorkloadCalculator {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            hourly_rate: config.hourly_rate,
            formula: config.hours_formula,
            weekday_mode: config.weekday_mode,
        }
    }

    pub fn apply(&self, record: &mut ActivityRecord) {
        record.computed_individual_hours = match declared_hours(record) {
            Some(_) => None,
            None => Some(calendar_hours(record, self.weekday_mode)),
        };

        record.computed_total_value = if record.value.as_ref().is_some_and(Normalized::is_parsed) {
            None
        } else {
            Some(total_value(
                self.hourly_rate,
                effective_hours(record),
                vacancy_count(record),
            ))
        };

        record.planned_hours = match self.formula {
            HoursFormula::LevelMultiplier => Some(level_multiplier_hours(record)),
            HoursFormula::Calendar => None,
        };
    }

    /// Hours a record contributes to rollups under the selected formula.
    pub fn rollup_hours(&self, record: &ActivityRecord) -> f64 {
        match self.formula {
            HoursFormula::Calendar => effective_hours(record),
            HoursFormula::LevelMultiplier => record
                .planned_hours
                .unwrap_or_else(|| level_multiplier_hours(record)),
        }
    }
}

/// Declared individual hours, when the source carries a usable positive value.
pub fn declared_hours(record: &ActivityRecord) -> Option<f64> {
    record
        .individual_hours
        .as_ref()
        .and_then(|hours| hours.parsed().copied())
        .filter(|hours| *hours > 0.0)
}

/// Declared hours if present, otherwise the computed ones.
pub fn effective_hours(record: &ActivityRecord) -> f64 {
    declared_hours(record)
        .or(record.computed_individual_hours)
        .unwrap_or(0.0)
}

/// Session length × occurrences of the declared weekday(s) between the
/// start and end dates. Any missing input yields zero.
pub fn calendar_hours(record: &ActivityRecord, mode: WeekdayMode) -> f64 {
    let start = record.start_date.as_ref().and_then(|d| d.parsed());
    let end = record.end_date.as_ref().and_then(|d| d.parsed());
    let days = record.weekdays.as_ref().and_then(|w| w.parsed());
    let range = record.time_range.as_ref().and_then(|r| r.parsed());

    let (Some(start), Some(end), Some(days), Some(range)) = (start, end, days, range) else {
        return 0.0;
    };

    let occurrences: u32 = match mode {
        WeekdayMode::First => days
            .first()
            .map(|day| weekday_occurrences(*start, *end, day))
            .unwrap_or(0),
        WeekdayMode::All => days
            .days()
            .iter()
            .map(|day| weekday_occurrences(*start, *end, *day))
            .sum(),
    };

    round2(session_hours(range) * occurrences as f64)
}

pub fn session_hours(range: &TimeRange) -> f64 {
    let minutes = range.minutes();
    if minutes <= 0 {
        return 0.0;
    }
    minutes as f64 / 60.0
}

/// How many times `weekday` falls within `start..=end`.
pub fn weekday_occurrences(start: NaiveDate, end: NaiveDate, weekday: Weekday) -> u32 {
    let offset = (weekday.num_days_from_monday() as i64
        - start.weekday().num_days_from_monday() as i64)
        .rem_euclid(7);
    let first = start + Duration::days(offset);
    if first > end {
        return 0;
    }
    ((end - first).num_days() / 7 + 1) as u32
}

pub fn vacancy_count(record: &ActivityRecord) -> u32 {
    let groups = record
        .group_count
        .as_ref()
        .map(|count| count.parsed_or(DEFAULT_COUNTER))
        .unwrap_or(0);
    let interns = record
        .interns_per_group
        .as_ref()
        .map(|count| count.parsed_or(DEFAULT_COUNTER))
        .unwrap_or(0);
    groups.saturating_mul(interns)
}

pub fn total_value(hourly_rate: Option<f64>, hours: f64, vacancies: u32) -> f64 {
    match hourly_rate {
        Some(rate) if rate > 0.0 && hours > 0.0 && vacancies > 0 => {
            round2(rate * hours * vacancies as f64)
        }
        _ => 0.0,
    }
}

/// Planned hours with the level multiplier: level `M` counts once, every
/// other level twice. Missing counters default to 1, missing hours to 4.
pub fn level_multiplier_hours(record: &ActivityRecord) -> f64 {
    let groups = record
        .group_count
        .as_ref()
        .map_or(DEFAULT_COUNTER, |count| count.parsed_or(DEFAULT_COUNTER));
    let interns = record
        .interns_per_group
        .as_ref()
        .map_or(DEFAULT_COUNTER, |count| count.parsed_or(DEFAULT_COUNTER));
    let hours = declared_hours(record).unwrap_or(DEFAULT_INDIVIDUAL_HOURS);
    let multiplier = match record.level.as_deref().map(str::trim) {
        Some(level) if level.eq_ignore_ascii_case("m") => 1.0,
        _ => 2.0,
    };

    round2(groups as f64 * interns as f64 * hours * multiplier)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WeekdaySet;
    use chrono::NaiveTime;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn range(start: u32, end: u32) -> TimeRange {
        TimeRange {
            start: NaiveTime::from_hms_opt(start, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(end, 0, 0).unwrap(),
        }
    }

    fn scheduled(days: &[Weekday]) -> ActivityRecord {
        ActivityRecord {
            start_date: Some(Normalized::Parsed(date(2025, 2, 3))),
            end_date: Some(Normalized::Parsed(date(2025, 2, 7))),
            weekdays: Some(Normalized::Parsed(WeekdaySet::from_days(days.iter().copied()))),
            time_range: Some(Normalized::Parsed(range(7, 17))),
            ..ActivityRecord::default()
        }
    }

    #[test]
    fn single_monday_in_one_week() {
        let mut record = scheduled(&[Weekday::Mon]);
        WorkloadCalculator::new(&ExtractionConfig::default()).apply(&mut record);
        assert_eq!(record.computed_individual_hours, Some(10.0));
    }

    #[test]
    fn occurrences_count_inclusive_range() {
        assert_eq!(weekday_occurrences(date(2025, 2, 3), date(2025, 2, 28), Weekday::Mon), 4);
        assert_eq!(weekday_occurrences(date(2025, 2, 3), date(2025, 2, 28), Weekday::Fri), 4);
        assert_eq!(weekday_occurrences(date(2025, 2, 3), date(2025, 2, 7), Weekday::Sat), 0);
        assert_eq!(weekday_occurrences(date(2025, 2, 4), date(2025, 2, 10), Weekday::Mon), 1);
        assert_eq!(weekday_occurrences(date(2025, 2, 10), date(2025, 2, 3), Weekday::Mon), 0);
    }

    #[test]
    fn backwards_session_counts_zero() {
        assert_eq!(session_hours(&range(17, 7)), 0.0);
        assert_eq!(session_hours(&range(8, 12)), 4.0);
    }

    #[test]
    fn first_weekday_only_by_default() {
        let record = scheduled(&[Weekday::Mon, Weekday::Wed]);
        assert_eq!(calendar_hours(&record, WeekdayMode::First), 10.0);
        assert_eq!(calendar_hours(&record, WeekdayMode::All), 20.0);
    }

    #[test]
    fn declared_hours_skip_computation() {
        let mut record = scheduled(&[Weekday::Mon]);
        record.individual_hours = Some(Normalized::Parsed(40.0));
        WorkloadCalculator::new(&ExtractionConfig::default()).apply(&mut record);
        assert_eq!(record.computed_individual_hours, None);
        assert_eq!(effective_hours(&record), 40.0);
    }

    #[test]
    fn unparsed_declared_hours_are_recomputed() {
        let mut record = scheduled(&[Weekday::Mon]);
        record.individual_hours = Some(Normalized::Unparsed("a combinar".to_string()));
        WorkloadCalculator::new(&ExtractionConfig::default()).apply(&mut record);
        assert_eq!(record.computed_individual_hours, Some(10.0));
    }

    #[test]
    fn missing_calendar_data_yields_zero_hours() {
        let mut record = scheduled(&[Weekday::Mon]);
        record.time_range = Some(Normalized::Unparsed("lunch".to_string()));
        WorkloadCalculator::new(&ExtractionConfig::default()).apply(&mut record);
        assert_eq!(record.computed_individual_hours, Some(0.0));
    }

    #[test]
    fn total_value_needs_rate_hours_and_vacancies() {
        let config = ExtractionConfig {
            hourly_rate: Some(12.5),
            ..ExtractionConfig::default()
        };
        let mut record = scheduled(&[Weekday::Mon]);
        record.group_count = Some(Normalized::Parsed(2));
        record.interns_per_group = Some(Normalized::Parsed(3));
        WorkloadCalculator::new(&config).apply(&mut record);
        assert_eq!(vacancy_count(&record), 6);
        assert_eq!(record.computed_total_value, Some(750.0));

        let mut no_groups = scheduled(&[Weekday::Mon]);
        WorkloadCalculator::new(&config).apply(&mut no_groups);
        assert_eq!(no_groups.computed_total_value, Some(0.0));

        let mut no_rate = record.clone();
        WorkloadCalculator::new(&ExtractionConfig::default()).apply(&mut no_rate);
        assert_eq!(no_rate.computed_total_value, Some(0.0));
    }

    #[test]
    fn declared_value_is_not_recomputed() {
        let mut record = scheduled(&[Weekday::Mon]);
        record.value = Some(Normalized::Parsed(900.0));
        WorkloadCalculator::new(&ExtractionConfig::default()).apply(&mut record);
        assert_eq!(record.computed_total_value, None);
    }

    #[test]
    fn unparsed_counters_fall_back_to_one() {
        let mut record = ActivityRecord::default();
        record.group_count = Some(Normalized::Unparsed("vários".to_string()));
        record.interns_per_group = Some(Normalized::Parsed(4));
        assert_eq!(vacancy_count(&record), 4);
    }

    #[test]
    fn level_multiplier_formula() {
        let mut record = ActivityRecord {
            level: Some("G".to_string()),
            group_count: Some(Normalized::Parsed(2)),
            interns_per_group: Some(Normalized::Parsed(5)),
            individual_hours: Some(Normalized::Parsed(30.0)),
            ..ActivityRecord::default()
        };
        assert_eq!(level_multiplier_hours(&record), 600.0);

        record.level = Some("M".to_string());
        assert_eq!(level_multiplier_hours(&record), 300.0);

        assert_eq!(level_multiplier_hours(&ActivityRecord::default()), 8.0);
    }

    #[test]
    fn formula_selects_rollup_hours() {
        let config = ExtractionConfig {
            hours_formula: HoursFormula::LevelMultiplier,
            ..ExtractionConfig::default()
        };
        let calculator = WorkloadCalculator::new(&config);
        let mut record = scheduled(&[Weekday::Mon]);
        calculator.apply(&mut record);
        assert_eq!(record.computed_individual_hours, Some(10.0));
        assert_eq!(record.planned_hours, Some(8.0));
        assert_eq!(calculator.rollup_hours(&record), 8.0);

        let calendar = WorkloadCalculator::new(&ExtractionConfig::default());
        let mut record = scheduled(&[Weekday::Mon]);
        calendar.apply(&mut record);
        assert_eq!(record.planned_hours, None);
        assert_eq!(calendar.rollup_hours(&record), 10.0);
    }

    #[test]
    fn rounds_to_two_places() {
        assert_eq!(round2(1.0 / 3.0), 0.33);
        assert_eq!(round2(2.675_1), 2.68);
    }
}
