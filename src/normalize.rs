//! Field normalizers. Each one is total: unrecognized input comes back as
//! `Normalized::Unparsed` with the original trimmed text.

use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;

use crate::models::{Cell, Normalized, TimeRange, WeekdaySet, WEEK};
use crate::text;
use crate::vocabulary::Vocabulary;

fn iso_date_re() -> &'static Regex {
    static ISO_DATE_RE: OnceLock<Regex> = OnceLock::new();
    ISO_DATE_RE.get_or_init(|| {
        Regex::new(r"^([0-9]{4})-([0-9]{1,2})-([0-9]{1,2})(?:[ T].*)?$").expect("valid iso date regex")
    })
}

fn day_first_date_re() -> &'static Regex {
    static DAY_FIRST_DATE_RE: OnceLock<Regex> = OnceLock::new();
    DAY_FIRST_DATE_RE.get_or_init(|| {
        Regex::new(r"^([0-9]{1,2})([/-])([0-9]{1,2})([/-])([0-9]{4}|[0-9]{2})$")
            .expect("valid day-first date regex")
    })
}

fn range_connector_re() -> &'static Regex {
    static RANGE_CONNECTOR_RE: OnceLock<Regex> = OnceLock::new();
    RANGE_CONNECTOR_RE.get_or_init(|| {
        Regex::new(r"\s*(?:-|–|—|\bate\b|\bas\b|\ba\b|\bto\b)\s*")
            .expect("valid time range connector regex")
    })
}

fn digit_run_re() -> &'static Regex {
    static DIGIT_RUN_RE: OnceLock<Regex> = OnceLock::new();
    DIGIT_RUN_RE.get_or_init(|| Regex::new(r"[0-9]+").expect("valid digit regex"))
}

fn grouped_thousands_re() -> &'static Regex {
    static GROUPED_THOUSANDS_RE: OnceLock<Regex> = OnceLock::new();
    GROUPED_THOUSANDS_RE.get_or_init(|| {
        Regex::new(r"^-?[0-9]{1,3}(?:\.[0-9]{3})+$").expect("valid thousands regex")
    })
}

const RANGE_SEPARATOR: char = '|';

pub fn normalize_date(cell: &Cell) -> Normalized<NaiveDate> {
    match cell {
        Cell::Date(value) => Normalized::Parsed(value.date()),
        other => normalize_date_text(&other.as_text()),
    }
}

/// Accepts `yyyy-mm-dd`, `dd/mm/yyyy` and `dd-mm-yyyy`. Two-digit years are
/// read as `20yy`.
pub fn normalize_date_text(raw: &str) -> Normalized<NaiveDate> {
    let trimmed = raw.trim();

    if let Some(caps) = iso_date_re().captures(trimmed) {
        return ymd(&caps[1], &caps[2], &caps[3])
            .map(Normalized::Parsed)
            .unwrap_or_else(|| Normalized::Unparsed(trimmed.to_string()));
    }

    if let Some(caps) = day_first_date_re().captures(trimmed) {
        if caps[2] != caps[4] {
            return Normalized::Unparsed(trimmed.to_string());
        }
        let year = if caps[5].len() == 2 {
            format!("20{}", &caps[5])
        } else {
            caps[5].to_string()
        };
        return ymd(&year, &caps[3], &caps[1])
            .map(Normalized::Parsed)
            .unwrap_or_else(|| Normalized::Unparsed(trimmed.to_string()));
    }

    Normalized::Unparsed(trimmed.to_string())
}

fn ymd(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

/// Reads ranges such as `7 as 17`, `07:00-12:00`, `8h às 12h30` or
/// `0700 - 1300` into a `TimeRange`.
pub fn normalize_time_range(raw: &str) -> Normalized<TimeRange> {
    let trimmed = raw.trim();
    let unparsed = || Normalized::Unparsed(trimmed.to_string());

    let folded = text::strip_accents(&trimmed.to_lowercase());
    let separated = range_connector_re().replace_all(&folded, RANGE_SEPARATOR.to_string());
    let halves: Vec<&str> = separated
        .split(RANGE_SEPARATOR)
        .map(str::trim)
        .filter(|half| !half.is_empty())
        .collect();

    let times = match halves.as_slice() {
        [first, second, ..] => (clock_time(first), clock_time(second)),
        [single] => unseparated_times(single),
        [] => return unparsed(),
    };

    match times {
        (Some(start), Some(end)) => Normalized::Parsed(TimeRange { start, end }),
        _ => unparsed(),
    }
}

/// First two digit groups of one half read as hour and minute. A lone
/// 3–4 digit run is `HHMM`; a missing minute is `00`.
fn clock_time(half: &str) -> Option<NaiveTime> {
    let runs: Vec<&str> = digit_run_re().find_iter(half).map(|m| m.as_str()).collect();
    match runs.as_slice() {
        [] => None,
        [hour, minute, ..] if hour.len() <= 2 => {
            clamp_time(parse_clamped(hour), parse_clamped(minute))
        }
        [run, ..] => run_time(run),
    }
}

/// Text with no connector: `HH MM HH MM` digit groups, `HH MM HH`, or two
/// runs read as one time each (`7 17`, `0700 1300`). Two runs glued by `:`,
/// `h` or `.` are a single clock time, not a range.
fn unseparated_times(single: &str) -> (Option<NaiveTime>, Option<NaiveTime>) {
    let matches: Vec<regex::Match> = digit_run_re().find_iter(single).collect();
    let runs: Vec<&str> = matches.iter().map(|m| m.as_str()).collect();
    match runs.as_slice() {
        [_, _] if is_clock_glue(&single[matches[0].end()..matches[1].start()]) => (None, None),
        [start, end] => (run_time(start), run_time(end)),
        [h1, m1, h2] => (
            clamp_time(parse_clamped(h1), parse_clamped(m1)),
            clamp_time(parse_clamped(h2), 0),
        ),
        [h1, m1, h2, m2, ..] => (
            clamp_time(parse_clamped(h1), parse_clamped(m1)),
            clamp_time(parse_clamped(h2), parse_clamped(m2)),
        ),
        _ => (None, None),
    }
}

fn is_clock_glue(gap: &str) -> bool {
    matches!(gap.trim(), ":" | "h" | "." | "hs")
}

/// A single digit run: `HHMM` when it has 3 or more digits, an hour otherwise.
fn run_time(run: &str) -> Option<NaiveTime> {
    if run.len() >= 3 {
        compact_time(run)
    } else {
        clamp_time(parse_clamped(run), 0)
    }
}

fn compact_time(run: &str) -> Option<NaiveTime> {
    let split = run.len().checked_sub(2)?;
    clamp_time(parse_clamped(&run[..split]), parse_clamped(&run[split..]))
}

fn parse_clamped(run: &str) -> u32 {
    run.parse().unwrap_or(u32::MAX)
}

fn clamp_time(hour: u32, minute: u32) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(hour.min(23), minute.min(59), 0)
}

/// Parses weekday lists (`seg, qua`), ranges (`segunda a sexta`,
/// `seg-sex`) and full names with or without `-feira`.
pub fn normalize_weekdays(raw: &str, vocabulary: &Vocabulary) -> Normalized<WeekdaySet> {
    let trimmed = raw.trim();
    let base = text::normalize(trimmed)
        .replace("-feira", "")
        .replace(" feira", "")
        .replace('-', " - ");
    let tokens: Vec<&str> = base
        .split(|c: char| c.is_whitespace() || matches!(c, ',' | '/' | ';'))
        .filter(|token| !token.is_empty())
        .collect();

    for window in tokens.windows(3) {
        if let (Some(from), true, Some(to)) = (
            vocabulary.weekday(window[0]),
            vocabulary.is_range_connector(window[1]),
            vocabulary.weekday(window[2]),
        ) {
            let from_idx = from.num_days_from_monday() as usize;
            let span = (to.num_days_from_monday() as usize + 7 - from_idx) % 7;
            let days = (0..=span).map(|offset| WEEK[(from_idx + offset) % 7]);
            return Normalized::Parsed(WeekdaySet::from_days(days));
        }
    }

    let set = WeekdaySet::from_days(tokens.iter().filter_map(|token| vocabulary.weekday(token)));
    if set.is_empty() {
        Normalized::Unparsed(trimmed.to_string())
    } else {
        Normalized::Parsed(set)
    }
}

/// Locale number: comma is the decimal separator, dots are thousands
/// separators when a comma is present, `R$` and trailing units are dropped.
pub fn normalize_number(cell: &Cell) -> Normalized<f64> {
    match cell {
        Cell::Number(value) if value.is_finite() => Normalized::Parsed(*value),
        other => {
            let raw = other.as_text();
            let trimmed = raw.trim();
            parse_locale_number(trimmed)
                .map(Normalized::Parsed)
                .unwrap_or_else(|| Normalized::Unparsed(trimmed.to_string()))
        }
    }
}

/// Non-negative whole count such as a number of groups. Fractions truncate.
pub fn normalize_count(cell: &Cell) -> Normalized<u32> {
    match normalize_number(cell) {
        Normalized::Parsed(value) if value >= 0.0 && value < u32::MAX as f64 => {
            Normalized::Parsed(value.trunc() as u32)
        }
        Normalized::Parsed(_) => Normalized::Unparsed(cell.as_text().trim().to_string()),
        Normalized::Unparsed(raw) => Normalized::Unparsed(raw),
    }
}

pub fn parse_locale_number(raw: &str) -> Option<f64> {
    let compact: String = raw
        .replace("R$", "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let numeric = compact.trim_end_matches(|c: char| c.is_alphabetic());
    if numeric.is_empty() {
        return None;
    }
    let numeric = if numeric.contains(',') {
        numeric.replace('.', "").replace(',', ".")
    } else if grouped_thousands_re().is_match(numeric) {
        numeric.replace('.', "")
    } else {
        numeric.to_string()
    };
    numeric.parse::<f64>().ok().filter(|value| value.is_finite())
}
