use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize, Serializer};

/// A single cell as read from a workbook or delimited file.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDateTime),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// Stringified cell value. Integral numbers render without a fraction.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(value) => value.clone(),
            Cell::Number(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
                format!("{}", *value as i64)
            }
            Cell::Number(value) => value.to_string(),
            Cell::Bool(value) => value.to_string(),
            Cell::Date(value) if value.num_seconds_from_midnight() == 0 => {
                value.date().format("%Y-%m-%d").to_string()
            }
            Cell::Date(value) => value.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    /// Blank cells, whitespace-only text and spreadsheet error markers
    /// (`#NOME?`, `#REF!`, `#N/A`) all count as absent.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(value) => {
                let trimmed = value.trim();
                trimmed.is_empty() || is_error_marker(trimmed)
            }
            _ => false,
        }
    }
}

fn is_error_marker(value: &str) -> bool {
    value.starts_with('#')
        && value.len() > 2
        && (value.ends_with('?') || value.ends_with('!') || value.eq_ignore_ascii_case("#N/A"))
}

#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|cells| cells.get(column))
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|row| row.iter().all(Cell::is_blank))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Discipline,
    Description,
    Level,
    Location,
    StartDate,
    EndDate,
    TimeRange,
    Weekdays,
    GroupCount,
    InternsPerGroup,
    IndividualHours,
    SupervisorName,
    SupervisorRegistryId,
    Value,
    Institution,
    Course,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 16] = [
        CanonicalField::Discipline,
        CanonicalField::Description,
        CanonicalField::Level,
        CanonicalField::Location,
        CanonicalField::StartDate,
        CanonicalField::EndDate,
        CanonicalField::TimeRange,
        CanonicalField::Weekdays,
        CanonicalField::GroupCount,
        CanonicalField::InternsPerGroup,
        CanonicalField::IndividualHours,
        CanonicalField::SupervisorName,
        CanonicalField::SupervisorRegistryId,
        CanonicalField::Value,
        CanonicalField::Institution,
        CanonicalField::Course,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::Discipline => "discipline",
            CanonicalField::Description => "description",
            CanonicalField::Level => "level",
            CanonicalField::Location => "location",
            CanonicalField::StartDate => "start_date",
            CanonicalField::EndDate => "end_date",
            CanonicalField::TimeRange => "time_range",
            CanonicalField::Weekdays => "weekdays",
            CanonicalField::GroupCount => "group_count",
            CanonicalField::InternsPerGroup => "interns_per_group",
            CanonicalField::IndividualHours => "individual_hours",
            CanonicalField::SupervisorName => "supervisor_name",
            CanonicalField::SupervisorRegistryId => "supervisor_registry_id",
            CanonicalField::Value => "value",
            CanonicalField::Institution => "institution",
            CanonicalField::Course => "course",
        }
    }

    /// Fields that inherit the last non-blank value from rows above
    /// when their own cell is blank.
    pub fn is_contextual(&self) -> bool {
        matches!(
            self,
            CanonicalField::Institution | CanonicalField::Course | CanonicalField::Level
        )
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a field normalizer. Normalizers never fail: text they cannot
/// interpret is kept verbatim as `Unparsed` so callers can surface it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Normalized<T> {
    Parsed(T),
    Unparsed(String),
}

impl<T> Normalized<T> {
    pub fn parsed(&self) -> Option<&T> {
        match self {
            Normalized::Parsed(value) => Some(value),
            Normalized::Unparsed(_) => None,
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, Normalized::Parsed(_))
    }
}

impl<T: Copy> Normalized<T> {
    /// Parsed value, or the call site's default for text that did not parse.
    pub fn parsed_or(&self, default: T) -> T {
        match self {
            Normalized::Parsed(value) => *value,
            Normalized::Unparsed(_) => default,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Normalized<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Normalized::Parsed(value) => value.fmt(f),
            Normalized::Unparsed(raw) => f.write_str(raw),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRange {
    /// Session length in minutes; negative when the range runs backwards.
    pub fn minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}–{}",
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}

impl Serialize for TimeRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Set of weekdays, always kept in Monday→Sunday order without duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WeekdaySet(Vec<Weekday>);

impl WeekdaySet {
    pub fn from_days(days: impl IntoIterator<Item = Weekday>) -> Self {
        let mut seen = [false; 7];
        for day in days {
            seen[day.num_days_from_monday() as usize] = true;
        }
        let ordered = WEEK
            .iter()
            .copied()
            .filter(|day| seen[day.num_days_from_monday() as usize])
            .collect();
        WeekdaySet(ordered)
    }

    pub fn days(&self) -> &[Weekday] {
        &self.0
    }

    pub fn first(&self) -> Option<Weekday> {
        self.0.first().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub fn weekday_label(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Seg",
        Weekday::Tue => "Ter",
        Weekday::Wed => "Qua",
        Weekday::Thu => "Qui",
        Weekday::Fri => "Sex",
        Weekday::Sat => "Sáb",
        Weekday::Sun => "Dom",
    }
}

impl fmt::Display for WeekdaySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<&str> = self.0.iter().map(|day| weekday_label(*day)).collect();
        f.write_str(&labels.join(", "))
    }
}

impl Serialize for WeekdaySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One extracted activity row with every field normalized.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActivityRecord {
    pub sheet: String,
    pub source_row: usize,
    pub discipline: Option<String>,
    pub description: Option<String>,
    pub level: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<Normalized<NaiveDate>>,
    pub end_date: Option<Normalized<NaiveDate>>,
    pub time_range: Option<Normalized<TimeRange>>,
    pub weekdays: Option<Normalized<WeekdaySet>>,
    pub group_count: Option<Normalized<u32>>,
    pub interns_per_group: Option<Normalized<u32>>,
    pub individual_hours: Option<Normalized<f64>>,
    pub supervisor_name: Option<String>,
    pub supervisor_registry_id: Option<String>,
    pub value: Option<Normalized<f64>>,
    pub institution: Option<String>,
    pub course: Option<String>,
    pub computed_individual_hours: Option<f64>,
    pub computed_total_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planned_hours: Option<f64>,
}

impl ActivityRecord {
    /// True when no source field carries a value.
    pub fn is_empty(&self) -> bool {
        CanonicalField::ALL.iter().all(|field| !self.has(*field))
    }

    pub fn has(&self, field: CanonicalField) -> bool {
        match field {
            CanonicalField::Discipline => self.discipline.is_some(),
            CanonicalField::Description => self.description.is_some(),
            CanonicalField::Level => self.level.is_some(),
            CanonicalField::Location => self.location.is_some(),
            CanonicalField::StartDate => self.start_date.is_some(),
            CanonicalField::EndDate => self.end_date.is_some(),
            CanonicalField::TimeRange => self.time_range.is_some(),
            CanonicalField::Weekdays => self.weekdays.is_some(),
            CanonicalField::GroupCount => self.group_count.is_some(),
            CanonicalField::InternsPerGroup => self.interns_per_group.is_some(),
            CanonicalField::IndividualHours => self.individual_hours.is_some(),
            CanonicalField::SupervisorName => self.supervisor_name.is_some(),
            CanonicalField::SupervisorRegistryId => self.supervisor_registry_id.is_some(),
            CanonicalField::Value => self.value.is_some(),
            CanonicalField::Institution => self.institution.is_some(),
            CanonicalField::Course => self.course.is_some(),
        }
    }

    /// Text slot for the free-text fields; `None` for typed fields.
    pub fn text_slot(&mut self, field: CanonicalField) -> Option<&mut Option<String>> {
        match field {
            CanonicalField::Discipline => Some(&mut self.discipline),
            CanonicalField::Description => Some(&mut self.description),
            CanonicalField::Level => Some(&mut self.level),
            CanonicalField::Location => Some(&mut self.location),
            CanonicalField::SupervisorName => Some(&mut self.supervisor_name),
            CanonicalField::SupervisorRegistryId => Some(&mut self.supervisor_registry_id),
            CanonicalField::Institution => Some(&mut self.institution),
            CanonicalField::Course => Some(&mut self.course),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderCandidate {
    /// 1-based sheet row.
    pub row: usize,
    pub score: usize,
    pub preview: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappedColumn {
    pub index: usize,
    pub header: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappingAmbiguity {
    pub field: CanonicalField,
    pub kept_column: usize,
    pub ignored_column: usize,
    pub ignored_header: String,
}

/// Canonical field → source column, built once from a header row.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FieldMap {
    pub columns: BTreeMap<CanonicalField, MappedColumn>,
    pub ambiguities: Vec<MappingAmbiguity>,
}

impl FieldMap {
    pub fn column(&self, field: CanonicalField) -> Option<usize> {
        self.columns.get(&field).map(|mapped| mapped.index)
    }

    pub fn contains(&self, field: CanonicalField) -> bool {
        self.columns.contains_key(&field)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SheetReport {
    pub name: String,
    /// 1-based sheet row used as header.
    pub header_row: usize,
    pub header_detected: bool,
    pub candidates: Vec<HeaderCandidate>,
    pub field_map: FieldMap,
    pub activities: Vec<ActivityRecord>,
    pub discarded_rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub source: String,
    pub sheets: Vec<SheetReport>,
    pub errors: Vec<String>,
}

impl FileReport {
    pub fn failed(source: impl Into<String>, error: String) -> Self {
        Self {
            source: source.into(),
            sheets: Vec::new(),
            errors: vec![error],
        }
    }

    pub fn activities(&self) -> impl Iterator<Item = &ActivityRecord> {
        self.sheets.iter().flat_map(|sheet| sheet.activities.iter())
    }

    pub fn activity_count(&self) -> usize {
        self.sheets.iter().map(|sheet| sheet.activities.len()).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubjectRollup {
    pub activities: usize,
    pub total_hours: f64,
    pub institutions: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub files_processed: usize,
    pub total_activities: usize,
    pub per_subject: BTreeMap<String, SubjectRollup>,
    pub errors_by_file: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub files: Vec<FileReport>,
    pub summary: BatchSummary,
}
