use crate::models::{ActivityRecord, CanonicalField};

const KEY_FIELDS: [CanonicalField; 4] = [
    CanonicalField::Location,
    CanonicalField::Discipline,
    CanonicalField::SupervisorName,
    CanonicalField::Institution,
];

const MIN_KEY_FIELDS: usize = 2;

/// Completeness gate. Rows below the threshold are treated as layout noise
/// and dropped without an error.
pub struct ActivityValidator;

impl ActivityValidator {
    pub fn is_complete(record: &ActivityRecord) -> bool {
        let present = KEY_FIELDS
            .iter()
            .filter(|field| record.has(**field))
            .count();
        present >= MIN_KEY_FIELDS
    }

    /// Warning for a record whose parsed dates run backwards.
    pub fn date_order_warning(record: &ActivityRecord) -> Option<String> {
        let start = record.start_date.as_ref()?.parsed()?;
        let end = record.end_date.as_ref()?.parsed()?;
        if start <= end {
            return None;
        }
        Some(format!(
            "sheet '{}' row {}: start date {} is after end date {}",
            record.sheet, record.source_row, start, end
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Normalized;
    use chrono::NaiveDate;

    fn record() -> ActivityRecord {
        ActivityRecord {
            sheet: "plano".to_string(),
            source_row: 7,
            ..ActivityRecord::default()
        }
    }

    #[test]
    fn one_key_field_is_not_enough() {
        let mut row = record();
        row.discipline = Some("Saúde Coletiva".to_string());
        row.course = Some("Enfermagem".to_string());
        assert!(!ActivityValidator::is_complete(&row));
    }

    #[test]
    fn two_key_fields_are_kept() {
        let mut row = record();
        row.discipline = Some("Saúde Coletiva".to_string());
        row.location = Some("UBS Centro".to_string());
        assert!(ActivityValidator::is_complete(&row));
    }

    #[test]
    fn inverted_dates_are_reported() {
        let mut row = record();
        row.start_date = Some(Normalized::Parsed(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()));
        row.end_date = Some(Normalized::Parsed(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()));
        let warning = ActivityValidator::date_order_warning(&row).unwrap();
        assert!(warning.contains("row 7"));

        row.end_date = Some(Normalized::Unparsed("em aberto".to_string()));
        assert_eq!(ActivityValidator::date_order_warning(&row), None);
    }
}
