use std::collections::BTreeMap;

use crate::models::{ActivityRecord, CanonicalField, Cell, FieldMap, Sheet};
use crate::normalize;
use crate::vocabulary::Vocabulary;

/// Reads every row below the header into an `ActivityRecord`.
///
/// Contextual fields (institution, course, level) are forward-filled from the
/// last non-blank value seen in the sheet; all other blank cells stay unset.
pub struct RowExtractor<'a> {
    field_map: &'a FieldMap,
    vocabulary: &'a Vocabulary,
}

impl<'a> RowExtractor<'a> {
    pub fn new(field_map: &'a FieldMap, vocabulary: &'a Vocabulary) -> Self {
        Self {
            field_map,
            vocabulary,
        }
    }

    /// Extracts rows strictly after `header_row` (0-based). Rows with no
    /// field set after forward-fill are skipped.
    pub fn extract(&self, sheet: &Sheet, header_row: usize) -> Vec<ActivityRecord> {
        let mut carried: BTreeMap<CanonicalField, String> = BTreeMap::new();
        let mut records = Vec::new();

        for index in (header_row + 1)..sheet.rows.len() {
            let mut record = ActivityRecord {
                sheet: sheet.name.clone(),
                source_row: index + 1,
                ..ActivityRecord::default()
            };

            for (field, mapped) in &self.field_map.columns {
                if let Some(cell) = sheet.cell(index, mapped.index).filter(|cell| !cell.is_blank()) {
                    self.assign(&mut record, *field, cell);
                }
            }

            for field in CanonicalField::ALL.iter().filter(|field| field.is_contextual()) {
                if !self.field_map.contains(*field) {
                    continue;
                }
                let Some(slot) = record.text_slot(*field) else {
                    continue;
                };
                if let Some(value) = slot.as_ref() {
                    carried.insert(*field, value.clone());
                } else {
                    *slot = carried.get(field).cloned();
                }
            }

            if !record.is_empty() {
                records.push(record);
            }
        }

        records
    }

    fn assign(&self, record: &mut ActivityRecord, field: CanonicalField, cell: &Cell) {
        match field {
            CanonicalField::StartDate => record.start_date = Some(normalize::normalize_date(cell)),
            CanonicalField::EndDate => record.end_date = Some(normalize::normalize_date(cell)),
            CanonicalField::TimeRange => {
                record.time_range = Some(normalize::normalize_time_range(&cell.as_text()))
            }
            CanonicalField::Weekdays => {
                record.weekdays = Some(normalize::normalize_weekdays(
                    &cell.as_text(),
                    self.vocabulary,
                ))
            }
            CanonicalField::GroupCount => record.group_count = Some(normalize::normalize_count(cell)),
            CanonicalField::InternsPerGroup => {
                record.interns_per_group = Some(normalize::normalize_count(cell))
            }
            CanonicalField::IndividualHours => {
                record.individual_hours = Some(normalize::normalize_number(cell))
            }
            CanonicalField::Value => record.value = Some(normalize::normalize_number(cell)),
            CanonicalField::SupervisorRegistryId => {
                let digits: String = cell.as_text().chars().filter(char::is_ascii_digit).collect();
                if !digits.is_empty() {
                    record.supervisor_registry_id = Some(digits);
                }
            }
            text_field => {
                if let Some(slot) = record.text_slot(text_field) {
                    *slot = Some(cell.as_text().trim().to_string());
                }
            }
        }
    }
}
