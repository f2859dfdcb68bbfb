use crate::models::{Cell, FieldMap, MappedColumn, MappingAmbiguity};
use crate::text;
use crate::vocabulary::Vocabulary;

/// Maps header cells to canonical fields using the vocabulary's alias rules.
pub struct ColumnMapper<'a> {
    vocabulary: &'a Vocabulary,
}

impl<'a> ColumnMapper<'a> {
    pub fn new(vocabulary: &'a Vocabulary) -> Self {
        Self { vocabulary }
    }

    /// Each cell takes the field of its first matching rule. When two columns
    /// claim the same field the leftmost keeps it and the other is reported.
    pub fn map(&self, header: &[Cell]) -> FieldMap {
        let mut field_map = FieldMap::default();

        for (index, cell) in header.iter().enumerate() {
            if cell.is_blank() {
                continue;
            }
            let raw = cell.as_text();
            let Some(field) = self.vocabulary.match_field(&text::normalize(&raw)) else {
                continue;
            };

            match field_map.columns.get(&field) {
                Some(kept) => field_map.ambiguities.push(MappingAmbiguity {
                    field,
                    kept_column: kept.index,
                    ignored_column: index,
                    ignored_header: raw.trim().to_string(),
                }),
                None => {
                    field_map.columns.insert(
                        field,
                        MappedColumn {
                            index,
                            header: raw.trim().to_string(),
                        },
                    );
                }
            }
        }

        field_map
    }
}
