use std::collections::BTreeSet;

use crate::models::{Cell, HeaderCandidate, Sheet};
use crate::text;
use crate::vocabulary::Vocabulary;

const PREVIEW_CELLS: usize = 10;

#[derive(Debug, Clone)]
pub struct HeaderDetection {
    /// 0-based row index of the chosen header, if any row qualified.
    pub row: Option<usize>,
    pub candidates: Vec<HeaderCandidate>,
}

impl HeaderDetection {
    /// Chosen header row, falling back to the first row of the sheet.
    pub fn row_or_first(&self) -> usize {
        self.row.unwrap_or(0)
    }
}

/// Finds the header row by counting distinct field keywords per row.
///
/// The first row in the window that reaches the threshold wins, even when a
/// later row scores higher. Existing imports depend on this tie-break.
pub struct HeaderLocator<'a> {
    vocabulary: &'a Vocabulary,
    threshold: usize,
    window: usize,
}

impl<'a> HeaderLocator<'a> {
    pub fn new(vocabulary: &'a Vocabulary, threshold: usize, window: usize) -> Self {
        Self {
            vocabulary,
            threshold: threshold.max(1),
            window,
        }
    }

    /// Number of distinct canonical fields whose keywords occur in the row.
    pub fn score_row(&self, row: &[Cell]) -> usize {
        let cells: Vec<String> = row
            .iter()
            .filter(|cell| !cell.is_blank())
            .map(|cell| text::normalize(&cell.as_text()))
            .collect();

        self.vocabulary
            .field_rules
            .iter()
            .filter(|rule| cells.iter().any(|cell| rule.matches(cell)))
            .map(|rule| rule.field)
            .collect::<BTreeSet<_>>()
            .len()
    }

    pub fn locate(&self, sheet: &Sheet) -> HeaderDetection {
        let mut chosen = None;
        let mut candidates = Vec::new();

        for (index, row) in sheet.rows.iter().take(self.window).enumerate() {
            let score = self.score_row(row);
            if chosen.is_none() && score >= self.threshold {
                chosen = Some(index);
            }
            candidates.push(HeaderCandidate {
                row: index + 1,
                score,
                preview: row
                    .iter()
                    .filter(|cell| !cell.is_blank())
                    .take(PREVIEW_CELLS)
                    .map(|cell| cell.as_text().trim().to_string())
                    .collect(),
            });
        }

        HeaderDetection {
            row: chosen,
            candidates,
        }
    }
}
