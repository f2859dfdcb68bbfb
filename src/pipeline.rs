use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::columns::ColumnMapper;
use crate::config::ExtractionConfig;
use crate::extract::RowExtractor;
use crate::header::{HeaderDetection, HeaderLocator};
use crate::models::{BatchResult, BatchSummary, FileReport, Sheet, SheetReport, SubjectRollup};
use crate::source;
use crate::validate::ActivityValidator;
use crate::vocabulary::Vocabulary;
use crate::workload::{round2, WorkloadCalculator};

pub const UNKNOWN_SUBJECT: &str = "Não identificado";

/// Runs the full extraction for one file or a batch of files.
///
/// Files are processed one after another; a file that fails to load becomes
/// an error entry and the batch moves on.
pub struct Importer {
    vocabulary: Vocabulary,
    config: ExtractionConfig,
}

impl Importer {
    pub fn new(vocabulary: Vocabulary, config: ExtractionConfig) -> Self {
        Self { vocabulary, config }
    }

    pub fn detect_header(&self, sheet: &Sheet) -> HeaderDetection {
        HeaderLocator::new(
            &self.vocabulary,
            self.config.header_threshold,
            self.config.header_window,
        )
        .locate(sheet)
    }

    pub fn extract_file(&self, path: &Path) -> FileReport {
        let source = path.display().to_string();
        info!(file = %source, "opening file");

        match source::load_sheets(path) {
            Ok(sheets) => self.extract_sheets(&source, &sheets),
            Err(error) => {
                let message = format!("{:#}", error);
                warn!(file = %source, error = %message, "file failed to load");
                FileReport::failed(source, message)
            }
        }
    }

    pub fn extract_sheets(&self, source: &str, sheets: &[Sheet]) -> FileReport {
        if sheets.is_empty() {
            warn!(file = source, "file has no sheets");
            return FileReport::failed(source, "file has no sheets".to_string());
        }

        let mut errors = Vec::new();
        let reports: Vec<SheetReport> = sheets
            .iter()
            .map(|sheet| self.extract_sheet(sheet, &mut errors))
            .collect();

        let report = FileReport {
            source: source.to_string(),
            sheets: reports,
            errors,
        };
        info!(
            file = source,
            activities = report.activity_count(),
            errors = report.errors.len(),
            "file extracted"
        );
        report
    }

    /// Extracts one sheet. Non-fatal problems are appended to `errors`.
    pub fn extract_sheet(&self, sheet: &Sheet, errors: &mut Vec<String>) -> SheetReport {
        let detection = self.detect_header(sheet);
        let header_row = detection.row_or_first();
        match detection.row {
            Some(row) => debug!(sheet = %sheet.name, row = row + 1, "header row chosen"),
            None => warn!(sheet = %sheet.name, "no header row reached the threshold, using row 1"),
        }

        let header = sheet.rows.get(header_row).map(Vec::as_slice).unwrap_or(&[]);
        let field_map = ColumnMapper::new(&self.vocabulary).map(header);
        for ambiguity in &field_map.ambiguities {
            warn!(
                sheet = %sheet.name,
                field = %ambiguity.field,
                kept = ambiguity.kept_column,
                ignored = ambiguity.ignored_column,
                "column maps to a field already claimed"
            );
        }

        if detection.row.is_none() && field_map.is_empty() && !sheet.is_empty() {
            errors.push(format!(
                "sheet '{}': no header row found and row 1 maps no known column",
                sheet.name
            ));
        }

        let calculator = WorkloadCalculator::new(&self.config);
        let extracted = RowExtractor::new(&field_map, &self.vocabulary).extract(sheet, header_row);
        let mut activities = Vec::with_capacity(extracted.len());
        let mut discarded_rows = 0;

        for mut record in extracted {
            if !ActivityValidator::is_complete(&record) {
                discarded_rows += 1;
                continue;
            }
            if let Some(warning) = ActivityValidator::date_order_warning(&record) {
                warn!(sheet = %sheet.name, row = record.source_row, "inverted dates");
                errors.push(warning);
            }
            calculator.apply(&mut record);
            activities.push(record);
        }

        debug!(
            sheet = %sheet.name,
            kept = activities.len(),
            discarded = discarded_rows,
            "rows extracted"
        );

        SheetReport {
            name: sheet.name.clone(),
            header_row: header_row + 1,
            header_detected: detection.row.is_some(),
            candidates: detection.candidates,
            field_map,
            activities,
            discarded_rows,
        }
    }

    pub fn extract_batch(&self, paths: &[PathBuf]) -> BatchResult {
        let files: Vec<FileReport> = paths.iter().map(|path| self.extract_file(path)).collect();
        let summary = self.summarize(&files);
        info!(
            files = files.len(),
            processed = summary.files_processed,
            activities = summary.total_activities,
            "batch finished"
        );
        BatchResult { files, summary }
    }

    /// Aggregates file reports. Rollups are keyed by course; activities
    /// without a course land under `UNKNOWN_SUBJECT`.
    pub fn summarize(&self, files: &[FileReport]) -> BatchSummary {
        let calculator = WorkloadCalculator::new(&self.config);
        let mut per_subject: BTreeMap<String, SubjectRollup> = BTreeMap::new();
        let mut errors_by_file = BTreeMap::new();
        let mut files_processed = 0;
        let mut total_activities = 0;

        for file in files {
            if !file.sheets.is_empty() {
                files_processed += 1;
            }
            if !file.errors.is_empty() {
                errors_by_file.insert(file.source.clone(), file.errors.clone());
            }

            for record in file.activities() {
                total_activities += 1;
                let subject = record
                    .course
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_SUBJECT.to_string());
                let rollup = per_subject.entry(subject).or_default();
                rollup.activities += 1;
                rollup.total_hours += calculator.rollup_hours(record);
                if let Some(institution) = &record.institution {
                    rollup.institutions.insert(institution.clone());
                }
            }
        }

        for rollup in per_subject.values_mut() {
            rollup.total_hours = round2(rollup.total_hours);
        }

        BatchSummary {
            files_processed,
            total_activities,
            per_subject,
            errors_by_file,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HoursFormula;
    use crate::models::{CanonicalField, Cell};

    fn row(cells: &[&str]) -> Vec<Cell> {
        cells.iter().map(|value| Cell::text(*value)).collect()
    }

    fn plan_sheet() -> Sheet {
        Sheet::new(
            "Enfermagem",
            vec![
                row(&["PLANO DE ATIVIDADES DE ESTÁGIO 2025"]),
                row(&[]),
                row(&[
                    "Instituição",
                    "Curso",
                    "Disciplina",
                    "Unidade/ Setor",
                    "Início",
                    "Fim",
                    "Horário",
                    "Dias da semana",
                    "Quantidade de grupos",
                    "Nº de estagiários por grupo",
                    "Supervisor",
                ]),
                row(&[
                    "Faculdade Guarapuava",
                    "Enfermagem",
                    "Saúde Coletiva",
                    "UBS Centro",
                    "03/02/2025",
                    "07/02/2025",
                    "7 as 17",
                    "segunda",
                    "2",
                    "3",
                    "Ana",
                ]),
                row(&["", "", "Cuidados Integrais", "", "", "", "", "", "", "", "Bruno"]),
                row(&["", "", "", "", "", "", "", "sábado", "", "", ""]),
                row(&[
                    "",
                    "Farmácia",
                    "Farmacologia",
                    "Hospital",
                    "10/03/2025",
                    "01/03/2025",
                    "8-12",
                    "terça",
                    "",
                    "",
                    "",
                ]),
            ],
        )
    }

    fn importer(config: ExtractionConfig) -> Importer {
        Importer::new(Vocabulary::portuguese(), config)
    }

    #[test]
    fn extracts_plan_below_title_rows() {
        let report = importer(ExtractionConfig::default()).extract_sheets("plano.xlsx", &[plan_sheet()]);
        let sheet = &report.sheets[0];

        assert!(sheet.header_detected);
        assert_eq!(sheet.header_row, 3);
        assert_eq!(sheet.field_map.column(CanonicalField::SupervisorName), Some(10));
        assert_eq!(sheet.activities.len(), 3);
        assert_eq!(sheet.discarded_rows, 1);

        let first = &sheet.activities[0];
        assert_eq!(first.computed_individual_hours, Some(10.0));
        assert_eq!(first.source_row, 4);

        let second = &sheet.activities[1];
        assert_eq!(second.institution.as_deref(), Some("Faculdade Guarapuava"));
        assert_eq!(second.course.as_deref(), Some("Enfermagem"));
    }

    #[test]
    fn inverted_dates_are_kept_with_a_warning() {
        let report = importer(ExtractionConfig::default()).extract_sheets("plano.xlsx", &[plan_sheet()]);
        let inverted = &report.sheets[0].activities[2];

        assert_eq!(inverted.discipline.as_deref(), Some("Farmacologia"));
        assert_eq!(inverted.computed_individual_hours, Some(0.0));
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("row 7"));
    }

    #[test]
    fn sheet_without_header_falls_back_to_first_row() {
        let sheet = Sheet::new(
            "notas",
            vec![row(&["lista de presença"]), row(&["Ana", "Bruno"])],
        );
        let report = importer(ExtractionConfig::default()).extract_sheets("notas.csv", &[sheet]);

        assert!(!report.sheets[0].header_detected);
        assert_eq!(report.sheets[0].header_row, 1);
        assert!(report.sheets[0].activities.is_empty());
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("notas"));
    }

    #[test]
    fn empty_sheet_is_not_an_error() {
        let report = importer(ExtractionConfig::default())
            .extract_sheets("plano.xlsx", &[plan_sheet(), Sheet::new("Vazia", vec![])]);
        assert_eq!(report.sheets.len(), 2);
        assert!(report.sheets[1].activities.is_empty());
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn no_sheets_fails_the_file() {
        let report = importer(ExtractionConfig::default()).extract_sheets("vazio.xlsx", &[]);
        assert!(report.sheets.is_empty());
        assert_eq!(report.errors, vec!["file has no sheets".to_string()]);
    }

    #[test]
    fn extraction_is_idempotent() {
        let importer = importer(ExtractionConfig::default());
        let first = importer.extract_sheets("plano.xlsx", &[plan_sheet()]);
        let second = importer.extract_sheets("plano.xlsx", &[plan_sheet()]);
        assert_eq!(first.sheets[0].activities, second.sheets[0].activities);
        assert_eq!(first.errors, second.errors);
    }

    #[test]
    fn batch_continues_past_unreadable_file() {
        let result = importer(ExtractionConfig::default()).extract_batch(&[
            PathBuf::from("missing-plan.csv"),
            PathBuf::from("plano.pdf"),
        ]);

        assert_eq!(result.files.len(), 2);
        assert_eq!(result.summary.files_processed, 0);
        assert_eq!(result.summary.errors_by_file.len(), 2);
        assert!(result.summary.errors_by_file["missing-plan.csv"][0].contains("failed to read"));
    }

    #[test]
    fn summary_rolls_up_by_course() {
        let importer = importer(ExtractionConfig::default());
        let files = vec![
            importer.extract_sheets("plano.xlsx", &[plan_sheet()]),
            FileReport::failed("quebrado.xlsx", "failed to open workbook".to_string()),
        ];
        let summary = importer.summarize(&files);

        assert_eq!(summary.files_processed, 1);
        assert_eq!(summary.total_activities, 3);

        let nursing = &summary.per_subject["Enfermagem"];
        assert_eq!(nursing.activities, 2);
        assert_eq!(nursing.total_hours, 10.0);
        assert_eq!(nursing.institutions.len(), 1);

        let pharmacy = &summary.per_subject["Farmácia"];
        assert_eq!(pharmacy.activities, 1);
        assert!(pharmacy.institutions.contains("Faculdade Guarapuava"));
        assert_eq!(summary.errors_by_file.len(), 2);
    }

    #[test]
    fn missing_course_uses_unknown_subject() {
        let sheet = Sheet::new(
            "plano",
            vec![
                row(&["Disciplina", "Supervisor", "Unidade"]),
                row(&["Saúde Coletiva", "Ana", "UBS"]),
            ],
        );
        let importer = importer(ExtractionConfig::default());
        let files = vec![importer.extract_sheets("plano.csv", &[sheet])];
        let summary = importer.summarize(&files);
        assert_eq!(summary.per_subject[UNKNOWN_SUBJECT].activities, 1);
    }

    #[test]
    fn level_multiplier_feeds_rollup() {
        let config = ExtractionConfig {
            hours_formula: HoursFormula::LevelMultiplier,
            ..ExtractionConfig::default()
        };
        let importer = importer(config);
        let files = vec![importer.extract_sheets("plano.xlsx", &[plan_sheet()])];
        let summary = importer.summarize(&files);

        // 2 groups × 3 interns × 4h × 2, then 1 × 1 × 4h × 2 for the row without counters.
        assert_eq!(summary.per_subject["Enfermagem"].total_hours, 56.0);
    }
}
