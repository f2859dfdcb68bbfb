use std::fmt::Write;

use crate::models::{BatchResult, SubjectRollup};

/// Subjects ordered by activity count, then by name.
pub fn ranked_subjects(result: &BatchResult) -> Vec<(&str, &SubjectRollup)> {
    let mut subjects: Vec<(&str, &SubjectRollup)> = result
        .summary
        .per_subject
        .iter()
        .map(|(name, rollup)| (name.as_str(), rollup))
        .collect();

    subjects.sort_by(|a, b| b.1.activities.cmp(&a.1.activities).then(a.0.cmp(b.0)));
    subjects
}

pub fn build_report(result: &BatchResult) -> String {
    let summary = &result.summary;
    let mut output = String::new();

    let _ = writeln!(output, "# Activity Import Report");
    let _ = writeln!(
        output,
        "{} of {} files processed, {} activities extracted",
        summary.files_processed,
        result.files.len(),
        summary.total_activities
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Subjects");

    let subjects = ranked_subjects(result);
    if subjects.is_empty() {
        let _ = writeln!(output, "No activities extracted.");
    } else {
        for (name, rollup) in subjects {
            let institutions: Vec<&str> = rollup.institutions.iter().map(String::as_str).collect();
            let _ = writeln!(
                output,
                "- {}: {} activities, {:.2} hours ({})",
                name,
                rollup.activities,
                rollup.total_hours,
                if institutions.is_empty() {
                    "no institution".to_string()
                } else {
                    institutions.join(", ")
                }
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Files");

    for file in &result.files {
        if file.sheets.is_empty() {
            let _ = writeln!(output, "- {}: not processed", file.source);
            continue;
        }
        let _ = writeln!(output, "- {}: {} activities", file.source, file.activity_count());
        for sheet in &file.sheets {
            let header = if sheet.header_detected {
                format!("header at row {}", sheet.header_row)
            } else {
                "no header detected".to_string()
            };
            let _ = writeln!(
                output,
                "  - {}: {}, {} columns mapped, {} kept, {} discarded",
                sheet.name,
                header,
                sheet.field_map.len(),
                sheet.activities.len(),
                sheet.discarded_rows
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Errors");

    if summary.errors_by_file.is_empty() {
        let _ = writeln!(output, "No errors recorded.");
    } else {
        for (source, errors) in &summary.errors_by_file {
            let _ = writeln!(output, "### {}", source);
            for error in errors {
                let _ = writeln!(output, "- {}", error);
            }
        }
    }

    output
}
