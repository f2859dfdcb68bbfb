use std::path::Path;

use anyhow::{bail, Context};
use calamine::{open_workbook_auto, Data, Reader};
use encoding_rs::WINDOWS_1252;
use tracing::debug;

use crate::models::{Cell, Sheet};

/// Loads every sheet of a workbook, or a single pseudo-sheet for delimited
/// text. The sheet of a delimited file is named after the file stem.
pub fn load_sheets(path: &Path) -> anyhow::Result<Vec<Sheet>> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "csv" | "txt" | "tsv" => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let name = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or("csv");
            Ok(vec![parse_delimited(name, &decode(&bytes))?])
        }
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => load_workbook(path),
        other => bail!("unsupported file type '{}' for {}", other, path.display()),
    }
}

/// UTF-8 when valid (BOM stripped), otherwise Windows-1252.
pub fn decode(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let (text, _, _) = WINDOWS_1252.decode(bytes);
            text.into_owned()
        }
    }
}

/// Tab when it outnumbers both `;` and `,` on the first line, then `;` when
/// it outnumbers `,`, else `,`.
pub fn detect_delimiter(sample: &str) -> u8 {
    let first_line = sample.lines().next().unwrap_or_default();
    let tabs = first_line.matches('\t').count();
    let semicolons = first_line.matches(';').count();
    let commas = first_line.matches(',').count();
    if tabs > semicolons && tabs > commas {
        b'\t'
    } else if semicolons > commas {
        b';'
    } else {
        b','
    }
}

pub fn parse_delimited(name: &str, text: &str) -> anyhow::Result<Sheet> {
    let delimiter = detect_delimiter(text);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("failed to parse line {}", index + 1))?;
        rows.push(
            record
                .iter()
                .map(|value| {
                    if value.trim().is_empty() {
                        Cell::Empty
                    } else {
                        Cell::text(value)
                    }
                })
                .collect(),
        );
    }

    let separator = delimiter as char;
    debug!(sheet = name, rows = rows.len(), %separator, "parsed delimited text");
    Ok(Sheet::new(name, rows))
}

fn load_workbook(path: &Path) -> anyhow::Result<Vec<Sheet>> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("failed to open workbook {}", path.display()))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let mut sheets = Vec::with_capacity(sheet_names.len());

    for sheet_name in sheet_names {
        let range = workbook
            .worksheet_range(&sheet_name)
            .with_context(|| format!("failed to read sheet '{}'", sheet_name))?;

        // Ranges start at the first used cell; pad so row and column
        // positions match the sheet as the user sees it.
        let (row_offset, column_offset) = range
            .start()
            .map(|(row, column)| (row as usize, column as usize))
            .unwrap_or((0, 0));

        let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); row_offset];
        for row in range.rows() {
            let mut cells = vec![Cell::Empty; column_offset];
            cells.extend(row.iter().map(convert_cell));
            rows.push(cells);
        }

        debug!(sheet = %sheet_name, rows = rows.len(), "read worksheet");
        sheets.push(Sheet::new(sheet_name, rows));
    }

    Ok(sheets)
}

fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(value) if value.trim().is_empty() => Cell::Empty,
        Data::String(value) => Cell::text(value.clone()),
        Data::Int(value) => Cell::Number(*value as f64),
        Data::Float(value) => Cell::Number(*value),
        Data::Bool(value) => Cell::Bool(*value),
        Data::DateTime(value) => match value.as_datetime() {
            Some(datetime) => Cell::Date(datetime),
            None => Cell::Number(value.as_f64()),
        },
        Data::DateTimeIso(value) | Data::DurationIso(value) => Cell::text(value.clone()),
        Data::Error(_) => Cell::Empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semicolon_wins_only_when_more_frequent() {
        assert_eq!(detect_delimiter("Curso;Disciplina;Valor\n1,5;2;3"), b';');
        assert_eq!(detect_delimiter("Curso,Disciplina;Valor"), b',');
        assert_eq!(detect_delimiter("Curso"), b',');
        assert_eq!(detect_delimiter("Curso\tDisciplina\tValor\n1,5\t2\t3"), b'\t');
    }

    #[test]
    fn tab_separated_rows_split_into_columns() {
        let sheet = parse_delimited(
            "plano",
            "Curso\tDisciplina\tSupervisor\nEnfermagem\tSaúde Coletiva\tAna\n",
        )
        .unwrap();
        assert_eq!(sheet.rows[0].len(), 3);
        assert_eq!(sheet.cell(1, 2), Some(&Cell::text("Ana")));
    }

    #[test]
    fn latin1_bytes_are_decoded() {
        let bytes = b"Institui\xe7\xe3o;Hor\xe1rio";
        assert_eq!(decode(bytes), "Instituição;Horário");
        assert_eq!(decode("Nível".as_bytes()), "Nível");
        assert_eq!(decode(b"\xEF\xBB\xBFCurso"), "Curso");
    }

    #[test]
    fn delimited_rows_may_be_ragged() {
        let sheet = parse_delimited(
            "plano",
            "Curso;Disciplina;Supervisor\nEnfermagem;Saúde Coletiva\n;;Ana;extra\n",
        )
        .unwrap();

        assert_eq!(sheet.name, "plano");
        assert_eq!(sheet.rows.len(), 3);
        assert_eq!(sheet.rows[1].len(), 2);
        assert_eq!(sheet.rows[2].len(), 4);
        assert_eq!(sheet.rows[2][0], Cell::Empty);
        assert_eq!(sheet.cell(2, 2), Some(&Cell::text("Ana")));
    }

    #[test]
    fn quoted_commas_stay_in_cell() {
        let sheet = parse_delimited("plano", "Curso,Descrição\nEnfermagem,\"Visita, domiciliar\"\n")
            .unwrap();
        assert_eq!(sheet.cell(1, 1), Some(&Cell::text("Visita, domiciliar")));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let error = load_sheets(Path::new("plano.pdf")).unwrap_err();
        assert!(error.to_string().contains("unsupported file type"));
    }

    #[test]
    fn workbook_cells_keep_their_types() {
        assert_eq!(convert_cell(&Data::Int(3)), Cell::Number(3.0));
        assert_eq!(convert_cell(&Data::String("  ".to_string())), Cell::Empty);
        assert_eq!(
            convert_cell(&Data::Error(calamine::CellErrorType::Name)),
            Cell::Empty
        );
        assert_eq!(
            convert_cell(&Data::DateTimeIso("2025-02-03".to_string())),
            Cell::text("2025-02-03")
        );
    }
}
