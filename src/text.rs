/// Accent-stripped, lower-cased, whitespace-collapsed form of `value`.
/// Blank input yields an empty string.
pub fn normalize(value: &str) -> String {
    let folded = strip_accents(&value.to_lowercase());
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Replaces accented Latin letters with their base letter, keeping case.
pub fn strip_accents(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii() {
                return c;
            }
            if c.is_uppercase() {
                let lower = c.to_lowercase().next().unwrap_or(c);
                return base_letter(lower)
                    .and_then(|base| base.to_uppercase().next())
                    .unwrap_or(c);
            }
            base_letter(c).unwrap_or(c)
        })
        .collect()
}

fn base_letter(c: char) -> Option<char> {
    let base = match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => 'a',
        'é' | 'è' | 'ê' | 'ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => 'e',
        'í' | 'ì' | 'î' | 'ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'ō' | 'ŏ' | 'ő' | 'ø' => 'o',
        'ú' | 'ù' | 'û' | 'ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => 'u',
        'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' => 'c',
        'ñ' | 'ń' | 'ņ' | 'ň' => 'n',
        'ý' | 'ÿ' => 'y',
        _ => return None,
    };
    Some(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_portuguese_headers() {
        assert_eq!(normalize("  INSTITUIÇÃO   DE\tENSINO "), "instituicao de ensino");
        assert_eq!(normalize("Nível"), "nivel");
        assert_eq!(normalize("Horário"), "horario");
    }

    #[test]
    fn blank_input_is_empty() {
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn strip_accents_keeps_case() {
        assert_eq!(strip_accents("Às SÁBADO"), "As SABADO");
        assert_eq!(strip_accents("Nº"), "Nº");
    }
}
