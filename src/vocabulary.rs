use std::path::Path;

use anyhow::{bail, Context};
use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::models::CanonicalField;
use crate::text;

/// A header alias: the cell matches when every term occurs in its normalized text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasRule {
    pub field: CanonicalField,
    pub terms: Vec<String>,
}

impl AliasRule {
    pub fn new(field: CanonicalField, terms: &[&str]) -> Self {
        Self {
            field,
            terms: terms.iter().map(|term| text::normalize(term)).collect(),
        }
    }

    pub fn matches(&self, normalized: &str) -> bool {
        !normalized.is_empty()
            && !self.terms.is_empty()
            && self.terms.iter().all(|term| normalized.contains(term.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayAlias {
    pub alias: String,
    pub day: Weekday,
}

/// Header and weekday vocabulary shared read-only by the header locator,
/// the column mapper and the weekday normalizer.
///
/// Rule order matters: a header cell maps to the field of the first rule it
/// matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub field_rules: Vec<AliasRule>,
    pub weekday_aliases: Vec<WeekdayAlias>,
    pub range_connectors: Vec<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::portuguese()
    }
}

impl Vocabulary {
    /// Vocabulary for PT-BR internship activity plans.
    pub fn portuguese() -> Self {
        use CanonicalField::*;

        let field_rules = vec![
            AliasRule::new(Location, &["unidade", "setor"]),
            AliasRule::new(Location, &["unidade"]),
            AliasRule::new(Location, &["setor"]),
            AliasRule::new(Location, &["local"]),
            AliasRule::new(Institution, &["instituicao"]),
            AliasRule::new(Course, &["curso"]),
            AliasRule::new(Level, &["nivel"]),
            AliasRule::new(StartDate, &["inicio"]),
            AliasRule::new(StartDate, &["data", "inicial"]),
            AliasRule::new(EndDate, &["fim"]),
            AliasRule::new(EndDate, &["termino"]),
            AliasRule::new(EndDate, &["data", "final"]),
            AliasRule::new(IndividualHours, &["horas", "individua"]),
            AliasRule::new(IndividualHours, &["carga", "horaria"]),
            AliasRule::new(TimeRange, &["horario"]),
            AliasRule::new(Weekdays, &["dias"]),
            AliasRule::new(Weekdays, &["dia", "semana"]),
            AliasRule::new(SupervisorRegistryId, &["conselho"]),
            AliasRule::new(SupervisorRegistryId, &["registro"]),
            AliasRule::new(SupervisorName, &["supervisor"]),
            AliasRule::new(SupervisorName, &["preceptor"]),
            AliasRule::new(Discipline, &["disciplina"]),
            AliasRule::new(Description, &["descri"]),
            AliasRule::new(InternsPerGroup, &["estagiario"]),
            AliasRule::new(GroupCount, &["quantidade", "grupo"]),
            AliasRule::new(GroupCount, &["grupo"]),
            AliasRule::new(Value, &["valor"]),
        ];

        let weekday_aliases = [
            ("seg", Weekday::Mon),
            ("segunda", Weekday::Mon),
            ("mon", Weekday::Mon),
            ("monday", Weekday::Mon),
            ("ter", Weekday::Tue),
            ("terca", Weekday::Tue),
            ("tue", Weekday::Tue),
            ("tuesday", Weekday::Tue),
            ("qua", Weekday::Wed),
            ("quarta", Weekday::Wed),
            ("wed", Weekday::Wed),
            ("wednesday", Weekday::Wed),
            ("qui", Weekday::Thu),
            ("quinta", Weekday::Thu),
            ("thu", Weekday::Thu),
            ("thursday", Weekday::Thu),
            ("sex", Weekday::Fri),
            ("sexta", Weekday::Fri),
            ("fri", Weekday::Fri),
            ("friday", Weekday::Fri),
            ("sab", Weekday::Sat),
            ("sabado", Weekday::Sat),
            ("sat", Weekday::Sat),
            ("saturday", Weekday::Sat),
            ("dom", Weekday::Sun),
            ("domingo", Weekday::Sun),
            ("sun", Weekday::Sun),
            ("sunday", Weekday::Sun),
        ]
        .into_iter()
        .map(|(alias, day)| WeekdayAlias {
            alias: alias.to_string(),
            day,
        })
        .collect();

        let range_connectors = ["a", "ate", "-", "to", "through", "thru"]
            .into_iter()
            .map(str::to_string)
            .collect();

        Self {
            field_rules,
            weekday_aliases,
            range_connectors,
        }
    }

    /// Loads a vocabulary from JSON. Terms and aliases are normalized on load
    /// so the file may use accents and capitals.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read vocabulary {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("invalid vocabulary {}", path.display()))
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let mut vocabulary: Vocabulary = serde_json::from_str(raw)?;
        for rule in vocabulary.field_rules.iter_mut() {
            rule.terms = rule
                .terms
                .iter()
                .map(|term| text::normalize(term))
                .filter(|term| !term.is_empty())
                .collect();
        }
        vocabulary.field_rules.retain(|rule| !rule.terms.is_empty());
        for alias in vocabulary.weekday_aliases.iter_mut() {
            alias.alias = text::normalize(&alias.alias);
        }
        for connector in vocabulary.range_connectors.iter_mut() {
            *connector = text::normalize(connector);
        }

        if vocabulary.field_rules.is_empty() {
            bail!("vocabulary has no field rules");
        }
        Ok(vocabulary)
    }

    /// Field of the first rule matching an already-normalized cell.
    pub fn match_field(&self, normalized: &str) -> Option<CanonicalField> {
        self.field_rules
            .iter()
            .find(|rule| rule.matches(normalized))
            .map(|rule| rule.field)
    }

    pub fn weekday(&self, token: &str) -> Option<Weekday> {
        self.weekday_aliases
            .iter()
            .find(|alias| alias.alias == token)
            .map(|alias| alias.day)
    }

    pub fn is_range_connector(&self, token: &str) -> bool {
        self.range_connectors.iter().any(|connector| connector == token)
    }
}
