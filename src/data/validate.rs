use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::data::roster::{read_roster_file, RosterFile};
use crate::synergy::tables::CompatibilityEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationSeverity {
    Error,
    Warning,
    Info,
}

impl ValidationSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for ValidationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationDiagnostic {
    pub severity: ValidationSeverity,
    pub context: String,
    pub message: String,
}

impl fmt::Display for ValidationDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.context, self.message)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub diagnostics: Vec<ValidationDiagnostic>,
}

impl ValidationReport {
    pub fn push(
        &mut self,
        severity: ValidationSeverity,
        context: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(ValidationDiagnostic {
            severity,
            context: context.into(),
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diag| diag.severity == ValidationSeverity::Error)
    }

    pub fn count(&self, severity: ValidationSeverity) -> usize {
        self.diagnostics
            .iter()
            .filter(|diag| diag.severity == severity)
            .count()
    }
}

pub fn validate_roster(file: &RosterFile) -> ValidationReport {
    let mut report = ValidationReport::default();

    let mut ability_names = HashSet::new();
    for (index, ability) in file.abilities.iter().enumerate() {
        let context = format!("abilities[{index}]");
        if ability.name.trim().is_empty() {
            report.push(ValidationSeverity::Error, context, "missing non-empty 'name'");
            continue;
        }
        if !ability_names.insert(ability.name.as_str()) {
            report.push(
                ValidationSeverity::Error,
                context,
                format!("duplicate ability '{}'", ability.name),
            );
        }
        if ability.kind.trim().is_empty() {
            report.push(
                ValidationSeverity::Warning,
                format!("abilities[{index}] name='{}'.type", ability.name),
                "empty ability type never matches the compatibility table",
            );
        }
    }

    let mut character_names = HashSet::new();
    for (index, character) in file.characters.iter().enumerate() {
        let context = format!("characters[{index}]");
        if character.name.trim().is_empty() {
            report.push(ValidationSeverity::Error, context, "missing non-empty 'name'");
            continue;
        }
        if !character_names.insert(character.name.as_str()) {
            report.push(
                ValidationSeverity::Error,
                context.clone(),
                format!("duplicate character '{}'", character.name),
            );
        }

        let named = format!("characters[{index}] name='{}'", character.name);
        for (_, ability) in character.ability_refs() {
            if !ability_names.contains(ability) {
                report.push(
                    ValidationSeverity::Warning,
                    named.clone(),
                    format!("ability '{ability}' is not defined"),
                );
            }
        }
        if character.tags.is_empty() {
            report.push(ValidationSeverity::Info, named.clone(), "no tags");
        }
        if character.faction.trim().is_empty() {
            report.push(ValidationSeverity::Info, named.clone(), "no faction");
        }
        if character.troop_fitness.is_empty() {
            report.push(ValidationSeverity::Info, named, "no troop fitness");
        }
    }

    validate_table(&mut report, "tag_compatibility", file.tag_compatibility.as_deref());
    validate_table(
        &mut report,
        "ability_compatibility",
        file.ability_compatibility.as_deref(),
    );

    report
}

fn validate_table(report: &mut ValidationReport, name: &str, entries: Option<&[CompatibilityEntry]>) {
    let Some(entries) = entries else {
        return;
    };
    for (index, entry) in entries.iter().enumerate() {
        if !(0.0..=100.0).contains(&entry.value) {
            report.push(
                ValidationSeverity::Error,
                format!("{name}[{index}]"),
                format!(
                    "value {} for ('{}', '{}') must be within 0..=100",
                    entry.value, entry.first, entry.second
                ),
            );
        }
    }
}

pub fn validate_roster_file(path: &str) -> Result<ValidationReport, String> {
    let file = read_roster_file(path).map_err(|err| format!("'{path}': {err}"))?;
    Ok(validate_roster(&file))
}
