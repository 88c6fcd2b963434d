//! The four synergy dimensions. Each routine returns its normalized score together with
//! the evidence behind it; the engine's `score` and `analyze_detailed` both call these, so
//! an explanation can never disagree with the number it explains.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::data::roster::{AbilitySlot, Character, RosterRepository, TroopGrade, TroopType};
use crate::synergy::tables::PairTable;

const TAG_PAIR_BONUS: f64 = 10.0;
const TAG_PAIR_BONUS_CAP: f64 = 50.0;
const REPEATED_TAG_POINTS: f64 = 15.0;

const GRADE_SCALE: f64 = 5.0;
const TROOP_TERM_CAP: f64 = 25.0;
const TROOP_COVERAGE_POINTS: f64 = 8.0;
const COUNTER_POINTS: f64 = 5.0;
const S_GRADE_POINTS: f64 = 5.0;

const ABILITY_PAIR_BONUS: f64 = 5.0;
const ABILITY_PAIR_BONUS_CAP: f64 = 50.0;
const ABILITY_FALLBACK_PER_HERO: f64 = 20.0;

pub const MAX_SCORE: f64 = 100.0;

/// A teammate pair joined by a compatibility-table entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynergyPair {
    pub first: String,
    pub second: String,
    pub matched: [String; 2],
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagAnalysis {
    pub score: f64,
    pub pairs: Vec<SynergyPair>,
    /// True when no table entry matched and repeated tags were scored instead.
    pub fallback: bool,
    pub repeated_tags: BTreeMap<String, usize>,
}

/// Mean of the best table value per matching teammate pair plus a per-pair bonus, else
/// repeated-tag frequency. Clamped to [0, 100].
pub fn tag_synergy(members: &[&Character], table: &PairTable) -> TagAnalysis {
    let mut pairs = Vec::new();
    for (i, a) in members.iter().enumerate() {
        for b in members.iter().skip(i + 1) {
            let mut best: Option<(f64, &str, &str)> = None;
            for tag_a in distinct_tags(a) {
                for tag_b in distinct_tags(b) {
                    if let Some(value) = table.lookup(tag_a, tag_b) {
                        if best.map_or(true, |(current, _, _)| value > current) {
                            best = Some((value, tag_a, tag_b));
                        }
                    }
                }
            }
            if let Some((value, tag_a, tag_b)) = best {
                pairs.push(SynergyPair {
                    first: a.name.clone(),
                    second: b.name.clone(),
                    matched: [tag_a.to_string(), tag_b.to_string()],
                    value,
                });
            }
        }
    }

    let repeated_tags = repeated_tag_counts(members);
    if pairs.is_empty() {
        let score = repeated_tags
            .values()
            .map(|&count| REPEATED_TAG_POINTS * (count - 1) as f64)
            .sum::<f64>()
            .clamp(0.0, MAX_SCORE);
        return TagAnalysis {
            score,
            pairs,
            fallback: true,
            repeated_tags,
        };
    }

    let average = pairs.iter().map(|p| p.value).sum::<f64>() / pairs.len() as f64;
    let bonus = (TAG_PAIR_BONUS * pairs.len() as f64).min(TAG_PAIR_BONUS_CAP);
    TagAnalysis {
        score: (average + bonus).clamp(0.0, MAX_SCORE),
        pairs,
        fallback: false,
        repeated_tags,
    }
}

fn distinct_tags(character: &Character) -> Vec<&str> {
    let mut seen = BTreeSet::new();
    character
        .tags
        .iter()
        .map(String::as_str)
        .filter(|tag| seen.insert(*tag))
        .collect()
}

fn repeated_tag_counts(members: &[&Character]) -> BTreeMap<String, usize> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for member in members {
        for tag in distinct_tags(member) {
            *counts.entry(tag.to_string()).or_default() += 1;
        }
    }
    counts.retain(|_, count| *count > 1);
    counts
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CounterLink {
    pub hero: String,
    pub troop: TroopType,
    pub target: String,
    pub target_troop: TroopType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TroopAnalysis {
    pub score: f64,
    pub grade_term: f64,
    pub coverage_term: f64,
    pub counter_term: f64,
    pub s_grade_term: f64,
    pub troop_types: Vec<TroopType>,
    pub counters: Vec<CounterLink>,
}

pub fn troop_synergy(members: &[&Character]) -> TroopAnalysis {
    if members.is_empty() {
        return TroopAnalysis {
            score: 0.0,
            grade_term: 0.0,
            coverage_term: 0.0,
            counter_term: 0.0,
            s_grade_term: 0.0,
            troop_types: Vec::new(),
            counters: Vec::new(),
        };
    }

    let average_grade = members
        .iter()
        .map(|m| average_grade(m))
        .sum::<f64>()
        / members.len() as f64;
    let grade_term = (average_grade * GRADE_SCALE).min(TROOP_TERM_CAP);

    let troop_types: Vec<TroopType> = members
        .iter()
        .flat_map(|m| m.troop_fitness.keys().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let coverage_term = (TROOP_COVERAGE_POINTS * troop_types.len() as f64).min(TROOP_TERM_CAP);

    let mut counters = Vec::new();
    for (i, a) in members.iter().enumerate() {
        for (j, b) in members.iter().enumerate() {
            if i == j {
                continue;
            }
            let link = a.troop_fitness.keys().find_map(|&troop| {
                let countered = troop.counters()?;
                b.troop_fitness
                    .contains_key(&countered)
                    .then_some((troop, countered))
            });
            if let Some((troop, target_troop)) = link {
                counters.push(CounterLink {
                    hero: a.name.clone(),
                    troop,
                    target: b.name.clone(),
                    target_troop,
                });
            }
        }
    }
    let counter_term = (COUNTER_POINTS * counters.len() as f64).min(TROOP_TERM_CAP);

    let s_grades = members
        .iter()
        .flat_map(|m| m.troop_fitness.values())
        .filter(|grade| **grade == TroopGrade::S)
        .count();
    let s_grade_term = (S_GRADE_POINTS * s_grades as f64).min(TROOP_TERM_CAP);

    TroopAnalysis {
        score: (grade_term + coverage_term + counter_term + s_grade_term)
            .clamp(0.0, MAX_SCORE),
        grade_term,
        coverage_term,
        counter_term,
        s_grade_term,
        troop_types,
        counters,
    }
}

/// Mean grade value over a hero's fitness entries; 0 for a hero with none.
fn average_grade(character: &Character) -> f64 {
    if character.troop_fitness.is_empty() {
        return 0.0;
    }
    character
        .troop_fitness
        .values()
        .map(|grade| grade.value())
        .sum::<f64>()
        / character.troop_fitness.len() as f64
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactionAnalysis {
    pub score: f64,
    pub shared_faction: Option<String>,
}

pub fn faction_synergy(members: &[&Character]) -> FactionAnalysis {
    let shared_faction = members.first().and_then(|first| {
        let faction = first.faction.as_str();
        (!faction.is_empty() && members.iter().all(|m| m.faction == faction))
            .then(|| faction.to_string())
    });
    FactionAnalysis {
        score: if shared_faction.is_some() { MAX_SCORE } else { 0.0 },
        shared_faction,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AbilityUse {
    pub hero: String,
    pub slot: AbilitySlot,
    pub ability: String,
    pub kind: String,
    pub quality: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AbilityPair {
    pub first: AbilityUse,
    pub second: AbilityUse,
    pub matched: [String; 2],
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AbilityAnalysis {
    pub score: f64,
    pub pairs: Vec<AbilityPair>,
    pub fallback: bool,
    pub inventory: Vec<AbilityUse>,
    /// Ability references that did not resolve in the roster.
    pub unresolved: Vec<String>,
}

pub fn ability_synergy<R: RosterRepository + ?Sized>(
    members: &[&Character],
    roster: &R,
    table: &PairTable,
) -> AbilityAnalysis {
    let mut inventory = Vec::new();
    let mut unresolved = Vec::new();
    for member in members {
        for (slot, name) in member.ability_refs() {
            match roster.ability(name) {
                Some(ability) => inventory.push(AbilityUse {
                    hero: member.name.clone(),
                    slot,
                    ability: ability.name.clone(),
                    kind: ability.kind.clone(),
                    quality: ability.quality.clone(),
                }),
                None => unresolved.push(name.to_string()),
            }
        }
    }

    let mut pairs = Vec::new();
    for (i, a) in inventory.iter().enumerate() {
        for b in inventory.iter().skip(i + 1) {
            if let Some(value) = table.lookup(&a.kind, &b.kind) {
                pairs.push(AbilityPair {
                    first: a.clone(),
                    second: b.clone(),
                    matched: [a.kind.clone(), b.kind.clone()],
                    value,
                });
            }
        }
    }

    let (score, fallback) = if pairs.is_empty() {
        (
            (ABILITY_FALLBACK_PER_HERO * members.len() as f64).clamp(0.0, MAX_SCORE),
            true,
        )
    } else {
        let average = pairs.iter().map(|p| p.value).sum::<f64>() / pairs.len() as f64;
        let bonus = (ABILITY_PAIR_BONUS * pairs.len() as f64).min(ABILITY_PAIR_BONUS_CAP);
        ((average + bonus).clamp(0.0, MAX_SCORE), false)
    };

    AbilityAnalysis {
        score,
        pairs,
        fallback,
        inventory,
        unresolved,
    }
}
