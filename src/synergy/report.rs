use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::data::roster::Character;
use crate::synergy::dimensions::{AbilityAnalysis, FactionAnalysis, TagAnalysis, TroopAnalysis};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubScores {
    pub tag: f64,
    pub troop: f64,
    pub faction: f64,
    pub ability: f64,
}

/// Counts over the team that do not feed the score.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TeamStatistics {
    pub tag_distribution: BTreeMap<String, usize>,
    pub troop_distribution: BTreeMap<String, usize>,
    pub faction_distribution: BTreeMap<String, usize>,
}

impl TeamStatistics {
    pub fn from_members(members: &[&Character]) -> Self {
        let mut stats = Self::default();
        for member in members {
            for tag in &member.tags {
                *stats.tag_distribution.entry(tag.clone()).or_default() += 1;
            }
            for troop in member.troop_fitness.keys() {
                *stats
                    .troop_distribution
                    .entry(troop.as_str().to_string())
                    .or_default() += 1;
            }
            let faction = if member.faction.is_empty() {
                "unaffiliated"
            } else {
                member.faction.as_str()
            };
            *stats
                .faction_distribution
                .entry(faction.to_string())
                .or_default() += 1;
        }
        stats
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynergyReport {
    pub team: Vec<String>,
    pub score: f64,
    pub sub_scores: SubScores,
    pub tag: TagAnalysis,
    pub troop: TroopAnalysis,
    pub faction: FactionAnalysis,
    pub ability: AbilityAnalysis,
    pub statistics: TeamStatistics,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    EmptyTeam,
    UnknownCharacters(Vec<String>),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyTeam => write!(f, "empty team"),
            Self::UnknownCharacters(names) => {
                write!(f, "unknown characters: {}", names.join(", "))
            }
        }
    }
}

impl std::error::Error for AnalysisError {}
