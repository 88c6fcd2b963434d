//! Synergy scoring engine.
//!
//! A team's score is a weighted blend of four dimensions (tags, troops, faction, abilities),
//! each normalized to [0, 100]. Scores are memoized by canonical team key, so member order
//! and repeated names never change the result.
//!
//! The cache is never invalidated when the roster changes: an engine is meant to live for one
//! roster snapshot. Build a new engine after reloading roster data.

pub mod cache;
pub mod dimensions;
pub mod report;
pub mod tables;

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::data::roster::{Character, RosterRepository};
use crate::synergy::cache::{
    canonical_members, CacheStats, ScoreCache, TeamKey, DEFAULT_CACHE_CAPACITY,
};
use crate::synergy::dimensions::{
    ability_synergy, faction_synergy, tag_synergy, troop_synergy, AbilityAnalysis,
    FactionAnalysis, TagAnalysis, TroopAnalysis, MAX_SCORE,
};
use crate::synergy::report::{AnalysisError, SubScores, SynergyReport, TeamStatistics};
use crate::synergy::tables::CompatibilityTables;

pub const TAG_WEIGHT: f64 = 0.25;
pub const TROOP_WEIGHT: f64 = 0.25;
pub const FACTION_WEIGHT: f64 = 0.15;
pub const ABILITY_WEIGHT: f64 = 0.35;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynergyWeights {
    pub tag: f64,
    pub troop: f64,
    pub faction: f64,
    pub ability: f64,
}

impl Default for SynergyWeights {
    fn default() -> Self {
        Self {
            tag: TAG_WEIGHT,
            troop: TROOP_WEIGHT,
            faction: FACTION_WEIGHT,
            ability: ABILITY_WEIGHT,
        }
    }
}

impl SynergyWeights {
    pub fn combine(&self, sub_scores: &SubScores) -> f64 {
        let total = sub_scores.tag * self.tag
            + sub_scores.troop * self.troop
            + sub_scores.faction * self.faction
            + sub_scores.ability * self.ability;
        total.clamp(0.0, MAX_SCORE)
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub weights: SynergyWeights,
    pub cache_capacity: usize,
    pub tables: CompatibilityTables,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weights: SynergyWeights::default(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            tables: CompatibilityTables::default(),
        }
    }
}

/// All four dimension analyses for one resolved team.
struct Breakdown {
    tag: TagAnalysis,
    troop: TroopAnalysis,
    faction: FactionAnalysis,
    ability: AbilityAnalysis,
}

impl Breakdown {
    fn sub_scores(&self) -> SubScores {
        SubScores {
            tag: self.tag.score,
            troop: self.troop.score,
            faction: self.faction.score,
            ability: self.ability.score,
        }
    }
}

/// Scores teams against one roster snapshot. Safe to share across threads; cache access is
/// serialized, though two threads missing on the same key may both compute it.
#[derive(Debug)]
pub struct SynergyEngine<R> {
    roster: R,
    weights: SynergyWeights,
    tables: CompatibilityTables,
    cache: Mutex<ScoreCache>,
}

impl<R: RosterRepository> SynergyEngine<R> {
    pub fn new(roster: R) -> Self {
        Self::with_config(roster, EngineConfig::default())
    }

    pub fn with_config(roster: R, config: EngineConfig) -> Self {
        Self {
            roster,
            weights: config.weights,
            tables: config.tables,
            cache: Mutex::new(ScoreCache::with_capacity(config.cache_capacity)),
        }
    }

    pub fn roster(&self) -> &R {
        &self.roster
    }

    pub fn weights(&self) -> SynergyWeights {
        self.weights
    }

    pub fn tables(&self) -> &CompatibilityTables {
        &self.tables
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.lock_cache().stats()
    }

    /// Synergy score in [0, 100]. Empty teams and teams with an unknown member score 0.
    pub fn score<S: AsRef<str>>(&self, team: &[S]) -> f64 {
        let key = TeamKey::from_members(team);
        if key.as_str().is_empty() {
            return 0.0;
        }
        if let Some(score) = self.lock_cache().get(&key) {
            return score;
        }

        let members = key.members();
        let Ok(resolved) = self.resolve(&members) else {
            return 0.0;
        };
        let score = self.weights.combine(&self.breakdown(&resolved).sub_scores());
        self.lock_cache().insert(key, score);
        score
    }

    /// Full explanation of a team's score, built from the same routines as [`Self::score`].
    pub fn analyze_detailed<S: AsRef<str>>(
        &self,
        team: &[S],
    ) -> Result<SynergyReport, AnalysisError> {
        let names = canonical_members(team);
        if names.is_empty() {
            return Err(AnalysisError::EmptyTeam);
        }
        let resolved = self.resolve(&names).map_err(AnalysisError::UnknownCharacters)?;
        let breakdown = self.breakdown(&resolved);
        let sub_scores = breakdown.sub_scores();
        Ok(SynergyReport {
            score: self.weights.combine(&sub_scores),
            statistics: TeamStatistics::from_members(&resolved),
            team: names,
            sub_scores,
            tag: breakdown.tag,
            troop: breakdown.troop,
            faction: breakdown.faction,
            ability: breakdown.ability,
        })
    }

    /// Look up every member once, in canonical order. Returns the unknown names on failure.
    fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<&Character>, Vec<String>> {
        let mut resolved = Vec::with_capacity(names.len());
        let mut unknown = Vec::new();
        for name in names {
            match self.roster.character(name.as_ref()) {
                Some(character) => resolved.push(character),
                None => unknown.push(name.as_ref().to_string()),
            }
        }
        if unknown.is_empty() {
            Ok(resolved)
        } else {
            tracing::debug!(?unknown, "team has unknown members");
            Err(unknown)
        }
    }

    fn breakdown(&self, members: &[&Character]) -> Breakdown {
        Breakdown {
            tag: tag_synergy(members, &self.tables.tags),
            troop: troop_synergy(members),
            faction: faction_synergy(members),
            ability: ability_synergy(members, &self.roster, &self.tables.abilities),
        }
    }

    fn lock_cache(&self) -> MutexGuard<'_, ScoreCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
