//! Team recommendation search: filter the roster into a candidate pool, generate teams with
//! one of the strategies, score each through the synergy engine, then rank and truncate.
//!
//! Exhaustive search has no internal cap unless [`SearchTunables::max_combinations`] is set;
//! with large pools, filter first.

pub mod ranking;
pub mod team_generator;

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::roster::{Character, RosterRepository};
use crate::parallel::WorkerPool;
use crate::recommend::ranking::{rank_teams, RankedTeam};
use crate::recommend::team_generator::{
    balanced_candidates, combination_count, exhaustive_candidates, high_synergy_candidates,
    SearchTunables, TeamCandidate, TEAM_SIZE,
};
use crate::synergy::SynergyEngine;

pub const DEFAULT_RECOMMENDATION_COUNT: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Every 3-combination of the pool.
    #[default]
    Exhaustive,
    /// Sampled teams across primary-tag groups.
    Balanced,
    /// Greedy completion of the best-scoring pairs.
    HighSynergy,
}

impl SearchStrategy {
    pub const ALL: [SearchStrategy; 3] = [
        SearchStrategy::Exhaustive,
        SearchStrategy::Balanced,
        SearchStrategy::HighSynergy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SearchStrategy::Exhaustive => "exhaustive",
            SearchStrategy::Balanced => "balanced",
            SearchStrategy::HighSynergy => "high_synergy",
        }
    }
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchStrategy {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "exhaustive" => Ok(SearchStrategy::Exhaustive),
            "balanced" => Ok(SearchStrategy::Balanced),
            "high_synergy" => Ok(SearchStrategy::HighSynergy),
            other => Err(format!("unknown strategy '{other}'")),
        }
    }
}

/// Pool filters and search options for one recommendation request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TeamConstraints {
    #[serde(default)]
    pub required_faction: Option<String>,
    #[serde(default)]
    pub required_tags: Vec<String>,
    #[serde(default)]
    pub excluded_heroes: Vec<String>,
    #[serde(default)]
    pub required_hero: Option<String>,
    #[serde(default)]
    pub strategy: SearchStrategy,
    #[serde(default = "default_count")]
    pub count: usize,
}

fn default_count() -> usize {
    DEFAULT_RECOMMENDATION_COUNT
}

impl Default for TeamConstraints {
    fn default() -> Self {
        Self {
            required_faction: None,
            required_tags: Vec::new(),
            excluded_heroes: Vec::new(),
            required_hero: None,
            strategy: SearchStrategy::Exhaustive,
            count: DEFAULT_RECOMMENDATION_COUNT,
        }
    }
}

impl TeamConstraints {
    fn admits(&self, character: &Character, excluded: &HashSet<&str>) -> bool {
        self.required_faction
            .as_deref()
            .map_or(true, |faction| character.faction == faction)
            && self.required_tags.iter().all(|tag| character.has_tag(tag))
            && !excluded.contains(character.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecommendError {
    /// The required hero is unknown or was removed by the other filters.
    HeroNotInPool(String),
    SearchSpaceTooLarge { combinations: u128, limit: usize },
}

impl fmt::Display for RecommendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HeroNotInPool(hero) => write!(f, "hero not in pool: {hero}"),
            Self::SearchSpaceTooLarge {
                combinations,
                limit,
            } => write!(
                f,
                "search space too large: {combinations} combinations exceeds limit {limit}"
            ),
        }
    }
}

impl std::error::Error for RecommendError {}

pub struct Recommender<'a, R> {
    engine: &'a SynergyEngine<R>,
    tunables: SearchTunables,
    workers: Option<WorkerPool>,
}

impl<'a, R: RosterRepository + Sync> Recommender<'a, R> {
    pub fn new(engine: &'a SynergyEngine<R>) -> Self {
        Self {
            engine,
            tunables: SearchTunables::default(),
            workers: None,
        }
    }

    pub fn with_tunables(mut self, tunables: SearchTunables) -> Self {
        self.tunables = tunables;
        self
    }

    /// Score candidates on a rayon pool. Output order is unchanged.
    pub fn with_workers(mut self, workers: WorkerPool) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn tunables(&self) -> &SearchTunables {
        &self.tunables
    }

    /// Characters passing the faction, tag and exclusion filters, in roster order.
    pub fn candidate_pool(&self, constraints: &TeamConstraints) -> Vec<&'a Character> {
        let engine = self.engine;
        let roster = engine.roster();
        let excluded: HashSet<&str> = constraints
            .excluded_heroes
            .iter()
            .map(String::as_str)
            .collect();
        roster
            .character_names()
            .iter()
            .filter_map(|name| roster.character(name))
            .filter(|character| constraints.admits(character, &excluded))
            .collect()
    }

    /// Generated teams before scoring.
    pub fn generate(
        &self,
        constraints: &TeamConstraints,
    ) -> Result<Vec<TeamCandidate>, RecommendError> {
        let pool = self.candidate_pool(constraints);
        let lead = constraints.required_hero.as_deref();
        if let Some(hero) = lead {
            if !pool.iter().any(|c| c.name == hero) {
                return Err(RecommendError::HeroNotInPool(hero.to_string()));
            }
        }

        let candidates = match constraints.strategy {
            SearchStrategy::Exhaustive => {
                self.check_search_space(pool.len(), lead.is_some())?;
                exhaustive_candidates(&pool, lead)
            }
            SearchStrategy::Balanced => balanced_candidates(&pool, &self.tunables, |team| {
                lead.map_or(true, |hero| team.contains(hero))
            }),
            SearchStrategy::HighSynergy => {
                high_synergy_candidates(&pool, self.engine, &self.tunables, lead)
            }
        };
        tracing::debug!(
            strategy = %constraints.strategy,
            pool = pool.len(),
            candidates = candidates.len(),
            "candidates generated"
        );
        Ok(candidates)
    }

    /// Ranked teams for `constraints`, best first, at most `constraints.count` long.
    pub fn recommend(
        &self,
        constraints: &TeamConstraints,
    ) -> Result<Vec<RankedTeam>, RecommendError> {
        let candidates = self.generate(constraints)?;
        let scored = self.score_candidates(candidates);
        let ranked = rank_teams(scored, constraints.count);
        tracing::info!(
            strategy = %constraints.strategy,
            returned = ranked.len(),
            "recommendation complete"
        );
        Ok(ranked)
    }

    /// Teams led by `hero`, every pair of the remaining roster filling the other seats.
    pub fn recommend_for_hero(
        &self,
        hero: &str,
        count: usize,
    ) -> Result<Vec<RankedTeam>, RecommendError> {
        self.recommend(&TeamConstraints {
            required_hero: Some(hero.to_string()),
            count,
            ..TeamConstraints::default()
        })
    }

    pub fn recommend_by_faction(
        &self,
        faction: &str,
        count: usize,
    ) -> Result<Vec<RankedTeam>, RecommendError> {
        self.recommend(&TeamConstraints {
            required_faction: Some(faction.to_string()),
            count,
            ..TeamConstraints::default()
        })
    }

    pub fn recommend_by_tag(
        &self,
        tag: &str,
        count: usize,
    ) -> Result<Vec<RankedTeam>, RecommendError> {
        self.recommend(&TeamConstraints {
            required_tags: vec![tag.to_string()],
            count,
            ..TeamConstraints::default()
        })
    }

    fn check_search_space(&self, pool_len: usize, has_lead: bool) -> Result<(), RecommendError> {
        let Some(limit) = self.tunables.max_combinations else {
            return Ok(());
        };
        let combinations = if has_lead {
            combination_count(pool_len.saturating_sub(1), TEAM_SIZE - 1)
        } else {
            combination_count(pool_len, TEAM_SIZE)
        };
        if combinations > limit as u128 {
            tracing::warn!(%combinations, limit, "exhaustive search refused");
            return Err(RecommendError::SearchSpaceTooLarge {
                combinations,
                limit,
            });
        }
        Ok(())
    }

    fn score_candidates(&self, candidates: Vec<TeamCandidate>) -> Vec<RankedTeam> {
        let engine = self.engine;
        let score_one = |candidate: TeamCandidate| RankedTeam {
            score: engine.score(&candidate.members),
            team: candidate.members.to_vec(),
        };
        match self.workers {
            Some(pool) => pool.install(|| candidates.into_par_iter().map(score_one).collect()),
            None => candidates.into_iter().map(score_one).collect(),
        }
    }
}
