use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::data::roster::{
    Ability, Character, LoadedRoster, Roster, RosterRepository, TroopType,
};
use crate::recommend::ranking::{filter_teams, RankedTeam, TeamFilter};
use crate::recommend::team_generator::SearchTunables;
use crate::recommend::{RecommendError, Recommender, SearchStrategy, TeamConstraints};
use crate::synergy::cache::{canonical_members, CacheStats};
use crate::synergy::report::{AnalysisError, SynergyReport};
use crate::synergy::{EngineConfig, SynergyEngine};

/// Everything a request handler needs, loaded once at startup.
#[derive(Debug)]
pub struct AppState {
    pub roster: Arc<Roster>,
    pub engine: SynergyEngine<Arc<Roster>>,
    pub tunables: SearchTunables,
}

impl AppState {
    pub fn new(loaded: LoadedRoster, config: &AppConfig) -> Self {
        let roster = Arc::new(loaded.roster);
        let engine = SynergyEngine::with_config(
            Arc::clone(&roster),
            EngineConfig {
                cache_capacity: config.cache_capacity,
                tables: loaded.tables,
                ..EngineConfig::default()
            },
        );
        Self {
            roster,
            engine,
            tunables: SearchTunables {
                max_combinations: config.max_combinations,
                ..SearchTunables::default()
            },
        }
    }

    /// State over `roster` with built-in tables and default configuration.
    pub fn from_roster(roster: Roster) -> Self {
        Self::new(
            LoadedRoster {
                roster,
                tables: Default::default(),
            },
            &AppConfig::default(),
        )
    }
}

#[derive(Debug)]
pub enum ApiError {
    Parse(serde_json::Error),
    BadRequest(String),
    NotFound(String),
    Serialize(serde_json::Error),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "Invalid request body: {err}"),
            Self::BadRequest(msg) | Self::NotFound(msg) => write!(f, "{msg}"),
            Self::Serialize(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<RecommendError> for ApiError {
    fn from(err: RecommendError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

pub fn health_payload() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&serde_json::json!({
        "status": "ok",
        "service": "sgz-team-builder",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[derive(Debug, Serialize)]
struct HeroList<'a> {
    count: usize,
    heroes: Vec<&'a Character>,
}

pub fn heroes_payload(state: &AppState, keyword: Option<&str>) -> Result<String, ApiError> {
    let heroes = state.roster.search_characters(keyword.unwrap_or(""));
    serde_json::to_string_pretty(&HeroList {
        count: heroes.len(),
        heroes,
    })
    .map_err(ApiError::Serialize)
}

pub fn hero_payload(state: &AppState, name: &str) -> Result<String, ApiError> {
    let hero = state
        .roster
        .character(name)
        .ok_or_else(|| ApiError::NotFound(format!("hero not found: {name}")))?;
    serde_json::to_string_pretty(hero).map_err(ApiError::Serialize)
}

#[derive(Debug, Serialize)]
struct SkillList<'a> {
    count: usize,
    skills: Vec<&'a Ability>,
}

pub fn skills_payload(state: &AppState, keyword: Option<&str>) -> Result<String, ApiError> {
    let skills = state.roster.search_abilities(keyword.unwrap_or(""));
    serde_json::to_string_pretty(&SkillList {
        count: skills.len(),
        skills,
    })
    .map_err(ApiError::Serialize)
}

pub fn skill_payload(state: &AppState, name: &str) -> Result<String, ApiError> {
    let skill = state
        .roster
        .ability(name)
        .ok_or_else(|| ApiError::NotFound(format!("skill not found: {name}")))?;
    serde_json::to_string_pretty(skill).map_err(ApiError::Serialize)
}

#[derive(Debug, Serialize)]
pub struct MetadataResponse {
    pub factions: Vec<String>,
    pub tags: Vec<String>,
    pub troop_types: Vec<&'static str>,
    pub strategies: Vec<&'static str>,
    pub hero_count: usize,
    pub skill_count: usize,
    pub cache: CacheStats,
}

pub fn metadata_payload(state: &AppState) -> Result<String, ApiError> {
    let characters = state.roster.characters();
    let factions: BTreeSet<&str> = characters
        .iter()
        .map(|c| c.faction.as_str())
        .filter(|f| !f.is_empty())
        .collect();
    let tags: BTreeSet<&str> = characters
        .iter()
        .flat_map(|c| c.tags.iter().map(String::as_str))
        .collect();
    let response = MetadataResponse {
        factions: factions.into_iter().map(str::to_string).collect(),
        tags: tags.into_iter().map(str::to_string).collect(),
        troop_types: TroopType::ALL.iter().map(|t| t.as_str()).collect(),
        strategies: SearchStrategy::ALL.iter().map(|s| s.as_str()).collect(),
        hero_count: characters.len(),
        skill_count: state.roster.abilities().len(),
        cache: state.engine.cache_stats(),
    };
    serde_json::to_string_pretty(&response).map_err(ApiError::Serialize)
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecommendRequest {
    #[serde(flatten)]
    pub constraints: TeamConstraints,
    #[serde(flatten)]
    pub filter: TeamFilter,
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub status: &'static str,
    pub strategy: SearchStrategy,
    pub generated_at: String,
    pub count: usize,
    pub teams: Vec<RankedTeam>,
}

pub fn recommend_payload(state: &AppState, body: &str) -> Result<String, ApiError> {
    let body = if body.trim().is_empty() { "{}" } else { body };
    let request: RecommendRequest = serde_json::from_str(body).map_err(ApiError::Parse)?;
    let recommender = Recommender::new(&state.engine).with_tunables(state.tunables.clone());
    let ranked = recommender.recommend(&request.constraints)?;
    let teams = if request.filter.is_empty() {
        ranked
    } else {
        filter_teams(&ranked, &request.filter)
    };
    let response = RecommendResponse {
        status: "ok",
        strategy: request.constraints.strategy,
        generated_at: chrono::Utc::now().to_rfc3339(),
        count: teams.len(),
        teams,
    };
    serde_json::to_string_pretty(&response).map_err(ApiError::Serialize)
}

#[derive(Debug, Clone, Deserialize)]
pub struct SynergyRequest {
    pub heroes: Vec<String>,
    #[serde(default)]
    pub detailed: bool,
}

#[derive(Debug, Serialize)]
pub struct SynergyResponse {
    pub team: Vec<String>,
    pub synergy_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<SynergyReport>,
}

pub fn synergy_payload(state: &AppState, body: &str) -> Result<String, ApiError> {
    let request: SynergyRequest = serde_json::from_str(body).map_err(ApiError::Parse)?;
    let response = if request.detailed {
        let report = state
            .engine
            .analyze_detailed(&request.heroes)
            .map_err(|err| match err {
                AnalysisError::EmptyTeam => ApiError::BadRequest(err.to_string()),
                AnalysisError::UnknownCharacters(_) => ApiError::NotFound(err.to_string()),
            })?;
        SynergyResponse {
            team: report.team.clone(),
            synergy_score: report.score,
            report: Some(report),
        }
    } else {
        SynergyResponse {
            team: canonical_members(&request.heroes),
            synergy_score: state.engine.score(&request.heroes),
            report: None,
        }
    };
    serde_json::to_string_pretty(&response).map_err(ApiError::Serialize)
}
