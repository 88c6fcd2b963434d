//! Roster model and in-memory repository.
//!
//! A roster file carries characters, abilities and (optionally) replacement compatibility
//! tables. JSON is the default on-disk format; `.yaml` / `.yml` files are parsed as YAML.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::synergy::tables::{CompatibilityEntry, CompatibilityTables, PairTable};

pub const DEFAULT_ROSTER_PATH: &str = "data/roster.sample.json";

/// Combat role a character can lead. `Siege` has no place in the counter cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TroopType {
    #[serde(alias = "骑兵")]
    Cavalry,
    #[serde(alias = "盾兵")]
    Shield,
    #[serde(alias = "弓兵")]
    Bow,
    #[serde(alias = "枪兵")]
    Spear,
    #[serde(alias = "器械")]
    Siege,
}

impl TroopType {
    pub const ALL: [TroopType; 5] = [
        TroopType::Cavalry,
        TroopType::Shield,
        TroopType::Bow,
        TroopType::Spear,
        TroopType::Siege,
    ];

    /// The troop type this one dominates: cavalry > shield > bow > spear > cavalry.
    pub fn counters(self) -> Option<TroopType> {
        match self {
            TroopType::Cavalry => Some(TroopType::Shield),
            TroopType::Shield => Some(TroopType::Bow),
            TroopType::Bow => Some(TroopType::Spear),
            TroopType::Spear => Some(TroopType::Cavalry),
            TroopType::Siege => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TroopType::Cavalry => "cavalry",
            TroopType::Shield => "shield",
            TroopType::Bow => "bow",
            TroopType::Spear => "spear",
            TroopType::Siege => "siege",
        }
    }
}

impl fmt::Display for TroopType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TroopGrade {
    S,
    A,
    B,
    C,
}

impl TroopGrade {
    pub fn value(self) -> f64 {
        match self {
            TroopGrade::S => 5.0,
            TroopGrade::A => 4.0,
            TroopGrade::B => 3.0,
            TroopGrade::C => 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    #[serde(default)]
    pub faction: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub troop_fitness: BTreeMap<TroopType, TroopGrade>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub innate_ability: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherited_ability: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, f64>,
}

impl Character {
    /// First tag, used as the grouping key by the balanced strategy.
    pub fn primary_tag(&self) -> Option<&str> {
        self.tags.first().map(String::as_str)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Innate then inherited ability names, skipping unset or blank references.
    pub fn ability_refs(&self) -> impl Iterator<Item = (AbilitySlot, &str)> {
        [
            (AbilitySlot::Innate, self.innate_ability.as_deref()),
            (AbilitySlot::Inherited, self.inherited_ability.as_deref()),
        ]
        .into_iter()
        .filter_map(|(slot, name)| {
            name.map(str::trim)
                .filter(|name| !name.is_empty())
                .map(|name| (slot, name))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbilitySlot {
    Innate,
    Inherited,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ability {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub quality: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Read access to character and ability records. Scoring and search only ever read.
pub trait RosterRepository {
    /// All character names in roster order.
    fn character_names(&self) -> Vec<String>;
    fn character(&self, name: &str) -> Option<&Character>;
    fn ability(&self, name: &str) -> Option<&Ability>;
}

impl<T: RosterRepository + ?Sized> RosterRepository for &T {
    fn character_names(&self) -> Vec<String> {
        (**self).character_names()
    }

    fn character(&self, name: &str) -> Option<&Character> {
        (**self).character(name)
    }

    fn ability(&self, name: &str) -> Option<&Ability> {
        (**self).ability(name)
    }
}

impl<T: RosterRepository + ?Sized> RosterRepository for Arc<T> {
    fn character_names(&self) -> Vec<String> {
        (**self).character_names()
    }

    fn character(&self, name: &str) -> Option<&Character> {
        (**self).character(name)
    }

    fn ability(&self, name: &str) -> Option<&Ability> {
        (**self).ability(name)
    }
}

/// Read-only snapshot of characters and abilities with name indices.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    characters: Vec<Character>,
    abilities: Vec<Ability>,
    character_index: HashMap<String, usize>,
    ability_index: HashMap<String, usize>,
}

impl Roster {
    /// Build a roster. When a name repeats, the first record wins.
    pub fn from_parts(characters: Vec<Character>, abilities: Vec<Ability>) -> Self {
        let mut character_index = HashMap::with_capacity(characters.len());
        let mut kept_characters = Vec::with_capacity(characters.len());
        for mut character in characters {
            character.name = character.name.trim().to_string();
            if character_index.contains_key(&character.name) {
                continue;
            }
            character_index.insert(character.name.clone(), kept_characters.len());
            kept_characters.push(character);
        }

        let mut ability_index = HashMap::with_capacity(abilities.len());
        let mut kept_abilities = Vec::with_capacity(abilities.len());
        for mut ability in abilities {
            ability.name = ability.name.trim().to_string();
            if ability_index.contains_key(&ability.name) {
                continue;
            }
            ability_index.insert(ability.name.clone(), kept_abilities.len());
            kept_abilities.push(ability);
        }

        Self {
            characters: kept_characters,
            abilities: kept_abilities,
            character_index,
            ability_index,
        }
    }

    pub fn characters(&self) -> &[Character] {
        &self.characters
    }

    pub fn abilities(&self) -> &[Ability] {
        &self.abilities
    }

    /// Characters whose name, faction or any tag contains `keyword`. Empty keyword matches all.
    pub fn search_characters(&self, keyword: &str) -> Vec<&Character> {
        let keyword = keyword.trim();
        self.characters
            .iter()
            .filter(|c| {
                keyword.is_empty()
                    || c.name.contains(keyword)
                    || c.faction.contains(keyword)
                    || c.tags.iter().any(|t| t.contains(keyword))
            })
            .collect()
    }

    /// Abilities whose name, type or quality contains `keyword`. Empty keyword matches all.
    pub fn search_abilities(&self, keyword: &str) -> Vec<&Ability> {
        let keyword = keyword.trim();
        self.abilities
            .iter()
            .filter(|a| {
                keyword.is_empty()
                    || a.name.contains(keyword)
                    || a.kind.contains(keyword)
                    || a.quality.contains(keyword)
            })
            .collect()
    }
}

impl RosterRepository for Roster {
    fn character_names(&self) -> Vec<String> {
        self.characters.iter().map(|c| c.name.clone()).collect()
    }

    fn character(&self, name: &str) -> Option<&Character> {
        self.character_index
            .get(name)
            .and_then(|&i| self.characters.get(i))
    }

    fn ability(&self, name: &str) -> Option<&Ability> {
        self.ability_index
            .get(name)
            .and_then(|&i| self.abilities.get(i))
    }
}

/// On-disk roster document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RosterFile {
    #[serde(default)]
    pub characters: Vec<Character>,
    #[serde(default)]
    pub abilities: Vec<Ability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_compatibility: Option<Vec<CompatibilityEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ability_compatibility: Option<Vec<CompatibilityEntry>>,
}

impl RosterFile {
    /// Built-in tables, with each table replaced when the file supplies one.
    pub fn compatibility_tables(&self) -> CompatibilityTables {
        let defaults = CompatibilityTables::default();
        CompatibilityTables {
            tags: self
                .tag_compatibility
                .as_deref()
                .map(PairTable::from_entries)
                .unwrap_or(defaults.tags),
            abilities: self
                .ability_compatibility
                .as_deref()
                .map(PairTable::from_entries)
                .unwrap_or(defaults.abilities),
        }
    }
}

/// Roster plus the compatibility tables that came with it.
#[derive(Debug, Clone)]
pub struct LoadedRoster {
    pub roster: Roster,
    pub tables: CompatibilityTables,
}

impl From<RosterFile> for LoadedRoster {
    fn from(file: RosterFile) -> Self {
        let tables = file.compatibility_tables();
        LoadedRoster {
            roster: Roster::from_parts(file.characters, file.abilities),
            tables,
        }
    }
}

#[derive(Debug)]
pub enum RosterError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Yaml(serde_yaml::Error),
}

impl fmt::Display for RosterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "unable to read roster: {err}"),
            Self::Json(err) => write!(f, "invalid roster json: {err}"),
            Self::Yaml(err) => write!(f, "invalid roster yaml: {err}"),
        }
    }
}

impl std::error::Error for RosterError {}

impl From<std::io::Error> for RosterError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

/// Parse a roster document without resolving it into indices.
pub fn read_roster_file(path: impl AsRef<Path>) -> Result<RosterFile, RosterError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)?;
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| {
            ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml")
        });
    if is_yaml {
        serde_yaml::from_str(&raw).map_err(RosterError::Yaml)
    } else {
        serde_json::from_str(&raw).map_err(RosterError::Json)
    }
}

pub fn load_roster_file(path: impl AsRef<Path>) -> Result<LoadedRoster, RosterError> {
    let file = read_roster_file(path.as_ref())?;
    tracing::debug!(
        path = %path.as_ref().display(),
        characters = file.characters.len(),
        abilities = file.abilities.len(),
        "roster loaded"
    );
    Ok(LoadedRoster::from(file))
}
