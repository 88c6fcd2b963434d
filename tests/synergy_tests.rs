use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use sgz_team_builder::data::roster::{
    load_roster_file, Ability, Character, LoadedRoster, Roster, RosterRepository,
};
use sgz_team_builder::synergy::report::AnalysisError;
use sgz_team_builder::synergy::{EngineConfig, SynergyEngine};

fn sample() -> LoadedRoster {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/roster.sample.json");
    load_roster_file(path).expect("sample roster should load")
}

fn sample_engine() -> SynergyEngine<Roster> {
    let loaded = sample();
    SynergyEngine::with_config(
        loaded.roster,
        EngineConfig {
            tables: loaded.tables,
            ..EngineConfig::default()
        },
    )
}

fn hero(name: &str, faction: &str, tags: &[&str]) -> Character {
    Character {
        name: name.to_string(),
        faction: faction.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        troop_fitness: BTreeMap::new(),
        innate_ability: None,
        inherited_ability: None,
        attributes: BTreeMap::new(),
    }
}

/// Wraps a roster and counts character lookups.
struct CountingRoster {
    inner: Roster,
    character_calls: AtomicUsize,
}

impl RosterRepository for CountingRoster {
    fn character_names(&self) -> Vec<String> {
        self.inner.character_names()
    }

    fn character(&self, name: &str) -> Option<&Character> {
        self.character_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.character(name)
    }

    fn ability(&self, name: &str) -> Option<&Ability> {
        self.inner.ability(name)
    }
}

#[test]
fn score_ignores_member_order() {
    let engine = sample_engine();
    let team = ["Cao Cao", "Guo Jia", "Xiahou Dun"];
    let expected = engine.score(&team);
    let permutations = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];
    for order in permutations {
        let permuted: Vec<&str> = order.iter().map(|&i| team[i]).collect();
        assert_eq!(engine.score(&permuted), expected, "order {order:?}");
    }
    // a repeated name does not change the team
    assert_eq!(
        engine.score(&["Guo Jia", "Cao Cao", "Xiahou Dun", "Cao Cao"]),
        expected
    );
}

#[test]
fn unknown_member_scores_zero() {
    let engine = sample_engine();
    assert_eq!(engine.score(&["Cao Cao", "Guo Jia", "Lu Bu"]), 0.0);
    assert_eq!(engine.score(&["Nobody"]), 0.0);
    assert!(matches!(
        engine.analyze_detailed(&["Cao Cao", "Lu Bu"]),
        Err(AnalysisError::UnknownCharacters(names)) if names == vec!["Lu Bu".to_string()]
    ));
}

#[test]
fn every_sample_team_is_within_bounds() {
    let engine = sample_engine();
    let names = engine.roster().character_names();
    for i in 0..names.len() {
        for j in (i + 1)..names.len() {
            for k in (j + 1)..names.len() {
                let team = [&names[i], &names[j], &names[k]];
                let score = engine.score(&team);
                assert!((0.0..=100.0).contains(&score), "{team:?} scored {score}");
            }
        }
    }
}

#[test]
fn repeated_score_is_served_from_cache() {
    let engine = SynergyEngine::new(CountingRoster {
        inner: Roster::from_parts(
            vec![hero("A", "Wei", &["control"]), hero("B", "Wei", &["damage"])],
            Vec::new(),
        ),
        character_calls: AtomicUsize::new(0),
    });

    let first = engine.score(&["A", "B"]);
    assert_eq!(engine.roster().character_calls.load(Ordering::SeqCst), 2);
    let second = engine.score(&["B", "A"]);
    assert_eq!(first, second);
    assert_eq!(engine.roster().character_calls.load(Ordering::SeqCst), 2);

    let stats = engine.cache_stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.len, 1);
}

#[test]
fn faction_sub_score_is_all_or_nothing() {
    let engine = sample_engine();
    let wei = engine
        .analyze_detailed(&["Cao Cao", "Xiahou Dun", "Guo Jia"])
        .expect("wei team");
    assert_eq!(wei.sub_scores.faction, 100.0);
    assert_eq!(wei.faction.shared_faction.as_deref(), Some("Wei"));

    let mixed = engine
        .analyze_detailed(&["Cao Cao", "Xiahou Dun", "Zhou Yu"])
        .expect("mixed team");
    assert_eq!(mixed.sub_scores.faction, 0.0);
    assert_eq!(mixed.faction.shared_faction, None);

    let unaffiliated = SynergyEngine::new(Roster::from_parts(
        vec![hero("X", "", &[]), hero("Y", "", &[])],
        Vec::new(),
    ));
    let report = unaffiliated.analyze_detailed(&["X", "Y"]).expect("report");
    assert_eq!(report.sub_scores.faction, 0.0);
}

#[test]
fn detailed_report_explains_matched_pairs() {
    let engine = sample_engine();
    let report = engine
        .analyze_detailed(&["Zhuge Liang", "Guan Yu", "Liu Bei"])
        .expect("shu team");
    assert_eq!(report.score, engine.score(&["Liu Bei", "Guan Yu", "Zhuge Liang"]));
    assert!(!report.tag.pairs.is_empty());
    for pair in &report.tag.pairs {
        let looked_up = engine
            .tables()
            .tags
            .lookup(&pair.matched[0], &pair.matched[1]);
        assert_eq!(looked_up, Some(pair.value));
    }
    assert_eq!(report.ability.inventory.len(), 6);
    assert!(report.ability.unresolved.is_empty());
}

#[test]
fn empty_team_behaviour() {
    let engine = sample_engine();
    assert_eq!(engine.score::<&str>(&[]), 0.0);
    assert_eq!(engine.score(&["  ", ""]), 0.0);
    assert_eq!(
        engine.analyze_detailed::<&str>(&[]),
        Err(AnalysisError::EmptyTeam)
    );
}
