use std::collections::HashSet;

use serde::Serialize;

use crate::data::roster::{Character, RosterRepository};
use crate::synergy::cache::TeamKey;
use crate::synergy::SynergyEngine;

/// Members per recommended team.
pub const TEAM_SIZE: usize = 3;

/// Bucket for characters without any tag under the balanced strategy.
pub const UNTAGGED_GROUP: &str = "other";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamCandidate {
    pub members: [String; TEAM_SIZE],
}

impl TeamCandidate {
    fn from_characters(a: &Character, b: &Character, c: &Character) -> Self {
        Self {
            members: [a.name.clone(), b.name.clone(), c.name.clone()],
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.members.iter().any(|m| m == name)
    }

    pub fn key(&self) -> TeamKey {
        TeamKey::from_members(&self.members)
    }
}

/// Caps that bound the heuristic strategies. They limit cost only; they carry no game meaning.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchTunables {
    /// Members taken from each group when crossing three different groups.
    pub balanced_group_sample: usize,
    /// Members taken from one group when forming same-group teams.
    pub balanced_same_group_sample: usize,
    pub balanced_max_candidates: usize,
    /// Seed pairs kept by the high-synergy strategy.
    pub high_synergy_top_pairs: usize,
    /// Refuse exhaustive searches larger than this. `None` enumerates without limit.
    pub max_combinations: Option<usize>,
}

impl Default for SearchTunables {
    fn default() -> Self {
        Self {
            balanced_group_sample: 5,
            balanced_same_group_sample: 10,
            balanced_max_candidates: 500,
            high_synergy_top_pairs: 50,
            max_combinations: None,
        }
    }
}

/// n choose k without overflow for any realistic pool.
pub fn combination_count(n: usize, k: usize) -> u128 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    (0..k).fold(1u128, |acc, i| acc * (n - i) as u128 / (i + 1) as u128)
}

/// Every 3-combination of `pool` in index order. With a `lead`, the lead heads every team and
/// the remaining two seats take every pair of the rest of the pool.
pub fn exhaustive_candidates(pool: &[&Character], lead: Option<&str>) -> Vec<TeamCandidate> {
    if let Some(lead_name) = lead {
        let Some(lead) = pool.iter().find(|c| c.name == lead_name) else {
            return Vec::new();
        };
        let rest: Vec<&Character> = pool
            .iter()
            .copied()
            .filter(|c| c.name != lead_name)
            .collect();
        let mut candidates =
            Vec::with_capacity(combination_count(rest.len(), 2).min(1 << 20) as usize);
        for (i, b) in rest.iter().enumerate() {
            for c in rest.iter().skip(i + 1) {
                candidates.push(TeamCandidate::from_characters(lead, b, c));
            }
        }
        return candidates;
    }

    let mut candidates =
        Vec::with_capacity(combination_count(pool.len(), TEAM_SIZE).min(1 << 20) as usize);
    for (i, a) in pool.iter().enumerate() {
        for (j, b) in pool.iter().enumerate().skip(i + 1) {
            for c in pool.iter().skip(j + 1) {
                candidates.push(TeamCandidate::from_characters(a, b, c));
            }
        }
    }
    candidates
}

/// Characters grouped by primary tag, groups in order of first appearance.
pub fn group_by_primary_tag<'a>(pool: &[&'a Character]) -> Vec<(String, Vec<&'a Character>)> {
    let mut groups: Vec<(String, Vec<&'a Character>)> = Vec::new();
    for &character in pool {
        let tag = character.primary_tag().unwrap_or(UNTAGGED_GROUP);
        match groups.iter_mut().find(|(name, _)| name == tag) {
            Some((_, members)) => members.push(character),
            None => groups.push((tag.to_string(), vec![character])),
        }
    }
    groups
}

/// Cross-group teams from small samples of every three distinct groups, then same-group teams,
/// deduplicated and capped. Only teams passing `admit` count toward the cap.
pub fn balanced_candidates<F>(
    pool: &[&Character],
    tunables: &SearchTunables,
    admit: F,
) -> Vec<TeamCandidate>
where
    F: Fn(&TeamCandidate) -> bool,
{
    let groups = group_by_primary_tag(pool);
    let cap = tunables.balanced_max_candidates;
    let mut seen: HashSet<TeamKey> = HashSet::new();
    let mut candidates = Vec::new();

    let mut offer = |candidate: TeamCandidate, candidates: &mut Vec<TeamCandidate>| -> bool {
        if admit(&candidate) && seen.insert(candidate.key()) {
            candidates.push(candidate);
        }
        candidates.len() >= cap
    };

    let sample = tunables.balanced_group_sample;
    for (gi, (_, first)) in groups.iter().enumerate() {
        for (gj, (_, second)) in groups.iter().enumerate().skip(gi + 1) {
            for (_, third) in groups.iter().skip(gj + 1) {
                for a in first.iter().take(sample) {
                    for b in second.iter().take(sample) {
                        for c in third.iter().take(sample) {
                            if offer(TeamCandidate::from_characters(a, b, c), &mut candidates) {
                                return candidates;
                            }
                        }
                    }
                }
            }
        }
    }

    for (_, members) in groups.iter().filter(|(_, m)| m.len() >= TEAM_SIZE) {
        let members: Vec<&Character> = members
            .iter()
            .copied()
            .take(tunables.balanced_same_group_sample)
            .collect();
        for (i, a) in members.iter().enumerate() {
            for (j, b) in members.iter().enumerate().skip(i + 1) {
                for c in members.iter().skip(j + 1) {
                    if offer(TeamCandidate::from_characters(a, b, c), &mut candidates) {
                        return candidates;
                    }
                }
            }
        }
    }

    candidates
}

/// Greedy expansion of the best-scoring pairs. Each kept pair gets the single third member
/// that maximizes the team score; earlier pool entries win ties. A better team reachable only
/// through a lower-ranked pair is never found.
pub fn high_synergy_candidates<R: RosterRepository>(
    pool: &[&Character],
    engine: &SynergyEngine<R>,
    tunables: &SearchTunables,
    lead: Option<&str>,
) -> Vec<TeamCandidate> {
    if pool.len() < TEAM_SIZE {
        return Vec::new();
    }

    let mut pairs: Vec<(usize, usize, f64)> = Vec::new();
    for i in 0..pool.len() {
        for j in (i + 1)..pool.len() {
            if let Some(lead) = lead {
                if pool[i].name != lead && pool[j].name != lead {
                    continue;
                }
            }
            let score = engine.score(&[pool[i].name.as_str(), pool[j].name.as_str()]);
            pairs.push((i, j, score));
        }
    }
    pairs.sort_by(|l, r| r.2.total_cmp(&l.2));
    pairs.truncate(tunables.high_synergy_top_pairs);

    let mut seen: HashSet<TeamKey> = HashSet::new();
    let mut candidates = Vec::with_capacity(pairs.len());
    for (i, j, _) in pairs {
        let (a, b) = (pool[i], pool[j]);
        let mut best: Option<(f64, &Character)> = None;
        for (k, c) in pool.iter().enumerate() {
            if k == i || k == j {
                continue;
            }
            let score = engine.score(&[a.name.as_str(), b.name.as_str(), c.name.as_str()]);
            if best.map_or(true, |(current, _)| score > current) {
                best = Some((score, *c));
            }
        }
        if let Some((_, c)) = best {
            let candidate = TeamCandidate::from_characters(a, b, c);
            if seen.insert(candidate.key()) {
                candidates.push(candidate);
            }
        }
    }
    candidates
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::data::roster::Roster;

    fn hero(name: &str, tags: &[&str]) -> Character {
        Character {
            name: name.to_string(),
            faction: String::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            troop_fitness: BTreeMap::new(),
            innate_ability: None,
            inherited_ability: None,
            attributes: BTreeMap::new(),
        }
    }

    fn names(candidates: &[TeamCandidate]) -> Vec<String> {
        candidates.iter().map(|c| c.members.join("")).collect()
    }

    #[test]
    fn combination_count_matches_closed_form() {
        assert_eq!(combination_count(4, 3), 4);
        assert_eq!(combination_count(10, 3), 120);
        assert_eq!(combination_count(2, 3), 0);
        assert_eq!(combination_count(200, 3), 1_313_400);
    }

    #[test]
    fn exhaustive_runs_in_index_order() {
        let heroes: Vec<Character> = ["A", "B", "C", "D"].iter().map(|n| hero(n, &[])).collect();
        let pool: Vec<&Character> = heroes.iter().collect();
        assert_eq!(
            names(&exhaustive_candidates(&pool, None)),
            vec!["ABC", "ABD", "ACD", "BCD"]
        );
        assert_eq!(
            names(&exhaustive_candidates(&pool, Some("C"))),
            vec!["CAB", "CAD", "CBD"]
        );
    }

    #[test]
    fn balanced_groups_by_primary_tag_and_dedupes() {
        let heroes = vec![
            hero("A", &["control"]),
            hero("B", &["damage"]),
            hero("C", &[]),
            hero("D", &["control"]),
            hero("E", &["control"]),
        ];
        let pool: Vec<&Character> = heroes.iter().collect();
        let groups = group_by_primary_tag(&pool);
        let group_names: Vec<&str> = groups.iter().map(|(g, _)| g.as_str()).collect();
        assert_eq!(group_names, vec!["control", "damage", UNTAGGED_GROUP]);

        let candidates = balanced_candidates(&pool, &SearchTunables::default(), |_| true);
        // control x damage x other: A/D/E with B and C, then the one same-group team.
        assert_eq!(names(&candidates), vec!["ABC", "DBC", "EBC", "ADE"]);
    }

    #[test]
    fn balanced_respects_cap_and_admission() {
        let heroes: Vec<Character> = (0..12)
            .map(|i| hero(&format!("h{i}"), &[["x", "y", "z"][i % 3]]))
            .collect();
        let pool: Vec<&Character> = heroes.iter().collect();
        let tunables = SearchTunables {
            balanced_max_candidates: 7,
            ..SearchTunables::default()
        };
        assert_eq!(balanced_candidates(&pool, &tunables, |_| true).len(), 7);

        let with_h0 = balanced_candidates(&pool, &tunables, |c| c.contains("h0"));
        assert!(!with_h0.is_empty());
        assert!(with_h0.iter().all(|c| c.contains("h0")));
    }

    #[test]
    fn high_synergy_produces_unique_teams_containing_seed_pairs() {
        let heroes = vec![
            hero("A", &["heal"]),
            hero("B", &["tank"]),
            hero("C", &["damage"]),
            hero("D", &["control"]),
        ];
        let roster = Roster::from_parts(heroes.clone(), Vec::new());
        let engine = SynergyEngine::new(&roster);
        let pool: Vec<&Character> = heroes.iter().collect();
        let tunables = SearchTunables {
            high_synergy_top_pairs: 2,
            ..SearchTunables::default()
        };
        let candidates = high_synergy_candidates(&pool, &engine, &tunables, None);
        assert!(!candidates.is_empty() && candidates.len() <= 2);
        let keys: HashSet<TeamKey> = candidates.iter().map(TeamCandidate::key).collect();
        assert_eq!(keys.len(), candidates.len());

        let led = high_synergy_candidates(&pool, &engine, &SearchTunables::default(), Some("D"));
        assert!(led.iter().all(|c| c.contains("D")));
    }

    #[test]
    fn balanced_cross_group_pass_samples_first_members_only() {
        let mut heroes: Vec<Character> =
            (1..=7).map(|i| hero(&format!("C{i}"), &["control"])).collect();
        heroes.push(hero("D1", &["damage"]));
        heroes.push(hero("O1", &[]));
        let pool: Vec<&Character> = heroes.iter().collect();
        let cross_only = SearchTunables {
            balanced_same_group_sample: 0,
            ..SearchTunables::default()
        };
        let candidates = balanced_candidates(&pool, &cross_only, |_| true);
        assert_eq!(
            names(&candidates),
            vec!["C1D1O1", "C2D1O1", "C3D1O1", "C4D1O1", "C5D1O1"]
        );

        let all = balanced_candidates(&pool, &SearchTunables::default(), |_| true);
        let cross: Vec<&TeamCandidate> = all.iter().filter(|c| c.contains("D1")).collect();
        assert_eq!(cross.len(), 5);
        assert!(cross.iter().all(|c| !c.contains("C6") && !c.contains("C7")));
    }

    #[test]
    fn balanced_same_group_pass_samples_first_ten_members() {
        let heroes: Vec<Character> =
            (1..=12).map(|i| hero(&format!("M{i}"), &["control"])).collect();
        let pool: Vec<&Character> = heroes.iter().collect();
        let candidates = balanced_candidates(&pool, &SearchTunables::default(), |_| true);
        assert_eq!(candidates.len() as u128, combination_count(10, 3));
        assert!(candidates
            .iter()
            .all(|c| !c.contains("M11") && !c.contains("M12")));
    }

    #[test]
    fn high_synergy_ties_go_to_earliest_pool_entry() {
        // Identical heroes: every pair and every completion scores the same.
        let heroes: Vec<Character> = ["A", "B", "C", "D", "E"]
            .iter()
            .map(|n| hero(n, &["scout"]))
            .collect();
        let roster = Roster::from_parts(heroes.clone(), Vec::new());
        let engine = SynergyEngine::new(&roster);
        let pool: Vec<&Character> = heroes.iter().collect();

        let led = high_synergy_candidates(
            &pool,
            &engine,
            &SearchTunables {
                high_synergy_top_pairs: 1,
                ..SearchTunables::default()
            },
            Some("D"),
        );
        assert_eq!(names(&led), vec!["ADB"]);

        let all = high_synergy_candidates(&pool, &engine, &SearchTunables::default(), None);
        assert_eq!(names(&all), vec!["ABC", "ADB", "AEB", "CDA", "CEA", "DEA"]);
    }
}
