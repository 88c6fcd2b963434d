use std::io::Write;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedTeam {
    pub team: Vec<String>,
    pub score: f64,
}

impl RankedTeam {
    pub fn contains(&self, name: &str) -> bool {
        self.team.iter().any(|member| member == name)
    }
}

/// Sort by score, highest first. The sort is stable, so equal scores keep generation order.
pub fn rank_teams(mut scored: Vec<RankedTeam>, count: usize) -> Vec<RankedTeam> {
    scored.sort_by(|left, right| right.score.total_cmp(&left.score));
    scored.truncate(count);
    scored
}

/// Post-hoc criteria over an already ranked list.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TeamFilter {
    #[serde(default)]
    pub min_score: Option<f64>,
    #[serde(default)]
    pub must_include: Vec<String>,
    #[serde(default)]
    pub must_exclude: Vec<String>,
}

impl TeamFilter {
    pub fn is_empty(&self) -> bool {
        self.min_score.is_none() && self.must_include.is_empty() && self.must_exclude.is_empty()
    }

    pub fn matches(&self, team: &RankedTeam) -> bool {
        self.min_score.map_or(true, |min| team.score >= min)
            && self.must_include.iter().all(|name| team.contains(name))
            && !self.must_exclude.iter().any(|name| team.contains(name))
    }
}

/// Keep teams matching `filter`, in their original order.
pub fn filter_teams(teams: &[RankedTeam], filter: &TeamFilter) -> Vec<RankedTeam> {
    teams
        .iter()
        .filter(|team| filter.matches(team))
        .cloned()
        .collect()
}

/// Write `rank,member_1,member_2,member_3,score` rows.
pub fn write_teams_csv<W: Write>(writer: W, teams: &[RankedTeam]) -> Result<(), csv::Error> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(["rank", "member_1", "member_2", "member_3", "score"])?;
    for (index, team) in teams.iter().enumerate() {
        let member = |i: usize| team.team.get(i).map(String::as_str).unwrap_or("");
        out.write_record([
            (index + 1).to_string().as_str(),
            member(0),
            member(1),
            member(2),
            format!("{:.4}", team.score).as_str(),
        ])?;
    }
    out.flush()?;
    Ok(())
}
