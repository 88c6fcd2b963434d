use std::io;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::data::roster::{load_roster_file, LoadedRoster, Roster};
use crate::data::validate::{validate_roster_file, ValidationSeverity};
use crate::parallel::WorkerPool;
use crate::recommend::ranking::{filter_teams, write_teams_csv, TeamFilter};
use crate::recommend::team_generator::SearchTunables;
use crate::recommend::{Recommender, TeamConstraints};
use crate::server::{self, AppState};
use crate::synergy::cache::canonical_members;
use crate::synergy::{EngineConfig, SynergyEngine};

const USAGE: &str = "usage: sgz-team-builder <serve|recommend|score|analyze|search|validate>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Serve,
    Recommend,
    Score,
    Analyze,
    Search,
    Validate,
}

pub fn parse_command(args: &[String]) -> Option<Command> {
    match args.get(1).map(String::as_str) {
        Some("serve") => Some(Command::Serve),
        Some("recommend") => Some(Command::Recommend),
        Some("score") => Some(Command::Score),
        Some("analyze") => Some(Command::Analyze),
        Some("search") => Some(Command::Search),
        Some("validate") => Some(Command::Validate),
        _ => None,
    }
}

/// Run the command in `args` (program name first) and return the process exit code.
pub fn run_with_args(args: &[String]) -> i32 {
    let config = AppConfig::from_env();
    match parse_command(args) {
        Some(Command::Serve) => handle_serve(&config),
        Some(Command::Recommend) => handle_recommend(args, &config),
        Some(Command::Score) => handle_score(args, &config),
        Some(Command::Analyze) => handle_analyze(args, &config),
        Some(Command::Search) => handle_search(args, &config),
        Some(Command::Validate) => handle_validate(args, &config),
        None => {
            eprintln!("{USAGE}");
            2
        }
    }
}

fn handle_serve(config: &AppConfig) -> i32 {
    let loaded = match load_roster_file(&config.roster_path) {
        Ok(loaded) => loaded,
        Err(err) => {
            eprintln!("failed to load roster '{}': {err}", config.roster_path);
            return 1;
        }
    };
    let state = Arc::new(AppState::new(loaded, config));
    match server::run_server(&config.bind_addr, state) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("server error: {err}");
            1
        }
    }
}

#[derive(Debug, Default)]
struct RecommendArgs {
    roster: Option<String>,
    constraints: TeamConstraints,
    min_score: Option<f64>,
    workers: Option<usize>,
    csv: bool,
}

fn parse_recommend_args(args: &[String]) -> Result<RecommendArgs, String> {
    let mut parsed = RecommendArgs::default();
    let mut iter = args.iter().skip(2);
    while let Some(flag) = iter.next() {
        let mut value = |name: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("{name} requires a value"))
        };
        match flag.as_str() {
            "--roster" => parsed.roster = Some(value("--roster")?),
            "--strategy" => {
                parsed.constraints.strategy = value("--strategy")?.parse()?;
            }
            "--count" => {
                let raw = value("--count")?;
                parsed.constraints.count =
                    raw.parse().map_err(|_| format!("invalid count '{raw}'"))?;
            }
            "--hero" => parsed.constraints.required_hero = Some(value("--hero")?),
            "--faction" => parsed.constraints.required_faction = Some(value("--faction")?),
            "--tag" => parsed.constraints.required_tags.push(value("--tag")?),
            "--exclude" => parsed.constraints.excluded_heroes.extend(
                value("--exclude")?
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string),
            ),
            "--min-score" => {
                let raw = value("--min-score")?;
                parsed.min_score =
                    Some(raw.parse().map_err(|_| format!("invalid min score '{raw}'"))?);
            }
            "--workers" => {
                let raw = value("--workers")?;
                parsed.workers =
                    Some(raw.parse().map_err(|_| format!("invalid worker count '{raw}'"))?);
            }
            "--csv" => parsed.csv = true,
            other => return Err(format!("unknown option '{other}'")),
        }
    }
    Ok(parsed)
}

fn handle_recommend(args: &[String], config: &AppConfig) -> i32 {
    let parsed = match parse_recommend_args(args) {
        Ok(parsed) => parsed,
        Err(msg) => {
            eprintln!("{msg}");
            eprintln!(
                "usage: sgz-team-builder recommend [--roster P] [--strategy S] [--count N] \
                 [--hero H] [--faction F] [--tag T]... [--exclude A,B] [--min-score X] \
                 [--workers N] [--csv]"
            );
            return 2;
        }
    };
    let Some(loaded) = load_for(parsed.roster.as_deref(), config) else {
        return 1;
    };
    let engine = engine_for(loaded, config);
    let mut recommender = Recommender::new(&engine).with_tunables(SearchTunables {
        max_combinations: config.max_combinations,
        ..SearchTunables::default()
    });
    if let Some(workers) = parsed.workers {
        recommender = recommender.with_workers(WorkerPool::with_workers(workers));
    }

    let ranked = match recommender.recommend(&parsed.constraints) {
        Ok(ranked) => ranked,
        Err(err) => {
            eprintln!("recommendation failed: {err}");
            return 1;
        }
    };
    let teams = filter_teams(
        &ranked,
        &TeamFilter {
            min_score: parsed.min_score,
            ..TeamFilter::default()
        },
    );

    if parsed.csv {
        if let Err(err) = write_teams_csv(io::stdout().lock(), &teams) {
            eprintln!("failed to write csv: {err}");
            return 1;
        }
        return 0;
    }
    print_json(&teams)
}

fn handle_score(args: &[String], config: &AppConfig) -> i32 {
    let (roster, names) = split_roster_flag(&args[2..]);
    if names.is_empty() {
        eprintln!("usage: sgz-team-builder score [--roster P] <hero> [hero...]");
        return 2;
    }
    let Some(loaded) = load_for(roster.as_deref(), config) else {
        return 1;
    };
    let engine = engine_for(loaded, config);
    print_json(&serde_json::json!({
        "team": canonical_members(&names),
        "synergy_score": engine.score(&names),
    }))
}

fn handle_analyze(args: &[String], config: &AppConfig) -> i32 {
    let (roster, names) = split_roster_flag(&args[2..]);
    if names.is_empty() {
        eprintln!("usage: sgz-team-builder analyze [--roster P] <hero> [hero...]");
        return 2;
    }
    let Some(loaded) = load_for(roster.as_deref(), config) else {
        return 1;
    };
    let engine = engine_for(loaded, config);
    match engine.analyze_detailed(&names) {
        Ok(report) => print_json(&report),
        Err(err) => {
            eprintln!("analysis failed: {err}");
            1
        }
    }
}

fn handle_search(args: &[String], config: &AppConfig) -> i32 {
    let (roster, rest) = split_roster_flag(&args[2..]);
    let kind = rest.first().map(String::as_str);
    let keyword = rest.get(1).map(String::as_str).unwrap_or("");
    let Some(kind @ ("heroes" | "skills")) = kind else {
        eprintln!("usage: sgz-team-builder search [--roster P] <heroes|skills> [keyword]");
        return 2;
    };
    let Some(loaded) = load_for(roster.as_deref(), config) else {
        return 1;
    };
    if kind == "heroes" {
        print_json(&loaded.roster.search_characters(keyword))
    } else {
        print_json(&loaded.roster.search_abilities(keyword))
    }
}

fn handle_validate(args: &[String], config: &AppConfig) -> i32 {
    let path = args
        .get(2)
        .map(String::as_str)
        .unwrap_or(config.roster_path.as_str());

    match validate_roster_file(path) {
        Ok(report) => {
            for diagnostic in &report.diagnostics {
                eprintln!("- {diagnostic}");
            }
            if report.has_errors() {
                eprintln!(
                    "validation failed: {} error(s), {} warning(s)",
                    report.count(ValidationSeverity::Error),
                    report.count(ValidationSeverity::Warning)
                );
                1
            } else {
                println!(
                    "validation passed: {path} ({} warning(s))",
                    report.count(ValidationSeverity::Warning)
                );
                0
            }
        }
        Err(err) => {
            eprintln!("validation failed: {err}");
            1
        }
    }
}

/// Pull `--roster <path>` out of `args`, returning it and the remaining positionals.
fn split_roster_flag(args: &[String]) -> (Option<String>, Vec<String>) {
    let mut roster = None;
    let mut rest = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--roster" {
            roster = iter.next().cloned();
        } else {
            rest.push(arg.clone());
        }
    }
    (roster, rest)
}

fn load_for(roster: Option<&str>, config: &AppConfig) -> Option<LoadedRoster> {
    let path = roster.unwrap_or(config.roster_path.as_str());
    match load_roster_file(path) {
        Ok(loaded) => Some(loaded),
        Err(err) => {
            eprintln!("failed to load roster '{path}': {err}");
            None
        }
    }
}

fn engine_for(loaded: LoadedRoster, config: &AppConfig) -> SynergyEngine<Roster> {
    SynergyEngine::with_config(
        loaded.roster,
        EngineConfig {
            cache_capacity: config.cache_capacity,
            tables: loaded.tables,
            ..EngineConfig::default()
        },
    )
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(payload) => {
            println!("{payload}");
            0
        }
        Err(err) => {
            eprintln!("failed to serialize output: {err}");
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommend::SearchStrategy;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_recommend_flags() {
        let parsed = parse_recommend_args(&args(&[
            "bin",
            "recommend",
            "--strategy",
            "high-synergy",
            "--count",
            "4",
            "--tag",
            "control",
            "--exclude",
            "A, B",
            "--csv",
        ]))
        .expect("flags parse");
        assert_eq!(parsed.constraints.strategy, SearchStrategy::HighSynergy);
        assert_eq!(parsed.constraints.count, 4);
        assert_eq!(parsed.constraints.required_tags, vec!["control"]);
        assert_eq!(parsed.constraints.excluded_heroes, vec!["A", "B"]);
        assert!(parsed.csv);
    }

    #[test]
    fn rejects_unknown_and_incomplete_flags() {
        assert!(parse_recommend_args(&args(&["bin", "recommend", "--bogus"])).is_err());
        assert!(parse_recommend_args(&args(&["bin", "recommend", "--count"])).is_err());
        assert!(parse_recommend_args(&args(&["bin", "recommend", "--count", "x"])).is_err());
    }

    #[test]
    fn roster_flag_is_split_from_names() {
        let (roster, rest) = split_roster_flag(&args(&["A", "--roster", "r.json", "B"]));
        assert_eq!(roster.as_deref(), Some("r.json"));
        assert_eq!(rest, vec!["A", "B"]);
    }

    #[test]
    fn unknown_command_is_usage_error() {
        assert_eq!(parse_command(&args(&["bin", "simulate"])), None);
        assert_eq!(run_with_args(&args(&["bin"])), 2);
    }
}
