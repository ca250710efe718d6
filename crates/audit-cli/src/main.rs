use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use audit_api::{mirror_round, serve, GameApi, InMemoryLedger, ServeOptions, SqliteKvStore};
use audit_core::{leaderboard, IdentityStore};
use contracts::{GameConfig, HistoryEntry, Phase};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_SQLITE_PATH: &str = "chain_audit.sqlite";
const DEFAULT_SERVE_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_PLAYER_NAME: &str = "auditor";

fn print_usage() {
    println!("audit-cli commands:");
    println!("  status [sqlite_path]");
    println!("  scenarios");
    println!("  simulate <name> <seed> [rounds] [sqlite_path] [--mirror]");
    println!("  history [sqlite_path]");
    println!("  leaderboard [sqlite_path]");
    println!("  serve [addr] [sqlite_path] [--paused]");
    println!();
    println!("global options:");
    println!("  --config <path>   JSON game config (or CHAIN_AUDIT_CONFIG)");
    println!();
    println!("sqlite_path defaults to CHAIN_AUDIT_SQLITE_PATH or {DEFAULT_SQLITE_PATH}");
}

/// Splits raw arguments into positionals and recognised flags.
#[derive(Debug, Default)]
struct Invocation {
    positional: Vec<String>,
    config_path: Option<String>,
    mirror: bool,
    paused: bool,
}

fn parse_invocation(args: &[String]) -> Result<Invocation, String> {
    let mut invocation = Invocation::default();
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter
                    .next()
                    .ok_or_else(|| "--config requires a path".to_string())?;
                invocation.config_path = Some(path.clone());
            }
            "--mirror" => invocation.mirror = true,
            "--paused" => invocation.paused = true,
            flag if flag.starts_with("--") => return Err(format!("unknown flag: {flag}")),
            _ => invocation.positional.push(arg.clone()),
        }
    }
    Ok(invocation)
}

fn parse_u64(value: &str, field: &str) -> Result<u64, String> {
    value
        .parse::<u64>()
        .map_err(|_| format!("invalid {field}: {value}"))
}

fn parse_seed(value: &str) -> Result<u64, String> {
    parse_u64(value, "seed")
}

fn parse_socket_addr(value: &str) -> Result<SocketAddr, String> {
    value
        .parse::<SocketAddr>()
        .map_err(|_| format!("invalid socket address: {value}"))
}

fn default_sqlite_path() -> PathBuf {
    env::var("CHAIN_AUDIT_SQLITE_PATH")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SQLITE_PATH))
}

fn parse_sqlite_path(value: Option<&String>) -> PathBuf {
    value.map(PathBuf::from).unwrap_or_else(default_sqlite_path)
}

fn load_config(path: Option<&str>) -> Result<GameConfig, String> {
    let path = path.map(str::to_string).or_else(|| {
        env::var("CHAIN_AUDIT_CONFIG")
            .ok()
            .filter(|value| !value.trim().is_empty())
    });
    let Some(path) = path else {
        return Ok(GameConfig::default());
    };

    let raw = fs::read_to_string(&path).map_err(|err| format!("reading {path}: {err}"))?;
    let config: GameConfig =
        serde_json::from_str(&raw).map_err(|err| format!("parsing {path}: {err}"))?;
    config.validate().map_err(|err| format!("{path}: {err}"))?;
    Ok(config)
}

fn open_identity(path: &Path) -> Result<IdentityStore, String> {
    let store = SqliteKvStore::open(path).map_err(|err| err.to_string())?;
    Ok(IdentityStore::new(Box::new(store)))
}

fn run_status(invocation: &Invocation) -> Result<(), String> {
    let path = parse_sqlite_path(invocation.positional.get(1));
    let identity = open_identity(&path)?;
    match identity.load_profile().map_err(|err| err.to_string())? {
        Some(profile) => {
            println!("player: {} ({})", profile.name, profile.id);
            println!("wallet: {}", profile.wallet_address);
            println!("balance: {} tokens", profile.token_balance);
            println!("rounds played: {}", profile.rounds_played);
        }
        None => println!("no profile registered in {}", path.display()),
    }
    Ok(())
}

fn run_scenarios() {
    for scenario in audit_api::scenario_catalog() {
        println!(
            "#{:<2} {:<32} {:<14} {:?}",
            scenario.id, scenario.title, scenario.category, scenario.difficulty
        );
    }
}

fn run_history(invocation: &Invocation) -> Result<(), String> {
    let path = parse_sqlite_path(invocation.positional.get(1));
    let history = open_identity(&path)?
        .load_history()
        .map_err(|err| err.to_string())?;
    if history.is_empty() {
        println!("no rounds recorded");
    }
    for entry in &history {
        print_history_entry(entry);
    }
    Ok(())
}

fn run_leaderboard(invocation: &Invocation) -> Result<(), String> {
    let path = parse_sqlite_path(invocation.positional.get(1));
    let history = open_identity(&path)?
        .load_history()
        .map_err(|err| err.to_string())?;
    for entry in leaderboard::aggregate(&history) {
        let marker = if entry.is_simulated { "" } else { " (you)" };
        println!(
            "{:>2}. {:<20} rewards={:<4} wins={}/{}{marker}",
            entry.rank, entry.name, entry.total_rewards, entry.wins, entry.rounds_played
        );
    }
    Ok(())
}

fn print_history_entry(entry: &HistoryEntry) {
    println!(
        "round {} [{}] {}: {} as {} earned {}",
        entry.round_number,
        entry.scenario_category,
        entry.scenario_title,
        entry.outcome,
        entry.human_role,
        entry.human_reward
    );
}

async fn run_simulation(invocation: &Invocation) -> Result<(), String> {
    let name = invocation
        .positional
        .get(1)
        .ok_or_else(|| "simulate requires <name>".to_string())?;
    let seed = parse_seed(
        invocation
            .positional
            .get(2)
            .ok_or_else(|| "simulate requires <seed>".to_string())?,
    )?;
    let rounds = match invocation.positional.get(3) {
        Some(value) => parse_u64(value, "rounds")?,
        None => 1,
    };
    if rounds == 0 {
        return Err("rounds must be >= 1".to_string());
    }
    let path = parse_sqlite_path(invocation.positional.get(4));

    let mut config = load_config(invocation.config_path.as_deref())?;
    config.seed = seed;
    let max_ticks =
        u64::from(config.matching_secs + config.discussion_secs + config.voting_secs) + 5;

    let mut api = GameApi::open_sqlite(config, &path, name).map_err(|err| err.to_string())?;
    let ledger = InMemoryLedger::new();
    let mut vote_rng = StdRng::seed_from_u64(seed.rotate_left(17));

    for round in 0..rounds {
        let fee = api.config().entry_fee;
        if api.profile().token_balance < fee {
            println!(
                "stopping: balance {} is below the entry fee {fee}",
                api.profile().token_balance
            );
            break;
        }

        let engine = api.engine_mut();
        let started = if round == 0 || engine.phase() != Phase::Results {
            engine.start_match()
        } else {
            engine.next_round()
        };
        started.map_err(|err| err.to_string())?;

        if !engine.run_until_phase(Phase::Voting, max_ticks) {
            return Err(format!("round stalled in {}", engine.phase()));
        }
        let human_id = engine.human_id().to_string();
        let candidates: Vec<String> = engine
            .state()
            .roster
            .iter()
            .filter(|player| player.id != human_id)
            .map(|player| player.id.clone())
            .collect();
        if let Some(target) = candidates.choose(&mut vote_rng) {
            engine
                .cast_vote(target.clone())
                .map_err(|err| err.to_string())?;
        }
        if !engine.run_until_phase(Phase::Results, max_ticks) {
            return Err(format!("round stalled in {}", engine.phase()));
        }

        let Some(entry) = api.history().first().cloned() else {
            return Err("round finished without a history entry".to_string());
        };
        print_history_entry(&entry);

        if invocation.mirror {
            match mirror_round(&ledger, &entry).await {
                Some(game_id) => println!("  mirrored to ledger game {game_id}"),
                None => println!("  ledger unavailable; kept local result"),
            }
        }
    }

    if let Some(error) = api.last_persistence_error() {
        eprintln!("warning: {error}");
    }
    info!(
        balance = api.profile().token_balance,
        rounds_played = api.profile().rounds_played,
        "simulation finished"
    );
    println!("final balance: {} tokens", api.profile().token_balance);
    Ok(())
}

async fn run_serve(invocation: &Invocation) -> Result<(), String> {
    let addr = parse_socket_addr(
        invocation
            .positional
            .get(1)
            .map(String::as_str)
            .unwrap_or(DEFAULT_SERVE_ADDR),
    )?;
    let config = load_config(invocation.config_path.as_deref())?;
    let options = ServeOptions {
        addr,
        config,
        sqlite_path: Some(parse_sqlite_path(invocation.positional.get(2))),
        player_name: DEFAULT_PLAYER_NAME.to_string(),
        paused: invocation.paused,
    };
    serve(options).await.map_err(|err| err.to_string())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let args = env::args().collect::<Vec<_>>();
    let invocation = match parse_invocation(&args) {
        Ok(invocation) => invocation,
        Err(err) => {
            eprintln!("error: {err}");
            print_usage();
            std::process::exit(2);
        }
    };

    let result = match invocation.positional.first().map(String::as_str) {
        Some("status") => run_status(&invocation),
        Some("scenarios") => {
            run_scenarios();
            Ok(())
        }
        Some("simulate") => run_simulation(&invocation).await,
        Some("history") => run_history(&invocation),
        Some("leaderboard") => run_leaderboard(&invocation),
        Some("serve") => run_serve(&invocation).await,
        Some(other) => {
            eprintln!("error: unknown command: {other}");
            print_usage();
            std::process::exit(2);
        }
        None => {
            print_usage();
            Ok(())
        }
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
