//! Optional on-chain mirror of finished rounds.
//!
//! Every call is best-effort: failures come back as `None` and are logged,
//! never raised into the local game.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use contracts::{HistoryEntry, Role, RoundOutcome};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub type GameId = u64;

const REGISTRATION_GRANT: u64 = 100;
const ENTRY_FEE: u64 = 5;
const MIN_PLAYERS: usize = 3;
const MAX_PLAYERS: usize = 5;
const LEADERBOARD_SIZE: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerPlayer {
    pub address: String,
    pub name: String,
    pub balance: u64,
    pub games_played: u32,
    pub total_rewards: u64,
    pub wins: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerGameResult {
    pub game_id: GameId,
    pub outcome: RoundOutcome,
    pub most_voted: Option<String>,
    pub rewards: BTreeMap<String, u64>,
}

pub trait LedgerClient {
    /// `Some(false)` when the address is already registered.
    fn register_player(
        &self,
        address: &str,
        name: &str,
    ) -> impl Future<Output = Option<bool>> + Send;

    fn create_game(&self, creator: &str) -> impl Future<Output = Option<GameId>> + Send;

    fn join_game(&self, game_id: GameId, address: &str)
        -> impl Future<Output = Option<bool>> + Send;

    /// Seats roles and moves the game out of matching.
    fn start_game(
        &self,
        game_id: GameId,
        roles: &BTreeMap<String, Role>,
    ) -> impl Future<Output = Option<bool>> + Send;

    fn start_voting(&self, game_id: GameId) -> impl Future<Output = Option<bool>> + Send;

    fn submit_vote(
        &self,
        game_id: GameId,
        voter: &str,
        target: &str,
    ) -> impl Future<Output = Option<bool>> + Send;

    fn finalize_game(
        &self,
        game_id: GameId,
    ) -> impl Future<Output = Option<LedgerGameResult>> + Send;

    fn get_leaderboard(&self) -> impl Future<Output = Option<Vec<LedgerPlayer>>> + Send;
}

/// No ledger configured. Every call answers `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineLedger;

impl LedgerClient for OfflineLedger {
    async fn register_player(&self, _address: &str, _name: &str) -> Option<bool> {
        None
    }

    async fn create_game(&self, _creator: &str) -> Option<GameId> {
        None
    }

    async fn join_game(&self, _game_id: GameId, _address: &str) -> Option<bool> {
        None
    }

    async fn start_game(&self, _game_id: GameId, _roles: &BTreeMap<String, Role>) -> Option<bool> {
        None
    }

    async fn start_voting(&self, _game_id: GameId) -> Option<bool> {
        None
    }

    async fn submit_vote(&self, _game_id: GameId, _voter: &str, _target: &str) -> Option<bool> {
        None
    }

    async fn finalize_game(&self, _game_id: GameId) -> Option<LedgerGameResult> {
        None
    }

    async fn get_leaderboard(&self) -> Option<Vec<LedgerPlayer>> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GameStage {
    Matching,
    Playing,
    Voting,
}

#[derive(Debug, Clone)]
struct LedgerGame {
    stage: GameStage,
    seats: Vec<String>,
    roles: BTreeMap<String, Role>,
    votes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LedgerReject {
    Unavailable,
    NotRegistered,
    InsufficientBalance,
    GameNotFound,
    WrongStage,
    GameFull,
    AlreadySeated,
    NotSeated,
    NotEnoughPlayers,
    MissingRole,
}

impl fmt::Display for LedgerReject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::Unavailable => "ledger unavailable",
            Self::NotRegistered => "player not registered",
            Self::InsufficientBalance => "insufficient balance",
            Self::GameNotFound => "game not found",
            Self::WrongStage => "game is not in the required stage",
            Self::GameFull => "game is full",
            Self::AlreadySeated => "already in game",
            Self::NotSeated => "not in this game",
            Self::NotEnoughPlayers => "not enough players",
            Self::MissingRole => "a seated player has no role",
        };
        f.write_str(message)
    }
}

#[derive(Debug, Default)]
struct LedgerBook {
    players: BTreeMap<String, LedgerPlayer>,
    /// Registration order, used to keep leaderboard ties stable.
    registration_order: Vec<String>,
    active: BTreeMap<GameId, LedgerGame>,
    finished: BTreeMap<GameId, LedgerGameResult>,
    game_counter: GameId,
}

impl LedgerBook {
    fn charge_fee(&mut self, address: &str) -> Result<(), LedgerReject> {
        let player = self
            .players
            .get_mut(address)
            .ok_or(LedgerReject::NotRegistered)?;
        if player.balance < ENTRY_FEE {
            return Err(LedgerReject::InsufficientBalance);
        }
        player.balance -= ENTRY_FEE;
        Ok(())
    }

    fn game_mut(&mut self, game_id: GameId, stage: GameStage) -> Result<&mut LedgerGame, LedgerReject> {
        let game = self
            .active
            .get_mut(&game_id)
            .ok_or(LedgerReject::GameNotFound)?;
        if game.stage != stage {
            return Err(LedgerReject::WrongStage);
        }
        Ok(game)
    }

    fn finalize(&mut self, game_id: GameId) -> Result<LedgerGameResult, LedgerReject> {
        self.game_mut(game_id, GameStage::Voting)?;
        let game = self
            .active
            .remove(&game_id)
            .ok_or(LedgerReject::GameNotFound)?;

        let mut counts = BTreeMap::<&str, u32>::new();
        for target in game.votes.values() {
            *counts.entry(target.as_str()).or_insert(0) += 1;
        }
        let mut most_voted: Option<&str> = None;
        let mut max_votes = 0;
        for seat in &game.seats {
            let count = counts.get(seat.as_str()).copied().unwrap_or(0);
            if count > max_votes {
                max_votes = count;
                most_voted = Some(seat);
            }
        }

        let saboteur_caught = most_voted
            .and_then(|address| game.roles.get(address))
            .is_some_and(|role| *role == Role::Saboteur);
        let pool = game.seats.len() as u64 * ENTRY_FEE;

        let mut rewards = BTreeMap::new();
        for seat in &game.seats {
            let role = game.roles.get(seat).copied().unwrap_or(Role::Auditor);
            let (reward, winner) = match (saboteur_caught, role) {
                (true, Role::Auditor) => (pool / 3, true),
                (true, Role::Supervisor) => (pool / 4, true),
                (true, Role::Saboteur) => (0, false),
                (false, Role::Saboteur) => (pool / 2, true),
                (false, _) => (0, false),
            };
            if let Some(player) = self.players.get_mut(seat) {
                player.balance += reward;
                player.games_played += 1;
                player.total_rewards += reward;
                if winner {
                    player.wins += 1;
                }
            }
            rewards.insert(seat.clone(), reward);
        }

        let result = LedgerGameResult {
            game_id,
            outcome: RoundOutcome::from_caught(saboteur_caught),
            most_voted: most_voted.map(str::to_string),
            rewards,
        };
        self.finished.insert(game_id, result.clone());
        Ok(result)
    }

    fn leaderboard(&self) -> Vec<LedgerPlayer> {
        let mut standings = self
            .registration_order
            .iter()
            .filter_map(|address| self.players.get(address).cloned())
            .collect::<Vec<_>>();
        standings.sort_by(|a, b| b.total_rewards.cmp(&a.total_rewards));
        standings.truncate(LEADERBOARD_SIZE);
        standings
    }
}

/// In-process ledger following the on-chain game contract's rules.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    book: Mutex<LedgerBook>,
    failing: AtomicBool,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every call fails as if the ledger were unreachable.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn player(&self, address: &str) -> Option<LedgerPlayer> {
        self.book.lock().await.players.get(address).cloned()
    }

    pub async fn finished_game(&self, game_id: GameId) -> Option<LedgerGameResult> {
        self.book.lock().await.finished.get(&game_id).cloned()
    }

    async fn with_book<T>(
        &self,
        call: &'static str,
        op: impl FnOnce(&mut LedgerBook) -> Result<T, LedgerReject>,
    ) -> Option<T> {
        let outcome = if self.failing.load(Ordering::SeqCst) {
            Err(LedgerReject::Unavailable)
        } else {
            let mut book = self.book.lock().await;
            op(&mut book)
        };
        match outcome {
            Ok(value) => {
                debug!(call, "ledger call succeeded");
                Some(value)
            }
            Err(reject) => {
                warn!(call, reason = %reject, "ledger call failed");
                None
            }
        }
    }
}

impl LedgerClient for InMemoryLedger {
    async fn register_player(&self, address: &str, name: &str) -> Option<bool> {
        self.with_book("register_player", |book| {
            if book.players.contains_key(address) {
                return Ok(false);
            }
            book.players.insert(
                address.to_string(),
                LedgerPlayer {
                    address: address.to_string(),
                    name: name.to_string(),
                    balance: REGISTRATION_GRANT,
                    games_played: 0,
                    total_rewards: 0,
                    wins: 0,
                },
            );
            book.registration_order.push(address.to_string());
            Ok(true)
        })
        .await
    }

    async fn create_game(&self, creator: &str) -> Option<GameId> {
        self.with_book("create_game", |book| {
            book.charge_fee(creator)?;
            book.game_counter += 1;
            let game_id = book.game_counter;
            book.active.insert(
                game_id,
                LedgerGame {
                    stage: GameStage::Matching,
                    seats: vec![creator.to_string()],
                    roles: BTreeMap::new(),
                    votes: BTreeMap::new(),
                },
            );
            Ok(game_id)
        })
        .await
    }

    async fn join_game(&self, game_id: GameId, address: &str) -> Option<bool> {
        self.with_book("join_game", |book| {
            let player = book.players.get(address).ok_or(LedgerReject::NotRegistered)?;
            if player.balance < ENTRY_FEE {
                return Err(LedgerReject::InsufficientBalance);
            }
            let game = book.game_mut(game_id, GameStage::Matching)?;
            if game.seats.len() >= MAX_PLAYERS {
                return Err(LedgerReject::GameFull);
            }
            if game.seats.iter().any(|seat| seat == address) {
                return Err(LedgerReject::AlreadySeated);
            }
            game.seats.push(address.to_string());
            book.charge_fee(address)?;
            Ok(true)
        })
        .await
    }

    async fn start_game(&self, game_id: GameId, roles: &BTreeMap<String, Role>) -> Option<bool> {
        self.with_book("start_game", |book| {
            let game = book.game_mut(game_id, GameStage::Matching)?;
            if game.seats.len() < MIN_PLAYERS {
                return Err(LedgerReject::NotEnoughPlayers);
            }
            let mut seated = BTreeMap::new();
            for seat in &game.seats {
                let role = roles.get(seat).copied().ok_or(LedgerReject::MissingRole)?;
                seated.insert(seat.clone(), role);
            }
            game.roles = seated;
            game.stage = GameStage::Playing;
            Ok(true)
        })
        .await
    }

    async fn start_voting(&self, game_id: GameId) -> Option<bool> {
        self.with_book("start_voting", |book| {
            let game = book.game_mut(game_id, GameStage::Playing)?;
            game.stage = GameStage::Voting;
            Ok(true)
        })
        .await
    }

    async fn submit_vote(&self, game_id: GameId, voter: &str, target: &str) -> Option<bool> {
        self.with_book("submit_vote", |book| {
            let game = book.game_mut(game_id, GameStage::Voting)?;
            if !game.seats.iter().any(|seat| seat == voter) {
                return Err(LedgerReject::NotSeated);
            }
            game.votes.insert(voter.to_string(), target.to_string());
            Ok(true)
        })
        .await
    }

    async fn finalize_game(&self, game_id: GameId) -> Option<LedgerGameResult> {
        self.with_book("finalize_game", |book| book.finalize(game_id))
            .await
    }

    async fn get_leaderboard(&self) -> Option<Vec<LedgerPlayer>> {
        self.with_book("get_leaderboard", |book| Ok(book.leaderboard()))
            .await
    }
}

/// Replays a finished local round into `ledger`, seat by seat and vote by vote.
///
/// Returns the ledger game id only if every call went through.
pub async fn mirror_round<L: LedgerClient>(ledger: &L, entry: &HistoryEntry) -> Option<GameId> {
    let wallet_of = entry
        .players
        .iter()
        .map(|player| (player.id.as_str(), player.wallet_address.as_str()))
        .collect::<BTreeMap<_, _>>();

    for player in &entry.players {
        ledger
            .register_player(&player.wallet_address, &player.name)
            .await?;
    }

    let creator = wallet_of.get(entry.human_id.as_str())?;
    let game_id = ledger.create_game(creator).await?;
    for player in &entry.players {
        if player.wallet_address != *creator {
            ledger.join_game(game_id, &player.wallet_address).await?;
        }
    }

    let roles = entry
        .players
        .iter()
        .map(|player| (player.wallet_address.clone(), player.role))
        .collect::<BTreeMap<_, _>>();
    ledger.start_game(game_id, &roles).await?;
    ledger.start_voting(game_id).await?;

    for (voter_id, target_id) in &entry.votes {
        let voter = wallet_of.get(voter_id.as_str())?;
        let target = wallet_of.get(target_id.as_str())?;
        ledger.submit_vote(game_id, voter, target).await?;
    }

    let result = ledger.finalize_game(game_id).await?;
    debug!(game_id, outcome = %result.outcome, "round mirrored to ledger");
    Some(game_id)
}

#[cfg(test)]
mod tests {
    use contracts::PlayerOutcome;

    use super::*;

    fn seat(id: &str, role: Role) -> PlayerOutcome {
        PlayerOutcome {
            id: id.to_string(),
            name: id.to_uppercase(),
            wallet_address: format!("0xw{id}"),
            is_simulated: id != "h",
            role,
            votes_received: 0,
            reward: 0,
            is_winner: false,
        }
    }

    fn entry(votes: &[(&str, &str)]) -> HistoryEntry {
        HistoryEntry {
            entry_id: "round-1".to_string(),
            recorded_at_ms: 1,
            round_number: 1,
            scenario_id: 1,
            scenario_title: "Flash Loan Arbitrage Exploit".to_string(),
            scenario_category: "DeFi".to_string(),
            vulnerability_type: String::new(),
            hidden_anomaly: String::new(),
            outcome: RoundOutcome::AuditSuccess,
            ejected_player_id: Some("s".to_string()),
            human_id: "h".to_string(),
            human_role: Role::Auditor,
            human_reward: 25,
            players: vec![
                seat("h", Role::Auditor),
                seat("s", Role::Saboteur),
                seat("v", Role::Supervisor),
                seat("a", Role::Auditor),
                seat("b", Role::Auditor),
            ],
            votes: votes
                .iter()
                .map(|(voter, target)| (voter.to_string(), target.to_string()))
                .collect(),
        }
    }

    #[tokio::test]
    async fn offline_ledger_answers_none() {
        let ledger = OfflineLedger;
        assert_eq!(ledger.register_player("0x1", "a").await, None);
        assert_eq!(ledger.get_leaderboard().await, None);
        assert_eq!(mirror_round(&ledger, &entry(&[])).await, None);
    }

    #[tokio::test]
    async fn registration_grants_tokens_once() {
        let ledger = InMemoryLedger::new();
        assert_eq!(ledger.register_player("0x1", "alice").await, Some(true));
        assert_eq!(ledger.register_player("0x1", "alice").await, Some(false));
        assert_eq!(ledger.player("0x1").await.map(|p| p.balance), Some(100));
    }

    #[tokio::test]
    async fn create_game_requires_registration_and_deducts_fee() {
        let ledger = InMemoryLedger::new();
        assert_eq!(ledger.create_game("0xghost").await, None);

        ledger.register_player("0x1", "alice").await;
        assert_eq!(ledger.create_game("0x1").await, Some(1));
        assert_eq!(ledger.player("0x1").await.map(|p| p.balance), Some(95));
        assert_eq!(ledger.join_game(1, "0x1").await, None);
    }

    #[tokio::test]
    async fn mirrored_round_pays_out_by_contract_pool() {
        let ledger = InMemoryLedger::new();
        let round = entry(&[("h", "s"), ("v", "s"), ("a", "s"), ("b", "h"), ("s", "h")]);
        let game_id = mirror_round(&ledger, &round).await.expect("mirrored");

        let result = ledger.finished_game(game_id).await.expect("finished");
        assert_eq!(result.outcome, RoundOutcome::AuditSuccess);
        assert_eq!(result.most_voted.as_deref(), Some("0xws"));
        // Pool of 25: auditors 8, supervisor 6, saboteur nothing.
        assert_eq!(result.rewards["0xwh"], 8);
        assert_eq!(result.rewards["0xwv"], 6);
        assert_eq!(result.rewards["0xws"], 0);

        let human = ledger.player("0xwh").await.expect("human");
        assert_eq!(human.balance, 103);
        assert_eq!(human.wins, 1);
        let board = ledger.get_leaderboard().await.expect("leaderboard");
        assert_eq!(board.len(), 5);
        assert_eq!(board[0].address, "0xwh");
        assert_eq!(board.last().map(|p| p.total_rewards), Some(0));
    }

    #[tokio::test]
    async fn failure_switch_makes_mirroring_give_up() {
        let ledger = InMemoryLedger::new();
        ledger.set_failing(true);
        assert_eq!(mirror_round(&ledger, &entry(&[("h", "s")])).await, None);

        ledger.set_failing(false);
        assert!(mirror_round(&ledger, &entry(&[("h", "s")])).await.is_some());
    }
}
