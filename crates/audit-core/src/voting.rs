//! Vote acceptance, plurality tally, and reward resolution.

use std::collections::BTreeMap;
use std::fmt;

use contracts::{
    HistoryEntry, Phase, Player, PlayerOutcome, Role, RoundOutcome, Scenario, VoteResult,
};

use crate::roster;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteRejection {
    NotVotingPhase,
    UnknownVoter,
    UnknownTarget,
    SelfVote,
    AlreadyVoted,
}

impl fmt::Display for VoteRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::NotVotingPhase => "votes are only accepted during the voting phase",
            Self::UnknownVoter => "voter is not seated in this round",
            Self::UnknownTarget => "vote target is not seated in this round",
            Self::SelfVote => "players may not vote for themselves",
            Self::AlreadyVoted => "voter has already cast a vote this round",
        };
        f.write_str(message)
    }
}

pub fn validate_vote(
    phase: Phase,
    roster: &[Player],
    votes: &BTreeMap<String, String>,
    voter_id: &str,
    target_id: &str,
) -> Result<(), VoteRejection> {
    if phase != Phase::Voting {
        return Err(VoteRejection::NotVotingPhase);
    }
    if roster::find(roster, voter_id).is_none() {
        return Err(VoteRejection::UnknownVoter);
    }
    if roster::find(roster, target_id).is_none() {
        return Err(VoteRejection::UnknownTarget);
    }
    if voter_id == target_id {
        return Err(VoteRejection::SelfVote);
    }
    if votes.contains_key(voter_id) {
        return Err(VoteRejection::AlreadyVoted);
    }
    Ok(())
}

/// Tallies `votes` against `roster`.
///
/// The ejected player is the one with the strictly highest count. On a tie the
/// player seated earliest in roster order wins; with no votes nobody is ejected.
pub fn resolve(votes: &BTreeMap<String, String>, roster: &[Player]) -> VoteResult {
    let mut vote_counts = BTreeMap::<String, u32>::new();
    for target_id in votes.values() {
        if roster::find(roster, target_id).is_some() {
            *vote_counts.entry(target_id.clone()).or_insert(0) += 1;
        }
    }

    let mut ejected: Option<&Player> = None;
    let mut max_votes = 0_u32;
    for player in roster {
        let count = vote_counts.get(&player.id).copied().unwrap_or(0);
        if count > max_votes {
            max_votes = count;
            ejected = Some(player);
        }
    }

    let saboteur = roster::holder_of(roster, Role::Saboteur);
    let saboteur_caught = match (ejected, saboteur) {
        (Some(ejected), Some(saboteur)) => ejected.id == saboteur.id,
        _ => false,
    };

    let mut per_player_reward = BTreeMap::new();
    let mut is_winner = BTreeMap::new();
    for player in roster {
        let role = player.role.unwrap_or(Role::Auditor);
        per_player_reward.insert(player.id.clone(), role.reward(saboteur_caught));
        is_winner.insert(player.id.clone(), role.wins(saboteur_caught));
    }

    VoteResult {
        ejected_player_id: ejected.map(|player| player.id.clone()),
        saboteur_id: saboteur.map(|player| player.id.clone()),
        vote_counts,
        saboteur_caught,
        per_player_reward,
        is_winner,
    }
}

pub fn player_outcomes(result: &VoteResult, roster: &[Player]) -> Vec<PlayerOutcome> {
    roster
        .iter()
        .map(|player| PlayerOutcome {
            id: player.id.clone(),
            name: player.name.clone(),
            wallet_address: player.wallet_address.clone(),
            is_simulated: player.is_simulated,
            role: player.role.unwrap_or(Role::Auditor),
            votes_received: result.vote_counts.get(&player.id).copied().unwrap_or(0),
            reward: result.per_player_reward.get(&player.id).copied().unwrap_or(0),
            is_winner: result.is_winner.get(&player.id).copied().unwrap_or(false),
        })
        .collect()
}

pub struct RoundRecord<'a> {
    pub result: &'a VoteResult,
    pub votes: &'a BTreeMap<String, String>,
    pub roster: &'a [Player],
    pub scenario: &'a Scenario,
    pub human_id: &'a str,
    pub round_number: u32,
    pub recorded_at_ms: u64,
    pub generation: u64,
}

impl RoundRecord<'_> {
    pub fn to_history_entry(&self) -> HistoryEntry {
        let players = player_outcomes(self.result, self.roster);
        let human = players.iter().find(|outcome| outcome.id == self.human_id);
        HistoryEntry {
            entry_id: format!("round-{}-{}", self.recorded_at_ms, self.generation),
            recorded_at_ms: self.recorded_at_ms,
            round_number: self.round_number,
            scenario_id: self.scenario.id,
            scenario_title: self.scenario.title.clone(),
            scenario_category: self.scenario.category.clone(),
            vulnerability_type: self.scenario.vulnerability_type.clone(),
            hidden_anomaly: self.scenario.hidden_anomaly.clone(),
            outcome: RoundOutcome::from_caught(self.result.saboteur_caught),
            ejected_player_id: self.result.ejected_player_id.clone(),
            human_id: self.human_id.to_string(),
            human_role: human.map(|outcome| outcome.role).unwrap_or(Role::Auditor),
            human_reward: human.map(|outcome| outcome.reward).unwrap_or(0),
            players,
            votes: self.votes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seat(id: &str, role: Role) -> Player {
        Player {
            id: id.to_string(),
            name: id.to_uppercase(),
            wallet_address: format!("0x{id}"),
            token_balance: 100,
            is_simulated: id != "h",
            role: Some(role),
        }
    }

    fn roster() -> Vec<Player> {
        vec![
            seat("s", Role::Saboteur),
            seat("v", Role::Supervisor),
            seat("h", Role::Auditor),
            seat("a", Role::Auditor),
            seat("b", Role::Auditor),
        ]
    }

    fn votes(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(voter, target)| (voter.to_string(), target.to_string()))
            .collect()
    }

    #[test]
    fn plurality_on_saboteur_catches_it() {
        let roster = roster();
        let result = resolve(
            &votes(&[("v", "s"), ("h", "s"), ("a", "s"), ("b", "h"), ("s", "h")]),
            &roster,
        );
        assert_eq!(result.ejected_player_id.as_deref(), Some("s"));
        assert!(result.saboteur_caught);
        assert_eq!(result.per_player_reward["s"], 5);
        assert_eq!(result.per_player_reward["v"], 40);
        assert_eq!(result.per_player_reward["h"], 25);
        assert!(result.is_winner["v"]);
        assert!(!result.is_winner["s"]);
    }

    #[test]
    fn saboteur_survives_when_auditor_is_ejected() {
        let roster = roster();
        let result = resolve(
            &votes(&[("s", "a"), ("v", "a"), ("h", "a"), ("a", "b"), ("b", "s")]),
            &roster,
        );
        assert_eq!(result.ejected_player_id.as_deref(), Some("a"));
        assert!(!result.saboteur_caught);
        assert_eq!(result.per_player_reward["s"], 50);
        assert_eq!(result.per_player_reward["v"], 15);
        assert_eq!(result.per_player_reward["h"], 10);
        assert!(result.is_winner["s"]);
        assert!(!result.is_winner["h"]);
    }

    #[test]
    fn tie_breaks_by_roster_order() {
        let roster = roster();
        // Two votes each for "a" and "s"; "s" is seated first.
        let result = resolve(
            &votes(&[("v", "a"), ("h", "a"), ("b", "s"), ("a", "s"), ("s", "v")]),
            &roster,
        );
        assert_eq!(result.ejected_player_id.as_deref(), Some("s"));
        assert_eq!(result.vote_counts["a"], 2);
        assert_eq!(result.vote_counts["s"], 2);
    }

    #[test]
    fn no_votes_ejects_nobody() {
        let result = resolve(&BTreeMap::new(), &roster());
        assert_eq!(result.ejected_player_id, None);
        assert!(!result.saboteur_caught);
        assert_eq!(result.saboteur_id.as_deref(), Some("s"));
    }

    #[test]
    fn validate_vote_rejections() {
        let roster = roster();
        let cast = votes(&[("a", "s")]);
        assert_eq!(
            validate_vote(Phase::Discussion, &roster, &cast, "h", "s"),
            Err(VoteRejection::NotVotingPhase)
        );
        assert_eq!(
            validate_vote(Phase::Voting, &roster, &cast, "h", "h"),
            Err(VoteRejection::SelfVote)
        );
        assert_eq!(
            validate_vote(Phase::Voting, &roster, &cast, "a", "b"),
            Err(VoteRejection::AlreadyVoted)
        );
        assert_eq!(
            validate_vote(Phase::Voting, &roster, &cast, "h", "zz"),
            Err(VoteRejection::UnknownTarget)
        );
        assert_eq!(
            validate_vote(Phase::Voting, &roster, &cast, "zz", "h"),
            Err(VoteRejection::UnknownVoter)
        );
        assert!(validate_vote(Phase::Voting, &roster, &cast, "h", "s").is_ok());
    }

    #[test]
    fn history_entry_carries_human_outcome() {
        let roster = roster();
        let cast = votes(&[("v", "s"), ("h", "s"), ("a", "s")]);
        let result = resolve(&cast, &roster);
        let scenario = crate::scenario::get(3).expect("scenario");
        let entry = RoundRecord {
            result: &result,
            votes: &cast,
            roster: &roster,
            scenario: &scenario,
            human_id: "h",
            round_number: 2,
            recorded_at_ms: 1_000,
            generation: 9,
        }
        .to_history_entry();

        assert_eq!(entry.outcome, RoundOutcome::AuditSuccess);
        assert_eq!(entry.human_role, Role::Auditor);
        assert_eq!(entry.human_reward, 25);
        assert_eq!(entry.players.len(), 5);
        assert_eq!(entry.players[0].votes_received, 3);
        assert_eq!(entry.scenario_title, "Governance Proposal Hijack");
        assert_eq!(entry.votes.get("h").map(String::as_str), Some("s"));
    }
}
