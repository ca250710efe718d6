use contracts::{HistoryEntry, LeaderboardEntry};

/// Ranked standings derived from stored history.
///
/// Players are aggregated in the order they are first met while walking the
/// history (most recent round first), so name, wallet and simulated flag come
/// from the latest round a player appeared in. The sort is stable: equal totals
/// keep aggregation order.
pub fn aggregate(history: &[HistoryEntry]) -> Vec<LeaderboardEntry> {
    let mut standings: Vec<LeaderboardEntry> = Vec::new();

    for entry in history {
        for outcome in &entry.players {
            let index = match standings
                .iter()
                .position(|standing| standing.player_id == outcome.id)
            {
                Some(index) => index,
                None => {
                    standings.push(LeaderboardEntry {
                        rank: 0,
                        player_id: outcome.id.clone(),
                        name: outcome.name.clone(),
                        wallet_address: outcome.wallet_address.clone(),
                        is_simulated: outcome.is_simulated,
                        total_rewards: 0,
                        rounds_played: 0,
                        wins: 0,
                    });
                    standings.len() - 1
                }
            };

            let standing = &mut standings[index];
            standing.total_rewards = standing.total_rewards.saturating_add(outcome.reward);
            standing.rounds_played += 1;
            if outcome.is_winner {
                standing.wins += 1;
            }
        }
    }

    standings.sort_by(|a, b| b.total_rewards.cmp(&a.total_rewards));
    for (index, standing) in standings.iter_mut().enumerate() {
        standing.rank = index as u32 + 1;
    }
    standings
}

#[cfg(test)]
mod tests {
    use contracts::{PlayerOutcome, Role, RoundOutcome};

    use super::*;

    fn outcome(id: &str, name: &str, reward: u64, winner: bool) -> PlayerOutcome {
        PlayerOutcome {
            id: id.to_string(),
            name: name.to_string(),
            wallet_address: format!("0x{id}"),
            is_simulated: id != "h",
            role: Role::Auditor,
            votes_received: 0,
            reward,
            is_winner: winner,
        }
    }

    fn round(players: Vec<PlayerOutcome>) -> HistoryEntry {
        HistoryEntry {
            entry_id: "round".to_string(),
            recorded_at_ms: 0,
            round_number: 1,
            scenario_id: 1,
            scenario_title: String::new(),
            scenario_category: String::new(),
            vulnerability_type: String::new(),
            hidden_anomaly: String::new(),
            outcome: RoundOutcome::AuditSuccess,
            ejected_player_id: None,
            human_id: "h".to_string(),
            human_role: Role::Auditor,
            human_reward: 0,
            players,
            votes: Default::default(),
        }
    }

    #[test]
    fn sums_rewards_rounds_and_wins_per_player() {
        let history = vec![
            round(vec![outcome("h", "alice-new", 25, true), outcome("x", "bot", 5, false)]),
            round(vec![outcome("h", "alice-old", 10, false), outcome("y", "bot2", 50, true)]),
        ];
        let board = aggregate(&history);

        assert_eq!(board.len(), 3);
        assert_eq!(board[0].player_id, "y");
        assert_eq!(board[0].rank, 1);
        let human = board.iter().find(|e| e.player_id == "h").expect("human");
        assert_eq!(human.total_rewards, 35);
        assert_eq!(human.rounds_played, 2);
        assert_eq!(human.wins, 1);
        assert_eq!(human.name, "alice-new");
        assert!(!human.is_simulated);
    }

    #[test]
    fn ties_keep_aggregation_order() {
        let history = vec![round(vec![
            outcome("b", "b", 10, false),
            outcome("a", "a", 10, false),
            outcome("c", "c", 40, true),
        ])];
        let ids = aggregate(&history)
            .into_iter()
            .map(|e| e.player_id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[test]
    fn empty_history_yields_empty_board() {
        assert!(aggregate(&[]).is_empty());
    }
}
