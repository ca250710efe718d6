//! Roster construction: the human seat, stochastic joiners, AI fill, and role assignment.

use contracts::{Player, Role};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

use crate::identity::{generate_joiner_name, generate_player_id, generate_wallet_address};

pub const AI_NAMES: [&str; 12] = [
    "SatoshiBot",
    "VitalikAI",
    "CryptoHunter",
    "ChainGuard",
    "BlockSleuth",
    "HashMaster",
    "NodeRunner",
    "SmartAuditor",
    "GasOptimizer",
    "MevBot",
    "FlashLoanFinder",
    "RugPullDetector",
];

pub fn build_roster(human: Player) -> Vec<Player> {
    vec![Player { role: None, ..human }]
}

/// Seats a randomly generated joiner if there is room. Returns the new player.
pub fn admit_simulated_player(
    roster: &mut Vec<Player>,
    capacity: usize,
    rng: &mut dyn RngCore,
) -> Option<Player> {
    if roster.len() >= capacity {
        return None;
    }

    let mut name = generate_joiner_name(rng);
    while name_taken(roster, &name) {
        name = generate_joiner_name(rng);
    }

    let player = Player {
        id: unique_id(roster, rng),
        name,
        wallet_address: generate_wallet_address(rng),
        token_balance: rng.gen_range(50..250),
        is_simulated: true,
        role: None,
    };
    roster.push(player.clone());
    Some(player)
}

/// Pads the roster to exactly `capacity` seats with AI players and returns the added seats.
///
/// Names are drawn from [`AI_NAMES`] without colliding with anyone already seated;
/// once the pool runs dry, `AI_<n>` names are generated instead.
pub fn fill_remaining_with_ai(
    roster: &mut Vec<Player>,
    capacity: usize,
    rng: &mut dyn RngCore,
) -> Vec<Player> {
    let mut added = Vec::new();
    let mut fallback_index = 0_usize;

    while roster.len() < capacity {
        let available = AI_NAMES
            .iter()
            .copied()
            .filter(|candidate| !name_taken(roster, candidate))
            .collect::<Vec<_>>();

        let name = match available.choose(rng) {
            Some(name) => (*name).to_string(),
            None => loop {
                let candidate = format!("AI_{fallback_index}");
                fallback_index += 1;
                if !name_taken(roster, &candidate) {
                    break candidate;
                }
            },
        };

        let player = Player {
            id: unique_id(roster, rng),
            name,
            wallet_address: generate_wallet_address(rng),
            token_balance: rng.gen_range(100..400),
            is_simulated: true,
            role: None,
        };
        roster.push(player.clone());
        added.push(player);
    }

    added
}

/// Shuffles seat order, then seats 0 and 1 become Saboteur and Supervisor.
pub fn assign_roles(roster: &mut [Player], rng: &mut dyn RngCore) {
    roster.shuffle(rng);
    for (index, player) in roster.iter_mut().enumerate() {
        player.role = Some(match index {
            0 => Role::Saboteur,
            1 => Role::Supervisor,
            _ => Role::Auditor,
        });
    }
}

pub fn find<'a>(roster: &'a [Player], player_id: &str) -> Option<&'a Player> {
    roster.iter().find(|player| player.id == player_id)
}

pub fn holder_of(roster: &[Player], role: Role) -> Option<&Player> {
    roster.iter().find(|player| player.role == Some(role))
}

fn name_taken(roster: &[Player], name: &str) -> bool {
    roster.iter().any(|player| player.name == name)
}

fn unique_id(roster: &[Player], rng: &mut dyn RngCore) -> String {
    loop {
        let id = generate_player_id(rng);
        if find(roster, &id).is_none() {
            return id;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn human() -> Player {
        Player {
            id: "0xhuman".to_string(),
            name: "alice".to_string(),
            wallet_address: format!("0x{}", "a".repeat(40)),
            token_balance: 95,
            is_simulated: false,
            role: Some(Role::Saboteur),
        }
    }

    #[test]
    fn build_roster_seeds_human_without_role() {
        let roster = build_roster(human());
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].role, None);
        assert!(!roster[0].is_simulated);
    }

    #[test]
    fn admit_respects_capacity() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut roster = build_roster(human());
        for _ in 0..10 {
            admit_simulated_player(&mut roster, 5, &mut rng);
        }
        assert_eq!(roster.len(), 5);
        assert!(admit_simulated_player(&mut roster, 5, &mut rng).is_none());
        assert!(roster[1..].iter().all(|player| player.is_simulated));
    }

    #[test]
    fn fill_pads_to_capacity_with_unique_names() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut roster = build_roster(human());
        let added = fill_remaining_with_ai(&mut roster, 5, &mut rng);

        assert_eq!(added.len(), 4);
        assert_eq!(roster.len(), 5);
        let names = roster.iter().map(|player| player.name.clone()).collect::<BTreeSet<_>>();
        assert_eq!(names.len(), 5);
        assert!(added.iter().all(|player| AI_NAMES.contains(&player.name.as_str())));
    }

    #[test]
    fn fill_falls_back_to_generated_names_when_pool_is_exhausted() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut roster = build_roster(human());
        fill_remaining_with_ai(&mut roster, 16, &mut rng);

        assert_eq!(roster.len(), 16);
        let names = roster.iter().map(|player| player.name.clone()).collect::<BTreeSet<_>>();
        assert_eq!(names.len(), 16);
        assert!(names.contains("AI_0"));
        assert!(names.contains("AI_2"));
    }

    #[test]
    fn assign_roles_yields_one_saboteur_and_one_supervisor() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut roster = build_roster(human());
        fill_remaining_with_ai(&mut roster, 5, &mut rng);
        assign_roles(&mut roster, &mut rng);

        let count = |role| roster.iter().filter(|p| p.role == Some(role)).count();
        assert_eq!(count(Role::Saboteur), 1);
        assert_eq!(count(Role::Supervisor), 1);
        assert_eq!(count(Role::Auditor), 3);
        assert!(holder_of(&roster, Role::Saboteur).is_some());
    }

    #[test]
    fn human_lands_in_every_role_across_seeds() {
        let mut seen = BTreeSet::new();
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut roster = build_roster(human());
            fill_remaining_with_ai(&mut roster, 5, &mut rng);
            assign_roles(&mut roster, &mut rng);
            let role = find(&roster, "0xhuman").and_then(|p| p.role).expect("role");
            seen.insert(role);
        }
        assert_eq!(seen.len(), 3);
    }
}
