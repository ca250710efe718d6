use std::collections::BTreeSet;

use audit_core::{GameEngine, RoundError, VoteRejection};
use contracts::{GameConfig, GameEventKind, Phase, Role};
use proptest::prelude::*;

fn base_config(seed: u64) -> GameConfig {
    GameConfig {
        seed,
        ..GameConfig::default()
    }
}

fn engine(config: GameConfig) -> GameEngine {
    GameEngine::in_memory(config, "alice").expect("engine")
}

fn play_round(engine: &mut GameEngine) {
    assert!(engine.run_until_phase(Phase::Results, 1_000));
}

#[test]
fn history_is_capped_and_most_recent_first() {
    let mut config = base_config(7);
    config.history_limit = 3;
    config.starting_balance = 1_000;
    let mut engine = engine(config);

    engine.start_match().expect("start");
    play_round(&mut engine);
    for _ in 0..4 {
        engine.next_round().expect("next");
        play_round(&mut engine);
    }

    let rounds = engine
        .history()
        .iter()
        .map(|entry| entry.round_number)
        .collect::<Vec<_>>();
    assert_eq!(rounds, vec![5, 4, 3]);
    assert_eq!(engine.profile().rounds_played, 5);
}

#[test]
fn entry_fee_above_balance_is_rejected_without_side_effects() {
    let mut config = base_config(1);
    config.starting_balance = 4;
    let mut engine = engine(config);

    let err = engine.start_match().expect_err("too poor");
    assert!(matches!(err, RoundError::InsufficientBalance { balance: 4, fee: 5 }));
    assert_eq!(engine.phase(), Phase::Lobby);
    assert_eq!(engine.profile().token_balance, 4);
    assert!(engine.history().is_empty());
}

#[test]
fn exit_mid_round_returns_to_lobby_and_forgets_the_round() {
    let mut engine = engine(base_config(3));
    engine.start_match().expect("start");
    engine.start_with_ai().expect("fill");
    engine.send_chat("anyone see step 4?").expect("chat");
    engine.exit().expect("exit");

    let view = engine.view();
    assert_eq!(view.phase, Phase::Lobby);
    assert!(view.roster.is_empty());
    assert!(view.messages.is_empty());
    assert_eq!(engine.profile().token_balance, 95);

    // Nothing queued for the abandoned round may surface later.
    engine.tick_n(400);
    assert_eq!(engine.phase(), Phase::Lobby);
    assert!(engine.view().messages.is_empty());
}

#[test]
fn view_hides_roles_and_answers_until_results() {
    let mut engine = engine(base_config(11));
    engine.start_match().expect("start");
    engine.start_with_ai().expect("fill");

    let view = engine.view();
    assert!(view.viewer_role.is_some());
    for player in &view.roster {
        assert_eq!(player.role.is_some(), player.is_viewer);
    }
    let scenario = view.scenario.expect("scenario");
    assert!(scenario.answer_key.is_none());
    assert!(scenario.vulnerability_type.is_none());
    assert!(view.result.is_none());

    play_round(&mut engine);
    let view = engine.view();
    assert!(view.roster.iter().all(|player| player.role.is_some()));
    assert!(view.scenario.expect("scenario").answer_key.is_some());
    assert!(view.result.is_some());
}

proptest! {
    #[test]
    fn roster_always_fills_with_one_saboteur_and_one_supervisor(seed in 0_u64..5_000, early in any::<bool>()) {
        let mut engine = engine(base_config(seed));
        engine.start_match().expect("start");
        if early {
            engine.start_with_ai().expect("fill");
        }
        prop_assert!(engine.run_until_phase(Phase::Discussion, 100));

        let roster = &engine.state().roster;
        prop_assert_eq!(roster.len(), 5);
        let ids = roster.iter().map(|p| p.id.as_str()).collect::<BTreeSet<_>>();
        prop_assert_eq!(ids.len(), 5);
        let names = roster.iter().map(|p| p.name.as_str()).collect::<BTreeSet<_>>();
        prop_assert_eq!(names.len(), 5);
        prop_assert_eq!(roster.iter().filter(|p| p.role == Some(Role::Saboteur)).count(), 1);
        prop_assert_eq!(roster.iter().filter(|p| p.role == Some(Role::Supervisor)).count(), 1);
        prop_assert_eq!(roster.iter().filter(|p| !p.is_simulated).count(), 1);
    }

    #[test]
    fn every_simulated_player_votes_and_reward_matches_table(seed in 0_u64..5_000) {
        let mut engine = engine(base_config(seed));
        engine.start_match().expect("start");
        play_round(&mut engine);

        let state = engine.state();
        prop_assert!(state.simulated_without_vote().is_empty());
        let result = state.result.as_ref().expect("result");
        let human = state.human().expect("human seated");
        let role = human.role.expect("role");
        let reward = role.reward(result.saboteur_caught);
        prop_assert_eq!(result.per_player_reward[&human.id], reward);
        prop_assert_eq!(engine.profile().token_balance, 95 + reward);
        prop_assert_eq!(engine.history().len(), 1);
        prop_assert_eq!(engine.history()[0].human_reward, reward);
    }

    #[test]
    fn self_vote_rejected_and_first_vote_sticks(seed in 0_u64..2_000, pick in 1_usize..5, second in 1_usize..5) {
        let mut engine = engine(base_config(seed));
        engine.start_match().expect("start");
        engine.start_with_ai().expect("fill");
        prop_assert!(engine.run_until_phase(Phase::Voting, 500));

        let human_id = engine.human_id().to_string();
        let others = engine
            .state()
            .roster
            .iter()
            .filter(|p| p.id != human_id)
            .map(|p| p.id.clone())
            .collect::<Vec<_>>();

        prop_assert_eq!(
            engine.cast_vote(human_id.clone()),
            Err(RoundError::InvalidVote(VoteRejection::SelfVote))
        );
        let first = others[pick - 1].clone();
        engine.cast_vote(first.clone()).expect("vote");
        prop_assert_eq!(
            engine.cast_vote(others[second - 1].clone()),
            Err(RoundError::InvalidVote(VoteRejection::AlreadyVoted))
        );
        prop_assert_eq!(engine.state().vote_of(&human_id), Some(first.as_str()));
    }

    #[test]
    fn joins_never_overfill_after_immediate_start(seed in 0_u64..2_000) {
        let mut config = base_config(seed);
        config.join_probability = 1.0;
        let mut engine = engine(config);
        engine.start_match().expect("start");
        engine.start_with_ai().expect("fill");
        play_round(&mut engine);

        prop_assert_eq!(engine.state().roster.len(), 5);
        let stale_joins = engine
            .events()
            .iter()
            .filter(|event| matches!(event.kind, GameEventKind::ScheduledActionDropped { .. }))
            .count();
        prop_assert_eq!(stale_joins, 4);
    }

    #[test]
    fn same_seed_same_event_stream(seed in 0_u64..2_000, steps in 1_u64..300) {
        let run = || {
            let mut engine = engine(base_config(seed));
            engine.start_match().expect("start");
            engine.tick_n(steps);
            engine.events().to_vec()
        };
        prop_assert_eq!(run(), run());
    }
}
