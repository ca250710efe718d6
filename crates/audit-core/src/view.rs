use contracts::{
    Phase, PlayerView, RoundView, ScenarioView, VotingView, SCHEMA_VERSION_V1,
};

use crate::round::RoundState;

/// Projects `state` for `viewer_id`.
///
/// Other players' roles and the scenario's answer fields stay hidden until
/// results. Individual vote targets are never exposed, only who has voted.
pub fn render(state: &RoundState, viewer_id: &str) -> RoundView {
    let revealed = state.phase == Phase::Results;

    let roster = state
        .roster
        .iter()
        .map(|player| {
            let is_viewer = player.id == viewer_id;
            PlayerView {
                id: player.id.clone(),
                name: player.name.clone(),
                wallet_address: player.wallet_address.clone(),
                token_balance: player.token_balance,
                is_simulated: player.is_simulated,
                is_viewer,
                role: if is_viewer || revealed { player.role } else { None },
            }
        })
        .collect();

    let scenario = state.scenario.as_ref().map(|scenario| ScenarioView {
        id: scenario.id,
        title: scenario.title.clone(),
        category: scenario.category.clone(),
        difficulty: scenario.difficulty,
        log_text: scenario.log_text.clone(),
        audit_clue: scenario.audit_clue.clone(),
        vulnerability_type: revealed.then(|| scenario.vulnerability_type.clone()),
        hidden_anomaly: revealed.then(|| scenario.hidden_anomaly.clone()),
        answer_key: revealed.then(|| scenario.answer_key.clone()),
    });

    let voting = matches!(state.phase, Phase::Voting | Phase::Results).then(|| VotingView {
        votes_cast: state.votes.len(),
        voters: state.votes.keys().cloned().collect(),
        own_vote: state.vote_of(viewer_id).map(str::to_string),
    });

    let viewer = crate::roster::find(&state.roster, viewer_id);
    let viewer_balance = if viewer_id == state.profile.id {
        state.profile.token_balance
    } else {
        viewer.map(|player| player.token_balance).unwrap_or(0)
    };

    RoundView {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        phase: state.phase,
        round_number: state.round_number,
        tick: state.tick,
        timers: state.timers,
        viewer_id: viewer_id.to_string(),
        viewer_balance,
        viewer_role: viewer.and_then(|player| player.role),
        roster,
        scenario,
        messages: state.messages.clone(),
        voting,
        result: revealed.then(|| state.result.clone()).flatten(),
    }
}
