use contracts::Action;

use super::*;

fn app_state() -> AppState {
    let api = GameApi::in_memory(GameConfig::default(), "alice").expect("api");
    AppState::new(api)
}

fn request(id: &str, action: Action) -> Json<ActionRequest> {
    Json(ActionRequest::new(id, action))
}

#[tokio::test]
async fn accepted_action_is_broadcast_with_fresh_view() {
    let state = app_state();
    let mut rx = state.stream_tx.subscribe();

    let Json(result) = submit_action(State(state.clone()), request("a1", Action::StartMatch))
        .await
        .expect("start accepted");
    assert!(result.accepted);
    assert_eq!(result.phase, Phase::Matching);

    let mut types = Vec::new();
    while let Ok(message) = rx.try_recv() {
        types.push(message.message_type);
    }
    assert!(types.iter().any(|kind| kind == "event.appended"));
    assert_eq!(types.last().map(String::as_str), Some("session.view"));

    let Json(view) = get_session(State(state)).await;
    assert_eq!(view.phase, Phase::Matching);
    assert_eq!(view.viewer_balance, 95);
}

#[tokio::test]
async fn rejected_action_maps_to_conflict_or_bad_request() {
    let state = app_state();

    let conflict = submit_action(State(state.clone()), request("a1", Action::NextRound))
        .await
        .expect_err("next round from lobby");
    assert_eq!(conflict.status, StatusCode::CONFLICT);
    assert_eq!(conflict.error.error_code, ErrorCode::PhaseConflict);

    let bad_vote = submit_action(
        State(state.clone()),
        request(
            "a2",
            Action::CastVote {
                target_id: "nobody".to_string(),
            },
        ),
    )
    .await
    .expect_err("vote in lobby");
    assert_eq!(bad_vote.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_vote.error.error_code, ErrorCode::InvalidVote);

    let Json(audit) = get_action_audit(State(state)).await;
    assert_eq!(audit.results.len(), 2);
    assert!(audit.results.iter().all(|result| !result.accepted));
}

#[tokio::test]
async fn manual_tick_drives_round_to_results() {
    let state = app_state();
    submit_action(State(state.clone()), request("a1", Action::StartMatch))
        .await
        .expect("start");

    let Json(response) = tick_clock(State(state.clone()), Json(TickRequest { steps: Some(400) }))
        .await
        .expect("tick");
    assert_eq!(response.tick, 400);
    assert_eq!(response.phase, Phase::Results);
    assert!(response.view.result.is_some());

    let Json(history) = get_history(State(state.clone())).await;
    assert_eq!(history.entries.len(), 1);
    let Json(board) = get_leaderboard(State(state)).await;
    assert_eq!(board.entries.len(), 5);
    assert_eq!(board.entries[0].rank, 1);
}

#[tokio::test]
async fn tick_rejects_out_of_range_steps() {
    let state = app_state();
    let err = tick_clock(State(state.clone()), Json(TickRequest { steps: Some(0) }))
        .await
        .expect_err("zero steps");
    assert_eq!(err.status, StatusCode::BAD_REQUEST);

    let err = tick_clock(
        State(state),
        Json(TickRequest {
            steps: Some(MAX_TICK_STEPS + 1),
        }),
    )
    .await
    .expect_err("too many steps");
    assert_eq!(err.error.details.as_deref(), Some("steps=10001"));
}

#[tokio::test]
async fn scenarios_are_listed_without_answers() {
    let Json(response) = get_scenarios().await;
    assert_eq!(response.scenarios.len(), 10);
    assert!(response
        .scenarios
        .iter()
        .all(|scenario| scenario.hidden_anomaly.is_none()));
}

#[test]
fn reconnect_tokens_include_sequence_when_present() {
    assert_eq!(reconnect_token(12, Some(3), "event"), "event:12:3");
    assert_eq!(reconnect_token(12, None, "view"), "view:12");
}
