#[derive(Debug, Serialize)]
struct HistoryResponse {
    schema_version: String,
    entries: Vec<HistoryEntry>,
}

#[derive(Debug, Serialize)]
struct LeaderboardResponse {
    schema_version: String,
    entries: Vec<LeaderboardEntry>,
}

#[derive(Debug, Serialize)]
struct ScenariosResponse {
    schema_version: String,
    scenarios: Vec<ScenarioView>,
}

async fn get_history(State(state): State<AppState>) -> Json<HistoryResponse> {
    let inner = state.inner.lock().await;
    Json(HistoryResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        entries: inner.api.history().to_vec(),
    })
}

async fn get_leaderboard(State(state): State<AppState>) -> Json<LeaderboardResponse> {
    let inner = state.inner.lock().await;
    Json(LeaderboardResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        entries: inner.api.leaderboard(),
    })
}

async fn get_scenarios() -> Json<ScenariosResponse> {
    Json(ScenariosResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        scenarios: crate::scenario_catalog(),
    })
}
