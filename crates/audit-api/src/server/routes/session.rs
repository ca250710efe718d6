#[derive(Debug, Deserialize)]
struct TickRequest {
    steps: Option<u64>,
}

#[derive(Debug, Serialize)]
struct TickResponse {
    schema_version: String,
    tick: u64,
    phase: Phase,
    view: RoundView,
}

#[derive(Debug, Serialize)]
struct ActionAuditResponse {
    schema_version: String,
    results: Vec<ActionResult>,
}

async fn get_session(State(state): State<AppState>) -> Json<RoundView> {
    let inner = state.inner.lock().await;
    Json(inner.api.view())
}

async fn submit_action(
    State(state): State<AppState>,
    Json(request): Json<ActionRequest>,
) -> Result<Json<ActionResult>, HttpApiError> {
    let label = request.action.label();
    let (result, messages) = {
        let mut inner = state.inner.lock().await;
        let result = inner.api.submit_action(request);
        let messages = collect_delta_messages(&mut inner);
        (result, messages)
    };

    broadcast_messages(&state, messages);

    match result.error {
        None => {
            debug!(action = label, action_id = result.action_id.as_str(), "action accepted");
            Ok(Json(result))
        }
        Some(error) => Err(HttpApiError::from_rejection(error)),
    }
}

async fn get_action_audit(State(state): State<AppState>) -> Json<ActionAuditResponse> {
    let inner = state.inner.lock().await;
    Json(ActionAuditResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        results: inner.api.action_audit().to_vec(),
    })
}

async fn tick_clock(
    State(state): State<AppState>,
    Json(request): Json<TickRequest>,
) -> Result<Json<TickResponse>, HttpApiError> {
    let steps = request.steps.unwrap_or(1);
    if steps == 0 || steps > MAX_TICK_STEPS {
        return Err(HttpApiError::invalid_request(
            format!("steps must be between 1 and {MAX_TICK_STEPS}"),
            Some(format!("steps={steps}")),
        ));
    }

    let (response, messages) = {
        let mut inner = state.inner.lock().await;
        let tick = inner.api.tick(steps);
        let messages = collect_delta_messages(&mut inner);
        (
            TickResponse {
                schema_version: SCHEMA_VERSION_V1.to_string(),
                tick,
                phase: inner.api.phase(),
                view: inner.api.view(),
            },
            messages,
        )
    };

    broadcast_messages(&state, messages);

    Ok(Json(response))
}
