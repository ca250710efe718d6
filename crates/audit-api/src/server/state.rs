#[derive(Clone)]
struct AppState {
    inner: std::sync::Arc<Mutex<ServerInner>>,
    stream_tx: broadcast::Sender<StreamMessage>,
}

impl AppState {
    fn new(api: GameApi) -> Self {
        let (stream_tx, _) = broadcast::channel(4096);
        let next_event_sequence = api.events().last().map_or(0, |event| event.sequence + 1);
        Self {
            inner: std::sync::Arc::new(Mutex::new(ServerInner {
                api,
                next_event_sequence,
                last_reported_error: None,
            })),
            stream_tx,
        }
    }
}

#[derive(Debug)]
struct ServerInner {
    api: GameApi,
    /// First event sequence not yet pushed to stream subscribers.
    next_event_sequence: u64,
    last_reported_error: Option<String>,
}

/// Stream messages for everything that changed since the previous call, ending with a fresh view.
fn collect_delta_messages(inner: &mut ServerInner) -> Vec<StreamMessage> {
    let tick = inner.api.current_tick();
    let mut messages = inner
        .api
        .events_since(inner.next_event_sequence)
        .iter()
        .map(StreamMessage::event_appended)
        .collect::<Vec<_>>();
    if let Some(last) = inner.api.events().last() {
        inner.next_event_sequence = last.sequence + 1;
    }

    let persistence_error = inner.api.last_persistence_error().map(str::to_string);
    if persistence_error.is_some() && persistence_error != inner.last_reported_error {
        if let Some(message) = &persistence_error {
            warn!(error = message.as_str(), "identity store write failed");
            messages.push(StreamMessage::warning(tick, message.clone()));
        }
    }
    inner.last_reported_error = persistence_error;

    messages.push(StreamMessage::session_view(&inner.api.view()));
    messages
}

fn broadcast_messages(state: &AppState, messages: Vec<StreamMessage>) {
    for message in messages {
        let _ = state.stream_tx.send(message);
    }
}
