async fn stream_session(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let initial_message = {
        let inner = state.inner.lock().await;
        StreamMessage::session_view(&inner.api.view())
    };

    ws.on_upgrade(move |socket| stream_socket(socket, state, initial_message))
}

async fn stream_socket(mut socket: WebSocket, state: AppState, initial_message: StreamMessage) {
    if send_stream_message(&mut socket, &initial_message)
        .await
        .is_err()
    {
        return;
    }

    let mut rx = state.stream_tx.subscribe();

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Ping(payload))) => {
                        if socket.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => {
                        break;
                    }
                    _ => {}
                }
            }
            outgoing = rx.recv() => {
                match outgoing {
                    Ok(message) => {
                        if send_stream_message(&mut socket, &message).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        let warning = StreamMessage::warning(
                            0,
                            format!("stream client lagged and skipped {skipped} message(s)"),
                        );

                        if send_stream_message(&mut socket, &warning).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
        }
    }
}

async fn send_stream_message(
    socket: &mut WebSocket,
    message: &StreamMessage,
) -> Result<(), axum::Error> {
    let payload = serde_json::to_string(message).map_err(axum::Error::new)?;
    socket.send(Message::Text(payload.into())).await
}

#[derive(Debug, Clone, Serialize)]
struct StreamMessage {
    schema_version: String,
    #[serde(rename = "type")]
    message_type: String,
    tick: u64,
    sequence: Option<u64>,
    reconnect_token: String,
    payload: Value,
}

impl StreamMessage {
    fn session_view(view: &RoundView) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            message_type: "session.view".to_string(),
            tick: view.tick,
            sequence: None,
            reconnect_token: reconnect_token(view.tick, None, "view"),
            payload: json!(view),
        }
    }

    fn event_appended(event: &GameEvent) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            message_type: "event.appended".to_string(),
            tick: event.tick,
            sequence: Some(event.sequence),
            reconnect_token: reconnect_token(event.tick, Some(event.sequence), "event"),
            payload: json!(event),
        }
    }

    fn warning(tick: u64, warning: String) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            message_type: "warning".to_string(),
            tick,
            sequence: None,
            reconnect_token: reconnect_token(tick, None, "warning"),
            payload: json!({ "message": warning }),
        }
    }
}
