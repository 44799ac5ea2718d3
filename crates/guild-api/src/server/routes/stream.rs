#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamMessage {
    EventAppended {
        schema_version: String,
        event: Event,
    },
    MarketStatus {
        schema_version: String,
        status: MarketStatus,
    },
    Warning {
        schema_version: String,
        market_id: String,
        message: String,
    },
}

impl StreamMessage {
    fn event_appended(event: &Event) -> Self {
        Self::EventAppended {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            event: event.clone(),
        }
    }

    fn market_status(status: &MarketStatus) -> Self {
        Self::MarketStatus {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            status: status.clone(),
        }
    }

    fn warning(market_id: &str, message: String) -> Self {
        Self::Warning {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            market_id: market_id.to_string(),
            message,
        }
    }
}

async fn stream_handler(State(state): State<AppState>, upgrade: WebSocketUpgrade) -> Response {
    let rx = state.stream_tx.subscribe();
    upgrade.on_upgrade(move |socket| stream_events(socket, rx))
}

async fn stream_events(mut socket: WebSocket, mut rx: broadcast::Receiver<StreamMessage>) {
    loop {
        match rx.recv().await {
            Ok(message) => {
                let Ok(payload) = serde_json::to_string(&message) else {
                    continue;
                };
                if socket.send(Message::Text(payload.into())).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
