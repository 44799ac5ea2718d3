#[derive(Clone)]
struct AppState {
    inner: std::sync::Arc<Mutex<ServerInner>>,
    stream_tx: broadcast::Sender<StreamMessage>,
}

impl AppState {
    fn new() -> Self {
        let (stream_tx, _) = broadcast::channel(4096);
        Self {
            inner: std::sync::Arc::new(Mutex::new(ServerInner::default())),
            stream_tx,
        }
    }
}

#[derive(Debug, Default)]
struct ServerInner {
    engine: Option<MarketApi>,
    emitted_event_count: usize,
}

fn require_market(inner: &ServerInner) -> Result<&MarketApi, HttpApiError> {
    inner.engine.as_ref().ok_or_else(HttpApiError::market_not_open)
}

fn require_market_mut(inner: &mut ServerInner) -> Result<&mut MarketApi, HttpApiError> {
    inner.engine.as_mut().ok_or_else(HttpApiError::market_not_open)
}

/// Drains events committed since the last call into stream messages, plus a
/// status frame and any persistence warning.
fn collect_delta_messages(inner: &mut ServerInner) -> Vec<StreamMessage> {
    let mut messages = Vec::new();

    let Some(engine) = inner.engine.as_ref() else {
        return messages;
    };

    let new_events = &engine.market().events()[inner.emitted_event_count..];
    for event in new_events {
        messages.push(StreamMessage::event_appended(event));
    }
    inner.emitted_event_count = engine.market().events().len();

    if !messages.is_empty() {
        messages.push(StreamMessage::market_status(&engine.status()));
    }

    if let Some(last_error) = engine.last_persistence_error() {
        messages.push(StreamMessage::warning(
            engine.market_id(),
            last_error.to_string(),
        ));
    }

    messages
}

fn broadcast_messages(state: &AppState, messages: Vec<StreamMessage>) {
    for message in messages {
        let _ = state.stream_tx.send(message);
    }
}
