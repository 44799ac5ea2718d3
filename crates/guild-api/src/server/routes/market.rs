#[derive(Debug, Deserialize)]
struct OpenMarketRequest {
    #[serde(default)]
    config: Option<MarketConfig>,
    sqlite_path: Option<String>,
    replace_existing: Option<bool>,
    load_existing: Option<bool>,
}

#[derive(Debug, Serialize)]
struct OpenMarketResponse {
    schema_version: String,
    market_id: String,
    status: MarketStatus,
    replaced_existing_market: bool,
    loaded_from_store: bool,
}

async fn open_market(
    State(state): State<AppState>,
    Json(request): Json<OpenMarketRequest>,
) -> Result<Json<OpenMarketResponse>, HttpApiError> {
    let config = request.config.unwrap_or_default();
    let sqlite_path = request
        .sqlite_path
        .filter(|path| !path.trim().is_empty())
        .unwrap_or_else(default_sqlite_path);
    let replace_existing = request.replace_existing.unwrap_or(false);
    let load_existing = request.load_existing.unwrap_or(false);

    let response = {
        let mut inner = state.inner.lock().await;
        let replaced_existing_market = inner.engine.is_some();

        let (engine, loaded_from_store) = if load_existing {
            let engine = MarketApi::load_from_store(&sqlite_path, &config.market_id)
                .map_err(HttpApiError::from_persistence)?;
            (engine, true)
        } else {
            let mut engine = MarketApi::from_config(config);
            engine
                .attach_sqlite_store(&sqlite_path)
                .map_err(HttpApiError::from_persistence)?;
            engine
                .initialize_market_storage(replace_existing)
                .map_err(HttpApiError::from_persistence)?;
            (engine, false)
        };

        let status = engine.status();
        let market_id = engine.market_id().to_string();
        inner.emitted_event_count = engine.market().events().len();
        inner.engine = Some(engine);

        OpenMarketResponse {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            market_id,
            status,
            replaced_existing_market,
            loaded_from_store,
        }
    };

    Ok(Json(response))
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    schema_version: String,
    status: MarketStatus,
    last_persistence_error: Option<String>,
}

async fn get_status(State(state): State<AppState>) -> Result<Json<StatusResponse>, HttpApiError> {
    let inner = state.inner.lock().await;
    let engine = require_market(&inner)?;
    Ok(Json(StatusResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        status: engine.status(),
        last_persistence_error: engine.last_persistence_error().map(str::to_string),
    }))
}

#[derive(Debug, Deserialize)]
struct ListMarketsQuery {
    page_size: Option<usize>,
    sqlite_path: Option<String>,
}

#[derive(Debug, Serialize)]
struct ListMarketsResponse {
    schema_version: String,
    active_market_id: Option<String>,
    markets: Vec<crate::PersistedMarketSummary>,
}

async fn list_markets(
    State(state): State<AppState>,
    Query(query): Query<ListMarketsQuery>,
) -> Result<Json<ListMarketsResponse>, HttpApiError> {
    let page_size = query.page_size.unwrap_or(200).max(1).min(MAX_PAGE_SIZE);
    let sqlite_path = query
        .sqlite_path
        .filter(|path| !path.trim().is_empty())
        .unwrap_or_else(default_sqlite_path);

    let active_market_id = {
        let inner = state.inner.lock().await;
        inner
            .engine
            .as_ref()
            .map(|engine| engine.market_id().to_string())
    };

    let store = crate::persistence::SqliteMarketStore::open(sqlite_path)
        .map_err(HttpApiError::from_persistence)?;
    let markets = store
        .list_markets(page_size)
        .map_err(HttpApiError::from_persistence)?;

    Ok(Json(ListMarketsResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        active_market_id,
        markets,
    }))
}
