#[derive(Debug, Deserialize)]
struct RegisterUserRequest {
    user_id: String,
}

#[derive(Debug, Serialize)]
struct BalanceResponse {
    schema_version: String,
    balance_change: Option<BalanceChange>,
    balance: i64,
}

async fn register_user(
    State(state): State<AppState>,
    Json(request): Json<RegisterUserRequest>,
) -> Result<Json<BalanceResponse>, HttpApiError> {
    let (response, messages) = {
        let mut inner = state.inner.lock().await;
        let engine = require_market_mut(&mut inner)?;
        let change = engine
            .register_user(&request.user_id)
            .map_err(HttpApiError::from_market)?;
        let response = BalanceResponse {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            balance: change.balance_after,
            balance_change: Some(change),
        };
        let messages = collect_delta_messages(&mut inner);
        (response, messages)
    };
    broadcast_messages(&state, messages);
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct PurchaseCoinsRequest {
    actor_id: String,
    role: ActorRole,
    amount: i64,
}

async fn purchase_coins(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<PurchaseCoinsRequest>,
) -> Result<Json<BalanceResponse>, HttpApiError> {
    if request.actor_id != user_id {
        return Err(HttpApiError::invalid_query(
            "coins can only be purchased for the calling user",
            Some(format!("user_id={user_id} actor_id={}", request.actor_id)),
        ));
    }
    let (response, messages) = {
        let mut inner = state.inner.lock().await;
        let engine = require_market_mut(&mut inner)?;
        let actor = ActorRef::new(request.actor_id, request.role);
        let change = engine
            .purchase_coins(&actor, request.amount)
            .map_err(HttpApiError::from_market)?;
        let response = BalanceResponse {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            balance: change.balance_after,
            balance_change: Some(change),
        };
        let messages = collect_delta_messages(&mut inner);
        (response, messages)
    };
    broadcast_messages(&state, messages);
    Ok(Json(response))
}

async fn get_balance(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<BalanceResponse>, HttpApiError> {
    let inner = state.inner.lock().await;
    let engine = require_market(&inner)?;
    let balance = engine
        .balance_of(&user_id)
        .map_err(HttpApiError::from_market)?;
    Ok(Json(BalanceResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        balance_change: None,
        balance,
    }))
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    cursor: Option<usize>,
    page_size: Option<usize>,
}

#[derive(Debug, Serialize)]
struct TransactionsResponse {
    schema_version: String,
    transactions: Vec<TransactionRecord>,
    next_cursor: Option<usize>,
}

async fn get_transactions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<TransactionsResponse>, HttpApiError> {
    let inner = state.inner.lock().await;
    let engine = require_market(&inner)?;
    let transactions = engine.transactions_for(&user_id);
    let (start, end, next_cursor) = paginate(transactions.len(), query.cursor, query.page_size)?;
    Ok(Json(TransactionsResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        transactions: transactions[start..end].to_vec(),
        next_cursor,
    }))
}

#[derive(Debug, Serialize)]
struct NotificationsResponse {
    schema_version: String,
    notifications: Vec<Event>,
    next_cursor: Option<usize>,
}

async fn get_notifications(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<NotificationsResponse>, HttpApiError> {
    let inner = state.inner.lock().await;
    let engine = require_market(&inner)?;
    let notifications = engine.notifications_for(&user_id);
    let (start, end, next_cursor) = paginate(notifications.len(), query.cursor, query.page_size)?;
    Ok(Json(NotificationsResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        notifications: notifications[start..end].to_vec(),
        next_cursor,
    }))
}

#[derive(Debug, Serialize)]
struct TargetsResponse {
    schema_version: String,
    targets: Vec<TargetMark>,
}

async fn get_user_targets(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<TargetsResponse>, HttpApiError> {
    let inner = state.inner.lock().await;
    let engine = require_market(&inner)?;
    Ok(Json(TargetsResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        targets: engine.market().targets_for_user(&user_id),
    }))
}

async fn list_targets(
    State(state): State<AppState>,
) -> Result<Json<TargetsResponse>, HttpApiError> {
    let inner = state.inner.lock().await;
    let engine = require_market(&inner)?;
    Ok(Json(TargetsResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        targets: engine.market().list_targets(),
    }))
}
