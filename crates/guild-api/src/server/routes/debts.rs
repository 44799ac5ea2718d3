#[derive(Debug, Deserialize)]
struct CreateFavorRequest {
    actor_id: String,
    role: ActorRole,
    creditor_id: String,
    favor_description: String,
}

#[derive(Debug, Serialize)]
struct DebtResponse {
    schema_version: String,
    debt: Debt,
    target: Option<TargetMark>,
}

async fn create_favor_request(
    State(state): State<AppState>,
    Json(request): Json<CreateFavorRequest>,
) -> Result<Json<DebtResponse>, HttpApiError> {
    let (response, messages) = {
        let mut inner = state.inner.lock().await;
        let engine = require_market_mut(&mut inner)?;
        let actor = ActorRef::new(request.actor_id, request.role);
        let debt = engine
            .create_favor_request(&actor, &request.creditor_id, &request.favor_description)
            .map_err(HttpApiError::from_market)?;
        let response = DebtResponse {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            debt,
            target: None,
        };
        let messages = collect_delta_messages(&mut inner);
        (response, messages)
    };
    broadcast_messages(&state, messages);
    Ok(Json(response))
}

#[derive(Debug, Serialize)]
struct ListDebtsResponse {
    schema_version: String,
    debts: Vec<Debt>,
    next_cursor: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ListDebtsQuery {
    user_id: Option<String>,
    cursor: Option<usize>,
    page_size: Option<usize>,
}

async fn list_debts(
    State(state): State<AppState>,
    Query(query): Query<ListDebtsQuery>,
) -> Result<Json<ListDebtsResponse>, HttpApiError> {
    let inner = state.inner.lock().await;
    let engine = require_market(&inner)?;
    let debts: Vec<Debt> = match &query.user_id {
        Some(user_id) => engine
            .market()
            .list_debts()
            .into_iter()
            .filter(|debt| &debt.debtor_id == user_id || &debt.creditor_id == user_id)
            .collect(),
        None => engine.market().list_debts(),
    };
    let (start, end, next_cursor) = paginate(debts.len(), query.cursor, query.page_size)?;
    Ok(Json(ListDebtsResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        debts: debts[start..end].to_vec(),
        next_cursor,
    }))
}

async fn get_debt(
    State(state): State<AppState>,
    Path(debt_id): Path<String>,
) -> Result<Json<DebtResponse>, HttpApiError> {
    let inner = state.inner.lock().await;
    let engine = require_market(&inner)?;
    let debt = engine.market().debt(&debt_id).ok_or_else(|| {
        HttpApiError::from_market(MarketError::NotFound {
            entity: "debt",
            id: debt_id.clone(),
        })
    })?;
    Ok(Json(DebtResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        debt,
        target: None,
    }))
}

async fn accept_debt(
    State(state): State<AppState>,
    Path(debt_id): Path<String>,
    Json(request): Json<ActorRequest>,
) -> Result<Json<DebtResponse>, HttpApiError> {
    let (response, messages) = {
        let mut inner = state.inner.lock().await;
        let engine = require_market_mut(&mut inner)?;
        let actor = ActorRef::new(request.actor_id, request.role);
        let debt = engine
            .accept_debt(&actor, &debt_id)
            .map_err(HttpApiError::from_market)?;
        let response = DebtResponse {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            debt,
            target: None,
        };
        let messages = collect_delta_messages(&mut inner);
        (response, messages)
    };
    broadcast_messages(&state, messages);
    Ok(Json(response))
}

async fn reject_debt(
    State(state): State<AppState>,
    Path(debt_id): Path<String>,
    Json(request): Json<ActorRequest>,
) -> Result<Json<DebtResponse>, HttpApiError> {
    let (response, messages) = {
        let mut inner = state.inner.lock().await;
        let engine = require_market_mut(&mut inner)?;
        let actor = ActorRef::new(request.actor_id, request.role);
        let debt = engine
            .reject_debt(&actor, &debt_id)
            .map_err(HttpApiError::from_market)?;
        let response = DebtResponse {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            debt,
            target: None,
        };
        let messages = collect_delta_messages(&mut inner);
        (response, messages)
    };
    broadcast_messages(&state, messages);
    Ok(Json(response))
}

async fn accept_payment(
    State(state): State<AppState>,
    Path(debt_id): Path<String>,
    Json(request): Json<ActorRequest>,
) -> Result<Json<DebtResponse>, HttpApiError> {
    let (response, messages) = {
        let mut inner = state.inner.lock().await;
        let engine = require_market_mut(&mut inner)?;
        let actor = ActorRef::new(request.actor_id, request.role);
        let debt = engine
            .accept_payment(&actor, &debt_id)
            .map_err(HttpApiError::from_market)?;
        let response = DebtResponse {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            debt,
            target: None,
        };
        let messages = collect_delta_messages(&mut inner);
        (response, messages)
    };
    broadcast_messages(&state, messages);
    Ok(Json(response))
}

async fn mark_completed(
    State(state): State<AppState>,
    Path(debt_id): Path<String>,
    Json(request): Json<ActorRequest>,
) -> Result<Json<DebtResponse>, HttpApiError> {
    let (response, messages) = {
        let mut inner = state.inner.lock().await;
        let engine = require_market_mut(&mut inner)?;
        let actor = ActorRef::new(request.actor_id, request.role);
        let debt = engine
            .mark_completed(&actor, &debt_id)
            .map_err(HttpApiError::from_market)?;
        let response = DebtResponse {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            debt,
            target: None,
        };
        let messages = collect_delta_messages(&mut inner);
        (response, messages)
    };
    broadcast_messages(&state, messages);
    Ok(Json(response))
}

async fn confirm_completion(
    State(state): State<AppState>,
    Path(debt_id): Path<String>,
    Json(request): Json<ActorRequest>,
) -> Result<Json<DebtResponse>, HttpApiError> {
    let (response, messages) = {
        let mut inner = state.inner.lock().await;
        let engine = require_market_mut(&mut inner)?;
        let actor = ActorRef::new(request.actor_id, request.role);
        let debt = engine
            .confirm_completion(&actor, &debt_id)
            .map_err(HttpApiError::from_market)?;
        let response = DebtResponse {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            debt,
            target: None,
        };
        let messages = collect_delta_messages(&mut inner);
        (response, messages)
    };
    broadcast_messages(&state, messages);
    Ok(Json(response))
}

async fn reject_completion(
    State(state): State<AppState>,
    Path(debt_id): Path<String>,
    Json(request): Json<ActorRequest>,
) -> Result<Json<DebtResponse>, HttpApiError> {
    let (response, messages) = {
        let mut inner = state.inner.lock().await;
        let engine = require_market_mut(&mut inner)?;
        let actor = ActorRef::new(request.actor_id, request.role);
        let debt = engine
            .reject_completion(&actor, &debt_id)
            .map_err(HttpApiError::from_market)?;
        let response = DebtResponse {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            debt,
            target: None,
        };
        let messages = collect_delta_messages(&mut inner);
        (response, messages)
    };
    broadcast_messages(&state, messages);
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct RequestPaymentRequest {
    actor_id: String,
    role: ActorRole,
    payment_description: String,
}

async fn request_payment(
    State(state): State<AppState>,
    Path(debt_id): Path<String>,
    Json(request): Json<RequestPaymentRequest>,
) -> Result<Json<DebtResponse>, HttpApiError> {
    let (response, messages) = {
        let mut inner = state.inner.lock().await;
        let engine = require_market_mut(&mut inner)?;
        let actor = ActorRef::new(request.actor_id, request.role);
        let debt = engine
            .request_payment(&actor, &debt_id, &request.payment_description)
            .map_err(HttpApiError::from_market)?;
        let response = DebtResponse {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            debt,
            target: None,
        };
        let messages = collect_delta_messages(&mut inner);
        (response, messages)
    };
    broadcast_messages(&state, messages);
    Ok(Json(response))
}

async fn reject_payment(
    State(state): State<AppState>,
    Path(debt_id): Path<String>,
    Json(request): Json<ActorRequest>,
) -> Result<Json<DebtResponse>, HttpApiError> {
    let (response, messages) = {
        let mut inner = state.inner.lock().await;
        let engine = require_market_mut(&mut inner)?;
        let actor = ActorRef::new(request.actor_id, request.role);
        let (debt, mark) = engine
            .reject_payment(&actor, &debt_id)
            .map_err(HttpApiError::from_market)?;
        let response = DebtResponse {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            debt,
            target: Some(mark),
        };
        let messages = collect_delta_messages(&mut inner);
        (response, messages)
    };
    broadcast_messages(&state, messages);
    Ok(Json(response))
}
