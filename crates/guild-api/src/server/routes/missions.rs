#[derive(Debug, Deserialize)]
struct CreateMissionRequest {
    actor_id: String,
    role: ActorRole,
    title: String,
    #[serde(default)]
    description: String,
    reward: i64,
    #[serde(default)]
    is_private: bool,
    #[serde(default)]
    target_assassin_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct MissionResponse {
    schema_version: String,
    mission: Mission,
    balance_change: Option<BalanceChange>,
}

async fn create_mission(
    State(state): State<AppState>,
    Json(request): Json<CreateMissionRequest>,
) -> Result<Json<MissionResponse>, HttpApiError> {
    let (response, messages) = {
        let mut inner = state.inner.lock().await;
        let engine = require_market_mut(&mut inner)?;
        let actor = ActorRef::new(request.actor_id, request.role);
        let draft = MissionDraft {
            title: request.title,
            description: request.description,
            reward: request.reward,
            is_private: request.is_private,
            target_assassin_id: request.target_assassin_id,
        };
        let (mission, change) = engine
            .create_mission(&actor, draft)
            .map_err(HttpApiError::from_market)?;
        let response = MissionResponse {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            mission,
            balance_change: Some(change),
        };
        let messages = collect_delta_messages(&mut inner);
        (response, messages)
    };
    broadcast_messages(&state, messages);
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct ListMissionsQuery {
    actor_id: Option<String>,
    role: Option<ActorRole>,
    cursor: Option<usize>,
    page_size: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ListMissionsResponse {
    schema_version: String,
    missions: Vec<Mission>,
    next_cursor: Option<usize>,
}

async fn list_missions(
    State(state): State<AppState>,
    Query(query): Query<ListMissionsQuery>,
) -> Result<Json<ListMissionsResponse>, HttpApiError> {
    let inner = state.inner.lock().await;
    let engine = require_market(&inner)?;
    let missions = match (&query.actor_id, query.role) {
        (Some(actor_id), Some(role)) => engine.market().visible_missions(actor_id, role),
        _ => engine
            .market()
            .list_missions()
            .into_iter()
            .filter(|mission| !mission.is_private)
            .collect(),
    };
    let (start, end, next_cursor) = paginate(missions.len(), query.cursor, query.page_size)?;
    Ok(Json(ListMissionsResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        missions: missions[start..end].to_vec(),
        next_cursor,
    }))
}

async fn get_mission(
    State(state): State<AppState>,
    Path(mission_id): Path<String>,
) -> Result<Json<MissionResponse>, HttpApiError> {
    let inner = state.inner.lock().await;
    let engine = require_market(&inner)?;
    let mission = engine.market().mission(&mission_id).ok_or_else(|| {
        HttpApiError::from_market(MarketError::NotFound {
            entity: "mission",
            id: mission_id.clone(),
        })
    })?;
    Ok(Json(MissionResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        mission,
        balance_change: None,
    }))
}

#[derive(Debug, Deserialize)]
struct UpdateMissionRequest {
    actor_id: String,
    role: ActorRole,
    title: Option<String>,
    description: Option<String>,
    reward: Option<i64>,
    is_private: Option<bool>,
    #[serde(
        default,
        deserialize_with = "contracts::serde_double_option::deserialize"
    )]
    target_assassin_id: Option<Option<String>>,
}

async fn update_mission(
    State(state): State<AppState>,
    Path(mission_id): Path<String>,
    Json(request): Json<UpdateMissionRequest>,
) -> Result<Json<MissionResponse>, HttpApiError> {
    let (response, messages) = {
        let mut inner = state.inner.lock().await;
        let engine = require_market_mut(&mut inner)?;
        let actor = ActorRef::new(request.actor_id, request.role);
        let update = MissionUpdate {
            title: request.title,
            description: request.description,
            reward: request.reward,
            is_private: request.is_private,
            target_assassin_id: request.target_assassin_id,
        };
        let (mission, change) = engine
            .update_mission(&actor, &mission_id, update)
            .map_err(HttpApiError::from_market)?;
        let response = MissionResponse {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            mission,
            balance_change: change,
        };
        let messages = collect_delta_messages(&mut inner);
        (response, messages)
    };
    broadcast_messages(&state, messages);
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct ActorRequest {
    actor_id: String,
    role: ActorRole,
}

async fn delete_mission(
    State(state): State<AppState>,
    Path(mission_id): Path<String>,
    Json(request): Json<ActorRequest>,
) -> Result<Json<MissionResponse>, HttpApiError> {
    let (response, messages) = {
        let mut inner = state.inner.lock().await;
        let engine = require_market_mut(&mut inner)?;
        let actor = ActorRef::new(request.actor_id, request.role);
        let (mission, change) = engine
            .delete_mission(&actor, &mission_id)
            .map_err(HttpApiError::from_market)?;
        let response = MissionResponse {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            mission,
            balance_change: change,
        };
        let messages = collect_delta_messages(&mut inner);
        (response, messages)
    };
    broadcast_messages(&state, messages);
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct AssignMissionRequest {
    actor_id: String,
    role: ActorRole,
    assassin_id: String,
}

async fn assign_mission(
    State(state): State<AppState>,
    Path(mission_id): Path<String>,
    Json(request): Json<AssignMissionRequest>,
) -> Result<Json<MissionResponse>, HttpApiError> {
    let (response, messages) = {
        let mut inner = state.inner.lock().await;
        let engine = require_market_mut(&mut inner)?;
        let actor = ActorRef::new(request.actor_id, request.role);
        let mission = engine
            .assign_mission(&actor, &mission_id, &request.assassin_id)
            .map_err(HttpApiError::from_market)?;
        let response = MissionResponse {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            mission,
            balance_change: None,
        };
        let messages = collect_delta_messages(&mut inner);
        (response, messages)
    };
    broadcast_messages(&state, messages);
    Ok(Json(response))
}

async fn accept_mission(
    State(state): State<AppState>,
    Path(mission_id): Path<String>,
    Json(request): Json<ActorRequest>,
) -> Result<Json<MissionResponse>, HttpApiError> {
    let (response, messages) = {
        let mut inner = state.inner.lock().await;
        let engine = require_market_mut(&mut inner)?;
        let actor = ActorRef::new(request.actor_id, request.role);
        let mission = engine
            .accept_mission_from_notification(&actor, &mission_id)
            .map_err(HttpApiError::from_market)?;
        let response = MissionResponse {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            mission,
            balance_change: None,
        };
        let messages = collect_delta_messages(&mut inner);
        (response, messages)
    };
    broadcast_messages(&state, messages);
    Ok(Json(response))
}

async fn complete_mission(
    State(state): State<AppState>,
    Path(mission_id): Path<String>,
    Json(request): Json<ActorRequest>,
) -> Result<Json<MissionResponse>, HttpApiError> {
    let (response, messages) = {
        let mut inner = state.inner.lock().await;
        let engine = require_market_mut(&mut inner)?;
        let actor = ActorRef::new(request.actor_id, request.role);
        let (mission, change) = engine
            .complete_mission(&actor, &mission_id)
            .map_err(HttpApiError::from_market)?;
        let response = MissionResponse {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            mission,
            balance_change: Some(change),
        };
        let messages = collect_delta_messages(&mut inner);
        (response, messages)
    };
    broadcast_messages(&state, messages);
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct ProposeNegotiationRequest {
    actor_id: String,
    role: ActorRole,
    proposed_reward: i64,
}

#[derive(Debug, Serialize)]
struct NegotiationResponse {
    schema_version: String,
    negotiation: Negotiation,
    mission: Option<Mission>,
    balance_change: Option<BalanceChange>,
}

async fn propose_negotiation(
    State(state): State<AppState>,
    Path(mission_id): Path<String>,
    Json(request): Json<ProposeNegotiationRequest>,
) -> Result<Json<NegotiationResponse>, HttpApiError> {
    let (response, messages) = {
        let mut inner = state.inner.lock().await;
        let engine = require_market_mut(&mut inner)?;
        let actor = ActorRef::new(request.actor_id, request.role);
        let negotiation = engine
            .propose_negotiation(&actor, &mission_id, request.proposed_reward)
            .map_err(HttpApiError::from_market)?;
        let mission = engine.market().mission(&mission_id);
        let response = NegotiationResponse {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            negotiation,
            mission,
            balance_change: None,
        };
        let messages = collect_delta_messages(&mut inner);
        (response, messages)
    };
    broadcast_messages(&state, messages);
    Ok(Json(response))
}

#[derive(Debug, Serialize)]
struct ListNegotiationsResponse {
    schema_version: String,
    negotiations: Vec<Negotiation>,
}

async fn list_mission_negotiations(
    State(state): State<AppState>,
    Path(mission_id): Path<String>,
) -> Result<Json<ListNegotiationsResponse>, HttpApiError> {
    let inner = state.inner.lock().await;
    let engine = require_market(&inner)?;
    Ok(Json(ListNegotiationsResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        negotiations: engine.market().negotiations_for_mission(&mission_id),
    }))
}

async fn accept_negotiation(
    State(state): State<AppState>,
    Path(negotiation_id): Path<String>,
    Json(request): Json<ActorRequest>,
) -> Result<Json<NegotiationResponse>, HttpApiError> {
    let (response, messages) = {
        let mut inner = state.inner.lock().await;
        let engine = require_market_mut(&mut inner)?;
        let actor = ActorRef::new(request.actor_id, request.role);
        let (negotiation, mission, change) = engine
            .accept_negotiation(&actor, &negotiation_id)
            .map_err(HttpApiError::from_market)?;
        let response = NegotiationResponse {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            negotiation,
            mission: Some(mission),
            balance_change: change,
        };
        let messages = collect_delta_messages(&mut inner);
        (response, messages)
    };
    broadcast_messages(&state, messages);
    Ok(Json(response))
}

async fn reject_negotiation(
    State(state): State<AppState>,
    Path(negotiation_id): Path<String>,
    Json(request): Json<ActorRequest>,
) -> Result<Json<NegotiationResponse>, HttpApiError> {
    let (response, messages) = {
        let mut inner = state.inner.lock().await;
        let engine = require_market_mut(&mut inner)?;
        let actor = ActorRef::new(request.actor_id, request.role);
        let (negotiation, mission) = engine
            .reject_negotiation(&actor, &negotiation_id)
            .map_err(HttpApiError::from_market)?;
        let response = NegotiationResponse {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            negotiation,
            mission: Some(mission),
            balance_change: None,
        };
        let messages = collect_delta_messages(&mut inner);
        (response, messages)
    };
    broadcast_messages(&state, messages);
    Ok(Json(response))
}
