use std::fmt;
use std::net::SocketAddr;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, Request, State};
use axum::http::header::{HeaderName, HeaderValue};
use axum::http::{Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use contracts::{
    ActorRef, ActorRole, ApiError, BalanceChange, Debt, ErrorCode, Event, MarketConfig,
    MarketStatus, Mission, Negotiation, TargetMark, TransactionRecord, SCHEMA_VERSION_V1,
};
use guild_core::{MarketError, MissionDraft, MissionUpdate};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Mutex};

use crate::{MarketApi, PersistenceError};

const DEFAULT_PAGE_SIZE: usize = 500;
const MAX_PAGE_SIZE: usize = 5000;
const DEFAULT_SQLITE_PATH: &str = "guild_market.sqlite";

include!("error.rs");
include!("state.rs");
include!("routes/market.rs");
include!("routes/accounts.rs");
include!("routes/missions.rs");
include!("routes/debts.rs");
include!("routes/stream.rs");
include!("util.rs");


pub async fn serve(addr: SocketAddr) -> Result<(), ServerError> {
    let state = AppState::new();
    let app = router(state);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/market", post(open_market).get(get_status))
        .route("/api/v1/markets", get(list_markets))
        .route("/api/v1/users", post(register_user))
        .route("/api/v1/users/{user_id}/coins", post(purchase_coins))
        .route("/api/v1/users/{user_id}/balance", get(get_balance))
        .route("/api/v1/users/{user_id}/transactions", get(get_transactions))
        .route(
            "/api/v1/users/{user_id}/notifications",
            get(get_notifications),
        )
        .route("/api/v1/users/{user_id}/targets", get(get_user_targets))
        .route("/api/v1/missions", post(create_mission).get(list_missions))
        .route(
            "/api/v1/missions/{mission_id}",
            get(get_mission)
                .patch(update_mission)
                .delete(delete_mission),
        )
        .route("/api/v1/missions/{mission_id}/assign", post(assign_mission))
        .route("/api/v1/missions/{mission_id}/accept", post(accept_mission))
        .route(
            "/api/v1/missions/{mission_id}/complete",
            post(complete_mission),
        )
        .route(
            "/api/v1/missions/{mission_id}/negotiations",
            post(propose_negotiation).get(list_mission_negotiations),
        )
        .route(
            "/api/v1/negotiations/{negotiation_id}/accept",
            post(accept_negotiation),
        )
        .route(
            "/api/v1/negotiations/{negotiation_id}/reject",
            post(reject_negotiation),
        )
        .route("/api/v1/debts", post(create_favor_request).get(list_debts))
        .route("/api/v1/debts/{debt_id}", get(get_debt))
        .route("/api/v1/debts/{debt_id}/accept", post(accept_debt))
        .route("/api/v1/debts/{debt_id}/reject", post(reject_debt))
        .route(
            "/api/v1/debts/{debt_id}/request-payment",
            post(request_payment),
        )
        .route(
            "/api/v1/debts/{debt_id}/accept-payment",
            post(accept_payment),
        )
        .route(
            "/api/v1/debts/{debt_id}/reject-payment",
            post(reject_payment),
        )
        .route(
            "/api/v1/debts/{debt_id}/mark-completed",
            post(mark_completed),
        )
        .route(
            "/api/v1/debts/{debt_id}/confirm-completion",
            post(confirm_completion),
        )
        .route(
            "/api/v1/debts/{debt_id}/reject-completion",
            post(reject_completion),
        )
        .route("/api/v1/targets", get(list_targets))
        .route("/api/v1/stream", get(stream_handler))
        .layer(middleware::from_fn(cors_middleware))
        .with_state(state)
}

async fn cors_middleware(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        apply_cors_headers(response.headers_mut());
        return response;
    }
    let mut response = next.run(request).await;
    apply_cors_headers(response.headers_mut());
    response
}
