//! HTTP surface: two resource families, nine routes.
//!
//! Path parameters are base64url public keys (URL-safe by construction).
//! Every list endpoint is a polling view filtered to the queried key's role;
//! all writes go through the engines, which own validation, authentication,
//! and atomicity.

use actix_web::{web, HttpResponse};

use kb_proto::api::{
    ConversationCompleteRequest, ConversationInitiateRequest, ExchangeCompleteRequest,
    ExchangeInitRequest, ExchangePairRequest,
};

use crate::error::ApiError;
use crate::state::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/conversations", web::post().to(initiate_conversation))
        .route(
            "/conversations/pending/{responder_pubkey}",
            web::get().to(pending_conversations),
        )
        .route(
            "/conversations/complete",
            web::post().to(complete_conversation),
        )
        .route("/exchanges/init", web::post().to(init_exchange))
        .route(
            "/exchanges/initiated/{responder_pubkey}",
            web::get().to(initiated_exchanges),
        )
        .route("/exchanges/pair", web::post().to(pair_exchange))
        .route(
            "/exchanges/paired/{initiator_pubkey}",
            web::get().to(paired_exchanges),
        )
        .route("/exchanges/complete", web::post().to(complete_exchange))
        .route(
            "/exchanges/complete/{responder_pubkey}",
            web::get().to(completed_exchanges),
        );
}

// ── Conversations ─────────────────────────────────────────────────────────────

async fn initiate_conversation(
    state: web::Data<AppState>,
    req: web::Json<ConversationInitiateRequest>,
) -> Result<HttpResponse, ApiError> {
    let conversation = state.conversations.initiate(req.into_inner()).await?;
    Ok(HttpResponse::Created().json(conversation))
}

async fn pending_conversations(
    state: web::Data<AppState>,
    responder_pubkey: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let pending = state
        .conversations
        .list_pending(&responder_pubkey.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(pending))
}

async fn complete_conversation(
    state: web::Data<AppState>,
    req: web::Json<ConversationCompleteRequest>,
) -> Result<HttpResponse, ApiError> {
    let conversation = state.conversations.complete(req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(conversation))
}

// ── Exchanges ─────────────────────────────────────────────────────────────────

async fn init_exchange(
    state: web::Data<AppState>,
    req: web::Json<ExchangeInitRequest>,
) -> Result<HttpResponse, ApiError> {
    let exchange = state.exchanges.init(req.into_inner()).await?;
    Ok(HttpResponse::Created().json(exchange))
}

async fn initiated_exchanges(
    state: web::Data<AppState>,
    responder_pubkey: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let initiated = state
        .exchanges
        .list_initiated(&responder_pubkey.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(initiated))
}

async fn pair_exchange(
    state: web::Data<AppState>,
    req: web::Json<ExchangePairRequest>,
) -> Result<HttpResponse, ApiError> {
    let exchange = state.exchanges.pair(req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(exchange))
}

async fn paired_exchanges(
    state: web::Data<AppState>,
    initiator_pubkey: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let paired = state
        .exchanges
        .list_paired(&initiator_pubkey.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(paired))
}

async fn complete_exchange(
    state: web::Data<AppState>,
    req: web::Json<ExchangeCompleteRequest>,
) -> Result<HttpResponse, ApiError> {
    let exchange = state.exchanges.complete(req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(exchange))
}

async fn completed_exchanges(
    state: web::Data<AppState>,
    responder_pubkey: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let completed = state
        .exchanges
        .list_completed(&responder_pubkey.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(completed))
}
