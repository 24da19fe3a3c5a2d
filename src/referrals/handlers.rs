use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use super::dto::{
    LeaderboardQuery, LeaderboardResponse, ReferralStatsResponse, SendSignInRequest,
    SendSignInResponse, VerifyRequest, VerifyResponse,
};
use super::services;
use crate::{error::AppResult, state::AppState};

pub fn signup_routes() -> Router<AppState> {
    Router::new()
        .route("/api/send-signin-email", post(send_signin_email))
        .route("/api/verify-success", post(verify_success))
}

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/api/leaderboard", get(get_leaderboard))
        .route("/api/referrals/:email", get(get_referral_stats))
}

#[instrument(skip(state, payload))]
pub async fn send_signin_email(
    State(state): State<AppState>,
    Json(payload): Json<SendSignInRequest>,
) -> AppResult<Json<SendSignInResponse>> {
    let outcome = services::request_sign_in(
        &state,
        payload.email.as_deref(),
        payload.referral_code.as_deref(),
    )
    .await?;
    info!(
        email = %outcome.email,
        referred_by = ?outcome.referred_by,
        email_sent = outcome.email_sent,
        "signup accepted"
    );
    Ok(Json(outcome.into()))
}

#[instrument(skip(state, payload))]
pub async fn verify_success(
    State(state): State<AppState>,
    Json(payload): Json<VerifyRequest>,
) -> AppResult<Json<VerifyResponse>> {
    let outcome =
        services::verify(&state, payload.email.as_deref(), payload.token.as_deref()).await?;
    info!(
        email = %outcome.email,
        referred_by = ?outcome.referred_by,
        already_verified = outcome.already_verified,
        "verification handled"
    );
    Ok(Json(outcome.into()))
}

#[instrument(skip(state))]
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Query(q): Query<LeaderboardQuery>,
) -> AppResult<Json<LeaderboardResponse>> {
    let entries = services::leaderboard(&state, q.limit).await?;
    Ok(Json(LeaderboardResponse {
        entries: entries.into_iter().map(Into::into).collect(),
    }))
}

#[instrument(skip(state))]
pub async fn get_referral_stats(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> AppResult<Json<ReferralStatsResponse>> {
    let user = services::referral_stats(&state, &email).await?;
    Ok(Json(user.into()))
}
