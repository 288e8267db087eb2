use axum::{Json, Router, extract::State, routing::get};

use crate::{auth::AuthUser, error::AppError, models::LeaderboardEntry, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/leaderboard", get(leaderboard))
}

async fn leaderboard(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<LeaderboardEntry>>, AppError> {
    let entries = LeaderboardEntry::compute(&state.db_pool).await?;

    Ok(Json(entries))
}
