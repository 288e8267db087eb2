#![deny(clippy::expect_used, clippy::unwrap_used, unsafe_code)]
#![allow(clippy::module_name_repetitions, clippy::multiple_crate_versions)]

use std::io;
use std::str::FromStr;

use axum::{
    Router,
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
};
use serde::Deserialize;
use sqlx::{SqlitePool, sqlite::SqliteConnectOptions};
use tokio_stream::{Stream, StreamExt, wrappers::BroadcastStream};
use tower_sessions::{Expiry, SessionManagerLayer, cookie::time::Duration};
use tower_sessions_sqlx_store::SqliteStore;

use crate::{
    feed::{ChangeFeed, ChangeTable},
    state::AppState,
    storage::UploadStore,
};

pub use args::TaskmasterArgs;

mod args;
mod auth;
pub mod error;
pub mod feed;
pub mod models;
mod routes;
pub mod state;
pub mod storage;

/// Connect, migrate, and assemble the full application router.
pub async fn server(args: TaskmasterArgs) -> Result<Router, io::Error> {
    let options = SqliteConnectOptions::from_str(&args.database)
        .map_err(io::Error::other)?
        .create_if_missing(true)
        .foreign_keys(true);

    let db_pool = SqlitePool::connect_with(options)
        .await
        .map_err(io::Error::other)?;

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .map_err(io::Error::other)?;

    app(db_pool, args).await
}

/// Assemble the router on an already-migrated pool.
pub async fn app(db_pool: SqlitePool, args: TaskmasterArgs) -> Result<Router, io::Error> {
    let session_store = SqliteStore::new(db_pool.clone());
    session_store.migrate().await.map_err(io::Error::other)?;
    let session_layer = SessionManagerLayer::new(session_store)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(Duration::days(7)));

    let state = AppState {
        db_pool,
        changes: ChangeFeed::new(64),
        uploads: UploadStore::new(args.uploads.clone()),
        config: args,
    };

    Ok(router(state).layer(session_layer))
}

/// The bare router over an existing state, without the session layer.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/events", get(events))
        .merge(auth::auth_router())
        .merge(routes::group::router())
        .merge(routes::project::router())
        .merge(routes::submission::router())
        .merge(routes::leaderboard::router())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

#[derive(Deserialize)]
struct EventParams {
    table: Option<ChangeTable>,
}

/// Change-notification stream. Clients subscribe, optionally filtered to
/// one table, and re-fetch their scope whenever an event arrives.
async fn events(
    _auth: auth::AuthUser,
    State(state): State<AppState>,
    Query(params): Query<EventParams>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let stream = BroadcastStream::new(state.changes.subscribe()).filter_map(move |event| {
        // a lagged receiver just skips ahead; the next event triggers
        // the same re-fetch anyway
        let event = event.ok()?;
        if params.table.is_none_or(|table| table == event.table) {
            Some(Event::default().json_data(event))
        } else {
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
