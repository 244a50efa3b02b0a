//! HTTP surface
//!
//! | Method | Path | |
//! |---|---|---|
//! | GET | `/api/game/stream` | live channel |
//! | GET | `/api/game/state` | latest snapshot, `204` before the first one |
//! | POST | `/api/game/state` | publishes a snapshot as is |
//! | POST | `/api/game/events` | sends an event to the host session |
//! | POST | `/api/game/animation-complete` | closes the open animation gate |
//! | GET | `/api/game/questions` | the question bank |

use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::{
    Json, Router,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::{HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use futures::StreamExt;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::{
    Snapshot,
    constants::live::KEEP_ALIVE,
    game::Event,
    host::Host,
    live::LiveChannel,
    publisher::Publisher,
    question::QuestionCategory,
};

/// Everything the handlers share
#[derive(Debug, Clone)]
pub struct AppState {
    /// The broadcaster behind the live channel
    pub publisher: Arc<Publisher>,
    /// The game of the process
    pub host: Arc<Host>,
    /// The loaded question bank
    pub questions: Arc<Vec<QuestionCategory>>,
    /// Interval between keep-alive frames
    pub keep_alive: Duration,
}

impl AppState {
    /// Creates the shared state for a host session
    ///
    /// The live channel follows the host's publisher.
    pub fn new(host: Arc<Host>, questions: Vec<QuestionCategory>) -> Self {
        Self {
            publisher: Arc::clone(host.publisher()),
            host,
            questions: Arc::new(questions),
            keep_alive: KEEP_ALIVE,
        }
    }

    /// Sets the keep-alive interval of the live channel
    #[must_use]
    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }
}

/// Builds the router of the game API
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/game/stream", get(stream))
        .route("/api/game/state", get(latest_state).post(ingest_state))
        .route("/api/game/events", post(send_event))
        .route("/api/game/animation-complete", post(animation_complete))
        .route("/api/game/questions", get(questions))
        .with_state(state)
}

fn bad_request(rejection: &JsonRejection) -> Response {
    let reason = rejection.body_text();
    warn!(%reason, "rejected request body");
    (StatusCode::BAD_REQUEST, Json(json!({ "error": reason }))).into_response()
}

async fn stream(State(state): State<AppState>) -> impl IntoResponse {
    let channel = LiveChannel::open(&state.publisher, state.keep_alive);
    info!(
        viewers = state.publisher.subscriber_count(),
        "display connected"
    );

    let body = Body::from_stream(channel.map(|frame| Ok::<_, Infallible>(frame.encode())));
    (
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/event-stream"),
            ),
            (
                header::CACHE_CONTROL,
                HeaderValue::from_static("no-cache, no-transform"),
            ),
            (
                HeaderName::from_static("x-accel-buffering"),
                HeaderValue::from_static("no"),
            ),
        ],
        body,
    )
}

async fn latest_state(State(state): State<AppState>) -> Response {
    match state.publisher.latest() {
        Some(snapshot) => Json(Snapshot::clone(&snapshot)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

#[instrument(skip_all)]
async fn ingest_state(
    State(state): State<AppState>,
    payload: Result<Json<Snapshot>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(snapshot)) => {
            let target = snapshot.state;
            let delivered = state.publisher.set_state(snapshot);
            debug!(state = %target, delivered, "snapshot ingested");
            Json(json!({ "success": true })).into_response()
        }
        Err(rejection) => bad_request(&rejection),
    }
}

#[instrument(skip_all)]
async fn send_event(
    State(state): State<AppState>,
    payload: Result<Json<Event>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(event)) => Json(state.host.send(event).await).into_response(),
        Err(rejection) => bad_request(&rejection),
    }
}

async fn animation_complete(State(state): State<AppState>) -> Response {
    Json(state.host.animation_complete().await).into_response()
}

async fn questions(State(state): State<AppState>) -> Json<Vec<QuestionCategory>> {
    Json(state.questions.as_ref().clone())
}
