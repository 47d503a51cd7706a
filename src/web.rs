use std::{
    convert::Infallible,
    net::SocketAddr,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::broadcast};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use tracing::{info, warn};

use crate::{
    actions::{ActionError, ActionOutcome},
    clock::GameClock,
    content::BackgroundDispatch,
    engine::TickSummary,
    scenario::Scenario,
    session::{
        lock_session, GoalError, QuizError, QuizState, QuizVerdict, SessionSnapshot,
        SharedSession,
    },
};

/// One SSE payload: what the tick did and the state it left behind.
#[derive(Clone, Serialize)]
pub struct TickFrame {
    pub summary: TickSummary,
    pub state: SessionSnapshot,
}

#[derive(Serialize)]
pub struct StateEnvelope {
    pub scenario: String,
    pub state: SessionSnapshot,
}

#[derive(Deserialize)]
pub struct TileRequest {
    pub tool: String,
}

#[derive(Serialize)]
pub struct TileResponse {
    pub outcome: ActionOutcome,
    pub state: SessionSnapshot,
}

#[derive(Serialize)]
pub struct ClaimResponse {
    pub reward: i64,
    pub state: SessionSnapshot,
}

#[derive(Deserialize, Default)]
pub struct QuizRequest {
    #[serde(default)]
    pub topic: Option<String>,
}

#[derive(Deserialize)]
pub struct AnswerRequest {
    pub index: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Action(#[from] ActionError),
    #[error(transparent)]
    Goal(#[from] GoalError),
    #[error(transparent)]
    Quiz(#[from] QuizError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Action(ActionError::InsufficientFunds { .. }) => {
                StatusCode::PAYMENT_REQUIRED
            }
            ApiError::Action(ActionError::OutOfBounds(_))
            | ApiError::Action(ActionError::UnknownTool(_))
            | ApiError::Quiz(QuizError::OptionOutOfRange { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Action(_) | ApiError::Goal(_) | ApiError::Quiz(_) => StatusCode::CONFLICT,
        };
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub struct AppState {
    session: SharedSession,
    clock: Mutex<GameClock>,
    broadcaster: broadcast::Sender<String>,
    scenario_name: String,
}

impl AppState {
    /// The clock stays idle until `/api/start`; every tick it runs is broadcast to SSE
    /// subscribers.
    pub fn new(
        session: SharedSession,
        scenario_name: impl Into<String>,
        period: Duration,
    ) -> Self {
        let (broadcaster, _) = broadcast::channel(512);
        let frames = broadcaster.clone();
        let clock = GameClock::new(session.clone(), period, move |summary, session| {
            publish(&frames, summary, session.snapshot());
        });
        Self {
            session,
            clock: Mutex::new(clock),
            broadcaster,
            scenario_name: scenario_name.into(),
        }
    }

    fn clock(&self) -> MutexGuard<'_, GameClock> {
        self.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn clock_running(&self) -> bool {
        self.clock().is_running()
    }

    pub fn shutdown(&self) {
        self.clock().stop();
    }
}

/// Serializes a frame for every SSE subscriber. No subscribers is not an error.
fn publish(
    broadcaster: &broadcast::Sender<String>,
    summary: &TickSummary,
    state: SessionSnapshot,
) {
    let frame = TickFrame {
        summary: summary.clone(),
        state,
    };
    match serde_json::to_string(&frame) {
        Ok(payload) => {
            let _ = broadcaster.send(payload);
        }
        Err(err) => warn!(error = %err, "failed to encode tick frame"),
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/state", get(latest_state))
        .route("/api/start", post(start_game))
        .route("/api/stop", post(stop_game))
        .route("/api/tiles/:x/:y", post(apply_tile))
        .route("/api/goal/claim", post(claim_goal))
        .route("/api/quiz", post(open_quiz).delete(close_quiz))
        .route("/api/quiz/answer", post(answer_quiz))
        .route("/api/events", get(stream_events))
        .with_state(state)
}

pub struct WebServerConfig {
    pub scenario: Scenario,
    pub host: String,
    pub port: u16,
}

pub async fn run(config: WebServerConfig) -> Result<()> {
    let WebServerConfig {
        scenario,
        host,
        port,
    } = config;

    let dispatch = BackgroundDispatch::spawn(Box::new(scenario.content()));
    let session = scenario.build_session(Box::new(dispatch))?.into_shared();
    let period = Duration::from_millis(scenario.tuning.tick_period_ms);
    let state = Arc::new(AppState::new(session, scenario.name.clone(), period));

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("Invalid listen address {host}:{port}"))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(scenario = %scenario.name, %addr, tick_ms = period.as_millis() as u64, "serving city");

    axum::serve(listener, router(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutting down");
}

async fn latest_state(State(state): State<Arc<AppState>>) -> Json<StateEnvelope> {
    let mut session = lock_session(&state.session);
    session.pump_content();
    Json(StateEnvelope {
        scenario: state.scenario_name.clone(),
        state: session.snapshot(),
    })
}

async fn start_game(State(state): State<Arc<AppState>>) -> Json<SessionSnapshot> {
    state.clock().start();
    Json(lock_session(&state.session).snapshot())
}

async fn stop_game(State(state): State<Arc<AppState>>) -> Json<SessionSnapshot> {
    state.clock().stop();
    Json(lock_session(&state.session).snapshot())
}

async fn apply_tile(
    State(state): State<Arc<AppState>>,
    Path((x, y)): Path<(usize, usize)>,
    Json(request): Json<TileRequest>,
) -> Result<Json<TileResponse>, ApiError> {
    let mut session = lock_session(&state.session);
    let outcome = session.apply_tool_str(x, y, &request.tool)?;
    if matches!(outcome, ActionOutcome::Interaction { .. }) {
        session.pump_content();
    }
    Ok(Json(TileResponse {
        outcome,
        state: session.snapshot(),
    }))
}

async fn claim_goal(State(state): State<Arc<AppState>>) -> Result<Json<ClaimResponse>, ApiError> {
    let mut session = lock_session(&state.session);
    let reward = session.claim_goal()?;
    Ok(Json(ClaimResponse {
        reward,
        state: session.snapshot(),
    }))
}

async fn open_quiz(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QuizRequest>,
) -> Json<QuizState> {
    let mut session = lock_session(&state.session);
    session.open_quiz(request.topic);
    session.pump_content();
    Json(session.quiz().clone())
}

async fn close_quiz(State(state): State<Arc<AppState>>) -> Json<QuizState> {
    let mut session = lock_session(&state.session);
    session.close_quiz();
    Json(session.quiz().clone())
}

async fn answer_quiz(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnswerRequest>,
) -> Result<Json<QuizVerdict>, ApiError> {
    let mut session = lock_session(&state.session);
    Ok(Json(session.answer_quiz(request.index)?))
}

async fn stream_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.broadcaster.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(payload) => Some(Ok(Event::default().data(payload))),
        Err(_) => None,
    });
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(2))
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::BuildingKind;
    use crate::scenario::ScenarioLoader;

    fn app() -> Arc<AppState> {
        let scenario = ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"))
            .load("scenarios/forum_city.yaml")
            .unwrap();
        let session = scenario.static_session().unwrap().into_shared();
        let period = Duration::from_millis(scenario.tuning.tick_period_ms);
        Arc::new(AppState::new(session, scenario.name, period))
    }

    #[tokio::test]
    async fn tile_requests_are_rejected_before_start() {
        let state = app();
        let err = apply_tile(
            State(state.clone()),
            Path((0, 0)),
            Json(TileRequest {
                tool: "Road".into(),
            }),
        )
        .await
        .err()
        .unwrap();
        assert!(matches!(err, ApiError::Action(ActionError::NotStarted)));
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn placing_through_the_api_updates_state() {
        let state = app();
        start_game(State(state.clone())).await;
        let Json(response) = apply_tile(
            State(state.clone()),
            Path((14, 14)),
            Json(TileRequest {
                tool: "Residential".into(),
            }),
        )
        .await
        .unwrap();
        assert!(matches!(
            response.outcome,
            ActionOutcome::Placed {
                kind: BuildingKind::Residential,
                ..
            }
        ));
        let tile = response
            .state
            .city
            .tiles
            .iter()
            .find(|tile| tile.x == 14 && tile.y == 14)
            .unwrap();
        assert_eq!(tile.kind, BuildingKind::Residential);

        let err = apply_tile(
            State(state),
            Path((99, 0)),
            Json(TileRequest {
                tool: "Road".into(),
            }),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn quiz_round_trip() {
        let state = app();
        start_game(State(state.clone())).await;
        let Json(quiz) = open_quiz(
            State(state.clone()),
            Json(QuizRequest {
                topic: Some("Subordinate Clauses".into()),
            }),
        )
        .await;
        let QuizState::Ready { question } = quiz else {
            panic!("quiz not ready");
        };
        let Json(verdict) = answer_quiz(
            State(state),
            Json(AnswerRequest {
                index: question.correct_index,
            }),
        )
        .await
        .unwrap();
        assert!(verdict.correct);
        assert!(verdict.reward >= 200);
    }

    #[tokio::test]
    async fn start_and_stop_own_the_clock() {
        let state = app();
        assert!(!state.clock_running());

        let Json(snapshot) = start_game(State(state.clone())).await;
        assert!(snapshot.started);
        assert!(state.clock_running());

        let Json(snapshot) = stop_game(State(state.clone())).await;
        assert!(!snapshot.started);
        assert!(!state.clock_running());

        start_game(State(state.clone())).await;
        assert!(state.clock_running());
        state.shutdown();
        assert!(!state.clock_running());
    }
}
