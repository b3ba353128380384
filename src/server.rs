// src/server.rs

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::audio::{AudioInfo, SelectionRange, WaveformStyle};
use crate::config::ServerConfig;
use crate::delivery::{content_disposition, download_file_name, Disposition};
use crate::error::AudioError;
use crate::session::{prepare_upload, Session, SessionError, SessionStore};

const INDEX_HTML: &str = include_str!("../assets/index.html");

/// How often idle sessions are swept while serving
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Shared by every handler
#[derive(Clone)]
pub struct AppState {
    sessions: SessionStore,
    waveform_style: Arc<WaveformStyle>,
}

/// Failure of a single user action, rendered as a JSON error body
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<AudioError> for ApiError {
    fn from(error: AudioError) -> Self {
        ApiError::Session(SessionError::Audio(error))
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Session(SessionError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Session(SessionError::NoAudioLoaded) => StatusCode::CONFLICT,
            ApiError::Session(SessionError::Audio(audio)) => match audio {
                AudioError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                AudioError::InvalidRange(_) => StatusCode::UNPROCESSABLE_ENTITY,
                AudioError::EncodeFailed(_)
                | AudioError::FileOpen { .. }
                | AudioError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Session(SessionError::NotFound(_)) => "session_not_found",
            ApiError::Session(SessionError::NoAudioLoaded) => "no_audio_loaded",
            ApiError::Session(SessionError::Audio(audio)) => match audio {
                AudioError::UnsupportedFormat(_) => "unsupported_format",
                AudioError::InvalidRange(_) => "invalid_range",
                AudioError::EncodeFailed(_) => "encode_failed",
                AudioError::FileOpen { .. } | AudioError::Io(_) => "io",
            },
            ApiError::Task(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, kind = self.kind(), "action failed");
        } else {
            warn!(error = %self, kind = self.kind(), "action rejected");
        }

        let body = Json(serde_json::json!({
            "error": self.to_string(),
            "kind": self.kind(),
        }));
        (status, body).into_response()
    }
}

/// What the page needs to redraw after any action
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub audio: Option<AudioInfo>,
    pub selection: Option<SelectionRange>,
}

impl SessionView {
    fn of(session_id: Uuid, session: &Session) -> Self {
        Self {
            session_id,
            audio: session.info(),
            selection: session.selection(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectionUpdate {
    pub start_seconds: f64,
    pub end_seconds: f64,
}

/// Optional selection sent along with a preview or download
///
/// When present it is applied (and clamped) before trimming, so the clip
/// always matches the sliders the user is looking at.
#[derive(Debug, Default, Deserialize)]
pub struct ClipQuery {
    pub start_seconds: Option<f64>,
    pub end_seconds: Option<f64>,
}

impl ClipQuery {
    fn bounds(&self) -> Result<Option<(f64, f64)>, AudioError> {
        match (self.start_seconds, self.end_seconds) {
            (Some(start), Some(end)) => Ok(Some((start, end))),
            (None, None) => Ok(None),
            _ => Err(AudioError::InvalidRange(
                "start_seconds and end_seconds must be given together".to_string(),
            )),
        }
    }
}

/// Build the application router over a fresh session store
pub fn router(config: &ServerConfig) -> Router {
    router_with(SessionStore::with_idle_timeout(config.session_idle_timeout()), config)
}

/// Build the application router over an existing session store
pub fn router_with(sessions: SessionStore, config: &ServerConfig) -> Router {
    let state = AppState {
        sessions,
        waveform_style: Arc::new(config.waveform_style()),
    };

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(session_state).delete(close_session))
        .route("/api/sessions/:id/audio", post(upload_audio))
        .route("/api/sessions/:id/selection", put(update_selection))
        .route("/api/sessions/:id/waveform.svg", get(waveform))
        .route("/api/sessions/:id/preview", get(preview))
        .route("/api/sessions/:id/download", get(download))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes()))
        .with_state(state)
}

/// Bind and serve until Ctrl-C
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let sessions = SessionStore::with_idle_timeout(config.session_idle_timeout());
    let app = router_with(sessions.clone(), &config);

    let listener = tokio::net::TcpListener::bind(config.socket_addr())
        .await
        .context("failed to bind TCP listener")?;
    let actual_addr = listener
        .local_addr()
        .context("failed to read local listener address")?;

    info!(
        address = %actual_addr,
        max_upload_mb = config.max_upload_mb,
        session_idle_minutes = config.session_idle_minutes,
        "audio trimmer listening"
    );

    let sweeper = tokio::spawn(sweep_idle_sessions(sessions));
    let served = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("axum server error");
    sweeper.abort();

    served
}

/// Periodically drop sessions whose tab went away without closing them
async fn sweep_idle_sessions(sessions: SessionStore) {
    let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        ticker.tick().await;
        let evicted = sessions.evict_idle();
        if evicted > 0 {
            info!(evicted, open_sessions = sessions.len(), "idle sessions swept");
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionView>) {
    let session_id = state.sessions.create();
    let view = SessionView {
        session_id,
        audio: None,
        selection: None,
    };
    (StatusCode::CREATED, Json(view))
}

async fn session_state(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let view = state
        .sessions
        .with_session(id, |session| SessionView::of(id, session))?;
    Ok(Json(view))
}

async fn close_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.sessions.remove(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(SessionError::NotFound(id).into())
    }
}

async fn upload_audio(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<SessionView>, ApiError> {
    // Fail fast before decoding for a session that is gone
    state.sessions.with_session(id, |_| ())?;

    // Browsers may send a full path; only the last component is the name
    let file_name = query
        .name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .to_string();
    let size = body.len();
    let raw_bytes: Arc<[u8]> = Arc::from(body.as_ref());
    let style = Arc::clone(&state.waveform_style);

    let upload = {
        let file_name = file_name.clone();
        tokio::task::spawn_blocking(move || prepare_upload(&file_name, raw_bytes, &style)).await??
    };

    let view = state.sessions.with_session(id, |session| {
        let info = session.load(upload);
        info!(
            session = %id,
            file_name = %info.file_name,
            bytes = size,
            duration_seconds = info.duration_seconds,
            sample_rate = info.sample_rate,
            channels = info.channels,
            "audio loaded"
        );
        SessionView::of(id, session)
    })?;

    Ok(Json(view))
}

async fn update_selection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<SelectionUpdate>,
) -> Result<Json<SessionView>, ApiError> {
    let view = state.sessions.with_session(id, |session| {
        session
            .select(update.start_seconds, update.end_seconds)
            .map(|_| SessionView::of(id, session))
    })??;
    Ok(Json(view))
}

async fn waveform(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let svg = state.sessions.with_session(id, |session| {
        session
            .loaded()
            .map(|loaded| Arc::clone(&loaded.waveform_svg))
            .ok_or(SessionError::NoAudioLoaded)
    })??;

    let headers = [
        (header::CONTENT_TYPE, "image/svg+xml"),
        (header::CACHE_CONTROL, "no-store"),
    ];
    Ok((headers, svg.to_string()).into_response())
}

async fn preview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ClipQuery>,
) -> Result<Response, ApiError> {
    deliver(state, id, query, Disposition::Inline).await
}

async fn download(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ClipQuery>,
) -> Result<Response, ApiError> {
    deliver(state, id, query, Disposition::Attachment).await
}

/// Trim the session's current selection and hand the clip over
async fn deliver(
    state: AppState,
    id: Uuid,
    query: ClipQuery,
    disposition: Disposition,
) -> Result<Response, ApiError> {
    let bounds = query.bounds()?;
    let request = state.sessions.with_session(id, |session| {
        if let Some((start, end)) = bounds {
            session.select(start, end)?;
        }
        session.clip_request()
    })??;
    let key = request.key;
    let original_name = request.file_name.clone();
    let range = request.range;
    let was_cached = request.cached.is_some();

    let clip = tokio::task::spawn_blocking(move || request.resolve()).await??;
    state
        .sessions
        .with_session(id, |session| session.remember_clip(key, Arc::clone(&clip)))?;

    info!(
        session = %id,
        start_seconds = range.start_seconds,
        end_seconds = range.end_seconds,
        bytes = clip.bytes.len(),
        cached = was_cached,
        ?disposition,
        "clip delivered"
    );

    let file_name = download_file_name(&original_name, clip.format);
    let headers = [
        (header::CONTENT_TYPE, clip.format.mime_type().to_string()),
        (
            header::CONTENT_DISPOSITION,
            content_disposition(disposition, &file_name),
        ),
        (header::CACHE_CONTROL, "no-store".to_string()),
    ];
    Ok((headers, clip.bytes.clone()).into_response())
}
