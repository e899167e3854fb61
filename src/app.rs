use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Query, State, rejection::QueryRejection},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, TryLockError};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::country::{CountryRegistry, IsoCountryRegistry};
use crate::downloader::{to_csv, to_xlsx};
use crate::error::DashboardError;
use crate::graph::{GraphOptions, render_chart};
use crate::pipeline::{Selection, Session};
use crate::presentation::{DashboardPayload, build_payload};
use crate::validate::PipelineKind;

pub const SESSION_COOKIE: &str = "dashboard_session";

type SharedSession = Arc<Mutex<Session>>;

/// Shared server state: one [`Session`] per browser
///
/// The map lock only covers lookup and pruning. Each session has its own
/// lock, held by the blocking task that parses or recomputes for it.
pub struct AppState {
    sessions: Mutex<HashMap<Uuid, SharedSession>>,
    registry: Box<dyn CountryRegistry>,
    config: ServerConfig,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self::with_registry(config, Box::new(IsoCountryRegistry))
    }

    pub fn with_registry(config: ServerConfig, registry: Box<dyn CountryRegistry>) -> Self {
        AppState {
            sessions: Mutex::new(HashMap::new()),
            registry,
            config,
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// The caller's session, created if needed, plus the jar carrying its cookie
    ///
    /// Expired sessions are dropped first; a session busy in another request
    /// is never expired.
    fn session(&self, jar: CookieJar) -> (CookieJar, SharedSession) {
        let now = Utc::now();
        let ttl = self.config.session_ttl();

        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|_, session| match session.try_lock() {
            Ok(session) => !session.is_expired(now, ttl),
            Err(TryLockError::WouldBlock) => true,
            Err(TryLockError::Poisoned(poisoned)) => !poisoned.into_inner().is_expired(now, ttl),
        });
        if sessions.len() < before {
            info!("dropped {} idle session(s)", before - sessions.len());
        }

        let id = jar
            .get(SESSION_COOKIE)
            .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
            .filter(|id| sessions.contains_key(id))
            .unwrap_or_else(Uuid::new_v4);
        let session = Arc::clone(sessions.entry(id).or_default());
        drop(sessions);

        let cookie = Cookie::build((SESSION_COOKIE, id.to_string()))
            .path("/")
            .http_only(true);
        (jar.add(cookie), session)
    }

    /// Run `f` against the caller's session on the blocking pool
    ///
    /// Parsing and pipeline runs are CPU-bound, so they stay off the async
    /// workers. The returned jar carries the session cookie either way.
    async fn with_session<T, F>(self: &Arc<Self>, jar: CookieJar, f: F) -> (CookieJar, Result<T, ApiError>)
    where
        T: Send + 'static,
        F: FnOnce(&mut Session, &dyn CountryRegistry) -> Result<T, ApiError> + Send + 'static,
    {
        let (jar, session) = self.session(jar);
        let state = Arc::clone(self);

        let result = tokio::task::spawn_blocking(move || {
            let mut session = session.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut *session, state.registry.as_ref())
        })
        .await
        .unwrap_or_else(|e| Err(ApiError::internal(format!("request task failed: {}", e))));

        (jar, result)
    }

    fn graph_options(&self) -> GraphOptions {
        GraphOptions {
            width: self.config.chart_width,
            height: self.config.chart_height,
        }
    }
}

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    message: Option<String>,
}

#[derive(Serialize)]
struct UploadResponse {
    status: String,
    sheets: Vec<String>,
}

#[derive(Deserialize)]
struct OptionsQuery {
    sheet: String,
    #[serde(default)]
    pipeline: PipelineKind,
}

#[derive(Deserialize)]
struct ChartQuery {
    sheet: String,
    #[serde(default)]
    pipeline: PipelineKind,
    provider: String,
    year: i32,
    #[serde(default)]
    chart: usize,
}

#[derive(Deserialize, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
enum ExportFormat {
    #[default]
    Csv,
    Xlsx,
}

#[derive(Deserialize)]
struct ExportQuery {
    sheet: String,
    #[serde(default)]
    pipeline: PipelineKind,
    provider: String,
    year: i32,
    table: Option<usize>,
    #[serde(default)]
    format: ExportFormat,
}

/// Error body sent back to the browser
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<DashboardError> for ApiError {
    fn from(err: DashboardError) -> Self {
        let status = match &err {
            DashboardError::Parse(_) => StatusCode::BAD_REQUEST,
            DashboardError::Schema(_) | DashboardError::Overflow(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            DashboardError::NoWorkbook => StatusCode::CONFLICT,
            DashboardError::UnknownSheet(_) => StatusCode::NOT_FOUND,
        };
        warn!("request failed: {}", err);
        ApiError {
            status,
            message: err.to_string(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(StatusResponse {
                status: "error".to_string(),
                message: Some(self.message),
            }),
        )
            .into_response()
    }
}

/// Build the router; separate from [`run`] so tests can drive it directly
pub fn router(state: Arc<AppState>) -> Router {
    let max_upload = state.config.max_upload_bytes();
    let static_dir = state.config.static_dir.clone();

    Router::new()
        .route("/", get(serve_landing))
        .route("/api/upload", post(upload_workbook))
        .route("/api/sheets", get(list_sheets))
        .route("/api/options", get(sheet_options))
        .route("/api/dashboard", get(dashboard))
        .route("/api/chart", get(chart))
        .route("/api/export", get(export))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(DefaultBodyLimit::max(max_upload))
        .with_state(state)
}

pub async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config.bind_addr()?;
    let state = Arc::new(AppState::new(config));
    let app = router(state);

    let listener = TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_landing() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

async fn upload_workbook(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut multipart: Multipart,
) -> Response {
    let mut file_data = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return ApiError::bad_request(e.to_string()).into_response(),
        };

        if field.name() == Some("workbook") {
            match field.bytes().await {
                Ok(bytes) => file_data = Some(bytes),
                Err(e) => return ApiError::bad_request(e.to_string()).into_response(),
            }
        }
    }

    let Some(bytes) = file_data else {
        return ApiError::bad_request("No file data received").into_response();
    };
    info!("upload received: {} bytes", bytes.len());

    let (jar, result) = state
        .with_session(jar, move |session, _| {
            session
                .upload(&bytes)
                .map_err(|e| ApiError::from(DashboardError::from(e)))
        })
        .await;

    match result {
        Ok(sheets) => (
            jar,
            Json(UploadResponse {
                status: "ok".to_string(),
                sheets,
            }),
        )
            .into_response(),
        Err(e) => (jar, e).into_response(),
    }
}

async fn list_sheets(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let (jar, result) = state
        .with_session(jar, |session, _| {
            session
                .workbook()
                .map(|workbook| workbook.sheet_names())
                .ok_or_else(|| ApiError::from(DashboardError::NoWorkbook))
        })
        .await;

    match result {
        Ok(sheets) => (
            jar,
            Json(UploadResponse {
                status: "ok".to_string(),
                sheets,
            }),
        )
            .into_response(),
        Err(e) => (jar, e).into_response(),
    }
}

async fn sheet_options(
    query: Result<Query<OptionsQuery>, QueryRejection>,
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return (jar, ApiError::from(rejection)).into_response(),
    };

    let (jar, result) = state
        .with_session(jar, move |session, registry| {
            Ok(session.options(&query.sheet, query.pipeline, registry)?)
        })
        .await;

    match result {
        Ok(options) => (jar, Json(options)).into_response(),
        Err(e) => (jar, e).into_response(),
    }
}

// Recompute the dashboard for `selection` and hand the payload to `finish`,
// all on the blocking pool
async fn with_payload<T, F>(
    state: &Arc<AppState>,
    jar: CookieJar,
    selection: Selection,
    finish: F,
) -> (CookieJar, Result<T, ApiError>)
where
    T: Send + 'static,
    F: FnOnce(DashboardPayload) -> Result<T, ApiError> + Send + 'static,
{
    state
        .with_session(jar, move |session, registry| {
            let report = session.run(selection, registry)?;
            finish(build_payload(&report))
        })
        .await
}

async fn dashboard(
    selection: Result<Query<Selection>, QueryRejection>,
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Response {
    let Query(selection) = match selection {
        Ok(selection) => selection,
        Err(rejection) => return (jar, ApiError::from(rejection)).into_response(),
    };

    match with_payload(&state, jar, selection, |payload| Ok(payload)).await {
        (jar, Ok(payload)) => (jar, Json(payload)).into_response(),
        (jar, Err(e)) => (jar, e).into_response(),
    }
}

async fn chart(
    query: Result<Query<ChartQuery>, QueryRejection>,
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return (jar, ApiError::from(rejection)).into_response(),
    };
    let selection = Selection {
        sheet: query.sheet,
        pipeline: query.pipeline,
        provider: query.provider,
        year: query.year,
    };
    let index = query.chart;
    let options = state.graph_options();

    let (jar, svg) = with_payload(&state, jar, selection, move |payload| {
        let spec = payload
            .charts
            .get(index)
            .ok_or_else(|| ApiError::not_found(format!("no chart {}", index)))?;
        render_chart(spec, &options)
            .map_err(|e| ApiError::internal(format!("Failed to render chart: {}", e)))
    })
    .await;

    match svg {
        Ok(svg) => (jar, [(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response(),
        Err(e) => (jar, e).into_response(),
    }
}

struct Export {
    body: Vec<u8>,
    content_type: &'static str,
    filename: String,
}

async fn export(
    query: Result<Query<ExportQuery>, QueryRejection>,
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return (jar, ApiError::from(rejection)).into_response(),
    };
    let selection = Selection {
        sheet: query.sheet,
        pipeline: query.pipeline,
        provider: query.provider,
        year: query.year,
    };
    let (table, format) = (query.table, query.format);

    let (jar, exported) = with_payload(&state, jar, selection, move |payload| {
        let tables = match table {
            Some(idx) => vec![payload
                .tables
                .get(idx)
                .cloned()
                .ok_or_else(|| ApiError::not_found(format!("no table {}", idx)))?],
            None => payload.tables.clone(),
        };

        let stem = format!("{}-{}-{}", payload.pipeline, payload.filter.provider, payload.filter.year);
        match format {
            ExportFormat::Csv => {
                let first = tables
                    .first()
                    .ok_or_else(|| ApiError::internal("nothing to export"))?;
                let csv = to_csv(first).map_err(|e| ApiError::internal(e.to_string()))?;
                Ok(Export {
                    body: csv.into_bytes(),
                    content_type: "text/csv",
                    filename: format!("{}.csv", stem),
                })
            }
            ExportFormat::Xlsx => {
                let bytes = to_xlsx(&tables).map_err(|e| ApiError::internal(e.to_string()))?;
                Ok(Export {
                    body: bytes,
                    content_type: "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                    filename: format!("{}.xlsx", stem),
                })
            }
        }
    })
    .await;

    match exported {
        Ok(export) => (
            jar,
            [
                (header::CONTENT_TYPE, export.content_type.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", export.filename.replace('"', "")),
                ),
            ],
            export.body,
        )
            .into_response(),
        Err(e) => (jar, e).into_response(),
    }
}
