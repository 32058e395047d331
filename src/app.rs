#![cfg(not(tarpaulin_include))]

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use log::{error, info, warn};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::aggregator::aggregate;
use crate::config::TrackerConfig;
use crate::error::{Result, TrackerError};
use crate::history::collect_history;
use crate::mailer::Mailer;
use crate::matcher::IdentityMatcher;
use crate::report::{unmatched_buckets, user_summaries};
use crate::roster::Identity;
use crate::store::{NewEntry, ProfileUpdate, SharedWorkbook, Workbook, save_snapshot};

pub struct AppState {
    config: TrackerConfig,
    matcher: IdentityMatcher,
    store: SharedWorkbook,
}

#[derive(Deserialize)]
struct CredentialRequest {
    name: String,
    #[serde(rename = "internId")]
    intern_id: String,
}

#[derive(Deserialize)]
struct LogRequest {
    name: String,
    #[serde(rename = "internId")]
    intern_id: String,
    #[serde(flatten)]
    entry: NewEntry,
}

#[derive(Deserialize)]
struct ProfileRequest {
    #[serde(rename = "internId")]
    intern_id: String,
    #[serde(flatten)]
    update: ProfileUpdate,
}

#[derive(Deserialize)]
struct ProgressRequest {
    name: String,
    #[serde(rename = "internId")]
    intern_id: String,
    progress: serde_json::Value,
}

#[derive(Deserialize)]
struct NameQuery {
    name: String,
}

#[derive(Deserialize)]
struct SendIdRequest {
    email: String,
}

struct ApiError(TrackerError);

impl From<TrackerError> for ApiError {
    fn from(e: TrackerError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            TrackerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            TrackerError::NotFound(_) => StatusCode::NOT_FOUND,
            TrackerError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            TrackerError::Busy => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("request failed: {}", self.0);
        }
        (
            status,
            Json(serde_json::json!({ "success": false, "error": self.0.to_string() })),
        )
            .into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

pub async fn run(config: TrackerConfig) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let workbook = Workbook::open(&config)?;
    let lock_wait = Duration::from_millis(config.lock_wait_ms);
    let listen_addr = config.listen_addr.clone();

    // Setup app state
    let app_state = Arc::new(AppState {
        matcher: IdentityMatcher::new(config.thresholds),
        store: SharedWorkbook::new(workbook, lock_wait),
        config,
    });

    // Build router
    let app = Router::new()
        .route("/api/users", get(get_users))
        .route("/api/unmatched", get(get_unmatched))
        .route("/api/history", post(get_history))
        .route("/api/log", post(submit_log))
        .route("/api/profile", get(get_profile).post(save_profile))
        .route("/api/progress", get(get_progress).post(save_progress))
        .route("/api/groups", get(get_groups))
        .route("/api/send-id", post(send_intern_id))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    // Start server
    let listener = TcpListener::bind(&listen_addr).await?;
    info!("Listening on http://{}", listen_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

// The store lock may sleep while waiting, keep it off the async workers
async fn blocking<T, F>(state: Arc<AppState>, f: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&AppState) -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| ApiError(TrackerError::Io(std::io::Error::other(e.to_string()))))?
        .map_err(ApiError)
}

fn authorize(state: &AppState, workbook: &Workbook, name: &str, credential: &str) -> Result<Identity> {
    let roster = workbook.roster(&state.config.roster);
    roster
        .authorize(
            &state.matcher,
            name,
            credential,
            state.config.admin_credential.as_deref(),
        )
        .cloned()
        .ok_or_else(|| TrackerError::Unauthorized("Invalid Intern ID".to_string()))
}

fn persist(state: &AppState, workbook: &Workbook) -> Result<()> {
    save_snapshot(workbook, &state.config.snapshot)
}

async fn get_users(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let summaries = blocking(state, |s| {
        s.store.read(|w| -> Result<_> {
            let roster = w.roster(&s.config.roster);
            let sources = w.all_source_rows(&s.config)?;
            let stats = aggregate(&sources, &roster, &s.matcher);
            let photos = w.profile_photos(&s.config.profile_sheet);
            Ok(user_summaries(&roster, &stats, &photos))
        })?
    })
    .await?;
    Ok(Json(summaries))
}

async fn get_unmatched(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let buckets = blocking(state, |s| {
        s.store.read(|w| -> Result<_> {
            let roster = w.roster(&s.config.roster);
            let sources = w.all_source_rows(&s.config)?;
            let stats = aggregate(&sources, &roster, &s.matcher);
            Ok(unmatched_buckets(&roster, &stats))
        })?
    })
    .await?;
    Ok(Json(buckets))
}

async fn get_history(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CredentialRequest>,
) -> ApiResult<impl IntoResponse> {
    let records = blocking(state, move |s| {
        s.store.read(|w| -> Result<_> {
            let target = authorize(s, w, &req.name, &req.intern_id)?;
            let roster = w.roster(&s.config.roster);
            let sources = w.all_source_rows(&s.config)?;
            Ok(collect_history(&sources, &roster, &s.matcher, &target))
        })?
    })
    .await?;
    Ok(Json(records))
}

async fn submit_log(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LogRequest>,
) -> ApiResult<impl IntoResponse> {
    blocking(state, move |s| {
        s.store.update(
            |w| {
                let author = authorize(s, w, &req.name, &req.intern_id)?;
                w.append_entry(&s.config.log_sheet, &author, &req.entry)
            },
            |w| persist(s, w),
        )
    })
    .await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NameQuery>,
) -> ApiResult<impl IntoResponse> {
    let profile = blocking(state, move |s| {
        s.store
            .read(|w| w.profile(&s.config.profile_sheet, &s.matcher, &query.name))
    })
    .await?;
    Ok(Json(profile.map(|p| serde_json::json!(p)).unwrap_or_else(|| serde_json::json!({}))))
}

async fn save_profile(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProfileRequest>,
) -> ApiResult<impl IntoResponse> {
    let photo = blocking(state, move |s| {
        s.store.update(
            |w| {
                let who = authorize(s, w, &req.update.name, &req.intern_id)?;
                let update = ProfileUpdate {
                    name: who.canonical_name,
                    ..req.update
                };
                Ok(w.upsert_profile(&s.config.profile_sheet, &update))
            },
            |w| persist(s, w),
        )
    })
    .await?;
    Ok(Json(serde_json::json!({ "success": true, "photo": photo })))
}

async fn get_progress(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NameQuery>,
) -> ApiResult<impl IntoResponse> {
    let progress = blocking(state, move |s| {
        s.store
            .read(|w| w.course_progress(&s.config.course_sheet, &query.name))
    })
    .await?;
    Ok(Json(progress))
}

async fn save_progress(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProgressRequest>,
) -> ApiResult<impl IntoResponse> {
    blocking(state, move |s| {
        s.store.update(
            |w| {
                let who = authorize(s, w, &req.name, &req.intern_id)?;
                w.save_course_progress(&s.config.course_sheet, &who.canonical_name, &req.progress)
            },
            |w| persist(s, w),
        )
    })
    .await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

async fn get_groups(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let groups = blocking(state, |s| {
        s.store.read(|w| w.monitor_groups(&s.config.groups_sheet))
    })
    .await?;
    Ok(Json(groups))
}

async fn send_intern_id(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendIdRequest>,
) -> ApiResult<impl IntoResponse> {
    blocking(state, move |s| {
        let identity = s
            .store
            .read(|w| w.roster(&s.config.roster).find_by_email(&req.email).cloned())?
            .ok_or_else(|| TrackerError::NotFound("Email not found in records".to_string()))?;

        let Some(smtp) = &s.config.smtp else {
            warn!("send-id requested but no SMTP settings are configured");
            return Err(TrackerError::Config("mail is not configured".to_string()));
        };

        let mailer = Mailer::new(smtp).map_err(|e| TrackerError::Config(e.to_string()))?;
        mailer
            .send_credential(&identity)
            .map_err(|e| TrackerError::Io(std::io::Error::other(e.to_string())))
    })
    .await?;
    Ok(Json(serde_json::json!({ "success": true })))
}
