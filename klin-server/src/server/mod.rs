mod acl;
pub mod auth;
mod config;

use crate::server::auth::AuthCtx;
use crate::storage::{self, StorageError, TaskSpec};
use axum::http::{HeaderName, HeaderValue};
use axum::middleware;
use axum::response::Response as AxumResponse;
use axum::{
    Json, Router,
    extract::{Extension, Path, Query, State},
    http::{Method, StatusCode, header},
    routing::{delete, get, post},
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
pub use config::{AppConfig, ConfigError, GamificationConfig};
use klin_shared::api;
use klin_shared::auth::MemberRole;
use klin_shared::domain::Recurrence;
use klin_shared::path::household_id_from_path;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Span, info_span};
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: storage::Store,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: AppConfig, store: storage::Store) -> Self {
        Self {
            config,
            store,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}

#[derive(Clone, Debug)]
struct ReqId(pub String);

pub fn router(state: AppState) -> Router {
    let private = Router::new()
        .route("/api/v1/auth/signout", post(api_signout))
        .route("/api/v1/auth/renew", post(api_renew))
        .route("/api/v1/me", get(api_me))
        .route("/api/v1/badges", get(api_badge_catalog))
        .route(
            "/api/v1/households",
            get(api_list_households).post(api_create_household),
        )
        .route("/api/v1/households/join", post(api_join_household))
        .route("/api/v1/households/{hid}", get(api_household))
        .route("/api/v1/households/{hid}/members", get(api_members))
        .route(
            "/api/v1/households/{hid}/tasks",
            get(api_list_tasks).post(api_create_task),
        )
        .route("/api/v1/households/{hid}/tasks/{tid}", delete(api_delete_task))
        .route(
            "/api/v1/households/{hid}/tasks/{tid}/instances",
            post(api_create_instance),
        )
        .route("/api/v1/households/{hid}/instances", get(api_list_instances))
        .route(
            "/api/v1/households/{hid}/instances/today",
            get(api_today_instances),
        )
        .route(
            "/api/v1/households/{hid}/instances/{iid}/complete",
            post(api_complete_instance),
        )
        .route(
            "/api/v1/households/{hid}/points",
            get(api_points).post(api_add_points),
        )
        .route("/api/v1/households/{hid}/streak", get(api_streak))
        .route(
            "/api/v1/households/{hid}/streak/increment",
            post(api_increment_streak),
        )
        .route("/api/v1/households/{hid}/streak/break", post(api_break_streak))
        .route(
            "/api/v1/households/{hid}/badges",
            get(api_user_badges).post(api_award_badge),
        )
        .route("/api/v1/households/{hid}/leaderboard", get(api_leaderboard))
        .with_state(state.clone())
        // Layers run bottom-up: bearer check, ACL, then span fields from AuthCtx
        .layer(middleware::from_fn(set_auth_span_fields))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            acl::enforce_acl,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));

    // Trace with request context (method, path, request_id)
    let trace = TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
        let request_id = req
            .extensions()
            .get::<ReqId>()
            .map(|r| r.0.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        info_span!(
            "request",
            method = %req.method(),
            path = %req.uri().path(),
            request_id = %request_id,
            user_id = tracing::field::Empty,
            household_id = tracing::field::Empty,
        )
    });

    let app = Router::new()
        .route("/healthz", get(health))
        .route("/api/v1/version", get(api_version))
        .route("/api/v1/auth/signup", post(api_signup))
        .route("/api/v1/auth/signin", post(api_signin))
        .merge(private)
        .with_state(state.clone())
        .layer(trace)
        .layer(middleware::from_fn(add_security_headers))
        .layer(middleware::from_fn(add_request_id));

    // Optionally add CORS for dev if configured
    if let Some(origin) = &state.config.dev_cors_origin {
        let hv = header::HeaderValue::from_str(origin)
            .unwrap_or(header::HeaderValue::from_static("http://localhost:8081"));
        let cors = CorsLayer::new()
            .allow_origin(hv)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);
        app.layer(cors)
    } else {
        app
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn api_version() -> Json<api::VersionDto> {
    Json(api::VersionDto {
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn add_request_id(
    mut req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Result<AxumResponse, AppError> {
    let hdr = HeaderName::from_static("x-request-id");
    // Use provided x-request-id if present, else generate
    let rid = req
        .headers()
        .get(&hdr)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    req.extensions_mut().insert(ReqId(rid.clone()));
    let mut resp = next.run(req).await;
    if let Ok(hv) = HeaderValue::from_str(&rid) {
        resp.headers_mut().insert(hdr, hv);
    }
    Ok(resp)
}

async fn add_security_headers(
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Result<AxumResponse, AppError> {
    let mut resp = next.run(req).await;

    let headers = resp.headers_mut();
    headers.insert(
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        HeaderName::from_static("x-frame-options"),
        HeaderValue::from_static("DENY"),
    );
    headers.insert(
        HeaderName::from_static("referrer-policy"),
        HeaderValue::from_static("no-referrer"),
    );
    headers.insert(
        HeaderName::from_static("cross-origin-resource-policy"),
        HeaderValue::from_static("same-origin"),
    );
    // Every response is per-user data or a health probe
    headers.insert(
        HeaderName::from_static("cache-control"),
        HeaderValue::from_static("no-store, no-cache, must-revalidate, private"),
    );

    Ok(resp)
}

async fn set_auth_span_fields(
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Result<AxumResponse, AppError> {
    let span = Span::current();
    if let Some(auth) = req.extensions().get::<AuthCtx>() {
        span.record("user_id", tracing::field::display(auth.user_id()));
    }
    if let Some(hid) = household_id_from_path(req.uri().path()) {
        span.record("household_id", tracing::field::display(hid));
    }
    Ok(next.run(req).await)
}

fn rfc3339(dt: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc).to_rfc3339()
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::bad_request(format!("{field} must be YYYY-MM-DD, got {value:?}")))
}

fn user_dto(u: storage::models::User) -> api::UserDto {
    api::UserDto {
        id: u.id,
        email: u.email,
        name: u.name,
        timezone: u.timezone,
        created_at: rfc3339(u.created_at),
    }
}

fn household_dto(h: storage::models::Household) -> api::HouseholdDto {
    api::HouseholdDto {
        id: h.id,
        name: h.name,
        invite_code: h.invite_code,
        created_by: h.created_by,
        created_at: rfc3339(h.created_at),
    }
}

fn task_dto(t: storage::models::Task) -> Result<api::TaskDto, AppError> {
    let recurrence = t
        .recurrence
        .parse::<Recurrence>()
        .map_err(AppError::internal)?;
    Ok(api::TaskDto {
        id: t.id,
        household_id: t.household_id,
        title: t.title,
        description: t.description,
        emoji: t.emoji,
        recurrence,
        due_day_of_week: t.due_day_of_week,
        created_by: t.created_by,
        created_at: rfc3339(t.created_at),
    })
}

fn instance_dto(i: storage::models::TaskInstance) -> api::InstanceDto {
    api::InstanceDto {
        id: i.id,
        task_id: i.task_id,
        household_id: i.household_id,
        assigned_to: i.assigned_to,
        due_date: i.due_date.format("%Y-%m-%d").to_string(),
        completed_at: i.completed_at.map(rfc3339),
        completed_by: i.completed_by,
        photo_url: i.photo_url,
        points_awarded: i.points_awarded,
    }
}

fn streak_dto(s: storage::models::UserStreak) -> api::StreakDto {
    api::StreakDto {
        user_id: s.user_id,
        household_id: s.household_id,
        current_streak: s.current_streak,
        is_active: s.is_active,
        last_task_completed_at: rfc3339(s.last_task_completed_at),
        streak_started_at: rfc3339(s.streak_started_at),
        broken_at: s.broken_at.map(rfc3339),
    }
}

// Auth

async fn api_signup(
    State(state): State<AppState>,
    Json(body): Json<api::SignUpReq>,
) -> Result<Json<api::AuthResp>, AppError> {
    let email = body.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(AppError::bad_request("invalid email address"));
    }
    if body.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    let name = body.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::bad_request("name must not be empty"));
    }
    let timezone = body.timezone.as_deref().unwrap_or("UTC").trim().to_string();
    if timezone.parse::<Tz>().is_err() {
        return Err(AppError::bad_request(format!("unknown timezone: {timezone}")));
    }

    let cost = state.config.bcrypt_cost();
    let password = body.password;
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(AppError::internal)?
        .map_err(|e| {
            tracing::error!(error=%e, "signup: bcrypt hash failed");
            AppError::internal(e)
        })?;

    let user = state
        .store
        .create_user(&email, &name, &hash, &timezone)
        .await?;
    tracing::info!(user_id = %user.id, "signup: created user");
    let token = auth::issue_token(&state, &user.id, &user.email).await?;
    Ok(Json(api::AuthResp {
        token,
        user: user_dto(user),
    }))
}

async fn api_signin(
    State(state): State<AppState>,
    Json(body): Json<api::SignInReq>,
) -> Result<Json<api::AuthResp>, AppError> {
    let email = body.email.trim().to_lowercase();
    let user = state
        .store
        .get_user_by_email(&email)
        .await?
        .ok_or_else(|| {
            tracing::warn!(email = %email, "signin: unknown email");
            AppError::unauthorized()
        })?;
    let password = body.password;
    let hash = user.password_hash.clone();
    let ok = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(AppError::internal)?
        .map_err(|e| {
            tracing::error!(email = %email, error=%e, "signin: bcrypt verify failed");
            AppError::internal(e)
        })?;
    if !ok {
        tracing::warn!(email = %email, "signin: invalid password");
        return Err(AppError::unauthorized());
    }
    let token = auth::issue_token(&state, &user.id, &user.email).await?;
    Ok(Json(api::AuthResp {
        token,
        user: user_dto(user),
    }))
}

async fn api_signout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
) -> Result<StatusCode, AppError> {
    state.store.delete_session(auth.jti()).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn api_renew(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
) -> Result<Json<api::AuthResp>, AppError> {
    let user = session_user(&state, &auth).await?;
    let token = auth::issue_token(&state, &user.id, &user.email).await?;
    state.store.delete_session(auth.jti()).await?;
    Ok(Json(api::AuthResp {
        token,
        user: user_dto(user),
    }))
}

async fn api_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
) -> Result<Json<api::UserDto>, AppError> {
    Ok(Json(user_dto(session_user(&state, &auth).await?)))
}

async fn session_user(state: &AppState, auth: &AuthCtx) -> Result<storage::models::User, AppError> {
    state.store.get_user(auth.user_id()).await?.ok_or_else(|| {
        tracing::warn!(user_id = %auth.user_id(), "session user no longer exists");
        AppError::unauthorized()
    })
}

// Households

async fn api_list_households(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
) -> Result<Json<Vec<api::HouseholdDto>>, AppError> {
    let rows = state.store.list_households_for_user(auth.user_id()).await?;
    Ok(Json(rows.into_iter().map(household_dto).collect()))
}

async fn api_create_household(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Json(body): Json<api::CreateHouseholdReq>,
) -> Result<(StatusCode, Json<api::HouseholdDto>), AppError> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("household name must not be empty"));
    }
    let h = state.store.create_household(auth.user_id(), name).await?;
    tracing::info!(household_id = %h.id, "household created");
    Ok((StatusCode::CREATED, Json(household_dto(h))))
}

async fn api_join_household(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Json(body): Json<api::JoinHouseholdReq>,
) -> Result<Json<api::HouseholdDto>, AppError> {
    let h = state
        .store
        .join_household(auth.user_id(), &body.invite_code)
        .await?;
    tracing::info!(household_id = %h.id, "household joined");
    Ok(Json(household_dto(h)))
}

async fn api_household(
    State(state): State<AppState>,
    Path(hid): Path<String>,
) -> Result<Json<api::HouseholdDto>, AppError> {
    let h = state
        .store
        .get_household(&hid)
        .await?
        .ok_or_else(|| AppError::not_found(format!("household not found: {hid}")))?;
    Ok(Json(household_dto(h)))
}

async fn api_members(
    State(state): State<AppState>,
    Path(hid): Path<String>,
) -> Result<Json<Vec<api::MemberDto>>, AppError> {
    let rows = state.store.list_members(&hid).await?;
    let mut items = Vec::with_capacity(rows.len());
    for (m, u) in rows {
        items.push(api::MemberDto {
            user_id: u.id,
            name: u.name,
            email: u.email,
            role: m.role.parse::<MemberRole>().map_err(AppError::internal)?,
            joined_at: rfc3339(m.joined_at),
        });
    }
    Ok(Json(items))
}

// Task templates

async fn api_list_tasks(
    State(state): State<AppState>,
    Path(hid): Path<String>,
) -> Result<Json<Vec<api::TaskDto>>, AppError> {
    let rows = state.store.list_tasks(&hid).await?;
    let items = rows
        .into_iter()
        .map(task_dto)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(items))
}

async fn api_create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(hid): Path<String>,
    Json(body): Json<api::CreateTaskReq>,
) -> Result<(StatusCode, Json<api::TaskDto>), AppError> {
    let spec = TaskSpec {
        title: body.title,
        recurrence: body.recurrence,
        due_day_of_week: body.due_day_of_week,
        description: body.description,
        emoji: body.emoji,
    };
    let t = state.store.create_task(&hid, auth.user_id(), spec).await?;
    Ok((StatusCode::CREATED, Json(task_dto(t)?)))
}

async fn api_delete_task(
    State(state): State<AppState>,
    Path((hid, tid)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    if state.store.delete_task(&hid, &tid).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found(format!("task not found: {tid}")))
    }
}

// Task instances

async fn api_create_instance(
    State(state): State<AppState>,
    Path((hid, tid)): Path<(String, String)>,
    Json(body): Json<api::CreateInstanceReq>,
) -> Result<Json<api::InstanceDto>, AppError> {
    let due = parse_date("due_date", &body.due_date)?;
    let inst = state
        .store
        .create_task_instance(&hid, &tid, due, body.assigned_to.as_deref())
        .await?;
    Ok(Json(instance_dto(inst)))
}

async fn api_list_instances(
    State(state): State<AppState>,
    Path(hid): Path<String>,
    Query(q): Query<api::InstanceRangeQuery>,
) -> Result<Json<Vec<api::InstanceDto>>, AppError> {
    let from = parse_date("from", &q.from)?;
    let to = parse_date("to", &q.to)?;
    let rows = state.store.list_task_instances(&hid, from, to).await?;
    Ok(Json(rows.into_iter().map(instance_dto).collect()))
}

async fn api_today_instances(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(hid): Path<String>,
) -> Result<Json<Vec<api::InstanceDto>>, AppError> {
    let user = session_user(&state, &auth).await?;
    let tz = user.timezone.parse::<Tz>().unwrap_or_else(|_| {
        tracing::warn!(timezone = %user.timezone, "today: unknown timezone; using UTC");
        Tz::UTC
    });
    let today = Utc::now().with_timezone(&tz).date_naive();
    let rows = state.store.list_task_instances(&hid, today, today).await?;
    Ok(Json(rows.into_iter().map(instance_dto).collect()))
}

async fn api_complete_instance(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path((hid, iid)): Path<(String, String)>,
    Json(body): Json<api::CompleteInstanceReq>,
) -> Result<Json<api::InstanceDto>, AppError> {
    let inst = state
        .store
        .complete_task_instance(
            &hid,
            &iid,
            auth.user_id(),
            body.photo_url.as_deref(),
            state.config.gamification.points_per_task,
        )
        .await?;
    Ok(Json(instance_dto(inst)))
}

// Gamification

async fn api_points(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(hid): Path<String>,
) -> Result<Json<api::PointsDto>, AppError> {
    let total = state.store.get_points(&hid, auth.user_id()).await?;
    Ok(Json(api::PointsDto {
        user_id: auth.user_id().to_string(),
        household_id: hid,
        total_points: total,
    }))
}

async fn api_add_points(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(hid): Path<String>,
    Json(body): Json<api::AddPointsReq>,
) -> Result<Json<api::PointsDto>, AppError> {
    let total = state
        .store
        .add_points(&hid, auth.user_id(), body.amount)
        .await?;
    Ok(Json(api::PointsDto {
        user_id: auth.user_id().to_string(),
        household_id: hid,
        total_points: total,
    }))
}

async fn api_streak(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(hid): Path<String>,
) -> Result<Json<Option<api::StreakDto>>, AppError> {
    let s = state.store.get_streak(&hid, auth.user_id()).await?;
    Ok(Json(s.map(streak_dto)))
}

async fn api_increment_streak(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(hid): Path<String>,
) -> Result<Json<api::StreakCountDto>, AppError> {
    let n = state.store.increment_streak(&hid, auth.user_id()).await?;
    Ok(Json(api::StreakCountDto { current_streak: n }))
}

async fn api_break_streak(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(hid): Path<String>,
) -> Result<Json<Option<api::StreakDto>>, AppError> {
    let s = state.store.break_streak(&hid, auth.user_id()).await?;
    Ok(Json(s.map(streak_dto)))
}

async fn api_badge_catalog(
    State(state): State<AppState>,
) -> Result<Json<Vec<api::BadgeDto>>, AppError> {
    let rows = state.store.list_badges().await?;
    let items = rows
        .into_iter()
        .map(|b| api::BadgeDto {
            id: b.id,
            name: b.name,
            emoji: b.emoji,
            condition: b.condition,
            description: b.description,
        })
        .collect();
    Ok(Json(items))
}

async fn api_user_badges(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(hid): Path<String>,
) -> Result<Json<Vec<api::UserBadgeDto>>, AppError> {
    let rows = state.store.list_user_badges(&hid, auth.user_id()).await?;
    let items = rows
        .into_iter()
        .map(|b| api::UserBadgeDto {
            badge_id: b.badge_id,
            household_id: b.household_id,
            earned_at: rfc3339(b.earned_at),
        })
        .collect();
    Ok(Json(items))
}

async fn api_award_badge(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(hid): Path<String>,
    Json(body): Json<api::AwardBadgeReq>,
) -> Result<Json<api::AwardBadgeResp>, AppError> {
    let awarded = state
        .store
        .award_badge(&hid, auth.user_id(), &body.badge_id)
        .await?;
    if awarded {
        tracing::info!(badge_id = %body.badge_id, household_id = %hid, "badge awarded");
    }
    Ok(Json(api::AwardBadgeResp { awarded }))
}

async fn api_leaderboard(
    State(state): State<AppState>,
    Path(hid): Path<String>,
) -> Result<Json<Vec<api::LeaderboardEntryDto>>, AppError> {
    let rows = state.store.leaderboard(&hid).await?;
    let items = rows
        .into_iter()
        .map(|r| api::LeaderboardEntryDto {
            user_id: r.user_id,
            user_name: r.user_name,
            points: r.points,
            streak: r.streak,
            badges: r.badges,
            tasks_completed: r.tasks_completed,
        })
        .collect();
    Ok(Json(items))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unauthorized,
    Forbidden,
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl AppError {
    fn bad_request<T: Into<String>>(msg: T) -> Self {
        Self::BadRequest(msg.into())
    }
    fn unauthorized() -> Self {
        Self::Unauthorized
    }
    fn forbidden() -> Self {
        Self::Forbidden
    }
    fn not_found<T: Into<String>>(msg: T) -> Self {
        Self::NotFound(msg.into())
    }
    fn internal<E: std::fmt::Display>(e: E) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::InvalidInput(m) => AppError::BadRequest(m),
            StorageError::NotFound(m) => AppError::NotFound(m),
            StorageError::Conflict(m) => AppError::Conflict(m),
            other => AppError::internal(other),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, msg, kind, detail) = match self {
            AppError::BadRequest(m) => (StatusCode::BAD_REQUEST, m, "bad_request", None),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized".into(),
                "unauthorized",
                None,
            ),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden".into(), "forbidden", None),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, m, "not_found", None),
            AppError::Conflict(m) => (StatusCode::CONFLICT, m, "conflict", None),
            // Do not leak internal error details to clients, but log them
            AppError::Internal(m) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".into(),
                "internal",
                Some(m),
            ),
        };
        if let Some(detail) = detail {
            tracing::error!(status = %status, kind = kind, message = %msg, detail = %detail, "request failed");
        } else {
            tracing::warn!(status = %status, kind = kind, message = %msg, "request failed");
        }
        let body = axum::Json(ErrorBody { error: msg });
        (status, body).into_response()
    }
}
