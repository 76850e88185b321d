//! Minimal REST client helpers for consumers (clients).

use super::endpoints as ep;
use super::*;
use once_cell::sync::Lazy;
use std::time::Duration;

pub use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum RestError {
    #[error("http: {0}")]
    Http(String),
    #[error("status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("serde: {0}")]
    Serde(String),
}

impl RestError {
    pub fn status(&self) -> Option<u16> {
        match self {
            RestError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(60))
        // Bound request duration
        .timeout(Duration::from_secs(10))
        .build()
        .expect("failed to build HTTP client")
});

fn mk_client() -> reqwest::Client {
    HTTP_CLIENT.clone()
}

async fn handle_json<T: for<'de> serde::Deserialize<'de>>(
    res: reqwest::Response,
) -> Result<T, RestError> {
    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        return Err(RestError::Status {
            status: status.as_u16(),
            body,
        });
    }
    res.json::<T>()
        .await
        .map_err(|e| RestError::Serde(e.to_string()))
}

async fn handle_empty(res: reqwest::Response) -> Result<(), RestError> {
    if res.status().is_success() {
        Ok(())
    } else {
        let status = res.status().as_u16();
        let body = res.text().await.unwrap_or_default();
        Err(RestError::Status { status, body })
    }
}

async fn get_json<T: for<'de> serde::Deserialize<'de>>(
    url: String,
    bearer: Option<&str>,
) -> Result<T, RestError> {
    let mut req = mk_client().get(url);
    if let Some(b) = bearer {
        req = req.bearer_auth(b);
    }
    let res = req
        .send()
        .await
        .map_err(|e| RestError::Http(e.to_string()))?;
    handle_json(res).await
}

async fn post_json<B: serde::Serialize, T: for<'de> serde::Deserialize<'de>>(
    url: String,
    bearer: Option<&str>,
    body: &B,
) -> Result<T, RestError> {
    let mut req = mk_client().post(url).json(body);
    if let Some(b) = bearer {
        req = req.bearer_auth(b);
    }
    let res = req
        .send()
        .await
        .map_err(|e| RestError::Http(e.to_string()))?;
    handle_json(res).await
}

async fn post_bare<T: for<'de> serde::Deserialize<'de>>(
    url: String,
    bearer: &str,
) -> Result<T, RestError> {
    let res = mk_client()
        .post(url)
        .bearer_auth(bearer)
        .send()
        .await
        .map_err(|e| RestError::Http(e.to_string()))?;
    handle_json(res).await
}

pub async fn server_version(base: &str) -> Result<VersionDto, RestError> {
    get_json(ep::version(base), None).await
}

pub async fn sign_up(base: &str, req: &SignUpReq) -> Result<AuthResp, RestError> {
    post_json(ep::auth_signup(base), None, req).await
}

pub async fn sign_in(base: &str, req: &SignInReq) -> Result<AuthResp, RestError> {
    post_json(ep::auth_signin(base), None, req).await
}

pub async fn sign_out(base: &str, bearer: &str) -> Result<(), RestError> {
    let res = mk_client()
        .post(ep::auth_signout(base))
        .bearer_auth(bearer)
        .send()
        .await
        .map_err(|e| RestError::Http(e.to_string()))?;
    handle_empty(res).await
}

pub async fn renew_token(base: &str, bearer: &str) -> Result<AuthResp, RestError> {
    post_bare(ep::auth_renew(base), bearer).await
}

pub async fn me(base: &str, bearer: &str) -> Result<UserDto, RestError> {
    get_json(ep::me(base), Some(bearer)).await
}

pub async fn list_households(base: &str, bearer: &str) -> Result<Vec<HouseholdDto>, RestError> {
    get_json(ep::households(base), Some(bearer)).await
}

pub async fn create_household(
    base: &str,
    bearer: &str,
    req: &CreateHouseholdReq,
) -> Result<HouseholdDto, RestError> {
    post_json(ep::households(base), Some(bearer), req).await
}

pub async fn join_household(
    base: &str,
    bearer: &str,
    req: &JoinHouseholdReq,
) -> Result<HouseholdDto, RestError> {
    post_json(ep::households_join(base), Some(bearer), req).await
}

pub async fn household(
    base: &str,
    household_id: &str,
    bearer: &str,
) -> Result<HouseholdDto, RestError> {
    get_json(ep::household(base, household_id), Some(bearer)).await
}

pub async fn list_members(
    base: &str,
    household_id: &str,
    bearer: &str,
) -> Result<Vec<MemberDto>, RestError> {
    get_json(ep::members(base, household_id), Some(bearer)).await
}

pub async fn list_tasks(
    base: &str,
    household_id: &str,
    bearer: &str,
) -> Result<Vec<TaskDto>, RestError> {
    get_json(ep::tasks(base, household_id), Some(bearer)).await
}

pub async fn create_task(
    base: &str,
    household_id: &str,
    bearer: &str,
    req: &CreateTaskReq,
) -> Result<TaskDto, RestError> {
    post_json(ep::tasks(base, household_id), Some(bearer), req).await
}

pub async fn delete_task(
    base: &str,
    household_id: &str,
    task_id: &str,
    bearer: &str,
) -> Result<(), RestError> {
    let res = mk_client()
        .delete(ep::task(base, household_id, task_id))
        .bearer_auth(bearer)
        .send()
        .await
        .map_err(|e| RestError::Http(e.to_string()))?;
    handle_empty(res).await
}

pub async fn create_task_instance(
    base: &str,
    household_id: &str,
    task_id: &str,
    bearer: &str,
    req: &CreateInstanceReq,
) -> Result<InstanceDto, RestError> {
    post_json(
        ep::task_instances(base, household_id, task_id),
        Some(bearer),
        req,
    )
    .await
}

pub async fn list_instances(
    base: &str,
    household_id: &str,
    from: &str,
    to: &str,
    bearer: &str,
) -> Result<Vec<InstanceDto>, RestError> {
    get_json(ep::instances(base, household_id, from, to), Some(bearer)).await
}

pub async fn list_today_instances(
    base: &str,
    household_id: &str,
    bearer: &str,
) -> Result<Vec<InstanceDto>, RestError> {
    get_json(ep::instances_today(base, household_id), Some(bearer)).await
}

pub async fn complete_instance(
    base: &str,
    household_id: &str,
    instance_id: &str,
    bearer: &str,
    req: &CompleteInstanceReq,
) -> Result<InstanceDto, RestError> {
    post_json(
        ep::instance_complete(base, household_id, instance_id),
        Some(bearer),
        req,
    )
    .await
}

pub async fn points(base: &str, household_id: &str, bearer: &str) -> Result<PointsDto, RestError> {
    get_json(ep::points(base, household_id), Some(bearer)).await
}

pub async fn add_points(
    base: &str,
    household_id: &str,
    bearer: &str,
    amount: i64,
) -> Result<PointsDto, RestError> {
    post_json(
        ep::points(base, household_id),
        Some(bearer),
        &AddPointsReq { amount },
    )
    .await
}

pub async fn streak(
    base: &str,
    household_id: &str,
    bearer: &str,
) -> Result<Option<StreakDto>, RestError> {
    get_json(ep::streak(base, household_id), Some(bearer)).await
}

pub async fn increment_streak(
    base: &str,
    household_id: &str,
    bearer: &str,
) -> Result<StreakCountDto, RestError> {
    post_bare(ep::streak_increment(base, household_id), bearer).await
}

pub async fn break_streak(
    base: &str,
    household_id: &str,
    bearer: &str,
) -> Result<Option<StreakDto>, RestError> {
    post_bare(ep::streak_break(base, household_id), bearer).await
}

pub async fn badge_catalog(base: &str, bearer: &str) -> Result<Vec<BadgeDto>, RestError> {
    get_json(ep::badge_catalog(base), Some(bearer)).await
}

pub async fn badges(
    base: &str,
    household_id: &str,
    bearer: &str,
) -> Result<Vec<UserBadgeDto>, RestError> {
    get_json(ep::badges(base, household_id), Some(bearer)).await
}

pub async fn award_badge(
    base: &str,
    household_id: &str,
    bearer: &str,
    badge_id: &str,
) -> Result<AwardBadgeResp, RestError> {
    post_json(
        ep::badges(base, household_id),
        Some(bearer),
        &AwardBadgeReq {
            badge_id: badge_id.to_string(),
        },
    )
    .await
}

pub async fn leaderboard(
    base: &str,
    household_id: &str,
    bearer: &str,
) -> Result<Vec<LeaderboardEntryDto>, RestError> {
    get_json(ep::leaderboard(base, household_id), Some(bearer)).await
}
