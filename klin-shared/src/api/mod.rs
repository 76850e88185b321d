use serde::{Deserialize, Serialize};

use crate::auth::MemberRole;
use crate::domain::Recurrence;

pub mod endpoints;
#[cfg(feature = "rest-client")]
pub mod rest;

pub const API_V1_PREFIX: &str = "/api/v1";

/// Path prefix of every household-scoped route.
pub fn household_scope(household_id: &str) -> String {
    format!("{}/households/{}", API_V1_PREFIX, household_id)
}

// Auth
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUpReq {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInReq {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResp {
    pub token: String,
    pub user: UserDto,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDto {
    pub id: String,
    pub email: String,
    pub name: String,
    pub timezone: String,
    pub created_at: String, // RFC3339 UTC
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionDto {
    pub version: String,
}

// Households
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateHouseholdReq {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinHouseholdReq {
    pub invite_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HouseholdDto {
    pub id: String,
    pub name: String,
    pub invite_code: String,
    pub created_by: String,
    pub created_at: String, // RFC3339 UTC
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberDto {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub role: MemberRole,
    pub joined_at: String, // RFC3339 UTC
}

// Tasks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskReq {
    pub title: String,
    pub recurrence: Recurrence,
    #[serde(default)]
    pub due_day_of_week: Option<i32>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub emoji: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDto {
    pub id: String,
    pub household_id: String,
    pub title: String,
    pub description: Option<String>,
    pub emoji: Option<String>,
    pub recurrence: Recurrence,
    pub due_day_of_week: Option<i32>,
    pub created_by: String,
    pub created_at: String, // RFC3339 UTC
}

/// Body of the materialization endpoint used by an external scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInstanceReq {
    pub due_date: String, // YYYY-MM-DD
    #[serde(default)]
    pub assigned_to: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceDto {
    pub id: String,
    pub task_id: String,
    pub household_id: String,
    pub assigned_to: Option<String>,
    pub due_date: String, // YYYY-MM-DD
    pub completed_at: Option<String>,
    pub completed_by: Option<String>,
    pub photo_url: Option<String>,
    pub points_awarded: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceRangeQuery {
    pub from: String, // YYYY-MM-DD
    pub to: String,   // YYYY-MM-DD
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompleteInstanceReq {
    #[serde(default)]
    pub photo_url: Option<String>,
}

// Gamification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsDto {
    pub user_id: String,
    pub household_id: String,
    pub total_points: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddPointsReq {
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreakDto {
    pub user_id: String,
    pub household_id: String,
    pub current_streak: i32,
    pub is_active: bool,
    pub last_task_completed_at: String,
    pub streak_started_at: String,
    pub broken_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreakCountDto {
    pub current_streak: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgeDto {
    pub id: String,
    pub name: String,
    pub emoji: String,
    pub condition: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserBadgeDto {
    pub badge_id: String,
    pub household_id: String,
    pub earned_at: String, // RFC3339 UTC
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwardBadgeReq {
    pub badge_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwardBadgeResp {
    pub awarded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntryDto {
    pub user_id: String,
    pub user_name: String,
    pub points: i64,
    pub streak: i32,
    pub badges: Vec<String>,
    pub tasks_completed: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn household_scope_prefixes_id() {
        assert_eq!(household_scope("abc-1"), "/api/v1/households/abc-1");
    }

    #[test]
    fn create_task_req_accepts_missing_optionals() {
        let req: CreateTaskReq =
            serde_json::from_str(r#"{"title":"Dishes","recurrence":"daily"}"#).unwrap();
        assert_eq!(req.recurrence, Recurrence::Daily);
        assert!(req.due_day_of_week.is_none());
    }
}
