use crate::storage::schema::{
    badges, household_members, households, sessions, task_instances, tasks, user_badges,
    user_points, user_streaks, users,
};
use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub timezone: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub id: &'a str,
    pub email: &'a str,
    pub name: &'a str,
    pub password_hash: &'a str,
    pub timezone: &'a str,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = sessions)]
#[diesel(primary_key(jti))]
pub struct Session {
    pub jti: String,
    pub user_id: String,
    pub issued_at: NaiveDateTime,
    pub last_used_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = sessions)]
pub struct NewSession<'a> {
    pub jti: &'a str,
    pub user_id: &'a str,
    pub issued_at: NaiveDateTime,
    pub last_used_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = households)]
pub struct Household {
    pub id: String,
    pub name: String,
    pub invite_code: String,
    pub created_by: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = households)]
pub struct NewHousehold<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub invite_code: &'a str,
    pub created_by: &'a str,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = household_members)]
pub struct HouseholdMember {
    pub household_id: String,
    pub user_id: String,
    pub role: String,
    pub joined_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = household_members)]
pub struct NewHouseholdMember<'a> {
    pub household_id: &'a str,
    pub user_id: &'a str,
    pub role: &'a str,
    pub joined_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = tasks)]
pub struct Task {
    pub id: String,
    pub household_id: String,
    pub title: String,
    pub description: Option<String>,
    pub emoji: Option<String>,
    pub recurrence: String,
    pub due_day_of_week: Option<i32>,
    pub created_by: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = tasks)]
pub struct NewTask<'a> {
    pub id: &'a str,
    pub household_id: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub emoji: Option<&'a str>,
    pub recurrence: &'a str,
    pub due_day_of_week: Option<i32>,
    pub created_by: &'a str,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = task_instances)]
pub struct TaskInstance {
    pub id: String,
    pub task_id: String,
    pub household_id: String,
    pub assigned_to: Option<String>,
    pub due_date: NaiveDate,
    pub completed_at: Option<NaiveDateTime>,
    pub completed_by: Option<String>,
    pub photo_url: Option<String>,
    pub points_awarded: Option<i32>,
}

#[derive(Insertable)]
#[diesel(table_name = task_instances)]
pub struct NewTaskInstance<'a> {
    pub id: &'a str,
    pub task_id: &'a str,
    pub household_id: &'a str,
    pub assigned_to: Option<&'a str>,
    pub due_date: NaiveDate,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = user_points)]
pub struct UserPoints {
    pub user_id: String,
    pub household_id: String,
    pub total_points: i64,
    pub last_updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = user_points)]
pub struct NewUserPoints<'a> {
    pub user_id: &'a str,
    pub household_id: &'a str,
    pub total_points: i64,
    pub last_updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = user_streaks)]
pub struct UserStreak {
    pub user_id: String,
    pub household_id: String,
    pub current_streak: i32,
    pub last_task_completed_at: NaiveDateTime,
    pub is_active: bool,
    pub streak_started_at: NaiveDateTime,
    pub broken_at: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[diesel(table_name = user_streaks)]
pub struct NewUserStreak<'a> {
    pub user_id: &'a str,
    pub household_id: &'a str,
    pub current_streak: i32,
    pub last_task_completed_at: NaiveDateTime,
    pub is_active: bool,
    pub streak_started_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = badges)]
pub struct Badge {
    pub id: String,
    pub name: String,
    pub emoji: String,
    pub condition: String,
    pub description: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = badges)]
pub struct NewBadge<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub emoji: &'a str,
    pub condition: &'a str,
    pub description: Option<&'a str>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = user_badges)]
pub struct UserBadge {
    pub id: i32,
    pub user_id: String,
    pub household_id: String,
    pub badge_id: String,
    pub earned_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = user_badges)]
pub struct NewUserBadge<'a> {
    pub user_id: &'a str,
    pub household_id: &'a str,
    pub badge_id: &'a str,
    pub earned_at: NaiveDateTime,
}
