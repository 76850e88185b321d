use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

use super::{API_V1_PREFIX, household_scope};

fn base_join(base: &str, path: &str) -> String {
    let b = base.trim_end_matches('/');
    let p = path.trim_start_matches('/');
    format!("{}/{}", b, p)
}

fn enc(s: &str) -> String {
    utf8_percent_encode(s, NON_ALPHANUMERIC).to_string()
}

fn scoped(base: &str, household_id: &str, suffix: &str) -> String {
    base_join(
        base,
        &format!("{}/{}", household_scope(household_id), suffix),
    )
}

pub fn version(base: &str) -> String {
    base_join(base, &format!("{}/version", API_V1_PREFIX))
}
pub fn auth_signup(base: &str) -> String {
    base_join(base, &format!("{}/auth/signup", API_V1_PREFIX))
}
pub fn auth_signin(base: &str) -> String {
    base_join(base, &format!("{}/auth/signin", API_V1_PREFIX))
}
pub fn auth_signout(base: &str) -> String {
    base_join(base, &format!("{}/auth/signout", API_V1_PREFIX))
}
pub fn auth_renew(base: &str) -> String {
    base_join(base, &format!("{}/auth/renew", API_V1_PREFIX))
}
pub fn me(base: &str) -> String {
    base_join(base, &format!("{}/me", API_V1_PREFIX))
}
pub fn badge_catalog(base: &str) -> String {
    base_join(base, &format!("{}/badges", API_V1_PREFIX))
}
pub fn households(base: &str) -> String {
    base_join(base, &format!("{}/households", API_V1_PREFIX))
}
pub fn households_join(base: &str) -> String {
    base_join(base, &format!("{}/households/join", API_V1_PREFIX))
}
pub fn household(base: &str, household_id: &str) -> String {
    base_join(base, &household_scope(household_id))
}
pub fn members(base: &str, household_id: &str) -> String {
    scoped(base, household_id, "members")
}
pub fn tasks(base: &str, household_id: &str) -> String {
    scoped(base, household_id, "tasks")
}
pub fn task(base: &str, household_id: &str, task_id: &str) -> String {
    scoped(base, household_id, &format!("tasks/{}", enc(task_id)))
}
pub fn task_instances(base: &str, household_id: &str, task_id: &str) -> String {
    scoped(base, household_id, &format!("tasks/{}/instances", enc(task_id)))
}
pub fn instances(base: &str, household_id: &str, from: &str, to: &str) -> String {
    scoped(
        base,
        household_id,
        &format!("instances?from={}&to={}", enc(from), enc(to)),
    )
}
pub fn instances_today(base: &str, household_id: &str) -> String {
    scoped(base, household_id, "instances/today")
}
pub fn instance_complete(base: &str, household_id: &str, instance_id: &str) -> String {
    scoped(
        base,
        household_id,
        &format!("instances/{}/complete", enc(instance_id)),
    )
}
pub fn points(base: &str, household_id: &str) -> String {
    scoped(base, household_id, "points")
}
pub fn streak(base: &str, household_id: &str) -> String {
    scoped(base, household_id, "streak")
}
pub fn streak_increment(base: &str, household_id: &str) -> String {
    scoped(base, household_id, "streak/increment")
}
pub fn streak_break(base: &str, household_id: &str) -> String {
    scoped(base, household_id, "streak/break")
}
pub fn badges(base: &str, household_id: &str) -> String {
    scoped(base, household_id, "badges")
}
pub fn leaderboard(base: &str, household_id: &str) -> String {
    scoped(base, household_id, "leaderboard")
}
