//! Household, task and gamification commands against the active session.

use chrono::{DateTime, NaiveDate, Utc, Weekday};
use klin_shared::api::{self, rest};
use klin_shared::{domain::Recurrence, jwt};

use crate::AppError;
use crate::cli::{BadgesCmd, HouseholdCmd, PointsCmd, StreakCmd, TasksCmd};
use crate::router::RouteEvent;
use crate::session::Session;

pub async fn status(session: &mut Session) -> Result<(), AppError> {
    println!("Server: {}", session.server_url().unwrap_or("(not configured)"));
    if let Some(url) = session.server_url() {
        match rest::server_version(url).await {
            Ok(v) => println!("Server version: {}", v.version),
            Err(e) => println!("Server unreachable: {e}"),
        }
    }
    println!("State:  {}", session.route());
    if let Ok((url, token)) = session.credentials() {
        if let Ok(claims) = jwt::decode_unverified(&token) {
            let expires = DateTime::<Utc>::from_timestamp(claims.exp, 0)
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| claims.exp.to_string());
            println!("Token expires: {expires}");
        }
        let me = session.check(rest::me(&url, &token).await)?;
        println!("User:   {} <{}> ({})", me.name, me.email, me.timezone);
    }
    Ok(())
}

pub async fn household(session: &mut Session, cmd: HouseholdCmd) -> Result<(), AppError> {
    match cmd {
        HouseholdCmd::Create { name } => {
            let (url, token) = session.credentials()?;
            let req = api::CreateHouseholdReq { name };
            let h = session.check(rest::create_household(&url, &token, &req).await)?;
            session.apply(RouteEvent::HouseholdSelected(h.id.clone()))?;
            println!("Created household {} ({})", h.name, h.id);
            println!("Invite code: {}", h.invite_code);
        }
        HouseholdCmd::Join { invite_code } => {
            let (url, token) = session.credentials()?;
            let req = api::JoinHouseholdReq { invite_code };
            let h = session.check(rest::join_household(&url, &token, &req).await)?;
            session.apply(RouteEvent::HouseholdSelected(h.id.clone()))?;
            println!("Joined household {} ({})", h.name, h.id);
        }
        HouseholdCmd::Use { household_id } => {
            let (url, token) = session.credentials()?;
            let mine = session.check(rest::list_households(&url, &token).await)?;
            let Some(h) = mine.into_iter().find(|h| h.id == household_id) else {
                return Err(AppError::State(format!(
                    "you are not a member of household {household_id}"
                )));
            };
            session.apply(RouteEvent::HouseholdSelected(h.id.clone()))?;
            println!("Active household: {} ({})", h.name, h.id);
        }
        HouseholdCmd::List => {
            let (url, token) = session.credentials()?;
            let mine = session.check(rest::list_households(&url, &token).await)?;
            let active = session.route().household_id().map(str::to_string);
            for h in mine {
                let marker = if active.as_deref() == Some(h.id.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!("{marker} {}  {}  [{}]", h.id, h.name, h.invite_code);
            }
        }
        HouseholdCmd::Show => {
            let (url, token, hid) = session.household_scope()?;
            let h = session.check(rest::household(&url, &hid, &token).await)?;
            println!("{} ({})", h.name, h.id);
            println!("Invite code: {}", h.invite_code);
            println!("Created:     {}", h.created_at);
        }
        HouseholdCmd::Members => {
            let (url, token, hid) = session.household_scope()?;
            let members = session.check(rest::list_members(&url, &hid, &token).await)?;
            for m in members {
                println!("{:<8} {}  <{}>  {}", m.role.as_str(), m.name, m.email, m.user_id);
            }
        }
    }
    Ok(())
}

pub async fn tasks(session: &mut Session, cmd: TasksCmd) -> Result<(), AppError> {
    let (url, token, hid) = session.household_scope()?;
    match cmd {
        TasksCmd::List => {
            let tasks = session.check(rest::list_tasks(&url, &hid, &token).await)?;
            for t in tasks {
                let day = t
                    .due_day_of_week
                    .map(|d| format!(" on {}", weekday_name(d)))
                    .unwrap_or_default();
                println!(
                    "{} {}  ({}{})  {}",
                    t.emoji.as_deref().unwrap_or("•"),
                    t.title,
                    t.recurrence,
                    day,
                    t.id
                );
            }
        }
        TasksCmd::Create {
            title,
            recurrence,
            day,
            description,
            emoji,
        } => {
            let recurrence = recurrence
                .parse::<Recurrence>()
                .map_err(|e| AppError::State(e.to_string()))?;
            recurrence
                .validate_due_day(day)
                .map_err(AppError::State)?;
            let req = api::CreateTaskReq {
                title,
                recurrence,
                due_day_of_week: day,
                description,
                emoji,
            };
            let t = session.check(rest::create_task(&url, &hid, &token, &req).await)?;
            println!("Created task {} ({})", t.title, t.id);
        }
        TasksCmd::Delete { task_id } => {
            session.check(rest::delete_task(&url, &hid, &task_id, &token).await)?;
            println!("Deleted task {task_id}");
        }
        TasksCmd::Schedule {
            task_id,
            due_date,
            assign,
        } => {
            check_date(&due_date)?;
            let req = api::CreateInstanceReq {
                due_date,
                assigned_to: assign,
            };
            let i = session.check(
                rest::create_task_instance(&url, &hid, &task_id, &token, &req).await,
            )?;
            println!("Scheduled instance {} for {}", i.id, i.due_date);
        }
        TasksCmd::Today => {
            let items = session.check(rest::list_today_instances(&url, &hid, &token).await)?;
            print_instances(&items);
        }
        TasksCmd::Range { from, to } => {
            check_date(&from)?;
            check_date(&to)?;
            let items = session.check(rest::list_instances(&url, &hid, &from, &to, &token).await)?;
            print_instances(&items);
        }
        TasksCmd::Complete {
            instance_id,
            photo_url,
        } => {
            let req = api::CompleteInstanceReq { photo_url };
            let i = session.check(
                rest::complete_instance(&url, &hid, &instance_id, &token, &req).await,
            )?;
            println!(
                "Done! {} completed ({} points recorded)",
                i.id,
                i.points_awarded.unwrap_or(0)
            );
        }
    }
    Ok(())
}

pub async fn points(session: &mut Session, action: Option<PointsCmd>) -> Result<(), AppError> {
    let (url, token, hid) = session.household_scope()?;
    let p = match action {
        None => session.check(rest::points(&url, &hid, &token).await)?,
        Some(PointsCmd::Add { amount }) => {
            session.check(rest::add_points(&url, &hid, &token, amount).await)?
        }
    };
    println!("{} points", p.total_points);
    Ok(())
}

pub async fn streak(session: &mut Session, action: Option<StreakCmd>) -> Result<(), AppError> {
    let (url, token, hid) = session.household_scope()?;
    match action {
        None => match session.check(rest::streak(&url, &hid, &token).await)? {
            Some(s) if s.is_active => println!("🔥 {} day streak", s.current_streak),
            Some(s) => println!(
                "Streak broken at {} days ({})",
                s.current_streak,
                s.broken_at.as_deref().unwrap_or("unknown time")
            ),
            None => println!("No streak yet"),
        },
        Some(StreakCmd::Increment) => {
            let n = session.check(rest::increment_streak(&url, &hid, &token).await)?;
            println!("🔥 {} day streak", n.current_streak);
        }
        Some(StreakCmd::Break) => {
            match session.check(rest::break_streak(&url, &hid, &token).await)? {
                Some(s) => println!("Streak broken at {} days", s.current_streak),
                None => println!("No streak to break"),
            }
        }
    }
    Ok(())
}

pub async fn badges(session: &mut Session, action: Option<BadgesCmd>) -> Result<(), AppError> {
    match action {
        Some(BadgesCmd::Catalog) => {
            let (url, token) = session.credentials()?;
            let all = session.check(rest::badge_catalog(&url, &token).await)?;
            for b in all {
                println!("{} {}  [{}]  {}", b.emoji, b.name, b.id, b.condition);
            }
        }
        Some(BadgesCmd::Award { badge_id }) => {
            let (url, token, hid) = session.household_scope()?;
            let r = session.check(rest::award_badge(&url, &hid, &token, &badge_id).await)?;
            if r.awarded {
                println!("Badge {badge_id} awarded");
            } else {
                println!("Badge {badge_id} was already earned");
            }
        }
        None => {
            let (url, token, hid) = session.household_scope()?;
            let earned = session.check(rest::badges(&url, &hid, &token).await)?;
            if earned.is_empty() {
                println!("No badges yet");
            }
            for b in earned {
                println!("{}  earned {}", b.badge_id, b.earned_at);
            }
        }
    }
    Ok(())
}

pub async fn leaderboard(session: &mut Session) -> Result<(), AppError> {
    let (url, token, hid) = session.household_scope()?;
    let rows = session.check(rest::leaderboard(&url, &hid, &token).await)?;
    for (rank, r) in rows.iter().enumerate() {
        println!(
            "{:>2}. {:<20} {:>5} pts  🔥{:<3} ✓{:<4} {}",
            rank + 1,
            r.user_name,
            r.points,
            r.streak,
            r.tasks_completed,
            r.badges.join(",")
        );
    }
    Ok(())
}

fn print_instances(items: &[api::InstanceDto]) {
    if items.is_empty() {
        println!("Nothing due");
    }
    for i in items {
        let state = match &i.completed_at {
            Some(at) => format!("done {at}"),
            None => "open".to_string(),
        };
        println!("{}  task {}  {}  {}", i.due_date, i.task_id, state, i.id);
    }
}

/// 0 = Sunday .. 6 = Saturday.
fn weekday_name(day: i32) -> String {
    (0..day.clamp(0, 6))
        .fold(Weekday::Sun, |w, _| w.succ())
        .to_string()
}

fn check_date(value: &str) -> Result<(), AppError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| AppError::State(format!("expected a YYYY-MM-DD date, got {value:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekdays_count_from_sunday() {
        assert_eq!(weekday_name(0), "Sun");
        assert_eq!(weekday_name(2), "Tue");
        assert_eq!(weekday_name(6), "Sat");
    }

    #[test]
    fn dates_must_be_iso() {
        assert!(check_date("2026-02-28").is_ok());
        assert!(check_date("28/02/2026").is_err());
    }
}
