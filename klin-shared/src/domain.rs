use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Number of leading id characters that make up a household invite code.
pub const INVITE_CODE_LEN: usize = 8;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    Daily,
    Weekly,
    Oneoff,
}

impl Recurrence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recurrence::Daily => "daily",
            Recurrence::Weekly => "weekly",
            Recurrence::Oneoff => "oneoff",
        }
    }

    /// Checks the optional weekday (0 = Sunday .. 6 = Saturday) against the cadence.
    pub fn validate_due_day(&self, due_day_of_week: Option<i32>) -> Result<(), String> {
        if let Some(d) = due_day_of_week
            && !(0..=6).contains(&d)
        {
            return Err(format!("due_day_of_week must be within 0..=6, got {d}"));
        }
        match (self, due_day_of_week) {
            (Recurrence::Weekly, None) => Err("weekly tasks need due_day_of_week".into()),
            (Recurrence::Daily | Recurrence::Oneoff, Some(_)) => Err(format!(
                "due_day_of_week is only valid for weekly tasks, not {}",
                self.as_str()
            )),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown recurrence: {0}")]
pub struct UnknownRecurrence(pub String);

impl FromStr for Recurrence {
    type Err = UnknownRecurrence;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Recurrence::Daily),
            "weekly" => Ok(Recurrence::Weekly),
            "oneoff" | "one-off" => Ok(Recurrence::Oneoff),
            other => Err(UnknownRecurrence(other.to_string())),
        }
    }
}

/// Invite code of a household: the first characters of its id, uppercased.
pub fn invite_code_for(household_id: &str) -> String {
    household_id
        .chars()
        .take(INVITE_CODE_LEN)
        .collect::<String>()
        .to_uppercase()
}

/// Normalizes user-typed invite codes for comparison.
pub fn normalize_invite_code(input: &str) -> String {
    input.trim().to_uppercase()
}

/// Catalog entry describing an earnable badge. `condition` is a descriptive tag only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub id: String,
    pub name: String,
    pub emoji: String,
    pub condition: String,
    #[serde(default)]
    pub description: Option<String>,
}

pub fn default_badges() -> Vec<Badge> {
    let b = |id: &str, name: &str, emoji: &str, condition: &str| Badge {
        id: id.into(),
        name: name.into(),
        emoji: emoji.into(),
        condition: condition.into(),
        description: None,
    };
    vec![
        b("on_fire", "On Fire", "🔥", "streak_14_days"),
        b("reliable", "Reliable", "👑", "zero_missed_30_days"),
        b("rising_star", "Rising Star", "🚀", "points_50_30_days"),
        b("committed", "Committed", "💪", "tasks_100"),
        b("perfectionist", "Perfectionist", "🏆", "streak_90_days"),
        b("star_performer", "Star Performer", "🌟", "top_1_month"),
        b("all_in", "All-In", "🎯", "completion_100_week"),
        b("team_player", "Team Player", "🤝", "zero_reassignments"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invite_code_is_uppercased_prefix() {
        assert_eq!(
            invite_code_for("3f2a9c1e-77aa-4b1e-9c3d-0a1b2c3d4e5f"),
            "3F2A9C1E"
        );
        assert_eq!(invite_code_for("abc"), "ABC");
    }

    #[test]
    fn invite_code_input_is_case_insensitive() {
        let code = invite_code_for("deadbeef-0000");
        assert_eq!(normalize_invite_code("  deadBEEF "), code);
    }

    #[test]
    fn recurrence_parses_and_validates() {
        assert_eq!("Weekly".parse::<Recurrence>().unwrap(), Recurrence::Weekly);
        assert_eq!("one-off".parse::<Recurrence>().unwrap(), Recurrence::Oneoff);
        assert!("monthly".parse::<Recurrence>().is_err());

        assert!(Recurrence::Weekly.validate_due_day(Some(3)).is_ok());
        assert!(Recurrence::Weekly.validate_due_day(None).is_err());
        assert!(Recurrence::Weekly.validate_due_day(Some(7)).is_err());
        assert!(Recurrence::Daily.validate_due_day(None).is_ok());
        assert!(Recurrence::Oneoff.validate_due_day(Some(1)).is_err());
    }

    #[test]
    fn default_catalog_has_unique_ids() {
        let badges = default_badges();
        assert_eq!(badges.len(), 8);
        let mut ids: Vec<_> = badges.iter().map(|b| b.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 8);
        assert!(badges.iter().any(|b| b.condition == "streak_14_days"));
    }
}
