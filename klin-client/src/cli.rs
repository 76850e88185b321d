use std::path::PathBuf;

use clap::{Parser, Subcommand};

const HELP_EPILOG: &str = r#"Config resolution order:
  1) --config/-c PATH
  2) $KLIN_CONFIG
  3) platform default, e.g. ~/.config/klin/client.yaml

The session token is kept in the OS keyring; the active household
is remembered in state.yaml next to the config.
"#;

#[derive(Debug, Parser)]
#[command(
    name = "klin",
    version,
    about = "Household chores, points and streaks from the terminal",
    long_about = None,
    after_long_help = HELP_EPILOG,
)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create an account and sign in
    Signup {
        /// Server URL (e.g., http://127.0.0.1:5252). Falls back to config or prompt.
        #[arg(long)]
        server: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        name: Option<String>,
        /// IANA timezone used for "today" (default: UTC)
        #[arg(long)]
        timezone: Option<String>,
    },
    /// Sign in and save the session token in the keyring
    Signin {
        /// Server URL. Falls back to config or prompt.
        #[arg(long)]
        server: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// End the session and forget the active household
    Signout,
    /// Replace the session token with a fresh one
    Renew,
    /// Show where you are: session, profile and active household
    Status,
    /// Manage households
    #[command(subcommand)]
    Household(HouseholdCmd),
    /// Task templates and dated instances of the active household
    #[command(subcommand)]
    Tasks(TasksCmd),
    /// Your points in the active household
    Points {
        #[command(subcommand)]
        action: Option<PointsCmd>,
    },
    /// Your streak in the active household
    Streak {
        #[command(subcommand)]
        action: Option<StreakCmd>,
    },
    /// Badges earned in the active household
    Badges {
        #[command(subcommand)]
        action: Option<BadgesCmd>,
    },
    /// Standings of the active household
    Leaderboard,
}

#[derive(Debug, Subcommand)]
pub enum HouseholdCmd {
    /// Create a household; you become its admin
    Create { name: String },
    /// Join a household with its invite code
    Join { invite_code: String },
    /// Make one of your households the active one
    Use { household_id: String },
    /// List your households
    List,
    /// Show the active household and its invite code
    Show,
    /// List members of the active household
    Members,
}

#[derive(Debug, Subcommand)]
pub enum TasksCmd {
    /// List task templates, newest first
    List,
    /// Create a task template
    Create {
        #[arg(long)]
        title: String,
        /// daily, weekly or oneoff
        #[arg(long, default_value = "daily")]
        recurrence: String,
        /// Weekday for weekly tasks, 0 = Sunday .. 6 = Saturday
        #[arg(long)]
        day: Option<i32>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        emoji: Option<String>,
    },
    /// Delete a task template and its instances (admin only)
    Delete { task_id: String },
    /// Add a dated instance of a template (admin only)
    Schedule {
        task_id: String,
        /// YYYY-MM-DD
        due_date: String,
        /// Member user id to assign
        #[arg(long)]
        assign: Option<String>,
    },
    /// Instances due today in your timezone
    Today,
    /// Instances due within an inclusive date range
    Range {
        /// YYYY-MM-DD
        from: String,
        /// YYYY-MM-DD
        to: String,
    },
    /// Mark an instance as done
    Complete {
        instance_id: String,
        #[arg(long)]
        photo_url: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum PointsCmd {
    /// Add (or with a negative amount, remove) points
    Add {
        #[arg(allow_negative_numbers = true)]
        amount: i64,
    },
}

#[derive(Debug, Subcommand)]
pub enum StreakCmd {
    /// Extend the streak, or start a new one
    Increment,
    /// Mark the streak as broken
    Break,
}

#[derive(Debug, Subcommand)]
pub enum BadgesCmd {
    /// Every badge that can be earned
    Catalog,
    /// Award yourself a badge
    Award { badge_id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_commands() {
        let cli = Cli::try_parse_from(["klin", "points", "add", "-3"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Points {
                action: Some(PointsCmd::Add { amount: -3 })
            }
        ));
        let cli = Cli::try_parse_from([
            "klin", "tasks", "create", "--title", "Bins", "--recurrence", "weekly", "--day", "2",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Tasks(TasksCmd::Create { day: Some(2), .. })
        ));
    }
}
