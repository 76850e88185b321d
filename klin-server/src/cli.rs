use clap::Parser;
use std::path::PathBuf;

const HELP_EPILOG: &str = r#"Options fall back to environment variables:
  CONFIG_PATH (default: ./config.yaml)
  DB_PATH     (default: data/app.db)
  PORT        (default: 5252 or config.listen_port)

Log verbosity follows RUST_LOG (default: info).
"#;

#[derive(Debug, Parser)]
#[command(
    name = "klin-server",
    version,
    about = "KLIN household chores server",
    long_about = None,
    after_long_help = HELP_EPILOG,
)]
pub struct Cli {
    /// Path to the YAML config file
    #[arg(long, env = "CONFIG_PATH", default_value = "config.yaml")]
    pub config: PathBuf,
    /// Path to the SQLite database file
    #[arg(long, env = "DB_PATH", default_value = "data/app.db")]
    pub db: PathBuf,
    /// Listen port; overrides config.listen_port
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,
}
