use klin_shared::domain::{self, Badge};
use serde::Deserialize;
use std::{env, fs, path::Path};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub dev_cors_origin: Option<String>,
    pub listen_port: Option<u16>,
    /// bcrypt work factor for new password hashes; defaults to `bcrypt::DEFAULT_COST`.
    pub bcrypt_cost: Option<u32>,
    #[serde(default)]
    pub gamification: GamificationConfig,
    #[serde(default = "domain::default_badges")]
    pub badges: Vec<Badge>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GamificationConfig {
    /// Recorded on an instance when it is completed.
    #[serde(default = "default_points_per_task")]
    pub points_per_task: i32,
}

impl Default for GamificationConfig {
    fn default() -> Self {
        Self {
            points_per_task: default_points_per_task(),
        }
    }
}

fn default_points_per_task() -> i32 {
    1
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());
        Self::load_from_path(path)
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(&path)?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let cfg: AppConfig = serde_yaml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Invalid("jwt_secret must not be empty".into()));
        }
        if self.gamification.points_per_task < 0 {
            return Err(ConfigError::Invalid(
                "gamification.points_per_task must not be negative".into(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for b in &self.badges {
            if !seen.insert(b.id.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate badge id: {}", b.id)));
            }
        }
        Ok(())
    }

    pub fn bcrypt_cost(&self) -> u32 {
        self.bcrypt_cost.unwrap_or(bcrypt::DEFAULT_COST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg = AppConfig::from_yaml("jwt_secret: s3cret\n").unwrap();
        assert_eq!(cfg.gamification.points_per_task, 1);
        assert_eq!(cfg.badges.len(), domain::default_badges().len());
        assert_eq!(cfg.bcrypt_cost(), bcrypt::DEFAULT_COST);
        assert!(cfg.listen_port.is_none());
    }

    #[test]
    fn rejects_duplicate_badges_and_empty_secret() {
        let dup = r#"
jwt_secret: x
badges:
  - { id: a, name: A, emoji: "*", condition: c }
  - { id: a, name: B, emoji: "*", condition: c }
"#;
        assert!(matches!(
            AppConfig::from_yaml(dup),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            AppConfig::from_yaml("jwt_secret: '  '\n"),
            Err(ConfigError::Invalid(_))
        ));
    }
}
