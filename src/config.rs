//! Runtime configuration, read once from a `.env` file.
//!
//! Each running instance is a directory holding a `.env` file and the
//! `data.db` it writes next to it.  Keys are read from the file itself, not
//! from the process environment, so several instances can run side by side
//! without stepping on each other.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::store::DB_FILE_NAME;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Config {
    /// Full ntfy topic URL notifications are posted to.
    pub topic: String,
    /// Time between the end of one poll cycle and the start of the next.
    pub poll_interval: Duration,
    /// Whether Epic free games are watched.
    pub epic_enabled: bool,
    pub epic_locale: String,
    pub epic_country: String,
    /// Steam app ids to watch; Steam is inactive when empty.
    pub steam_games: Vec<u32>,
    pub steam_country: String,
    /// Upper bound for every storefront and ntfy request.
    pub http_timeout: Duration,
}

impl Config {
    /// Read the `.env` file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !is_env_file(path) {
            return Err(ConfigError::NotAnEnvFile(path.to_path_buf()));
        }
        let read_err = |source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        };
        let vars = dotenvy::from_path_iter(path)
            .map_err(read_err)?
            .collect::<Result<HashMap<_, _>, _>>()
            .map_err(read_err)?;
        Self::from_vars(&vars)
    }

    /// Build a config from already-read key/value pairs.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            vars.get(key)
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
        };

        let topic = get("NTFY_TOPIC")
            .ok_or(ConfigError::Missing("NTFY_TOPIC"))?
            .to_string();

        let poll_minutes = match get("POLL_INTERVAL") {
            None => 60,
            Some(value) => value
                .parse::<u64>()
                .ok()
                .filter(|&minutes| minutes > 0)
                .ok_or_else(|| invalid("POLL_INTERVAL", value))?,
        };

        let epic_enabled = get("EPIC_NOTIFY_FREE_GAMES")
            .is_some_and(|value| matches!(value.to_lowercase().as_str(), "true" | "1" | "yes"));

        let steam_games = get("STEAM_WANTED_GAMES")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| id.parse::<u32>().map_err(|_| invalid("STEAM_WANTED_GAMES", id)))
            .collect::<Result<Vec<_>, _>>()?;

        let timeout_secs = match get("HTTP_TIMEOUT_SECS") {
            None => 30,
            Some(value) => value
                .parse::<u64>()
                .ok()
                .filter(|&secs| secs > 0)
                .ok_or_else(|| invalid("HTTP_TIMEOUT_SECS", value))?,
        };

        Ok(Self {
            topic,
            poll_interval: Duration::from_secs(poll_minutes * 60),
            epic_enabled,
            epic_locale: get("EPIC_LOCALE").unwrap_or("de").to_string(),
            epic_country: get("EPIC_COUNTRY").unwrap_or("DE").to_string(),
            steam_games,
            steam_country: get("STEAM_COUNTRY").unwrap_or("de").to_string(),
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn invalid(key: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
    }
}

/// An existing file with `.env` in its name (`.env`, `prod.env`, …).
pub fn is_env_file(path: &Path) -> bool {
    path.is_file()
        && path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().contains(".env"))
}

/// Directory an instance lives in: the `.env` file's parent, or `path`
/// itself when it is a directory.
pub fn working_dir(path: &Path) -> PathBuf {
    if path.is_file() {
        path.parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    } else {
        path.to_path_buf()
    }
}

pub fn db_path(path: &Path) -> PathBuf {
    working_dir(path).join(DB_FILE_NAME)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults() {
        let config = Config::from_vars(&vars(&[("NTFY_TOPIC", "https://ntfy.sh/games")])).unwrap();

        assert_eq!(config.topic, "https://ntfy.sh/games");
        assert_eq!(config.poll_interval, Duration::from_secs(3600));
        assert!(!config.epic_enabled);
        assert!(config.steam_games.is_empty());
        assert_eq!(config.epic_locale, "de");
        assert_eq!(config.epic_country, "DE");
        assert_eq!(config.steam_country, "de");
        assert_eq!(config.http_timeout, Duration::from_secs(30));
    }

    #[test]
    fn full_config() {
        let config = Config::from_vars(&vars(&[
            ("NTFY_TOPIC", "https://ntfy.sh/games"),
            ("POLL_INTERVAL", "15"),
            ("EPIC_NOTIFY_FREE_GAMES", "Yes"),
            ("STEAM_WANTED_GAMES", "100, 200,,300 "),
            ("EPIC_LOCALE", "en-US"),
            ("HTTP_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.poll_interval, Duration::from_secs(15 * 60));
        assert!(config.epic_enabled);
        assert_eq!(config.steam_games, vec![100, 200, 300]);
        assert_eq!(config.epic_locale, "en-US");
        assert_eq!(config.http_timeout, Duration::from_secs(5));
    }

    #[test]
    fn epic_flag_spellings() {
        for (value, expected) in [("true", true), ("1", true), ("YES", true), ("no", false), ("0", false)] {
            let config = Config::from_vars(&vars(&[
                ("NTFY_TOPIC", "t"),
                ("EPIC_NOTIFY_FREE_GAMES", value),
            ]))
            .unwrap();
            assert_eq!(config.epic_enabled, expected, "value {value:?}");
        }
    }

    #[test]
    fn missing_topic() {
        let err = Config::from_vars(&vars(&[("POLL_INTERVAL", "5")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("NTFY_TOPIC")));
    }

    #[test]
    fn rejects_bad_values() {
        for (key, value) in [
            ("POLL_INTERVAL", "soon"),
            ("POLL_INTERVAL", "0"),
            ("STEAM_WANTED_GAMES", "100,abc"),
            ("HTTP_TIMEOUT_SECS", "-1"),
        ] {
            let err = Config::from_vars(&vars(&[("NTFY_TOPIC", "t"), (key, value)])).unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { key: k, .. } if k == key),
                "{key}={value} gave {err:?}"
            );
        }
    }

    #[test]
    fn loads_env_file_without_touching_process_env() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(
            &path,
            "NTFY_TOPIC=https://ntfy.sh/from-file\nSTEAM_WANTED_GAMES=42\n# comment\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();

        assert_eq!(config.topic, "https://ntfy.sh/from-file");
        assert_eq!(config.steam_games, vec![42]);
        assert!(std::env::var("NTFY_TOPIC").is_err());
    }

    #[test]
    fn env_file_checks() {
        let dir = TempDir::new().unwrap();
        let env = dir.path().join("prod.env");
        let other = dir.path().join("config.toml");
        std::fs::write(&env, "NTFY_TOPIC=t\n").unwrap();
        std::fs::write(&other, "").unwrap();

        assert!(is_env_file(&env));
        assert!(!is_env_file(&other));
        assert!(!is_env_file(dir.path()));
        assert!(!is_env_file(&dir.path().join("missing.env")));
        assert!(matches!(
            Config::load(&other),
            Err(ConfigError::NotAnEnvFile(_))
        ));
    }

    #[test]
    fn working_dir_and_db_path() {
        let dir = TempDir::new().unwrap();
        let env = dir.path().join(".env");
        std::fs::write(&env, "").unwrap();

        assert_eq!(working_dir(&env), dir.path());
        assert_eq!(working_dir(dir.path()), dir.path());
        assert_eq!(db_path(&env), dir.path().join("data.db"));
    }
}
