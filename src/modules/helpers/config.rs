use std::env;
use std::path::PathBuf;
use std::time::Duration;

use dotenvy::dotenv;
use log::warn;

pub const DEFAULT_SUBMIT_HOST: &str = "https://rcj.pythonanywhere.com";
pub const DEFAULT_SUBMIT_PATH: &str = "/api/v1/submit_run";
pub const DEFAULT_EVENT: &str = "2022-berlin";
const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_SUBMIT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_COMPETITIONS_FILE: &str = "competitions.json";
const DEFAULT_LOG_FILE: &str = "program.log";
const DEFAULT_LOGGING_LEVEL: &str = "INFO";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub submit_host: String,
    pub submit_path: String,
    pub event: String,
    pub data_dir: PathBuf,
    pub submit_timeout: Duration,
    pub competitions_file: String,
    pub log_file: String,
    pub logging_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            submit_host: DEFAULT_SUBMIT_HOST.to_string(),
            submit_path: DEFAULT_SUBMIT_PATH.to_string(),
            event: DEFAULT_EVENT.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            submit_timeout: Duration::from_secs(DEFAULT_SUBMIT_TIMEOUT_SECS),
            competitions_file: DEFAULT_COMPETITIONS_FILE.to_string(),
            log_file: DEFAULT_LOG_FILE.to_string(),
            logging_level: DEFAULT_LOGGING_LEVEL.to_string(),
        }
    }
}

impl Settings {
    /// # settings from the environment
    /// read the `.env` file and the process environment, unset values fall
    /// back to their defaults
    pub fn from_env() -> Settings {
        dotenv().ok();
        Settings::from_lookup(|name| env::var(name).ok())
    }

    /// # settings from a lookup function
    ///
    /// ## Arguments
    /// * `lookup` - Returns the value of a variable, none if unset
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Settings {
        let defaults = Settings::default();
        let var = |name: &str, default: String| lookup(name).filter(|v| !v.is_empty()).unwrap_or(default);

        let submit_timeout = match lookup("RCJ_SUBMIT_TIMEOUT_SECS") {
            Some(secs) => match secs.trim().parse::<u64>() {
                Ok(secs) => Duration::from_secs(secs),
                Err(_) => {
                    warn!(target: "helpers/config:from_env", "invalid RCJ_SUBMIT_TIMEOUT_SECS {:?}, using default", secs);
                    defaults.submit_timeout
                }
            },
            None => defaults.submit_timeout,
        };

        Settings {
            submit_host: var("RCJ_SUBMIT_HOST", defaults.submit_host),
            submit_path: var("RCJ_SUBMIT_PATH", defaults.submit_path),
            event: var("RCJ_EVENT", defaults.event),
            data_dir: PathBuf::from(var("RCJ_DATA_DIR", DEFAULT_DATA_DIR.to_string())),
            submit_timeout,
            competitions_file: var("RCJ_COMPETITIONS_FILE", defaults.competitions_file),
            log_file: var("RCJ_LOG_FILE", defaults.log_file),
            logging_level: var("LOGGING_LEVEL", defaults.logging_level),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn unset_values_use_defaults() {
        let settings = Settings::from_lookup(|_| None);
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.submit_timeout, Duration::from_secs(30));
    }

    #[test]
    fn values_are_read() {
        let vars: HashMap<&str, &str> = [
            ("RCJ_SUBMIT_HOST", "http://localhost:8000"),
            ("RCJ_EVENT", "2023-bordeaux"),
            ("RCJ_SUBMIT_TIMEOUT_SECS", "5"),
            ("RCJ_DATA_DIR", "/tmp/rcj"),
            ("RCJ_SUBMIT_PATH", ""),
        ]
        .into_iter()
        .collect();
        let settings = Settings::from_lookup(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(settings.submit_host, "http://localhost:8000");
        assert_eq!(settings.submit_path, DEFAULT_SUBMIT_PATH);
        assert_eq!(settings.event, "2023-bordeaux");
        assert_eq!(settings.submit_timeout, Duration::from_secs(5));
        assert_eq!(settings.data_dir, PathBuf::from("/tmp/rcj"));
    }

    #[test]
    fn broken_timeout_falls_back() {
        let settings = Settings::from_lookup(|name| (name == "RCJ_SUBMIT_TIMEOUT_SECS").then(|| "soon".to_string()));
        assert_eq!(settings.submit_timeout, Duration::from_secs(30));
    }
}
