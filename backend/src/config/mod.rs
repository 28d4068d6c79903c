//! Job options: defaults, `.env` file and `STATJOIN_*` environment overrides.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::source::DEFAULT_MAX_RETRIES;

/// Options shared by every job kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct JobOptions {
    /// Preferred language for SDMX localized names.
    pub language: String,
    /// Root under which the job working directory is created.
    pub work_dir: PathBuf,
    /// Keep the job working directory after completion.
    pub keep_temp: bool,
    /// Create the output in Web Mercator instead of the geography layer's reference.
    pub web_mercator: bool,
    /// Use human-readable field aliases on the output.
    pub update_aliases: bool,
    pub http_timeout_secs: u64,
    pub http_retries: u32,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            work_dir: std::env::temp_dir(),
            keep_temp: false,
            web_mercator: false,
            update_aliases: true,
            http_timeout_secs: 60,
            http_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl JobOptions {
    /// Defaults overridden by the environment (a `.env` file is loaded first).
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::default().with_vars(|key| std::env::var(key).ok())
    }

    /// Apply `STATJOIN_*` overrides read through `get`. Unparseable values are ignored.
    pub fn with_vars(mut self, get: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(lang) = get("STATJOIN_LANG").filter(|l| !l.trim().is_empty()) {
            self.language = lang.trim().to_string();
        }
        if let Some(dir) = get("STATJOIN_WORK_DIR").filter(|d| !d.is_empty()) {
            self.work_dir = PathBuf::from(dir);
        }
        if let Some(flag) = get("STATJOIN_KEEP_TEMP").and_then(|v| parse_flag(&v)) {
            self.keep_temp = flag;
        }
        if let Some(flag) = get("STATJOIN_WEB_MERCATOR").and_then(|v| parse_flag(&v)) {
            self.web_mercator = flag;
        }
        if let Some(secs) = get("STATJOIN_HTTP_TIMEOUT_SECS").and_then(|v| v.trim().parse().ok()) {
            self.http_timeout_secs = secs;
        }
        if let Some(n) = get("STATJOIN_HTTP_RETRIES").and_then(|v| v.trim().parse().ok()) {
            self.http_retries = n;
        }
        self
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let opts = JobOptions::default();
        assert_eq!(opts.language, "en");
        assert!(!opts.keep_temp);
        assert!(opts.update_aliases);
        assert_eq!(opts.http_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("STATJOIN_LANG", "fr"),
            ("STATJOIN_WORK_DIR", "/var/tmp/statjoin"),
            ("STATJOIN_KEEP_TEMP", "yes"),
            ("STATJOIN_HTTP_TIMEOUT_SECS", "15"),
            ("STATJOIN_HTTP_RETRIES", "not-a-number"),
        ]
        .into_iter()
        .collect();
        let opts = JobOptions::default().with_vars(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(opts.language, "fr");
        assert_eq!(opts.work_dir, PathBuf::from("/var/tmp/statjoin"));
        assert!(opts.keep_temp);
        assert_eq!(opts.http_timeout_secs, 15);
        assert_eq!(opts.http_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_options_from_json() {
        let opts: JobOptions = serde_json::from_str(r#"{"language": "de", "web_mercator": true}"#).unwrap();
        assert_eq!(opts.language, "de");
        assert!(opts.web_mercator);
        assert!(opts.update_aliases);
    }
}
