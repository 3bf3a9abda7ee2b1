use std::{fs, path::Path, time::Duration};

use anyhow::Context;
use serde::Deserialize;

use crate::pagination::{DEFAULT_MAX_VISIBLE, MIN_MAX_VISIBLE};

pub const DEFAULT_CONFIG_FILE: &str = "console.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub server_url: String,
    pub page_size: u32,
    pub max_visible_pages: u32,
    pub request_timeout_secs: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".into(),
            page_size: 10,
            max_visible_pages: DEFAULT_MAX_VISIBLE,
            request_timeout_secs: 15,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    page_size: Option<u32>,
    max_visible_pages: Option<u32>,
    request_timeout_secs: Option<u64>,
}

impl ClientSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    fn apply_file(&mut self, file_cfg: FileSettings) {
        if let Some(v) = file_cfg.server_url {
            self.server_url = v;
        }
        if let Some(v) = file_cfg.page_size {
            self.page_size = v;
        }
        if let Some(v) = file_cfg.max_visible_pages {
            self.max_visible_pages = v;
        }
        if let Some(v) = file_cfg.request_timeout_secs {
            self.request_timeout_secs = v;
        }
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("SERVER_URL") {
            self.server_url = v;
        }
        if let Some(v) = lookup("APP__SERVER_URL") {
            self.server_url = v;
        }
        if let Some(v) = lookup("APP__PAGE_SIZE").and_then(|v| v.parse().ok()) {
            self.page_size = v;
        }
        if let Some(v) = lookup("APP__MAX_VISIBLE_PAGES").and_then(|v| v.parse().ok()) {
            self.max_visible_pages = v;
        }
        if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.request_timeout_secs = v;
        }
    }

    fn sanitized(mut self) -> Self {
        self.page_size = self.page_size.clamp(1, 100);
        self.max_visible_pages = self.max_visible_pages.max(MIN_MAX_VISIBLE);
        self
    }
}

/// Defaults, then `path` if it exists, then environment overrides.
pub fn load_settings(path: impl AsRef<Path>) -> anyhow::Result<ClientSettings> {
    load_settings_with(path.as_ref(), |key| std::env::var(key).ok())
}

fn load_settings_with(
    path: &Path,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<ClientSettings> {
    let mut settings = ClientSettings::default();

    if path.exists() {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        let file_cfg: FileSettings = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))?;
        settings.apply_file(file_cfg);
    }

    settings.apply_env(lookup);
    Ok(settings.sanitized())
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        env,
        path::PathBuf,
        time::{SystemTime, UNIX_EPOCH},
    };

    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let settings = ClientSettings::default();
        let mut loaded = settings.clone();
        loaded.apply_env(|_| None);
        assert_eq!(loaded.sanitized(), settings);

        let from_disk = load_settings("definitely-missing-console.toml").expect("load");
        assert!(from_disk.page_size >= 1);
        assert!(from_disk.max_visible_pages >= MIN_MAX_VISIBLE);
    }

    fn temp_config(name: &str, contents: &str) -> (PathBuf, PathBuf) {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let temp_root = env::temp_dir().join(format!("notice_desk_{name}_{suffix}"));
        fs::create_dir_all(&temp_root).expect("temp root");
        let path = temp_root.join("console.toml");
        fs::write(&path, contents).expect("write config");
        (temp_root, path)
    }

    #[test]
    fn file_values_are_applied_and_sanitized() {
        let (temp_root, path) = temp_config(
            "config_file",
            "server_url = \"https://admin.example.com/\"\npage_size = 500\nmax_visible_pages = 1\n",
        );

        let settings = load_settings_with(&path, |_| None).expect("load");
        assert_eq!(settings.server_url, "https://admin.example.com/");
        assert_eq!(settings.page_size, 100);
        assert_eq!(settings.max_visible_pages, MIN_MAX_VISIBLE);
        assert_eq!(settings.request_timeout_secs, 15);

        let overridden =
            load_settings_with(&path, |key| (key == "APP__PAGE_SIZE").then(|| "7".to_string()))
                .expect("load");
        assert_eq!(overridden.page_size, 7);
        assert_eq!(overridden.server_url, "https://admin.example.com/");

        fs::remove_dir_all(temp_root).expect("cleanup");
    }

    #[test]
    fn malformed_file_is_reported_with_its_path() {
        let (temp_root, path) = temp_config("config_bad", "page_size = \"ten\"\nserver_url = \n");

        let err = load_settings(&path).expect_err("malformed toml");
        let message = format!("{err:#}");
        assert!(message.contains("failed to parse config file"), "{message}");
        assert!(message.contains(&path.display().to_string()), "{message}");

        fs::remove_dir_all(temp_root).expect("cleanup");
    }

    #[test]
    fn app_prefixed_env_wins_over_plain_env() {
        let vars: HashMap<&str, &str> = [
            ("SERVER_URL", "http://plain:1"),
            ("APP__SERVER_URL", "http://prefixed:2"),
            ("APP__PAGE_SIZE", "25"),
            ("APP__REQUEST_TIMEOUT_SECS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut settings = ClientSettings::default();
        settings.apply_env(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(settings.server_url, "http://prefixed:2");
        assert_eq!(settings.page_size, 25);
        assert_eq!(settings.request_timeout_secs, 15);
    }
}
