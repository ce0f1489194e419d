use crate::{
    chat::{ChatProfile, ChatSettings},
    reconcile::StatusPolicy,
};
use anyhow::{Context, Result};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

const CHAT_PROFILE_KEY: &str = "chatProfile";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend_url: String,
    pub chat_url: String,
    pub categories: Vec<String>,
    pub confirm_install: bool,
    pub reconnect_delay_secs: u64,
    pub send_cooldown_secs: u32,
    pub launch_guard_secs: u32,
    pub status_policy: StatusPolicy,
    pub disconnect_chat_on_close: bool,
    pub invite_template: String,
    pub main_channels: Vec<String>,
    pub sub_channels: Vec<String>,
    pub game_modes: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:8787".to_string(),
            chat_url: "ws://127.0.0.1:8787/ws/chat".to_string(),
            categories: strings(&["room", "character", "effect", "interface"]),
            confirm_install: true,
            reconnect_delay_secs: 3,
            send_cooldown_secs: 60,
            launch_guard_secs: 30,
            status_policy: StatusPolicy::default(),
            disconnect_chat_on_close: false,
            invite_template: "Party up! {main}{sub} room {room}, {mode}. Join us!".to_string(),
            main_channels: strings(&["Asia", "Europe", "America"]),
            sub_channels: strings(&["-1", "-2", "-3", "-4"]),
            game_modes: strings(&["Battle", "Team battle", "Survival", "Free mode"]),
        }
    }
}

impl AppConfig {
    pub fn load_or_create_in(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).context("create app data dir")?;
        let path = dir.join("config.json");
        if path.exists() {
            let raw = fs::read_to_string(&path).context("read app config")?;
            let mut config: AppConfig = serde_json::from_str(&raw).context("parse app config")?;
            if config.categories.is_empty() {
                config.categories = AppConfig::default().categories;
                config.save_in(dir)?;
            }
            return Ok(config);
        }

        let config = AppConfig::default();
        config.save_in(dir)?;
        Ok(config)
    }

    pub fn save_in(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).context("create app data dir")?;
        let raw = serde_json::to_string_pretty(self).context("serialize app config")?;
        fs::write(dir.join("config.json"), raw).context("write app config")?;
        Ok(())
    }

    pub fn chat_settings(&self) -> ChatSettings {
        ChatSettings {
            url: self.chat_url.clone(),
            reconnect_delay: Duration::from_secs(self.reconnect_delay_secs),
            cooldown_secs: self.send_cooldown_secs,
            invite_template: self.invite_template.clone(),
        }
    }
}

/// String-keyed client state persisted between runs.
#[derive(Debug, Clone)]
pub struct LocalStore {
    path: Option<PathBuf>,
    entries: BTreeMap<String, String>,
}

impl LocalStore {
    /// A missing or unreadable file starts an empty store.
    pub fn open_in(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).context("create app data dir")?;
        let path = dir.join("local_state.json");
        let entries = fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        Ok(Self {
            path: Some(path),
            entries,
        })
    }

    /// Store that never touches disk.
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        let Some(path) = &self.path else {
            return Ok(());
        };
        let raw = serde_json::to_string_pretty(&self.entries).context("serialize local state")?;
        fs::write(path, raw).context("write local state")?;
        Ok(())
    }

    pub fn chat_profile(&self) -> ChatProfile {
        self.get(CHAT_PROFILE_KEY)
            .and_then(|raw| serde_json::from_str::<ChatProfile>(raw).ok())
            .map(ChatProfile::normalized)
            .unwrap_or_else(ChatProfile::generated)
    }

    /// Normalizes and writes the profile. Returns what was stored.
    pub fn save_chat_profile(&mut self, profile: ChatProfile) -> Result<ChatProfile> {
        let profile = profile.normalized();
        let raw = serde_json::to_string(&profile).context("serialize chat profile")?;
        self.set(CHAT_PROFILE_KEY, raw)?;
        Ok(profile)
    }
}

pub fn base_data_dir() -> Result<PathBuf> {
    let base = BaseDirs::new().context("resolve home dir")?;
    Ok(base.data_local_dir().join("twcompanion"))
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::Gender;

    #[test]
    fn config_is_created_with_defaults_and_fills_missing_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let created = AppConfig::load_or_create_in(dir.path()).expect("create");
        assert_eq!(created, AppConfig::default());
        assert!(dir.path().join("config.json").exists());

        fs::write(
            dir.path().join("config.json"),
            r#"{"backend_url":"http://10.0.0.2:9000","status_policy":"discard_stale"}"#,
        )
        .expect("write");
        let loaded = AppConfig::load_or_create_in(dir.path()).expect("load");
        assert_eq!(loaded.backend_url, "http://10.0.0.2:9000");
        assert_eq!(loaded.status_policy, StatusPolicy::DiscardStale);
        assert_eq!(loaded.send_cooldown_secs, 60);
        assert_eq!(loaded.categories.len(), 4);
    }

    #[test]
    fn missing_or_corrupt_profile_yields_generated_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LocalStore::open_in(dir.path()).expect("open");
        let profile = store.chat_profile();
        assert!(profile.nickname.starts_with("Player"));
        assert_eq!(profile.gender, Gender::Male);

        let mut store = LocalStore::open_in(dir.path()).expect("open");
        store
            .set(CHAT_PROFILE_KEY, "{not json".to_string())
            .expect("set");
        assert!(store.chat_profile().nickname.starts_with("Player"));
    }

    #[test]
    fn saved_profile_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = LocalStore::open_in(dir.path()).expect("open");
        let saved = store
            .save_chat_profile(ChatProfile {
                nickname: "  Mika ".to_string(),
                avatar_url: String::new(),
                gender: Gender::Female,
                hide_avatar: true,
            })
            .expect("save");
        assert_eq!(saved.nickname, "Mika");

        let reopened = LocalStore::open_in(dir.path()).expect("reopen");
        assert_eq!(reopened.chat_profile(), saved);
        let raw = reopened.get(CHAT_PROFILE_KEY).expect("raw");
        assert!(raw.contains("\"hideAvatar\":true"));
    }
}
