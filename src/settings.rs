use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Settings {
    pub bot_token: Option<String>,
    pub channel_id: Option<i64>,
    pub target_lang: String,
    pub max_caption_length: usize,
    pub truncation_marker: String,
    pub unknown_channel_name: String,
    pub ocr_languages: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bot_token: None,
            channel_id: None,
            target_lang: "id".to_string(),
            max_caption_length: 1024,
            truncation_marker: "...(truncated)".to_string(),
            unknown_channel_name: "Unknown Channel".to_string(),
            ocr_languages: "eng".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    telegram: Option<TelegramSettings>,
    relay: Option<RelaySettings>,
    ocr: Option<OcrSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct TelegramSettings {
    token: Option<String>,
    channel_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct RelaySettings {
    target_lang: Option<String>,
    max_caption_length: Option<usize>,
    truncation_marker: Option<String>,
    unknown_channel_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OcrSettings {
    languages: Option<String>,
}

/// Load settings from `settings.toml` and `settings.local.toml` in the
/// working directory, then an optional extra file; later files win.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }

    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(telegram) = incoming.telegram {
            if let Some(token) = telegram.token {
                if !token.trim().is_empty() {
                    self.bot_token = Some(token);
                }
            }
            if let Some(channel_id) = telegram.channel_id {
                self.channel_id = Some(channel_id);
            }
        }
        if let Some(relay) = incoming.relay {
            if let Some(lang) = relay.target_lang {
                if !lang.trim().is_empty() {
                    self.target_lang = lang;
                }
            }
            if let Some(max) = relay.max_caption_length {
                if max > 0 {
                    self.max_caption_length = max;
                }
            }
            if let Some(marker) = relay.truncation_marker {
                self.truncation_marker = marker;
            }
            if let Some(name) = relay.unknown_channel_name {
                if !name.trim().is_empty() {
                    self.unknown_channel_name = name;
                }
            }
        }
        if let Some(ocr) = incoming.ocr {
            if let Some(languages) = ocr.languages {
                if !languages.trim().is_empty() {
                    self.ocr_languages = languages;
                }
            }
        }
    }
}
