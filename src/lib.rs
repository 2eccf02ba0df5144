use anyhow::{anyhow, Result};
use std::path::Path;
use std::time::Duration;
use tracing::{error, info, warn};

pub mod engine;
pub mod error;
pub mod extract;
pub mod format;
pub mod logging;
pub mod ocr;
pub mod pipeline;
pub mod settings;
pub mod telegram;
pub mod translate;

pub use extract::{ExtractionResult, ImageRef, InboundMessage};
pub use format::FormatBudget;
pub use pipeline::{Pipeline, RelayTarget};
pub use translate::{TranslationOutcome, Translator};

#[derive(Debug, Clone)]
pub struct Config {
    pub token: Option<String>,
    pub channel: Option<i64>,
    pub lang: Option<String>,
    pub settings_path: Option<String>,
}

/// Build the relay from configuration and drive the long-poll loop.
/// Runs until the process is stopped.
pub async fn run(config: Config) -> Result<()> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;

    let token = config
        .token
        .or_else(|| get_env("TELEGRAM_BOT_TOKEN"))
        .or_else(|| settings.bot_token.clone())
        .ok_or_else(|| {
            anyhow!("bot token not configured (use --token, TELEGRAM_BOT_TOKEN, or settings)")
        })?;
    let channel_id = config
        .channel
        .or(settings.channel_id)
        .ok_or_else(|| anyhow!("destination channel id not configured (use --channel or settings)"))?;
    let target_lang = config.lang.unwrap_or_else(|| settings.target_lang.clone());

    let client = telegram::TelegramClient::new(token);
    let translator = Translator::new(engine::GoogleTranslate::new(), target_lang);
    let ocr = ocr::TesseractOcr::new(settings.ocr_languages.clone());
    let budget = FormatBudget {
        max_length: settings.max_caption_length,
        marker: settings.truncation_marker.clone(),
    };
    let pipeline = Pipeline::new(
        client.clone(),
        ocr,
        translator,
        client.clone(),
        RelayTarget { channel_id, budget },
    );

    info!("bot started, waiting for forwarded messages");
    let mut offset = None;
    loop {
        match client.get_updates(offset).await {
            Ok((updates, next_offset)) => {
                offset = next_offset;
                for update in updates {
                    let Some(inbound) =
                        telegram::inbound_from_update(update, &settings.unknown_channel_name)
                    else {
                        continue;
                    };
                    // One message at a time; the next update waits for
                    // this one to finish.
                    if let Err(err) = pipeline.handle_message(&inbound).await {
                        error!("dropped message from chat {}: {}", inbound.chat_id, err);
                    }
                }
            }
            Err(err) => {
                warn!("getUpdates failed: {}", err);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    }
}

fn get_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}
