use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "relay-translator",
    version,
    about = "Relay forwarded Telegram messages to a private channel, translated"
)]
struct Cli {
    /// Bot API token (overrides TELEGRAM_BOT_TOKEN and settings)
    #[arg(short = 't', long = "token")]
    token: Option<String>,

    /// Destination channel id (e.g. -1001234567890)
    #[arg(short = 'c', long = "channel")]
    channel: Option<i64>,

    /// Target language code (default: id)
    #[arg(short = 'l', long = "lang")]
    lang: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    relay_translator::logging::init(cli.verbose)?;

    relay_translator::run(relay_translator::Config {
        token: cli.token,
        channel: cli.channel,
        lang: cli.lang,
        settings_path: cli.read_settings,
    })
    .await
}
