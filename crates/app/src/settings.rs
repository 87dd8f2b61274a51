//! Settings for the `ledger_bot` binary.
//!
//! Read from `config/ledger_bot.toml` (or the file passed with `--config`)
//! and from `LEDGER_BOT__SECTION__KEY` environment variables, which win.

use clap::Parser;
use config::{Config, ConfigBuilder, Environment, File, builder::DefaultState};
use engine::{DEFAULT_CATEGORY_SHEET, Keywords};
use serde::Deserialize;
use thiserror::Error;

const DEFAULT_CONFIG_PATH: &str = "config/ledger_bot";
const ENV_PREFIX: &str = "LEDGER_BOT";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid settings: {0}")]
    Invalid(String),
}

#[derive(Debug, Parser)]
#[command(name = "ledger_bot", disable_version_flag = true)]
struct Args {
    /// Optional config file path (TOML).
    #[arg(long)]
    config: Option<String>,
    /// Override the listening port.
    #[arg(long)]
    port: Option<u16>,
    /// Log replies instead of sending them.
    #[arg(long)]
    debug: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
    pub debug: bool,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            debug: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            bind: None,
            port: 8080,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Line {
    pub channel_secret: String,
    pub access_token: String,
    pub api_url: Option<String>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Sheets,
    /// Process-local store, lost on restart.
    Memory,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Store {
    pub kind: StoreKind,
    pub document_id: String,
    pub access_token: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            kind: StoreKind::default(),
            document_id: String::new(),
            access_token: None,
            base_url: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Ledger {
    pub timezone: String,
    pub category_sheet: String,
    pub keywords: Keywords,
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            category_sheet: DEFAULT_CATEGORY_SHEET.to_string(),
            keywords: Keywords::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    #[serde(default)]
    pub server: Server,
    pub line: Line,
    #[serde(default)]
    pub store: Store,
    #[serde(default)]
    pub ledger: Ledger,
}

impl Settings {
    pub fn load() -> Result<Self, AppError> {
        let args = Args::parse();

        let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
        let builder = Config::builder()
            .add_source(File::with_name(config_path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));
        let mut settings = Self::from_builder(builder)?;

        if let Some(port) = args.port {
            settings.server.port = port;
        }
        if args.debug {
            settings.app.debug = true;
        }

        Ok(settings)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, AppError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.line.channel_secret.is_empty() {
            return Err(AppError::Invalid("line.channel_secret is empty".to_string()));
        }
        if self.store.document_id.is_empty() {
            return Err(AppError::Invalid("store.document_id is empty".to_string()));
        }
        if self.store.kind == StoreKind::Sheets && self.store.access_token.is_none() {
            return Err(AppError::Invalid(
                "store.access_token is required for the sheets store".to_string(),
            ));
        }
        Ok(())
    }
}
