use thiserror::Error;

/// Errors that stop the monitor from starting.
///
/// Failures inside a round (timeouts, refused connections, webhook errors)
/// never end up here, they are logged where they happen.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config file: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("send_alerts is on but no webhook_url or WEBHOOK_URL is set: {0}")]
    MissingWebhook(#[from] dotenvy::Error),
    #[error("Invalid webhook URL: {0}")]
    WebhookUrl(#[from] url::ParseError),
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Logger setup error: {0}")]
    Logger(#[from] log::SetLoggerError),
}
