use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Url;

use crate::auth::{DEFAULT_REFRESH_MARGIN, DEFAULT_TOKEN_URL, MAX_REFRESH_MARGIN};

/// Hue credentials - session credential lifecycle tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Credential collection URL in the document store
    #[arg(short = 's', long, env = "CREDENTIAL_STORE_URL")]
    pub store_url: Option<String>,

    /// Hue OAuth token endpoint
    #[arg(long, env = "HUE_TOKEN_URL", default_value = DEFAULT_TOKEN_URL)]
    pub token_url: String,

    /// Hue OAuth client id
    #[arg(long, env = "HUE_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Hue OAuth client secret
    #[arg(long, env = "HUE_CLIENT_SECRET")]
    pub client_secret: Option<String>,

    /// Refresh access tokens expiring within this many seconds
    #[arg(long, env = "TOKEN_REFRESH_MARGIN", default_value_t = DEFAULT_REFRESH_MARGIN)]
    pub refresh_margin: i64,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "30")]
    pub http_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Resolve a session into usable credentials, refreshing if needed
    Init { session: String },

    /// Print the active lights stored for a session
    Lights { session: String },

    /// Replace the active lights stored for a session
    SetLights {
        session: String,
        lights: Vec<String>,
    },

    /// Store credentials for a newly authenticated session
    Create {
        session: String,
        username: String,
        access_token: String,
        access_expires_at: i64,
        refresh_token: String,
        refresh_expires_at: i64,
    },
}

#[derive(Clone, Debug)]
pub struct Config {
    // Document store
    pub store_url: String,

    // Token issuer
    pub token_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_margin: i64,

    // HTTP client
    pub http_request_timeout: u64,

    // Logging
    pub log_level: String,
}

impl Config {
    /// Load configuration from all sources with priority: CLI > ENV > defaults
    pub fn load() -> Result<(Self, Command)> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let args = CliArgs::parse();
        let command = args.command.clone();

        Ok((Self::from_args(args)?, command))
    }

    /// Build configuration from parsed arguments
    pub fn from_args(args: CliArgs) -> Result<Self> {
        Ok(Config {
            store_url: args
                .store_url
                .context("CREDENTIAL_STORE_URL is required (use -s or set CREDENTIAL_STORE_URL env var)")?,
            token_url: args.token_url,
            client_id: args.client_id,
            client_secret: args.client_secret,
            refresh_margin: args.refresh_margin,
            http_request_timeout: args.http_timeout,
            log_level: args.log_level,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        validate_http_url("CREDENTIAL_STORE_URL", &self.store_url)?;
        validate_http_url("HUE_TOKEN_URL", &self.token_url)?;

        if self.http_request_timeout == 0 {
            anyhow::bail!("HTTP_REQUEST_TIMEOUT must be greater than zero");
        }

        if !(0..=MAX_REFRESH_MARGIN).contains(&self.refresh_margin) {
            anyhow::bail!(
                "TOKEN_REFRESH_MARGIN must be between 0 and {} seconds",
                MAX_REFRESH_MARGIN
            );
        }

        if self.client_id.is_some() != self.client_secret.is_some() {
            anyhow::bail!("HUE_CLIENT_ID and HUE_CLIENT_SECRET must be set together");
        }

        Ok(())
    }
}

/// Require an absolute http(s) URL
fn validate_http_url(name: &str, value: &str) -> Result<()> {
    let url = Url::parse(value).with_context(|| format!("{} is not a valid URL: {}", name, value))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => anyhow::bail!("{} must use http or https, got {}", name, other),
    }
}
