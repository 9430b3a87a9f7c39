use anyhow::{Context, Result};
use std::time::Duration;

use hue_credentials::auth::{
    CredentialManager, HueTokenIssuer, LightId, OAuthClient, Session, Token, TokenPair,
};
use hue_credentials::config::{Command, Config};
use hue_credentials::hue::RemoteClientFactory;
use hue_credentials::store::HttpDocumentStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (for log level)
    let (config, command) = Config::load()?;
    config.validate()?;

    // Initialize logging with a configured level
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Credential store: {}", config.store_url);

    // One pooled HTTP client for the store, the token endpoint, and Hue clients
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_request_timeout))
        .build()
        .context("Failed to create HTTP client")?;

    let store = HttpDocumentStore::with_client(http.clone(), &config.store_url);

    let oauth_client = match (&config.client_id, &config.client_secret) {
        (Some(client_id), Some(client_secret)) => Some(OAuthClient {
            client_id: client_id.clone(),
            client_secret: client_secret.clone(),
        }),
        _ => None,
    };
    let issuer = HueTokenIssuer::new(&config.token_url, oauth_client);

    let manager =
        CredentialManager::new(store, issuer).with_refresh_margin(config.refresh_margin);
    let factory = RemoteClientFactory::new(http);

    match command {
        Command::Init { session } => match manager.initialize(&session, &factory).await? {
            Session::Ready {
                client,
                active_lights,
            } => {
                println!("ready: username={}", client.username());
                println!("active lights: {}", format_lights(&active_lights));
            }
            Session::Expired => {
                println!("expired: refresh token is no longer valid, authenticate again");
            }
        },
        Command::Lights { session } => {
            let lights = manager.get_active_lights(&session).await?;
            println!("{}", format_lights(&lights));
        }
        Command::SetLights { session, lights } => {
            let lights: Vec<LightId> = lights.into_iter().map(LightId::String).collect();
            manager.update_active_lights(&session, &lights).await?;
            println!("active lights updated");
        }
        Command::Create {
            session,
            username,
            access_token,
            access_expires_at,
            refresh_token,
            refresh_expires_at,
        } => {
            let tokens = TokenPair {
                access_token: Token::new(access_token, access_expires_at),
                refresh_token: Token::new(refresh_token, refresh_expires_at),
            };
            manager.create_record(&session, &username, &tokens).await?;
            println!("credential record created");
        }
    }

    Ok(())
}

fn format_lights(lights: &[LightId]) -> String {
    if lights.is_empty() {
        return "(none)".to_string();
    }

    lights
        .iter()
        .map(|light| match light {
            LightId::String(id) => id.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
