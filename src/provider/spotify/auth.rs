use std::{sync::Arc, time::Duration};

use chrono::Utc;
use reqwest::{Client, Url};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::{
    error::{Error, Result},
    server::start_callback_server,
    types::{PkceToken, Token},
    utils, warning,
};

const AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";
pub const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const SCOPE: &str = "user-read-email user-read-private streaming";

/// Everything the PKCE flow needs to know about the registered application.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub client_id: String,
    pub redirect_uri: String,
    pub server_addr: String,
}

/// Runs the OAuth 2.0 PKCE flow in the user's browser.
///
/// 1. Generates the code verifier and its S256 challenge
/// 2. Starts the local callback server
/// 3. Opens the authorization URL (or prints it when no browser is available)
/// 4. Waits up to 60 seconds for the callback to exchange the code
pub async fn auth(settings: AuthSettings) -> Result<Token> {
    let code_verifier = utils::generate_code_verifier();
    let code_challenge = utils::generate_code_challenge(&code_verifier);

    let shared_state: Arc<Mutex<Option<PkceToken>>> = Arc::new(Mutex::new(Some(PkceToken {
        code_verifier,
        client_id: settings.client_id.clone(),
        redirect_uri: settings.redirect_uri.clone(),
        token: None,
    })));

    let server_state = Arc::clone(&shared_state);
    let server_addr = settings.server_addr.clone();
    let server = tokio::spawn(async move {
        if let Err(e) = start_callback_server(server_state, &server_addr).await {
            warning!("Callback server stopped: {}", e);
        }
    });

    let auth_url = Url::parse_with_params(
        AUTHORIZE_URL,
        &[
            ("client_id", settings.client_id.as_str()),
            ("response_type", "code"),
            ("redirect_uri", settings.redirect_uri.as_str()),
            ("code_challenge", code_challenge.as_str()),
            ("code_challenge_method", "S256"),
            ("scope", SCOPE),
        ],
    )
    .map_err(|e| Error::Configuration(e.to_string()))?
    .to_string();

    if webbrowser::open(&auth_url).is_err() {
        warning!(
            "Failed to open browser. Please navigate to the following URL manually:\n{}",
            auth_url
        )
    }

    let token = wait_for_token(shared_state).await;
    server.abort();

    token.ok_or_else(|| Error::Authorization("Authentication failed or timed out.".to_string()))
}

async fn wait_for_token(shared_state: Arc<Mutex<Option<PkceToken>>>) -> Option<Token> {
    use std::time::Instant;

    let max_wait = Duration::from_secs(60);
    let start = Instant::now();

    while start.elapsed() < max_wait {
        let lock = shared_state.lock().await;
        if let Some(token) = lock.as_ref().and_then(|p| p.token.as_ref()) {
            return Some(token.clone());
        }
        drop(lock);
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    None
}

/// Trades a refresh token for a fresh access token.
pub async fn refresh_token(client: &Client, client_id: &str, refresh_token: &str) -> Result<Token> {
    refresh_token_at(client, TOKEN_URL, client_id, refresh_token).await
}

/// [`refresh_token`] against another token endpoint.
pub async fn refresh_token_at(
    client: &Client,
    token_url: &str,
    client_id: &str,
    refresh_token: &str,
) -> Result<Token> {
    let res = client
        .post(token_url)
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", client_id),
        ])
        .send()
        .await
        .map_err(Error::from_http)?
        .error_for_status()
        .map_err(Error::from_http)?;

    let json: Value = res.json().await.map_err(Error::from_http)?;
    token_from_json(&json, Some(refresh_token))
}

/// Completes the PKCE flow by exchanging the authorization code.
pub async fn exchange_code_pkce(
    client: &Client,
    client_id: &str,
    redirect_uri: &str,
    code: &str,
    verifier: &str,
) -> Result<Token> {
    let res = client
        .post(TOKEN_URL)
        .form(&[
            ("grant_type", "authorization_code"),
            ("client_id", client_id),
            ("code", code),
            ("code_verifier", verifier),
            ("redirect_uri", redirect_uri),
        ])
        .send()
        .await
        .map_err(Error::from_http)?
        .error_for_status()
        .map_err(Error::from_http)?;

    let json: Value = res.json().await.map_err(Error::from_http)?;
    token_from_json(&json, None)
}

/// Builds a [`Token`] from a token endpoint answer.
///
/// Spotify may omit `refresh_token` on refresh, in which case the previous
/// one stays valid.
pub fn token_from_json(json: &Value, previous_refresh: Option<&str>) -> Result<Token> {
    let access_token = json["access_token"]
        .as_str()
        .ok_or_else(|| Error::Authorization(format!("token endpoint refused: {json}")))?;

    let refresh_token = json["refresh_token"]
        .as_str()
        .or(previous_refresh)
        .unwrap_or_default();

    Ok(Token {
        access_token: access_token.to_string(),
        refresh_token: refresh_token.to_string(),
        scope: json["scope"].as_str().unwrap_or_default().to_string(),
        expires_in: json["expires_in"].as_u64().unwrap_or(3600),
        obtained_at: Utc::now().timestamp() as u64,
    })
}
