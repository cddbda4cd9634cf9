use std::path::{Path, PathBuf};

use chrono::Utc;
use reqwest::Client;

use crate::{
    config,
    error::{Error, Result},
    provider::spotify::auth,
    types::Token,
    warning,
};

/// Seconds before expiry at which a token is refreshed.
const REFRESH_MARGIN: u64 = 240;

/// Keeps a Spotify token fresh and, when a session file is configured,
/// persisted between runs.
pub struct TokenManager {
    token: Token,
    client_id: String,
    path: Option<PathBuf>,
    token_url: String,
}

impl TokenManager {
    pub fn new(token: Token, client_id: impl Into<String>, path: Option<PathBuf>) -> Self {
        TokenManager {
            token,
            client_id: client_id.into(),
            path,
            token_url: auth::TOKEN_URL.to_string(),
        }
    }

    /// Refreshes against another token endpoint.
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// Starts from a bare refresh token; the first call to
    /// [`get_valid_token`](Self::get_valid_token) refreshes it.
    pub fn from_refresh_token(
        refresh_token: impl Into<String>,
        client_id: impl Into<String>,
        path: Option<PathBuf>,
    ) -> Self {
        let token = Token {
            access_token: String::new(),
            refresh_token: refresh_token.into(),
            scope: String::new(),
            expires_in: 0,
            obtained_at: 0,
        };
        Self::new(token, client_id, path)
    }

    pub async fn load(path: &Path, client_id: impl Into<String>) -> Result<Self> {
        let content = async_fs::read_to_string(path).await?;
        let token: Token = serde_json::from_str(&content)
            .map_err(|e| Error::Configuration(format!("{}: {}", path.display(), e)))?;
        Ok(Self::new(token, client_id, Some(path.to_path_buf())))
    }

    pub async fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(&self.token)
            .map_err(|e| Error::Configuration(e.to_string()))?;
        async_fs::write(path, json).await?;
        Ok(())
    }

    pub async fn get_valid_token(&mut self, client: &Client) -> Result<String> {
        if self.is_expired() {
            self.token = auth::refresh_token_at(
                client,
                &self.token_url,
                &self.client_id,
                &self.token.refresh_token,
            )
            .await?;
            if let Err(e) = self.persist().await {
                warning!("Could not save the refreshed Spotify session: {}", e);
            }
        }

        Ok(self.token.access_token.clone())
    }

    pub fn is_expired(&self) -> bool {
        let now = Utc::now().timestamp() as u64;
        self.token.access_token.is_empty()
            || now >= (self.token.obtained_at + self.token.expires_in).saturating_sub(REFRESH_MARGIN)
    }

    /// Where the session is stored when the configuration does not say.
    pub fn default_path() -> PathBuf {
        config::data_dir().join("spotify-session.json")
    }
}
