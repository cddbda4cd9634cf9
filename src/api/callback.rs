use std::{collections::HashMap, sync::Arc};

use axum::{Extension, extract::Query, response::Html};
use reqwest::Client;
use tokio::sync::Mutex;

use crate::{provider::spotify::auth::exchange_code_pkce, types::PkceToken, warning};

pub async fn callback(
    Query(params): Query<HashMap<String, String>>,
    Extension(shared_state): Extension<Arc<Mutex<Option<PkceToken>>>>,
) -> Html<&'static str> {
    let Some(code) = params.get("code") else {
        if let Some(error) = params.get("error") {
            warning!("Authorization was refused: {}", error);
        }
        return Html("<h4>Missing PKCE token.</h4>");
    };

    let mut state = shared_state.lock().await;
    let Some(pkce_state) = state.as_mut() else {
        return Html("<h4>Missing PKCE code verifier.</h4>");
    };

    let client = Client::new();
    match exchange_code_pkce(
        &client,
        &pkce_state.client_id,
        &pkce_state.redirect_uri,
        code,
        &pkce_state.code_verifier,
    )
    .await
    {
        Ok(token) => {
            pkce_state.token = Some(token);
            Html("<h2>Authentication successful.</h2><p>Close browser window.</p>")
        }
        Err(e) => {
            warning!("Token exchange failed: {}", e);
            Html("<h4>Login failed.</h4>")
        }
    }
}
