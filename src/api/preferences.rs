use axum::{
    Form,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{LOCATION, SET_COOKIE},
    },
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::{
    api::{ApiError, request_preferences},
    audio::AudioQuality,
    error::Error,
    management::PREFERENCES_COOKIE,
};

#[derive(Deserialize)]
pub struct PreferencesForm {
    quality: u8,
    #[serde(default)]
    provider_name: Option<String>,
}

/// Stores the submitted preferences in the cookie and sends the browser
/// back to the start page.
pub async fn preferences(
    headers: HeaderMap,
    Form(form): Form<PreferencesForm>,
) -> Result<Response, ApiError> {
    let quality = AudioQuality::from_ordinal(form.quality)
        .ok_or_else(|| Error::TokenDecode(format!("unknown quality ordinal {}", form.quality)))?;

    let mut preferences = request_preferences(&headers);
    preferences.update_from_form(quality, form.provider_name.as_deref());

    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        PREFERENCES_COOKIE,
        preferences.to_cookie()
    );
    let cookie = HeaderValue::from_str(&cookie).map_err(|e| Error::Configuration(e.to_string()))?;

    Ok((
        StatusCode::SEE_OTHER,
        [(SET_COOKIE, cookie), (LOCATION, HeaderValue::from_static("/"))],
    )
        .into_response())
}
