use axum::{
    http::{HeaderMap, StatusCode, header::COOKIE},
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::{
    error::Error,
    management::{PREFERENCES_COOKIE, RequestPreferences},
    utils,
};

/// HTTP status answered for each error kind.
pub fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::TokenDecode(_) => StatusCode::BAD_REQUEST,
        Error::TokenResolution(_) | Error::NoProviderAvailable(_) | Error::NotFound(_) => {
            StatusCode::NOT_FOUND
        }
        Error::Authorization(_) => StatusCode::FORBIDDEN,
        Error::Unavailable(_) => StatusCode::CONFLICT,
        Error::NoAcceptableFormat { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        Error::Transport { .. } | Error::TransientTransport(_) | Error::Vendor(_) => {
            StatusCode::BAD_GATEWAY
        }
        Error::ProviderLoad { .. }
        | Error::Tagging(_)
        | Error::Configuration(_)
        | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Preferences carried by the request cookie, defaults when absent.
pub fn request_preferences(headers: &HeaderMap) -> RequestPreferences {
    let cookie = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|header| utils::parse_cookie(header, PREFERENCES_COOKIE));

    RequestPreferences::from_cookie(cookie.as_deref())
}
