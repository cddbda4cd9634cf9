use std::sync::Arc;

use axum::{
    Extension,
    body::Body,
    extract::Query,
    http::{
        HeaderMap, HeaderValue,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::{
    api::{ApiError, request_preferences},
    management::{RequestManager, TrackSearchContext},
    utils,
};

#[derive(Deserialize)]
pub struct DownloadQuery {
    track: String,
}

pub async fn download(
    Query(query): Query<DownloadQuery>,
    headers: HeaderMap,
    Extension(manager): Extension<Arc<RequestManager>>,
) -> Result<Response, ApiError> {
    let preferences = request_preferences(&headers);
    let context = TrackSearchContext::from_token(&query.track, manager.registry())?;
    let download = manager.download(&context, &preferences).await?;

    let disposition = HeaderValue::from_str(&utils::content_disposition(&download.filename))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    Ok((
        [
            (CONTENT_TYPE, HeaderValue::from_static("application/octet-stream")),
            (CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(download.stream),
    )
        .into_response())
}
