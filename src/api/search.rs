use std::sync::Arc;

use axum::{
    Extension,
    extract::Query,
    http::HeaderMap,
    response::Json,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    api::{ApiError, request_preferences},
    error::Error,
    management::RequestManager,
    types::ArtCover,
    utils,
};

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    search_terms: String,
}

pub async fn search(
    Query(query): Query<SearchQuery>,
    headers: HeaderMap,
    Extension(manager): Extension<Arc<RequestManager>>,
) -> Result<Json<Value>, ApiError> {
    let terms = query.search_terms.trim();
    if terms.is_empty() {
        return Err(Error::NotFound("empty search".to_string()).into());
    }

    let preferences = request_preferences(&headers);
    let contexts = manager.search(terms, &preferences).await?;

    let mut results = Vec::with_capacity(contexts.len());
    for context in &contexts {
        let track = &context.trackinfo;
        results.push(json!({
            "provider": context.provider_name(),
            "title": track.title,
            "artists": track.artists,
            "album": track.album,
            "track_nb": track.track_nb,
            "duration": utils::format_duration(track.duration),
            "explicit": track.explicit,
            "cover": match &track.art_cover {
                Some(ArtCover::Url(url)) => Some(url.clone()),
                _ => None,
            },
            "token": context.to_token()?,
        }));
    }

    Ok(Json(json!({
        "search_terms": terms,
        "quality": preferences.quality.label(),
        "results": results,
    })))
}
