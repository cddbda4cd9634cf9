use std::path::Path;

use tabled::Table;

use crate::{
    audio::AudioQuality,
    cli::{load_manager, spinner},
    error,
    management::RequestPreferences,
    success,
    types::TrackTableRow,
    utils, warning,
};

pub async fn search(
    terms: &str,
    provider: Option<String>,
    quality: Option<AudioQuality>,
    config_path: &Path,
) {
    let manager = load_manager(config_path).await;
    let preferences =
        RequestPreferences::new(quality.unwrap_or_else(AudioQuality::highest), provider);

    let pb = spinner(&format!("Searching for '{}'...", terms));
    let results = manager.search(terms, &preferences).await;
    pb.finish_and_clear();

    let contexts = match results {
        Ok(contexts) => contexts,
        Err(e) => error!("Search failed. Err: {}", e),
    };

    if contexts.is_empty() {
        warning!("Nothing found for '{}'", terms);
        return;
    }

    let mut rows = Vec::with_capacity(contexts.len());
    for context in &contexts {
        let token = match context.to_token() {
            Ok(token) => token,
            Err(e) => error!("Cannot encode search result. Err: {}", e),
        };
        let track = &context.trackinfo;
        rows.push(TrackTableRow {
            title: track.title.clone(),
            artists: track.artists_joined(),
            album: track.album.clone(),
            duration: utils::format_duration(track.duration),
            token,
        });
    }

    success!(
        "{} results from {}",
        contexts.len(),
        contexts[0].provider_name()
    );
    println!("{}", Table::new(rows));
}
