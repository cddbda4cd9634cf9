use std::path::{Path, PathBuf};

use futures::{AsyncWriteExt, StreamExt};

use crate::{
    audio::AudioQuality,
    cli::{load_manager, spinner},
    error,
    error::Result,
    management::{Download, RequestPreferences, TrackSearchContext},
    success, utils,
};

pub async fn download(
    token: &str,
    quality: Option<AudioQuality>,
    output: Option<PathBuf>,
    config_path: &Path,
) {
    let manager = load_manager(config_path).await;
    let preferences = RequestPreferences::new(quality.unwrap_or_else(AudioQuality::highest), None);

    let context = match TrackSearchContext::from_token(token, manager.registry()) {
        Ok(context) => context,
        Err(e) => error!("Cannot use this track token. Err: {}", e),
    };

    let pb = spinner(&format!(
        "Downloading '{}' from {}...",
        context.trackinfo.title,
        context.provider_name()
    ));

    let download = match manager.download(&context, &preferences).await {
        Ok(download) => download,
        Err(e) => {
            pb.finish_and_clear();
            error!("Download failed. Err: {}", e)
        }
    };

    let dir = output.unwrap_or_else(|| PathBuf::from("."));
    let path = dir.join(utils::sanitize_filename(&download.filename));

    let written = write_to_file(download, &path, |total| {
        pb.set_message(format!("Downloaded {} KiB", total / 1024));
    })
    .await;
    pb.finish_and_clear();

    match written {
        Ok(total) => success!("Saved {} ({} KiB)", path.display(), total / 1024),
        Err(e) => {
            let _ = async_fs::remove_file(&path).await;
            error!("Download failed. Err: {}", e)
        }
    }
}

async fn write_to_file<F: Fn(u64)>(download: Download, path: &Path, progress: F) -> Result<u64> {
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent).await?;
    }

    let mut file = async_fs::File::create(path).await?;
    let mut stream = download.stream;
    let mut total = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        total += chunk.len() as u64;
        progress(total);
    }

    file.flush().await?;
    Ok(total)
}
