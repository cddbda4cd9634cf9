//! Configuration loading.
//!
//! Two layers feed the application:
//!
//! 1. An optional `.env` file in the local data directory
//!    (`~/.local/share/untzine/.env` on Linux), loaded into the process
//!    environment by [`load_env`].
//! 2. The provider configuration mapping consumed by the registry, built by
//!    [`load_configuration`] from an optional JSON file overlaid with
//!    `UNTZINE__<SECTION>__<FIELD>` environment variables. The environment
//!    wins over the file.
//!
//! ```text
//! UNTZINE__DEEZER__ARL=...           -> {"deezer": {"arl": "..."}}
//! UNTZINE__SPOTIFY__LOGIN=...        -> {"spotify": {"login": "..."}}
//! ```

use std::{
    env,
    path::{Path, PathBuf},
};

use serde_json::{Map, Value};

use crate::error::{Error, Result};

pub const ENV_PREFIX: &str = "UNTZINE__";
const ENV_SEPARATOR: &str = "__";
const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:8000";

/// Directory holding `.env`, `config.json` and provider sessions.
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("untzine");
    path
}

/// Loads `<data dir>/.env` into the environment when it exists.
pub async fn load_env() -> Result<()> {
    let dir = data_dir();
    async_fs::create_dir_all(&dir).await?;

    let path = dir.join(".env");
    if path.is_file() {
        dotenv::from_path(&path)
            .map_err(|e| Error::Configuration(format!("{}: {}", path.display(), e)))?;
    }

    Ok(())
}

/// Default location of the JSON configuration file, overridable with
/// `UNTZINE_CONFIG`.
pub fn config_path() -> PathBuf {
    env::var("UNTZINE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| data_dir().join("config.json"))
}

/// Reads the JSON file at `path` (a missing file counts as empty) and
/// overlays the process environment.
pub async fn load_configuration(path: &Path) -> Result<Value> {
    let base = if path.is_file() {
        let content = async_fs::read_to_string(path).await?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Configuration(format!("{}: {}", path.display(), e)))?
    } else {
        Value::Object(Map::new())
    };

    Ok(merge_env(base, env::vars()))
}

/// Overlays `UNTZINE__…` variables onto `config`.
///
/// Segments after the prefix are split on `__` and lower-cased. Missing
/// intermediate objects are created, and a non-object value in the way is
/// replaced by an object.
pub fn merge_env<I>(mut config: Value, vars: I) -> Value
where
    I: IntoIterator<Item = (String, String)>,
{
    if !config.is_object() {
        config = Value::Object(Map::new());
    }

    for (name, value) in vars {
        let Some(rest) = name.strip_prefix(ENV_PREFIX) else {
            continue;
        };

        let segments: Vec<String> = rest
            .split(ENV_SEPARATOR)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
            .collect();

        if let Value::Object(map) = &mut config {
            insert_path(map, &segments, value);
        }
    }

    config
}

fn insert_path(map: &mut Map<String, Value>, path: &[String], value: String) {
    match path {
        [] => {}
        [last] => {
            map.insert(last.clone(), Value::String(value));
        }
        [head, rest @ ..] => {
            let child = map
                .entry(head.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(child) = child {
                insert_path(child, rest, value);
            }
        }
    }
}

/// Looks up a provider section by key, ignoring case. A `null` section
/// counts as absent.
pub fn section<'a>(config: &'a Value, key: &str) -> Option<&'a Value> {
    config
        .as_object()?
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v)
        .filter(|v| !v.is_null())
}

/// Address the HTTP server and the OAuth callback listen on.
pub fn server_addr() -> String {
    env::var("SERVER_ADDRESS").unwrap_or_else(|_| DEFAULT_SERVER_ADDRESS.to_string())
}
