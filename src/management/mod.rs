mod auth;
mod context;
mod manager;
mod preferences;

pub use auth::TokenManager;
pub use context::TrackSearchContext;
pub use context::decode_token;
pub use context::encode_token;
pub use manager::Download;
pub use manager::RequestManager;
pub use manager::download_filename;
pub use preferences::PREFERENCES_COOKIE;
pub use preferences::RequestPreferences;
