//! # API Module
//!
//! HTTP endpoints of `untzine serve` and of the OAuth callback listener.
//!
//! ## Endpoints
//!
//! - [`health`] - status and version
//! - [`providers`] - every registered provider with its load outcome
//! - [`search`] - `?search_terms=`; results carry their search context token
//! - [`download`] - `?track=<token>`; the audio as an attachment
//! - [`preferences`] - form `quality`, `provider_name`; stored in the
//!   `untzine_preferences` cookie
//! - [`callback`] - Spotify PKCE code exchange
//!
//! Preferences are read from the cookie on every request; there is no
//! server side session. Errors are answered with a JSON body and the status
//! from [`status_for`].

mod callback;
mod download;
mod health;
mod preferences;
mod providers;
mod response;
mod search;

pub use callback::callback;
pub use download::download;
pub use health::health;
pub use preferences::preferences;
pub use providers::providers;
pub use response::{ApiError, request_preferences, status_for};
pub use search::search;
