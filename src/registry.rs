//! # Provider registry
//!
//! Turns the configuration mapping into live providers. Every known back-end
//! is listed explicitly in [`builtin_registrations`]; each registration pairs
//! a builder with its configuration section key.
//!
//! Loading never fails as a whole. A missing section, a section that does not
//! deserialize, bad credentials or an unreachable back-end are recorded in
//! that provider's [`ProviderDescription`] and the other providers load as
//! usual. The registry is read-only once [`ProviderRegistry::load`] returns.

use std::{collections::HashSet, sync::Arc};

use futures::future::{self, BoxFuture};
use serde_json::Value;

use crate::{
    config,
    error::{Error, Result},
    provider::{
        Provider, ProviderBuilder, ProviderConfiguration, deezer::DeezerBuilder,
        spotify::SpotifyBuilder,
    },
    success, warning,
};

type BuildFn = Box<dyn Fn(Value) -> BoxFuture<'static, Result<Arc<dyn Provider>>> + Send + Sync>;

/// One entry of the registration list: a builder together with the
/// configuration key its section lives under.
pub struct Registration {
    name: &'static str,
    key: &'static str,
    build: BuildFn,
}

impl Registration {
    pub fn of<B: ProviderBuilder>(builder: B) -> Self {
        let builder = Arc::new(builder);

        Registration {
            name: B::NAME,
            key: <B::Configuration as ProviderConfiguration>::KEY,
            build: Box::new(move |section| {
                let builder = Arc::clone(&builder);
                Box::pin(async move {
                    let conf: B::Configuration = serde_json::from_value(section)
                        .map_err(|e| Error::Configuration(e.to_string()))?;
                    builder.build(conf).await
                })
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    fn attempt(&self, config: &Value) -> BoxFuture<'static, Result<Arc<dyn Provider>>> {
        let provider = self.name.to_string();

        let Some(section) = config::section(config, self.key) else {
            let reason = format!("'{}' is not defined in configuration", self.key);
            return Box::pin(future::ready(Err(Error::ProviderLoad { provider, reason })));
        };

        let build = (self.build)(section.clone());
        Box::pin(async move {
            build.await.map_err(|e| match e {
                Error::ProviderLoad { .. } => e,
                other => Error::ProviderLoad {
                    provider,
                    reason: other.to_string(),
                },
            })
        })
    }
}

/// Every back-end shipped with the crate, in lookup order.
pub fn builtin_registrations() -> Vec<Registration> {
    vec![
        Registration::of(DeezerBuilder),
        Registration::of(SpotifyBuilder),
    ]
}

/// Load outcome of one provider.
pub struct ProviderDescription {
    name: String,
    outcome: std::result::Result<Arc<dyn Provider>, Error>,
}

impl ProviderDescription {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_loaded(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn provider(&self) -> Option<&Arc<dyn Provider>> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&Error> {
        self.outcome.as_ref().err()
    }
}

pub struct ProviderRegistry {
    descriptions: Vec<ProviderDescription>,
}

impl ProviderRegistry {
    /// Builds every registered provider concurrently and waits for all of
    /// them. Descriptions keep registration order.
    pub async fn load(config: &Value, registrations: Vec<Registration>) -> Self {
        let attempts = registrations.iter().map(|r| r.attempt(config));
        let outcomes = future::join_all(attempts).await;

        let mut seen = HashSet::new();
        let mut descriptions = Vec::with_capacity(outcomes.len());

        for (registration, outcome) in registrations.iter().zip(outcomes) {
            let name = registration.name().to_string();

            let outcome = match outcome {
                Ok(provider) if !seen.insert(provider.identity().to_string()) => {
                    Err(Error::ProviderLoad {
                        provider: name.clone(),
                        reason: format!(
                            "identity '{}' is already used by another provider",
                            provider.identity()
                        ),
                    })
                }
                other => other,
            };

            match &outcome {
                Ok(provider) => success!(
                    "{} loaded ({} account)",
                    provider.identity(),
                    provider.account_type()
                ),
                Err(e) => warning!("{}", e),
            }

            descriptions.push(ProviderDescription { name, outcome });
        }

        ProviderRegistry { descriptions }
    }

    /// Successfully loaded providers, in registration order.
    pub fn loaded_providers(&self) -> Vec<Arc<dyn Provider>> {
        self.descriptions
            .iter()
            .filter_map(|d| d.provider().cloned())
            .collect()
    }

    /// Load outcome of every registered provider, failed ones included.
    ///
    /// # Returns
    ///
    /// One [`ProviderDescription`] per registration, in registration order.
    /// Failed entries carry the error that prevented the build.
    ///
    /// # Example
    ///
    /// ```ignore
    /// for description in registry.all_descriptions() {
    ///     if let Some(e) = description.error() {
    ///         warning!("{} is unavailable: {}", description.name(), e);
    ///     }
    /// }
    /// ```
    pub fn all_descriptions(&self) -> &[ProviderDescription] {
        &self.descriptions
    }

    /// Finds a loaded provider by its identity.
    ///
    /// # Arguments
    ///
    /// * `name` - Provider identity, compared exactly (e.g. `"Deezer"`)
    ///
    /// # Returns
    ///
    /// The shared provider, or `None` when no loaded provider has that
    /// identity. Providers that failed to load are never returned.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let deezer = registry.by_name("Deezer").ok_or_else(|| {
    ///     Error::NoProviderAvailable("Deezer".to_string())
    /// })?;
    /// ```
    pub fn by_name(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.descriptions
            .iter()
            .filter_map(ProviderDescription::provider)
            .find(|p| p.identity() == name)
            .cloned()
    }

    pub fn first_loaded(&self) -> Option<Arc<dyn Provider>> {
        self.descriptions
            .iter()
            .find_map(|d| d.provider().cloned())
    }
}
