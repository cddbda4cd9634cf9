mod common;

use serde_json::json;
use untzine::{
    error::Error,
    registry::{ProviderRegistry, Registration, builtin_registrations},
};

use common::{AlphaBuilder, BetaBuilder, ImpostorBuilder, VALID_TOKEN};

fn stub_registrations() -> Vec<Registration> {
    vec![
        Registration::of(AlphaBuilder::default()),
        Registration::of(BetaBuilder),
    ]
}

#[tokio::test]
async fn test_missing_configuration_is_isolated() {
    let config = json!({ "alpha": { "token": VALID_TOKEN } });
    let registry = ProviderRegistry::load(&config, stub_registrations()).await;

    let loaded = registry.loaded_providers();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].identity(), "Alpha");

    let descriptions = registry.all_descriptions();
    assert_eq!(descriptions.len(), 2);

    assert_eq!(descriptions[0].name(), "Alpha");
    assert!(descriptions[0].is_loaded());

    assert_eq!(descriptions[1].name(), "Beta");
    assert!(!descriptions[1].is_loaded());
    let message = descriptions[1].error().unwrap().to_string();
    assert!(message.contains("beta"), "message was: {message}");
}

#[tokio::test]
async fn test_invalid_credentials_are_isolated() {
    let config = json!({
        "alpha": { "token": "wrong" },
        "beta": { "token": VALID_TOKEN },
    });
    let registry = ProviderRegistry::load(&config, stub_registrations()).await;

    let loaded = registry.loaded_providers();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].identity(), "Beta");

    match registry.all_descriptions()[0].error() {
        Some(Error::ProviderLoad { provider, reason }) => {
            assert_eq!(provider, "Alpha");
            assert!(reason.contains("invalid credentials"));
        }
        _ => panic!("Alpha should have failed to load"),
    }
}

#[tokio::test]
async fn test_malformed_section_is_recorded() {
    let config = json!({
        "alpha": { "unexpected": 1 },
        "beta": { "token": VALID_TOKEN },
    });
    let registry = ProviderRegistry::load(&config, stub_registrations()).await;

    assert!(!registry.all_descriptions()[0].is_loaded());
    assert!(registry.by_name("Beta").is_some());
}

#[tokio::test]
async fn test_registry_loads_even_when_everything_fails() {
    let registry = ProviderRegistry::load(&json!({}), stub_registrations()).await;

    assert!(registry.loaded_providers().is_empty());
    assert!(registry.first_loaded().is_none());
    assert_eq!(registry.all_descriptions().len(), 2);
    assert!(registry.all_descriptions().iter().all(|d| !d.is_loaded()));
}

#[tokio::test]
async fn test_lookup_by_name_and_order() {
    let config = json!({
        "ALPHA": { "token": VALID_TOKEN },
        "beta": { "token": VALID_TOKEN },
    });
    let registry = ProviderRegistry::load(&config, stub_registrations()).await;

    let names: Vec<String> = registry
        .loaded_providers()
        .iter()
        .map(|p| p.identity().to_string())
        .collect();
    assert_eq!(names, ["Alpha", "Beta"]);

    assert_eq!(registry.first_loaded().unwrap().identity(), "Alpha");
    assert_eq!(registry.by_name("Beta").unwrap().identity(), "Beta");
    assert!(registry.by_name("Gamma").is_none());
}

#[tokio::test]
async fn test_duplicate_identity_is_rejected() {
    let config = json!({
        "alpha": { "token": VALID_TOKEN },
        "beta": { "token": VALID_TOKEN },
    });
    let registry = ProviderRegistry::load(
        &config,
        vec![
            Registration::of(AlphaBuilder::default()),
            Registration::of(ImpostorBuilder),
        ],
    )
    .await;

    assert_eq!(registry.loaded_providers().len(), 1);
    let impostor = &registry.all_descriptions()[1];
    assert_eq!(impostor.name(), "Impostor");
    assert!(impostor.error().unwrap().to_string().contains("already used"));
}

#[tokio::test]
async fn test_builtin_providers_without_configuration() {
    let registrations = builtin_registrations();
    let keys: Vec<&str> = registrations.iter().map(|r| r.key()).collect();
    assert_eq!(keys, ["deezer", "spotify"]);

    let registry = ProviderRegistry::load(&json!({}), registrations).await;
    assert!(registry.loaded_providers().is_empty());

    for description in registry.all_descriptions() {
        let message = description.error().unwrap().to_string();
        assert!(message.contains("is not defined in configuration"));
    }
}

#[tokio::test]
async fn test_builtin_providers_reject_empty_credentials() {
    let config = json!({
        "deezer": { "arl": "" },
        "spotify": { "client_id": "" },
    });
    let registry = ProviderRegistry::load(&config, builtin_registrations()).await;

    assert!(registry.loaded_providers().is_empty());
    let deezer = registry.all_descriptions()[0].error().unwrap().to_string();
    assert!(deezer.contains("No logging configuration"));
}
