use std::path::Path;

use tabled::Table;

use crate::{cli::load_manager, types::ProviderTableRow, warning};

pub async fn providers(config_path: &Path) {
    let manager = load_manager(config_path).await;

    let rows: Vec<ProviderTableRow> = manager
        .registry()
        .all_descriptions()
        .iter()
        .map(|description| match description.provider() {
            Some(provider) => ProviderTableRow {
                name: description.name().to_string(),
                status: "loaded".to_string(),
                account: provider.account_type().to_string(),
                formats: provider
                    .available_formats()
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            },
            None => ProviderTableRow {
                name: description.name().to_string(),
                status: description
                    .error()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "failed".to_string()),
                account: "-".to_string(),
                formats: "-".to_string(),
            },
        })
        .collect();

    if manager.registry().loaded_providers().is_empty() {
        warning!("No provider could be loaded, check {}", config_path.display());
    }

    println!("{}", Table::new(rows));
}
