use std::sync::Arc;

use axum::{Extension, response::Json};
use serde_json::{Value, json};

use crate::management::RequestManager;

pub async fn providers(Extension(manager): Extension<Arc<RequestManager>>) -> Json<Value> {
    let providers: Vec<Value> = manager
        .registry()
        .all_descriptions()
        .iter()
        .map(|description| match description.provider() {
            Some(provider) => json!({
                "name": description.name(),
                "loaded": true,
                "account": provider.account_type().to_string(),
                "formats": provider
                    .available_formats()
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>(),
            }),
            None => json!({
                "name": description.name(),
                "loaded": false,
                "error": description.error().map(ToString::to_string),
            }),
        })
        .collect();

    Json(json!({ "providers": providers }))
}
