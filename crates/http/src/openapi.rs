//! OpenAPI document assembled from the fragments modules publish.

use serde_json::{json, Map, Value};
use shelf_kernel::ModuleRegistry;

/// Merge every module's fragment into one document.
///
/// Module paths are relative to the module mount point and get prefixed with
/// `/api/{module_name}`; a module path of `/` maps to the bare prefix.
pub fn merged_document(registry: &ModuleRegistry) -> Value {
    let mut paths = Map::new();
    let mut schemas = Map::new();

    paths.insert(
        "/healthz".to_string(),
        json!({
            "get": {
                "summary": "Health check",
                "responses": {
                    "200": {
                        "description": "OK",
                        "content": { "text/plain": { "schema": { "type": "string" } } }
                    }
                }
            }
        }),
    );

    schemas.insert(
        "ErrorResponse".to_string(),
        json!({
            "type": "object",
            "properties": {
                "message": { "type": "string" },
                "error": { "type": "string" }
            },
            "required": ["message"]
        }),
    );

    for module in registry.modules() {
        let Some(fragment) = module.openapi() else {
            continue;
        };

        if let Some(module_paths) = fragment.get("paths").and_then(Value::as_object) {
            for (path, item) in module_paths {
                paths.insert(prefixed(module.name(), path), item.clone());
            }
        }

        if let Some(module_schemas) = fragment
            .pointer("/components/schemas")
            .and_then(Value::as_object)
        {
            for (name, schema) in module_schemas {
                schemas.insert(name.clone(), schema.clone());
            }
        }
    }

    json!({
        "openapi": "3.1.0",
        "info": {
            "title": "Shelf API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Personal book collection with catalog and weather passthroughs"
        },
        "paths": paths,
        "components": { "schemas": schemas }
    })
}

fn prefixed(module_name: &str, path: &str) -> String {
    if path == "/" {
        format!("/api/{}", module_name)
    } else {
        format!("/api/{}{}", module_name, path)
    }
}
