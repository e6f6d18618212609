//! Passthroughs to the public book catalog and the weather service.

pub mod error;
pub mod gateway;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use shelf_http::error::AppError;
use shelf_kernel::{settings::ExternalSettings, InitCtx, Module};

pub use error::GatewayError;
pub use gateway::{Gateway, Location, Weather};

const SEARCH_FAILED: &str = "Error fetching from OpenLibrary API";
const SEARCH_TIMED_OUT: &str = "OpenLibrary API request timed out";
const WEATHER_FAILED: &str = "Error fetching weather data";
const WEATHER_TIMED_OUT: &str = "Weather service request timed out";

pub struct ExternalModule {
    gateway: Gateway,
}

impl ExternalModule {
    pub fn new(settings: ExternalSettings) -> Result<Self, GatewayError> {
        Ok(Self {
            gateway: Gateway::new(settings)?,
        })
    }
}

#[async_trait]
impl Module for ExternalModule {
    fn name(&self) -> &'static str {
        "external"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let external = &ctx.settings.external;
        if external.weather_api_key.as_deref().unwrap_or_default().is_empty() {
            tracing::warn!(module = self.name(), "no weather API key configured; weather requests will fail");
        }
        tracing::info!(
            module = self.name(),
            catalog = %external.catalog_base_url,
            weather = %external.weather_base_url,
            "external module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/books", get(search_books))
            .route("/weather", get(current_weather))
            .with_state(self.gateway.clone())
    }

    fn openapi(&self) -> Option<Value> {
        Some(openapi_fragment())
    }
}

/// Create the external module from its settings.
pub fn create_module(settings: ExternalSettings) -> anyhow::Result<Arc<dyn Module>> {
    Ok(Arc::new(ExternalModule::new(settings)?))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WeatherParams {
    lat: Option<String>,
    lon: Option<String>,
}

async fn search_books(
    State(gateway): State<Gateway>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, AppError> {
    let body = gateway
        .search(params.q.as_deref())
        .await
        .map_err(|e| e.respond(SEARCH_FAILED, SEARCH_TIMED_OUT))?;
    Ok(Json(body))
}

async fn current_weather(
    State(gateway): State<Gateway>,
    Query(params): Query<WeatherParams>,
) -> Result<Json<Weather>, AppError> {
    let location = gateway.locate(params.lat, params.lon);
    let weather = gateway
        .weather(location)
        .await
        .map_err(|e| e.respond(WEATHER_FAILED, WEATHER_TIMED_OUT))?;
    Ok(Json(weather))
}

fn openapi_fragment() -> Value {
    let failure = json!({
        "description": "Upstream failure or timeout",
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    });

    json!({
        "paths": {
            "/books": {
                "get": {
                    "summary": "Search the public book catalog",
                    "tags": ["External"],
                    "parameters": [{
                        "name": "q",
                        "in": "query",
                        "required": false,
                        "schema": { "type": "string", "default": gateway::DEFAULT_QUERY }
                    }],
                    "responses": {
                        "200": {
                            "description": "Catalog search result, unchanged",
                            "content": { "application/json": { "schema": { "type": "object" } } }
                        },
                        "500": failure.clone()
                    }
                }
            },
            "/weather": {
                "get": {
                    "summary": "Current weather",
                    "tags": ["External"],
                    "parameters": [
                        { "name": "lat", "in": "query", "required": false, "schema": { "type": "string" } },
                        { "name": "lon", "in": "query", "required": false, "schema": { "type": "string" } }
                    ],
                    "responses": {
                        "200": {
                            "description": "Weather readout",
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/Weather" }
                                }
                            }
                        },
                        "500": failure
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Weather": {
                    "type": "object",
                    "properties": {
                        "temperature": { "type": "integer" },
                        "description": { "type": "string" },
                        "icon": { "type": "string" },
                        "location": { "type": "string" }
                    },
                    "required": ["temperature", "description", "icon", "location"]
                }
            }
        }
    })
}
