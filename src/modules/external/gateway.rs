//! Outbound calls to the book catalog and the weather service.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shelf_kernel::settings::ExternalSettings;

use super::error::GatewayError;

/// Query used when a search arrives without one.
pub const DEFAULT_QUERY: &str = "javascript";

/// Where to ask for the weather.
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    Coordinates { lat: String, lon: String },
    Named(String),
}

/// Weather readout returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weather {
    /// Degrees Fahrenheit, rounded
    pub temperature: i64,
    pub description: String,
    pub icon: String,
    pub location: String,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    main: Readings,
    weather: Vec<Condition>,
    name: String,
}

#[derive(Debug, Deserialize)]
struct Readings {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
    icon: String,
}

impl TryFrom<CurrentWeather> for Weather {
    type Error = GatewayError;

    fn try_from(current: CurrentWeather) -> Result<Self, Self::Error> {
        let condition = current
            .weather
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::UnexpectedShape("empty weather list".to_string()))?;

        Ok(Weather {
            temperature: current.main.temp.round() as i64,
            description: condition.description,
            icon: condition.icon,
            location: current.name,
        })
    }
}

/// Thin client for both upstreams. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Gateway {
    client: Client,
    settings: Arc<ExternalSettings>,
}

impl Gateway {
    pub fn new(settings: ExternalSettings) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .user_agent(concat!("shelf/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(GatewayError::Request)?;

        Ok(Self {
            client,
            settings: Arc::new(settings),
        })
    }

    /// Search the catalog and return its JSON body unchanged.
    #[tracing::instrument(skip(self))]
    pub async fn search(&self, query: Option<&str>) -> Result<Value, GatewayError> {
        let query = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .unwrap_or(DEFAULT_QUERY);
        let url = endpoint(&self.settings.catalog_base_url, "search.json", &[("q", query)])?;
        let timeout = Duration::from_millis(self.settings.search_timeout_ms);

        tracing::info!(query, "searching catalog");
        self.get_json(url, timeout).await
    }

    /// Current conditions at `location`, in imperial units.
    #[tracing::instrument(skip(self))]
    pub async fn weather(&self, location: Location) -> Result<Weather, GatewayError> {
        let api_key = self
            .settings
            .weather_api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(GatewayError::MissingApiKey)?;

        let mut params = match &location {
            Location::Coordinates { lat, lon } => vec![("lat", lat.as_str()), ("lon", lon.as_str())],
            Location::Named(name) => vec![("q", name.as_str())],
        };
        params.push(("units", "imperial"));
        params.push(("appid", api_key));

        let url = endpoint(&self.settings.weather_base_url, "data/2.5/weather", &params)?;
        let timeout = Duration::from_millis(self.settings.weather_timeout_ms);

        let body = self.get_json(url, timeout).await?;
        let current: CurrentWeather = serde_json::from_value(body)
            .map_err(|e| GatewayError::UnexpectedShape(e.to_string()))?;
        Weather::try_from(current)
    }

    /// Resolve the query parameters a client sent into a location; only a
    /// complete coordinate pair counts.
    pub fn locate(&self, lat: Option<String>, lon: Option<String>) -> Location {
        match (non_empty(lat), non_empty(lon)) {
            (Some(lat), Some(lon)) => Location::Coordinates { lat, lon },
            _ => Location::Named(self.settings.default_location.clone()),
        }
    }

    async fn get_json(&self, url: Url, timeout: Duration) -> Result<Value, GatewayError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| GatewayError::from_request(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status(status));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| {
                if e.is_decode() {
                    GatewayError::UnexpectedShape(e.to_string())
                } else {
                    GatewayError::from_request(e, timeout)
                }
            })
    }
}

fn endpoint(base: &str, path: &str, params: &[(&str, &str)]) -> Result<Url, GatewayError> {
    let raw = format!("{}/{}", base.trim_end_matches('/'), path);
    Url::parse_with_params(&raw, params).map_err(|e| GatewayError::InvalidUrl(format!("{raw}: {e}")))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
