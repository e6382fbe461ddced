use crate::{
    Config, FetchError,
    model::Coordinate,
    provider::{
        alerts::AlertsProvider, geocode::Geocoder, onecall::OneCallProvider,
        outlook::OutlookClient, point_forecast::PointForecastProvider, stations::StationFeedProvider,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::{convert::TryFrom, fmt::Debug, sync::Arc, time::Duration};
use tracing::debug;

pub mod alerts;
pub mod geocode;
pub mod onecall;
pub mod outlook;
pub mod point_forecast;
pub mod stations;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Stations,
    OneCall,
    PointForecast,
    Alerts,
    Outlook,
    Geocoding,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Stations => "stations",
            ProviderId::OneCall => "onecall",
            ProviderId::PointForecast => "pointforecast",
            ProviderId::Alerts => "alerts",
            ProviderId::Outlook => "outlook",
            ProviderId::Geocoding => "geocoding",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[
            ProviderId::Stations,
            ProviderId::OneCall,
            ProviderId::PointForecast,
            ProviderId::Alerts,
            ProviderId::Outlook,
            ProviderId::Geocoding,
        ]
    }

    /// Providers that need a credential before they can be used.
    pub fn requires_api_key(&self) -> bool {
        matches!(self, ProviderId::OneCall)
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        ProviderId::all()
            .iter()
            .copied()
            .find(|id| id.as_str() == lower)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown provider '{value}'. Supported providers: stations, onecall, \
                     pointforecast, alerts, outlook, geocoding."
                )
            })
    }
}

/// One external source keyed by coordinate. Implementations issue a single
/// request and never retry; fallback is the engine's job.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    type Output: Send + 'static;

    fn id(&self) -> ProviderId;

    async fn fetch(&self, at: Coordinate) -> Result<Self::Output, FetchError>;
}

pub type SharedProvider<T> = Arc<dyn Provider<Output = T>>;

/// Every coordinate-keyed client the reconciliation engine draws from.
#[derive(Debug, Clone)]
pub struct ProviderSet {
    pub stations: SharedProvider<Vec<crate::model::StationObservation>>,
    pub one_call: SharedProvider<onecall::OneCallData>,
    pub point_forecast: SharedProvider<point_forecast::PointForecast>,
    pub alerts: SharedProvider<Vec<crate::model::Alert>>,
}

/// Shared HTTP client with the configured timeout and user agent.
pub fn http_client(config: &Config) -> anyhow::Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.network.timeout_seconds))
        .user_agent(config.network.user_agent.clone())
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {e}"))
}

/// Construct every provider client from config.
pub fn providers_from_config(config: &Config) -> anyhow::Result<ProviderSet> {
    let http = http_client(config)?;
    let api_key = config.provider_api_key(ProviderId::OneCall).map(str::to_owned);

    Ok(ProviderSet {
        stations: Arc::new(StationFeedProvider::new(
            http.clone(),
            config.endpoints.station_feed.clone(),
        )),
        one_call: Arc::new(OneCallProvider::new(http.clone(), api_key)),
        point_forecast: Arc::new(PointForecastProvider::new(http.clone())),
        alerts: Arc::new(AlertsProvider::new(http)),
    })
}

pub fn outlook_from_config(config: &Config) -> anyhow::Result<OutlookClient> {
    Ok(OutlookClient::new(
        http_client(config)?,
        config.endpoints.outlook_template.clone(),
    ))
}

pub fn geocoder_from_config(config: &Config) -> anyhow::Result<Geocoder> {
    Ok(Geocoder::new(http_client(config)?))
}

/// Issue one GET, check the status and decode the body as JSON.
pub(crate) async fn get_json<T: DeserializeOwned>(
    http: &Client,
    provider: ProviderId,
    url: &str,
    query: &[(&str, String)],
) -> Result<T, FetchError> {
    debug!(%provider, url, "requesting");

    let res = http
        .get(url)
        .query(query)
        .header("Accept", "application/geo+json, application/json")
        .send()
        .await
        .map_err(|e| FetchError::network(provider, e))?;

    let status = res.status();
    let body = res
        .text()
        .await
        .map_err(|e| FetchError::network(provider, e))?;

    if !status.is_success() {
        return Err(FetchError::Status {
            provider,
            status: status.as_u16(),
            body: truncate_body(&body),
        });
    }

    serde_json::from_str(&body).map_err(|e| FetchError::decode(provider, e))
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

/// RFC 3339 timestamp in UTC; anything unparseable is treated as absent.
pub(crate) fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Deserializers for feeds that mix numbers, numeric strings and nulls.
pub(crate) mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn number<'de, D: Deserializer<'de>>(de: D) -> Result<Option<f64>, D::Error> {
        Ok(to_number(&Value::deserialize(de)?))
    }

    pub fn text<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
        Ok(to_text(&Value::deserialize(de)?))
    }

    pub fn texts<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<Option<String>>, D::Error> {
        Ok(match Value::deserialize(de)? {
            Value::Array(items) => items.iter().map(to_text).collect(),
            _ => Vec::new(),
        })
    }

    pub fn to_number(value: &Value) -> Option<f64> {
        let n = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }?;
        n.is_finite().then_some(n)
    }

    pub fn to_text(value: &Value) -> Option<String> {
        let s = match value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        (!s.is_empty()).then_some(s)
    }
}
