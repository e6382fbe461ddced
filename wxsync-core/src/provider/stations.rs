//! Surface-observation station feed (GeoJSON, one feature per station).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    FetchError,
    model::{Coordinate, StationObservation},
    provider::{Provider, ProviderId, get_json, lenient},
};

#[derive(Debug, Clone)]
pub struct StationFeedProvider {
    http: Client,
    url: String,
}

impl StationFeedProvider {
    pub fn new(http: Client, url: String) -> Self {
        Self { http, url }
    }
}

#[async_trait]
impl Provider for StationFeedProvider {
    type Output = Vec<StationObservation>;

    fn id(&self) -> ProviderId {
        ProviderId::Stations
    }

    async fn fetch(&self, _at: Coordinate) -> Result<Self::Output, FetchError> {
        let parsed: FeedResponse = get_json(&self.http, self.id(), &self.url, &[]).await?;
        Ok(parsed.into_observations())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct FeedResponse {
    #[serde(default)]
    features: Vec<FeedFeature>,
}

#[derive(Debug, Deserialize)]
struct FeedFeature {
    #[serde(default)]
    properties: Option<FeedProperties>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct FeedProperties {
    #[serde(default, deserialize_with = "lenient::text")]
    station_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    icao: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    longitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text")]
    weather: Option<String>,
    #[serde(default, rename = "SKY_CONDTN", deserialize_with = "lenient::text")]
    sky_condition: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    temp: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    dewpoint: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    wind_direct: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    wind_speed: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    wind_gust: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    sea_level_press: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    r_humidity: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    visibility: Option<f64>,
}

impl FeedResponse {
    /// Features without properties are dropped; everything else is kept, even
    /// with missing coordinates, so the selector can rank it as unreachable.
    pub(crate) fn into_observations(self) -> Vec<StationObservation> {
        self.features
            .into_iter()
            .filter_map(|f| f.properties)
            .map(|p| {
                let id = p.icao.clone().unwrap_or_default();
                StationObservation {
                    name: p.station_name.unwrap_or_else(|| id.clone()),
                    id,
                    latitude: p.latitude,
                    longitude: p.longitude,
                    weather: p.weather,
                    sky_condition: p.sky_condition,
                    temperature: p.temp,
                    dew_point: p.dewpoint,
                    wind_direction: p.wind_direct,
                    wind_speed: p.wind_speed,
                    wind_gust: p.wind_gust,
                    pressure: p.sea_level_press,
                    humidity: p.r_humidity,
                    visibility: p.visibility,
                }
            })
            .collect()
    }
}
