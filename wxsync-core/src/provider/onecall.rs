use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::{
    FetchError,
    model::{Coordinate, HourlyPoint, MinutelyPoint, ProviderReading},
    provider::{Provider, ProviderId, get_json},
    units,
};

const ONE_CALL_URL: &str = "https://api.openweathermap.org/data/3.0/onecall";

pub const SOURCE_LABEL: &str = "OpenWeatherMap";

#[derive(Debug, Clone)]
pub struct OneCallProvider {
    api_key: Option<String>,
    http: Client,
}

impl OneCallProvider {
    pub fn new(http: Client, api_key: Option<String>) -> Self {
        Self { api_key, http }
    }
}

#[async_trait]
impl Provider for OneCallProvider {
    type Output = OneCallData;

    fn id(&self) -> ProviderId {
        ProviderId::OneCall
    }

    async fn fetch(&self, at: Coordinate) -> Result<OneCallData, FetchError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(FetchError::MissingCredential(self.id()))?;

        let parsed: OcResponse = get_json(
            &self.http,
            self.id(),
            ONE_CALL_URL,
            &[
                ("lat", at.latitude.to_string()),
                ("lon", at.longitude.to_string()),
                ("appid", api_key.to_string()),
                ("units", "imperial".to_string()),
            ],
        )
        .await?;

        Ok(parsed.into())
    }
}

/// Normalized one-call payload: °F, mph, hPa, miles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OneCallData {
    pub current: Option<ProviderReading>,
    pub daily: Vec<OneCallDay>,
    pub hourly: Vec<HourlyPoint>,
    pub minutely: Vec<MinutelyPoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OneCallDay {
    pub time: DateTime<Utc>,
    pub temp_max: f64,
    pub temp_min: f64,
    /// Fraction, 0-1.
    pub pop: Option<f64>,
    pub main: String,
    pub description: String,
    pub icon: Option<String>,
}

impl OneCallDay {
    pub fn icon_url(&self) -> Option<String> {
        self.icon
            .as_ref()
            .map(|icon| format!("https://openweathermap.org/img/wn/{icon}@2x.png"))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OcWeather {
    #[serde(default)]
    main: String,
    #[serde(default)]
    description: String,
    icon: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OcCurrent {
    dt: i64,
    sunrise: Option<i64>,
    sunset: Option<i64>,
    temp: Option<f64>,
    feels_like: Option<f64>,
    pressure: Option<f64>,
    humidity: Option<f64>,
    dew_point: Option<f64>,
    uvi: Option<f64>,
    clouds: Option<f64>,
    /// Metres, regardless of the requested unit system.
    visibility: Option<f64>,
    wind_speed: Option<f64>,
    wind_deg: Option<f64>,
    wind_gust: Option<f64>,
    #[serde(default)]
    weather: Vec<OcWeather>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OcMinute {
    dt: i64,
    #[serde(default)]
    precipitation: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OcHour {
    dt: i64,
    temp: f64,
    feels_like: f64,
    #[serde(default)]
    pop: f64,
    #[serde(default)]
    wind_speed: f64,
    wind_gust: Option<f64>,
    #[serde(default)]
    weather: Vec<OcWeather>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OcDayTemp {
    min: f64,
    max: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OcDay {
    dt: i64,
    temp: OcDayTemp,
    pop: Option<f64>,
    #[serde(default)]
    weather: Vec<OcWeather>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OcResponse {
    current: Option<OcCurrent>,
    #[serde(default)]
    minutely: Vec<OcMinute>,
    #[serde(default)]
    hourly: Vec<OcHour>,
    #[serde(default)]
    daily: Vec<OcDay>,
}

impl From<OcCurrent> for ProviderReading {
    fn from(c: OcCurrent) -> Self {
        ProviderReading {
            source: Some(ProviderId::OneCall),
            source_label: Some(SOURCE_LABEL.to_string()),
            condition: c
                .weather
                .first()
                .map(|w| w.description.clone())
                .filter(|d| !d.is_empty()),
            temperature: c.temp,
            dew_point: c.dew_point,
            wind_direction: c.wind_deg,
            wind_speed: c.wind_speed,
            wind_gust: c.wind_gust,
            wind_chill: c.feels_like,
            pressure: c.pressure,
            humidity: c.humidity,
            visibility: c.visibility.map(units::meters_to_miles),
            cloud_cover: c.clouds,
            uv_index: c.uvi,
            sunrise: c.sunrise.and_then(unix_to_utc),
            sunset: c.sunset.and_then(unix_to_utc),
        }
    }
}

impl From<OcResponse> for OneCallData {
    fn from(r: OcResponse) -> Self {
        let current = r.current.and_then(|c| {
            // A zero timestamp marks an empty block in error payloads.
            (c.dt != 0).then(|| ProviderReading::from(c))
        });

        let minutely = r
            .minutely
            .into_iter()
            .filter_map(|m| {
                Some(MinutelyPoint {
                    time: unix_to_utc(m.dt)?,
                    precipitation: m.precipitation,
                })
            })
            .collect();

        let hourly = r
            .hourly
            .into_iter()
            .filter_map(|h| {
                Some(HourlyPoint {
                    time: unix_to_utc(h.dt)?,
                    temperature: h.temp,
                    feels_like: h.feels_like,
                    precip_probability: (h.pop * 100.0).clamp(0.0, 100.0),
                    wind_speed: h.wind_speed,
                    wind_gust: h.wind_gust,
                    condition: h
                        .weather
                        .first()
                        .map(|w| w.main.clone())
                        .unwrap_or_else(|| "Unknown".to_string()),
                })
            })
            .collect();

        let daily = r
            .daily
            .into_iter()
            .filter_map(|d| {
                let weather = d.weather.first();
                Some(OneCallDay {
                    time: unix_to_utc(d.dt)?,
                    temp_max: d.temp.max,
                    temp_min: d.temp.min,
                    pop: d.pop,
                    main: weather.map(|w| w.main.clone()).unwrap_or_default(),
                    description: weather.map(|w| w.description.clone()).unwrap_or_default(),
                    icon: weather.and_then(|w| w.icon.clone()),
                })
            })
            .collect();

        OneCallData {
            current,
            daily,
            hourly,
            minutely,
        }
    }
}

pub(crate) fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{
        "lat": 40.7, "lon": -74.0, "timezone": "America/New_York",
        "current": {
            "dt": 1729353600, "sunrise": 1729335960, "sunset": 1729375560,
            "temp": 72.5, "feels_like": 71.9, "pressure": 1018, "humidity": 105,
            "dew_point": 55.1, "uvi": 3.2, "clouds": 20, "visibility": 10000,
            "wind_speed": 8.1, "wind_deg": 200, "wind_gust": 14.0,
            "weather": [{"id": 801, "main": "Clouds", "description": "few clouds", "icon": "02d"}]
        },
        "minutely": [{"dt": 1729353600, "precipitation": 0.0}],
        "hourly": [
            {"dt": 1729353600, "temp": 72.5, "feels_like": 71.9, "pop": 0.85, "wind_speed": 8.1,
             "weather": [{"main": "Rain", "description": "light rain", "icon": "10d"}]}
        ],
        "daily": [
            {"dt": 1729353600, "temp": {"min": 60, "max": 80}, "pop": 0.2,
             "weather": [{"main": "Clear", "description": "clear sky", "icon": "01d"}]}
        ]
    }"#;

    #[test]
    fn decodes_and_normalizes_current_block() {
        let parsed: OcResponse = serde_json::from_str(PAYLOAD).unwrap();
        let data = OneCallData::from(parsed);
        let current = data.current.expect("current block");

        assert_eq!(current.source, Some(ProviderId::OneCall));
        assert_eq!(current.temperature, Some(72.5));
        assert_eq!(current.condition.as_deref(), Some("few clouds"));
        // Humidity is passed through untouched; clamping is the engine's call.
        assert_eq!(current.humidity, Some(105.0));
        let vis = current.visibility.unwrap();
        assert!((vis - 6.2137).abs() < 1e-3, "10 km should be ~6.21 mi, got {vis}");
        assert_eq!(current.wind_chill, Some(71.9));
        assert!(current.sunrise.is_some());
    }

    #[test]
    fn decodes_series() {
        let parsed: OcResponse = serde_json::from_str(PAYLOAD).unwrap();
        let data = OneCallData::from(parsed);

        assert_eq!(data.minutely.len(), 1);
        assert_eq!(data.hourly[0].precip_probability, 85.0);
        assert_eq!(data.hourly[0].condition, "Rain");
        assert_eq!(data.daily[0].temp_max, 80.0);
        assert_eq!(
            data.daily[0].icon_url().as_deref(),
            Some("https://openweathermap.org/img/wn/01d@2x.png")
        );
    }

    #[test]
    fn missing_sections_decode_to_empty() {
        let parsed: OcResponse = serde_json::from_str(r#"{"lat": 1, "lon": 2}"#).unwrap();
        let data = OneCallData::from(parsed);
        assert!(data.current.is_none());
        assert!(data.daily.is_empty());
        assert!(data.hourly.is_empty());
    }

    #[tokio::test]
    async fn missing_key_is_a_typed_failure() {
        let provider = OneCallProvider::new(Client::new(), None);
        let err = provider.fetch(Coordinate::new(40.0, -74.0)).await.unwrap_err();
        assert!(matches!(err, FetchError::MissingCredential(ProviderId::OneCall)));

        let blank = OneCallProvider::new(Client::new(), Some("  ".into()));
        let err = blank.fetch(Coordinate::new(40.0, -74.0)).await.unwrap_err();
        assert!(matches!(err, FetchError::MissingCredential(_)));
    }
}
