//! Government point forecast in its native day/night period layout, plus the
//! forecast office's latest observation near the point.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    FetchError,
    model::{Coordinate, ForecastPeriod, ProviderReading, TempLabel},
    provider::{Provider, ProviderId, get_json, lenient, parse_time},
    station, units,
};

const MAP_CLICK_URL: &str = "https://forecast.weather.gov/MapClick.php";

/// Everything one point-forecast payload yields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointForecast {
    /// Half-day periods; empty when the payload carried none.
    pub periods: Vec<ForecastPeriod>,
    /// Nearby observation from the `currentobservation` block.
    pub observation: Option<ProviderReading>,
}

#[derive(Debug, Clone)]
pub struct PointForecastProvider {
    http: Client,
}

impl PointForecastProvider {
    pub fn new(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Provider for PointForecastProvider {
    type Output = PointForecast;

    fn id(&self) -> ProviderId {
        ProviderId::PointForecast
    }

    async fn fetch(&self, at: Coordinate) -> Result<Self::Output, FetchError> {
        let parsed: PfResponse = get_json(
            &self.http,
            self.id(),
            MAP_CLICK_URL,
            &[
                ("lat", at.latitude.to_string()),
                ("lon", at.longitude.to_string()),
                ("FcstType", "json".to_string()),
            ],
        )
        .await?;

        parsed.into_forecast()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PfTime {
    #[serde(default, deserialize_with = "lenient::texts")]
    start_period_name: Vec<Option<String>>,
    #[serde(default, deserialize_with = "lenient::texts")]
    start_valid_time: Vec<Option<String>>,
    #[serde(default, deserialize_with = "lenient::texts")]
    temp_label: Vec<Option<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PfData {
    #[serde(default, deserialize_with = "lenient::texts")]
    temperature: Vec<Option<String>>,
    #[serde(default, deserialize_with = "lenient::texts")]
    pop: Vec<Option<String>>,
    #[serde(default, deserialize_with = "lenient::texts")]
    weather: Vec<Option<String>>,
    #[serde(default, deserialize_with = "lenient::texts")]
    icon_link: Vec<Option<String>>,
    #[serde(default, deserialize_with = "lenient::texts")]
    text: Vec<Option<String>>,
}

/// Every value arrives as a string, with "NA" for missing readings.
#[derive(Debug, Default, Deserialize)]
struct PfObservation {
    #[serde(default, deserialize_with = "lenient::text")]
    id: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    name: Option<String>,
    #[serde(rename = "Weather", default, deserialize_with = "lenient::text")]
    weather: Option<String>,
    #[serde(rename = "Temp", default, deserialize_with = "lenient::number")]
    temp: Option<f64>,
    #[serde(rename = "Dewp", default, deserialize_with = "lenient::number")]
    dewp: Option<f64>,
    #[serde(rename = "Relh", default, deserialize_with = "lenient::number")]
    relh: Option<f64>,
    #[serde(rename = "Winds", default, deserialize_with = "lenient::number")]
    winds: Option<f64>,
    #[serde(rename = "Windd", default, deserialize_with = "lenient::number")]
    windd: Option<f64>,
    #[serde(rename = "Gust", default, deserialize_with = "lenient::number")]
    gust: Option<f64>,
    #[serde(rename = "Visibility", default, deserialize_with = "lenient::number")]
    visibility: Option<f64>,
    /// Sea-level pressure in inHg.
    #[serde(rename = "SLP", default, deserialize_with = "lenient::number")]
    slp: Option<f64>,
    /// Altimeter setting in hPa.
    #[serde(rename = "Altimeter", default, deserialize_with = "lenient::number")]
    altimeter: Option<f64>,
    #[serde(rename = "WindChill", default, deserialize_with = "lenient::number")]
    wind_chill: Option<f64>,
}

impl PfObservation {
    /// A block without a temperature is treated as no observation at all.
    fn into_reading(self) -> Option<ProviderReading> {
        let temperature = self.temp?;

        let condition = self.weather.filter(|w| {
            let lower = w.to_lowercase();
            lower != "na" && !lower.contains("unknown")
        });
        let wind_chill = self.wind_chill.or_else(|| {
            self.winds
                .and_then(|wind| units::wind_chill_f(temperature, wind))
        });

        Some(ProviderReading {
            source: Some(ProviderId::PointForecast),
            source_label: station::label(
                self.name.as_deref().unwrap_or_default(),
                self.id.as_deref().unwrap_or_default(),
            ),
            condition,
            temperature: Some(temperature),
            dew_point: self.dewp,
            wind_direction: self.windd,
            wind_speed: self.winds,
            wind_gust: self.gust,
            wind_chill,
            pressure: self.slp.map(units::inhg_to_hpa).or(self.altimeter),
            humidity: self.relh,
            visibility: self.visibility,
            ..ProviderReading::default()
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PfResponse {
    #[serde(default)]
    time: PfTime,
    #[serde(default)]
    data: PfData,
    #[serde(default)]
    currentobservation: Option<PfObservation>,
}

fn nth(items: &[Option<String>], i: usize) -> Option<&str> {
    items.get(i).and_then(|s| s.as_deref())
}

impl PfResponse {
    /// Zip the parallel arrays into periods and decode the observation.
    /// Periods without a High/Low label are skipped. A payload with neither
    /// periods nor an observation counts as unavailable.
    pub(crate) fn into_forecast(self) -> Result<PointForecast, FetchError> {
        let PfResponse {
            time,
            data,
            currentobservation,
        } = self;

        let periods: Vec<ForecastPeriod> = (0..time.temp_label.len())
            .filter_map(|i| {
                let label = TempLabel::parse(nth(&time.temp_label, i)?)?;
                Some(ForecastPeriod {
                    name: nth(&time.start_period_name, i).unwrap_or_default().to_string(),
                    start_time: nth(&time.start_valid_time, i).and_then(parse_time),
                    label,
                    temperature: nth(&data.temperature, i).and_then(|t| t.parse().ok()),
                    precip_probability: nth(&data.pop, i)
                        .and_then(|p| p.parse().ok())
                        .unwrap_or(0.0),
                    condition: nth(&data.weather, i).unwrap_or_default().to_string(),
                    detail: nth(&data.text, i).unwrap_or_default().to_string(),
                    icon_url: nth(&data.icon_link, i).map(str::to_string),
                })
            })
            .collect();

        let observation = currentobservation.and_then(PfObservation::into_reading);

        if periods.is_empty() && observation.is_none() {
            return Err(FetchError::decode(
                ProviderId::PointForecast,
                "payload had no labelled periods and no current observation",
            ));
        }

        Ok(PointForecast {
            periods,
            observation,
        })
    }
}
