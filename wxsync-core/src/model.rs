use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{insight::Insight, provider::ProviderId};

/// Condition text used when no provider supplied one.
pub const UNAVAILABLE: &str = "Data unavailable";

/// Condition and source text shown while the first cycle is in flight.
pub const LOADING: &str = "Loading...";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4},{:.4}", self.latitude, self.longitude)
    }
}

/// One entry of the station feed. Units are canonical: °F, mph, hPa, miles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StationObservation {
    pub id: String,
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub weather: Option<String>,
    pub sky_condition: Option<String>,
    pub temperature: Option<f64>,
    pub dew_point: Option<f64>,
    pub wind_direction: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_gust: Option<f64>,
    pub pressure: Option<f64>,
    pub humidity: Option<f64>,
    pub visibility: Option<f64>,
}

impl StationObservation {
    pub fn coordinate(&self) -> Option<Coordinate> {
        let at = Coordinate::new(self.latitude?, self.longitude?);
        at.is_valid().then_some(at)
    }
}

/// Normalized, source-tagged partial current conditions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderReading {
    pub source: Option<ProviderId>,
    pub source_label: Option<String>,
    pub condition: Option<String>,
    pub temperature: Option<f64>,
    pub dew_point: Option<f64>,
    pub wind_direction: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_gust: Option<f64>,
    pub wind_chill: Option<f64>,
    pub pressure: Option<f64>,
    pub humidity: Option<f64>,
    pub visibility: Option<f64>,
    pub cloud_cover: Option<f64>,
    pub uv_index: Option<f64>,
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
}

impl ProviderReading {
    /// Fill fields still absent here from `other`. Source tags are kept, and
    /// gust and wind chill are never borrowed: they only pair with the wind
    /// and temperature they were observed with.
    pub fn fill_gaps(&mut self, other: &ProviderReading) {
        fn take<T: Clone>(slot: &mut Option<T>, from: &Option<T>) {
            if slot.is_none() {
                slot.clone_from(from);
            }
        }

        take(&mut self.condition, &other.condition);
        take(&mut self.temperature, &other.temperature);
        take(&mut self.dew_point, &other.dew_point);
        take(&mut self.wind_direction, &other.wind_direction);
        take(&mut self.wind_speed, &other.wind_speed);
        take(&mut self.pressure, &other.pressure);
        take(&mut self.humidity, &other.humidity);
        take(&mut self.visibility, &other.visibility);
        take(&mut self.cloud_cover, &other.cloud_cover);
        take(&mut self.uv_index, &other.uv_index);
        take(&mut self.sunrise, &other.sunrise);
        take(&mut self.sunset, &other.sunset);
    }
}

/// Fully resolved current conditions. Canonical units: °F, mph, hPa, miles,
/// percent for humidity and cloud cover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalConditions {
    pub source: Option<ProviderId>,
    pub source_label: String,
    pub condition: String,
    pub temperature: f64,
    pub dew_point: f64,
    pub wind_direction: f64,
    pub wind_speed: f64,
    pub wind_gust: f64,
    pub wind_chill: f64,
    pub pressure: f64,
    pub humidity: f64,
    pub visibility: f64,
    pub cloud_cover: f64,
    pub uv_index: f64,
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub insight: Insight,
}

impl CanonicalConditions {
    /// Object returned synchronously before any provider has answered.
    pub fn placeholder(at: Coordinate, now: DateTime<Utc>) -> Self {
        let (sunrise, sunset) = crate::solar::sunrise_sunset(at, now.date_naive());
        Self {
            source: None,
            source_label: LOADING.to_string(),
            condition: LOADING.to_string(),
            temperature: 0.0,
            dew_point: 0.0,
            wind_direction: 0.0,
            wind_speed: 0.0,
            wind_gust: 0.0,
            wind_chill: 0.0,
            pressure: 0.0,
            humidity: 0.0,
            visibility: 0.0,
            cloud_cover: 0.0,
            uv_index: 0.0,
            sunrise,
            sunset,
            last_updated: now,
            insight: Insight::Unavailable,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.source.is_none()
    }

    pub fn numeric_fields(&self) -> [f64; 11] {
        [
            self.temperature,
            self.dew_point,
            self.wind_direction,
            self.wind_speed,
            self.wind_gust,
            self.wind_chill,
            self.pressure,
            self.humidity,
            self.visibility,
            self.cloud_cover,
            self.uv_index,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TempLabel {
    High,
    Low,
}

impl TempLabel {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "High" => Some(TempLabel::High),
            "Low" => Some(TempLabel::Low),
            _ => None,
        }
    }
}

/// One half-day period of the daily series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPeriod {
    pub name: String,
    pub start_time: Option<DateTime<Utc>>,
    pub label: TempLabel,
    pub temperature: Option<f64>,
    /// Percent, 0-100.
    pub precip_probability: f64,
    pub condition: String,
    pub detail: String,
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySeries {
    pub source: ProviderId,
    pub periods: Vec<ForecastPeriod>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyPoint {
    pub time: DateTime<Utc>,
    pub temperature: f64,
    pub feels_like: f64,
    /// Percent, 0-100.
    pub precip_probability: f64,
    pub wind_speed: f64,
    pub wind_gust: Option<f64>,
    pub condition: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinutelyPoint {
    pub time: DateTime<Utc>,
    /// Millimetres per hour.
    pub precipitation: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastBundle {
    pub daily: Option<DailySeries>,
    pub hourly: Vec<HourlyPoint>,
    pub minutely: Vec<MinutelyPoint>,
}

impl ForecastBundle {
    /// Precipitation probabilities for the next 24 hourly points.
    pub fn next_24h_precip(&self) -> impl Iterator<Item = f64> + '_ {
        self.hourly.iter().take(24).map(|h| h.precip_probability)
    }
}

/// An active government alert, text already normalized for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub event: String,
    pub headline: String,
    pub description: String,
    pub instructions: String,
    pub area: String,
    pub effective: Option<DateTime<Utc>>,
    pub expires: Option<DateTime<Utc>>,
    pub severity: String,
    pub color: String,
    pub text_color: String,
}
