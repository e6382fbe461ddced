//! Unit conversion between the canonical storage units (°F, hPa, miles, mph)
//! and the user's display preference. Every function is total.

use serde::{Deserialize, Serialize};

use crate::model::CanonicalConditions;

const HPA_PER_INHG: f64 = 33.863_886_666_667;
const HPA_PER_MMHG: f64 = 1.333_223_874_15;
const KM_PER_MILE: f64 = 1.609_344;
const METERS_PER_MILE: f64 = 1_609.344;
const MPS_PER_MPH: f64 = 0.447_04;

pub fn fahrenheit_to_celsius(f: f64) -> f64 {
    (f - 32.0) * 5.0 / 9.0
}

pub fn celsius_to_fahrenheit(c: f64) -> f64 {
    c * 9.0 / 5.0 + 32.0
}

pub fn hpa_to_inhg(hpa: f64) -> f64 {
    hpa / HPA_PER_INHG
}

pub fn inhg_to_hpa(inhg: f64) -> f64 {
    inhg * HPA_PER_INHG
}

pub fn hpa_to_mmhg(hpa: f64) -> f64 {
    hpa / HPA_PER_MMHG
}

pub fn mmhg_to_hpa(mmhg: f64) -> f64 {
    mmhg * HPA_PER_MMHG
}

pub fn miles_to_km(mi: f64) -> f64 {
    mi * KM_PER_MILE
}

pub fn km_to_miles(km: f64) -> f64 {
    km / KM_PER_MILE
}

pub fn meters_to_miles(m: f64) -> f64 {
    m / METERS_PER_MILE
}

pub fn mph_to_kph(mph: f64) -> f64 {
    mph * KM_PER_MILE
}

pub fn kph_to_mph(kph: f64) -> f64 {
    kph / KM_PER_MILE
}

pub fn mph_to_mps(mph: f64) -> f64 {
    mph * MPS_PER_MPH
}

pub fn mps_to_mph(mps: f64) -> f64 {
    mps / MPS_PER_MPH
}

/// NWS wind chill in °F. Only defined for T <= 50 °F and wind >= 3 mph.
pub fn wind_chill_f(temp_f: f64, wind_mph: f64) -> Option<f64> {
    if temp_f > 50.0 || wind_mph < 3.0 {
        return None;
    }
    let v = wind_mph.powf(0.16);
    Some(35.74 + 0.6215 * temp_f - 35.75 * v + 0.4275 * temp_f * v)
}

/// 16-point compass label for a direction in degrees.
pub fn cardinal(degrees: f64) -> &'static str {
    const POINTS: [&str; 16] = [
        "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW",
        "NW", "NNW",
    ];
    if !degrees.is_finite() {
        return "N";
    }
    let idx = ((degrees.rem_euclid(360.0) / 22.5).round() as usize) % 16;
    POINTS[idx]
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Fahrenheit,
    Celsius,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PressureUnit {
    Hpa,
    #[default]
    Inhg,
    Mmhg,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    #[default]
    Miles,
    Kilometers,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedUnit {
    #[default]
    Mph,
    Kph,
    Mps,
}

impl TemperatureUnit {
    pub const ALL: [TemperatureUnit; 2] = [TemperatureUnit::Fahrenheit, TemperatureUnit::Celsius];

    pub fn symbol(self) -> &'static str {
        match self {
            TemperatureUnit::Fahrenheit => "°F",
            TemperatureUnit::Celsius => "°C",
        }
    }

    pub fn from_fahrenheit(self, f: f64) -> f64 {
        match self {
            TemperatureUnit::Fahrenheit => f,
            TemperatureUnit::Celsius => fahrenheit_to_celsius(f),
        }
    }

    pub fn to_fahrenheit(self, value: f64) -> f64 {
        match self {
            TemperatureUnit::Fahrenheit => value,
            TemperatureUnit::Celsius => celsius_to_fahrenheit(value),
        }
    }

    pub fn convert(value: f64, from: Self, to: Self) -> f64 {
        to.from_fahrenheit(from.to_fahrenheit(value))
    }
}

impl PressureUnit {
    pub const ALL: [PressureUnit; 3] = [PressureUnit::Hpa, PressureUnit::Inhg, PressureUnit::Mmhg];

    pub fn symbol(self) -> &'static str {
        match self {
            PressureUnit::Hpa => "hPa",
            PressureUnit::Inhg => "inHg",
            PressureUnit::Mmhg => "mmHg",
        }
    }

    pub fn from_hpa(self, hpa: f64) -> f64 {
        match self {
            PressureUnit::Hpa => hpa,
            PressureUnit::Inhg => hpa_to_inhg(hpa),
            PressureUnit::Mmhg => hpa_to_mmhg(hpa),
        }
    }

    pub fn to_hpa(self, value: f64) -> f64 {
        match self {
            PressureUnit::Hpa => value,
            PressureUnit::Inhg => inhg_to_hpa(value),
            PressureUnit::Mmhg => mmhg_to_hpa(value),
        }
    }

    pub fn convert(value: f64, from: Self, to: Self) -> f64 {
        to.from_hpa(from.to_hpa(value))
    }
}

impl DistanceUnit {
    pub const ALL: [DistanceUnit; 2] = [DistanceUnit::Miles, DistanceUnit::Kilometers];

    pub fn symbol(self) -> &'static str {
        match self {
            DistanceUnit::Miles => "mi",
            DistanceUnit::Kilometers => "km",
        }
    }

    pub fn from_miles(self, mi: f64) -> f64 {
        match self {
            DistanceUnit::Miles => mi,
            DistanceUnit::Kilometers => miles_to_km(mi),
        }
    }

    pub fn to_miles(self, value: f64) -> f64 {
        match self {
            DistanceUnit::Miles => value,
            DistanceUnit::Kilometers => km_to_miles(value),
        }
    }

    pub fn convert(value: f64, from: Self, to: Self) -> f64 {
        to.from_miles(from.to_miles(value))
    }
}

impl SpeedUnit {
    pub const ALL: [SpeedUnit; 3] = [SpeedUnit::Mph, SpeedUnit::Kph, SpeedUnit::Mps];

    pub fn symbol(self) -> &'static str {
        match self {
            SpeedUnit::Mph => "mph",
            SpeedUnit::Kph => "km/h",
            SpeedUnit::Mps => "m/s",
        }
    }

    pub fn from_mph(self, mph: f64) -> f64 {
        match self {
            SpeedUnit::Mph => mph,
            SpeedUnit::Kph => mph_to_kph(mph),
            SpeedUnit::Mps => mph_to_mps(mph),
        }
    }

    pub fn to_mph(self, value: f64) -> f64 {
        match self {
            SpeedUnit::Mph => value,
            SpeedUnit::Kph => kph_to_mph(value),
            SpeedUnit::Mps => mps_to_mph(value),
        }
    }

    pub fn convert(value: f64, from: Self, to: Self) -> f64 {
        to.from_mph(from.to_mph(value))
    }
}

/// The user's display units. Passed in explicitly; never ambient state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitPreference {
    #[serde(default)]
    pub temperature: TemperatureUnit,
    #[serde(default)]
    pub pressure: PressureUnit,
    #[serde(default)]
    pub distance: DistanceUnit,
    #[serde(default)]
    pub speed: SpeedUnit,
}

impl UnitPreference {
    pub fn temperature(&self, f: f64) -> String {
        format!("{:.0}{}", self.temperature.from_fahrenheit(f), self.temperature.symbol())
    }

    pub fn speed(&self, mph: f64) -> String {
        format!("{:.0} {}", self.speed.from_mph(mph), self.speed.symbol())
    }

    pub fn pressure(&self, hpa: f64) -> String {
        let value = self.pressure.from_hpa(hpa);
        match self.pressure {
            PressureUnit::Inhg => format!("{value:.2} {}", self.pressure.symbol()),
            _ => format!("{value:.0} {}", self.pressure.symbol()),
        }
    }

    pub fn distance(&self, mi: f64) -> String {
        format!("{:.1} {}", self.distance.from_miles(mi), self.distance.symbol())
    }
}

/// Current conditions converted into display units. Rebuilt from the stored
/// canonical record whenever the preference changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayConditions {
    pub units: UnitPreference,
    pub source_label: String,
    pub condition: String,
    pub temperature: f64,
    pub dew_point: f64,
    pub wind_chill: f64,
    pub wind_direction: f64,
    pub wind_cardinal: &'static str,
    pub wind_speed: f64,
    pub wind_gust: f64,
    pub pressure: f64,
    pub humidity: f64,
    pub visibility: f64,
    pub cloud_cover: f64,
    pub uv_index: f64,
    pub insight: String,
}

impl CanonicalConditions {
    pub fn display(&self, units: UnitPreference) -> DisplayConditions {
        DisplayConditions {
            units,
            source_label: self.source_label.clone(),
            condition: self.condition.clone(),
            temperature: units.temperature.from_fahrenheit(self.temperature),
            dew_point: units.temperature.from_fahrenheit(self.dew_point),
            wind_chill: units.temperature.from_fahrenheit(self.wind_chill),
            wind_direction: self.wind_direction,
            wind_cardinal: cardinal(self.wind_direction),
            wind_speed: units.speed.from_mph(self.wind_speed),
            wind_gust: units.speed.from_mph(self.wind_gust),
            pressure: units.pressure.from_hpa(self.pressure),
            humidity: self.humidity,
            visibility: units.distance.from_miles(self.visibility),
            cloud_cover: self.cloud_cover,
            uv_index: self.uv_index,
            insight: self.insight.message(&units),
        }
    }
}
