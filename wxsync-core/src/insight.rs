//! One advisory sentence derived from the reconciled conditions.
//!
//! Rules are evaluated top to bottom against canonical units and the first
//! match wins:
//!
//! 1. any of the next 24 hourly precipitation probabilities > 80 %
//! 2. gust - sustained wind >= 10 mph
//! 3. temperature - wind chill >= 5 °F
//! 4. UV index >= 8
//! 5. visibility <= 2 mi
//! 6. humidity > 99 %
//! 7. humidity < 20 %, split on wind >= 15 mph
//! 8. temperature band: <= 50 °F cold, >= 85 °F hot, otherwise nice
//!
//! Conditions without any provider behind them get [`Insight::Unavailable`].

use serde::{Deserialize, Serialize};

use crate::{model::CanonicalConditions, units::UnitPreference};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Insight {
    Unavailable,
    HeavyPrecipitation { probability: f64 },
    Gusts { gust: f64 },
    WindChill { wind_chill: f64 },
    HighUv { uv_index: f64 },
    LowVisibility { visibility: f64 },
    Humid,
    FireWeather { windy: bool },
    Cold,
    Hot,
    Nice,
}

pub fn generate(
    conditions: &CanonicalConditions,
    next_24h_precip: impl IntoIterator<Item = f64>,
) -> Insight {
    let c = conditions;
    if c.source.is_none() {
        return Insight::Unavailable;
    }

    let wettest = next_24h_precip
        .into_iter()
        .take(24)
        .filter(|p| p.is_finite())
        .fold(None, |acc: Option<f64>, p| Some(acc.map_or(p, |a| a.max(p))));

    match wettest {
        Some(p) if p > 80.0 => Insight::HeavyPrecipitation { probability: p },
        _ if c.wind_gust - c.wind_speed >= 10.0 => Insight::Gusts { gust: c.wind_gust },
        _ if c.temperature - c.wind_chill >= 5.0 => Insight::WindChill {
            wind_chill: c.wind_chill,
        },
        _ if c.uv_index >= 8.0 => Insight::HighUv {
            uv_index: c.uv_index,
        },
        _ if c.visibility <= 2.0 => Insight::LowVisibility {
            visibility: c.visibility,
        },
        _ if c.humidity > 99.0 => Insight::Humid,
        _ if c.humidity < 20.0 => Insight::FireWeather {
            windy: c.wind_speed >= 15.0,
        },
        _ if c.temperature <= 50.0 => Insight::Cold,
        _ if c.temperature >= 85.0 => Insight::Hot,
        _ => Insight::Nice,
    }
}

impl Insight {
    /// Rendered sentence; numbers appear in the caller's display units.
    pub fn message(&self, units: &UnitPreference) -> String {
        match self {
            Insight::Unavailable => "Weather data is unavailable right now.".to_string(),
            Insight::HeavyPrecipitation { probability } => format!(
                "There's a {probability:.0}% chance of precipitation in the next 24 hours."
            ),
            Insight::Gusts { gust } => {
                format!("Wind is gusting up to {}.", units.speed(*gust))
            }
            Insight::WindChill { wind_chill } => format!(
                "Wind chill is making it feel like {}.",
                units.temperature(*wind_chill)
            ),
            Insight::HighUv { uv_index } => {
                format!("The UV index is {uv_index:.0}, be sure to wear sunscreen!")
            }
            Insight::LowVisibility { visibility } => format!(
                "Visibility is down to {}, drive carefully.",
                units.distance(*visibility)
            ),
            Insight::Humid => "It's quite humid outside.".to_string(),
            Insight::FireWeather { windy: true } => {
                "Dry air and strong winds are raising the fire danger.".to_string()
            }
            Insight::FireWeather { windy: false } => {
                "The air is very dry, be careful with open flames.".to_string()
            }
            Insight::Cold => "It's quite cold outside, be sure to dress warm!".to_string(),
            Insight::Hot => "It's quite hot outside, be sure to stay hydrated!".to_string(),
            Insight::Nice => "The weather is quite nice outside!".to_string(),
        }
    }
}
