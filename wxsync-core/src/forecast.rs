//! Daily-series helpers: one-call synthesis into the native day/night layout,
//! day pairing, and condition classification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    model::{DailySeries, ForecastPeriod, TempLabel},
    provider::{ProviderId, onecall::OneCallDay},
};

/// Expand each one-call day into a "High" period and a "<weekday> Night"
/// "Low" period so consumers never branch on provider origin.
pub fn synthesize_daily(days: &[OneCallDay]) -> DailySeries {
    let periods = days
        .iter()
        .flat_map(|day| {
            let weekday = day.time.format("%A").to_string();
            let pop = day.pop.map(|p| (p * 100.0).round()).unwrap_or(0.0);
            let period = |name: String, label, temperature: f64| ForecastPeriod {
                name,
                start_time: Some(day.time),
                label,
                temperature: Some(temperature.round()),
                precip_probability: pop,
                condition: day.main.clone(),
                detail: day.description.clone(),
                icon_url: day.icon_url(),
            };
            [
                period(weekday.clone(), TempLabel::High, day.temp_max),
                period(format!("{weekday} Night"), TempLabel::Low, day.temp_min),
            ]
        })
        .collect();

    DailySeries {
        source: ProviderId::OneCall,
        periods,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionClass {
    Showers,
    WintryMix,
    Thunderstorm,
    Rain,
    Snow,
    Sleet,
    FreezingRain,
    Fog,
    Drizzle,
    PartlyCloudy,
    Cloudy,
    Clear,
}

impl ConditionClass {
    /// Classify free forecast text. Unknown text is treated as clear.
    pub fn classify(text: &str) -> Self {
        let t = text.to_lowercase();
        let has = |needle: &str| t.contains(needle);

        if has("showers") {
            return if has("snow") {
                ConditionClass::WintryMix
            } else {
                ConditionClass::Showers
            };
        }
        if has("rain") && has("snow") {
            ConditionClass::WintryMix
        } else if has("thunderstorm") {
            ConditionClass::Thunderstorm
        } else if has("freezing") {
            ConditionClass::FreezingRain
        } else if has("rain") {
            ConditionClass::Rain
        } else if has("snow") {
            ConditionClass::Snow
        } else if has("sleet") {
            ConditionClass::Sleet
        } else if has("fog") || has("mist") {
            ConditionClass::Fog
        } else if has("drizzle") {
            ConditionClass::Drizzle
        } else if has("partly") {
            ConditionClass::PartlyCloudy
        } else if has("cloudy") || has("overcast") || has("clouds") {
            ConditionClass::Cloudy
        } else {
            ConditionClass::Clear
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ConditionClass::Showers => "Showers",
            ConditionClass::WintryMix => "Wintry Mix",
            ConditionClass::Thunderstorm => "Thunderstorm",
            ConditionClass::Rain => "Rain",
            ConditionClass::Snow => "Snow",
            ConditionClass::Sleet => "Sleet",
            ConditionClass::FreezingRain => "Freezing Rain",
            ConditionClass::Fog => "Fog",
            ConditionClass::Drizzle => "Drizzle",
            ConditionClass::PartlyCloudy => "Partly Cloudy",
            ConditionClass::Cloudy => "Cloudy",
            ConditionClass::Clear => "Clear",
        }
    }
}

/// A calendar day folded from its High and Low periods.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaySummary {
    pub name: String,
    pub start_time: Option<DateTime<Utc>>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub precip_day: f64,
    pub precip_night: f64,
    pub condition: ConditionClass,
}

/// Pair High/Low periods into days. A series that opens on a Low period (an
/// evening issuance) yields a first day without a high; a trailing High
/// yields a last day without a low.
pub fn summarize_days(periods: &[ForecastPeriod]) -> Vec<DaySummary> {
    let mut days = Vec::new();
    let mut pending: Option<&ForecastPeriod> = None;

    for period in periods {
        match period.label {
            TempLabel::High => {
                if let Some(high) = pending.replace(period) {
                    days.push(fold(Some(high), None));
                }
            }
            TempLabel::Low => days.push(fold(pending.take(), Some(period))),
        }
    }
    if let Some(high) = pending {
        days.push(fold(Some(high), None));
    }
    days
}

fn fold(high: Option<&ForecastPeriod>, low: Option<&ForecastPeriod>) -> DaySummary {
    let lead = high.or(low);
    let text = high
        .map(|p| p.condition.as_str())
        .filter(|c| !c.is_empty())
        .or_else(|| low.map(|p| p.condition.as_str()))
        .unwrap_or_default();

    DaySummary {
        name: lead.map(|p| p.name.clone()).unwrap_or_default(),
        start_time: lead.and_then(|p| p.start_time),
        high: high.and_then(|p| p.temperature),
        low: low.and_then(|p| p.temperature),
        precip_day: high.map_or(0.0, |p| p.precip_probability),
        precip_night: low.map_or(0.0, |p| p.precip_probability),
        condition: ConditionClass::classify(text),
    }
}
