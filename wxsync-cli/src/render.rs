//! Plain-text rendering for terminal output.

use std::fmt::Write;

use wxsync_core::{
    Alert, CanonicalConditions, ForecastBundle, UnitPreference,
    forecast::summarize_days,
    provider::outlook::{RiskCategory, SevereOutlook},
    units::{DisplayConditions, PressureUnit},
};

pub fn conditions(shown: &DisplayConditions, canonical: Option<&CanonicalConditions>) -> String {
    let u = shown.units;
    let t = u.temperature.symbol();
    let s = u.speed.symbol();
    let pressure = match u.pressure {
        PressureUnit::Inhg => format!("{:.2} {}", shown.pressure, u.pressure.symbol()),
        _ => format!("{:.0} {}", shown.pressure, u.pressure.symbol()),
    };

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}, {:.0}{t}  [{}]",
        shown.condition, shown.temperature, shown.source_label
    );
    let _ = writeln!(
        out,
        "  Feels like {:.0}{t}   Dew point {:.0}{t}   Humidity {:.0}%",
        shown.wind_chill, shown.dew_point, shown.humidity
    );
    let _ = writeln!(
        out,
        "  Wind {} {:.0} {s}, gusts {:.0} {s}   Pressure {pressure}   Visibility {:.1} {}",
        shown.wind_cardinal,
        shown.wind_speed,
        shown.wind_gust,
        shown.visibility,
        u.distance.symbol()
    );
    let _ = write!(
        out,
        "  UV {:.0}   Clouds {:.0}%",
        shown.uv_index, shown.cloud_cover
    );
    if let Some(c) = canonical {
        let _ = write!(
            out,
            "   Sunrise {}  Sunset {} UTC",
            c.sunrise.format("%H:%M"),
            c.sunset.format("%H:%M")
        );
    }
    let _ = write!(out, "\n  {}", shown.insight);
    out
}

pub fn forecast(bundle: &ForecastBundle, units: UnitPreference) -> String {
    let mut out = String::new();

    match &bundle.daily {
        Some(daily) => {
            let _ = writeln!(out, "Forecast ({}):", daily.source);
            for day in summarize_days(&daily.periods) {
                let temp = |v: Option<f64>| v.map_or_else(|| "--".to_string(), |f| units.temperature(f));
                let _ = writeln!(
                    out,
                    "  {:<18} {:<14} high {:>6}  low {:>6}  precip {:>3.0}%/{:.0}%",
                    day.name,
                    day.condition.label(),
                    temp(day.high),
                    temp(day.low),
                    day.precip_day,
                    day.precip_night
                );
            }
        }
        None => {
            let _ = writeln!(out, "Forecast: unavailable");
        }
    }

    if !bundle.hourly.is_empty() {
        let _ = writeln!(out, "Next hours:");
        for hour in bundle.hourly.iter().take(6) {
            let _ = writeln!(
                out,
                "  {}  {:>6}  {:>3.0}%  {}",
                hour.time.format("%H:%M"),
                units.temperature(hour.temperature),
                hour.precip_probability,
                hour.condition
            );
        }
    }
    out.trim_end().to_string()
}

pub fn alerts(alerts: &[Alert]) -> String {
    if alerts.is_empty() {
        return "No active alerts.".to_string();
    }

    let mut out = String::new();
    for alert in alerts {
        let _ = writeln!(out, "[{}] {} ({})", alert.color, alert.event, alert.severity);
        if !alert.headline.is_empty() {
            let _ = writeln!(out, "  {}", alert.headline);
        }
        if let Some(expires) = alert.expires {
            let _ = writeln!(out, "  Expires {}", expires.format("%Y-%m-%d %H:%M UTC"));
        }
        if !alert.description.is_empty() {
            let _ = writeln!(out, "  {}", alert.description);
        }
        if !alert.instructions.is_empty() {
            let _ = writeln!(out, "  {}", alert.instructions);
        }
    }
    out.trim_end().to_string()
}

pub fn outlooks(outlooks: &[SevereOutlook]) -> String {
    outlooks
        .iter()
        .map(|o| match o.risk {
            RiskCategory::None => format!("Day {}: {}", o.day, o.description),
            _ => format!(
                "Day {}: {} ({}, level {}/5) [{}]",
                o.day,
                o.description,
                o.label,
                o.risk.level(),
                o.fill_color
            ),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wxsync_core::{Coordinate, ProviderId, insight::Insight, units::TemperatureUnit};

    fn sample() -> CanonicalConditions {
        let mut c = CanonicalConditions::placeholder(Coordinate::new(40.69, -89.59), Utc::now());
        c.source = Some(ProviderId::Stations);
        c.source_label = "Peoria (KPIA)".into();
        c.condition = "Clear".into();
        c.temperature = 50.0;
        c.wind_chill = 50.0;
        c.wind_direction = 315.0;
        c.wind_speed = 8.0;
        c.wind_gust = 8.0;
        c.pressure = 1013.25;
        c.humidity = 55.0;
        c.visibility = 10.0;
        c.insight = Insight::Cold;
        c
    }

    #[test]
    fn conditions_in_default_units() {
        let c = sample();
        let text = conditions(&c.display(UnitPreference::default()), Some(&c));

        assert!(text.starts_with("Clear, 50°F  [Peoria (KPIA)]"));
        assert!(text.contains("Wind NW 8 mph"));
        assert!(text.contains("Pressure 29.92 inHg"));
        assert!(text.ends_with("be sure to dress warm!"));
    }

    #[test]
    fn conditions_follow_unit_preference() {
        let c = sample();
        let units = UnitPreference {
            temperature: TemperatureUnit::Celsius,
            ..UnitPreference::default()
        };
        let text = conditions(&c.display(units), None);
        assert!(text.starts_with("Clear, 10°C"));
        assert!(!text.contains("Sunrise"));
    }

    #[test]
    fn empty_alert_list() {
        assert_eq!(alerts(&[]), "No active alerts.");
    }

    #[test]
    fn outlook_lines() {
        let mut slight = SevereOutlook::none(1);
        slight.risk = RiskCategory::Slight;
        slight.label = "SLGT".into();
        slight.description = "Slight".into();
        slight.fill_color = "#F6F67F".into();

        let text = outlooks(&[slight, SevereOutlook::none(2)]);
        assert_eq!(
            text,
            "Day 1: Slight (SLGT, level 2/5) [#F6F67F]\nDay 2: No severe risk for this location"
        );
    }

    #[test]
    fn missing_daily_series_is_reported() {
        let text = forecast(&ForecastBundle::default(), UnitPreference::default());
        assert_eq!(text, "Forecast: unavailable");
    }
}
