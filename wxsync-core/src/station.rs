//! Nearest-plausible-station selection.

use haversine::{Location, Units, distance};
use tracing::debug;

use crate::{
    FetchError,
    model::{Coordinate, ProviderReading, StationObservation},
    provider::ProviderId,
    units,
};

/// Placeholder weather text that defers to the sky condition.
pub const NO_SIGNIFICANT_WEATHER: &str = "No significant weather present at this time.";

/// Prefix of the weather text reported by unaugmented automated stations.
pub const AUTOMATED_MARKER: &str = "automated observation";

/// Great-circle distance in kilometres (R = 6371 km).
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    distance(
        Location {
            latitude: a.latitude,
            longitude: a.longitude,
        },
        Location {
            latitude: b.latitude,
            longitude: b.longitude,
        },
        Units::Kilometers,
    )
}

/// Distance from a station to the target; `+inf` when the station has no
/// usable position.
pub fn station_distance(station: &StationObservation, target: Coordinate) -> f64 {
    station
        .coordinate()
        .map(|at| distance_km(at, target))
        .filter(|d| d.is_finite())
        .unwrap_or(f64::INFINITY)
}

pub fn is_low_confidence(weather: Option<&str>) -> bool {
    weather.is_some_and(|w| w.to_lowercase().contains(AUTOMATED_MARKER))
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectedStation {
    pub observation: StationObservation,
    pub distance_km: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub station: Option<SelectedStation>,
    /// Ids of nearer stations skipped by the quality gate, nearest first.
    pub rejected: Vec<String>,
}

impl Selection {
    pub fn into_result(self, max_distance_km: f64) -> Result<SelectedStation, FetchError> {
        self.station
            .ok_or(FetchError::NoUsableStation { max_distance_km })
    }
}

/// Pick the nearest station that passes the quality gate. Disqualified
/// stations are skipped repeatedly until one qualifies or the list runs out;
/// a qualifying station beyond `max_distance_km` means no usable station.
pub fn select_station(
    stations: &[StationObservation],
    target: Coordinate,
    max_distance_km: f64,
) -> Selection {
    let mut ranked: Vec<(usize, f64)> = stations
        .iter()
        .enumerate()
        .map(|(i, s)| (i, station_distance(s, target)))
        .collect();
    // Stable: the first station at the minimum distance wins.
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut selection = Selection::default();
    for (i, d) in ranked {
        let station = &stations[i];
        if is_low_confidence(station.weather.as_deref()) {
            debug!(station = %station.id, distance_km = d, "rejecting low-confidence station");
            selection.rejected.push(station.id.clone());
            continue;
        }
        if d <= max_distance_km {
            debug!(station = %station.id, distance_km = d, "selected station");
            selection.station = Some(SelectedStation {
                observation: station.clone(),
                distance_km: d,
            });
        } else {
            debug!(station = %station.id, distance_km = d, "nearest usable station is too far");
        }
        break;
    }
    selection
}

/// "Name (ID)", collapsing to whichever part is present.
pub(crate) fn label(name: &str, id: &str) -> Option<String> {
    let label = match (name.trim(), id.trim()) {
        ("", id) => id.to_string(),
        (name, "") => name.to_string(),
        (name, id) if name == id => id.to_string(),
        (name, id) => format!("{name} ({id})"),
    };
    (!label.is_empty()).then_some(label)
}

impl From<&SelectedStation> for ProviderReading {
    fn from(selected: &SelectedStation) -> Self {
        let s = &selected.observation;

        let condition = match s.weather.as_deref() {
            Some(w) if w.trim().eq_ignore_ascii_case(NO_SIGNIFICANT_WEATHER) => {
                s.sky_condition.clone().or_else(|| s.weather.clone())
            }
            _ => s.weather.clone().or_else(|| s.sky_condition.clone()),
        };

        let wind_chill = match (s.temperature, s.wind_speed) {
            (Some(t), Some(w)) => units::wind_chill_f(t, w),
            _ => None,
        };

        ProviderReading {
            source: Some(ProviderId::Stations),
            source_label: label(&s.name, &s.id),
            condition,
            temperature: s.temperature,
            dew_point: s.dew_point,
            wind_direction: s.wind_direction,
            wind_speed: s.wind_speed,
            wind_gust: s.wind_gust,
            wind_chill,
            pressure: s.pressure,
            humidity: s.humidity,
            visibility: s.visibility,
            ..ProviderReading::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET: Coordinate = Coordinate {
        latitude: 40.6936,
        longitude: -89.5890,
    };

    fn station(id: &str, lat: f64, lon: f64, weather: &str) -> StationObservation {
        StationObservation {
            id: id.to_string(),
            name: format!("{id} Airport"),
            latitude: Some(lat),
            longitude: Some(lon),
            weather: Some(weather.to_string()),
            sky_condition: Some("Clear".to_string()),
            temperature: Some(60.0),
            ..StationObservation::default()
        }
    }

    const AUTO: &str = "Automated observation with no human augmentation; there may or may not be significant weather present at this time.";

    #[test]
    fn haversine_is_symmetric_and_zero_on_self() {
        let a = Coordinate::new(40.7128, -74.0060);
        let b = Coordinate::new(51.5074, -0.1278);
        assert!((distance_km(a, b) - distance_km(b, a)).abs() < 1e-9);
        assert_eq!(distance_km(a, a), 0.0);
        let d = distance_km(a, b);
        assert!((5560.0..5590.0).contains(&d), "NYC-London ~5570 km, got {d}");
    }

    #[test]
    fn missing_position_is_infinitely_far() {
        let mut s = station("KXXX", 0.0, 0.0, "Clear");
        s.latitude = None;
        assert_eq!(station_distance(&s, TARGET), f64::INFINITY);

        s.latitude = Some(f64::NAN);
        assert_eq!(station_distance(&s, TARGET), f64::INFINITY);
    }

    #[test]
    fn picks_nearest_station() {
        let stations = vec![
            station("FAR", 40.80, -89.70, "Light Rain"),
            station("NEAR", 40.70, -89.60, "Light Rain"),
        ];
        let sel = select_station(&stations, TARGET, 15.0);
        assert_eq!(sel.station.unwrap().observation.id, "NEAR");
        assert!(sel.rejected.is_empty());
    }

    #[test]
    fn skips_every_low_confidence_station() {
        let stations = vec![
            station("AUTO1", 40.694, -89.589, AUTO),
            station("AUTO2", 40.70, -89.60, AUTO),
            station("GOOD", 40.75, -89.62, "Overcast"),
        ];
        let sel = select_station(&stations, TARGET, 15.0);
        assert_eq!(sel.rejected, vec!["AUTO1".to_string(), "AUTO2".to_string()]);
        assert_eq!(sel.station.unwrap().observation.id, "GOOD");
    }

    #[test]
    fn nothing_usable_when_all_disqualified_or_empty() {
        let stations = vec![station("AUTO1", 40.694, -89.589, AUTO)];
        let sel = select_station(&stations, TARGET, 15.0);
        assert!(sel.station.is_none());
        assert!(matches!(
            sel.into_result(15.0),
            Err(FetchError::NoUsableStation { .. })
        ));

        assert!(select_station(&[], TARGET, 15.0).station.is_none());
    }

    #[test]
    fn nearest_qualified_beyond_threshold_is_not_usable() {
        let stations = vec![station("DISTANT", 41.5, -90.5, "Clear")];
        let sel = select_station(&stations, TARGET, 15.0);
        assert!(sel.station.is_none());
    }

    #[test]
    fn tie_goes_to_first_station() {
        let stations = vec![
            station("FIRST", 40.70, -89.60, "Clear"),
            station("SECOND", 40.70, -89.60, "Clear"),
        ];
        let sel = select_station(&stations, TARGET, 15.0);
        assert_eq!(sel.station.unwrap().observation.id, "FIRST");
    }

    #[test]
    fn selected_station_has_minimum_distance_among_qualified() {
        let stations = vec![
            station("A", 40.72, -89.61, "Haze"),
            station("B", 40.69, -89.58, AUTO),
            station("C", 40.71, -89.59, "Mist"),
            station("D", 40.60, -89.50, "Clear"),
        ];
        let sel = select_station(&stations, TARGET, 15.0);
        let chosen = sel.station.unwrap();
        let min = stations
            .iter()
            .filter(|s| !is_low_confidence(s.weather.as_deref()))
            .map(|s| station_distance(s, TARGET))
            .fold(f64::INFINITY, f64::min);
        assert_eq!(chosen.distance_km, min);
    }

    #[test]
    fn no_significant_weather_defers_to_sky_condition() {
        let selected = SelectedStation {
            observation: station("KPIA", 40.66, -89.68, NO_SIGNIFICANT_WEATHER),
            distance_km: 5.0,
        };
        let reading = ProviderReading::from(&selected);
        assert_eq!(reading.condition.as_deref(), Some("Clear"));
        assert_eq!(reading.source, Some(ProviderId::Stations));
        assert_eq!(reading.source_label.as_deref(), Some("KPIA Airport (KPIA)"));
    }

    #[test]
    fn label_collapses_missing_parts() {
        assert_eq!(label("", "KPIA").as_deref(), Some("KPIA"));
        assert_eq!(label("KPIA", "KPIA").as_deref(), Some("KPIA"));
        assert_eq!(label(" ", ""), None);
    }
}
