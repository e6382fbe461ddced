//! Consumer-side fold over cycle deliveries.

use crate::{
    model::{Alert, CanonicalConditions, Coordinate, ForecastBundle},
    reconcile::{Cycle, Delivery, Update},
    units::{DisplayConditions, UnitPreference},
};

/// Latest known weather for the selected coordinate. Deliveries from a
/// superseded cycle are ignored so a late answer for an old coordinate can
/// never overwrite a newer one.
#[derive(Debug, Clone, Default)]
pub struct WeatherState {
    epoch: u64,
    at: Option<Coordinate>,
    pub conditions: Option<CanonicalConditions>,
    pub forecast: Option<ForecastBundle>,
    pub alerts: Vec<Alert>,
    pub loading: bool,
}

impl WeatherState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn coordinate(&self) -> Option<Coordinate> {
        self.at
    }

    /// Switch to a freshly started cycle and show its placeholder. Forecast
    /// and alerts are dropped when the coordinate changed.
    pub fn begin(&mut self, cycle: &Cycle) {
        if cycle.epoch < self.epoch {
            return;
        }
        if self.at != Some(cycle.at) {
            self.forecast = None;
            self.alerts.clear();
        }
        self.epoch = cycle.epoch;
        self.at = Some(cycle.at);
        self.conditions = Some(cycle.placeholder.clone());
        self.loading = true;
    }

    /// Apply one delivery. Returns `false` when it belonged to a stale cycle.
    pub fn apply(&mut self, delivery: Delivery) -> bool {
        if delivery.epoch != self.epoch {
            return false;
        }
        match delivery.update {
            Update::Conditions(c) => {
                self.conditions = Some(*c);
                self.loading = false;
            }
            Update::Forecast(f) => self.forecast = Some(*f),
            Update::Alerts(a) => self.alerts = a,
            Update::TimedOut => self.loading = false,
        }
        true
    }

    /// Current conditions in the given units, rebuilt from the canonical
    /// record without refetching.
    pub fn display(&self, units: UnitPreference) -> Option<DisplayConditions> {
        self.conditions.as_ref().map(|c| c.display(units))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        insight::Insight,
        model::LOADING,
        provider::ProviderId,
        units::TemperatureUnit,
    };
    use chrono::Utc;
    use tokio::sync::mpsc;

    fn cycle(epoch: u64, at: Coordinate) -> Cycle {
        let (_tx, updates) = mpsc::unbounded_channel();
        Cycle {
            epoch,
            at,
            placeholder: CanonicalConditions::placeholder(at, Utc::now()),
            updates,
        }
    }

    fn reading(temperature: f64) -> Box<CanonicalConditions> {
        let mut c = CanonicalConditions::placeholder(Coordinate::new(40.0, -89.0), Utc::now());
        c.source = Some(ProviderId::Stations);
        c.source_label = "Peoria (KPIA)".into();
        c.condition = "Clear".into();
        c.temperature = temperature;
        c.wind_chill = temperature;
        c.insight = Insight::Nice;
        Box::new(c)
    }

    #[test]
    fn begin_shows_placeholder_while_loading() {
        let mut state = WeatherState::new();
        state.begin(&cycle(1, Coordinate::new(40.0, -89.0)));

        assert!(state.loading);
        assert_eq!(state.conditions.as_ref().unwrap().condition, LOADING);
    }

    #[test]
    fn deliveries_replace_previous_values() {
        let mut state = WeatherState::new();
        state.begin(&cycle(1, Coordinate::new(40.0, -89.0)));

        assert!(state.apply(Delivery {
            epoch: 1,
            update: Update::Conditions(reading(60.0)),
        }));
        assert!(state.apply(Delivery {
            epoch: 1,
            update: Update::Conditions(reading(62.0)),
        }));

        assert!(!state.loading);
        assert_eq!(state.conditions.unwrap().temperature, 62.0);
    }

    #[test]
    fn stale_epoch_is_discarded() {
        let mut state = WeatherState::new();
        state.begin(&cycle(1, Coordinate::new(40.0, -89.0)));
        state.begin(&cycle(2, Coordinate::new(35.0, -97.0)));

        let applied = state.apply(Delivery {
            epoch: 1,
            update: Update::Conditions(reading(60.0)),
        });

        assert!(!applied);
        assert_eq!(state.conditions.as_ref().unwrap().condition, LOADING);
        assert_eq!(state.coordinate(), Some(Coordinate::new(35.0, -97.0)));
    }

    #[test]
    fn older_cycle_cannot_be_restarted_over_newer() {
        let mut state = WeatherState::new();
        state.begin(&cycle(3, Coordinate::new(40.0, -89.0)));
        state.begin(&cycle(2, Coordinate::new(35.0, -97.0)));
        assert_eq!(state.epoch(), 3);
    }

    #[test]
    fn timeout_clears_loading_but_keeps_placeholder() {
        let mut state = WeatherState::new();
        state.begin(&cycle(1, Coordinate::new(40.0, -89.0)));
        state.apply(Delivery {
            epoch: 1,
            update: Update::TimedOut,
        });
        assert!(!state.loading);
        assert!(state.conditions.unwrap().is_placeholder());
    }

    #[test]
    fn display_follows_unit_preference() {
        let mut state = WeatherState::new();
        state.begin(&cycle(1, Coordinate::new(40.0, -89.0)));
        state.apply(Delivery {
            epoch: 1,
            update: Update::Conditions(reading(212.0)),
        });

        let celsius = UnitPreference {
            temperature: TemperatureUnit::Celsius,
            ..UnitPreference::default()
        };
        let shown = state.display(celsius).unwrap();
        assert!((shown.temperature - 100.0).abs() < 1e-9);
        assert_eq!(state.display(UnitPreference::default()).unwrap().temperature, 212.0);
    }
}
