//! Reconciliation of every provider's answer into one canonical view.
//!
//! [`reconcile`] is a pure function from the responses collected so far to
//! whatever can already be decided. The [`Engine`] launches every provider
//! concurrently, re-runs [`reconcile`] each time a branch resolves and sends
//! the parts that changed down a channel tagged with the cycle's epoch.
//!
//! Priority is fixed by source identity, never by arrival order: a usable
//! station beats the point forecast's nearby observation, which beats the
//! one-call current block, and the point forecast beats the synthesized daily
//! series. Once all branches have resolved the result is
//! the same whatever order they finished in.

use std::{
    future::Future,
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use futures::{StreamExt, stream::FuturesUnordered};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    FetchError, RefreshRejected, forecast, insight,
    model::{
        Alert, CanonicalConditions, Coordinate, DailySeries, ForecastBundle, ProviderReading,
        StationObservation, UNAVAILABLE,
    },
    provider::{
        Provider, ProviderId, ProviderSet, onecall::OneCallData, point_forecast::PointForecast,
    },
    refresh::RefreshGate,
    solar, station,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleState {
    SelectingStation,
    StationRejected,
    NoStation,
    FallbackProvider,
    FallbackForecastProvider,
    Merging,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReconcileSettings {
    pub max_station_distance_km: f64,
    pub visibility_cap_mi: f64,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            max_station_distance_km: 15.0,
            visibility_cap_mi: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    pub reconcile: ReconcileSettings,
    /// After this long the consumer is told to stop showing a loading state.
    pub delivery_timeout: Duration,
    pub refresh_cooldown: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            reconcile: ReconcileSettings::default(),
            delivery_timeout: Duration::from_secs(4),
            refresh_cooldown: Duration::from_secs(30),
        }
    }
}

/// What each provider has answered so far. `None` means still in flight.
#[derive(Debug, Clone, Default)]
pub struct Responses {
    pub stations: Option<Result<Vec<StationObservation>, FetchError>>,
    pub one_call: Option<Result<OneCallData, FetchError>>,
    pub point_forecast: Option<Result<PointForecast, FetchError>>,
    pub alerts: Option<Result<Vec<Alert>, FetchError>>,
}

impl Responses {
    pub fn is_complete(&self) -> bool {
        self.stations.is_some()
            && self.one_call.is_some()
            && self.point_forecast.is_some()
            && self.alerts.is_some()
    }

    fn one_call(&self) -> Option<&OneCallData> {
        self.one_call.as_ref()?.as_ref().ok()
    }

    fn record(&mut self, branch: Branch) {
        match branch {
            Branch::Stations(r) => self.stations = Some(r),
            Branch::OneCall(r) => self.one_call = Some(r),
            Branch::PointForecast(r) => self.point_forecast = Some(r),
            Branch::Alerts(r) => self.alerts = Some(r),
        }
    }
}

/// Everything decidable from a set of responses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    pub conditions: Option<CanonicalConditions>,
    pub forecast: Option<ForecastBundle>,
    pub alerts: Option<Vec<Alert>>,
    pub states: Vec<CycleState>,
}

pub fn reconcile(
    responses: &Responses,
    at: Coordinate,
    settings: &ReconcileSettings,
    now: DateTime<Utc>,
) -> Reconciliation {
    let mut states = Vec::new();

    let forecast = resolve_forecast(responses, &mut states);
    let reading = resolve_current(responses, at, settings, &mut states);

    let conditions = reading.map(|reading| {
        states.push(CycleState::Merging);
        let hourly = forecast.as_ref().map(|f| f.next_24h_precip().collect::<Vec<_>>());
        canonicalize(reading, at, settings, now, hourly.unwrap_or_default())
    });

    let alerts = responses.alerts.as_ref().map(|r| match r {
        Ok(alerts) => alerts.clone(),
        Err(err) => {
            debug!(error = %err, "alerts unavailable");
            Vec::new()
        }
    });

    if responses.is_complete() {
        states.push(CycleState::Done);
    }

    Reconciliation {
        conditions,
        forecast,
        alerts,
        states,
    }
}

/// The winning current-conditions reading, or `None` while undecidable.
/// A decided cycle with no usable source yields an empty reading.
fn resolve_current(
    responses: &Responses,
    at: Coordinate,
    settings: &ReconcileSettings,
    states: &mut Vec<CycleState>,
) -> Option<ProviderReading> {
    states.push(CycleState::SelectingStation);

    let selected = match responses.stations.as_ref()? {
        Ok(list) => {
            let selection = station::select_station(list, at, settings.max_station_distance_km);
            for _ in &selection.rejected {
                states.extend([CycleState::StationRejected, CycleState::SelectingStation]);
            }
            match selection.into_result(settings.max_station_distance_km) {
                Ok(selected) => Some(selected),
                Err(err) => {
                    debug!(error = %err, "station feed gave nothing usable");
                    None
                }
            }
        }
        Err(err) => {
            debug!(error = %err, "station feed unavailable");
            None
        }
    };

    let one_call_current = responses.one_call().and_then(|d| d.current.as_ref());

    if let Some(selected) = selected {
        debug!(
            station = %selected.observation.id,
            distance_km = selected.distance_km,
            "using station observation"
        );
        let mut reading = ProviderReading::from(&selected);
        if let Some(current) = one_call_current {
            reading.fill_gaps(current);
        }
        return Some(reading);
    }

    states.extend([CycleState::NoStation, CycleState::FallbackProvider]);
    let observation = match responses.point_forecast.as_ref()? {
        Ok(pf) => pf.observation.as_ref(),
        Err(_) => None,
    };
    if let Some(observation) = observation {
        debug!(source = ?observation.source_label, "using point forecast observation");
        let mut reading = observation.clone();
        if let Some(current) = one_call_current {
            reading.fill_gaps(current);
        }
        return Some(reading);
    }

    match responses.one_call.as_ref()? {
        Ok(OneCallData {
            current: Some(current),
            ..
        }) => {
            debug!("using one-call current conditions");
            Some(current.clone())
        }
        Ok(_) => {
            debug!("one-call response had no current block");
            Some(ProviderReading::default())
        }
        Err(err) => {
            debug!(error = %err, "no current-conditions source available");
            Some(ProviderReading::default())
        }
    }
}

fn resolve_forecast(responses: &Responses, states: &mut Vec<CycleState>) -> Option<ForecastBundle> {
    if responses.point_forecast.is_none() && responses.one_call.is_none() {
        return None;
    }
    let one_call = responses.one_call();

    let daily = match &responses.point_forecast {
        Some(Ok(pf)) if !pf.periods.is_empty() => Some(DailySeries {
            source: ProviderId::PointForecast,
            periods: pf.periods.clone(),
        }),
        Some(failed) => {
            if let Err(err) = failed {
                debug!(error = %err, "point forecast unavailable");
            }
            states.push(CycleState::FallbackForecastProvider);
            one_call
                .filter(|d| !d.daily.is_empty())
                .map(|d| forecast::synthesize_daily(&d.daily))
        }
        None => None,
    };

    Some(ForecastBundle {
        daily,
        hourly: one_call.map(|d| d.hourly.clone()).unwrap_or_default(),
        minutely: one_call.map(|d| d.minutely.clone()).unwrap_or_default(),
    })
}

/// Resolve every field: clamp implausible values, default absent ones and
/// attach the insight.
fn canonicalize(
    mut reading: ProviderReading,
    at: Coordinate,
    settings: &ReconcileSettings,
    now: DateTime<Utc>,
    next_24h_precip: Vec<f64>,
) -> CanonicalConditions {
    for conflict in sanitize(&mut reading, settings) {
        debug!(error = %conflict, "clamped provider value");
    }

    let value = |v: Option<f64>| v.filter(|x| x.is_finite());
    let text = |t: Option<String>| {
        t.filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| UNAVAILABLE.to_string())
    };
    let (solar_rise, solar_set) = solar::sunrise_sunset(at, now.date_naive());

    let temperature = value(reading.temperature).unwrap_or(0.0);
    let wind_speed = value(reading.wind_speed).unwrap_or(0.0);

    let mut conditions = CanonicalConditions {
        source: reading.source,
        source_label: text(reading.source_label),
        condition: text(reading.condition),
        temperature,
        dew_point: value(reading.dew_point).unwrap_or(0.0),
        wind_direction: value(reading.wind_direction).unwrap_or(0.0),
        wind_speed,
        wind_gust: value(reading.wind_gust).unwrap_or(wind_speed),
        wind_chill: value(reading.wind_chill).unwrap_or(temperature),
        pressure: value(reading.pressure).unwrap_or(0.0),
        humidity: value(reading.humidity).unwrap_or(0.0),
        visibility: value(reading.visibility).unwrap_or(0.0),
        cloud_cover: value(reading.cloud_cover).unwrap_or(0.0),
        uv_index: value(reading.uv_index).unwrap_or(0.0),
        sunrise: reading.sunrise.unwrap_or(solar_rise),
        sunset: reading.sunset.unwrap_or(solar_set),
        last_updated: now,
        insight: insight::Insight::Unavailable,
    };
    conditions.insight = insight::generate(&conditions, next_24h_precip);
    conditions
}

/// Clamp humidity into 0..=100 % and visibility to the cap, reporting each
/// value that had to be changed.
fn sanitize(reading: &mut ProviderReading, settings: &ReconcileSettings) -> Vec<FetchError> {
    let provider = reading.source.unwrap_or(ProviderId::OneCall);
    let mut conflicts = Vec::new();
    let mut clamp = |slot: &mut Option<f64>, name: &str, max: f64| {
        if let Some(v) = slot.filter(|v| v.is_finite()) {
            let clamped = v.clamp(0.0, max);
            if clamped != v {
                conflicts.push(FetchError::ConflictingData {
                    provider,
                    message: format!("{name} {v} clamped to {clamped}"),
                });
                *slot = Some(clamped);
            }
        }
    };
    clamp(&mut reading.humidity, "humidity", 100.0);
    clamp(&mut reading.visibility, "visibility", settings.visibility_cap_mi);
    conflicts
}

enum Branch {
    Stations(Result<Vec<StationObservation>, FetchError>),
    OneCall(Result<OneCallData, FetchError>),
    PointForecast(Result<PointForecast, FetchError>),
    Alerts(Result<Vec<Alert>, FetchError>),
}

impl Branch {
    fn provider(&self) -> ProviderId {
        match self {
            Branch::Stations(_) => ProviderId::Stations,
            Branch::OneCall(_) => ProviderId::OneCall,
            Branch::PointForecast(_) => ProviderId::PointForecast,
            Branch::Alerts(_) => ProviderId::Alerts,
        }
    }

    fn error(&self) -> Option<&FetchError> {
        match self {
            Branch::Stations(r) => r.as_ref().err(),
            Branch::OneCall(r) => r.as_ref().err(),
            Branch::PointForecast(r) => r.as_ref().err(),
            Branch::Alerts(r) => r.as_ref().err(),
        }
    }
}

type BranchFuture = Pin<Box<dyn Future<Output = Branch> + Send>>;

/// One partial result. Each delivery replaces the consumer's copy of the
/// part it carries.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Conditions(Box<CanonicalConditions>),
    Forecast(Box<ForecastBundle>),
    Alerts(Vec<Alert>),
    /// The delivery timeout passed; stop showing a loading state. Results
    /// still outstanding are delivered when they arrive.
    TimedOut,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub epoch: u64,
    pub update: Update,
}

/// A running reconciliation cycle. The channel closes once every provider
/// has answered.
#[derive(Debug)]
pub struct Cycle {
    pub epoch: u64,
    pub at: Coordinate,
    pub placeholder: CanonicalConditions,
    pub updates: mpsc::UnboundedReceiver<Delivery>,
}

#[derive(Debug)]
pub struct Engine {
    providers: ProviderSet,
    settings: EngineSettings,
    epoch: Arc<AtomicU64>,
}

impl Engine {
    pub fn new(providers: ProviderSet, settings: EngineSettings) -> Self {
        Self {
            providers,
            settings,
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Epoch of the most recently started cycle.
    pub fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    pub fn refresh_gate(&self) -> RefreshGate {
        RefreshGate::new(self.settings.refresh_cooldown)
    }

    /// Launch every provider for `at` and return the placeholder at once.
    /// Must be called inside a tokio runtime.
    pub fn start(&self, at: Coordinate) -> Cycle {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let placeholder = CanonicalConditions::placeholder(at, Utc::now());
        let (tx, updates) = mpsc::unbounded_channel();

        info!(epoch, %at, "starting reconciliation cycle");
        tokio::spawn(run_cycle(
            self.providers.clone(),
            self.settings,
            Arc::clone(&self.epoch),
            epoch,
            at,
            tx,
        ));

        Cycle {
            epoch,
            at,
            placeholder,
            updates,
        }
    }

    /// User-initiated refresh. Inside the cooldown nothing is fetched.
    pub fn refresh(&self, gate: &mut RefreshGate, at: Coordinate) -> Result<Cycle, RefreshRejected> {
        gate.try_begin(Utc::now())?;
        Ok(self.start(at))
    }
}

async fn run_cycle(
    providers: ProviderSet,
    settings: EngineSettings,
    latest_epoch: Arc<AtomicU64>,
    epoch: u64,
    at: Coordinate,
    tx: mpsc::UnboundedSender<Delivery>,
) {
    let mut pending: FuturesUnordered<BranchFuture> = FuturesUnordered::new();
    {
        let p = Arc::clone(&providers.stations);
        pending.push(Box::pin(async move { Branch::Stations(p.fetch(at).await) }));
        let p = Arc::clone(&providers.one_call);
        pending.push(Box::pin(async move { Branch::OneCall(p.fetch(at).await) }));
        let p = Arc::clone(&providers.point_forecast);
        pending.push(Box::pin(async move { Branch::PointForecast(p.fetch(at).await) }));
        let p = Arc::clone(&providers.alerts);
        pending.push(Box::pin(async move { Branch::Alerts(p.fetch(at).await) }));
    }

    let send = |update: Update| tx.send(Delivery { epoch, update }).is_ok();

    let deadline = tokio::time::sleep(settings.delivery_timeout);
    tokio::pin!(deadline);
    let mut timed_out = false;

    let mut responses = Responses::default();
    let mut last = Reconciliation::default();

    loop {
        tokio::select! {
            next = pending.next() => {
                let Some(branch) = next else { break };
                match branch.error() {
                    Some(err) => warn!(epoch, provider = %branch.provider(), error = %err, "source unavailable"),
                    None => debug!(epoch, provider = %branch.provider(), "source answered"),
                }
                responses.record(branch);

                let current = reconcile(&responses, at, &settings.reconcile, Utc::now());
                debug!(epoch, states = ?current.states, "reconciled");
                for update in changes(&last, &current) {
                    if !send(update) {
                        debug!(epoch, "receiver dropped, abandoning cycle");
                        return;
                    }
                }
                last = current;
            }
            _ = &mut deadline, if !timed_out => {
                timed_out = true;
                debug!(epoch, "delivery timeout reached");
                if !send(Update::TimedOut) {
                    return;
                }
            }
        }
    }

    if latest_epoch.load(Ordering::SeqCst) != epoch {
        debug!(epoch, "cycle finished after being superseded");
    }
    info!(epoch, "reconciliation cycle done");
}

/// Updates for every part of `current` that is new or differs from `last`.
fn changes(last: &Reconciliation, current: &Reconciliation) -> Vec<Update> {
    let mut updates = Vec::new();

    if let Some(c) = &current.conditions {
        let unchanged = last.conditions.as_ref().is_some_and(|prev| {
            CanonicalConditions {
                last_updated: c.last_updated,
                ..prev.clone()
            } == *c
        });
        if !unchanged {
            updates.push(Update::Conditions(Box::new(c.clone())));
        }
    }
    if let Some(f) = &current.forecast {
        if last.forecast.as_ref() != Some(f) {
            updates.push(Update::Forecast(Box::new(f.clone())));
        }
    }
    if let Some(a) = &current.alerts {
        if last.alerts.as_ref() != Some(a) {
            updates.push(Update::Alerts(a.clone()));
        }
    }
    updates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        insight::Insight,
        model::{ForecastPeriod, HourlyPoint, LOADING, MinutelyPoint, TempLabel},
        provider::onecall::OneCallDay,
        station::NO_SIGNIFICANT_WEATHER,
    };
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::AtomicUsize;

    const AT: Coordinate = Coordinate {
        latitude: 40.6936,
        longitude: -89.5890,
    };

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 19, 18, 0, 0).unwrap()
    }

    fn nearby_station() -> StationObservation {
        StationObservation {
            id: "KPIA".into(),
            name: "Peoria".into(),
            latitude: Some(40.66),
            longitude: Some(-89.68),
            weather: Some(NO_SIGNIFICANT_WEATHER.into()),
            sky_condition: Some("Clear".into()),
            temperature: Some(64.0),
            wind_speed: Some(8.0),
            humidity: Some(55.0),
            visibility: Some(10.0),
            ..StationObservation::default()
        }
    }

    fn one_call(temperature: f64, humidity: f64) -> OneCallData {
        let day = |d: u32, max: f64, min: f64| OneCallDay {
            time: Utc.with_ymd_and_hms(2025, 10, d, 17, 0, 0).unwrap(),
            temp_max: max,
            temp_min: min,
            pop: Some(0.1),
            main: "Clear".into(),
            description: "clear sky".into(),
            icon: None,
        };
        OneCallData {
            current: Some(ProviderReading {
                source: Some(ProviderId::OneCall),
                source_label: Some("OpenWeatherMap".into()),
                condition: Some("clear sky".into()),
                temperature: Some(temperature),
                humidity: Some(humidity),
                visibility: Some(12.0),
                uv_index: Some(4.0),
                ..ProviderReading::default()
            }),
            daily: vec![day(20, 80.0, 60.0), day(21, 75.0, 58.0)],
            ..OneCallData::default()
        }
    }

    fn unavailable(provider: ProviderId) -> FetchError {
        FetchError::Network {
            provider,
            message: "connection refused".into(),
        }
    }

    fn settled(responses: &Responses) -> Reconciliation {
        reconcile(responses, AT, &ReconcileSettings::default(), now())
    }

    #[test]
    fn station_sky_condition_replaces_placeholder_text() {
        let out = settled(&Responses {
            stations: Some(Ok(vec![nearby_station()])),
            one_call: Some(Err(FetchError::MissingCredential(ProviderId::OneCall))),
            point_forecast: Some(Err(unavailable(ProviderId::PointForecast))),
            alerts: Some(Ok(vec![])),
        });

        let c = out.conditions.unwrap();
        assert_eq!(c.condition, "Clear");
        assert!(c.source_label.contains("KPIA"));
        assert_eq!(c.source, Some(ProviderId::Stations));
        assert!(!out.states.contains(&CycleState::NoStation));
        assert_eq!(out.states.last(), Some(&CycleState::Done));
    }

    #[test]
    fn fallback_provider_humidity_is_clamped() {
        let out = settled(&Responses {
            stations: Some(Ok(vec![])),
            one_call: Some(Ok(one_call(72.5, 105.0))),
            point_forecast: Some(Ok(PointForecast::default())),
            alerts: Some(Ok(vec![])),
        });

        let c = out.conditions.unwrap();
        assert_eq!(c.humidity, 100.0);
        assert_eq!(c.temperature, 72.5);
        assert_eq!(c.visibility, 10.0);
        assert_eq!(c.source_label, "OpenWeatherMap");
        assert!(out.states.contains(&CycleState::NoStation));
        assert!(out.states.contains(&CycleState::FallbackProvider));
    }

    #[test]
    fn daily_series_is_synthesized_when_point_forecast_fails() {
        let out = settled(&Responses {
            stations: Some(Ok(vec![])),
            one_call: Some(Ok(one_call(70.0, 50.0))),
            point_forecast: Some(Err(unavailable(ProviderId::PointForecast))),
            alerts: Some(Ok(vec![])),
        });

        let daily = out.forecast.unwrap().daily.unwrap();
        assert_eq!(daily.source, ProviderId::OneCall);
        let temps: Vec<_> = daily.periods.iter().map(|p| p.temperature).collect();
        assert_eq!(temps, vec![Some(80.0), Some(60.0), Some(75.0), Some(58.0)]);
        let labels: Vec<_> = daily.periods.iter().map(|p| p.label).collect();
        assert_eq!(
            labels,
            vec![TempLabel::High, TempLabel::Low, TempLabel::High, TempLabel::Low]
        );
        assert!(out.states.contains(&CycleState::FallbackForecastProvider));
    }

    fn tonight() -> ForecastPeriod {
        ForecastPeriod {
            name: "Tonight".into(),
            start_time: None,
            label: TempLabel::Low,
            temperature: Some(48.0),
            precip_probability: 0.0,
            condition: "Mostly Clear".into(),
            detail: "Mostly clear, with a low around 48.".into(),
            icon_url: None,
        }
    }

    fn hour(h: i64, precip_probability: f64) -> HourlyPoint {
        HourlyPoint {
            time: now() + chrono::Duration::hours(h),
            temperature: 70.0,
            feels_like: 70.0,
            precip_probability,
            wind_speed: 5.0,
            wind_gust: None,
            condition: "Rain".into(),
        }
    }

    fn government_observation() -> ProviderReading {
        ProviderReading {
            source: Some(ProviderId::PointForecast),
            source_label: Some("Peoria, Greater Peoria Regional Airport (KPIA)".into()),
            condition: Some("A Few Clouds".into()),
            temperature: Some(55.0),
            wind_speed: Some(12.0),
            humidity: Some(59.0),
            ..ProviderReading::default()
        }
    }

    #[test]
    fn point_forecast_wins_daily_series() {
        let out = settled(&Responses {
            stations: Some(Ok(vec![])),
            one_call: Some(Ok(one_call(70.0, 50.0))),
            point_forecast: Some(Ok(PointForecast {
                periods: vec![tonight()],
                observation: None,
            })),
            alerts: Some(Ok(vec![])),
        });

        let daily = out.forecast.unwrap().daily.unwrap();
        assert_eq!(daily.source, ProviderId::PointForecast);
        assert_eq!(daily.periods, vec![tonight()]);
    }

    #[test]
    fn hourly_and_minutely_come_from_one_call_when_point_forecast_wins() {
        let mut data = one_call(70.0, 50.0);
        data.hourly = vec![hour(1, 10.0), hour(2, 20.0)];
        data.minutely = vec![MinutelyPoint {
            time: now(),
            precipitation: 0.4,
        }];

        let out = settled(&Responses {
            stations: Some(Ok(vec![])),
            one_call: Some(Ok(data.clone())),
            point_forecast: Some(Ok(PointForecast {
                periods: vec![tonight()],
                observation: None,
            })),
            alerts: Some(Ok(vec![])),
        });

        let bundle = out.forecast.unwrap();
        assert_eq!(bundle.daily.unwrap().source, ProviderId::PointForecast);
        assert_eq!(bundle.hourly, data.hourly);
        assert_eq!(bundle.minutely, data.minutely);
    }

    #[test]
    fn station_gust_and_wind_chill_are_never_borrowed() {
        let warm_station = StationObservation {
            temperature: Some(75.0),
            wind_speed: Some(5.0),
            wind_gust: None,
            ..nearby_station()
        };
        let mut data = one_call(80.0, 50.0);
        if let Some(current) = data.current.as_mut() {
            current.wind_chill = Some(68.0);
            current.wind_gust = Some(20.0);
        }

        let out = settled(&Responses {
            stations: Some(Ok(vec![warm_station])),
            one_call: Some(Ok(data)),
            point_forecast: Some(Err(unavailable(ProviderId::PointForecast))),
            alerts: Some(Ok(vec![])),
        });

        let c = out.conditions.unwrap();
        assert_eq!(c.temperature, 75.0);
        assert_eq!(c.wind_gust, 5.0);
        assert_eq!(c.wind_chill, 75.0);
        assert_eq!(c.uv_index, 4.0);
        assert_eq!(c.insight, Insight::Nice);
    }

    #[test]
    fn government_observation_beats_one_call_without_a_station() {
        let out = settled(&Responses {
            stations: Some(Ok(vec![])),
            one_call: Some(Ok(one_call(70.0, 50.0))),
            point_forecast: Some(Ok(PointForecast {
                periods: vec![],
                observation: Some(government_observation()),
            })),
            alerts: Some(Ok(vec![])),
        });

        let c = out.conditions.unwrap();
        assert_eq!(c.source, Some(ProviderId::PointForecast));
        assert_eq!(c.condition, "A Few Clouds");
        assert_eq!(c.temperature, 55.0);
        assert_eq!(c.uv_index, 4.0);
        assert_eq!(c.wind_gust, 12.0);
        assert_eq!(out.forecast.unwrap().daily.unwrap().source, ProviderId::OneCall);
    }

    #[test]
    fn station_beats_government_observation() {
        let out = settled(&Responses {
            stations: Some(Ok(vec![nearby_station()])),
            one_call: Some(Ok(one_call(70.0, 50.0))),
            point_forecast: Some(Ok(PointForecast {
                periods: vec![tonight()],
                observation: Some(government_observation()),
            })),
            alerts: Some(Ok(vec![])),
        });

        let c = out.conditions.unwrap();
        assert_eq!(c.source, Some(ProviderId::Stations));
        assert_eq!(c.temperature, 64.0);
    }

    #[test]
    fn fallback_waits_for_the_point_forecast() {
        let out = settled(&Responses {
            stations: Some(Ok(vec![])),
            one_call: Some(Ok(one_call(70.0, 50.0))),
            ..Responses::default()
        });
        assert!(out.conditions.is_none());
        assert!(out.states.contains(&CycleState::NoStation));
    }

    #[test]
    fn total_failure_still_yields_complete_conditions() {
        let out = settled(&Responses {
            stations: Some(Err(unavailable(ProviderId::Stations))),
            one_call: Some(Err(FetchError::MissingCredential(ProviderId::OneCall))),
            point_forecast: Some(Err(unavailable(ProviderId::PointForecast))),
            alerts: Some(Err(unavailable(ProviderId::Alerts))),
        });

        let c = out.conditions.unwrap();
        assert!(c.numeric_fields().iter().all(|v| v.is_finite()));
        assert_eq!(c.condition, UNAVAILABLE);
        assert_eq!(c.source_label, UNAVAILABLE);
        assert_eq!(c.insight, Insight::Unavailable);
        assert_eq!(out.alerts, Some(vec![]));
        assert_eq!(out.forecast.unwrap().daily, None);
        assert_eq!(out.states.last(), Some(&CycleState::Done));
    }

    #[test]
    fn station_reading_is_gap_filled_from_one_call() {
        let out = settled(&Responses {
            stations: Some(Ok(vec![nearby_station()])),
            one_call: Some(Ok(one_call(70.0, 50.0))),
            ..Responses::default()
        });

        let c = out.conditions.unwrap();
        assert_eq!(c.temperature, 64.0);
        assert_eq!(c.uv_index, 4.0);
        assert_eq!(c.source, Some(ProviderId::Stations));
    }

    #[test]
    fn nothing_is_decided_before_the_station_feed_answers() {
        let out = settled(&Responses {
            one_call: Some(Ok(one_call(70.0, 50.0))),
            ..Responses::default()
        });
        assert!(out.conditions.is_none());
        assert!(out.forecast.is_some());
        assert!(out.alerts.is_none());
        assert!(!out.states.contains(&CycleState::Done));
    }

    #[test]
    fn heavy_rain_in_hourly_series_drives_the_insight() {
        let mut data = one_call(70.0, 50.0);
        data.hourly = (0..30)
            .map(|h| hour(h, if h == 5 { 90.0 } else { 10.0 }))
            .collect();

        let out = settled(&Responses {
            stations: Some(Ok(vec![])),
            one_call: Some(Ok(data)),
            point_forecast: Some(Err(unavailable(ProviderId::PointForecast))),
            ..Responses::default()
        });
        assert_eq!(
            out.conditions.unwrap().insight,
            Insight::HeavyPrecipitation { probability: 90.0 }
        );
    }

    #[derive(Debug)]
    struct Fake<T> {
        id: ProviderId,
        result: Result<T, FetchError>,
        delay: Duration,
        calls: Arc<AtomicUsize>,
    }

    impl<T> Fake<T> {
        fn new(id: ProviderId, result: Result<T, FetchError>) -> Self {
            Self {
                id,
                result,
                delay: Duration::ZERO,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn delayed(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl<T> Provider for Fake<T>
    where
        T: Clone + Send + Sync + std::fmt::Debug + 'static,
    {
        type Output = T;

        fn id(&self) -> ProviderId {
            self.id
        }

        async fn fetch(&self, _at: Coordinate) -> Result<T, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.result.clone()
        }
    }

    fn fakes(station_delay: Duration) -> (ProviderSet, Arc<AtomicUsize>) {
        let stations =
            Fake::new(ProviderId::Stations, Ok(vec![nearby_station()])).delayed(station_delay);
        let station_calls = Arc::clone(&stations.calls);
        let set = ProviderSet {
            stations: Arc::new(stations),
            one_call: Arc::new(Fake::new(ProviderId::OneCall, Ok(one_call(70.0, 50.0)))),
            point_forecast: Arc::new(Fake::<PointForecast>::new(
                ProviderId::PointForecast,
                Err(unavailable(ProviderId::PointForecast)),
            )),
            alerts: Arc::new(Fake::<Vec<Alert>>::new(ProviderId::Alerts, Ok(vec![]))),
        };
        (set, station_calls)
    }

    async fn drain(cycle: &mut Cycle) -> Vec<Delivery> {
        let mut out = Vec::new();
        while let Some(d) = cycle.updates.recv().await {
            out.push(d);
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn cycle_returns_placeholder_then_deliveries() {
        let (set, _) = fakes(Duration::from_millis(50));
        let engine = Engine::new(set, EngineSettings::default());

        let mut cycle = engine.start(AT);
        assert_eq!(cycle.placeholder.condition, LOADING);
        assert!(cycle.placeholder.is_placeholder());

        let deliveries = drain(&mut cycle).await;
        assert!(deliveries.iter().all(|d| d.epoch == cycle.epoch));
        let last_conditions = deliveries
            .iter()
            .rev()
            .find_map(|d| match &d.update {
                Update::Conditions(c) => Some(c),
                _ => None,
            })
            .unwrap();
        assert_eq!(last_conditions.condition, "Clear");
        assert!(
            deliveries
                .iter()
                .any(|d| matches!(d.update, Update::Alerts(ref a) if a.is_empty()))
        );
        assert!(!deliveries.iter().any(|d| d.update == Update::TimedOut));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_source_gets_timeout_notice_then_late_result() {
        let (set, _) = fakes(Duration::from_secs(10));
        let engine = Engine::new(set, EngineSettings::default());

        let mut cycle = engine.start(AT);
        let deliveries = drain(&mut cycle).await;

        let timed_out = deliveries
            .iter()
            .position(|d| d.update == Update::TimedOut)
            .unwrap();
        let conditions = deliveries
            .iter()
            .position(|d| matches!(d.update, Update::Conditions(_)))
            .unwrap();
        assert!(timed_out < conditions);
    }

    #[tokio::test(start_paused = true)]
    async fn epochs_increase_per_cycle() {
        let (set, _) = fakes(Duration::ZERO);
        let engine = Engine::new(set, EngineSettings::default());

        let first = engine.start(AT);
        let second = engine.start(AT);
        assert_eq!(second.epoch, first.epoch + 1);
        assert_eq!(engine.current_epoch(), second.epoch);
        assert_eq!(engine.settings().delivery_timeout, Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_inside_cooldown_fetches_nothing() {
        let (set, station_calls) = fakes(Duration::ZERO);
        let engine = Engine::new(set, EngineSettings::default());
        let mut gate = engine.refresh_gate();

        let mut cycle = engine.refresh(&mut gate, AT).unwrap();
        drain(&mut cycle).await;
        assert_eq!(station_calls.load(Ordering::SeqCst), 1);

        let err = engine.refresh(&mut gate, AT).unwrap_err();
        assert!(err.to_string().starts_with("Refreshed too recently"));
        tokio::task::yield_now().await;
        assert_eq!(station_calls.load(Ordering::SeqCst), 1);
    }
}
