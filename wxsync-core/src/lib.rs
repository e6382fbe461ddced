//! Core library for the `wxsync` CLI.
//!
//! This crate defines:
//! - Provider clients for station observations, the one-call API, the
//!   government point forecast, alerts, convective outlooks and geocoding
//! - Nearest-station selection and the reconciliation engine that folds
//!   every source into one [`CanonicalConditions`] record
//! - Unit conversion, advisory insights and polygon lookups
//! - Configuration & credentials handling
//!
//! It is used by `wxsync-cli`, but can also be reused by other binaries or services.

pub mod color;
pub mod config;
pub mod error;
pub mod forecast;
pub mod geometry;
pub mod insight;
pub mod model;
pub mod provider;
pub mod reconcile;
pub mod refresh;
pub mod solar;
pub mod state;
pub mod station;
pub mod units;

pub use config::{Config, ProviderConfig};
pub use error::{FetchError, RefreshRejected};
pub use model::{Alert, CanonicalConditions, Coordinate, ForecastBundle};
pub use provider::{Provider, ProviderId, ProviderSet};
pub use reconcile::{Cycle, Delivery, Engine, EngineSettings, Update};
pub use state::WeatherState;
pub use units::UnitPreference;
