use std::time::Duration;

use thiserror::Error;

use crate::provider::ProviderId;

/// Failure of a single source. Never escapes the reconciliation engine: every
/// variant degrades to "this source is unavailable".
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("{provider} request failed: {message}")]
    Network { provider: ProviderId, message: String },

    #[error("{provider} request failed with status {status}: {body}")]
    Status {
        provider: ProviderId,
        status: u16,
        body: String,
    },

    #[error("failed to decode {provider} response: {message}")]
    Decode { provider: ProviderId, message: String },

    #[error("no API key configured for provider '{0}'")]
    MissingCredential(ProviderId),

    #[error("no usable station within {max_distance_km} km")]
    NoUsableStation { max_distance_km: f64 },

    #[error("{provider} reported implausible data: {message}")]
    ConflictingData { provider: ProviderId, message: String },

    #[error("geometry lookup failed: {0}")]
    Geometry(String),
}

impl FetchError {
    pub(crate) fn network(provider: ProviderId, err: impl std::fmt::Display) -> Self {
        Self::Network {
            provider,
            message: err.to_string(),
        }
    }

    pub(crate) fn decode(provider: ProviderId, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            provider,
            message: err.to_string(),
        }
    }
}

/// A user-initiated refresh arrived inside the cooldown window.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Refreshed too recently, refresh again in {} s.", .retry_in.as_secs().max(1))]
pub struct RefreshRejected {
    pub retry_in: Duration,
}
