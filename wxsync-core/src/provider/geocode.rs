use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{
    FetchError,
    model::Coordinate,
    provider::{ProviderId, get_json},
};

const GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";

/// A named place resolved to a coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub coordinate: Coordinate,
}

impl std::fmt::Display for Place {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.coordinate)
    }
}

#[derive(Debug, Clone)]
pub struct Geocoder {
    http: Client,
}

impl Geocoder {
    pub fn new(http: Client) -> Self {
        Self { http }
    }

    /// Up to five matches for a free-text place name, best first.
    pub async fn search(&self, query: &str) -> Result<Vec<Place>, FetchError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let parsed: GeocodingResponse = get_json(
            &self.http,
            ProviderId::Geocoding,
            GEOCODING_URL,
            &[
                ("name", query.to_string()),
                ("count", "5".to_string()),
                ("language", "en".to_string()),
                ("format", "json".to_string()),
            ],
        )
        .await?;

        Ok(parsed.into_places())
    }
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<GeocodingResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResult {
    name: String,
    latitude: f64,
    longitude: f64,
    admin1: Option<String>,
    country: Option<String>,
}

impl GeocodingResponse {
    fn into_places(self) -> Vec<Place> {
        self.results
            .into_iter()
            .map(|r| {
                let name = [Some(r.name), r.admin1, r.country]
                    .into_iter()
                    .flatten()
                    .filter(|part| !part.is_empty())
                    .collect::<Vec<_>>()
                    .join(", ");
                Place {
                    name,
                    coordinate: Coordinate::new(r.latitude, r.longitude),
                }
            })
            .filter(|p| p.coordinate.is_valid())
            .collect()
    }
}
