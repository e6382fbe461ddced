//! Active government alerts for a point.

use std::collections::HashSet;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use crate::{
    FetchError, color,
    geometry::{RawGeometry, Shape},
    model::{Alert, Coordinate},
    provider::{Provider, ProviderId, get_json, parse_time},
};

const ALERTS_URL: &str = "https://api.weather.gov/alerts/active";

#[derive(Debug, Clone)]
pub struct AlertsProvider {
    http: Client,
}

impl AlertsProvider {
    pub fn new(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Provider for AlertsProvider {
    type Output = Vec<Alert>;

    fn id(&self) -> ProviderId {
        ProviderId::Alerts
    }

    async fn fetch(&self, at: Coordinate) -> Result<Vec<Alert>, FetchError> {
        let parsed: AlertCollection = get_json(
            &self.http,
            self.id(),
            ALERTS_URL,
            &[
                ("message_type", "alert".to_string()),
                ("point", format!("{:.4},{:.4}", at.latitude, at.longitude)),
            ],
        )
        .await?;

        Ok(parsed.into_alerts(at))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AlertCollection {
    #[serde(default)]
    features: Vec<AlertFeature>,
}

#[derive(Debug, Deserialize)]
struct AlertFeature {
    id: Option<String>,
    geometry: Option<RawGeometry>,
    #[serde(default)]
    properties: AlertProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlertProperties {
    id: Option<String>,
    event: Option<String>,
    headline: Option<String>,
    description: Option<String>,
    instruction: Option<String>,
    area_desc: Option<String>,
    effective: Option<String>,
    expires: Option<String>,
    severity: Option<String>,
}

impl AlertCollection {
    /// Normalize, drop polygon alerts that miss the point, and collapse
    /// repeated ids to their first occurrence.
    pub(crate) fn into_alerts(self, at: Coordinate) -> Vec<Alert> {
        let mut seen = HashSet::new();

        self.features
            .into_iter()
            .filter(|f| covers(f, at))
            .filter_map(|f| {
                let p = f.properties;
                let id = p.id.or(f.id).unwrap_or_default();
                if !id.is_empty() && !seen.insert(id.clone()) {
                    return None;
                }

                let event = p
                    .event
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| "Alert".to_string());
                let fill = color::alert_color(&event);
                let description = p
                    .description
                    .filter(|d| !d.trim().is_empty())
                    .or_else(|| p.instruction.clone())
                    .unwrap_or_default();

                Some(Alert {
                    id,
                    headline: p.headline.unwrap_or_default(),
                    description: flatten_text(&description),
                    instructions: flatten_text(p.instruction.as_deref().unwrap_or_default()),
                    area: p.area_desc.unwrap_or_default(),
                    effective: p.effective.as_deref().and_then(parse_time),
                    expires: p.expires.as_deref().and_then(parse_time),
                    severity: p.severity.unwrap_or_else(|| "Unknown".to_string()),
                    color: fill.to_string(),
                    text_color: color::contrast_text(fill).to_string(),
                    event,
                })
            })
            .collect()
    }
}

fn covers(feature: &AlertFeature, at: Coordinate) -> bool {
    let Some(raw) = feature.geometry.clone() else {
        return true;
    };
    match Shape::try_from(raw) {
        Ok(shape) if shape.is_empty() => true,
        Ok(shape) => shape.contains(at),
        Err(err) => {
            warn!(error = %err, "keeping alert with unreadable geometry");
            true
        }
    }
}

/// Paragraph breaks become one newline, then every newline becomes a space.
pub fn flatten_text(text: &str) -> String {
    text.replace("\n\n", "\n").replace('\n', " ").trim().to_string()
}
