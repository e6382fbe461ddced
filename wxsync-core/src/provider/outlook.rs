//! Categorical convective outlook lookup for a point.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    FetchError, color,
    geometry::{self, RawGeometry, Shape},
    model::Coordinate,
    provider::{ProviderId, get_json, lenient},
};

pub const DEFAULT_TEMPLATE: &str =
    "https://www.spc.noaa.gov/products/outlook/day{day}otlk_cat.nolyr.geojson";

/// Day horizons published as categorical outlooks.
pub const DAYS: std::ops::RangeInclusive<u8> = 1..=3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskCategory {
    #[default]
    None,
    GeneralThunder,
    Marginal,
    Slight,
    Enhanced,
    Moderate,
    High,
}

impl RiskCategory {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_uppercase().as_str() {
            "TSTM" => RiskCategory::GeneralThunder,
            "MRGL" => RiskCategory::Marginal,
            "SLGT" => RiskCategory::Slight,
            "ENH" => RiskCategory::Enhanced,
            "MDT" => RiskCategory::Moderate,
            "HIGH" => RiskCategory::High,
            _ => RiskCategory::None,
        }
    }

    /// 0 for none, 1-5 for Marginal through High; general thunder counts as 0.
    pub fn level(self) -> u8 {
        match self {
            RiskCategory::None | RiskCategory::GeneralThunder => 0,
            RiskCategory::Marginal => 1,
            RiskCategory::Slight => 2,
            RiskCategory::Enhanced => 3,
            RiskCategory::Moderate => 4,
            RiskCategory::High => 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SevereOutlook {
    pub day: u8,
    pub risk: RiskCategory,
    pub label: String,
    pub description: String,
    pub fill_color: String,
    pub border_color: String,
    pub text_color: String,
}

impl SevereOutlook {
    /// Explicit "nothing covers this point" result.
    pub fn none(day: u8) -> Self {
        Self {
            day,
            risk: RiskCategory::None,
            label: "NONE".to_string(),
            description: "No severe risk for this location".to_string(),
            fill_color: "#FFFFFF".to_string(),
            border_color: "#C0C0C0".to_string(),
            text_color: "black".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutlookClient {
    http: Client,
    template: String,
}

impl OutlookClient {
    pub fn new(http: Client, template: String) -> Self {
        Self { http, template }
    }

    pub fn url_for(&self, day: u8) -> String {
        self.template.replace("{day}", &day.to_string())
    }

    pub async fn fetch_day(&self, day: u8, at: Coordinate) -> Result<SevereOutlook, FetchError> {
        let url = self.url_for(day);
        let parsed: OutlookCollection = get_json(&self.http, ProviderId::Outlook, &url, &[]).await?;
        Ok(locate(&parsed.into_areas(), at, day))
    }

    /// Each day independently; a failed day reports no risk.
    pub async fn fetch_days(&self, at: Coordinate, days: &[u8]) -> Vec<SevereOutlook> {
        let lookups = days.iter().map(|&day| async move {
            match self.fetch_day(day, at).await {
                Ok(outlook) => outlook,
                Err(err) => {
                    warn!(day, error = %err, "outlook unavailable");
                    SevereOutlook::none(day)
                }
            }
        });
        futures::future::join_all(lookups).await
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OutlookCollection {
    #[serde(default)]
    features: Vec<OutlookFeature>,
}

#[derive(Debug, Deserialize)]
struct OutlookFeature {
    geometry: Option<RawGeometry>,
    #[serde(default)]
    properties: OutlookProperties,
}

#[derive(Debug, Default, Deserialize)]
#[allow(non_snake_case)]
struct OutlookProperties {
    #[serde(default, deserialize_with = "lenient::number")]
    DN: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text")]
    LABEL: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    LABEL2: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    fill: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    stroke: Option<String>,
}

/// One risk polygon from an outlook feed.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlookArea {
    pub shape: Shape,
    pub rank: i64,
    pub label: String,
    pub description: String,
    pub fill: String,
    pub stroke: String,
}

impl OutlookCollection {
    pub(crate) fn into_areas(self) -> Vec<OutlookArea> {
        self.features
            .into_iter()
            .filter_map(|f| {
                let shape = match Shape::try_from(f.geometry?) {
                    Ok(shape) => shape,
                    Err(err) => {
                        warn!(error = %err, "skipping outlook feature");
                        return None;
                    }
                };
                let p = f.properties;
                Some(OutlookArea {
                    shape,
                    rank: p.DN.unwrap_or(0.0) as i64,
                    label: p.LABEL.unwrap_or_default(),
                    description: p.LABEL2.unwrap_or_default(),
                    fill: p.fill.unwrap_or_else(|| "#FFFFFF".to_string()),
                    stroke: p.stroke.unwrap_or_else(|| "#C0C0C0".to_string()),
                })
            })
            .collect()
    }
}

/// Highest-ranked area covering the point; ties go to the first area.
pub fn locate(areas: &[OutlookArea], at: Coordinate, day: u8) -> SevereOutlook {
    let Some(best) = geometry::best_covering(areas, at, |a| &a.shape, |a| a.rank) else {
        debug!(day, %at, "no outlook area covers point");
        return SevereOutlook::none(day);
    };

    SevereOutlook {
        day,
        risk: RiskCategory::from_label(&best.label),
        label: best.label.clone(),
        description: best
            .description
            .strip_suffix(" Risk")
            .unwrap_or(&best.description)
            .to_string(),
        text_color: color::contrast_text(&best.fill).to_string(),
        fill_color: best.fill.clone(),
        border_color: best.stroke.clone(),
    }
}
