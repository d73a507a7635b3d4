use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Budget {
    #[serde(alias = "Low")]
    Low,
    #[serde(alias = "Medium")]
    Medium,
    #[serde(alias = "Luxury")]
    Luxury,
}

impl Budget {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "low" | "cheap" | "budget" => Some(Self::Low),
            "medium" | "mid" | "moderate" => Some(Self::Medium),
            "luxury" | "high" | "premium" => Some(Self::Luxury),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::Luxury => "Luxury",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelStyle {
    #[serde(alias = "Adventure")]
    Adventure,
    #[serde(alias = "Relax")]
    Relax,
    #[serde(alias = "Family")]
    Family,
    #[serde(alias = "Solo")]
    Solo,
    #[serde(alias = "Couple")]
    Couple,
}

impl TravelStyle {
    pub const ALL: [TravelStyle; 5] = [
        Self::Adventure,
        Self::Relax,
        Self::Family,
        Self::Solo,
        Self::Couple,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "adventure" | "active" => Some(Self::Adventure),
            "relax" | "relaxed" | "chill" => Some(Self::Relax),
            "family" | "kids" => Some(Self::Family),
            "solo" => Some(Self::Solo),
            "couple" | "romantic" => Some(Self::Couple),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Adventure => "Adventure",
            Self::Relax => "Relax",
            Self::Family => "Family",
            Self::Solo => "Solo",
            Self::Couple => "Couple",
        }
    }
}

/// Validated user input for one planning run. Built through
/// `TripParameters::new`, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TripParameters {
    pub(crate) destination: String,
    pub(crate) days: u8,
    pub(crate) budget: Budget,
    pub(crate) styles: Vec<TravelStyle>,
}

impl TripParameters {
    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn days(&self) -> u8 {
        self.days
    }

    pub fn budget(&self) -> Budget {
        self.budget
    }

    pub fn styles(&self) -> &[TravelStyle] {
        &self.styles
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoResult {
    pub latitude: f64,
    pub longitude: f64,
    pub places: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripPlan {
    pub itinerary: IndexMap<String, Vec<String>>,
    #[serde(default)]
    pub hotels: Vec<String>,
    #[serde(default)]
    pub food: Vec<String>,
    #[serde(default)]
    pub tips: Vec<String>,
}

impl TripPlan {
    pub fn day_count(&self) -> usize {
        self.itinerary.len()
    }
}

/// Everything a session displays. Plan and geography are only ever written
/// together, see `SessionStore::replace`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub plan: Option<TripPlan>,
    pub geo: Option<GeoResult>,
    pub destination: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl SessionState {
    pub fn is_empty(&self) -> bool {
        self.plan.is_none() && self.geo.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapView {
    pub latitude: f64,
    pub longitude: f64,
    pub zoom: u8,
    pub marker_label: String,
    pub osm_url: String,
}
