mod nominatim;
mod overpass;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument, warn};
use voyage_core::{GeoResult, VoyageConfig};

use nominatim::NominatimPlace;
use overpass::OverpassResponse;

pub use overpass::{attraction_query, SEARCH_RADIUS_METERS};

pub const GEOCODE_TIMEOUT: Duration = Duration::from_secs(10);
pub const SPATIAL_TIMEOUT: Duration = Duration::from_secs(20);

/// Turns a place name into coordinates plus nearby attractions.
///
/// A place that cannot be geocoded is an expected outcome and yields `None`;
/// implementations never surface transport errors to the caller.
#[async_trait]
pub trait GeoResolver: Send + Sync {
    async fn resolve(&self, place_name: &str, limit: usize) -> Option<GeoResult>;
}

/// Nominatim for geocoding, Overpass for the attraction lookup.
#[derive(Debug, Clone)]
pub struct OsmGeoResolver {
    client: Client,
    nominatim_url: String,
    overpass_url: String,
    user_agent: String,
}

impl OsmGeoResolver {
    pub fn new(
        nominatim_url: impl Into<String>,
        overpass_url: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            nominatim_url: nominatim_url.into().trim_end_matches('/').to_string(),
            overpass_url: overpass_url.into(),
            user_agent: user_agent.into(),
        }
    }

    pub fn from_config(config: &VoyageConfig) -> Self {
        Self::new(
            config.nominatim_url.as_str(),
            config.overpass_url.as_str(),
            config.user_agent.as_str(),
        )
    }

    async fn geocode(&self, place_name: &str) -> Option<(f64, f64)> {
        let response = self
            .client
            .get(format!("{}/search", self.nominatim_url))
            .query(&[("q", place_name), ("format", "json"), ("limit", "1")])
            .header(reqwest::header::USER_AGENT, self.user_agent.as_str())
            .timeout(GEOCODE_TIMEOUT)
            .send()
            .await
            .map_err(|error| warn!(%error, place = place_name, "geocode request failed"))
            .ok()?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), place = place_name, "geocode returned non-success");
            return None;
        }

        let places: Vec<NominatimPlace> = response
            .json()
            .await
            .map_err(|error| warn!(%error, place = place_name, "geocode body undecodable"))
            .ok()?;

        let first = places.first()?;
        debug!(display_name = ?first.display_name, "geocode hit");
        first.coordinates()
    }

    async fn nearby_attractions(&self, latitude: f64, longitude: f64, limit: usize) -> Vec<String> {
        let response = match self
            .client
            .post(self.overpass_url.as_str())
            .header(reqwest::header::USER_AGENT, self.user_agent.as_str())
            .body(attraction_query(latitude, longitude))
            .timeout(SPATIAL_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => {
                warn!(%error, "attraction query failed");
                return Vec::new();
            }
        };

        if !response.status().is_success() {
            warn!(status = response.status().as_u16(), "attraction query returned non-success");
            return Vec::new();
        }

        match response.json::<OverpassResponse>().await {
            Ok(body) => overpass::attraction_names(body, limit),
            Err(error) => {
                warn!(%error, "attraction body undecodable");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl GeoResolver for OsmGeoResolver {
    #[instrument(skip(self))]
    async fn resolve(&self, place_name: &str, limit: usize) -> Option<GeoResult> {
        let place_name = place_name.trim();
        if place_name.is_empty() {
            return None;
        }

        let (latitude, longitude) = self.geocode(place_name).await?;

        let places = if limit == 0 {
            Vec::new()
        } else {
            self.nearby_attractions(latitude, longitude, limit).await
        };

        debug!(latitude, longitude, places = places.len(), "resolved destination");
        Some(GeoResult {
            latitude,
            longitude,
            places,
        })
    }
}
