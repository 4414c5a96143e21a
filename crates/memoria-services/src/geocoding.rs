//! Place-name geocoding
//!
//! Lookups run before any transaction is opened and never fail the calling
//! operation: an unreachable or rate-limited service leaves the coordinates
//! empty.

use async_trait::async_trait;
use memoria_core::{models::Coordinates, AppError, GeocodingConfig};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_USER_AGENT: &str = concat!("memoria/", env!("CARGO_PKG_VERSION"));

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Coordinates for a place name, or `None` when it cannot be resolved.
    async fn geocode(&self, place: &str) -> Option<Coordinates>;
}

/// Used when geocoding is turned off.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledGeocoder;

#[async_trait]
impl Geocoder for DisabledGeocoder {
    async fn geocode(&self, _place: &str) -> Option<Coordinates> {
        None
    }
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

/// Client for the Nominatim `/search` endpoint.
#[derive(Clone)]
pub struct NominatimGeocoder {
    http_client: reqwest::Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(config: &GeocodingConfig) -> Result<Self, AppError> {
        let user_agent = config
            .user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(
                config.connect_timeout_ms + config.read_timeout_ms,
            ))
            .user_agent(user_agent)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create geocoding client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn search(&self, place: &str) -> Result<Vec<NominatimPlace>, reqwest::Error> {
        self.http_client
            .get(format!("{}/search", self.base_url))
            .query(&[("format", "json"), ("limit", "1"), ("q", place)])
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<NominatimPlace>>()
            .await
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    #[tracing::instrument(skip(self), fields(geocoder = "nominatim"))]
    async fn geocode(&self, place: &str) -> Option<Coordinates> {
        let place = place.trim();
        if place.is_empty() {
            return None;
        }

        match self.search(place).await {
            Ok(places) => {
                let coordinates = first_coordinates(&places);
                if coordinates.is_none() {
                    tracing::debug!("No geocoding match");
                }
                coordinates
            }
            Err(e) => {
                tracing::warn!(error = %e, "Geocoding request failed");
                None
            }
        }
    }
}

fn first_coordinates(places: &[NominatimPlace]) -> Option<Coordinates> {
    let place = places.first()?;
    let coordinates = Coordinates {
        latitude: place.lat.trim().parse().ok()?,
        longitude: place.lon.trim().parse().ok()?,
    };
    coordinates.is_valid().then_some(coordinates)
}

/// Build the geocoder described by configuration.
///
/// A client that cannot be built degrades to [`DisabledGeocoder`].
pub fn create_geocoder(config: &GeocodingConfig) -> Arc<dyn Geocoder> {
    if !config.enabled {
        tracing::info!("Geocoding disabled");
        return Arc::new(DisabledGeocoder);
    }

    match NominatimGeocoder::new(config) {
        Ok(geocoder) => {
            tracing::info!(base_url = %config.base_url, "Using Nominatim geocoding");
            Arc::new(geocoder)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Geocoding unavailable, continuing without it");
            Arc::new(DisabledGeocoder)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Option<Coordinates> {
        let places: Vec<NominatimPlace> = serde_json::from_str(body).unwrap();
        first_coordinates(&places)
    }

    #[test]
    fn test_first_match_wins() {
        let coordinates = parse(
            r#"[{"lat":"37.5666791","lon":"126.9782914","display_name":"Seoul"},
                {"lat":"35.1","lon":"129.0"}]"#,
        )
        .unwrap();
        assert!((coordinates.latitude - 37.5666791).abs() < 1e-9);
        assert!((coordinates.longitude - 126.9782914).abs() < 1e-9);
    }

    #[test]
    fn test_empty_or_malformed_results() {
        assert_eq!(parse("[]"), None);
        assert_eq!(parse(r#"[{"lat":"north","lon":"1.0"}]"#), None);
        assert_eq!(parse(r#"[{"lat":"123.0","lon":"1.0"}]"#), None);
    }

    #[tokio::test]
    async fn test_unreachable_service_yields_none() {
        let config = GeocodingConfig {
            enabled: true,
            base_url: "http://127.0.0.1:9".to_string(),
            user_agent: None,
            connect_timeout_ms: 200,
            read_timeout_ms: 200,
        };
        let geocoder = NominatimGeocoder::new(&config).unwrap();
        assert_eq!(geocoder.geocode("Seoul").await, None);
    }

    #[tokio::test]
    async fn test_disabled_config_builds_noop_geocoder() {
        let geocoder = create_geocoder(&GeocodingConfig::default());
        assert_eq!(geocoder.geocode("Seoul").await, None);
    }
}
