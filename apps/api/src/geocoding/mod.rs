//! Geocoding: resolves a free-text address to coordinates via Nominatim.
//!
//! The result is an explicit [`GeocodeOutcome`]; only `Resolved` may be appended to the
//! contact table. Transport trouble that survives the retry comes back as
//! [`ServiceError`], which callers show the same way as a `Failed` outcome.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::upstream::{read_body, send_with_retry, ServiceError};

const SERVICE: &str = "Nominatim";
/// Identifying agent required by the Nominatim usage policy.
pub const USER_AGENT: &str = "MyContactApp (contacts@example.org)";
const ERROR_PREFIX: &str = "Nominatim API Error:";

#[derive(Debug, Clone, PartialEq)]
pub enum GeocodeOutcome {
    Resolved { lat: f64, lon: f64 },
    Failed { reason: String },
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(
        &self,
        street: &str,
        postal_code: &str,
        city: &str,
    ) -> Result<GeocodeOutcome, ServiceError>;
}

/// One search hit. Nominatim sends coordinates as strings.
#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

#[derive(Clone)]
pub struct NominatimGeocoder {
    client: Client,
    endpoint: String,
}

impl NominatimGeocoder {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(
        &self,
        street: &str,
        postal_code: &str,
        city: &str,
    ) -> Result<GeocodeOutcome, ServiceError> {
        let query = build_query(street, postal_code, city);

        let response = send_with_retry(SERVICE, || {
            self.client
                .get(&self.endpoint)
                .header(reqwest::header::USER_AGENT, USER_AGENT)
                .query(&[("q", query.as_str()), ("format", "json")])
        })
        .await?;

        let status = response.status();
        let body = read_body(SERVICE, response).await?;

        if status != StatusCode::OK {
            return Ok(GeocodeOutcome::Failed {
                reason: format!("{ERROR_PREFIX}{body}"),
            });
        }

        let places: Vec<Place> =
            serde_json::from_str(&body).map_err(|e| ServiceError::Parse {
                service: SERVICE,
                reason: e.to_string(),
            })?;

        let outcome = outcome_from_places(&query, places);
        debug!("Geocoded '{query}': {outcome:?}");
        Ok(outcome)
    }
}

/// Street, postal code and city joined by single spaces, as typed.
pub fn build_query(street: &str, postal_code: &str, city: &str) -> String {
    format!("{street} {postal_code} {city}")
}

fn outcome_from_places(query: &str, places: Vec<Place>) -> GeocodeOutcome {
    let Some(first) = places.into_iter().next() else {
        return GeocodeOutcome::Failed {
            reason: format!("{ERROR_PREFIX} no result for '{query}'"),
        };
    };

    match (first.lat.trim().parse::<f64>(), first.lon.trim().parse::<f64>()) {
        (Ok(lat), Ok(lon)) => GeocodeOutcome::Resolved { lat, lon },
        (Err(_), _) => GeocodeOutcome::Failed {
            reason: format!("{ERROR_PREFIX} invalid latitude '{}'", first.lat),
        },
        (_, Err(_)) => GeocodeOutcome::Failed {
            reason: format!("{ERROR_PREFIX} invalid longitude '{}'", first.lon),
        },
    }
}
