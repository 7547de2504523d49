//! Stand-ins for the outbound services, shared by unit tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::geocoding::{GeocodeOutcome, Geocoder};
use crate::models::contact::Contact;
use crate::poem_client::{PoemError, PoemGenerator};
use crate::upstream::ServiceError;

pub fn contact(name: &str, lat: f64, lon: f64) -> Contact {
    Contact {
        name: name.to_string(),
        street: "Bahnhofstrasse 1".to_string(),
        postal_code: "8000".to_string(),
        city: "Zürich".to_string(),
        lat: Some(lat),
        lon: Some(lon),
    }
}

/// Geocoder returning a fixed answer and recording each query.
pub struct StubGeocoder {
    answer: Result<GeocodeOutcome, String>,
    calls: Mutex<Vec<String>>,
}

impl StubGeocoder {
    pub fn resolving(lat: f64, lon: f64) -> Self {
        Self::with(Ok(GeocodeOutcome::Resolved { lat, lon }))
    }

    pub fn failing(reason: &str) -> Self {
        Self::with(Ok(GeocodeOutcome::Failed {
            reason: reason.to_string(),
        }))
    }

    /// Simulates the service staying down through the retry.
    pub fn unavailable(reason: &str) -> Self {
        Self::with(Err(reason.to_string()))
    }

    fn with(answer: Result<GeocodeOutcome, String>) -> Self {
        Self {
            answer,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Geocoder for StubGeocoder {
    async fn geocode(
        &self,
        street: &str,
        postal_code: &str,
        city: &str,
    ) -> Result<GeocodeOutcome, ServiceError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{street} {postal_code} {city}"));
        match &self.answer {
            Ok(outcome) => Ok(outcome.clone()),
            Err(reason) => Err(ServiceError::Unavailable {
                service: "Nominatim",
                attempts: 2,
                reason: reason.clone(),
            }),
        }
    }
}

/// Poem generator that writes a one-line poem and records the names it was asked for.
#[derive(Default)]
pub struct StubPoems {
    fail: bool,
    calls: Mutex<Vec<String>>,
}

impl StubPoems {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PoemGenerator for StubPoems {
    async fn generate_poem(&self, name: &str) -> Result<String, PoemError> {
        self.calls.lock().unwrap().push(name.to_string());
        if self.fail {
            return Err(PoemError::EmptyContent);
        }
        Ok(format!("Im grünen Wald wohnt {name}"))
    }
}
