//! Form submission: validate → geocode → append and persist on `Resolved` only.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::Session;
use crate::geocoding::{GeocodeOutcome, Geocoder};
use crate::models::contact::Contact;
use crate::store::{StoreError, TableStore};

/// The four sidebar inputs. Absent fields deserialize as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub city: String,
}

impl ContactForm {
    /// Field name and value, in form order.
    pub fn fields(&self) -> [(&'static str, &str); 4] {
        [
            ("name", &self.name),
            ("street", &self.street),
            ("postal_code", &self.postal_code),
            ("city", &self.city),
        ]
    }

    /// First field (in form order) that is empty or whitespace only.
    pub fn first_empty_field(&self) -> Option<&'static str> {
        self.fields()
            .into_iter()
            .find(|(_, value)| value.trim().is_empty())
            .map(|(field, _)| field)
    }

    fn trimmed(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            street: self.street.trim().to_string(),
            postal_code: self.postal_code.trim().to_string(),
            city: self.city.trim().to_string(),
        }
    }
}

/// What the sidebar shows after an interaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SidebarState {
    /// Values echoed back into the inputs.
    pub form: ContactForm,
    pub field_error: Option<String>,
    pub coordinates: Option<(f64, f64)>,
    pub geocode_error: Option<String>,
    /// Name of the contact added by this interaction.
    pub added: Option<String>,
}

pub fn missing_field_message(field: &str) -> String {
    format!("Bitte ergänze das Feld '{field}'")
}

pub fn commit_message(name: &str, data_file: &str) -> String {
    format!("Add contact '{name}' to the file {data_file}")
}

/// Runs one "Add" interaction against the session.
///
/// Validation and geocoding problems are reported through the returned sidebar and
/// leave the table untouched. A store failure is returned as an error; the row stays
/// in the session table in that case.
pub async fn submit_contact(
    session: &mut Session,
    form: ContactForm,
    geocoder: &dyn Geocoder,
    store: &dyn TableStore,
) -> Result<SidebarState, StoreError> {
    if let Some(field) = form.first_empty_field() {
        return Ok(SidebarState {
            form,
            field_error: Some(missing_field_message(field)),
            ..SidebarState::default()
        });
    }

    let form = form.trimmed();
    let outcome = geocoder
        .geocode(&form.street, &form.postal_code, &form.city)
        .await;

    let (lat, lon) = match outcome {
        Ok(GeocodeOutcome::Resolved { lat, lon }) => (lat, lon),
        Ok(GeocodeOutcome::Failed { reason }) => {
            warn!("Geocoding failed for '{}': {reason}", form.name);
            return Ok(SidebarState {
                form,
                geocode_error: Some(reason),
                ..SidebarState::default()
            });
        }
        Err(e) => {
            warn!("Geocoding service error for '{}': {e}", form.name);
            return Ok(SidebarState {
                form,
                geocode_error: Some(e.to_string()),
                ..SidebarState::default()
            });
        }
    };

    session.load(store).await?;
    let contact = Contact {
        name: form.name.clone(),
        street: form.street,
        postal_code: form.postal_code,
        city: form.city,
        lat: Some(lat),
        lon: Some(lon),
    };
    let message = commit_message(&contact.name, session.data_file());
    session.append(contact);
    session.persist(store, &message).await?;

    info!("Added contact '{}' at ({lat}, {lon})", form.name);
    Ok(SidebarState {
        coordinates: Some((lat, lon)),
        added: Some(form.name),
        ..SidebarState::default()
    })
}
