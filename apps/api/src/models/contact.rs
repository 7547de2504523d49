use serde::{Deserialize, Serialize};

/// Persisted column order. Also the CSV header row.
pub const COLUMNS: [&str; 6] = ["name", "street", "postal_code", "city", "lat", "lon"];

/// Column name → header shown in the table view.
pub const DISPLAY_COLUMNS: [(&str, &str); 6] = [
    ("name", "Name"),
    ("street", "Strasse"),
    ("postal_code", "PLZ"),
    ("city", "Ort"),
    ("lat", "Breitengrad"),
    ("lon", "Längengrad"),
];

/// A single contact row. Never mutated once it is in a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub street: String,
    pub postal_code: String,
    pub city: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// A contact plotted on the map. Only rows with both coordinates produce one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

/// Ordered contact list. Insertion order is display order and persistence order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ContactTable {
    rows: Vec<Contact>,
}

impl ContactTable {
    pub fn from_rows(rows: Vec<Contact>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Contact] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push(&mut self, contact: Contact) {
        self.rows.push(contact);
    }

    pub fn last(&self) -> Option<&Contact> {
        self.rows.last()
    }

    /// Rows with both coordinates present, in table order.
    pub fn map_points(&self) -> Vec<MapPoint> {
        self.rows
            .iter()
            .filter_map(|c| match (c.lat, c.lon) {
                (Some(lat), Some(lon)) => Some(MapPoint {
                    name: c.name.clone(),
                    lat,
                    lon,
                }),
                _ => None,
            })
            .collect()
    }
}
