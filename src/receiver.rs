use crate::geodesy::{bearing_cardinal, distance_nautical_miles, CardinalDirection};
use crate::http::{HttpClient, HttpError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReceiverError {
    #[error("Failed to fetch receiver data: {0}")]
    Fetch(#[from] HttpError),

    #[error("Failed to parse receiver data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Receiver data has no usable position (lat {lat:?}, lon {lon:?})")]
    MissingPosition { lat: Option<f64>, lon: Option<f64> },
}

#[derive(serde::Deserialize)]
struct ReceiverData {
    lat: Option<f64>,
    lon: Option<f64>,
}

/// Position of the local receiver. Fixed for the life of the process.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct ReceiverLocation {
    lat: f64,
    lon: f64,
}

impl ReceiverLocation {
    pub fn new(lat: f64, lon: f64) -> Result<Self, ReceiverError> {
        if lat == 0.0 || lon == 0.0 || !lat.is_finite() || !lon.is_finite() {
            return Err(ReceiverError::MissingPosition {
                lat: Some(lat),
                lon: Some(lon),
            });
        }
        Ok(ReceiverLocation { lat, lon })
    }

    /// Pulls `{base_url}/data/receiver.json` from the feeder once.
    pub fn fetch(http: &dyn HttpClient, base_url: &str) -> Result<Self, ReceiverError> {
        let url = format!("{}/data/receiver.json", base_url.trim_end_matches('/'));
        log::info!("Pulling receiver data from {url}");

        let body = http.get_text(&url)?;
        let data: ReceiverData = serde_json::from_str(&body)?;
        match (data.lat, data.lon) {
            (Some(lat), Some(lon)) => ReceiverLocation::new(lat, lon),
            (lat, lon) => Err(ReceiverError::MissingPosition { lat, lon }),
        }
    }

    #[must_use]
    pub fn lat(&self) -> f64 {
        self.lat
    }

    #[must_use]
    pub fn lon(&self) -> f64 {
        self.lon
    }

    /// Distance in nautical miles to a reported position, if the position is known.
    #[must_use]
    pub fn distance_to(&self, lat: Option<f64>, lon: Option<f64>) -> Option<f64> {
        distance_nautical_miles(
            self.lat,
            self.lon,
            lat.unwrap_or_default(),
            lon.unwrap_or_default(),
        )
    }

    #[must_use]
    pub fn direction_to(&self, lat: Option<f64>, lon: Option<f64>) -> Option<CardinalDirection> {
        bearing_cardinal(
            self.lat,
            self.lon,
            lat.unwrap_or_default(),
            lon.unwrap_or_default(),
        )
    }
}
