use super::airports::AirportDirectory;
use super::{AirportSummary, EnrichmentError, EnrichmentResult, EnrichmentService, RouteInfo};
use crate::http::HttpClient;

pub const NAME: &str = "adsbdb";

const LOOKUP_FAILED: &str = "Failed to get aircraft information from ADSB DB.";

#[derive(serde::Deserialize)]
struct Envelope {
    response: serde_json::Value,
}

#[derive(serde::Deserialize)]
struct LookupResponse {
    #[serde(default)]
    flightroute: Option<FlightRoute>,
}

#[derive(serde::Deserialize)]
struct FlightRoute {
    #[serde(default)]
    origin: Option<RouteAirport>,
    #[serde(default)]
    destination: Option<RouteAirport>,
}

#[derive(serde::Deserialize)]
struct RouteAirport {
    #[serde(default)]
    icao_code: Option<String>,
}

/// Aircraft and route database lookup by transponder address and callsign.
pub struct RouteLookupService {
    http: std::sync::Arc<dyn HttpClient>,
    airports: std::sync::Arc<AirportDirectory>,
    base_url: String,
}

impl RouteLookupService {
    #[must_use]
    pub fn new(
        http: std::sync::Arc<dyn HttpClient>,
        airports: std::sync::Arc<AirportDirectory>,
        base_url: &str,
    ) -> Self {
        RouteLookupService {
            http,
            airports,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `{base}/v0/aircraft/{hex}?callsign={callsign}` with both values escaped.
    fn lookup_url(&self, callsign: &str, hex: &str) -> Result<reqwest::Url, EnrichmentError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| EnrichmentError::Parse(format!("{}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|()| EnrichmentError::Parse(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(["v0", "aircraft", hex]);
        url.query_pairs_mut().append_pair("callsign", callsign);
        Ok(url)
    }

    fn lookup(&self, callsign: &str, hex: &str) -> Result<FlightRoute, EnrichmentError> {
        let url = self.lookup_url(callsign, hex)?;
        let body = self.http.get_text(url.as_str())?;

        let envelope: Envelope =
            serde_json::from_str(&body).map_err(|e| EnrichmentError::Parse(e.to_string()))?;
        let response: LookupResponse = serde_json::from_value(envelope.response)
            .map_err(|e| EnrichmentError::Parse(e.to_string()))?;

        response
            .flightroute
            .ok_or(EnrichmentError::Missing("No route information from ADSB DB."))
    }

    fn summarize(&self, airport: Option<&RouteAirport>) -> AirportSummary {
        let code = airport
            .and_then(|airport| airport.icao_code.as_deref())
            .unwrap_or_default();
        AirportSummary::new(code, &self.airports.location(code))
    }
}

impl EnrichmentService for RouteLookupService {
    fn name(&self) -> &'static str {
        NAME
    }

    fn check(&mut self, identity: &str, secondary_identity: &str) -> EnrichmentResult {
        match self.lookup(identity, secondary_identity) {
            Ok(route) => EnrichmentResult::Route(RouteInfo {
                from: self.summarize(route.origin.as_ref()),
                to: self.summarize(route.destination.as_ref()),
            }),
            Err(EnrichmentError::Missing(reason)) => EnrichmentResult::error(reason),
            Err(e) => {
                log::debug!("{NAME}: lookup for {identity} ({secondary_identity}) failed: {e}");
                EnrichmentResult::error(LOOKUP_FAILED)
            }
        }
    }
}
