use super::{AirportSummary, EnrichmentError, EnrichmentResult, EnrichmentService, TrackingInfo};
use crate::http::HttpClient;

pub const NAME: &str = "flightAware";

/// How long a fetched flight is reused before the page is pulled again.
const CACHE_REUSE_SECONDS: i64 = 12 * 60 * 60;

// Sub-fields of a flight that are large and never used.
const STRIPPED_FIELDS: [&str; 3] = ["activityLog", "track", "waypoints"];

static BOOTSTRAP_REGEX: once_cell::sync::Lazy<regex::Regex> = once_cell::sync::Lazy::new(|| {
    regex::Regex::new(r"var trackpollBootstrap = (\{.*?\});").unwrap()
});

/// File name of the persisted cache inside the configured cache directory.
pub const CACHE_FILE_NAME: &str = "flight_aware.json";

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct CachedFlight {
    flight: serde_json::Value,
    fetched_at: i64,
}

type FlightCache = std::collections::HashMap<String, CachedFlight>;

/// Live flight page scraper with a per-callsign cache.
///
/// With a cache file the cache survives restarts: it is loaded by `init` and
/// rewritten after every fetch.
pub struct TrackingSiteService {
    http: std::sync::Arc<dyn HttpClient>,
    base_url: String,
    cache: FlightCache,
    cache_file: Option<std::path::PathBuf>,
}

impl TrackingSiteService {
    #[must_use]
    pub fn new(http: std::sync::Arc<dyn HttpClient>, base_url: &str) -> Self {
        TrackingSiteService {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache: FlightCache::new(),
            cache_file: None,
        }
    }

    #[must_use]
    pub fn with_cache_file(mut self, path: std::path::PathBuf) -> Self {
        self.cache_file = Some(path);
        self
    }

    fn load_cache(path: &std::path::Path) -> FlightCache {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return FlightCache::new(),
            Err(e) => {
                log::warn!("{NAME}: could not read cache {}: {e}", path.display());
                return FlightCache::new();
            }
        };
        serde_json::from_str(&contents).unwrap_or_else(|e| {
            log::warn!("{NAME}: ignoring unreadable cache {}: {e}", path.display());
            FlightCache::new()
        })
    }

    fn save_cache(&self) {
        let Some(path) = &self.cache_file else {
            return;
        };
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::warn!("{NAME}: could not create {}: {e}", parent.display());
                return;
            }
        }
        let written = serde_json::to_vec(&self.cache)
            .map_err(std::io::Error::from)
            .and_then(|bytes| std::fs::write(path, bytes));
        if let Err(e) = written {
            log::warn!("{NAME}: could not write cache {}: {e}", path.display());
        }
    }

    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    fn cached(&self, callsign: &str, now: i64) -> Option<&serde_json::Value> {
        self.cache
            .get(callsign)
            .filter(|cached| now - cached.fetched_at <= CACHE_REUSE_SECONDS)
            .map(|cached| &cached.flight)
    }

    fn fetch(&self, callsign: &str) -> Result<serde_json::Value, EnrichmentError> {
        let url = format!("{}/live/flight/{callsign}", self.base_url);
        let page = self.http.get_text(&url)?;

        let bootstrap = BOOTSTRAP_REGEX
            .captures(&page)
            .and_then(|captures| captures.get(1))
            .ok_or(EnrichmentError::Missing("No variable match from FlightAware."))?;

        let mut results: serde_json::Value = serde_json::from_str(bootstrap.as_str())
            .map_err(|e| EnrichmentError::Parse(e.to_string()))?;

        let flights = results
            .get_mut("flights")
            .and_then(serde_json::Value::as_object_mut)
            .ok_or(EnrichmentError::Missing("No flightAwareResults."))?;

        let Some((_, flight)) = flights.iter_mut().next() else {
            return Err(EnrichmentError::Missing("No flights from FlightAware."));
        };
        let mut flight = flight.take();

        if let Some(fields) = flight.as_object_mut() {
            for field in STRIPPED_FIELDS {
                fields.remove(field);
            }
        }
        Ok(flight)
    }
}

fn is_truthy(value: Option<&serde_json::Value>) -> bool {
    match value {
        None | Some(serde_json::Value::Null) => false,
        Some(serde_json::Value::Bool(flag)) => *flag,
        Some(serde_json::Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
        Some(serde_json::Value::String(string)) => !string.is_empty(),
        Some(_) => true,
    }
}

fn text_field<'a>(value: Option<&'a serde_json::Value>, name: &str) -> &'a str {
    value
        .and_then(|value| value.get(name))
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
}

fn airport_summary(airport: Option<&serde_json::Value>) -> AirportSummary {
    AirportSummary::new(
        text_field(airport, "iata"),
        text_field(airport, "friendlyLocation"),
    )
}

fn summarize(flight: &serde_json::Value, use_cache: bool) -> TrackingInfo {
    let blocked = ["blocked", "blockedForUser", "userBlockMessage"]
        .into_iter()
        .any(|field| is_truthy(flight.get(field)));

    let plane_image = flight
        .get("relatedThumbnails")
        .and_then(serde_json::Value::as_array)
        .and_then(|thumbnails| thumbnails.first())
        .and_then(|thumbnail| thumbnail.get("thumbnail"))
        .and_then(serde_json::Value::as_str)
        .map(ToString::to_string);

    TrackingInfo {
        use_cache,
        blocked,
        plane_image,
        from: airport_summary(flight.get("origin")),
        to: airport_summary(flight.get("destination")),
    }
}

impl EnrichmentService for TrackingSiteService {
    fn name(&self) -> &'static str {
        NAME
    }

    fn init(&mut self) {
        if let Some(path) = &self.cache_file {
            self.cache = Self::load_cache(path);
        }
        log::info!("{NAME}: {} flights in cache", self.cache_len());
    }

    fn check(&mut self, identity: &str, _secondary_identity: &str) -> EnrichmentResult {
        if identity.is_empty() {
            return EnrichmentResult::error("No callsign to look up.");
        }

        let now = chrono::Utc::now().timestamp();
        if let Some(flight) = self.cached(identity, now) {
            log::debug!("{NAME}: using cached flight for {identity}");
            return EnrichmentResult::Tracking(summarize(flight, true));
        }

        match self.fetch(identity) {
            Ok(flight) => {
                let info = summarize(&flight, false);
                self.cache
                    .retain(|_, cached| now - cached.fetched_at <= CACHE_REUSE_SECONDS);
                self.cache.insert(
                    identity.to_string(),
                    CachedFlight {
                        flight,
                        fetched_at: now,
                    },
                );
                self.save_cache();
                EnrichmentResult::Tracking(info)
            }
            Err(e) => {
                log::debug!("{NAME}: lookup for {identity} failed: {e}");
                EnrichmentResult::error(e.to_string())
            }
        }
    }
}
