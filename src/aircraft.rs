use crate::enrichment::EnrichmentResult;
use crate::geodesy::CardinalDirection;
use crate::receiver::ReceiverLocation;
use crate::types::RawReport;

pub const TRACKING_SITE_FLIGHT_URL: &str = "https://www.flightaware.com/live/flight/";

const RECENT_NOTIFICATION_WINDOW_SECONDS: i64 = 5 * 60;
const UPDATED_AT_FORMAT: &str = "%-m/%-d/%Y %H:%M:%S";

/// Why an aircraft was not alerted on.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SuppressionReason {
    NotifiedRecently,
    TooFarAway,
    TooHigh,
}

impl std::fmt::Display for SuppressionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuppressionReason::NotifiedRecently => write!(f, "Notified recently"),
            SuppressionReason::TooFarAway => write!(f, "Too far away"),
            SuppressionReason::TooHigh => write!(f, "Too high"),
        }
    }
}

/// Thresholds an aircraft must be inside of to be worth an alert.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct NotifyPolicy {
    pub max_distance_nm: f64,
    pub max_altitude_ft: f64,
}

impl Default for NotifyPolicy {
    fn default() -> Self {
        NotifyPolicy {
            max_distance_nm: 0.5,
            max_altitude_ft: 3000.0,
        }
    }
}

impl NotifyPolicy {
    /// Every reason that applies is returned; an empty list means notify.
    #[must_use]
    pub fn suppression_reasons(
        &self,
        report: &RawReport,
        distance_from_receiver: Option<f64>,
        last_notified: Option<i64>,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Vec<SuppressionReason> {
        let mut reasons = Vec::new();

        if let Some(last_notified) = last_notified {
            if now.timestamp() - last_notified <= RECENT_NOTIFICATION_WINDOW_SECONDS {
                reasons.push(SuppressionReason::NotifiedRecently);
            }
        }

        match distance_from_receiver {
            Some(distance) if distance <= self.max_distance_nm => {}
            _ => reasons.push(SuppressionReason::TooFarAway),
        }

        match &report.alt_baro {
            Some(altitude) if altitude.feet() <= self.max_altitude_ft => {}
            _ => reasons.push(SuppressionReason::TooHigh),
        }

        reasons
    }
}

/// Two decimals is enough for a notification; the policy compares the raw value.
fn round_distance(distance_nm: f64) -> f64 {
    (distance_nm * 100.0).round() / 100.0
}

/// Everything known about one report while it moves through the pipeline.
#[derive(Debug, Clone)]
pub struct AircraftState {
    pub report: RawReport,
    pub distance_from_receiver: Option<f64>,
    pub cardinal_direction: Option<CardinalDirection>,
    pub notify: bool,
    pub notify_reason: String,
    pub services: std::collections::BTreeMap<String, EnrichmentResult>,
    pub updated_at: Option<chrono::DateTime<chrono::Local>>,
    pub last_notified: Option<i64>,
}

impl AircraftState {
    #[must_use]
    pub fn from_report(
        report: RawReport,
        receiver: &ReceiverLocation,
        last_notified: Option<i64>,
        policy: &NotifyPolicy,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        let distance_from_receiver = receiver.distance_to(report.latitude(), report.longitude());
        let cardinal_direction = receiver.direction_to(report.latitude(), report.longitude());

        let reasons =
            policy.suppression_reasons(&report, distance_from_receiver, last_notified, now);
        let notify_reason = reasons
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<String>>()
            .join("; ");

        AircraftState {
            report,
            distance_from_receiver,
            cardinal_direction,
            notify: reasons.is_empty(),
            notify_reason,
            services: std::collections::BTreeMap::new(),
            updated_at: None,
            last_notified,
        }
    }

    #[must_use]
    pub fn identity(&self) -> String {
        self.report.identity()
    }

    #[must_use]
    pub fn flight_url(&self) -> String {
        let callsign = self.identity();
        if callsign.is_empty() {
            String::new()
        } else {
            format!("{TRACKING_SITE_FLIGHT_URL}{callsign}")
        }
    }

    pub fn set_service(&mut self, name: &str, result: EnrichmentResult) {
        self.services.insert(name.to_string(), result);
    }

    pub fn touch(&mut self) {
        self.updated_at = Some(chrono::Local::now());
    }

    /// Presentation form used for notification templates and debug logging.
    #[must_use]
    pub fn to_json(&self, with_raw: bool) -> serde_json::Value {
        let mut json = serde_json::json!({
            "alt_baro": self.report.alt_baro,
            "direction": self
                .cardinal_direction
                .map_or("Missing data", |direction| direction.as_str()),
            "notify": self.notify,
            "notifyReason": self.notify_reason,
            "callsign": self.identity(),
            "flightUrl": self.flight_url(),
            "distanceFromReceiver": self.distance_from_receiver.map(round_distance),
            "updatedAt": self
                .updated_at
                .map(|updated_at| updated_at.format(UPDATED_AT_FORMAT).to_string()),
            "services": self.services,
        });

        if with_raw {
            if let Ok(raw) = serde_json::to_value(&self.report) {
                json["rawAircraft"] = raw;
            }
        }
        json
    }
}
