/// Barometric altitude as reported by the feed, number kept as sent.
#[derive(Debug, PartialEq, Clone)]
pub enum BaroAltitude {
    Feet(serde_json::Number),
    Ground,
}

impl BaroAltitude {
    #[must_use]
    pub fn feet(&self) -> f64 {
        match self {
            BaroAltitude::Feet(feet) => feet.as_f64().unwrap_or(f64::INFINITY),
            BaroAltitude::Ground => 0.0,
        }
    }
}

impl serde::Serialize for BaroAltitude {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            BaroAltitude::Feet(feet) => serde::Serialize::serialize(feet, serializer),
            BaroAltitude::Ground => serializer.serialize_str("ground"),
        }
    }
}

/// One aircraft's telemetry at one instant.
///
/// Known keys are pulled into named fields. Anything the feed sends that is not
/// listed here is kept untouched in `extra`. A known field holding a value of
/// the wrong shape is treated as absent instead of rejecting the whole report.
/// Numbers keep their original representation so they serialize back unchanged.
#[derive(Debug, Default, PartialEq, Clone, serde::Serialize, serde::Deserialize)]
pub struct RawReport {
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub hex: Option<String>,
    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub source_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub flight: Option<String>,
    /// Registration.
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub r: Option<String>,
    /// Aircraft type designator.
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
    #[serde(default, deserialize_with = "lenient::altitude", skip_serializing_if = "Option::is_none")]
    pub alt_baro: Option<BaroAltitude>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub alt_geom: Option<serde_json::Number>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub gs: Option<serde_json::Number>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub track: Option<serde_json::Number>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub baro_rate: Option<serde_json::Number>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub squawk: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub emergency: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub lat: Option<serde_json::Number>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub lon: Option<serde_json::Number>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub seen: Option<serde_json::Number>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub seen_pos: Option<serde_json::Number>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub rssi: Option<serde_json::Number>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub messages: Option<serde_json::Number>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RawReport {
    /// Builds a report from one decoded feed object.
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    #[must_use]
    pub fn latitude(&self) -> Option<f64> {
        self.lat.as_ref().and_then(serde_json::Number::as_f64)
    }

    #[must_use]
    pub fn longitude(&self) -> Option<f64> {
        self.lon.as_ref().and_then(serde_json::Number::as_f64)
    }

    /// Dedup and tracking key: trimmed callsign, else registration, else empty.
    #[must_use]
    pub fn identity(&self) -> String {
        let callsign = self
            .flight
            .as_deref()
            .map(str::trim)
            .filter(|callsign| !callsign.is_empty());
        let registration = self
            .r
            .as_deref()
            .map(str::trim)
            .filter(|registration| !registration.is_empty());

        callsign.or(registration).unwrap_or_default().to_string()
    }
}

mod lenient {
    use serde::Deserialize;

    fn to_number(value: serde_json::Value) -> Option<serde_json::Number> {
        match value {
            serde_json::Value::Number(number) => Some(number),
            serde_json::Value::String(string) => string.trim().parse::<serde_json::Number>().ok(),
            _ => None,
        }
    }

    pub fn number<'de, D>(deserializer: D) -> Result<Option<serde_json::Number>, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(to_number(value))
    }

    pub fn string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(match value {
            serde_json::Value::String(string) => Some(string),
            serde_json::Value::Number(number) => Some(number.to_string()),
            _ => None,
        })
    }

    pub fn altitude<'de, D>(deserializer: D) -> Result<Option<super::BaroAltitude>, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        if let serde_json::Value::String(string) = &value {
            if string.trim().eq_ignore_ascii_case("ground") {
                return Ok(Some(super::BaroAltitude::Ground));
            }
        }
        Ok(to_number(value).map(super::BaroAltitude::Feet))
    }
}
