/// Mean earth radius in nautical miles.
const EARTH_RADIUS_NM: f64 = 3440.065;

#[derive(Debug, PartialEq, Eq, Clone, Copy, serde::Serialize)]
pub enum CardinalDirection {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl CardinalDirection {
    const ALL: [CardinalDirection; 8] = [
        CardinalDirection::N,
        CardinalDirection::NE,
        CardinalDirection::E,
        CardinalDirection::SE,
        CardinalDirection::S,
        CardinalDirection::SW,
        CardinalDirection::W,
        CardinalDirection::NW,
    ];

    /// Buckets a bearing in degrees into one of the eight 45° sectors.
    #[must_use]
    pub fn from_bearing(bearing: f64) -> Self {
        let normalized = bearing.rem_euclid(360.0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let index = (normalized / 45.0).round() as usize % 8;
        Self::ALL[index]
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CardinalDirection::N => "N",
            CardinalDirection::NE => "NE",
            CardinalDirection::E => "E",
            CardinalDirection::SE => "SE",
            CardinalDirection::S => "S",
            CardinalDirection::SW => "SW",
            CardinalDirection::W => "W",
            CardinalDirection::NW => "NW",
        }
    }
}

impl std::fmt::Display for CardinalDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// The feed reports 0 for coordinates it does not have, so 0 counts as missing.
fn is_present(value: f64) -> bool {
    value.is_finite() && value != 0.0
}

fn all_present(coordinates: [f64; 4]) -> bool {
    coordinates.into_iter().all(is_present)
}

/// Haversine distance between two points in nautical miles.
///
/// Returns `None` when any coordinate is missing (zero or not finite).
#[must_use]
pub fn distance_nautical_miles(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Option<f64> {
    if !all_present([lat1, lon1, lat2, lon2]) {
        return None;
    }

    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    Some(EARTH_RADIUS_NM * c)
}

/// Initial bearing from point 1 to point 2, normalized to `[0, 360)`.
#[must_use]
pub fn initial_bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let y = delta_lon.sin() * lat2_rad.cos();
    let x = lat1_rad.cos() * lat2_rad.sin() - lat1_rad.sin() * lat2_rad.cos() * delta_lon.cos();

    y.atan2(x).to_degrees().rem_euclid(360.0)
}

/// Compass point of the second position as seen from the first.
#[must_use]
pub fn bearing_cardinal(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Option<CardinalDirection> {
    if !all_present([lat1, lon1, lat2, lon2]) {
        return None;
    }
    Some(CardinalDirection::from_bearing(initial_bearing(
        lat1, lon1, lat2, lon2,
    )))
}
