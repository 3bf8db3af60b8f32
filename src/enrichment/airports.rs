use thiserror::Error;

#[derive(Debug, Error)]
pub enum AirportDirectoryError {
    #[error("Failed to read '{}': {source}", path.display())]
    Io {
        source: std::io::Error,
        path: std::path::PathBuf,
    },

    #[error("Failed to parse '{}': {source}", path.display())]
    Parse {
        source: serde_json::Error,
        path: std::path::PathBuf,
    },
}

#[derive(Debug, Default, Clone, serde::Deserialize)]
pub struct AirportRecord {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(serde::Deserialize)]
struct StatesFile {
    name: std::collections::HashMap<String, String>,
}

/// Static ICAO code → city/state lookup used to make route codes readable.
#[derive(Debug, Default)]
pub struct AirportDirectory {
    airports: std::collections::HashMap<String, AirportRecord>,
    states: std::collections::HashMap<String, String>,
}

fn read_json<T: serde::de::DeserializeOwned>(
    path: &std::path::Path,
) -> Result<T, AirportDirectoryError> {
    let string = std::fs::read_to_string(path).map_err(|source| AirportDirectoryError::Io {
        source,
        path: path.to_path_buf(),
    })?;
    serde_json::from_str(&string).map_err(|source| AirportDirectoryError::Parse {
        source,
        path: path.to_path_buf(),
    })
}

impl AirportDirectory {
    #[must_use]
    pub fn new(
        airports: std::collections::HashMap<String, AirportRecord>,
        states: std::collections::HashMap<String, String>,
    ) -> Self {
        AirportDirectory { airports, states }
    }

    /// Loads `{ICAO: {city, state}}` and `{"name": {abbreviation: full name}}` files.
    /// Either may be omitted, leaving that part of the directory empty.
    pub fn load(
        airports_path: Option<&std::path::Path>,
        states_path: Option<&std::path::Path>,
    ) -> Result<Self, AirportDirectoryError> {
        let airports = match airports_path {
            Some(path) => read_json(path)?,
            None => std::collections::HashMap::new(),
        };
        let states = match states_path {
            Some(path) => read_json::<StatesFile>(path)?.name,
            None => std::collections::HashMap::new(),
        };
        log::info!(
            "Airport directory loaded: {} airports, {} states",
            airports.len(),
            states.len()
        );
        Ok(AirportDirectory { airports, states })
    }

    /// "City, State" for an airport code, or an empty string when unknown.
    #[must_use]
    pub fn location(&self, code: &str) -> String {
        let Some(airport) = self.airports.get(code) else {
            return String::new();
        };
        match (airport.city.as_deref(), airport.state.as_deref()) {
            (Some(city), Some(state)) if !city.is_empty() && !state.is_empty() => {
                let state = self.states.get(state).map_or(state, String::as_str);
                format!("{city}, {state}")
            }
            _ => String::new(),
        }
    }
}
