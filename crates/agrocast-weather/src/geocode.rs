//! Reverse geocoding: convert coordinates to human-readable place names.
//! Uses the OpenWeatherMap geocoding API, limited to one result.

use serde::Deserialize;
use serde_json::Value;

pub const UNKNOWN_LOCATION: &str = "Unknown location";

/// One entry of the reverse-geocoding response
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeoPlace {
    pub name: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

impl GeoPlace {
    /// Decode the reverse-geocoding response body (a JSON array of places).
    pub fn list_from_value(body: Value) -> Result<Vec<GeoPlace>, serde_json::Error> {
        serde_json::from_value(body)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Build the display name for a location (e.g. "Shivajinagar, Pune, Maharashtra").
///
/// Uses the station name from the weather reading plus the first geocoded
/// place when that place has both a name and a state. Falls back to the
/// station name alone, then to [`UNKNOWN_LOCATION`]. A reading without a
/// station still shows a complete place as `"<place>, <state>"`.
pub fn compose_location_name(station: Option<&str>, places: &[GeoPlace]) -> String {
    let station = non_empty(station);

    let place = places.first().and_then(|p| {
        let name = non_empty(p.name.as_deref())?;
        let state = non_empty(p.state.as_deref())?;
        Some((name, state))
    });

    let result = match (station, place) {
        (Some(station), Some((name, state))) => format!("{}, {}, {}", station, name, state),
        (None, Some((name, state))) => format!("{}, {}", name, state),
        (Some(station), None) => station.to_string(),
        (None, None) => UNKNOWN_LOCATION.to_string(),
    };

    tracing::debug!("Composed location name: {}", result);
    result
}
