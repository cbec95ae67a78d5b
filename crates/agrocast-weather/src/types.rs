use serde::{Deserialize, Serialize};

/// Geographic coordinate.
///
/// Cache validation compares coordinates with exact equality; there is no
/// tolerance radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// Weather condition categories mapped from OpenWeatherMap condition codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    HeavyRain,
    Snow,
    Sleet,
    Thunderstorm,
}

impl WeatherCondition {
    /// Convert an OpenWeatherMap condition id to a WeatherCondition
    /// See: https://openweathermap.org/weather-conditions
    pub fn from_owm_code(code: i32) -> Self {
        match code {
            200..=232 => Self::Thunderstorm,
            300..=321 => Self::Drizzle,
            500 | 501 | 520 | 521 => Self::Rain,
            502..=504 | 522 | 531 => Self::HeavyRain,
            511 => Self::Sleet, // Freezing rain
            600..=602 | 620..=622 => Self::Snow,
            611..=616 => Self::Sleet,
            701..=781 => Self::Fog, // Mist, haze, dust and the rest of the atmosphere group
            800 => Self::Clear,
            801 | 802 => Self::PartlyCloudy,
            803 | 804 => Self::Cloudy,
            _ => Self::Clear,
        }
    }

    /// Short label for the category
    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Cloudy => "Cloudy",
            Self::Fog => "Fog",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::HeavyRain => "Heavy Rain",
            Self::Snow => "Snow",
            Self::Sleet => "Sleet",
            Self::Thunderstorm => "Thunderstorm",
        }
    }
}

/// Wind at the observation point (metric units)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Wind {
    /// Metres per second
    pub speed: f64,
    /// Meteorological degrees
    pub deg: f64,
    pub gust: Option<f64>,
}

/// Current conditions from the primary weather source (metric units)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    pub temperature: f64,
    /// Provider's free-text description, e.g. "light rain"
    pub condition: String,
    #[serde(default)]
    pub category: WeatherCondition,
    pub humidity: u8,
    /// hPa
    pub pressure: f64,
    pub sea_level: Option<f64>,
    pub temp_max: f64,
    pub temp_min: f64,
    pub wind: Wind,
    /// Name of the reporting station / nearest town
    #[serde(default)]
    pub station: Option<String>,
}

impl WeatherReading {
    pub fn display_temperature(&self) -> String {
        format_celsius(self.temperature)
    }

    pub fn display_temp_max(&self) -> String {
        format_celsius(self.temp_max)
    }

    pub fn display_temp_min(&self) -> String {
        format_celsius(self.temp_min)
    }

    pub fn display_humidity(&self) -> String {
        format!("{}%", self.humidity)
    }

    pub fn display_pressure(&self) -> String {
        format!("{} hPa", self.pressure)
    }

    pub fn display_sea_level(&self) -> Option<String> {
        self.sea_level.map(|p| format!("{} hPa", p))
    }

    pub fn display_wind_speed(&self) -> String {
        format!("{} m/s", self.wind.speed)
    }

    pub fn display_wind_direction(&self) -> String {
        format!("{}°", self.wind.deg)
    }

    pub fn display_gust(&self) -> Option<String> {
        self.wind.gust.map(|g| format!("{} m/s", g))
    }
}

fn format_celsius(value: f64) -> String {
    format!("{:.0}°C", value.round())
}

/// Merged outcome of one aggregation round.
///
/// Each source is either present or `None`; a partial result is valid as long
/// as the primary reading is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedResult {
    pub weather: Option<WeatherReading>,
    pub location_name: String,
    pub all_agent_weather: Option<serde_json::Value>,
}

impl AggregatedResult {
    /// True when the primary source contributed a reading
    pub fn has_primary(&self) -> bool {
        self.weather.is_some()
    }

    /// True when no source contributed anything
    pub fn is_empty(&self) -> bool {
        self.weather.is_none() && self.all_agent_weather.is_none()
    }
}

/// Why a [`crate::CoordinateSource`] produced no coordinate
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("access to the device location was denied")]
    PermissionDenied,
    #[error("no location source is available")]
    ServiceUnavailable,
    #[error("timed out waiting for a position fix")]
    Timeout,
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("could not build HTTP client: {0}")]
    Client(String),
    #[error("cache record: {0}")]
    Cache(String),
    #[error("cache storage: {0}")]
    Io(#[from] std::io::Error),
}
