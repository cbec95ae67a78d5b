//! The fixed set of upstream requests for one coordinate, and decoding of
//! their settled outcomes into an [`AggregatedResult`].

use agrocast_agent::{weather_alert_prompt, AgentReply, AgentSession};
use agrocast_core::SourceError;
use serde::Deserialize;
use serde_json::Value;

use crate::fetch::{FetchError, FetchOutcome, RequestDescriptor};
use crate::geocode::{compose_location_name, GeoPlace};
use crate::types::{AggregatedResult, Coordinate, WeatherCondition, WeatherReading, Wind};

pub const WEATHER_SOURCE: &str = "weather";
pub const GEOCODE_SOURCE: &str = "geocode";
pub const AGENT_SOURCE: &str = "agent";

/// Field of the agent reply carrying the per-day weather advisory
pub const WEATHER_ALERT_FIELD: &str = "weather_alert";

/// Where the three upstream sources live.
#[derive(Debug, Clone)]
pub struct UpstreamEndpoints {
    /// Base URL of the weather + geocoding provider
    pub api_base_url: String,
    pub api_key: String,
    /// Agent endpoint answering weather warning prompts
    pub agent_url: String,
    pub agent_session: AgentSession,
}

/// Request descriptors for one coordinate: primary reading, place name, agent advisory.
#[derive(Debug, Clone)]
pub struct UpstreamFetchSet {
    descriptors: Vec<RequestDescriptor>,
}

impl UpstreamFetchSet {
    pub const WEATHER: usize = 0;
    pub const GEOCODE: usize = 1;
    pub const AGENT: usize = 2;

    /// Build the three descriptors. Fails only when the agent envelope
    /// cannot be serialized.
    pub fn for_coordinate(
        endpoints: &UpstreamEndpoints,
        coordinate: Coordinate,
    ) -> Result<Self, FetchError> {
        let base = endpoints.api_base_url.trim_end_matches('/');

        let weather = RequestDescriptor::get(WEATHER_SOURCE, format!("{}/data/2.5/weather", base))
            .query("lat", coordinate.latitude)
            .query("lon", coordinate.longitude)
            .query("units", "metric")
            .query("appid", &endpoints.api_key);

        let geocode = RequestDescriptor::get(GEOCODE_SOURCE, format!("{}/geo/1.0/reverse", base))
            .query("lat", coordinate.latitude)
            .query("lon", coordinate.longitude)
            .query("limit", 1)
            .query("appid", &endpoints.api_key);

        let envelope = endpoints
            .agent_session
            .envelope(weather_alert_prompt(coordinate.latitude, coordinate.longitude));
        let agent =
            RequestDescriptor::post_json(AGENT_SOURCE, endpoints.agent_url.clone(), &envelope)?;

        Ok(Self {
            descriptors: vec![weather, geocode, agent],
        })
    }

    pub fn descriptors(&self) -> &[RequestDescriptor] {
        &self.descriptors
    }

    /// Merge the settled outcomes (in descriptor order) into one result.
    ///
    /// A fulfilled response that cannot be decoded counts as a failed source.
    pub fn assemble(outcomes: Vec<FetchOutcome<Value>>) -> AggregatedResult {
        let mut outcomes = outcomes.into_iter();
        let mut next = || {
            outcomes
                .next()
                .unwrap_or_else(|| FetchOutcome::Rejected(SourceError::empty("missing outcome")))
        };
        let weather_outcome = next();
        let geocode_outcome = next();
        let agent_outcome = next();

        let weather = weather_outcome
            .into_result()
            .and_then(decode_reading)
            .map_err(|e| tracing::warn!("No weather reading: {}", e))
            .ok();

        let places = geocode_outcome
            .into_result()
            .and_then(|body| {
                GeoPlace::list_from_value(body)
                    .map_err(|e| SourceError::malformed(GEOCODE_SOURCE, e.to_string()))
            })
            .map_err(|e| tracing::warn!("No place name: {}", e))
            .unwrap_or_default();

        let all_agent_weather = agent_outcome
            .into_result()
            .and_then(|body| {
                AgentReply::from_value(body)
                    .map_err(|e| SourceError::malformed(AGENT_SOURCE, e.to_string()))
            })
            .map_err(|e| tracing::warn!("No agent advisory: {}", e))
            .ok()
            .and_then(|reply| reply.alert(WEATHER_ALERT_FIELD));

        let location_name = match &weather {
            Some(reading) => compose_location_name(reading.station.as_deref(), &places),
            None => String::new(),
        };

        AggregatedResult {
            weather,
            location_name,
            all_agent_weather,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwmCurrent {
    name: Option<String>,
    main: OwmMain,
    #[serde(default)]
    weather: Vec<OwmCondition>,
    #[serde(default)]
    wind: Option<OwmWind>,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    humidity: u8,
    pressure: f64,
    sea_level: Option<f64>,
    temp_min: f64,
    temp_max: f64,
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    id: i32,
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    speed: f64,
    #[serde(default)]
    deg: f64,
    gust: Option<f64>,
}

/// Decode the current-weather response body into a [`WeatherReading`].
pub fn decode_reading(body: Value) -> Result<WeatherReading, SourceError> {
    let current: OwmCurrent = serde_json::from_value(body)
        .map_err(|e| SourceError::malformed(WEATHER_SOURCE, e.to_string()))?;

    let condition = current
        .weather
        .first()
        .ok_or_else(|| SourceError::malformed(WEATHER_SOURCE, "no weather condition"))?;

    let wind = current
        .wind
        .map(|w| Wind {
            speed: w.speed,
            deg: w.deg,
            gust: w.gust.filter(|g| *g > 0.0),
        })
        .unwrap_or_default();

    Ok(WeatherReading {
        temperature: current.main.temp,
        condition: condition.description.clone(),
        category: WeatherCondition::from_owm_code(condition.id),
        humidity: current.main.humidity,
        pressure: current.main.pressure,
        sea_level: current.main.sea_level,
        temp_max: current.main.temp_max,
        temp_min: current.main.temp_min,
        wind,
        station: current.name.filter(|n| !n.is_empty()),
    })
}
