//! One aggregation round: coordinate → cache → concurrent fetch → cache.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::cache::ResultCache;
use crate::fetch::ParallelFetchCoordinator;
use crate::location::CoordinateSource;
use crate::provider::{UpstreamEndpoints, UpstreamFetchSet};
use crate::types::{AggregatedResult, Coordinate, LocationError};

/// What a call to [`WeatherAggregator::load`] produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregation {
    /// Served from the cache; nothing was fetched
    Cached(AggregatedResult),
    /// Fetched with at least the primary reading, and stored unless a newer
    /// round for the same coordinate already was
    Fetched(AggregatedResult),
    /// Primary reading failed but another source answered; not stored
    Degraded(AggregatedResult),
    /// A newer round for another coordinate started while this one was in
    /// flight; result discarded
    Superseded,
    /// No source produced anything usable
    Unavailable,
    /// No coordinate; neither the cache nor the network was consulted
    NoCoordinate(LocationError),
}

impl Aggregation {
    /// The result to display, if any
    pub fn result(&self) -> Option<&AggregatedResult> {
        match self {
            Self::Cached(r) | Self::Fetched(r) | Self::Degraded(r) => Some(r),
            Self::Superseded | Self::Unavailable | Self::NoCoordinate(_) => None,
        }
    }

    pub fn into_result(self) -> Option<AggregatedResult> {
        match self {
            Self::Cached(r) | Self::Fetched(r) | Self::Degraded(r) => Some(r),
            Self::Superseded | Self::Unavailable | Self::NoCoordinate(_) => None,
        }
    }
}

/// Runs aggregation rounds and owns the right to write the cache.
pub struct WeatherAggregator<C> {
    coordinator: ParallelFetchCoordinator,
    endpoints: UpstreamEndpoints,
    cache: Arc<C>,
    rounds: Mutex<RoundState>,
}

#[derive(Debug, Default)]
struct RoundState {
    /// Token and coordinate of the most recently started round
    latest: u64,
    latest_coordinate: Option<Coordinate>,
    /// Token of the round whose result is in the cache
    stored: u64,
}

impl<C> WeatherAggregator<C>
where
    C: ResultCache<Coordinate, AggregatedResult>,
{
    pub fn new(
        coordinator: ParallelFetchCoordinator,
        endpoints: UpstreamEndpoints,
        cache: Arc<C>,
    ) -> Self {
        Self {
            coordinator,
            endpoints,
            cache,
            rounds: Mutex::new(RoundState::default()),
        }
    }

    pub fn cache(&self) -> &Arc<C> {
        &self.cache
    }

    /// Resolve a coordinate from `source`, then serve from cache or fetch.
    pub async fn load(&self, source: &dyn CoordinateSource) -> Aggregation {
        match source.coordinate().await {
            Ok(coordinate) => self.load_for(coordinate).await,
            Err(e) => {
                tracing::warn!("No coordinate available: {}", e);
                Aggregation::NoCoordinate(e)
            }
        }
    }

    /// Serve from cache when valid for `coordinate`, otherwise run a round.
    pub async fn load_for(&self, coordinate: Coordinate) -> Aggregation {
        if let Some(result) = self.cache.lookup(&coordinate) {
            return Aggregation::Cached(result);
        }
        self.refresh(coordinate).await
    }

    /// Run one fetch round for `coordinate`, bypassing the cache lookup.
    pub async fn refresh(&self, coordinate: Coordinate) -> Aggregation {
        let round = self.begin_round(coordinate);
        tracing::info!("Fetching weather for {} (round {})", coordinate, round);

        let dispatched = match UpstreamFetchSet::for_coordinate(&self.endpoints, coordinate) {
            Ok(fetch_set) => self.coordinator.execute(fetch_set.descriptors()).await,
            Err(e) => Err(e),
        };
        let outcomes = match dispatched {
            Ok(outcomes) => outcomes,
            Err(e) => {
                tracing::error!("Weather round not dispatched: {}", e);
                return Aggregation::Unavailable;
            }
        };

        if outcomes.iter().all(|o| o.is_rejected()) {
            tracing::warn!("All weather sources failed for {}", coordinate);
            return Aggregation::Unavailable;
        }

        let result = UpstreamFetchSet::assemble(outcomes);
        if result.is_empty() {
            tracing::warn!("No usable weather data for {}", coordinate);
            return Aggregation::Unavailable;
        }
        if !result.has_primary() {
            tracing::warn!("Primary weather source failed for {}; not caching", coordinate);
            return Aggregation::Degraded(result);
        }

        self.commit(round, coordinate, result)
    }

    fn begin_round(&self, coordinate: Coordinate) -> u64 {
        let mut rounds = self.rounds.lock();
        rounds.latest += 1;
        rounds.latest_coordinate = Some(coordinate);
        rounds.latest
    }

    // Held across the write so a newer round cannot begin between check and store
    fn commit(&self, round: u64, coordinate: Coordinate, result: AggregatedResult) -> Aggregation {
        let mut rounds = self.rounds.lock();
        if rounds.latest_coordinate != Some(coordinate) {
            tracing::info!(
                "Discarding weather round {} for {}; round {} moved the location",
                round,
                coordinate,
                rounds.latest
            );
            return Aggregation::Superseded;
        }

        // A newer round for the same place already stored its result
        if round < rounds.stored {
            tracing::debug!(
                "Weather round {} finished after round {}; not caching",
                round,
                rounds.stored
            );
            return Aggregation::Fetched(result);
        }

        if let Err(e) = self.cache.store(&coordinate, &result) {
            tracing::warn!("Failed to cache weather data: {}", e);
        }
        rounds.stored = round;
        Aggregation::Fetched(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_accessor() {
        let r = AggregatedResult {
            location_name: "Here".into(),
            ..Default::default()
        };
        assert_eq!(Aggregation::Cached(r.clone()).result(), Some(&r));
        assert_eq!(Aggregation::Degraded(r.clone()).into_result(), Some(r));
        assert!(Aggregation::Superseded.result().is_none());
        assert!(Aggregation::NoCoordinate(LocationError::PermissionDenied)
            .result()
            .is_none());
    }
}
