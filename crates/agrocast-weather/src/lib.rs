//! Weather aggregation for Agrocast
//!
//! Fetches the current reading, the place name and the agent's weather
//! advisory for a coordinate in one concurrent round, tolerating failure of
//! any single source, and keeps the merged result in a time-limited cache.

pub mod aggregate;
pub mod cache;
pub mod fetch;
pub mod geocode;
pub mod location;
pub mod provider;
pub mod types;

pub use aggregate::{Aggregation, WeatherAggregator};
pub use cache::{
    AggregationCache, BlobStore, CacheRecord, Clock, FileBlobStore, ManualClock, MemoryBlobStore,
    ResultCache, SystemClock,
};
pub use fetch::{join_settled, FetchError, FetchOutcome, ParallelFetchCoordinator, RequestDescriptor};
pub use geocode::{compose_location_name, GeoPlace};
pub use location::{ConfiguredLocation, CoordinateSource};
pub use provider::{UpstreamEndpoints, UpstreamFetchSet};
pub use types::*;
