//! Coordinate sources.

use async_trait::async_trait;

use crate::types::{Coordinate, LocationError};

/// Supplies the coordinate an aggregation round is keyed by.
#[async_trait]
pub trait CoordinateSource: Send + Sync {
    async fn coordinate(&self) -> Result<Coordinate, LocationError>;
}

/// Coordinate taken from configuration; unavailable when none was configured.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredLocation {
    coordinate: Option<Coordinate>,
}

impl ConfiguredLocation {
    pub fn new(coordinate: Option<Coordinate>) -> Self {
        Self { coordinate }
    }

    pub fn is_available(&self) -> bool {
        self.coordinate.is_some()
    }
}

#[async_trait]
impl CoordinateSource for ConfiguredLocation {
    async fn coordinate(&self) -> Result<Coordinate, LocationError> {
        self.coordinate.ok_or(LocationError::ServiceUnavailable)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[tokio::test]
    async fn test_configured_location_returns_coordinate() {
        let source = ConfiguredLocation::new(Some(Coordinate::new(18.52, 73.85)));
        assert!(source.is_available());
        assert_eq!(source.coordinate().await.unwrap(), Coordinate::new(18.52, 73.85));
    }

    #[tokio::test]
    async fn test_unconfigured_location_is_unavailable() {
        let source = ConfiguredLocation::default();
        assert!(!source.is_available());
        assert!(matches!(
            source.coordinate().await,
            Err(LocationError::ServiceUnavailable)
        ));
    }
}
