use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::timeout;
use tracing::debug;

pub const DEFAULT_LOCATE_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Approximate caller position used to bias map and search grounding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundingHint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GroundingHint {
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("location permission denied")]
    Denied,
    #[error("location is not supported in this environment")]
    Unsupported,
    #[error("location unavailable: {0}")]
    Unavailable(String),
}

pub type LocationFuture<'a> =
    Pin<Box<dyn Future<Output = Result<GroundingHint, LocationError>> + Send + 'a>>;

pub trait LocationSource: Send + Sync {
    fn current_position<'a>(&'a self) -> LocationFuture<'a>;
}

/// Source for hosts without any location capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocation;

impl LocationSource for NoLocation {
    fn current_position<'a>(&'a self) -> LocationFuture<'a> {
        Box::pin(async { Err(LocationError::Unsupported) })
    }
}

/// Operator-configured coordinates.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub GroundingHint);

impl LocationSource for FixedLocation {
    fn current_position<'a>(&'a self) -> LocationFuture<'a> {
        let hint = self.0;
        Box::pin(async move { Ok(hint) })
    }
}

/// Best-effort, time-boxed location lookup. Every failure degrades to `None`.
#[derive(Clone)]
pub struct GroundingContextProvider {
    source: Arc<dyn LocationSource>,
}

impl Default for GroundingContextProvider {
    fn default() -> Self {
        Self::new(Arc::new(NoLocation))
    }
}

impl GroundingContextProvider {
    pub fn new(source: Arc<dyn LocationSource>) -> Self {
        Self { source }
    }

    pub async fn try_locate(&self, limit: Duration) -> Option<GroundingHint> {
        match timeout(limit, self.source.current_position()).await {
            Ok(Ok(hint)) if hint.is_valid() => Some(hint),
            Ok(Ok(_)) => {
                debug!("discarding out-of-range location hint");
                None
            }
            Ok(Err(err)) => {
                debug!(error = %err, "location lookup failed; continuing without hint");
                None
            }
            Err(_) => {
                debug!(
                    timeout_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                    "location lookup timed out; continuing without hint"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::{
        FixedLocation, GroundingContextProvider, GroundingHint, LocationError, LocationFuture,
        LocationSource, NoLocation,
    };

    struct DeniedLocation;

    impl LocationSource for DeniedLocation {
        fn current_position<'a>(&'a self) -> LocationFuture<'a> {
            Box::pin(async { Err(LocationError::Denied) })
        }
    }

    struct IgnoredPrompt;

    impl LocationSource for IgnoredPrompt {
        fn current_position<'a>(&'a self) -> LocationFuture<'a> {
            Box::pin(std::future::pending())
        }
    }

    const ALENCON: GroundingHint = GroundingHint {
        latitude: 48.4329,
        longitude: 0.0913,
    };

    #[tokio::test]
    async fn fixed_location_resolves() {
        let provider = GroundingContextProvider::new(Arc::new(FixedLocation(ALENCON)));
        assert_eq!(
            provider.try_locate(Duration::from_millis(50)).await,
            Some(ALENCON)
        );
    }

    #[tokio::test]
    async fn denial_and_unsupported_degrade_to_none() {
        let denied = GroundingContextProvider::new(Arc::new(DeniedLocation));
        assert_eq!(denied.try_locate(Duration::from_millis(50)).await, None);

        let unsupported = GroundingContextProvider::new(Arc::new(NoLocation));
        assert_eq!(unsupported.try_locate(Duration::from_millis(50)).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn ignored_permission_prompt_times_out() {
        let provider = GroundingContextProvider::new(Arc::new(IgnoredPrompt));
        assert_eq!(provider.try_locate(Duration::from_secs(5)).await, None);
    }

    #[tokio::test]
    async fn out_of_range_coordinates_are_discarded() {
        let provider = GroundingContextProvider::new(Arc::new(FixedLocation(GroundingHint {
            latitude: 120.0,
            longitude: 0.0,
        })));
        assert_eq!(provider.try_locate(Duration::from_millis(50)).await, None);

        let provider = GroundingContextProvider::new(Arc::new(FixedLocation(GroundingHint {
            latitude: f64::NAN,
            longitude: 0.0,
        })));
        assert_eq!(provider.try_locate(Duration::from_millis(50)).await, None);
    }
}
