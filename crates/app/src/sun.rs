//! Sun-time resolver: keeps the `sunset`/`sunrise` anchors current.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::FixedOffset;
use tokio::task::JoinHandle;

use switchyard_domain::error::HubError;
use switchyard_domain::sun::SunTimes;
use switchyard_domain::time;

use crate::ports::SunTimeSource;

/// Shared, replace-only holder of the current sun times.
#[derive(Debug, Default)]
pub struct SunTimeCache {
    current: RwLock<SunTimes>,
}

impl SunTimeCache {
    #[must_use]
    pub fn new(initial: SunTimes) -> Self {
        Self {
            current: RwLock::new(initial),
        }
    }

    #[must_use]
    pub fn current(&self) -> SunTimes {
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn replace(&self, sun: SunTimes) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = sun;
    }
}

/// Periodic sun-time lookup.
pub struct SunTimeResolver<S> {
    source: S,
    cache: Arc<SunTimeCache>,
    utc_offset: FixedOffset,
    shift_secs: i64,
    refresh: Duration,
}

impl<S> SunTimeResolver<S>
where
    S: SunTimeSource + 'static,
{
    #[must_use]
    pub fn new(
        source: S,
        cache: Arc<SunTimeCache>,
        utc_offset: FixedOffset,
        shift_secs: i64,
        refresh: Duration,
    ) -> Self {
        Self {
            source,
            cache,
            utc_offset,
            shift_secs,
            refresh,
        }
    }

    /// Spawn the loop on the runtime. The first lookup happens immediately.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        loop {
            if let Err(err) = self.refresh_once().await {
                tracing::warn!(%err, "sun time lookup failed, keeping previous values");
            }
            tokio::time::sleep(self.refresh).await;
        }
    }

    /// Look up sun events once and publish the resolved times.
    ///
    /// # Errors
    ///
    /// Returns the source's error; the cache is left untouched.
    pub async fn refresh_once(&self) -> Result<SunTimes, HubError> {
        let events = self.source.fetch().await?;
        let sun = SunTimes::resolve(events, self.utc_offset, self.shift_secs, time::now());
        self.cache.replace(sun);
        tracing::info!(
            sunset = %sun.sunset,
            sunrise = %sun.sunrise,
            actual_sunset = %sun.actual_sunset,
            actual_sunrise = %sun.actual_sunrise,
            "sun times refreshed"
        );
        Ok(sun)
    }
}
