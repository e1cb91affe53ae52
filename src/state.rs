//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the one `AssetCache` for the process, the optional image
//! generator and the `UpgradeControl` shared with the boot upgrade pass.
//! All are cheap to clone.

use std::sync::Arc;

use crate::assets::AssetCache;
use crate::imagegen::ImageGenerator;
use crate::services::upgrade::UpgradeControl;

/// Shared application state, injected into Axum handlers via State extractor.
#[derive(Clone)]
pub struct AppState {
    pub cache: AssetCache,
    /// Optional image generator. `None` if image generation env vars are not configured.
    pub generator: Option<Arc<dyn ImageGenerator>>,
    /// Single-flight gate for background generation.
    pub upgrade: UpgradeControl,
}

impl AppState {
    #[must_use]
    pub fn new(cache: AssetCache, generator: Option<Arc<dyn ImageGenerator>>, upgrade: UpgradeControl) -> Self {
        Self { cache, generator, upgrade }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio::sync::watch;

    use super::*;
    use crate::assets::test_support::memory_cache;
    use crate::imagegen::{GeneratedImage, GenerationError};
    use crate::services::upgrade::UpgradeConfig;

    /// Upgrade control with no pacing and a shutdown signal that never fires.
    #[must_use]
    pub fn idle_upgrade_control() -> UpgradeControl {
        let (_tx, rx) = watch::channel(false);
        UpgradeControl::new(UpgradeConfig { enabled: true, start_delay_ms: 0, pacing_ms: 0 }, rx)
    }

    /// Create a test `AppState` around `cache`, without a generator.
    #[must_use]
    pub fn test_app_state_with_cache(cache: AssetCache) -> AppState {
        AppState::new(cache, None, idle_upgrade_control())
    }

    /// Create a test `AppState` over an in-memory store, without a generator.
    #[must_use]
    pub fn test_app_state() -> AppState {
        test_app_state_with_cache(memory_cache())
    }

    /// Create a test `AppState` with a mock generator.
    #[must_use]
    pub fn test_app_state_with_generator(generator: Arc<dyn ImageGenerator>) -> AppState {
        AppState::new(memory_cache(), Some(generator), idle_upgrade_control())
    }

    /// Generator returning a fixed image, or failing like an unreachable API.
    /// Tracks how many calls were in flight at once.
    pub struct MockGenerator {
        image: Option<Vec<u8>>,
        delay: Duration,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak_in_flight: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl MockGenerator {
        fn build(image: Option<Vec<u8>>, delay: Duration) -> Self {
            Self {
                image,
                delay,
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                peak_in_flight: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            }
        }

        #[must_use]
        pub fn returning(bytes: Vec<u8>) -> Self {
            Self::build(Some(bytes), Duration::ZERO)
        }

        #[must_use]
        pub fn failing() -> Self {
            Self::build(None, Duration::ZERO)
        }

        /// Like `returning`, but each call takes `delay` to answer.
        #[must_use]
        pub fn slow(bytes: Vec<u8>, delay: Duration) -> Self {
            Self::build(Some(bytes), delay)
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// Most calls ever in flight at the same time.
        pub fn peak_in_flight(&self) -> usize {
            self.peak_in_flight.load(Ordering::SeqCst)
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl ImageGenerator for MockGenerator {
        async fn generate(&self, prompt: &str) -> Result<GeneratedImage, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match &self.image {
                Some(bytes) => Ok(GeneratedImage { mime: "image/png".into(), bytes: bytes.clone() }),
                None => Err(GenerationError::ApiRequest("connection refused".into())),
            }
        }
    }
}
