//! Upgrade service: background pass replacing fallbacks with generated art.
//!
//! DESIGN
//! ======
//! After a start delay the task walks `Subject::ALL` once, in order, calling
//! `upgrade_subject` for each and sleeping a fixed pacing interval between
//! subjects. The step is idempotent: a subject already serving a generated
//! image is skipped, so an interrupted pass converges on the next boot.
//!
//! Background generation is single-flight: the boot pass and every forced
//! regeneration share one `UpgradeControl` gate, so at most one walk is
//! talking to the generator at a time. A regeneration requested while a walk
//! holds the gate is refused; the boot pass waits for it instead.
//!
//! The task watches a shutdown channel and stops during a sleep, while
//! waiting for the gate, or in the middle of a step. Dropping a step is safe
//! because a store replaces the whole value or nothing.
//!
//! ERROR HANDLING
//! ==============
//! Generation and store failures are logged per subject and never abort the
//! pass. The cache keeps serving whatever it served before.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::assets::{AssetCache, AssetError, AssetOrigin, Subject};
use crate::imagegen::ImageGenerator;
use crate::imagegen::prompts;

pub const DEFAULT_UPGRADE_START_DELAY_MS: u64 = 5000;
pub const DEFAULT_UPGRADE_PACING_MS: u64 = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpgradeConfig {
    pub enabled: bool,
    /// Delay before the first subject, in milliseconds.
    pub start_delay_ms: u64,
    /// Pause between subjects, in milliseconds.
    pub pacing_ms: u64,
}

impl Default for UpgradeConfig {
    fn default() -> Self {
        Self { enabled: true, start_delay_ms: DEFAULT_UPGRADE_START_DELAY_MS, pacing_ms: DEFAULT_UPGRADE_PACING_MS }
    }
}

/// Result of one `upgrade_subject` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Already generated; nothing requested.
    Skipped,
    Upgraded,
    /// Generated but only kept in the session overlay.
    SessionOnly,
    Failed,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpgradeReport {
    pub upgraded: usize,
    pub skipped: usize,
    pub session_only: usize,
    pub failed: usize,
    pub cancelled: bool,
}

impl UpgradeReport {
    fn record(&mut self, outcome: StepOutcome) {
        match outcome {
            StepOutcome::Skipped => self.skipped += 1,
            StepOutcome::Upgraded => self.upgraded += 1,
            StepOutcome::SessionOnly => self.session_only += 1,
            StepOutcome::Failed => self.failed += 1,
        }
    }
}

/// Generate and store a new image for `subject` unless one is already
/// generated. `force` regenerates regardless.
pub async fn upgrade_subject(
    cache: &AssetCache,
    generator: &dyn ImageGenerator,
    subject: Subject,
    force: bool,
) -> StepOutcome {
    if !force && cache.origin(subject).await == Some(AssetOrigin::Generated) {
        return StepOutcome::Skipped;
    }

    let image = match generator.generate(prompts::prompt(subject)).await {
        Ok(image) => image,
        Err(e) => {
            let e = AssetError::from(e);
            warn!(subject = subject.slug(), error = %e, "image generation failed; keeping current image");
            return StepOutcome::Failed;
        }
    };

    let raw_bytes = image.bytes.len();
    match cache.store_image(subject, image.bytes).await {
        Ok(normalized) => {
            info!(
                subject = subject.slug(),
                mime = %image.mime,
                raw_bytes,
                stored_bytes = normalized.data_uri.len(),
                "asset upgraded"
            );
            StepOutcome::Upgraded
        }
        Err(AssetError::CapacityExceeded { .. }) => StepOutcome::SessionOnly,
        Err(e) => {
            warn!(subject = subject.slug(), error = %e, "generated image not stored");
            StepOutcome::Failed
        }
    }
}

// =============================================================================
// CONTROL
// =============================================================================

/// Shared handle for background generation: pacing, shutdown signal and the
/// single-flight gate. Cheap to clone.
#[derive(Clone)]
pub struct UpgradeControl {
    config: UpgradeConfig,
    gate: Arc<Mutex<()>>,
    shutdown: watch::Receiver<bool>,
}

impl UpgradeControl {
    #[must_use]
    pub fn new(config: UpgradeConfig, shutdown: watch::Receiver<bool>) -> Self {
        Self { config, gate: Arc::new(Mutex::new(())), shutdown }
    }

    fn try_acquire(&self) -> Option<OwnedMutexGuard<()>> {
        self.gate.clone().try_lock_owned().ok()
    }

    /// Wait for the gate. `None` if shutdown was signalled first.
    async fn acquire(&self, shutdown: &mut watch::Receiver<bool>) -> Option<OwnedMutexGuard<()>> {
        if *shutdown.borrow() {
            return None;
        }
        tokio::select! {
            guard = self.gate.clone().lock_owned() => Some(guard),
            () = shutdown_signalled(shutdown) => None,
        }
    }
}

// =============================================================================
// TASKS
// =============================================================================

/// Spawn the background upgrade pass. Returns a handle yielding its report.
pub fn spawn_upgrade_task(
    cache: AssetCache,
    generator: Arc<dyn ImageGenerator>,
    control: UpgradeControl,
) -> JoinHandle<UpgradeReport> {
    let config = control.config;
    info!(
        enabled = config.enabled,
        start_delay_ms = config.start_delay_ms,
        pacing_ms = config.pacing_ms,
        "asset upgrade configured"
    );
    tokio::spawn(async move { run_upgrade_pass(&cache, generator.as_ref(), &control).await })
}

async fn run_upgrade_pass(cache: &AssetCache, generator: &dyn ImageGenerator, control: &UpgradeControl) -> UpgradeReport {
    let mut report = UpgradeReport::default();
    let config = control.config;
    if !config.enabled {
        return report;
    }

    let mut shutdown = control.shutdown.clone();
    if !pause(config.start_delay_ms, &mut shutdown).await {
        report.cancelled = true;
        info!("asset upgrade cancelled before start");
        return report;
    }

    let Some(_guard) = control.acquire(&mut shutdown).await else {
        report.cancelled = true;
        info!("asset upgrade cancelled while waiting for regeneration");
        return report;
    };

    let report = walk_subjects(cache, generator, false, config.pacing_ms, &mut shutdown).await;
    info!(
        upgraded = report.upgraded,
        skipped = report.skipped,
        session_only = report.session_only,
        failed = report.failed,
        cancelled = report.cancelled,
        "asset upgrade pass finished"
    );
    report
}

/// Start a forced regeneration of every subject, paced like the boot pass.
/// Returns `None` without spawning anything if a walk is already running.
#[must_use]
pub fn spawn_regeneration(
    cache: AssetCache,
    generator: Arc<dyn ImageGenerator>,
    control: &UpgradeControl,
) -> Option<JoinHandle<UpgradeReport>> {
    let guard = control.try_acquire()?;
    let pacing_ms = control.config.pacing_ms;
    let mut shutdown = control.shutdown.clone();

    Some(tokio::spawn(async move {
        let _guard = guard;
        let report = walk_subjects(&cache, generator.as_ref(), true, pacing_ms, &mut shutdown).await;
        info!(
            upgraded = report.upgraded,
            session_only = report.session_only,
            failed = report.failed,
            cancelled = report.cancelled,
            "asset regeneration finished"
        );
        report
    }))
}

/// Walk `Subject::ALL` in order, one step at a time, pausing between steps.
async fn walk_subjects(
    cache: &AssetCache,
    generator: &dyn ImageGenerator,
    force: bool,
    pacing_ms: u64,
    shutdown: &mut watch::Receiver<bool>,
) -> UpgradeReport {
    let mut report = UpgradeReport::default();
    for (i, subject) in Subject::ALL.into_iter().enumerate() {
        if i > 0 && !pause(pacing_ms, shutdown).await {
            report.cancelled = true;
            break;
        }
        if *shutdown.borrow() {
            report.cancelled = true;
            break;
        }
        tokio::select! {
            outcome = upgrade_subject(cache, generator, subject, force) => report.record(outcome),
            () = shutdown_signalled(shutdown) => {
                info!(subject = subject.slug(), "asset upgrade step abandoned on shutdown");
                report.cancelled = true;
                break;
            }
        }
    }
    report
}

/// Sleep `ms`. Returns `false` if shutdown was signalled first.
async fn pause(ms: u64, shutdown: &mut watch::Receiver<bool>) -> bool {
    if *shutdown.borrow() {
        return false;
    }
    tokio::select! {
        () = tokio::time::sleep(Duration::from_millis(ms)) => true,
        () = shutdown_signalled(shutdown) => false,
    }
}

/// Resolves once shutdown is `true`. Never resolves if the sender is gone.
async fn shutdown_signalled(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
#[path = "upgrade_test.rs"]
mod tests;
