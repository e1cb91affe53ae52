use super::*;
use crate::assets::key::{ProcessType, ProductType};
use crate::assets::placeholder;
use crate::assets::test_support::{data_uri_dimensions, memory_cache, memory_cache_with, noise_png};
use crate::assets::{AssetSource, MemoryAssetStore};
use crate::state::test_helpers::MockGenerator;

const STAMPING: Subject = Subject::Process(ProcessType::Stamping);
const MOLDING: Subject = Subject::Process(ProcessType::Molding);

fn immediate() -> UpgradeConfig {
    UpgradeConfig { enabled: true, start_delay_ms: 0, pacing_ms: 0 }
}

async fn join(handle: JoinHandle<UpgradeReport>) -> UpgradeReport {
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("task should stop promptly")
        .unwrap()
}

// =============================================================================
// upgrade_subject
// =============================================================================

#[tokio::test]
async fn placeholder_is_upgraded_to_normalized_generated_image() {
    let cache = memory_cache();
    let generator = MockGenerator::returning(noise_png(2000, 2000));

    let outcome = upgrade_subject(&cache, &generator, STAMPING, false).await;
    assert_eq!(outcome, StepOutcome::Upgraded);

    let resolved = cache.resolve(STAMPING).await;
    assert_eq!(resolved.source, AssetSource::Generated);
    let (width, _) = data_uri_dimensions(&resolved.payload);
    assert!(width <= cache.normalize_options().max_width);

    assert_eq!(cache.resolve(MOLDING).await.source, AssetSource::Placeholder);
    assert_eq!(generator.prompts(), vec![prompts::prompt(STAMPING).to_string()]);
}

#[tokio::test]
async fn generation_failure_keeps_placeholder_and_sends_nothing() {
    let cache = memory_cache();
    let mut rx = cache.subscribe();
    let generator = MockGenerator::failing();

    let outcome = upgrade_subject(&cache, &generator, STAMPING, false).await;
    assert_eq!(outcome, StepOutcome::Failed);

    let resolved = cache.resolve(STAMPING).await;
    assert_eq!(resolved.source, AssetSource::Placeholder);
    assert_eq!(resolved.payload, placeholder::placeholder(STAMPING));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn generated_subject_is_skipped_unless_forced() {
    let cache = memory_cache();
    let generator = MockGenerator::returning(noise_png(64, 64));
    assert_eq!(upgrade_subject(&cache, &generator, MOLDING, false).await, StepOutcome::Upgraded);

    assert_eq!(upgrade_subject(&cache, &generator, MOLDING, false).await, StepOutcome::Skipped);
    assert_eq!(generator.calls(), 1);

    assert_eq!(upgrade_subject(&cache, &generator, MOLDING, true).await, StepOutcome::Upgraded);
    assert_eq!(generator.calls(), 2);
}

#[tokio::test]
async fn bundled_default_is_upgraded() {
    let cache = memory_cache();
    cache.seed_defaults().await.unwrap();
    let generator = MockGenerator::returning(noise_png(64, 64));

    let subject = Subject::Product(ProductType::SensorTerminal);
    assert_eq!(upgrade_subject(&cache, &generator, subject, false).await, StepOutcome::Upgraded);
    assert_eq!(cache.resolve(subject).await.source, AssetSource::Generated);
}

#[tokio::test]
async fn full_store_yields_session_only() {
    let cache = memory_cache_with(std::sync::Arc::new(MemoryAssetStore::new(256)));
    let generator = MockGenerator::returning(noise_png(400, 400));

    assert_eq!(upgrade_subject(&cache, &generator, STAMPING, false).await, StepOutcome::SessionOnly);
    assert_eq!(cache.resolve(STAMPING).await.source, AssetSource::Session);
    // The session image counts as generated, so the pass does not repeat it.
    assert_eq!(upgrade_subject(&cache, &generator, STAMPING, false).await, StepOutcome::Skipped);
}

#[tokio::test]
async fn undecodable_generator_output_fails_step() {
    let cache = memory_cache();
    let generator = MockGenerator::returning(b"<html>quota exceeded</html>".to_vec());
    assert_eq!(upgrade_subject(&cache, &generator, STAMPING, false).await, StepOutcome::Failed);
    assert_eq!(cache.resolve(STAMPING).await.source, AssetSource::Placeholder);
}

// =============================================================================
// background pass
// =============================================================================

#[tokio::test]
async fn pass_upgrades_every_subject_then_converges() {
    let cache = memory_cache();
    let generator = Arc::new(MockGenerator::returning(noise_png(200, 200)));
    let (_tx, rx) = watch::channel(false);
    let control = UpgradeControl::new(immediate(), rx);

    let report = spawn_upgrade_task(cache.clone(), generator.clone(), control.clone())
        .await
        .unwrap();
    assert_eq!(report.upgraded, Subject::ALL.len());
    assert!(!report.cancelled);

    let second = spawn_upgrade_task(cache.clone(), generator.clone(), control).await.unwrap();
    assert_eq!(second.skipped, Subject::ALL.len());
    assert_eq!(generator.calls(), Subject::ALL.len());
}

#[tokio::test]
async fn failing_generator_does_not_abort_pass() {
    let cache = memory_cache();
    let generator = Arc::new(MockGenerator::failing());
    let (_tx, rx) = watch::channel(false);

    let report = spawn_upgrade_task(cache.clone(), generator.clone(), UpgradeControl::new(immediate(), rx))
        .await
        .unwrap();
    assert_eq!(report.failed, Subject::ALL.len());
    assert_eq!(generator.calls(), Subject::ALL.len());
    for subject in Subject::ALL {
        assert_eq!(cache.resolve(subject).await.source, AssetSource::Placeholder);
    }
}

#[tokio::test]
async fn shutdown_during_start_delay_cancels_pass() {
    let cache = memory_cache();
    let generator = Arc::new(MockGenerator::returning(noise_png(32, 32)));
    let (tx, rx) = watch::channel(false);
    let config = UpgradeConfig { enabled: true, start_delay_ms: 60_000, pacing_ms: 0 };

    let handle = spawn_upgrade_task(cache, generator.clone(), UpgradeControl::new(config, rx));
    tx.send(true).unwrap();

    let report = join(handle).await;
    assert!(report.cancelled);
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn shutdown_during_pacing_stops_between_subjects() {
    let cache = memory_cache();
    let generator = Arc::new(MockGenerator::returning(noise_png(32, 32)));
    let (tx, rx) = watch::channel(false);
    let config = UpgradeConfig { enabled: true, start_delay_ms: 0, pacing_ms: 60_000 };

    let mut events = cache.subscribe();
    let handle = spawn_upgrade_task(cache.clone(), generator.clone(), UpgradeControl::new(config, rx));
    // Wait for the first subject to land, then cancel during the pacing sleep.
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("first subject should be upgraded")
        .unwrap();
    tx.send(true).unwrap();

    let report = join(handle).await;
    assert!(report.cancelled);
    assert_eq!(report.upgraded, 1);
    assert_eq!(cache.resolve(STAMPING).await.source, AssetSource::Generated);
    assert_eq!(cache.resolve(MOLDING).await.source, AssetSource::Placeholder);
}

#[tokio::test]
async fn shutdown_abandons_step_waiting_on_generator() {
    let cache = memory_cache();
    let generator = Arc::new(MockGenerator::slow(noise_png(32, 32), Duration::from_secs(30)));
    let (tx, rx) = watch::channel(false);
    let mut events = cache.subscribe();

    let handle = spawn_upgrade_task(cache.clone(), generator.clone(), UpgradeControl::new(immediate(), rx));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(generator.calls(), 1);
    tx.send(true).unwrap();

    let report = tokio::time::timeout(Duration::from_secs(3), handle)
        .await
        .expect("shutdown should not wait for the generator")
        .unwrap();
    assert!(report.cancelled);
    assert_eq!(report.upgraded, 0);
    assert_eq!(cache.resolve(STAMPING).await.source, AssetSource::Placeholder);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn disabled_pass_does_nothing() {
    let cache = memory_cache();
    let generator = Arc::new(MockGenerator::returning(noise_png(32, 32)));
    let (_tx, rx) = watch::channel(false);
    let config = UpgradeConfig { enabled: false, ..immediate() };

    let report = spawn_upgrade_task(cache, generator.clone(), UpgradeControl::new(config, rx))
        .await
        .unwrap();
    assert_eq!(report, UpgradeReport::default());
    assert_eq!(generator.calls(), 0);
}

// =============================================================================
// regeneration
// =============================================================================

#[tokio::test]
async fn regeneration_forces_every_subject() {
    let cache = memory_cache();
    let generator = Arc::new(MockGenerator::returning(noise_png(48, 48)));
    let (_tx, rx) = watch::channel(false);
    let control = UpgradeControl::new(immediate(), rx);

    join(spawn_regeneration(cache.clone(), generator.clone(), &control).unwrap()).await;
    let report = join(spawn_regeneration(cache.clone(), generator.clone(), &control).unwrap()).await;
    assert_eq!(report.upgraded, Subject::ALL.len());
    assert_eq!(report.skipped, 0);
    assert_eq!(generator.calls(), 2 * Subject::ALL.len());
}

#[tokio::test]
async fn regeneration_is_refused_while_one_is_running() {
    let cache = memory_cache();
    let generator = Arc::new(MockGenerator::slow(noise_png(32, 32), Duration::from_millis(50)));
    let (_tx, rx) = watch::channel(false);
    let control = UpgradeControl::new(immediate(), rx);

    let running = spawn_regeneration(cache.clone(), generator.clone(), &control).unwrap();
    assert!(spawn_regeneration(cache.clone(), generator.clone(), &control).is_none());

    join(running).await;
    assert_eq!(generator.peak_in_flight(), 1);
    assert!(spawn_regeneration(cache, generator, &control).is_some());
}

#[tokio::test]
async fn boot_pass_waits_for_running_regeneration() {
    let cache = memory_cache();
    let generator = Arc::new(MockGenerator::slow(noise_png(32, 32), Duration::from_millis(30)));
    let (_tx, rx) = watch::channel(false);
    let control = UpgradeControl::new(immediate(), rx);

    let regeneration = spawn_regeneration(cache.clone(), generator.clone(), &control).unwrap();
    let boot = spawn_upgrade_task(cache.clone(), generator.clone(), control);

    let regenerated = join(regeneration).await;
    let booted = join(boot).await;
    assert_eq!(regenerated.upgraded, Subject::ALL.len());
    // Everything is generated by the time the boot pass gets the gate.
    assert_eq!(booted.skipped, Subject::ALL.len());
    assert_eq!(generator.peak_in_flight(), 1);
    assert_eq!(generator.calls(), Subject::ALL.len());
}

#[tokio::test]
async fn shutdown_while_waiting_for_gate_cancels_boot_pass() {
    let cache = memory_cache();
    let generator = Arc::new(MockGenerator::slow(noise_png(32, 32), Duration::from_secs(30)));
    let (tx, rx) = watch::channel(false);
    let control = UpgradeControl::new(immediate(), rx);

    let regeneration = spawn_regeneration(cache.clone(), generator.clone(), &control).unwrap();
    let boot = spawn_upgrade_task(cache, generator.clone(), control);
    tokio::time::sleep(Duration::from_millis(50)).await;
    tx.send(true).unwrap();

    assert!(join(boot).await.cancelled);
    assert!(join(regeneration).await.cancelled);
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn regeneration_is_paced_between_subjects() {
    let cache = memory_cache();
    let generator = Arc::new(MockGenerator::returning(noise_png(16, 16)));
    let (_tx, rx) = watch::channel(false);
    let control = UpgradeControl::new(UpgradeConfig { enabled: true, start_delay_ms: 0, pacing_ms: 40 }, rx);

    let started = std::time::Instant::now();
    let report = join(spawn_regeneration(cache, generator, &control).unwrap()).await;
    assert_eq!(report.upgraded, Subject::ALL.len());
    let gaps = u32::try_from(Subject::ALL.len() - 1).unwrap();
    assert!(started.elapsed() >= Duration::from_millis(40) * gaps);
}
