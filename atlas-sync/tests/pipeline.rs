use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use atlas_catalog::{
    CatalogEntity, FailureKind, LocationContext, MediaUpdate, OutcomeStatus, SyncRun,
};
use atlas_places::{
    LocationBias, MediaProbe, MediaReference, PlaceCandidate, PlaceMedia, PlaceProvider,
    ProviderError,
};
use atlas_sync::async_util::run_with_events;
use atlas_sync::updater::persist_media;
use atlas_sync::{
    CatalogStore, RunSummary, SelectionScope, SqliteCatalog, StopReason, StoreError, SyncError,
    SyncEvent, SyncMode, SyncOptions, reconcile,
};
use tokio::sync::mpsc;

// ── Fake provider ───────────────────────────────────────────────────────────

const PHOTO_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/place/photo";
const CDN: &str = "https://lh3.googleusercontent.com/p/";

#[derive(Debug, Clone)]
enum Details {
    Photos(Vec<&'static str>),
    NoPhotos,
    Gone,
    Fail,
}

/// Scripted provider. Searches match when the query starts with a known
/// name; details responses are consumed in order, the last one repeating.
#[derive(Default)]
struct FakeProvider {
    places: Vec<(&'static str, &'static str)>,
    details: Mutex<HashMap<String, VecDeque<Details>>>,
    broken_tokens: HashSet<&'static str>,
    search_fails: bool,
    /// Searches never complete.
    search_hangs: bool,
    /// HEAD requests fail at the network level.
    head_request_fails: bool,
    /// The photo endpoint serves the image itself instead of redirecting.
    no_redirect: bool,
    cancel_on_search: Option<Arc<AtomicBool>>,
    calls: Mutex<Vec<String>>,
}

impl FakeProvider {
    fn new() -> Self {
        Self::default()
    }

    fn place(mut self, name: &'static str, place_id: &'static str) -> Self {
        self.places.push((name, place_id));
        self
    }

    fn details(self, place_id: &str, script: Vec<Details>) -> Self {
        self.details
            .lock()
            .unwrap()
            .insert(place_id.to_string(), script.into());
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl PlaceProvider for FakeProvider {
    async fn text_search(
        &self,
        query: &str,
        _bias: Option<LocationBias>,
    ) -> Result<Vec<PlaceCandidate>, ProviderError> {
        self.record(format!("search:{query}"));
        if let Some(cancel) = &self.cancel_on_search {
            cancel.store(true, Ordering::Relaxed);
        }
        if self.search_hangs {
            futures::future::pending::<()>().await;
        }
        if self.search_fails {
            return Err(ProviderError::ServerError {
                status: 503,
                message: "unavailable".into(),
            });
        }
        Ok(self
            .places
            .iter()
            .filter(|(name, _)| query.starts_with(name))
            .map(|(name, id)| PlaceCandidate {
                place_id: id.to_string(),
                name: Some(name.to_string()),
                rating: Some(4.6),
                has_media: None,
            })
            .collect())
    }

    async fn place_media(&self, place_id: &str) -> Result<PlaceMedia, ProviderError> {
        self.record(format!("details:{place_id}"));
        let step = {
            let mut scripts = self.details.lock().unwrap();
            match scripts.get_mut(place_id) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };
        match step {
            Some(Details::Photos(tokens)) => Ok(PlaceMedia {
                references: tokens
                    .into_iter()
                    .map(|t| MediaReference {
                        token: t.to_string(),
                        width: Some(1600),
                        height: Some(1200),
                        attributions: vec![],
                    })
                    .collect(),
            }),
            Some(Details::NoPhotos) => Ok(PlaceMedia::default()),
            Some(Details::Fail) => Err(ProviderError::Timeout),
            Some(Details::Gone) | None => Err(ProviderError::PlaceNotFound(place_id.to_string())),
        }
    }

    fn media_url(&self, reference: &str) -> String {
        format!("{PHOTO_ENDPOINT}?maxwidth=1600&photo_reference={reference}&key=test-key")
    }

    async fn probe_media(&self, url: &str) -> Result<MediaProbe, ProviderError> {
        self.record(format!("probe:{url}"));
        if self.head_request_fails {
            return Err(ProviderError::Timeout);
        }
        if self.broken_tokens.iter().any(|t| url.contains(t)) {
            return Ok(MediaProbe {
                final_url: url.to_string(),
                status: 404,
                content_type: Some("text/html".into()),
            });
        }
        // The photo endpoint redirects to the CDN.
        let final_url = match url.split("photo_reference=").nth(1) {
            Some(rest) if !self.no_redirect => format!("{CDN}{}", rest.split('&').next().unwrap_or_default()),
            _ => url.to_string(),
        };
        Ok(MediaProbe {
            final_url,
            status: 200,
            content_type: Some("image/jpeg".into()),
        })
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────────

fn entity(id: &str, name: &str) -> CatalogEntity {
    CatalogEntity::new(id, name)
}

fn store_with(entities: &[CatalogEntity]) -> SqliteCatalog {
    let store = SqliteCatalog::open_memory().unwrap();
    for e in entities {
        atlas_db::upsert_entity(store.connection(), e).unwrap();
    }
    store
}

fn stored(store: &SqliteCatalog, id: &str) -> CatalogEntity {
    atlas_db::find_entity(store.connection(), id).unwrap().unwrap()
}

async fn run<S: CatalogStore>(
    store: &S,
    provider: &FakeProvider,
    options: &SyncOptions,
) -> RunSummary {
    let (tx, _rx) = mpsc::unbounded_channel();
    reconcile(store, provider, options, tx).await.unwrap()
}

fn outcome<'a>(summary: &'a RunSummary, id: &str) -> &'a atlas_catalog::ReconciliationOutcome {
    summary.outcomes.iter().find(|o| o.entity_id == id).unwrap()
}

// ── Scenarios ───────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn missing_media_is_fixed() {
    let mut rc = entity("rc", "Red Canyon Overlook");
    rc.location = LocationContext {
        sub_region: Some("Wayne County".into()),
        region: Some("Utah".into()),
        ..Default::default()
    };
    let store = store_with(&[rc]);
    let provider = FakeProvider::new()
        .place("Red Canyon Overlook", "ChIJ-rc")
        .details("ChIJ-rc", vec![Details::Photos(vec!["ref-rc", "ref-rc-2"])]);

    let summary = run(&store, &provider, &SyncOptions::default()).await;

    assert_eq!((summary.total, summary.fixed, summary.failed), (1, 1, 0));
    assert_eq!(summary.stop_reason, StopReason::NoFailures);
    let o = outcome(&summary, "rc");
    assert_eq!(o.status, OutcomeStatus::Fixed);
    assert_eq!(o.media_url.as_deref(), Some("https://lh3.googleusercontent.com/p/ref-rc"));
    assert_eq!(o.provider_place_id.as_deref(), Some("ChIJ-rc"));

    let saved = stored(&store, "rc");
    assert_eq!(saved.media_url, o.media_url);
    assert_eq!(saved.provider_place_id.as_deref(), Some("ChIJ-rc"));
    assert_eq!(saved.provider_rating, Some(4.6));
    assert!(saved.media_updated_at.is_some());

    assert_eq!(
        provider.calls()[0],
        "search:Red Canyon Overlook, Wayne County, Utah, USA"
    );
    assert_eq!(provider.count("probe:"), 1);
}

#[tokio::test(start_paused = true)]
async fn placeholder_media_is_replaced() {
    let mut e = entity("mesa", "Mesa Arch");
    e.media_url = Some("https://placehold.co/600x400?text=Mesa".into());
    let store = store_with(&[e]);
    let provider = FakeProvider::new()
        .place("Mesa Arch", "ChIJ-mesa")
        .details("ChIJ-mesa", vec![Details::Photos(vec!["ref-mesa"])]);

    let summary = run(&store, &provider, &SyncOptions::default()).await;

    assert_eq!(outcome(&summary, "mesa").status, OutcomeStatus::Fixed);
    assert_eq!(
        stored(&store, "mesa").media_url.as_deref(),
        Some("https://lh3.googleusercontent.com/p/ref-mesa")
    );
}

#[tokio::test(start_paused = true)]
async fn no_search_match_fails_without_write() {
    let store = store_with(&[entity("ghost", "Ghost Town")]);
    let provider = FakeProvider::new();

    let summary = run(&store, &provider, &SyncOptions::default()).await;

    let o = outcome(&summary, "ghost");
    assert_eq!(o.status, OutcomeStatus::Failed);
    assert_eq!(o.error_kind, Some(FailureKind::NotFound));
    assert!(o.error_detail.as_deref().unwrap().contains("No place matched"));

    let saved = stored(&store, "ghost");
    assert!(saved.media_url.is_none());
    assert!(saved.provider_place_id.is_none());
    assert!(saved.media_updated_at.is_none());
    assert_eq!(provider.count("details:"), 0);
}

#[tokio::test(start_paused = true)]
async fn place_without_photos_caches_place_id() {
    let store = store_with(&[entity("dune", "Coral Pink Dunes")]);
    let provider = FakeProvider::new()
        .place("Coral Pink Dunes", "ChIJ-dune")
        .details("ChIJ-dune", vec![Details::NoPhotos]);

    let summary = run(&store, &provider, &SyncOptions::default()).await;

    let o = outcome(&summary, "dune");
    assert_eq!(o.error_kind, Some(FailureKind::NoMedia));
    assert_eq!(o.provider_place_id.as_deref(), Some("ChIJ-dune"));

    let saved = stored(&store, "dune");
    assert_eq!(saved.provider_place_id.as_deref(), Some("ChIJ-dune"));
    assert!(saved.media_url.is_none());

    // The second pass reuses the cached id instead of searching again.
    assert_eq!(summary.passes.len(), 2);
    assert_eq!(provider.count("search:"), 1);
    assert_eq!(provider.count("details:"), 2);
}

#[tokio::test(start_paused = true)]
async fn two_passes_without_fixes_stop() {
    let store = store_with(&[entity("a", "Nowhere A"), entity("b", "Nowhere B")]);
    let provider = FakeProvider::new();
    let options = SyncOptions {
        max_passes: 5,
        success_threshold: 0.9,
        ..Default::default()
    };

    let summary = run(&store, &provider, &options).await;

    assert_eq!(summary.passes.len(), 2);
    assert_eq!(summary.stop_reason, StopReason::Stalled);
    assert_eq!(summary.failed, 2);
}

// ── Properties ──────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn validated_trusted_media_needs_no_provider_calls() {
    let mut e = entity("arch", "Delicate Arch");
    e.media_url = Some(format!("{CDN}existing"));
    e.provider_place_id = Some("ChIJ-arch".into());
    e.media_updated_at = Some("2025-05-01T00:00:00Z".into());
    let store = store_with(&[e.clone()]);
    let provider = FakeProvider::new();

    let mut options = SyncOptions::default();
    options.selection.scope = SelectionScope::All;
    let summary = run(&store, &provider, &options).await;

    assert_eq!(outcome(&summary, "arch").status, OutcomeStatus::Valid);
    assert!(provider.calls().is_empty());
    assert_eq!(stored(&store, "arch"), e);
}

#[tokio::test(start_paused = true)]
async fn revalidation_probes_but_does_not_search() {
    let mut e = entity("arch", "Delicate Arch");
    e.media_url = Some(format!("{CDN}existing"));
    e.media_updated_at = Some("2025-05-01T00:00:00Z".into());
    let store = store_with(&[e]);
    let provider = FakeProvider::new();

    let mut options = SyncOptions::default();
    options.selection.scope = SelectionScope::All;
    options.revalidate_trusted = true;
    let summary = run(&store, &provider, &options).await;

    assert_eq!(outcome(&summary, "arch").status, OutcomeStatus::Valid);
    assert_eq!(provider.calls(), vec![format!("probe:{CDN}existing")]);
}

#[tokio::test(start_paused = true)]
async fn trusted_host_only_selected_when_needed() {
    let mut ok = entity("ok", "Angels Landing");
    ok.media_url = Some(format!("{CDN}angels"));
    let store = store_with(&[ok, entity("missing", "Kolob Arch")]);
    let provider = FakeProvider::new();

    let summary = run(&store, &provider, &SyncOptions::default()).await;

    assert_eq!(summary.total, 1);
    assert_eq!(summary.outcomes[0].entity_id, "missing");
}

#[tokio::test(start_paused = true)]
async fn working_media_on_other_host_is_kept() {
    let mut e = entity("u", "Goblin Valley");
    e.media_url = Some("https://images.example.org/goblin.jpg".into());
    let store = store_with(&[e.clone()]);
    let provider = FakeProvider::new()
        .place("Goblin Valley", "place-g")
        .details("place-g", vec![Details::Photos(vec!["tok-g"])]);

    let summary = run(&store, &provider, &SyncOptions::default()).await;

    let o = outcome(&summary, "u");
    assert_eq!(o.status, OutcomeStatus::Valid);
    assert_eq!(o.media_url.as_deref(), Some("https://images.example.org/goblin.jpg"));
    assert_eq!(
        provider.calls(),
        vec!["probe:https://images.example.org/goblin.jpg".to_string()]
    );
    assert_eq!(stored(&store, "u"), e);
}

#[tokio::test(start_paused = true)]
async fn broken_media_on_other_host_is_repaired() {
    let mut e = entity("u", "Goblin Valley");
    e.media_url = Some("https://images.example.org/dead-link.jpg".into());
    let store = store_with(&[e]);
    let provider = FakeProvider {
        broken_tokens: HashSet::from(["dead-link"]),
        ..FakeProvider::new()
            .place("Goblin Valley", "place-g")
            .details("place-g", vec![Details::Photos(vec!["tok-g"])])
    };

    let summary = run(&store, &provider, &SyncOptions::default()).await;

    assert_eq!(outcome(&summary, "u").status, OutcomeStatus::Fixed);
    assert_eq!(provider.count("probe:"), 2);
    assert_eq!(provider.count("search:"), 1);
    assert_eq!(
        stored(&store, "u").media_url.as_deref(),
        Some("https://lh3.googleusercontent.com/p/tok-g")
    );
}

#[tokio::test(start_paused = true)]
async fn validation_network_error_is_invalid() {
    let store = store_with(&[entity("x", "Fisher Towers")]);
    let provider = FakeProvider {
        head_request_fails: true,
        ..FakeProvider::new()
            .place("Fisher Towers", "ChIJ-ft")
            .details("ChIJ-ft", vec![Details::Photos(vec!["ref-ft"])])
    };

    let mut options = SyncOptions::default();
    options.max_passes = 1;
    let summary = run(&store, &provider, &options).await;

    let o = outcome(&summary, "x");
    assert_eq!(o.status, OutcomeStatus::Failed);
    assert_eq!(o.error_kind, Some(FailureKind::Invalid));
    let saved = stored(&store, "x");
    assert!(saved.media_url.is_none());
    assert!(saved.media_updated_at.is_none());
}

#[tokio::test(start_paused = true)]
async fn stuck_provider_times_out_as_transport() {
    let store = store_with(&[entity("slow", "Slow Rock"), entity("next", "Next Rock")]);
    let provider = FakeProvider {
        search_hangs: true,
        ..FakeProvider::new()
    };

    let mut options = SyncOptions::default();
    options.max_passes = 1;
    let summary = run(&store, &provider, &options).await;

    assert_eq!(summary.total, 2);
    for o in &summary.outcomes {
        assert_eq!(o.status, OutcomeStatus::Failed);
        assert_eq!(o.error_kind, Some(FailureKind::Transport));
        assert!(o.error_detail.as_deref().unwrap().contains("Timed out after 90s"));
    }
    assert_eq!(summary.stop_reason, StopReason::MaxPasses);
}

#[tokio::test(start_paused = true)]
async fn built_url_is_stored_without_key() {
    let store = store_with(&[entity("d", "Dead Horse Point")]);
    let provider = FakeProvider {
        no_redirect: true,
        ..FakeProvider::new()
            .place("Dead Horse Point", "ChIJ-dh")
            .details("ChIJ-dh", vec![Details::Photos(vec!["ref-dh"])])
    };

    let summary = run(&store, &provider, &SyncOptions::default()).await;

    let expected = format!("{PHOTO_ENDPOINT}?maxwidth=1600&photo_reference=ref-dh");
    let o = outcome(&summary, "d");
    assert_eq!(o.status, OutcomeStatus::Fixed);
    assert_eq!(o.media_url.as_deref(), Some(expected.as_str()));
    let saved = stored(&store, "d");
    assert_eq!(saved.media_url.as_deref(), Some(expected.as_str()));
    assert!(!summary_json(&summary).contains("test-key"));
}

fn summary_json(summary: &RunSummary) -> String {
    serde_json::to_string(summary).unwrap()
}

#[tokio::test(start_paused = true)]
async fn candidates_shrink_to_previous_failures() {
    let store = store_with(&[
        entity("a", "Alpha Falls"),
        entity("b", "Bravo Peak"),
        entity("c", "Charlie Cave"),
    ]);
    let provider = FakeProvider::new()
        .place("Alpha Falls", "ChIJ-a")
        .place("Bravo Peak", "ChIJ-b")
        .details("ChIJ-a", vec![Details::Photos(vec!["ref-a"])])
        .details("ChIJ-b", vec![Details::Fail, Details::Photos(vec!["ref-b"])]);
    let options = SyncOptions {
        max_passes: 4,
        ..Default::default()
    };

    let summary = run(&store, &provider, &options).await;

    assert!(summary.passes.len() >= 2);
    for pair in summary.passes.windows(2) {
        assert_eq!(pair[1].candidate_ids, pair[0].failed_ids);
    }
    assert_eq!(summary.passes[0].candidate_ids, ["a", "b", "c"]);
    assert_eq!(summary.passes[1].candidate_ids, ["b", "c"]);

    let b = outcome(&summary, "b");
    assert_eq!((b.status, b.pass), (OutcomeStatus::Fixed, 2));
    assert_eq!(outcome(&summary, "c").error_kind, Some(FailureKind::NotFound));
    assert_eq!(summary.total, 3);
    assert_eq!(summary.fixed, 2);
}

#[tokio::test(start_paused = true)]
async fn always_failing_provider_terminates() {
    let store = store_with(&[entity("a", "Alpha"), entity("b", "Bravo")]);
    let provider = FakeProvider {
        search_fails: true,
        ..Default::default()
    };
    let options = SyncOptions {
        max_passes: 3,
        max_stalled_passes: 10,
        ..Default::default()
    };

    let summary = run(&store, &provider, &options).await;

    assert_eq!(summary.passes.len(), 3);
    assert_eq!(summary.stop_reason, StopReason::MaxPasses);
    assert!(summary
        .outcomes
        .iter()
        .all(|o| o.error_kind == Some(FailureKind::Transport)));
    assert_eq!(provider.count("search:"), 6);
}

#[tokio::test(start_paused = true)]
async fn threshold_stops_early() {
    let store = store_with(&[
        entity("a", "Alpha"),
        entity("b", "Bravo"),
        entity("c", "Charlie"),
        entity("d", "Delta"),
    ]);
    let provider = FakeProvider::new()
        .place("Alpha", "p-a")
        .place("Bravo", "p-b")
        .place("Charlie", "p-c")
        .details("p-a", vec![Details::Photos(vec!["r-a"])])
        .details("p-b", vec![Details::Photos(vec!["r-b"])])
        .details("p-c", vec![Details::Photos(vec!["r-c"])]);
    let options = SyncOptions {
        success_threshold: 0.75,
        ..Default::default()
    };

    let summary = run(&store, &provider, &options).await;

    assert_eq!(summary.stop_reason, StopReason::ThresholdReached);
    assert_eq!(summary.passes.len(), 1);
    assert_eq!(summary.success_rate, 0.75);
}

#[tokio::test(start_paused = true)]
async fn unvalidated_media_is_never_persisted() {
    let store = store_with(&[entity("x", "Broken Bow")]);
    let provider = FakeProvider {
        broken_tokens: HashSet::from(["ref-x"]),
        ..FakeProvider::new()
            .place("Broken Bow", "ChIJ-x")
            .details("ChIJ-x", vec![Details::Photos(vec!["ref-x"])])
    };

    let summary = run(&store, &provider, &SyncOptions::default()).await;

    let o = outcome(&summary, "x");
    assert_eq!(o.error_kind, Some(FailureKind::Invalid));
    assert!(o.error_detail.as_deref().unwrap().contains("404"));
    let saved = stored(&store, "x");
    assert!(saved.media_url.is_none());
    // The place itself resolved, so its id is kept for the next run.
    assert_eq!(saved.provider_place_id.as_deref(), Some("ChIJ-x"));
}

#[tokio::test(start_paused = true)]
async fn stale_cached_place_is_replaced() {
    let mut e = entity("old", "Goblin Valley");
    e.provider_place_id = Some("ChIJ-retired".into());
    let store = store_with(&[e]);
    let provider = FakeProvider::new()
        .place("Goblin Valley", "ChIJ-current")
        .details("ChIJ-retired", vec![Details::Gone])
        .details("ChIJ-current", vec![Details::Photos(vec!["ref-goblin"])]);

    let summary = run(&store, &provider, &SyncOptions::default()).await;

    let o = outcome(&summary, "old");
    assert_eq!(o.status, OutcomeStatus::Fixed);
    assert_eq!(o.provider_place_id.as_deref(), Some("ChIJ-current"));
    assert_eq!(
        stored(&store, "old").provider_place_id.as_deref(),
        Some("ChIJ-current")
    );
    assert_eq!(
        provider.calls()[..3],
        [
            "details:ChIJ-retired".to_string(),
            "search:Goblin Valley, USA".to_string(),
            "details:ChIJ-current".to_string(),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn cancellation_keeps_every_entity() {
    let cancel = Arc::new(AtomicBool::new(false));
    let store = store_with(&[entity("a", "Alpha"), entity("b", "Bravo"), entity("c", "Charlie")]);
    let provider = FakeProvider {
        cancel_on_search: Some(cancel.clone()),
        ..Default::default()
    };
    let options = SyncOptions {
        cancel,
        ..Default::default()
    };

    let summary = run(&store, &provider, &options).await;

    assert_eq!(summary.stop_reason, StopReason::Cancelled);
    assert_eq!(summary.passes.len(), 1);
    assert_eq!(summary.total, 3);
    assert_eq!(outcome(&summary, "a").error_kind, Some(FailureKind::NotFound));
    assert_eq!(outcome(&summary, "b").error_kind, Some(FailureKind::Cancelled));
    assert_eq!(outcome(&summary, "c").error_kind, Some(FailureKind::Cancelled));
    assert_eq!(provider.count("search:"), 1);
}

#[tokio::test(start_paused = true)]
async fn circuit_breaker_skips_rest_of_pass() {
    let entities: Vec<CatalogEntity> = (0..20)
        .map(|i| entity(&format!("e{i:02}"), &format!("Entity {i:02}")))
        .collect();
    let store = store_with(&entities);
    let provider = FakeProvider {
        search_fails: true,
        ..Default::default()
    };
    let options = SyncOptions {
        max_passes: 1,
        ..Default::default()
    };

    let summary = run(&store, &provider, &options).await;

    assert_eq!(provider.count("search:"), 15);
    assert_eq!(summary.failed, 20);
    let skipped = summary
        .outcomes
        .iter()
        .filter(|o| o.error_detail.as_deref().unwrap_or("").contains("circuit breaker"))
        .count();
    assert_eq!(skipped, 5);
}

#[tokio::test(start_paused = true)]
async fn concurrent_workers_process_each_entity_once() {
    let entities: Vec<CatalogEntity> = (0..12)
        .map(|i| entity(&format!("w{i:02}"), &format!("Worker Site {i:02}")))
        .collect();
    let store = store_with(&entities);
    let mut provider = FakeProvider::new();
    for e in &entities {
        let name: &'static str = Box::leak(e.name.clone().into_boxed_str());
        let place: &'static str = Box::leak(format!("p-{}", e.id).into_boxed_str());
        provider = provider
            .place(name, place)
            .details(place, vec![Details::Photos(vec!["shared-ref"])]);
    }
    let options = SyncOptions {
        workers: 4,
        ..Default::default()
    };

    let summary = run(&store, &provider, &options).await;

    assert_eq!(summary.fixed, 12);
    let ids: HashSet<&str> = summary.outcomes.iter().map(|o| o.entity_id.as_str()).collect();
    assert_eq!(ids.len(), 12);
    assert_eq!(provider.count("search:"), 12);
}

#[tokio::test(start_paused = true)]
async fn audit_reports_without_writing() {
    let mut good = entity("good", "Good Arch");
    good.media_url = Some(format!("{CDN}good"));
    let mut broken = entity("broken", "Broken Arch");
    broken.media_url = Some(format!("{CDN}gone-ref"));
    let missing = entity("missing", "Missing Arch");
    let store = store_with(&[good.clone(), broken.clone(), missing.clone()]);
    let provider = FakeProvider {
        broken_tokens: HashSet::from(["gone-ref"]),
        ..Default::default()
    };

    let mut options = SyncOptions {
        mode: SyncMode::Audit,
        max_passes: 5,
        ..Default::default()
    };
    options.selection.scope = SelectionScope::All;
    let summary = run(&store, &provider, &options).await;

    assert_eq!((summary.valid, summary.failed), (1, 2));
    assert_eq!(summary.passes.len(), 1);
    assert_eq!(provider.count("search:"), 0);
    assert_eq!(provider.count("details:"), 0);
    assert_eq!(stored(&store, "good"), good);
    assert_eq!(stored(&store, "broken"), broken);
    assert_eq!(stored(&store, "missing"), missing);

    let runs = atlas_db::list_sync_runs(store.connection(), None).unwrap();
    assert_eq!(runs.len(), 1);
    assert!(runs[0].dry_run);
}

#[tokio::test(start_paused = true)]
async fn run_history_is_recorded() {
    let store = store_with(&[entity("a", "Alpha")]);
    let provider = FakeProvider::new()
        .place("Alpha", "p-a")
        .details("p-a", vec![Details::Photos(vec!["r-a"])]);

    run(&store, &provider, &SyncOptions::default()).await;

    let runs = atlas_db::list_sync_runs(store.connection(), None).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!((runs[0].total, runs[0].fixed, runs[0].passes), (1, 1, 1));
    assert_eq!(runs[0].stop_reason, "no_failures");
    assert!(!runs[0].dry_run);
}

#[tokio::test(start_paused = true)]
async fn empty_catalog_finishes_cleanly() {
    let store = store_with(&[]);
    let summary = run(&store, &FakeProvider::new(), &SyncOptions::default()).await;
    assert_eq!(summary.stop_reason, StopReason::NoCandidates);
    assert_eq!(summary.total, 0);
    assert!(summary.passes.is_empty());
}

#[tokio::test(start_paused = true)]
async fn invalid_options_are_rejected() {
    let store = store_with(&[entity("a", "Alpha")]);
    let options = SyncOptions {
        batch_size: 0,
        ..Default::default()
    };
    let (tx, _rx) = mpsc::unbounded_channel();
    let result = reconcile(&store, &FakeProvider::new(), &options, tx).await;
    assert!(matches!(result, Err(SyncError::InvalidOptions(_))));
}

#[tokio::test(start_paused = true)]
async fn events_cover_every_entity() {
    let store = store_with(&[entity("a", "Alpha"), entity("b", "Bravo")]);
    let provider = FakeProvider::new()
        .place("Alpha", "p-a")
        .details("p-a", vec![Details::Photos(vec!["r-a"])]);
    let options = SyncOptions {
        max_passes: 1,
        ..Default::default()
    };

    let (tx, rx) = mpsc::unbounded_channel();
    let mut finished = Vec::new();
    let mut done = false;
    let summary = run_with_events(reconcile(&store, &provider, &options, tx), rx, |event| {
        match event {
            SyncEvent::EntityFinished { outcome, .. } => finished.push(outcome.entity_id),
            SyncEvent::Done { .. } => done = true,
            _ => {}
        }
    })
    .await
    .unwrap();

    finished.sort();
    assert_eq!(finished, ["a", "b"]);
    assert!(done);
    assert_eq!(summary.total, 2);
}

// ── Entity updater ──────────────────────────────────────────────────────────

/// Store whose media writes fail a set number of times first.
struct FlakyStore {
    inner: SqliteCatalog,
    failures_left: AtomicU32,
}

impl CatalogStore for FlakyStore {
    fn load_entities(&self) -> Result<Vec<CatalogEntity>, StoreError> {
        self.inner.load_entities()
    }

    fn update_media(&self, update: &MediaUpdate) -> Result<(), StoreError> {
        if self.failures_left.load(Ordering::Relaxed) > 0 {
            self.failures_left.fetch_sub(1, Ordering::Relaxed);
            return Err(StoreError::Other("database is locked".into()));
        }
        self.inner.update_media(update)
    }

    fn cache_place_id(&self, entity_id: &str, place_id: Option<&str>) -> Result<(), StoreError> {
        self.inner.cache_place_id(entity_id, place_id)
    }

    fn record_run(&self, run: &SyncRun) -> Result<i64, StoreError> {
        self.inner.record_run(run)
    }
}

fn flaky(failures: u32) -> FlakyStore {
    FlakyStore {
        inner: store_with(&[entity("a", "Alpha")]),
        failures_left: AtomicU32::new(failures),
    }
}

#[tokio::test(start_paused = true)]
async fn persistence_retries_then_succeeds() {
    let store = flaky(2);
    let provider = FakeProvider::new()
        .place("Alpha", "p-a")
        .details("p-a", vec![Details::Photos(vec!["r-a"])]);

    let summary = run(&store, &provider, &SyncOptions::default()).await;

    assert_eq!(outcome(&summary, "a").status, OutcomeStatus::Fixed);
    assert!(stored(&store.inner, "a").media_url.is_some());
}

#[tokio::test(start_paused = true)]
async fn persistence_failure_is_entity_local() {
    let store = flaky(100);
    let provider = FakeProvider::new()
        .place("Alpha", "p-a")
        .details("p-a", vec![Details::Photos(vec!["r-a"])]);
    let options = SyncOptions {
        max_passes: 1,
        ..Default::default()
    };

    let summary = run(&store, &provider, &options).await;

    let o = outcome(&summary, "a");
    assert_eq!(o.error_kind, Some(FailureKind::Persistence));
    assert!(o.error_detail.as_deref().unwrap().contains("3 attempt"));
    assert!(stored(&store.inner, "a").media_url.is_none());
}

#[tokio::test]
async fn repeated_update_is_idempotent() {
    let store = store_with(&[entity("a", "Alpha")]);
    let update = MediaUpdate {
        entity_id: "a".into(),
        media_url: format!("{CDN}alpha"),
        provider_place_id: "p-a".into(),
        provider_rating: Some(4.2),
        updated_at: "2026-03-01T12:00:00Z".into(),
    };

    persist_media(&store, &update, 3, Duration::ZERO).await.unwrap();
    let first = stored(&store, "a");
    persist_media(&store, &update, 3, Duration::ZERO).await.unwrap();
    let second = stored(&store, "a");

    assert_eq!(first, second);
    assert_eq!(second.media_url, Some(update.media_url));
    assert_eq!(second.media_updated_at.as_deref(), Some("2026-03-01T12:00:00Z"));
}
