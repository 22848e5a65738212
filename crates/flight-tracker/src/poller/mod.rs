// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Timer-driven, single-flight polling loop.
//!
//! The loop runs in a background task that owns the [`Reconciler`]. Each
//! tick spawns one snapshot fetch; ticks that arrive while that fetch is
//! still outstanding are skipped. Commands are handled between fetches and
//! every resulting batch of mutations is delivered through [`Poller::recv`].
//!
//! Image and trail lookups for a selected flight run in a separate task so a
//! slow lookup never holds up polling, commands or shutdown.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::bookmarks::{BookmarkStore, StoreError};
use crate::reconciler::{Bookmarks, Command, Effect, Reconciler, ReconcilerConfig};
use crate::render::Mutation;
use crate::source::{FlightSnapshot, FlightSource, FlightState, ImageLookup};

/// Default time between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Shortest accepted poll interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration for the polling loop.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Time between polls.
    pub interval: Duration,
    /// Initial reconciler settings.
    pub reconciler: ReconcilerConfig,
    /// Channel buffer size for commands and mutation batches.
    pub buffer_size: usize,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            reconciler: ReconcilerConfig::default(),
            buffer_size: 64,
        }
    }
}

/// Handle to a running polling loop.
///
/// Dropping the handle shuts the loop down.
pub struct Poller {
    update_rx: mpsc::Receiver<Vec<Mutation>>,
    command_tx: mpsc::Sender<Command>,
    interval_tx: watch::Sender<Duration>,
    cancel_token: CancellationToken,
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("interval", &*self.interval_tx.borrow())
            .field("cancel_token", &self.cancel_token)
            .finish_non_exhaustive()
    }
}

impl Poller {
    /// Spawn the polling loop.
    ///
    /// Bookmarks are loaded from `store` before the first poll. A file that
    /// could not be parsed has already been moved aside by the store; any other
    /// load failure disables persisting for the session so the stored data is
    /// never overwritten. Either way the user is notified.
    #[must_use]
    pub fn spawn(
        config: PollerConfig,
        source: Arc<dyn FlightSource>,
        images: Arc<dyn ImageLookup>,
        store: Box<dyn BookmarkStore>,
    ) -> Self {
        let (update_tx, update_rx) = mpsc::channel(config.buffer_size);
        let (command_tx, command_rx) = mpsc::channel(config.buffer_size);
        let (interval_tx, interval_rx) = watch::channel(clamp_interval(config.interval));
        let cancel_token = CancellationToken::new();

        let mut startup_notice = None;
        let mut persist_blocked = false;
        let bookmarks = match store.load() {
            Ok(bookmarks) => bookmarks,
            Err(e @ StoreError::MovedAside { .. }) => {
                warn!("Could not load saved flights: {}", e);
                startup_notice = Some(format!("Saved flights could not be read: {e}"));
                Bookmarks::new()
            }
            Err(e) => {
                error!("Could not load saved flights, saving disabled: {}", e);
                startup_notice = Some(format!(
                    "Saved flights could not be read, new saves will not be written: {e}"
                ));
                persist_blocked = true;
                Bookmarks::new()
            }
        };

        let poll_loop = PollLoop {
            reconciler: Reconciler::new(config.reconciler, bookmarks),
            source,
            images,
            store,
            persist_blocked,
            startup_notice,
            update_tx,
            in_flight: None,
            details: None,
        };

        let task_cancel = cancel_token.clone();
        tokio::spawn(async move {
            poll_loop.run(command_rx, interval_rx, task_cancel).await;
        });

        Self {
            update_rx,
            command_tx,
            interval_tx,
            cancel_token,
        }
    }

    /// Receive the next batch of mutations.
    ///
    /// Returns `None` once the loop has stopped.
    pub async fn recv(&mut self) -> Option<Vec<Mutation>> {
        self.update_rx.recv().await
    }

    /// Queue a user command. Returns `false` if the loop has stopped.
    pub async fn send(&self, command: Command) -> bool {
        self.command_tx.send(command).await.is_ok()
    }

    /// Change the poll interval.
    ///
    /// The next poll happens one full interval from now. A fetch already in
    /// flight is not cancelled.
    pub fn set_interval(&self, interval: Duration) {
        self.interval_tx.send_replace(clamp_interval(interval));
    }

    /// Current poll interval.
    #[must_use]
    pub fn current_interval(&self) -> Duration {
        *self.interval_tx.borrow()
    }

    /// Stop the loop.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

fn clamp_interval(interval: Duration) -> Duration {
    interval.max(MIN_POLL_INTERVAL)
}

fn ticker(start: Instant, period: Duration) -> Interval {
    let mut ticker = interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

async fn wait_for<T>(task: &mut Option<JoinHandle<T>>) -> Result<T, JoinError> {
    match task {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

struct PollLoop {
    reconciler: Reconciler,
    source: Arc<dyn FlightSource>,
    images: Arc<dyn ImageLookup>,
    store: Box<dyn BookmarkStore>,
    persist_blocked: bool,
    startup_notice: Option<String>,
    update_tx: mpsc::Sender<Vec<Mutation>>,
    in_flight: Option<JoinHandle<FlightSnapshot>>,
    /// Detail lookup for the flight id it was started for.
    details: Option<JoinHandle<(String, Vec<Mutation>)>>,
}

impl PollLoop {
    async fn run(
        mut self,
        mut command_rx: mpsc::Receiver<Command>,
        mut interval_rx: watch::Receiver<Duration>,
        cancel_token: CancellationToken,
    ) {
        let mut first = vec![Mutation::RenderBookmarkList(self.reconciler.bookmark_list())];
        if let Some(notice) = self.startup_notice.take() {
            first.push(Mutation::Notify(notice));
        }
        if !self.emit(first).await {
            return;
        }

        let period = *interval_rx.borrow_and_update();
        info!("Polling every {} seconds", period.as_secs());
        let mut ticks = ticker(Instant::now(), period);

        loop {
            tokio::select! {
                () = cancel_token.cancelled() => {
                    info!("Poller cancelled");
                    if let Some(handle) = self.in_flight.take() {
                        handle.abort();
                    }
                    if let Some(handle) = self.details.take() {
                        handle.abort();
                    }
                    return;
                }

                _ = ticks.tick() => self.start_poll(),

                result = wait_for(&mut self.in_flight), if self.in_flight.is_some() => {
                    self.in_flight = None;
                    let snapshot = result.unwrap_or_else(|e| {
                        error!("Poll task failed: {}", e);
                        FlightSnapshot::default()
                    });
                    let mutations = self.reconciler.ingest(snapshot);
                    if !self.emit(mutations).await {
                        return;
                    }
                }

                result = wait_for(&mut self.details), if self.details.is_some() => {
                    self.details = None;
                    match result {
                        Ok((id, mutations)) if self.reconciler.selected_id() == Some(id.as_str()) => {
                            if !self.emit(mutations).await {
                                return;
                            }
                        }
                        Ok((id, _)) => debug!("Dropping details for {}, no longer selected", id),
                        Err(e) if e.is_cancelled() => {}
                        Err(e) => error!("Detail lookup failed: {}", e),
                    }
                }

                command = command_rx.recv() => {
                    let Some(command) = command else {
                        info!("Command channel closed");
                        return;
                    };
                    if !self.handle_command(command).await {
                        return;
                    }
                }

                changed = interval_rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    let period = *interval_rx.borrow_and_update();
                    info!("Poll interval changed to {} seconds", period.as_secs());
                    ticks = ticker(Instant::now() + period, period);
                }
            }
        }
    }

    fn start_poll(&mut self) {
        if self.in_flight.is_some() {
            debug!("Previous poll still in flight, skipping");
            return;
        }

        let source = Arc::clone(&self.source);
        self.in_flight = Some(tokio::spawn(async move { source.fetch_snapshot().await }));
    }

    async fn handle_command(&mut self, command: Command) -> bool {
        let response = self.reconciler.handle(command);
        if !self.emit(response.mutations).await {
            return false;
        }

        for effect in response.effects {
            match effect {
                Effect::LoadDetails(flight) => self.start_details(flight),
                Effect::PersistBookmarks if self.persist_blocked => {
                    warn!("Not persisting saved flights, the stored file could not be read");
                    let notice = Mutation::Notify(
                        "Saved flights file could not be read at startup, not overwriting it"
                            .to_string(),
                    );
                    if !self.emit(vec![notice]).await {
                        return false;
                    }
                }
                Effect::PersistBookmarks => {
                    if let Err(e) = self.store.persist(self.reconciler.bookmarks()) {
                        error!("Failed to persist saved flights: {}", e);
                        let notice = Mutation::Notify(format!("Could not save bookmarks: {e}"));
                        if !self.emit(vec![notice]).await {
                            return false;
                        }
                    }
                }
                Effect::PollNow => self.start_poll(),
            }
        }

        true
    }

    /// Look up image and trail in the background, replacing any older lookup.
    fn start_details(&mut self, flight: FlightState) {
        if let Some(previous) = self.details.take() {
            previous.abort();
        }

        let source = Arc::clone(&self.source);
        let images = Arc::clone(&self.images);
        self.details = Some(tokio::spawn(async move {
            let (image_url, trail) =
                tokio::join!(images.fetch_image(&flight.id), source.fetch_trail(&flight.id));

            let id = flight.id.clone();
            let mut mutations = vec![Mutation::SetInfoPanel { flight, image_url }];
            if !trail.is_empty() {
                mutations.push(Mutation::DrawTrail(trail));
            }
            (id, mutations)
        }));
    }

    /// Deliver a batch; `false` means the receiver is gone.
    async fn emit(&self, mutations: Vec<Mutation>) -> bool {
        if mutations.is_empty() {
            return true;
        }
        self.update_tx.send(mutations).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::bookmarks::{JsonFileStore, MemoryStore};
    use crate::region::RegionFilter;
    use crate::source::{FetchError, FlightState, ParseError};

    /// Replays queued snapshots, repeating the last one; fails when empty.
    #[derive(Default)]
    struct FakeSource {
        snapshots: Mutex<VecDeque<FlightSnapshot>>,
        calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
    }

    impl FakeSource {
        fn with(snapshots: Vec<FlightSnapshot>) -> Self {
            Self {
                snapshots: Mutex::new(snapshots.into()),
                ..Self::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FlightSource for FakeSource {
        async fn try_fetch_snapshot(&self) -> Result<FlightSnapshot, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }

            let mut snapshots = self.snapshots.lock().unwrap();
            let next = if snapshots.len() > 1 {
                snapshots.pop_front()
            } else {
                snapshots.front().cloned()
            };
            next.ok_or_else(|| ParseError::InvalidFormat("offline".to_string()).into())
        }

        async fn try_fetch_trail(&self, _id: &str) -> Result<Vec<(f64, f64)>, FetchError> {
            Ok(vec![(50.0, -1.0), (51.0, 0.0)])
        }
    }

    struct FakeImages;

    #[async_trait]
    impl ImageLookup for FakeImages {
        async fn try_fetch_image(&self, id: &str) -> Result<Option<String>, FetchError> {
            Ok(Some(format!("https://img.example/{id}.jpg")))
        }
    }

    /// Image lookup that never answers.
    struct HangingImages;

    #[async_trait]
    impl ImageLookup for HangingImages {
        async fn try_fetch_image(&self, _id: &str) -> Result<Option<String>, FetchError> {
            std::future::pending().await
        }
    }

    /// Image lookup that waits on a gate for one flight id.
    struct GatedImages {
        gated_id: &'static str,
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl ImageLookup for GatedImages {
        async fn try_fetch_image(&self, id: &str) -> Result<Option<String>, FetchError> {
            if id == self.gated_id {
                self.gate.notified().await;
            }
            Ok(None)
        }
    }

    /// Store whose file exists but cannot be read.
    struct UnreadableStore {
        persists: Arc<AtomicUsize>,
    }

    impl BookmarkStore for UnreadableStore {
        fn load(&self) -> Result<Bookmarks, StoreError> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into())
        }

        fn persist(&self, _bookmarks: &Bookmarks) -> Result<(), StoreError> {
            self.persists.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn europe_snapshot() -> FlightSnapshot {
        FlightSnapshot::new(
            None,
            vec![
                FlightState::new("A1", 51.0, 0.0).with_callsign("BAW1"),
                FlightState::new("B2", -80.0, 0.0),
            ],
        )
    }

    fn europe_config(interval: Duration) -> PollerConfig {
        PollerConfig {
            interval,
            reconciler: ReconcilerConfig {
                filter: RegionFilter::Europe,
                ..ReconcilerConfig::default()
            },
            ..PollerConfig::default()
        }
    }

    fn spawn(source: Arc<FakeSource>, store: MemoryStore, interval: Duration) -> Poller {
        Poller::spawn(
            europe_config(interval),
            source,
            Arc::new(FakeImages),
            Box::new(store),
        )
    }

    #[tokio::test]
    async fn test_first_poll_creates_markers() {
        let source = Arc::new(FakeSource::with(vec![europe_snapshot()]));
        let mut poller = spawn(source, MemoryStore::new(), Duration::from_secs(60));

        assert_eq!(
            poller.recv().await,
            Some(vec![Mutation::RenderBookmarkList(Vec::new())])
        );
        assert_eq!(
            poller.recv().await,
            Some(vec![
                Mutation::CreateMarker {
                    id: "A1".to_string(),
                    lat: 51.0,
                    lon: 0.0
                },
                Mutation::SetCount(1),
                Mutation::SetFilterLabel("Europe"),
            ])
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_renders_empty_poll() {
        let source = Arc::new(FakeSource::default());
        let mut poller = spawn(source, MemoryStore::new(), Duration::from_secs(60));

        poller.recv().await;
        assert_eq!(
            poller.recv().await,
            Some(vec![Mutation::SetCount(0), Mutation::SetFilterLabel("Europe")])
        );
    }

    #[tokio::test]
    async fn test_select_loads_image_and_trail() {
        let source = Arc::new(FakeSource::with(vec![europe_snapshot()]));
        let mut poller = spawn(source, MemoryStore::new(), Duration::from_secs(60));
        poller.recv().await;
        poller.recv().await;

        assert!(poller.send(Command::SelectFlight("A1".to_string())).await);
        assert_eq!(poller.recv().await, Some(vec![Mutation::ClearTrail]));
        assert_eq!(
            poller.recv().await,
            Some(vec![
                Mutation::SetInfoPanel {
                    flight: FlightState::new("A1", 51.0, 0.0).with_callsign("BAW1"),
                    image_url: Some("https://img.example/A1.jpg".to_string()),
                },
                Mutation::DrawTrail(vec![(50.0, -1.0), (51.0, 0.0)]),
            ])
        );
    }

    #[tokio::test]
    async fn test_saved_bookmark_reaches_store() {
        let store = MemoryStore::new();
        let source = Arc::new(FakeSource::with(vec![europe_snapshot()]));
        let mut poller = spawn(source, store.clone(), Duration::from_secs(60));
        poller.recv().await;
        poller.recv().await;

        poller.send(Command::SelectFlight("A1".to_string())).await;
        poller.send(Command::SaveBookmark).await;
        poller.send(Command::SearchQuery("baw".to_string())).await;

        // Commands run in order, so the pan proves the save was persisted.
        loop {
            let batch = poller.recv().await.unwrap();
            if batch == vec![Mutation::PanTo { lat: 51.0, lon: 0.0 }] {
                break;
            }
        }

        let saved = store.load().unwrap();
        assert_eq!(
            saved.get("A1"),
            Some(&FlightState::new("A1", 51.0, 0.0).with_callsign("BAW1"))
        );
    }

    #[tokio::test]
    async fn test_bookmarks_loaded_at_start() {
        let store = MemoryStore::new();
        let mut saved = Bookmarks::new();
        saved.insert("Z9".to_string(), FlightState::new("Z9", 10.0, 10.0));
        store.persist(&saved).unwrap();

        let mut poller = spawn(
            Arc::new(FakeSource::default()),
            store,
            Duration::from_secs(60),
        );

        assert_eq!(
            poller.recv().await,
            Some(vec![Mutation::RenderBookmarkList(vec![FlightState::new(
                "Z9", 10.0, 10.0
            )])])
        );
    }

    #[tokio::test]
    async fn test_change_filter_polls_immediately() {
        let source = Arc::new(FakeSource::with(vec![europe_snapshot()]));
        let mut poller = spawn(Arc::clone(&source), MemoryStore::new(), Duration::from_secs(3600));
        poller.recv().await;
        poller.recv().await;

        poller.send(Command::ChangeFilter(RegionFilter::None)).await;
        assert_eq!(
            poller.recv().await,
            Some(vec![Mutation::SetFilterLabel("All Regions")])
        );
        assert_eq!(
            poller.recv().await,
            Some(vec![
                Mutation::CreateMarker {
                    id: "B2".to_string(),
                    lat: -80.0,
                    lon: 0.0
                },
                Mutation::SetCount(2),
                Mutation::SetFilterLabel("All Regions"),
            ])
        );
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetch_skips_ticks() {
        let gate = Arc::new(Notify::new());
        let source = Arc::new(FakeSource {
            gate: Some(Arc::clone(&gate)),
            ..FakeSource::with(vec![europe_snapshot()])
        });
        let mut poller = spawn(Arc::clone(&source), MemoryStore::new(), Duration::from_secs(1));
        poller.recv().await;

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(source.calls(), 1);

        gate.notify_one();
        let batch = poller.recv().await.unwrap();
        assert!(batch.contains(&Mutation::SetCount(1)));
    }

    #[tokio::test]
    async fn test_interval_is_clamped() {
        let poller = spawn(
            Arc::new(FakeSource::default()),
            MemoryStore::new(),
            Duration::from_secs(15),
        );
        assert_eq!(poller.current_interval(), Duration::from_secs(15));

        poller.set_interval(Duration::from_secs(30));
        assert_eq!(poller.current_interval(), Duration::from_secs(30));

        poller.set_interval(Duration::ZERO);
        assert_eq!(poller.current_interval(), MIN_POLL_INTERVAL);
    }

    #[tokio::test]
    async fn test_shutdown_ends_stream() {
        let mut poller = spawn(
            Arc::new(FakeSource::default()),
            MemoryStore::new(),
            Duration::from_secs(60),
        );
        poller.shutdown();

        while poller.recv().await.is_some() {}
        assert!(!poller.send(Command::Deselect).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_image_lookup_does_not_stall_polling() {
        let source = Arc::new(FakeSource::with(vec![europe_snapshot()]));
        let mut poller = Poller::spawn(
            europe_config(Duration::from_secs(1)),
            Arc::clone(&source) as Arc<dyn FlightSource>,
            Arc::new(HangingImages),
            Box::new(MemoryStore::new()),
        );
        poller.recv().await;
        poller.recv().await;

        poller.send(Command::SelectFlight("A1".to_string())).await;
        assert_eq!(poller.recv().await, Some(vec![Mutation::ClearTrail]));
        let polls_before = source.calls();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(source.calls() >= polls_before + 20, "polls: {}", source.calls());

        // Commands still get through while the lookup hangs
        assert!(poller.send(Command::Deselect).await);

        poller.shutdown();
        while poller.recv().await.is_some() {}
    }

    #[tokio::test]
    async fn test_details_for_deselected_flight_are_dropped() {
        let gate = Arc::new(Notify::new());
        let source = Arc::new(FakeSource::with(vec![FlightSnapshot::new(
            None,
            vec![
                FlightState::new("A1", 51.0, 0.0),
                FlightState::new("C3", 52.0, 1.0),
            ],
        )]));
        let mut poller = Poller::spawn(
            europe_config(Duration::from_secs(60)),
            source,
            Arc::new(GatedImages {
                gated_id: "A1",
                gate: Arc::clone(&gate),
            }),
            Box::new(MemoryStore::new()),
        );
        poller.recv().await;
        poller.recv().await;

        poller.send(Command::SelectFlight("A1".to_string())).await;
        assert_eq!(poller.recv().await, Some(vec![Mutation::ClearTrail]));
        poller.send(Command::Deselect).await;
        assert_eq!(poller.recv().await, Some(vec![Mutation::ClearInfoPanel]));
        gate.notify_one();

        poller.send(Command::SelectFlight("C3".to_string())).await;
        assert_eq!(poller.recv().await, Some(vec![Mutation::ClearTrail]));
        let batch = poller.recv().await.unwrap();
        assert!(matches!(
            &batch[0],
            Mutation::SetInfoPanel { flight, .. } if flight.id == "C3"
        ));
    }

    #[tokio::test]
    async fn test_corrupt_bookmark_file_survives_save() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::in_dir(dir.path());
        let old = r#"{"old1": {"id": "old1", "lat": 1.0, "lon": 2.0},}"#;
        std::fs::write(store.path(), old).unwrap();

        let mut poller = Poller::spawn(
            europe_config(Duration::from_secs(60)),
            Arc::new(FakeSource::with(vec![europe_snapshot()])),
            Arc::new(FakeImages),
            Box::new(store.clone()),
        );

        let first = poller.recv().await.unwrap();
        assert_eq!(first[0], Mutation::RenderBookmarkList(Vec::new()));
        assert!(matches!(&first[1], Mutation::Notify(_)));
        poller.recv().await;

        poller.send(Command::SelectFlight("A1".to_string())).await;
        poller.send(Command::SaveBookmark).await;
        poller.send(Command::SearchQuery("baw".to_string())).await;
        loop {
            let batch = poller.recv().await.unwrap();
            if batch == vec![Mutation::PanTo { lat: 51.0, lon: 0.0 }] {
                break;
            }
        }

        let backup = dir.path().join("saved_flights.json.corrupt");
        assert_eq!(std::fs::read_to_string(backup).unwrap(), old);
        assert!(store.load().unwrap().contains_key("A1"));
    }

    #[tokio::test]
    async fn test_unreadable_store_is_never_overwritten() {
        let persists = Arc::new(AtomicUsize::new(0));
        let mut poller = Poller::spawn(
            europe_config(Duration::from_secs(60)),
            Arc::new(FakeSource::with(vec![europe_snapshot()])),
            Arc::new(FakeImages),
            Box::new(UnreadableStore {
                persists: Arc::clone(&persists),
            }),
        );

        let first = poller.recv().await.unwrap();
        assert!(matches!(&first[..], [Mutation::RenderBookmarkList(_), Mutation::Notify(_)]));
        poller.recv().await;

        poller.send(Command::SelectFlight("A1".to_string())).await;
        poller.send(Command::SaveBookmark).await;
        poller.send(Command::SearchQuery("baw".to_string())).await;

        let mut notices = Vec::new();
        loop {
            let batch = poller.recv().await.unwrap();
            if batch == vec![Mutation::PanTo { lat: 51.0, lon: 0.0 }] {
                break;
            }
            for mutation in batch {
                if let Mutation::Notify(message) = mutation {
                    notices.push(message);
                }
            }
        }

        assert_eq!(persists.load(Ordering::SeqCst), 0);
        assert!(notices.iter().any(|n| n.contains("not overwriting")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_change_keeps_in_flight_fetch() {
        let gate = Arc::new(Notify::new());
        let source = Arc::new(FakeSource {
            gate: Some(Arc::clone(&gate)),
            ..FakeSource::with(vec![europe_snapshot()])
        });
        let mut poller = spawn(Arc::clone(&source), MemoryStore::new(), Duration::from_secs(10));
        poller.recv().await;
        while source.calls() == 0 {
            tokio::task::yield_now().await;
        }

        poller.set_interval(Duration::from_secs(3));
        gate.notify_one();
        let batch = poller.recv().await.unwrap();
        assert!(batch.contains(&Mutation::SetCount(1)));
        assert_eq!(source.calls(), 1);

        // Next poll lands one new period after the change
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(source.calls(), 1);
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(source.calls(), 2);
    }
}
