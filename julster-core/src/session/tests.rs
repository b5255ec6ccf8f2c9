use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::advance;

use super::*;
use crate::catalog::{PlaylistRef, TrackId};
use crate::collaborators::{CatalogError, MockPlaybackService};

/// Records every outbound call so tests can count side effects.
#[derive(Default)]
struct Recorder {
    starts: Mutex<Vec<TrackId>>,
    stops: AtomicUsize,
    alerts: AtomicUsize,
    notices: Mutex<Vec<Notice>>,
    renders: AtomicUsize,
    fail_playback: AtomicBool,
}

impl Recorder {
    fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    fn alerts(&self) -> usize {
        self.alerts.load(Ordering::SeqCst)
    }

    fn starts(&self) -> Vec<TrackId> {
        self.starts.lock().unwrap().clone()
    }

    fn notice_kinds(&self) -> Vec<NoticeKind> {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .map(|notice| notice.kind)
            .collect()
    }
}

#[async_trait]
impl PlaybackService for Recorder {
    async fn start_playback(&self, track: &TrackId) -> std::result::Result<(), PlaybackError> {
        self.starts.lock().unwrap().push(track.clone());
        if self.fail_playback.load(Ordering::SeqCst) {
            return Err(PlaybackError::NoDevice(Duration::from_millis(6_000)));
        }
        Ok(())
    }

    async fn stop_playback(&self) -> std::result::Result<(), PlaybackError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Notifier for Recorder {
    fn notify(&self, notice: &Notice) {
        self.notices.lock().unwrap().push(notice.clone());
    }
}

impl RenderSurface for Recorder {
    fn render(&self, _snapshot: &RenderSnapshot) {
        self.renders.fetch_add(1, Ordering::SeqCst);
    }
}

impl AlertSink for Recorder {
    fn sound_alert(&self) {
        self.alerts.fetch_add(1, Ordering::SeqCst);
    }
}

/// Playback that takes a while to start, like a device wait.
struct SlowPlayback {
    recorder: Arc<Recorder>,
    delay: Duration,
}

#[async_trait]
impl PlaybackService for SlowPlayback {
    async fn start_playback(&self, track: &TrackId) -> std::result::Result<(), PlaybackError> {
        tokio::time::sleep(self.delay).await;
        self.recorder.start_playback(track).await
    }

    async fn stop_playback(&self) -> std::result::Result<(), PlaybackError> {
        self.recorder.stop_playback().await
    }
}

/// Static playlist and setup.
struct Table {
    categories: Vec<String>,
    playlist: Option<PlaylistRef>,
    tracks: Vec<Track>,
}

impl Table {
    fn new(categories: &[&str], tracks: usize) -> Self {
        Self {
            categories: categories.iter().map(|c| c.to_string()).collect(),
            playlist: Some(PlaylistRef::from_id("party")),
            tracks: (0..tracks).map(track).collect(),
        }
    }
}

#[async_trait]
impl TrackCatalog for Table {
    async fn load_tracks(
        &self,
        _playlist: &PlaylistRef,
    ) -> std::result::Result<Vec<Track>, CatalogError> {
        Ok(self.tracks.clone())
    }
}

impl ConfigurationSource for Table {
    fn categories(&self) -> Vec<String> {
        self.categories.clone()
    }

    fn playlist_reference(&self) -> Option<PlaylistRef> {
        self.playlist.clone()
    }
}

fn track(n: usize) -> Track {
    Track::new(
        TrackId::new(format!("spotify:track:{n}")),
        TrackMetadata {
            title: format!("Song {n}"),
            artists: vec![format!("Artist {n}")],
            ..Default::default()
        },
    )
}

fn services(table: Table, recorder: &Arc<Recorder>) -> Collaborators {
    let table = Arc::new(table);
    Collaborators {
        playback: recorder.clone(),
        catalog: table.clone(),
        settings: table,
        notifier: recorder.clone(),
        render: recorder.clone(),
        alert: recorder.clone(),
    }
}

async fn loaded(table: Table, recorder: &Arc<Recorder>) -> BingoSession {
    let mut session = BingoSession::builder(services(table, recorder))
        .rng(7)
        .build();
    session.load().await.unwrap();
    session
}

async fn settle() {
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
}

/// Session already in Playing, reached through the no-wheel path.
async fn playing(recorder: &Arc<Recorder>) -> BingoSession {
    let mut session = loaded(Table::new(&[], 5), recorder).await;
    let transition = session.handle(UserInput::Spin).await;
    assert_eq!(transition.to, RoundState::Playing);
    session
}

#[tokio::test(start_paused = true)]
async fn wheel_round_lands_on_chosen_category() {
    let recorder = Arc::new(Recorder::default());
    let categories = ["80s", "Movie", "One hit wonder", "Duet"];
    let mut session = loaded(Table::new(&categories, 3), &recorder).await;

    let transition = session.handle(UserInput::Spin).await;
    assert_eq!(transition.to, RoundState::Spinning);
    assert!(session.animator().is_animating());
    let chosen = session.chosen_segment().expect("spin was aimed");

    let spin = session.config().spin.duration();
    assert!(session.on_frame(Instant::now() + spin / 2).await.is_none());
    assert_eq!(session.state(), RoundState::Spinning);

    let done = session
        .on_frame(Instant::now() + spin)
        .await
        .expect("final frame completes the spin");
    assert_eq!(done.from, RoundState::Spinning);
    assert_eq!(done.to, RoundState::Playing);

    let snapshot = session.snapshot();
    assert_eq!(session.chosen_segment(), Some(chosen));
    let landed = wheel::resolve_landed_segment(snapshot.rotation, categories.len()).unwrap();
    assert_eq!(landed, chosen, "wheel must stop on the segment it was aimed at");
    assert_eq!(snapshot.chosen_category.as_deref(), Some(categories[chosen]));
    assert!(snapshot.rotation >= 3.0 * wheel::FULL_TURN);
    assert!(snapshot.track.is_some(), "track revealed once playing");
    assert_eq!(snapshot.remaining, 2);
    assert_eq!(recorder.starts().len(), 1);

    // Redundant frame after completion.
    assert!(session.on_frame(Instant::now() + spin * 2).await.is_none());
    assert_eq!(recorder.starts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn second_spin_does_not_restart_the_wheel() {
    let recorder = Arc::new(Recorder::default());
    let mut session = loaded(Table::new(&["a", "b", "c"], 3), &recorder).await;

    session.handle(UserInput::Spin).await;
    let handle = session.animator().handle();
    let target = session.animator().target();

    let again = session.handle(UserInput::Spin).await;
    assert!(again.is_ignored());
    assert_eq!(session.animator().handle(), handle);
    assert_eq!(session.animator().target(), target);

    let clicked = session.handle(UserInput::WheelClicked).await;
    assert!(clicked.is_ignored());
    assert_eq!(session.animator().handle(), handle);
}

#[tokio::test(start_paused = true)]
async fn illegal_inputs_are_no_ops() {
    let recorder = Arc::new(Recorder::default());
    let mut idle = loaded(Table::new(&[], 3), &recorder).await;
    assert!(idle.handle(UserInput::Pulse).await.is_ignored());
    assert!(idle.pulse().is_none());
    assert!(idle.handle(UserInput::Advance).await.is_ignored());

    let mut session = playing(&recorder).await;
    let remaining = session.remaining();
    assert!(session.handle(UserInput::Spin).await.is_ignored());
    assert_eq!(session.remaining(), remaining);
    assert_eq!(session.state(), RoundState::Playing);
}

#[tokio::test(start_paused = true)]
async fn empty_playlist_reports_exhaustion() {
    let recorder = Arc::new(Recorder::default());
    let mut session = loaded(Table::new(&[], 0), &recorder).await;
    assert_eq!(recorder.notice_kinds(), vec![NoticeKind::EmptyPlaylist]);

    let transition = session.handle(UserInput::Spin).await;
    assert_eq!(transition.to, RoundState::Idle);
    assert_eq!(session.state(), RoundState::Idle);
    assert!(recorder.notice_kinds().contains(&NoticeKind::Exhausted));
    assert!(recorder.starts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn wheel_spin_with_empty_pool_returns_to_idle() {
    let recorder = Arc::new(Recorder::default());
    let mut session = loaded(Table::new(&["a", "b"], 0), &recorder).await;

    session.handle(UserInput::Spin).await;
    assert_eq!(session.state(), RoundState::Spinning);

    let done = session.handle(UserInput::ResolveInterrupted).await;
    assert_eq!(done.to, RoundState::Idle);
    assert!(recorder.notice_kinds().contains(&NoticeKind::Exhausted));
    assert!(recorder.starts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn pool_runs_dry_without_repeats() {
    let recorder = Arc::new(Recorder::default());
    let mut session = loaded(Table::new(&[], 3), &recorder).await;

    for _ in 0..3 {
        assert_eq!(session.handle(UserInput::Spin).await.to, RoundState::Playing);
        session.handle(UserInput::Advance).await;
        session.handle(UserInput::NextRound).await;
    }
    assert_eq!(session.handle(UserInput::Spin).await.to, RoundState::Idle);

    let mut starts = recorder.starts();
    starts.sort();
    starts.dedup();
    assert_eq!(starts.len(), 3);
    assert!(recorder.notice_kinds().contains(&NoticeKind::Exhausted));
}

#[tokio::test(start_paused = true)]
async fn cancelled_pulse_stops_playback_once() {
    let recorder = Arc::new(Recorder::default());
    let mut session = playing(&recorder).await;

    assert_eq!(
        session.handle(UserInput::Pulse).await.to,
        RoundState::Pulsing
    );
    let pulse = session.pulse().cloned().expect("pulse running");

    advance(Duration::from_millis(10_000)).await;
    settle().await;
    assert_eq!(session.snapshot().pulse_phase, Some(PulsePhase::Warn));

    let ended = session.handle(UserInput::Advance).await;
    assert_eq!(ended.to, RoundState::Ended);
    assert_eq!(pulse.outcome(), Some(PulseOutcome::Aborted));
    assert_eq!(recorder.stops(), 1);

    advance(Duration::from_millis(10_000)).await;
    settle().await;
    session.process_pulse_events().await;
    assert_eq!(session.state(), RoundState::Ended);
    assert_eq!(recorder.stops(), 1);
    assert_eq!(recorder.alerts(), 0);

    assert_eq!(pulse.cancel(), None);
    assert!(session.handle(UserInput::Advance).await.is_ignored());
    session.handle(UserInput::Reset).await;
    assert_eq!(recorder.stops(), 1);
}

#[tokio::test(start_paused = true)]
async fn expired_pulse_stops_playback_and_rings_once() {
    let recorder = Arc::new(Recorder::default());
    let mut session = playing(&recorder).await;

    session.handle(UserInput::WheelClicked).await;
    assert_eq!(session.state(), RoundState::Pulsing);
    let pulse = session.pulse().cloned().expect("pulse running");

    advance(Duration::from_millis(15_000)).await;
    settle().await;
    session.process_pulse_events().await;
    assert_eq!(session.snapshot().pulse_phase, Some(PulsePhase::Critical));

    advance(Duration::from_millis(4_999)).await;
    settle().await;
    session.process_pulse_events().await;
    assert_eq!(session.state(), RoundState::Pulsing);
    assert_eq!(recorder.stops(), 0);

    advance(Duration::from_millis(1)).await;
    settle().await;
    session.process_pulse_events().await;
    assert_eq!(session.state(), RoundState::Ended);
    assert_eq!(pulse.outcome(), Some(PulseOutcome::Expired));
    assert_eq!(recorder.stops(), 1);
    assert_eq!(recorder.alerts(), 1);

    // Late cancel after expiry.
    assert!(session.handle(UserInput::Advance).await.is_ignored());
    assert_eq!(pulse.cancel(), None);
    assert_eq!(recorder.stops(), 1);
}

#[tokio::test(start_paused = true)]
async fn alert_on_cancel_is_configurable() {
    let recorder = Arc::new(Recorder::default());
    let mut config = SessionConfig::default();
    config.pulse.alert_on_cancel = true;
    let mut session = BingoSession::builder(services(Table::new(&[], 2), &recorder))
        .config(config)
        .rng(1)
        .build();
    session.load().await.unwrap();

    session.handle(UserInput::Spin).await;
    session.handle(UserInput::Pulse).await;
    session.handle(UserInput::Advance).await;
    assert_eq!(recorder.alerts(), 1);
    assert_eq!(recorder.stops(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_playback_still_reaches_playing() {
    let recorder = Arc::new(Recorder::default());
    recorder.fail_playback.store(true, Ordering::SeqCst);
    let mut session = loaded(Table::new(&[], 2), &recorder).await;

    let transition = session.handle(UserInput::Spin).await;
    assert_eq!(transition.to, RoundState::Playing);
    assert!(recorder.notice_kinds().contains(&NoticeKind::PlaybackFailed));
    assert_eq!(session.remaining(), 1, "no rollback into the pool");
    assert!(session.snapshot().track.is_some());
}

#[tokio::test(start_paused = true)]
async fn next_round_resets_rotation() {
    let recorder = Arc::new(Recorder::default());
    let mut session = loaded(Table::new(&["a", "b", "c"], 3), &recorder).await;

    session.handle(UserInput::Spin).await;
    session.handle(UserInput::ResolveInterrupted).await;
    assert_eq!(session.state(), RoundState::Playing);
    assert!(session.snapshot().rotation > 0.0);

    session.handle(UserInput::Advance).await;
    let reset = session.handle(UserInput::NextRound).await;
    assert_eq!(reset.to, RoundState::Idle);

    let snapshot = session.snapshot();
    assert_eq!(snapshot.rotation, 0.0);
    assert_eq!(snapshot.chosen_category, None);
    assert_eq!(snapshot.track, None);
    assert_eq!(snapshot.categories.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn reset_mid_spin_cancels_animation() {
    let recorder = Arc::new(Recorder::default());
    let mut session = loaded(Table::new(&["a", "b"], 2), &recorder).await;

    session.handle(UserInput::Spin).await;
    let reset = session.handle(UserInput::Reset).await;
    assert_eq!(reset.to, RoundState::Idle);
    assert!(!session.animator().is_animating());
    assert_eq!(recorder.stops(), 0);
    assert!(session
        .on_frame(Instant::now() + Duration::from_secs(10))
        .await
        .is_none());
}

#[tokio::test]
async fn missing_playlist_is_reported() {
    let recorder = Arc::new(Recorder::default());
    let mut table = Table::new(&[], 1);
    table.playlist = None;
    let mut session = BingoSession::builder(services(table, &recorder)).build();

    assert!(matches!(
        session.load().await,
        Err(BingoError::MissingPlaylist)
    ));
    assert_eq!(recorder.notice_kinds(), vec![NoticeKind::MissingPlaylist]);
}

#[tokio::test(start_paused = true)]
async fn mocked_playback_sees_one_stop_per_round() {
    let recorder = Arc::new(Recorder::default());
    let mut playback = MockPlaybackService::new();
    playback.expect_start_playback().times(1).returning(|_| Ok(()));
    playback.expect_stop_playback().times(1).returning(|| Ok(()));

    let mut services = services(Table::new(&[], 2), &recorder);
    services.playback = Arc::new(playback);
    let mut session = BingoSession::builder(services).rng(3).build();
    session.load().await.unwrap();

    session.handle(UserInput::Spin).await;
    session.handle(UserInput::Pulse).await;
    advance(Duration::from_millis(10_000)).await;
    session.handle(UserInput::Advance).await;
    session.handle(UserInput::Advance).await;
    advance(Duration::from_millis(20_000)).await;
    settle().await;
    session.process_pulse_events().await;
    session.handle(UserInput::Reset).await;
}

#[tokio::test(start_paused = true)]
async fn run_loop_plays_a_full_round() {
    let recorder = Arc::new(Recorder::default());
    let mut session = loaded(Table::new(&["a", "b", "c", "d"], 2), &recorder).await;
    let (tx, rx) = mpsc::channel(8);

    let driver = async move {
        tx.send(UserInput::WheelClicked).await.unwrap();
        tokio::time::sleep(Duration::from_secs(6)).await;
        tx.send(UserInput::WheelClicked).await.unwrap();
        tokio::time::sleep(Duration::from_secs(21)).await;
    };
    tokio::join!(session.run(rx), driver);

    assert_eq!(session.state(), RoundState::Ended);
    assert_eq!(recorder.starts().len(), 1);
    assert_eq!(recorder.stops(), 1);
    assert_eq!(recorder.alerts(), 1);
    assert!(session.snapshot().chosen_category.is_some());
    assert!(recorder.renders.load(Ordering::SeqCst) > 2);
}

#[tokio::test(start_paused = true)]
async fn clicks_during_playback_start_are_dropped() {
    let recorder = Arc::new(Recorder::default());
    let mut services = services(Table::new(&[], 3), &recorder);
    services.playback = Arc::new(SlowPlayback {
        recorder: recorder.clone(),
        delay: Duration::from_secs(3),
    });
    let mut session = BingoSession::builder(services).rng(5).build();
    session.load().await.unwrap();
    let (tx, rx) = mpsc::channel(8);

    let driver = async move {
        tx.send(UserInput::WheelClicked).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        tx.send(UserInput::WheelClicked).await.unwrap();
        tx.send(UserInput::Pulse).await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
    };
    tokio::join!(session.run(rx), driver);

    assert_eq!(session.state(), RoundState::Playing);
    assert!(session.pulse().is_none());
    assert_eq!(recorder.starts().len(), 1);
    assert_eq!(session.remaining(), 2);
}

#[tokio::test(start_paused = true)]
async fn queued_advance_after_expiry_still_rings() {
    let recorder = Arc::new(Recorder::default());
    let mut session = playing(&recorder).await;
    session.handle(UserInput::Pulse).await;
    let pulse = session.pulse().cloned().expect("pulse running");

    // The timer resolves, but its event has not been handled yet.
    advance(Duration::from_millis(20_000)).await;
    settle().await;
    assert_eq!(pulse.outcome(), Some(PulseOutcome::Expired));

    let ended = session.handle(UserInput::Advance).await;
    assert_eq!(ended.to, RoundState::Ended);
    assert!(ended.contains(RoundAction::SoundAlert));
    assert_eq!(recorder.alerts(), 1);
    assert_eq!(recorder.stops(), 1);

    session.process_pulse_events().await;
    assert_eq!(session.state(), RoundState::Ended);
    assert_eq!(recorder.alerts(), 1);
    assert_eq!(recorder.stops(), 1);
}
