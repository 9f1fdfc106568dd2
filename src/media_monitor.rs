// Playback event adapter
// Turns player state changes and ticks into now-playing notifications and scrobbles

use crate::config::{AccountConfig, Config};
use crate::scrobbler::queue::{self, SubmissionOutcome, SubmissionQueue};
use crate::scrobbler::{
    Completion, EligibilityTracker, HandshakeError, HandshakeOutcome, RequestKind,
    SessionManager, SessionState, TrackMetadata, TrackSubmission, Transport,
};
use crate::text_cleanup::MetadataCleaner;
use std::time::Duration;

/// Player states as reported by the playback engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Loading,
    Stopped,
    Playing,
    Paused,
    Buffering,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    StateChanged {
        new: PlaybackState,
        old: PlaybackState,
    },
    /// Periodic progress tick carrying the elapsed position marker (ms)
    Tick(u64),
    /// The current track played to its end
    Finished,
}

/// Everything the host event loop delivers, in order, on one thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Playback(PlaybackEvent),
    Completion(Completion),
}

impl From<PlaybackEvent> for Event {
    fn from(event: PlaybackEvent) -> Self {
        Self::Playback(event)
    }
}

impl From<Completion> for Event {
    fn from(completion: Completion) -> Self {
        Self::Completion(completion)
    }
}

/// Read accessors exposed by the playback engine
pub trait PlaybackSource {
    /// Metadata of the loaded track, if any
    fn current_track(&self) -> Option<TrackMetadata>;

    /// Total length of the loaded track
    fn total_time(&self) -> Duration;
}

fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// The scrobbling client for one player instance.
///
/// Owns the session, the submission queue and the eligibility tracker. All
/// mutation happens through [`PlaybackScrobbler::handle`], called serially by
/// the host for playback events and request completions alike.
pub struct PlaybackScrobbler<P, T> {
    account: AccountConfig,
    source: P,
    transport: T,
    cleaner: MetadataCleaner,
    session: SessionManager,
    queue: SubmissionQueue,
    tracker: EligibilityTracker,
    handshake_error: Option<HandshakeError>,
    pending_now_playing: usize,
    clock: fn() -> i64,
}

impl<P: PlaybackSource, T: Transport> PlaybackScrobbler<P, T> {
    pub fn new(config: &Config, source: P, transport: T) -> Self {
        Self {
            account: config.account.clone(),
            source,
            transport,
            cleaner: MetadataCleaner::new(&config.cleanup),
            session: SessionManager::new(config.service.client_info()),
            queue: SubmissionQueue::new(),
            tracker: EligibilityTracker::new(),
            handshake_error: None,
            pending_now_playing: 0,
            clock: unix_now,
        }
    }

    /// Use `clock` for Unix timestamps instead of the system time
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    /// Log in if scrobbling is enabled
    pub fn start(&mut self) {
        if self.account.enabled {
            self.start_handshake();
        } else {
            log::info!("Scrobbling is disabled");
        }
    }

    pub fn handle(&mut self, event: Event) {
        match event {
            Event::Playback(event) => self.on_playback_event(event),
            Event::Completion(completion) => self.on_completion(completion),
        }
    }

    pub fn on_playback_event(&mut self, event: PlaybackEvent) {
        if !self.account.enabled {
            return;
        }

        match event {
            PlaybackEvent::StateChanged {
                new: PlaybackState::Playing,
                old: PlaybackState::Stopped | PlaybackState::Loading,
            } => self.track_started(),
            PlaybackEvent::StateChanged {
                new: PlaybackState::Stopped,
                ..
            }
            | PlaybackEvent::Finished => {
                if self.tracker.is_tracking() {
                    log::debug!("Playback ended before the track was eligible");
                }
                self.tracker.reset();
            }
            PlaybackEvent::StateChanged { .. } => {}
            PlaybackEvent::Tick(marker) => {
                if let Some(track) = self.tracker.on_tick(marker) {
                    self.enqueue(track);
                }
            }
        }
    }

    pub fn on_completion(&mut self, completion: Completion) {
        let Completion { id, kind, outcome } = completion;

        match kind {
            RequestKind::NowPlaying => {
                self.pending_now_playing = self.pending_now_playing.saturating_sub(1);
                match outcome {
                    Ok(body) if body.trim() == "OK" => log::debug!("Now playing accepted"),
                    Ok(body) => log::warn!("Now playing rejected: {}", body.trim()),
                    Err(e) => log::warn!("Now playing request failed: {}", e),
                }
            }
            RequestKind::Handshake => {
                if !self.account.enabled {
                    log::debug!("Scrobbling disabled, ignoring handshake reply {}", id);
                    return;
                }

                match self.session.on_handshake_response(id, outcome) {
                    HandshakeOutcome::Authenticated => {
                        self.handshake_error = None;
                        self.flush();
                    }
                    HandshakeOutcome::Rejected(e) => {
                        log::error!("Disabling scrobbling: {}", e);
                        self.account.enabled = false;
                        self.tracker.reset();
                        self.handshake_error = Some(e);
                    }
                    HandshakeOutcome::Unreachable(e) => {
                        self.handshake_error = Some(e);
                    }
                    HandshakeOutcome::Stale => {}
                }
            }
            RequestKind::Submission => {
                if !self.account.enabled {
                    log::debug!("Scrobbling disabled, ignoring submission reply {}", id);
                    return;
                }

                match self.queue.on_submission_response(id, outcome) {
                    SubmissionOutcome::Accepted(_) => self.flush(),
                    SubmissionOutcome::SessionExpired => self.start_handshake(),
                    SubmissionOutcome::Failed(_) | SubmissionOutcome::Stale => {}
                }
            }
        }
    }

    /// Turn scrobbling on and log in again. Retained entries are sent once
    /// the handshake succeeds.
    pub fn enable(&mut self) {
        if self.account.enabled {
            return;
        }

        log::info!("Scrobbling enabled");
        self.account.enabled = true;
        self.handshake_error = None;
        self.start_handshake();
    }

    /// Stop reacting to playback and replies. Queued entries are kept.
    pub fn disable(&mut self) {
        if !self.account.enabled {
            return;
        }

        log::info!("Scrobbling disabled, {} track(s) kept in queue", self.queue.len());
        self.account.enabled = false;
        self.tracker.reset();
        self.session.reset();
        self.queue.release_in_flight();
    }

    fn track_started(&mut self) {
        self.tracker.reset();

        let Some(metadata) = self.source.current_track() else {
            log::debug!("Playback started without track metadata");
            return;
        };

        let metadata = self.cleaner.clean_metadata(&metadata);
        let total = self.source.total_time();

        let Some(track) = TrackSubmission::new(&metadata, total, (self.clock)()) else {
            log::debug!(
                "Not scrobbling '{}' - '{}': artist and title are required",
                metadata.artist,
                metadata.title
            );
            return;
        };

        if !self.tracker.start(track.clone(), total) {
            return;
        }

        if queue::notify_now_playing(self.session.session(), &track, &mut self.transport).is_some()
        {
            self.pending_now_playing += 1;
        }
    }

    fn enqueue(&mut self, track: TrackSubmission) {
        self.queue.push(track);

        if self.session.is_authenticated() {
            self.flush();
        } else if !self.session.is_awaiting_token() {
            // Earlier handshake never got an answer; try again now there is work
            self.start_handshake();
        }
    }

    fn flush(&mut self) {
        self.queue
            .attempt_submission(self.session.session(), &mut self.transport);
    }

    fn start_handshake(&mut self) {
        self.session.start_handshake(
            &mut self.transport,
            &self.account.username,
            &self.account.password,
            (self.clock)(),
        );
    }

    pub fn is_enabled(&self) -> bool {
        self.account.enabled
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn session_state(&self) -> &SessionState {
        self.session.state()
    }

    pub fn is_tracking(&self) -> bool {
        self.tracker.is_tracking()
    }

    pub fn queue(&self) -> &SubmissionQueue {
        &self.queue
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Why the last handshake failed, if it did
    pub fn handshake_error(&self) -> Option<&HandshakeError> {
        self.handshake_error.as_ref()
    }

    /// Whether any request is still waiting for its completion
    pub fn has_pending_requests(&self) -> bool {
        self.session.is_awaiting_token() || self.queue.is_in_flight() || self.pending_now_playing > 0
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}
