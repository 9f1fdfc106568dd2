// Simulated playback engine
// Plays a fixed list of tracks in (optionally accelerated) real time

use crate::media_monitor::{PlaybackEvent, PlaybackSource, PlaybackState};
use crate::scrobbler::TrackMetadata;
use anyhow::{bail, Context, Result};
use std::str::FromStr;
use std::sync::mpsc::Sender;
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// One track in the play list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTrack {
    pub metadata: TrackMetadata,
    pub duration: Duration,
}

impl FromStr for PlannedTrack {
    type Err = anyhow::Error;

    /// Parse `Artist|Title|Album|Seconds`; the album may be empty
    fn from_str(s: &str) -> Result<Self> {
        let fields: Vec<&str> = s.split('|').map(str::trim).collect();
        let [artist, title, album, seconds] = fields.as_slice() else {
            bail!("expected Artist|Title|Album|Seconds, got {:?}", s);
        };

        let seconds: u64 = seconds
            .parse()
            .with_context(|| format!("invalid duration {:?}", seconds))?;

        Ok(Self {
            metadata: TrackMetadata {
                artist: artist.to_string(),
                title: title.to_string(),
                album: (!album.is_empty()).then(|| album.to_string()),
            },
            duration: Duration::from_secs(seconds),
        })
    }
}

/// Shared view of what the player has loaded
#[derive(Debug, Clone, Default)]
pub struct PlayerHandle {
    current: Arc<RwLock<Option<PlannedTrack>>>,
}

impl PlayerHandle {
    fn load(&self, track: Option<PlannedTrack>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = track;
    }
}

impl PlaybackSource for PlayerHandle {
    fn current_track(&self) -> Option<TrackMetadata> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|t| t.metadata.clone())
    }

    fn total_time(&self) -> Duration {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|t| t.duration)
            .unwrap_or_default()
    }
}

pub struct SimulatedPlayer {
    handle: PlayerHandle,
    tracks: Vec<PlannedTrack>,
    tick_interval: Duration,
}

impl SimulatedPlayer {
    /// `speed` scales playback: 2.0 plays a one-second tick every 500 ms
    pub fn new(tracks: Vec<PlannedTrack>, speed: f64) -> Self {
        let speed = if speed > 0.0 { speed } else { 1.0 };
        Self {
            handle: PlayerHandle::default(),
            tracks,
            tick_interval: Duration::from_secs_f64(1.0 / speed),
        }
    }

    pub fn handle(&self) -> PlayerHandle {
        self.handle.clone()
    }

    /// Play every track on a background thread, emitting one tick per
    /// played second with the elapsed position in milliseconds
    pub fn spawn<E>(self, events: Sender<E>) -> JoinHandle<()>
    where
        E: From<PlaybackEvent> + Send + 'static,
    {
        thread::spawn(move || {
            let emit = |event: PlaybackEvent| events.send(event.into()).is_ok();

            for track in self.tracks {
                log::info!(
                    "Playing {} - {} ({}s)",
                    track.metadata.artist,
                    track.metadata.title,
                    track.duration.as_secs()
                );
                let seconds = track.duration.as_secs();
                self.handle.load(Some(track));

                let started = emit(PlaybackEvent::StateChanged {
                    new: PlaybackState::Loading,
                    old: PlaybackState::Stopped,
                }) && emit(PlaybackEvent::StateChanged {
                    new: PlaybackState::Playing,
                    old: PlaybackState::Loading,
                });
                if !started {
                    return;
                }

                for second in 1..=seconds {
                    thread::sleep(self.tick_interval);
                    if !emit(PlaybackEvent::Tick(second * 1000)) {
                        return;
                    }
                }

                let ended = emit(PlaybackEvent::Finished)
                    && emit(PlaybackEvent::StateChanged {
                        new: PlaybackState::Stopped,
                        old: PlaybackState::Playing,
                    });
                if !ended {
                    return;
                }
            }

            self.handle.load(None);
        })
    }
}
