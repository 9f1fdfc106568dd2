//! Audioscrobbler 1.2.1 submission client.
//!
//! The protocol core lives in [`scrobbler`]: handshake token, session state
//! machine, eligibility tracking and the submission queue. [`media_monitor`]
//! wires it to a playback engine; [`transport`] performs the HTTP requests.

pub mod config;
pub mod login;
pub mod media_monitor;
pub mod player;
pub mod scrobbler;
pub mod text_cleanup;
pub mod transport;

pub use config::Config;
pub use media_monitor::{Event, PlaybackEvent, PlaybackScrobbler, PlaybackSource, PlaybackState};
