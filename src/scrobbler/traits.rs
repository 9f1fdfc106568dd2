// Common types shared by the session, the queue and the transport

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Track metadata as reported by the playback engine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackMetadata {
    pub artist: String,
    pub title: String,
    pub album: Option<String>,
}

/// A track that may be submitted.
///
/// Artist and title are guaranteed non-empty. The value never changes after
/// construction; the queue only reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackSubmission {
    artist: String,
    title: String,
    album: String,
    duration: u64,
    started_at: i64,
}

impl TrackSubmission {
    /// Build a submission from player metadata.
    ///
    /// Returns `None` when artist or title is empty. `total` is rounded to the
    /// nearest whole second for the `l` field.
    pub fn new(metadata: &TrackMetadata, total: Duration, started_at: i64) -> Option<Self> {
        if metadata.artist.is_empty() || metadata.title.is_empty() {
            return None;
        }

        let millis = total.as_millis() as u64;

        Some(Self {
            artist: metadata.artist.clone(),
            title: metadata.title.clone(),
            album: metadata.album.clone().unwrap_or_default(),
            duration: (millis + 500) / 1000,
            started_at,
        })
    }

    pub fn artist(&self) -> &str {
        &self.artist
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Album name, empty when unknown
    pub fn album(&self) -> &str {
        &self.album
    }

    /// Duration in whole seconds
    pub fn duration(&self) -> u64 {
        self.duration
    }

    /// Unix timestamp at which playback started
    pub fn started_at(&self) -> i64 {
        self.started_at
    }
}

impl fmt::Display for TrackSubmission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.artist, self.title)
    }
}

/// Handle correlating a dispatched request with its completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Handshake,
    NowPlaying,
    Submission,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// An outbound request. `params` is the query string for GET and the
/// form-encoded body for POST, in wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub kind: RequestKind,
    pub method: Method,
    pub url: String,
    pub params: Vec<(String, String)>,
}

impl Request {
    /// Value of the first parameter named `key`
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to build request: {0}")]
    Request(String),
}

/// Result of a dispatched request: a response body or a failure, never both
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub id: RequestId,
    pub kind: RequestKind,
    pub outcome: Result<String, TransportError>,
}

/// Fire-and-forget request dispatch.
///
/// `dispatch` must return immediately; the completion is delivered later
/// through the host's event loop.
pub trait Transport {
    fn dispatch(&mut self, request: Request) -> RequestId;
}
