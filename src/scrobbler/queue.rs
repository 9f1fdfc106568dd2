// Submission queue and submitter
// Holds eligible tracks until the service acknowledges them

use super::protocol::{self, Session, SubmissionResponse};
use super::traits::{RequestId, Transport, TrackSubmission, TransportError};
use std::collections::VecDeque;

/// What a submission completion did to the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// This many entries were acknowledged and removed
    Accepted(usize),
    /// Session id expired; the queue is intact and needs a new handshake
    SessionExpired,
    /// Rejected or lost; the queue is intact
    Failed(String),
    /// Not the outstanding submission
    Stale,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    request: RequestId,
    batch_len: usize,
}

/// Ordered backlog of tracks waiting to be submitted.
///
/// At most one submission request is outstanding. Attempts made while one is
/// in flight are deferred to its completion.
#[derive(Debug, Default)]
pub struct SubmissionQueue {
    entries: VecDeque<TrackSubmission>,
    in_flight: Option<InFlight>,
}

impl SubmissionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Pending entries in submission order
    pub fn entries(&self) -> impl Iterator<Item = &TrackSubmission> {
        self.entries.iter()
    }

    pub fn push(&mut self, track: TrackSubmission) {
        log::info!("Queued {} ({} pending)", track, self.entries.len() + 1);
        self.entries.push_back(track);
    }

    /// Send the whole queue as one ordered batch.
    ///
    /// No-op without a session, with an empty queue, or while a submission is
    /// already outstanding.
    pub fn attempt_submission<T: Transport>(
        &mut self,
        session: Option<&Session>,
        transport: &mut T,
    ) -> Option<RequestId> {
        let session = session?;

        if self.entries.is_empty() {
            return None;
        }

        if let Some(in_flight) = self.in_flight {
            log::debug!("Submission {} outstanding, deferring", in_flight.request);
            return None;
        }

        let batch: Vec<TrackSubmission> = self.entries.iter().cloned().collect();
        let request = protocol::submission_request(session, &batch);
        log::info!("Submitting {} track(s)", batch.len());

        let id = transport.dispatch(request);
        self.in_flight = Some(InFlight {
            request: id,
            batch_len: batch.len(),
        });
        Some(id)
    }

    /// Apply the completion of submission `id`
    pub fn on_submission_response(
        &mut self,
        id: RequestId,
        outcome: Result<String, TransportError>,
    ) -> SubmissionOutcome {
        let in_flight = match self.in_flight {
            Some(in_flight) if in_flight.request == id => in_flight,
            _ => {
                log::debug!("Ignoring stale submission reply {}", id);
                return SubmissionOutcome::Stale;
            }
        };
        self.in_flight = None;

        let body = match outcome {
            Ok(body) => body,
            Err(e) => {
                log::warn!("Submission request failed, keeping {} queued: {}", self.len(), e);
                return SubmissionOutcome::Failed(e.to_string());
            }
        };

        match protocol::parse_submission(&body) {
            SubmissionResponse::Ok => {
                // Entries queued after dispatch were not part of the batch
                let accepted = in_flight.batch_len.min(self.entries.len());
                self.entries.drain(..accepted);
                log::info!("Scrobbled {} track(s) successfully", accepted);
                SubmissionOutcome::Accepted(accepted)
            }
            SubmissionResponse::BadSession => {
                log::warn!("Session expired, {} track(s) kept for retry", self.len());
                SubmissionOutcome::SessionExpired
            }
            SubmissionResponse::Failed(reason) => {
                log::warn!("Submission rejected ({}), keeping {} queued", reason, self.len());
                SubmissionOutcome::Failed(reason)
            }
        }
    }

    /// Forget the outstanding submission so its reply is treated as stale
    pub fn release_in_flight(&mut self) {
        self.in_flight = None;
    }
}

/// Send a best-effort now-playing notification. Never queued or retried.
pub fn notify_now_playing<T: Transport>(
    session: Option<&Session>,
    track: &TrackSubmission,
    transport: &mut T,
) -> Option<RequestId> {
    let Some(session) = session else {
        log::debug!("Not logged in, skipping now playing for {}", track);
        return None;
    };

    log::info!("Now playing: {}", track);
    Some(transport.dispatch(protocol::now_playing_request(session, track)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrobbler::testing::RecordingTransport;
    use crate::scrobbler::traits::{RequestKind, TrackMetadata};
    use std::time::Duration;

    fn session() -> Session {
        Session {
            id: "SID".to_string(),
            now_playing_url: "http://np".to_string(),
            submission_url: "http://sub".to_string(),
        }
    }

    fn track(title: &str) -> TrackSubmission {
        let metadata = TrackMetadata {
            artist: "Artist".to_string(),
            title: title.to_string(),
            album: None,
        };
        TrackSubmission::new(&metadata, Duration::from_secs(200), 0).unwrap()
    }

    fn titles(queue: &SubmissionQueue) -> Vec<String> {
        queue.entries().map(|t| t.title().to_string()).collect()
    }

    #[test]
    fn test_no_submission_without_session() {
        let mut transport = RecordingTransport::default();
        let mut queue = SubmissionQueue::new();
        queue.push(track("One"));

        assert!(queue.attempt_submission(None, &mut transport).is_none());
        assert!(transport.sent.is_empty());
    }

    #[test]
    fn test_no_submission_when_empty() {
        let mut transport = RecordingTransport::default();
        let mut queue = SubmissionQueue::new();
        let session = session();

        assert!(queue.attempt_submission(Some(&session), &mut transport).is_none());
        assert!(transport.sent.is_empty());
    }

    #[test]
    fn test_ok_clears_batch() {
        let mut transport = RecordingTransport::default();
        let mut queue = SubmissionQueue::new();
        let session = session();
        queue.push(track("One"));
        queue.push(track("Two"));

        let id = queue.attempt_submission(Some(&session), &mut transport).unwrap();
        assert_eq!(transport.sent[0].param("t[1]"), Some("Two"));

        let outcome = queue.on_submission_response(id, Ok("OK\n".to_string()));
        assert_eq!(outcome, SubmissionOutcome::Accepted(2));
        assert!(queue.is_empty());
        assert!(!queue.is_in_flight());
    }

    #[test]
    fn test_badsession_keeps_queue() {
        let mut transport = RecordingTransport::default();
        let mut queue = SubmissionQueue::new();
        let session = session();
        queue.push(track("One"));
        queue.push(track("Two"));

        let id = queue.attempt_submission(Some(&session), &mut transport).unwrap();
        let outcome = queue.on_submission_response(id, Ok("BADSESSION\n".to_string()));

        assert_eq!(outcome, SubmissionOutcome::SessionExpired);
        assert_eq!(titles(&queue), ["One", "Two"]);
    }

    #[test]
    fn test_failure_keeps_queue() {
        let mut transport = RecordingTransport::default();
        let mut queue = SubmissionQueue::new();
        let session = session();
        queue.push(track("One"));

        let id = queue.attempt_submission(Some(&session), &mut transport).unwrap();
        let outcome = queue.on_submission_response(
            id,
            Err(TransportError::Network("timed out".to_string())),
        );
        assert!(matches!(outcome, SubmissionOutcome::Failed(_)));
        assert_eq!(queue.len(), 1);

        let id = queue.attempt_submission(Some(&session), &mut transport).unwrap();
        let outcome = queue.on_submission_response(id, Ok("FAILED Try later".to_string()));
        assert_eq!(outcome, SubmissionOutcome::Failed("FAILED Try later".to_string()));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_attempt_deferred_while_in_flight() {
        let mut transport = RecordingTransport::default();
        let mut queue = SubmissionQueue::new();
        let session = session();
        queue.push(track("One"));

        let id = queue.attempt_submission(Some(&session), &mut transport).unwrap();
        queue.push(track("Two"));
        assert!(queue.attempt_submission(Some(&session), &mut transport).is_none());
        assert_eq!(transport.sent.len(), 1);

        // Only the entry that was part of the batch is acknowledged
        assert_eq!(
            queue.on_submission_response(id, Ok("OK".to_string())),
            SubmissionOutcome::Accepted(1)
        );
        assert_eq!(titles(&queue), ["Two"]);

        let id = queue.attempt_submission(Some(&session), &mut transport).unwrap();
        assert_eq!(transport.sent[1].param("t[0]"), Some("Two"));
        assert_eq!(transport.sent[1].param("t[1]"), None);
        queue.on_submission_response(id, Ok("OK".to_string()));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_stale_reply_ignored() {
        let mut transport = RecordingTransport::default();
        let mut queue = SubmissionQueue::new();
        let session = session();
        queue.push(track("One"));

        let id = queue.attempt_submission(Some(&session), &mut transport).unwrap();
        queue.release_in_flight();

        assert_eq!(
            queue.on_submission_response(id, Ok("OK".to_string())),
            SubmissionOutcome::Stale
        );
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_now_playing_requires_session() {
        let mut transport = RecordingTransport::default();
        let session = session();

        assert!(notify_now_playing(None, &track("One"), &mut transport).is_none());
        assert!(notify_now_playing(Some(&session), &track("One"), &mut transport).is_some());

        let sent = transport.of_kind(RequestKind::NowPlaying);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].url, "http://np");
        assert_eq!(sent[0].param("t"), Some("One"));
    }
}
