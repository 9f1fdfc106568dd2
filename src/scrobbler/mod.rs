// Scrobbler module
// Audioscrobbler submission protocol core: token, session, tracker and queue

pub mod protocol;
pub mod queue;
pub mod session;
pub mod token;
pub mod tracker;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use protocol::{ClientInfo, HandshakeError, Session};
pub use queue::{SubmissionOutcome, SubmissionQueue};
pub use session::{HandshakeOutcome, SessionManager, SessionState};
pub use token::token;
pub use tracker::EligibilityTracker;
pub use traits::{
    Completion, Method, Request, RequestId, RequestKind, TrackMetadata, TrackSubmission,
    Transport, TransportError,
};
