// Test doubles

use super::traits::{Request, RequestId, RequestKind, Transport};

/// Records every dispatched request and hands out sequential ids
#[derive(Debug, Default)]
pub struct RecordingTransport {
    pub sent: Vec<Request>,
    next_id: u64,
}

impl RecordingTransport {
    pub fn of_kind(&self, kind: RequestKind) -> Vec<&Request> {
        self.sent.iter().filter(|r| r.kind == kind).collect()
    }

    /// Id handed out for the most recent request
    pub fn last_id(&self) -> RequestId {
        RequestId(self.next_id)
    }
}

impl Transport for RecordingTransport {
    fn dispatch(&mut self, request: Request) -> RequestId {
        self.next_id += 1;
        self.sent.push(request);
        RequestId(self.next_id)
    }
}
