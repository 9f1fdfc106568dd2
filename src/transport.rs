// HTTP transport
// Runs each request on a worker thread and posts the completion back to the event loop

use crate::scrobbler::{Completion, Method, Request, RequestId, Transport, TransportError};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

/// Blocking `attohttpc` requests moved off the event thread.
///
/// Completions are sent into the host's single event channel, so replies are
/// handled serially with playback events.
pub struct HttpTransport<E> {
    events: Sender<E>,
    timeout: Duration,
    next_id: u64,
}

impl<E: From<Completion> + Send + 'static> HttpTransport<E> {
    pub fn new(events: Sender<E>, timeout: Duration) -> Self {
        Self {
            events,
            timeout,
            next_id: 0,
        }
    }
}

impl<E: From<Completion> + Send + 'static> Transport for HttpTransport<E> {
    fn dispatch(&mut self, request: Request) -> RequestId {
        self.next_id += 1;
        let id = RequestId(self.next_id);
        let events = self.events.clone();
        let timeout = self.timeout;

        log::debug!("Dispatching {:?} {} to {}", request.kind, id, request.url);

        thread::spawn(move || {
            let kind = request.kind;
            let outcome = execute(&request, timeout);
            if events.send(Completion { id, kind, outcome }.into()).is_err() {
                log::debug!("Event loop gone, dropping reply {}", id);
            }
        });

        id
    }
}

/// Perform `request` and return the response body
pub fn execute(request: &Request, timeout: Duration) -> Result<String, TransportError> {
    let response = match request.method {
        Method::Get => attohttpc::get(&request.url)
            .params(&request.params)
            .timeout(timeout)
            .send(),
        Method::Post => attohttpc::post(&request.url)
            .timeout(timeout)
            .form(&request.params)
            .map_err(|e| TransportError::Request(e.to_string()))?
            .send(),
    }
    .map_err(|e| TransportError::Network(e.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .map_err(|e| TransportError::Network(e.to_string()))?;

    if !status.is_success() {
        return Err(TransportError::Status {
            status: status.as_u16(),
            body,
        });
    }

    Ok(body)
}
