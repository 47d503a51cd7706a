use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};

use tokio::sync::mpsc;
use tracing::warn;

use super::{ContentDispatch, ContentProvider, ContentRequest, ContentResponse};

/// Resolves each request immediately; the answer is picked up on the next poll.
pub struct InlineDispatch<P> {
    provider: P,
    inbox: VecDeque<ContentResponse>,
}

impl<P: ContentProvider> InlineDispatch<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            inbox: VecDeque::new(),
        }
    }
}

impl<P: ContentProvider> ContentDispatch for InlineDispatch<P> {
    fn dispatch(&mut self, request: ContentRequest) {
        let response = request.resolve(&mut self.provider);
        self.inbox.push_back(response);
    }

    fn poll(&mut self) -> Vec<ContentResponse> {
        self.inbox.drain(..).collect()
    }
}

const WORKER_STOPPED: &str = "content worker stopped";

/// Runs the provider on tokio's blocking pool so slow providers never hold up a tick.
///
/// Every dispatched request gets exactly one response. A provider that panics answers that
/// request as unavailable; a worker that is gone answers every later request the same way.
pub struct BackgroundDispatch {
    requests: mpsc::UnboundedSender<ContentRequest>,
    responses: mpsc::UnboundedReceiver<ContentResponse>,
    undelivered: VecDeque<ContentResponse>,
}

impl BackgroundDispatch {
    /// Must be called from inside a tokio runtime.
    pub fn spawn(provider: Box<dyn ContentProvider>) -> Self {
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<ContentRequest>();
        let (response_tx, response_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut provider = provider;
            while let Some(request) = request_rx.recv().await {
                let fallback = request.unavailable("content provider panicked");
                let handle = tokio::task::spawn_blocking(move || {
                    let response =
                        panic::catch_unwind(AssertUnwindSafe(|| request.resolve(&mut provider)));
                    (provider, response)
                });
                let response = match handle.await {
                    Ok((returned, result)) => {
                        provider = returned;
                        result.unwrap_or_else(|_| {
                            warn!("content provider panicked; request answered as unavailable");
                            fallback
                        })
                    }
                    Err(err) => {
                        warn!(error = %err, "content provider task failed; dispatch stopped");
                        let _ = response_tx.send(fallback);
                        request_rx.close();
                        while let Ok(request) = request_rx.try_recv() {
                            let _ = response_tx.send(request.unavailable(WORKER_STOPPED));
                        }
                        return;
                    }
                };
                if response_tx.send(response).is_err() {
                    break;
                }
            }
        });

        Self {
            requests: request_tx,
            responses: response_rx,
            undelivered: VecDeque::new(),
        }
    }
}

impl ContentDispatch for BackgroundDispatch {
    fn dispatch(&mut self, request: ContentRequest) {
        if let Err(mpsc::error::SendError(request)) = self.requests.send(request) {
            warn!("content worker is gone; request answered as unavailable");
            self.undelivered
                .push_back(request.unavailable(WORKER_STOPPED));
        }
    }

    fn poll(&mut self) -> Vec<ContentResponse> {
        let mut responses: Vec<ContentResponse> = self.undelivered.drain(..).collect();
        while let Ok(response) = self.responses.try_recv() {
            responses.push(response);
        }
        responses
    }
}
