//! Rate-limited, retrying request dispatcher.
//!
//! Every outbound call in the system goes through one [`RequestDispatcher`].
//! A single worker task owns the FIFO queue, so at most one request is in
//! flight at any time. Before each dispatch the worker waits until
//! `min_spacing` has elapsed since the previous dispatch started.
//!
//! Transient failures (rate limiting, connection resets) are retried: the
//! worker sleeps for `retry_delay` and puts the request back at the front of
//! the queue with one retry less. Everything else reaches the caller as-is.

use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant};
use tracing::{debug, warn};

use crate::error::DispatchError;
use crate::port::{Target, Upstream};

/// Spacing and retry policy of the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchPolicy {
    pub min_spacing: Duration,
    /// Retries granted by [`RequestDispatcher::dispatch`].
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            min_spacing: Duration::from_millis(250),
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

type Reply = oneshot::Sender<Result<Value, DispatchError>>;

struct Pending {
    target: Target,
    remaining_retries: u32,
    attempts: u32,
    reply: Reply,
}

/// Handle to the dispatcher worker. Cheap to clone.
///
/// The worker exits once every handle is dropped and its queue is drained.
#[derive(Clone)]
pub struct RequestDispatcher {
    tx: mpsc::UnboundedSender<Pending>,
    default_retries: u32,
}

impl RequestDispatcher {
    /// Spawn the worker on the current tokio runtime.
    pub fn spawn<U: Upstream>(upstream: U, policy: DispatchPolicy) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(worker(upstream, policy, rx));
        Self {
            tx,
            default_retries: policy.max_retries,
        }
    }

    /// Queue `target` with an explicit retry budget.
    ///
    /// The request is queued immediately; the returned future resolves once
    /// the worker has a final result for it. Dropping the future abandons the
    /// request, and the worker skips it if it has not been dispatched yet.
    pub fn enqueue(
        &self,
        target: Target,
        max_retries: u32,
    ) -> impl Future<Output = Result<Value, DispatchError>> + Send + 'static {
        let label = target.to_string();
        let (reply, rx) = oneshot::channel();
        let queued = self
            .tx
            .send(Pending {
                target,
                remaining_retries: max_retries,
                attempts: 0,
                reply,
            })
            .is_ok();

        async move {
            if !queued {
                return Err(DispatchError::Closed { target: label });
            }
            rx.await
                .unwrap_or_else(|_| Err(DispatchError::Closed { target: label }))
        }
    }

    /// Queue `target` with the default retry budget.
    pub async fn dispatch(&self, target: Target) -> Result<Value, DispatchError> {
        self.enqueue(target, self.default_retries).await
    }

    /// Dispatch and decode the response body.
    pub async fn dispatch_json<T: DeserializeOwned>(
        &self,
        target: Target,
    ) -> Result<T, DispatchError> {
        let label = target.to_string();
        let value = self.dispatch(target).await?;
        serde_json::from_value(value).map_err(|e| DispatchError::Malformed {
            target: label,
            reason: e.to_string(),
        })
    }

    /// Whether the worker is still accepting requests.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }
}

async fn worker<U: Upstream>(
    upstream: U,
    policy: DispatchPolicy,
    mut rx: mpsc::UnboundedReceiver<Pending>,
) {
    let mut queue: VecDeque<Pending> = VecDeque::new();
    let mut last_dispatch: Option<Instant> = None;

    loop {
        if queue.is_empty() {
            match rx.recv().await {
                Some(pending) => queue.push_back(pending),
                None => break,
            }
        }
        while let Ok(pending) = rx.try_recv() {
            queue.push_back(pending);
        }

        let Some(mut pending) = queue.pop_front() else {
            continue;
        };
        if pending.reply.is_closed() {
            debug!(endpoint = %pending.target, "Caller went away, skipping request");
            continue;
        }

        if let Some(last) = last_dispatch {
            time::sleep_until(last + policy.min_spacing).await;
        }
        last_dispatch = Some(Instant::now());
        pending.attempts += 1;

        match upstream.call(&pending.target).await {
            Err(err) if err.is_transient() && pending.remaining_retries > 0 => {
                pending.remaining_retries -= 1;
                warn!(
                    endpoint = %pending.target,
                    error = %err,
                    attempt = pending.attempts,
                    remaining = pending.remaining_retries,
                    "Transient upstream failure, retrying"
                );
                time::sleep(policy.retry_delay).await;
                queue.push_front(pending);
            }
            Err(err) if err.is_transient() => {
                warn!(
                    endpoint = %pending.target,
                    error = %err,
                    attempts = pending.attempts,
                    "Retry budget exhausted"
                );
                let _ = pending.reply.send(Err(DispatchError::RetriesExhausted {
                    target: pending.target.to_string(),
                    attempts: pending.attempts,
                    last: Box::new(err),
                }));
            }
            result => {
                if let Err(err) = &result {
                    debug!(endpoint = %pending.target, error = %err, "Request failed");
                }
                let _ = pending.reply.send(result);
            }
        }
    }

    debug!("Dispatcher worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::upstream::ScriptedUpstream;
    use serde_json::json;
    use std::sync::Arc;

    fn policy() -> DispatchPolicy {
        DispatchPolicy {
            min_spacing: Duration::from_millis(100),
            max_retries: 2,
            retry_delay: Duration::from_millis(1_000),
        }
    }

    fn rate_limited(url: &str) -> DispatchError {
        DispatchError::RateLimited {
            target: format!("GET {url}"),
        }
    }

    // -------------------------------------------------------------------------
    // Spacing
    // -------------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn successful_requests_respect_min_spacing() {
        let upstream = Arc::new(ScriptedUpstream::new());
        let dispatcher = RequestDispatcher::spawn(upstream.clone(), policy());

        let calls: Vec<_> = (0..4)
            .map(|i| dispatcher.enqueue(Target::get(format!("http://a/{i}")), 0))
            .collect();
        for call in calls {
            call.await.unwrap();
        }

        let times = upstream.call_times();
        assert_eq!(times.len(), 4);
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(100));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn requests_are_dispatched_in_fifo_order() {
        let upstream = Arc::new(ScriptedUpstream::new());
        let dispatcher = RequestDispatcher::spawn(upstream.clone(), policy());

        let a = dispatcher.enqueue(Target::get("http://a"), 0);
        let b = dispatcher.enqueue(Target::get("http://b"), 0);
        let c = dispatcher.enqueue(Target::get("http://c"), 0);
        let _ = tokio::join!(c, b, a);

        let urls: Vec<_> = upstream.calls().iter().map(|t| t.url().to_string()).collect();
        assert_eq!(urls, vec!["http://a", "http://b", "http://c"]);
    }

    // -------------------------------------------------------------------------
    // Retries
    // -------------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn rate_limited_request_is_retried_until_budget_is_spent() {
        let upstream = Arc::new(ScriptedUpstream::new());
        for _ in 0..3 {
            upstream.push_err(rate_limited("http://a"));
        }
        let dispatcher = RequestDispatcher::spawn(upstream.clone(), policy());

        let err = dispatcher
            .enqueue(Target::get("http://a"), 2)
            .await
            .unwrap_err();

        match err {
            DispatchError::RetriesExhausted {
                target,
                attempts,
                last,
            } => {
                assert_eq!(target, "GET http://a");
                assert_eq!(attempts, 3);
                assert!(matches!(*last, DispatchError::RateLimited { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(upstream.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_succeeds_within_budget() {
        let upstream = Arc::new(ScriptedUpstream::new());
        upstream.push_err(DispatchError::ConnectionReset {
            target: "GET http://a".into(),
        });
        upstream.push_ok(json!({"ok": true}));
        let dispatcher = RequestDispatcher::spawn(upstream.clone(), policy());

        let started = Instant::now();
        let value = dispatcher.enqueue(Target::get("http://a"), 1).await.unwrap();

        assert_eq!(value, json!({"ok": true}));
        assert!(started.elapsed() >= Duration::from_millis(1_000));
    }

    #[tokio::test(start_paused = true)]
    async fn retried_request_goes_back_to_the_front() {
        let upstream = Arc::new(ScriptedUpstream::new());
        upstream.push_err(rate_limited("http://a"));
        let dispatcher = RequestDispatcher::spawn(upstream.clone(), policy());

        let a = dispatcher.enqueue(Target::get("http://a"), 1);
        let b = dispatcher.enqueue(Target::get("http://b"), 1);
        let (a, b) = tokio::join!(a, b);
        a.unwrap();
        b.unwrap();

        let urls: Vec<_> = upstream.calls().iter().map(|t| t.url().to_string()).collect();
        assert_eq!(urls, vec!["http://a", "http://a", "http://b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_surfaces_without_retry() {
        let upstream = Arc::new(ScriptedUpstream::new());
        upstream.push_err(DispatchError::Timeout {
            target: "GET http://a".into(),
        });
        let dispatcher = RequestDispatcher::spawn(upstream.clone(), policy());

        let err = dispatcher.enqueue(Target::get("http://a"), 5).await.unwrap_err();

        assert!(matches!(err, DispatchError::Timeout { .. }));
        assert_eq!(upstream.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn upstream_error_surfaces_without_retry() {
        let upstream = Arc::new(ScriptedUpstream::new());
        upstream.push_err(DispatchError::Upstream {
            target: "GET http://a".into(),
            status: Some(500),
            message: "internal".into(),
        });
        let dispatcher = RequestDispatcher::spawn(upstream.clone(), policy());

        let err = dispatcher.dispatch(Target::get("http://a")).await.unwrap_err();

        assert!(matches!(err, DispatchError::Upstream { status: Some(500), .. }));
        assert_eq!(upstream.call_count(), 1);
    }

    // -------------------------------------------------------------------------
    // Decoding and lifecycle
    // -------------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn dispatch_json_reports_undecodable_body_as_malformed() {
        let upstream = Arc::new(ScriptedUpstream::new());
        upstream.push_ok(json!({"not": "a list"}));
        let dispatcher = RequestDispatcher::spawn(upstream, policy());

        let err = dispatcher
            .dispatch_json::<Vec<u64>>(Target::get("http://a"))
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Malformed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn worker_restarts_after_idle() {
        let upstream = Arc::new(ScriptedUpstream::new());
        let dispatcher = RequestDispatcher::spawn(upstream.clone(), policy());

        dispatcher.dispatch(Target::get("http://a")).await.unwrap();
        time::sleep(Duration::from_secs(60)).await;
        dispatcher.dispatch(Target::get("http://b")).await.unwrap();

        assert_eq!(upstream.call_count(), 2);
        assert!(dispatcher.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_request_is_skipped() {
        let upstream = Arc::new(ScriptedUpstream::new());
        let dispatcher = RequestDispatcher::spawn(upstream.clone(), policy());

        let first = dispatcher.enqueue(Target::get("http://a"), 0);
        drop(dispatcher.enqueue(Target::get("http://dropped"), 0));
        first.await.unwrap();
        dispatcher.dispatch(Target::get("http://b")).await.unwrap();

        let urls: Vec<_> = upstream.calls().iter().map(|t| t.url().to_string()).collect();
        assert_eq!(urls, vec!["http://a", "http://b"]);
    }
}
